#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]

mod commands;
mod logging;

use clap::Parser;
use miette::{IntoDiagnostic, Result};
use stackbuild_core::vfs::DiskFs;
use stackbuild_core::{Config, FileSystem, Resolver};
use stackbuild_util::vpath;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "stackbuild")]
#[command(author, version, about = "Module resolution and bundle bootstrap for sandboxed front-end builds", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON formatted output (stable, machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Override the working directory
    #[arg(long, global = true, value_name = "PATH")]
    cwd: Option<PathBuf>,

    /// Load settings from a JSON config file
    #[arg(long, global = true, value_name = "FILE", env = "STACKBUILD_CONFIG")]
    config: Option<PathBuf>,

    /// Flattened dependency directory
    #[arg(long, global = true, value_name = "DIR")]
    deps: Option<PathBuf>,

    /// Built-in library directory
    #[arg(long, global = true, value_name = "DIR")]
    lib: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print version information
    Version,

    /// Resolve an import specifier to a file
    Resolve {
        /// Import specifier, relative (`./x`) or bare (`pkg/sub`)
        specifier: String,

        /// Directory of the importing module (defaults to the working directory)
        #[arg(long, value_name = "DIR")]
        from: Option<PathBuf>,
    },

    /// Find the entry file of a project directory
    Entry {
        /// Project directory (defaults to the working directory)
        project: Option<PathBuf>,
    },

    /// Print the bootstrap module a build of the project would start from
    Bootstrap {
        /// Project directory (defaults to the working directory)
        project: Option<PathBuf>,

        /// Render paths as seen from inside the sandbox
        #[arg(long)]
        sandbox: bool,
    },

    /// Decode a build report payload published on the `build` channel
    Report {
        /// Base64 payload
        payload: String,
    },
}

/// Everything a command needs from the global flags.
pub struct Context {
    pub cwd: PathBuf,
    pub config: Config,
    pub json: bool,
}

impl Context {
    /// Filesystem for host-side commands.
    #[must_use]
    pub fn fs(&self) -> Arc<dyn FileSystem> {
        Arc::new(DiskFs::new())
    }

    #[must_use]
    pub fn resolver(&self) -> Resolver {
        Resolver::new(self.fs(), self.config.resolver_config())
    }

    /// Absolute `/`-separated form of a user-supplied path.
    #[must_use]
    pub fn absolute(&self, path: &Path) -> String {
        let joined = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd.join(path)
        };
        vpath::clean(&vpath::to_slash(&joined.to_string_lossy()))
    }

    /// Working directory, or `path` when given.
    #[must_use]
    pub fn dir_or_cwd(&self, path: Option<&PathBuf>) -> String {
        self.absolute(path.map_or(self.cwd.as_path(), PathBuf::as_path))
    }
}

fn build_context(cli: &Cli) -> Result<Context> {
    let cwd = cli
        .cwd
        .clone()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    let config = match &cli.config {
        Some(path) => {
            let mut config = Config::load(path).into_diagnostic()?;
            config.cwd.clone_from(&cwd);
            config
        }
        None => Config::new(cwd.clone()),
    };

    let mut ctx = Context {
        cwd,
        config: config.with_verbosity(cli.verbose).with_json_logs(cli.json),
        json: cli.json,
    };

    if let Some(deps) = &cli.deps {
        let deps = ctx.absolute(deps);
        ctx.config = ctx.config.with_dependency_root(deps);
    }
    if let Some(lib) = &cli.lib {
        let lib = ctx.absolute(lib);
        ctx.config = ctx.config.with_library_root(lib);
    }

    Ok(ctx)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init(cli.verbose, cli.json);

    let ctx = build_context(&cli)?;

    let _span = tracing::info_span!(
        "stackbuild",
        cwd = %ctx.cwd.display(),
        target = ctx.config.target.as_str()
    )
    .entered();

    tracing::debug!(
        deps = %ctx.config.directories.dependency_root,
        lib = %ctx.config.directories.library_root,
        "configuration loaded"
    );

    match &cli.command {
        Some(Commands::Version) | None => commands::version::run(),
        Some(Commands::Resolve { specifier, from }) => {
            commands::resolve::run(&ctx, specifier, from.as_ref())
        }
        Some(Commands::Entry { project }) => commands::entry::run(&ctx, project.as_ref()),
        Some(Commands::Bootstrap { project, sandbox }) => {
            commands::bootstrap::run(&ctx, project.as_ref(), *sandbox)
        }
        Some(Commands::Report { payload }) => commands::report::run(&ctx, payload),
    }
}

use super::print_json;
use crate::Context;
use miette::Result;
use serde::Serialize;
use stackbuild_core::build::{discover_entry_point, render_bootstrap, BootstrapInputs};
use std::path::PathBuf;

#[derive(Serialize)]
struct BootstrapOutput<'a> {
    project: &'a str,
    entry: Option<&'a str>,
    sandbox: bool,
    source: &'a str,
}

/// Print the bootstrap module source for a project.
///
/// Nothing is written; the module is rendered the same way a build renders it.
pub fn run(ctx: &Context, project: Option<&PathBuf>, sandbox: bool) -> Result<()> {
    let project = ctx.dir_or_cwd(project);
    let fs = ctx.fs();
    let entry = discover_entry_point(fs.as_ref(), &project);

    let inputs = BootstrapInputs {
        project_dir: &project,
        entry: entry.as_deref(),
        sandbox,
    };
    let source = render_bootstrap(&inputs, &ctx.config.bootstrap);

    if ctx.json {
        print_json(&BootstrapOutput {
            project: &project,
            entry: entry.as_deref(),
            sandbox,
            source: &source,
        })?;
    } else {
        print!("{source}");
    }
    Ok(())
}

//! Build orchestration.
//!
//! One build goes through these steps:
//! 1. Pick the entry file (explicit, or discovered in the project directory)
//! 2. Write the bootstrap module to the temp directory
//! 3. Run the engine with the bootstrap as its only entry
//! 4. In sandbox mode, persist the artifacts through the filesystem
//! 5. Remove the bootstrap module
//! 6. Report the diagnostics on the build channel
//!
//! Steps 5 and 6 run whatever happened before them, including an engine
//! panic. Nothing is shared between builds.
//!
//! Hosts start builds with [`Orchestrator::spawn_build`]: the caller gets no
//! result back and learns the outcome from the build channel only.

pub mod bootstrap;
pub mod codes;
pub mod engine;
pub mod entry;
pub mod hooks;
pub mod loader;
pub mod report;

pub use bootstrap::{
    compiled_stylesheet, render_bootstrap, synthesize_bootstrap, BootstrapModule, BootstrapInputs,
    BUILD_DIR,
};
pub use engine::{
    BundleEngine, EngineOptions, EngineOutput, EntryPoint, OutputFile, OutputFormat, SourceMap,
};
pub use entry::{discover_entry_point, ENTRY_SUFFIXES};
pub use hooks::{EngineHooks, LoadedModule, ResolveArgs, SandboxHooks};
pub use loader::{infer_loader, Loader};
pub use report::{send_build_report, MemoryReporter, Reporter};

use crate::config::{Config, Target};
use crate::resolver::Resolver;
use crate::vfs::FileSystem;
use stackbuild_proto::{BuildReport, Diagnostic};
use stackbuild_util::vpath;
use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Output name of the single entry point.
pub const OUTPUT_NAME: &str = "index";

/// A request to build one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    pub project_dir: String,
    /// Entry file name inside the project. Discovered when `None`.
    pub entry: Option<String>,
    /// Echoed back in the report.
    pub build_id: u32,
    pub target: Target,
}

impl BuildRequest {
    #[must_use]
    pub fn new(project_dir: impl Into<String>, build_id: u32, target: Target) -> Self {
        Self {
            project_dir: project_dir.into(),
            entry: None,
            build_id,
            target,
        }
    }

    /// Use `entry` instead of discovering one.
    #[must_use]
    pub fn with_entry(mut self, entry: impl Into<String>) -> Self {
        self.entry = Some(entry.into());
        self
    }
}

/// What a build produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildResult {
    pub build_id: u32,
    /// Engine errors, then engine warnings, then orchestrator diagnostics.
    pub diagnostics: Vec<Diagnostic>,
    /// Artifacts written through the filesystem (sandbox mode only).
    pub artifacts: Vec<OutputFile>,
}

impl BuildResult {
    #[must_use]
    pub fn is_success(&self) -> bool {
        !self.diagnostics.iter().any(Diagnostic::is_error)
    }

    #[must_use]
    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_error()).count()
    }
}

/// Drives builds against one filesystem, engine and reporter.
#[derive(Clone)]
pub struct Orchestrator {
    config: Config,
    fs: Arc<dyn FileSystem>,
    engine: Arc<dyn BundleEngine>,
    reporter: Arc<dyn Reporter>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("target", &self.config.target)
            .field("directories", &self.config.directories)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    #[must_use]
    pub fn new(
        config: Config,
        fs: Arc<dyn FileSystem>,
        engine: Arc<dyn BundleEngine>,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            config,
            fs,
            engine,
            reporter,
        }
    }

    /// A request for `project_dir` using the configured target.
    #[must_use]
    pub fn request(&self, project_dir: impl Into<String>, build_id: u32) -> BuildRequest {
        BuildRequest::new(project_dir, build_id, self.config.target)
    }

    /// The bundling engine's version.
    #[must_use]
    pub fn engine_version(&self) -> String {
        self.engine.version()
    }

    /// A resolver over this orchestrator's filesystem and directories.
    #[must_use]
    pub fn resolver(&self) -> Resolver {
        Resolver::new(self.fs.clone(), self.config.resolver_config())
    }

    /// Run a build to completion on the calling thread and report it.
    ///
    /// The report on the build channel is the delivery to the host. The
    /// returned [`BuildResult`] is a copy for embedders that drive their own
    /// worker threads; hosts should use [`Orchestrator::spawn_build`].
    pub fn run_build(&self, request: &BuildRequest) -> BuildResult {
        let sandbox = request.target.is_sandbox();
        let project_dir = if sandbox {
            vpath::clean(&format!("/{}", request.project_dir))
        } else {
            vpath::clean(&request.project_dir)
        };

        tracing::info!(
            build_id = request.build_id,
            project_dir = %project_dir,
            target = request.target.as_str(),
            "build started"
        );

        let entry = request
            .entry
            .clone()
            .or_else(|| discover_entry_point(self.fs.as_ref(), &project_dir));

        let mut result = BuildResult {
            build_id: request.build_id,
            ..BuildResult::default()
        };

        let inputs = BootstrapInputs {
            project_dir: &project_dir,
            entry: entry.as_deref(),
            sandbox,
        };

        match synthesize_bootstrap(
            &self.fs,
            &self.config.directories.tmp,
            &inputs,
            &self.config.bootstrap,
        ) {
            Ok(module) => {
                self.bundle(&project_dir, module.path(), sandbox, &mut result);
                drop(module);
            }
            Err(e) => {
                tracing::error!(build_id = request.build_id, error = %e, "cannot write bootstrap module");
                result.diagnostics.push(Diagnostic::error(
                    codes::BUILD_BOOTSTRAP_WRITE_FAILED,
                    format!("failed to write bootstrap module: {e}"),
                ));
            }
        }

        send_build_report(
            self.reporter.as_ref(),
            &BuildReport {
                build_id: result.build_id,
                diagnostics: result.diagnostics.clone(),
            },
        );

        tracing::info!(
            build_id = result.build_id,
            errors = result.error_count(),
            diagnostics = result.diagnostics.len(),
            artifacts = result.artifacts.len(),
            "build finished"
        );

        result
    }

    /// Run a build on a worker thread. The result only reaches the reporter.
    ///
    /// # Errors
    /// Returns an error if the thread cannot be spawned.
    pub fn spawn_build(&self, request: BuildRequest) -> io::Result<JoinHandle<()>> {
        let orchestrator = self.clone();
        thread::Builder::new()
            .name(format!("stackbuild-build-{}", request.build_id))
            .spawn(move || {
                orchestrator.run_build(&request);
            })
    }

    /// Engine options for one build.
    #[must_use]
    pub fn engine_options(&self, project_dir: &str, bootstrap: &str, sandbox: bool) -> EngineOptions {
        EngineOptions {
            entry_points: vec![EntryPoint {
                input_path: bootstrap.to_string(),
                output_path: OUTPUT_NAME.to_string(),
            }],
            outdir: vpath::join(project_dir, BUILD_DIR),
            bundle: true,
            splitting: !sandbox,
            format: OutputFormat::Esm,
            sourcemap: SourceMap::InlineAndExternal,
            write: !sandbox,
            allow_overwrite: true,
            node_paths: vec![
                self.config.directories.library_root.clone(),
                vpath::join(project_dir, "node_modules"),
            ],
        }
    }

    fn bundle(&self, project_dir: &str, bootstrap: &str, sandbox: bool, result: &mut BuildResult) {
        let options = self.engine_options(project_dir, bootstrap, sandbox);
        let hooks: Option<Arc<dyn EngineHooks>> = if sandbox {
            Some(Arc::new(SandboxHooks::new(self.resolver(), self.fs.clone())))
        } else {
            None
        };

        let output = match panic::catch_unwind(AssertUnwindSafe(|| self.engine.bundle(&options, hooks))) {
            Ok(output) => output,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!(build_id = result.build_id, %message, "bundling engine panicked");
                result.diagnostics.push(Diagnostic::error(
                    codes::BUILD_ENGINE_PANICKED,
                    format!("bundling engine panicked: {message}"),
                ));
                return;
            }
        };

        result.diagnostics.extend(output.errors);
        result.diagnostics.extend(output.warnings);

        if sandbox {
            self.persist_artifacts(&options.outdir, output.output_files, result);
        }
    }

    fn persist_artifacts(&self, outdir: &str, files: Vec<OutputFile>, result: &mut BuildResult) {
        if let Err(e) = self.fs.mkdir(outdir) {
            tracing::error!(outdir, error = %e, "cannot create output directory");
            result.diagnostics.push(Diagnostic::error(
                codes::BUILD_OUTDIR_CREATE_FAILED,
                format!("failed to create {outdir}: {e}"),
            ));
            return;
        }

        for file in files {
            match self.fs.write_file(&file.path, &file.contents) {
                Ok(()) => {
                    tracing::debug!(path = %file.path, bytes = file.contents.len(), "wrote artifact");
                    result.artifacts.push(file);
                }
                Err(e) => {
                    tracing::warn!(path = %file.path, error = %e, "cannot write artifact");
                    result.diagnostics.push(Diagnostic::error(
                        codes::BUILD_ARTIFACT_WRITE_FAILED,
                        format!("failed to write {}: {e}", file.path),
                    ));
                }
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::{DiskFs, MemoryTransport, SandboxFs};
    use stackbuild_proto::BUILD_CHANNEL;
    use std::sync::Mutex;

    /// Walks `import "...";` lines through the hooks and concatenates the
    /// loaded sources into `<outdir>/index.js`.
    #[derive(Default)]
    struct LineEngine {
        seen: Mutex<Vec<EngineOptions>>,
        bootstrap_existed: Mutex<bool>,
        fs: Option<Arc<dyn FileSystem>>,
    }

    impl BundleEngine for LineEngine {
        fn version(&self) -> String {
            "0.0.0-test".to_string()
        }

        fn bundle(&self, options: &EngineOptions, hooks: Option<Arc<dyn EngineHooks>>) -> EngineOutput {
            self.seen.lock().unwrap().push(options.clone());
            let input = &options.entry_points[0].input_path;
            if let Some(fs) = &self.fs {
                *self.bootstrap_existed.lock().unwrap() = fs.is_file(input);
            }

            let Some(hooks) = hooks else {
                return EngineOutput::default();
            };

            let mut output = EngineOutput::default();
            let mut bundle = Vec::new();
            let mut queue = vec![(input.clone(), String::new())];

            while let Some((specifier, importer)) = queue.pop() {
                let resolve_dir = vpath::parent(if importer.is_empty() { &specifier } else { &importer });
                let path = match hooks.on_resolve(&ResolveArgs {
                    path: &specifier,
                    importer: &importer,
                    resolve_dir: &resolve_dir,
                }) {
                    Ok(path) => path,
                    Err(diag) => {
                        output.errors.push(diag);
                        continue;
                    }
                };
                let module = match hooks.on_load(&path) {
                    Ok(module) => module,
                    Err(diag) => {
                        output.errors.push(diag);
                        continue;
                    }
                };
                let source = String::from_utf8_lossy(&module.contents).into_owned();
                for line in source.lines() {
                    if let Some(import) = line.strip_prefix("import \"").and_then(|l| l.strip_suffix("\";")) {
                        queue.insert(0, (import.to_string(), path.clone()));
                    } else {
                        bundle.extend_from_slice(line.as_bytes());
                        bundle.push(b'\n');
                    }
                }
            }

            output.output_files.push(OutputFile {
                path: vpath::join(&options.outdir, "index.js"),
                contents: bundle,
            });
            output
        }
    }

    struct PanickingEngine;

    impl BundleEngine for PanickingEngine {
        fn version(&self) -> String {
            String::new()
        }

        fn bundle(&self, _: &EngineOptions, _: Option<Arc<dyn EngineHooks>>) -> EngineOutput {
            panic!("engine exploded");
        }
    }

    fn sandbox_project() -> Arc<MemoryTransport> {
        Arc::new(MemoryTransport::with_files(&[
            ("/projects/demo/index.ts", "import \"./util\";\nconsole.log('entry');"),
            ("/projects/demo/util.ts", "export const util = 1;"),
            ("/projects/demo/.build/index.css", "body {}"),
            ("/lib/components/snackbar.css", ".snackbar {}"),
            ("/lib/bridge/index.ts", "export const bridge = 1;"),
        ]))
    }

    fn sandbox_orchestrator(
        transport: Arc<MemoryTransport>,
        engine: Arc<dyn BundleEngine>,
        reporter: Arc<MemoryReporter>,
    ) -> Orchestrator {
        let fs: Arc<dyn FileSystem> = Arc::new(SandboxFs::new(transport));
        let config = Config::default().with_target(Target::Sandbox);
        Orchestrator::new(config, fs, engine, reporter)
    }

    fn tmp_files(transport: &MemoryTransport) -> Vec<String> {
        transport
            .file_paths()
            .into_iter()
            .filter(|p| p.starts_with("/tmp/"))
            .collect()
    }

    #[test]
    fn test_sandbox_build_end_to_end() {
        let transport = sandbox_project();
        let reporter = Arc::new(MemoryReporter::new());
        let fs: Arc<dyn FileSystem> = Arc::new(SandboxFs::new(transport.clone()));
        let engine = Arc::new(LineEngine {
            fs: Some(fs),
            ..LineEngine::default()
        });
        let orch = sandbox_orchestrator(transport.clone(), engine.clone(), reporter.clone());

        let result = orch.run_build(&orch.request("projects/demo", 42));

        assert!(result.is_success(), "{:?}", result.diagnostics);
        assert_eq!(result.artifacts.len(), 1);
        assert_eq!(result.artifacts[0].path, "/projects/demo/.build/index.js");

        let bundle = String::from_utf8(result.artifacts[0].contents.clone()).unwrap();
        let css = bundle.find("body {}").unwrap();
        let snackbar = bundle.find(".snackbar {}").unwrap();
        let bridge = bundle.find("bridge = 1").unwrap();
        let entry = bundle.find("console.log('entry')").unwrap();
        assert!(css < snackbar && snackbar < bridge && bridge < entry);
        assert!(bundle.contains("util = 1"));

        assert!(transport
            .file_paths()
            .contains(&"/projects/demo/.build/index.js".to_string()));
        assert!(*engine.bootstrap_existed.lock().unwrap());
        assert!(tmp_files(&transport).is_empty());

        let reports = reporter.build_reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].build_id, 42);
        assert!(reports[0].diagnostics.is_empty());
    }

    #[test]
    fn test_sandbox_engine_options() {
        let engine = Arc::new(LineEngine::default());
        let orch = sandbox_orchestrator(sandbox_project(), engine.clone(), Arc::new(MemoryReporter::new()));
        orch.run_build(&orch.request("/projects/demo", 1));

        let seen = engine.seen.lock().unwrap();
        let options = &seen[0];
        assert_eq!(options.entry_points.len(), 1);
        assert_eq!(options.entry_points[0].output_path, "index");
        assert!(options.entry_points[0].input_path.starts_with("/tmp/"));
        assert_eq!(options.outdir, "/projects/demo/.build");
        assert!(!options.splitting);
        assert!(!options.write);
        assert!(options.bundle);
        assert_eq!(options.format, OutputFormat::Esm);
        assert_eq!(options.sourcemap, SourceMap::InlineAndExternal);
        assert_eq!(
            options.node_paths,
            vec!["/lib".to_string(), "/projects/demo/node_modules".to_string()]
        );
    }

    #[test]
    fn test_unresolved_import_is_reported_and_cleaned_up() {
        let transport = sandbox_project();
        transport.insert_file("/projects/demo/index.ts", b"import \"missing-pkg\";");
        let reporter = Arc::new(MemoryReporter::new());
        let orch = sandbox_orchestrator(transport.clone(), Arc::new(LineEngine::default()), reporter.clone());

        let result = orch.run_build(&orch.request("/projects/demo", 3));

        assert!(!result.is_success());
        assert_eq!(result.error_count(), 1);
        assert_eq!(result.diagnostics[0].id, codes::RESOLVE_UNRESOLVED);
        assert!(tmp_files(&transport).is_empty());
        assert_eq!(reporter.build_reports()[0].diagnostics, result.diagnostics);
    }

    #[test]
    fn test_engine_panic_still_cleans_up_and_reports() {
        let transport = sandbox_project();
        let reporter = Arc::new(MemoryReporter::new());
        let orch = sandbox_orchestrator(transport.clone(), Arc::new(PanickingEngine), reporter.clone());

        let result = orch.run_build(&orch.request("/projects/demo", 9));

        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].id, codes::BUILD_ENGINE_PANICKED);
        assert!(result.diagnostics[0].text.contains("engine exploded"));
        assert!(tmp_files(&transport).is_empty());
        assert_eq!(reporter.build_reports()[0].build_id, 9);
    }

    #[test]
    fn test_explicit_entry_bypasses_discovery() {
        let transport = sandbox_project();
        transport.insert_file("/projects/demo/main.tsx", b"console.log('main');");
        let orch = sandbox_orchestrator(
            transport,
            Arc::new(LineEngine::default()),
            Arc::new(MemoryReporter::new()),
        );

        let result = orch.run_build(&orch.request("/projects/demo", 5).with_entry("main.tsx"));

        let bundle = String::from_utf8(result.artifacts[0].contents.clone()).unwrap();
        assert!(bundle.contains("console.log('main')"));
        assert!(!bundle.contains("console.log('entry')"));
    }

    #[test]
    fn test_project_without_entry_still_builds() {
        let transport = Arc::new(MemoryTransport::with_files(&[
            ("/p/.build/index.css", ""),
            ("/lib/components/snackbar.css", ""),
            ("/lib/bridge.ts", ""),
        ]));
        let orch = sandbox_orchestrator(
            transport,
            Arc::new(LineEngine::default()),
            Arc::new(MemoryReporter::new()),
        );
        assert!(orch.run_build(&orch.request("/p", 1)).is_success());
    }

    #[test]
    fn test_disk_mode_lets_engine_write() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.js"), "").unwrap();
        let root = vpath::to_slash(&dir.path().to_string_lossy());
        let tmp = dir.path().join("tmp");

        let engine = Arc::new(LineEngine::default());
        let reporter = Arc::new(MemoryReporter::new());
        let config = Config::default()
            .with_tmp_dir(vpath::to_slash(&tmp.to_string_lossy()))
            .with_library_root("/editor/lib");
        let orch = Orchestrator::new(config, Arc::new(DiskFs::new()), engine.clone(), reporter.clone());

        let result = orch.run_build(&orch.request(root.clone(), 11));

        assert!(result.artifacts.is_empty());
        let options = engine.seen.lock().unwrap()[0].clone();
        assert!(options.splitting);
        assert!(options.write);
        assert_eq!(options.node_paths[0], "/editor/lib");
        assert_eq!(options.outdir, vpath::join(&root, ".build"));
        assert_eq!(std::fs::read_dir(&tmp).unwrap().count(), 0);
        assert_eq!(reporter.messages()[0].0, BUILD_CHANNEL);
    }

    #[test]
    fn test_bootstrap_write_failure_is_reported() {
        let transport = sandbox_project();
        // A file where the temp directory should be.
        transport.insert_file("/tmp", b"");
        let reporter = Arc::new(MemoryReporter::new());
        let engine = Arc::new(LineEngine::default());
        let orch = sandbox_orchestrator(transport, engine.clone(), reporter.clone());

        let result = orch.run_build(&orch.request("/projects/demo", 2));

        assert_eq!(result.diagnostics[0].id, codes::BUILD_BOOTSTRAP_WRITE_FAILED);
        assert!(engine.seen.lock().unwrap().is_empty());
        assert_eq!(reporter.build_reports().len(), 1);
    }

    #[test]
    fn test_spawn_build_reports() {
        let reporter = Arc::new(MemoryReporter::new());
        let orch = sandbox_orchestrator(sandbox_project(), Arc::new(LineEngine::default()), reporter.clone());

        let handles: Vec<_> = (0..4)
            .map(|id| orch.spawn_build(orch.request("/projects/demo", id)).unwrap())
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let mut ids: Vec<u32> = reporter.build_reports().iter().map(|r| r.build_id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_spawn_build_delivers_diagnostics_on_channel_only() {
        let transport = sandbox_project();
        transport.insert_file("/projects/demo/index.ts", b"import \"./gone\";");
        let reporter = Arc::new(MemoryReporter::new());
        let orch = sandbox_orchestrator(transport.clone(), Arc::new(LineEngine::default()), reporter.clone());

        orch.spawn_build(orch.request("/projects/demo", 11))
            .unwrap()
            .join()
            .unwrap();

        let messages = reporter.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].0, BUILD_CHANNEL);

        let reports = reporter.build_reports();
        assert_eq!(reports[0].build_id, 11);
        assert!(reports[0]
            .diagnostics
            .iter()
            .any(|d| d.id == codes::RESOLVE_UNRESOLVED && d.text.contains("./gone")));
        assert!(tmp_files(&transport).is_empty());
    }

    #[test]
    fn test_engine_version() {
        let orch = sandbox_orchestrator(
            sandbox_project(),
            Arc::new(LineEngine::default()),
            Arc::new(MemoryReporter::new()),
        );
        assert_eq!(orch.engine_version(), "0.0.0-test");
    }
}

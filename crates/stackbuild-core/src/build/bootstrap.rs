//! Synthesized bootstrap module.
//!
//! A build never starts from the project's entry file directly. It starts from
//! a temporary module that imports, in order:
//!
//! 1. the project's compiled stylesheet (`<project>/.build/index.css`)
//! 2. the shared UI stylesheet
//! 3. the runtime bridge
//! 4. the entry file, if the project has one
//!
//! Styles load before the runtime and the runtime before user code.

use crate::config::BootstrapConfig;
use crate::vfs::{FileSystem, FsResult};
use stackbuild_util::{hash, vpath};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Project-relative output directory.
pub const BUILD_DIR: &str = ".build";

/// Length of the random part of bootstrap file names.
const NAME_LEN: usize = 10;

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Inputs to the bootstrap source.
#[derive(Debug, Clone, Copy)]
pub struct BootstrapInputs<'a> {
    pub project_dir: &'a str,
    /// Entry file name inside `project_dir`.
    pub entry: Option<&'a str>,
    /// Force project paths to start with `/`.
    pub sandbox: bool,
}

/// Where the compiled project stylesheet lives.
#[must_use]
pub fn compiled_stylesheet(project_dir: &str) -> String {
    vpath::join_all(&[project_dir, BUILD_DIR, "index.css"])
}

/// Render the bootstrap module source.
#[must_use]
pub fn render_bootstrap(inputs: &BootstrapInputs<'_>, config: &BootstrapConfig) -> String {
    let project_path = |path: String| {
        if inputs.sandbox && !path.starts_with('/') {
            format!("/{path}")
        } else {
            path
        }
    };

    let mut imports = vec![
        project_path(compiled_stylesheet(inputs.project_dir)),
        config.shared_stylesheet.clone(),
        config.runtime_module.clone(),
    ];
    if let Some(entry) = inputs.entry {
        imports.push(project_path(vpath::join(inputs.project_dir, entry)));
    }

    imports
        .iter()
        .map(|specifier| format!("import {};\n", serde_json::Value::from(specifier.as_str())))
        .collect()
}

/// A bootstrap module on disk or in the sandbox. Removed when dropped.
pub struct BootstrapModule {
    fs: Arc<dyn FileSystem>,
    path: String,
}

impl std::fmt::Debug for BootstrapModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapModule")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl BootstrapModule {
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl Drop for BootstrapModule {
    fn drop(&mut self) {
        match self.fs.unlink(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path, "removed bootstrap module"),
            Err(e) => tracing::warn!(path = %self.path, error = %e, "failed to remove bootstrap module"),
        }
    }
}

/// Write the bootstrap module into `tmp_dir` under a fresh name.
///
/// # Errors
/// Returns an error if the file cannot be written.
pub fn synthesize_bootstrap(
    fs: &Arc<dyn FileSystem>,
    tmp_dir: &str,
    inputs: &BootstrapInputs<'_>,
    config: &BootstrapConfig,
) -> FsResult<BootstrapModule> {
    let source = render_bootstrap(inputs, config);
    let path = vpath::join(tmp_dir, &format!("{}.js", unique_name(inputs.project_dir)));
    let path = if inputs.sandbox && !path.starts_with('/') {
        format!("/{path}")
    } else {
        path
    };

    fs.write_file(&path, source.as_bytes())?;
    tracing::debug!(%path, entry = ?inputs.entry, "wrote bootstrap module");

    Ok(BootstrapModule {
        fs: Arc::clone(fs),
        path,
    })
}

fn unique_name(project_dir: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);

    hash::short_token(
        &[
            project_dir.as_bytes(),
            &nanos.to_le_bytes(),
            &seq.to_le_bytes(),
            &std::process::id().to_le_bytes(),
        ],
        NAME_LEN,
    )
}

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for stackbuild operations.
///
/// Filesystem and resolution failures have their own types
/// ([`crate::FsError`], [`crate::ResolveError`]) and are turned into build
/// diagnostics rather than surfacing here.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to read config at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

//! Filesystem abstraction.
//!
//! Resolution and build orchestration never touch `std::fs` directly; they go
//! through [`FileSystem`], which has two backends:
//!
//! - [`DiskFs`]: the host disk.
//! - [`SandboxFs`]: every call is forwarded through a [`Transport`] to
//!   whatever owns the real files (a host process, a JS runtime, or the
//!   in-process [`MemoryTransport`]).
//!
//! A backend is selected once per process ([`for_target`]) and shared as an
//! `Arc<dyn FileSystem>`. All paths are `/`-separated and normalized before
//! lookup.

mod disk;
mod memory;
mod sandbox;
mod stream;

pub use disk::DiskFs;
pub use memory::MemoryTransport;
pub use sandbox::{SandboxFs, Transport};
pub use stackbuild_proto::DirEntry;
pub use stream::{serve_requests, StreamTransport};

use crate::config::Target;
use std::sync::Arc;
use thiserror::Error;

/// Result of an existence probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Existence {
    pub exists: bool,
    pub is_file: bool,
}

impl Existence {
    /// Nothing at that path (or it could not be confirmed).
    pub const MISSING: Self = Self {
        exists: false,
        is_file: false,
    };

    /// A regular file.
    pub const FILE: Self = Self {
        exists: true,
        is_file: true,
    };

    /// A directory.
    pub const DIR: Self = Self {
        exists: true,
        is_file: false,
    };

    #[must_use]
    pub fn is_file(self) -> bool {
        self.exists && self.is_file
    }

    #[must_use]
    pub fn is_dir(self) -> bool {
        self.exists && !self.is_file
    }
}

/// Filesystem error.
#[derive(Error, Debug)]
pub enum FsError {
    #[error("not found: {path}")]
    NotFound { path: String },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("sandbox call failed at {path}: {message}")]
    Transport { path: String, message: String },
}

impl FsError {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub(crate) fn from_io(path: &str, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound {
                path: path.to_string(),
            }
        } else {
            Self::Io {
                path: path.to_string(),
                source,
            }
        }
    }
}

pub type FsResult<T> = Result<T, FsError>;

/// Capability interface over a filesystem.
///
/// Implementations must tolerate concurrent calls: the bundling engine
/// invokes hooks from several worker threads at once.
pub trait FileSystem: Send + Sync {
    /// Probe a path. Errors collapse into [`Existence::MISSING`].
    fn exists(&self, path: &str) -> Existence;

    /// Read a whole file.
    fn read_file(&self, path: &str) -> FsResult<Vec<u8>>;

    /// List a directory. Names are relative to `path`.
    fn list_dir(&self, path: &str, recursive: bool) -> FsResult<Vec<DirEntry>>;

    /// Write a whole file, creating parent directories.
    fn write_file(&self, path: &str, data: &[u8]) -> FsResult<()>;

    /// Create a directory and its parents.
    fn mkdir(&self, path: &str) -> FsResult<()>;

    fn rename(&self, from: &str, to: &str) -> FsResult<()>;

    /// Remove a file.
    fn unlink(&self, path: &str) -> FsResult<()>;

    /// Whether `path` is an existing regular file.
    fn is_file(&self, path: &str) -> bool {
        self.exists(path).is_file()
    }

    /// Whether `path` is an existing directory.
    fn is_dir(&self, path: &str) -> bool {
        self.exists(path).is_dir()
    }
}

/// Select the backend for a process.
///
/// The sandbox target needs the transport that reaches the real files; the
/// disk target ignores it.
#[must_use]
pub fn for_target(target: Target, transport: Option<Arc<dyn Transport>>) -> Arc<dyn FileSystem> {
    match (target, transport) {
        (Target::Sandbox, Some(transport)) => Arc::new(SandboxFs::new(transport)),
        (Target::Sandbox, None) => {
            tracing::warn!("sandbox target without a transport, using an empty in-memory tree");
            Arc::new(SandboxFs::new(Arc::new(MemoryTransport::new())))
        }
        (Target::Disk, _) => Arc::new(DiskFs::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_existence_helpers() {
        assert!(Existence::FILE.is_file());
        assert!(!Existence::FILE.is_dir());
        assert!(Existence::DIR.is_dir());
        assert!(!Existence::MISSING.is_file());
        assert!(!Existence::MISSING.is_dir());
    }

    #[test]
    fn test_from_io_maps_not_found() {
        let err = FsError::from_io("/x", std::io::Error::from(std::io::ErrorKind::NotFound));
        assert!(err.is_not_found());
        let err = FsError::from_io(
            "/x",
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        );
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_for_target_sandbox_uses_transport() {
        let transport = Arc::new(MemoryTransport::new());
        transport.insert_file("/p/a.ts", b"export {}");
        let fs = for_target(Target::Sandbox, Some(transport as Arc<dyn Transport>));
        assert!(fs.is_file("/p/a.ts"));
        assert!(fs.is_dir("/p"));
    }
}

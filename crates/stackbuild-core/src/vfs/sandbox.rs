use super::{DirEntry, Existence, FileSystem, FsError, FsResult};
use stackbuild_proto::{codes, FsRequest, FsResponse};
use stackbuild_util::vpath;
use std::sync::Arc;

/// The boundary a sandboxed build talks through.
///
/// `call` blocks until the other side answers, even if the underlying channel
/// is asynchronous, so resolution never observes a partial result.
pub trait Transport: Send + Sync {
    fn call(&self, request: FsRequest) -> FsResponse;
}

/// Filesystem backend that forwards every call through a [`Transport`].
#[derive(Clone)]
pub struct SandboxFs {
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for SandboxFs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SandboxFs").finish_non_exhaustive()
    }
}

impl SandboxFs {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    fn unexpected(path: &str, response: &FsResponse) -> FsError {
        FsError::Transport {
            path: path.to_string(),
            message: format!("unexpected response: {response:?}"),
        }
    }

    fn failure(path: &str, code: &str, message: String) -> FsError {
        if code == codes::FS_NOT_FOUND {
            FsError::NotFound {
                path: path.to_string(),
            }
        } else {
            FsError::Transport {
                path: path.to_string(),
                message,
            }
        }
    }

    fn expect_done(&self, path: &str, request: FsRequest) -> FsResult<()> {
        match self.transport.call(request) {
            FsResponse::Done => Ok(()),
            FsResponse::Error { code, message } => Err(Self::failure(path, &code, message)),
            other => Err(Self::unexpected(path, &other)),
        }
    }
}

/// Sandbox paths have no working directory: a relative path is taken from the
/// root.
fn rooted(path: &str) -> String {
    vpath::clean(&format!("/{path}"))
}

impl FileSystem for SandboxFs {
    fn exists(&self, path: &str) -> Existence {
        let path = rooted(path);
        match self.transport.call(FsRequest::Exists { path: path.clone() }) {
            FsResponse::Exists { exists, is_file } => Existence { exists, is_file },
            FsResponse::Error { code, message } => {
                tracing::warn!(%path, %code, %message, "sandbox exists failed, treating as missing");
                Existence::MISSING
            }
            other => {
                tracing::warn!(%path, response = ?other, "unexpected sandbox response to exists");
                Existence::MISSING
            }
        }
    }

    fn read_file(&self, path: &str) -> FsResult<Vec<u8>> {
        let path = rooted(path);
        match self.transport.call(FsRequest::ReadFile { path: path.clone() }) {
            FsResponse::Data { data } => Ok(data),
            FsResponse::Error { code, message } => Err(Self::failure(&path, &code, message)),
            other => Err(Self::unexpected(&path, &other)),
        }
    }

    fn list_dir(&self, path: &str, recursive: bool) -> FsResult<Vec<DirEntry>> {
        let path = rooted(path);
        match self.transport.call(FsRequest::ReadDir {
            path: path.clone(),
            recursive,
        }) {
            FsResponse::Entries { entries } => Ok(entries),
            FsResponse::Error { code, message } => Err(Self::failure(&path, &code, message)),
            other => Err(Self::unexpected(&path, &other)),
        }
    }

    fn write_file(&self, path: &str, data: &[u8]) -> FsResult<()> {
        let path = rooted(path);
        self.expect_done(
            &path,
            FsRequest::WriteFile {
                path: path.clone(),
                data: data.to_vec(),
            },
        )
    }

    fn mkdir(&self, path: &str) -> FsResult<()> {
        let path = rooted(path);
        self.expect_done(&path, FsRequest::Mkdir { path: path.clone() })
    }

    fn rename(&self, from: &str, to: &str) -> FsResult<()> {
        let from = rooted(from);
        self.expect_done(
            &from,
            FsRequest::Rename {
                from: from.clone(),
                to: rooted(to),
            },
        )
    }

    fn unlink(&self, path: &str) -> FsResult<()> {
        let path = rooted(path);
        self.expect_done(&path, FsRequest::Unlink { path: path.clone() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::MemoryTransport;
    use std::sync::Mutex;

    /// Records every request and answers from a canned response.
    struct Recording {
        seen: Mutex<Vec<FsRequest>>,
        answer: FsResponse,
    }

    impl Transport for Recording {
        fn call(&self, request: FsRequest) -> FsResponse {
            self.seen.lock().unwrap().push(request);
            self.answer.clone()
        }
    }

    #[test]
    fn test_paths_are_normalized_before_forwarding() {
        let rec = Arc::new(Recording {
            seen: Mutex::new(Vec::new()),
            answer: FsResponse::Exists {
                exists: true,
                is_file: true,
            },
        });
        let fs = SandboxFs::new(rec.clone());

        assert!(fs.is_file("/p/src/../lib//a.ts"));
        assert_eq!(
            rec.seen.lock().unwrap()[0],
            FsRequest::Exists {
                path: "/p/lib/a.ts".into()
            }
        );
    }

    #[test]
    fn test_relative_paths_are_rooted() {
        let fs = SandboxFs::new(Arc::new(MemoryTransport::with_files(&[("/p/a.ts", "")])));
        assert!(fs.is_file("p/a.ts"));
        assert!(fs.is_dir("./p"));
    }

    #[test]
    fn test_error_on_exists_is_missing() {
        let fs = SandboxFs::new(Arc::new(Recording {
            seen: Mutex::new(Vec::new()),
            answer: FsResponse::error(codes::FS_IO_ERROR, "boom"),
        }));
        assert_eq!(fs.exists("/a"), Existence::MISSING);
    }

    #[test]
    fn test_not_found_code_maps_to_not_found() {
        let fs = SandboxFs::new(Arc::new(MemoryTransport::new()));
        assert!(fs.read_file("/missing.ts").unwrap_err().is_not_found());
    }

    #[test]
    fn test_unexpected_response_is_transport_error() {
        let fs = SandboxFs::new(Arc::new(Recording {
            seen: Mutex::new(Vec::new()),
            answer: FsResponse::Done,
        }));
        assert!(matches!(
            fs.read_file("/a"),
            Err(FsError::Transport { .. })
        ));
    }

    #[test]
    fn test_round_trip_through_memory() {
        let fs = SandboxFs::new(Arc::new(MemoryTransport::new()));
        fs.write_file("/proj/.build/index.js", b"out").unwrap();
        assert_eq!(fs.read_file("/proj/.build/index.js").unwrap(), b"out");
        assert!(fs.is_dir("/proj/.build"));

        fs.rename("/proj/.build/index.js", "/proj/.build/main.js").unwrap();
        assert!(!fs.is_file("/proj/.build/index.js"));
        fs.unlink("/proj/.build/main.js").unwrap();
        assert!(fs.list_dir("/proj/.build", false).unwrap().is_empty());
    }
}

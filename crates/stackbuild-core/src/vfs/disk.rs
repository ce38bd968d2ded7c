use super::{DirEntry, Existence, FileSystem, FsError, FsResult};
use stackbuild_util::{fs as ufs, vpath};
use std::fs;
use std::path::PathBuf;
use walkdir::WalkDir;

/// Direct access to the host disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskFs;

impl DiskFs {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn host(path: &str) -> PathBuf {
        PathBuf::from(vpath::clean(path))
    }
}

impl FileSystem for DiskFs {
    fn exists(&self, path: &str) -> Existence {
        match fs::metadata(Self::host(path)) {
            Ok(meta) => Existence {
                exists: true,
                is_file: meta.is_file(),
            },
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path, error = %e, "stat failed, treating as missing");
                }
                Existence::MISSING
            }
        }
    }

    fn read_file(&self, path: &str) -> FsResult<Vec<u8>> {
        fs::read(Self::host(path)).map_err(|e| FsError::from_io(path, e))
    }

    fn list_dir(&self, path: &str, recursive: bool) -> FsResult<Vec<DirEntry>> {
        let root = Self::host(path);

        if !recursive {
            let mut entries = Vec::new();
            for entry in fs::read_dir(&root).map_err(|e| FsError::from_io(path, e))? {
                let entry = entry.map_err(|e| FsError::from_io(path, e))?;
                let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
                entries.push(DirEntry {
                    name: entry.file_name().to_string_lossy().into_owned(),
                    is_dir,
                });
            }
            return Ok(entries);
        }

        if !root.is_dir() {
            return Err(FsError::NotFound {
                path: path.to_string(),
            });
        }

        let mut entries = Vec::new();
        for entry in WalkDir::new(&root).min_depth(1) {
            let entry = entry.map_err(|e| FsError::Io {
                path: path.to_string(),
                source: e.into(),
            })?;
            let Ok(rel) = entry.path().strip_prefix(&root) else {
                continue;
            };
            entries.push(DirEntry {
                name: vpath::to_slash(&rel.to_string_lossy()),
                is_dir: entry.file_type().is_dir(),
            });
        }
        Ok(entries)
    }

    fn write_file(&self, path: &str, data: &[u8]) -> FsResult<()> {
        ufs::write_atomic(&Self::host(path), data).map_err(|e| FsError::from_io(path, e))
    }

    fn mkdir(&self, path: &str) -> FsResult<()> {
        fs::create_dir_all(Self::host(path)).map_err(|e| FsError::from_io(path, e))
    }

    fn rename(&self, from: &str, to: &str) -> FsResult<()> {
        fs::rename(Self::host(from), Self::host(to)).map_err(|e| FsError::from_io(from, e))
    }

    fn unlink(&self, path: &str) -> FsResult<()> {
        fs::remove_file(Self::host(path)).map_err(|e| FsError::from_io(path, e))
    }
}

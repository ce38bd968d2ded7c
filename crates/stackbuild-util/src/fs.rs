use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

static TEMP_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Write bytes to `path`, creating missing parent directories first.
///
/// The bytes land in a sibling temp file that is renamed over the target, so
/// readers observe either the previous contents or the new ones.
///
/// # Errors
/// Returns an error if a parent directory cannot be created, or the write or
/// rename fails.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent)?;

    let temp_path = sibling_temp_path(&parent, path);
    {
        let mut file = File::create(&temp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }

    if let Err(e) = fs::rename(&temp_path, path) {
        // Windows refuses to rename over an existing file.
        if cfg!(windows) && path.exists() {
            fs::copy(&temp_path, path)?;
            let _ = fs::remove_file(&temp_path);
            return Ok(());
        }
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    Ok(())
}

/// Unique per call, so writers racing on one target never share a temp file.
fn sibling_temp_path(parent: &Path, target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("file");
    let seq = TEMP_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    parent.join(format!(".{name}.tmp.{}.{seq}", std::process::id()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_write_atomic_overwrites() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.js");

        write_atomic(&path, b"first").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "first");

        write_atomic(&path, b"second").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
    }

    #[test]
    fn test_write_atomic_creates_parents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".build").join("chunks").join("a.js");

        write_atomic(&path, b"chunk").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"chunk");
    }

    #[test]
    fn test_write_atomic_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("index.js");

        write_atomic(&path, b"content").unwrap();

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["index.js".to_string()]);
    }

    #[test]
    fn test_sibling_temp_paths_differ_per_call() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("index.js");

        let first = sibling_temp_path(dir.path(), &target);
        let second = sibling_temp_path(dir.path(), &target);
        assert_ne!(first, second);
    }

    #[test]
    fn test_write_atomic_concurrent_writers() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("index.js");

        let handles: Vec<_> = (0..8)
            .map(|writer| {
                let path = path.clone();
                std::thread::spawn(move || {
                    let body = format!("writer-{writer}");
                    for _ in 0..20 {
                        write_atomic(&path, body.as_bytes()).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let contents = fs::read_to_string(&path).unwrap();
        assert!(
            (0..8).any(|w| contents == format!("writer-{w}")),
            "torn write: {contents:?}"
        );
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["index.js".to_string()]);
    }
}

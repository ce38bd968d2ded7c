//! Forward-slash path algebra.
//!
//! Every path that crosses the filesystem abstraction is a `/`-separated
//! string, whether it names a file on the host disk or inside a sandboxed
//! virtual tree. These helpers operate purely lexically and never touch the
//! filesystem.

/// Replace Windows separators with `/`.
#[must_use]
pub fn to_slash(path: &str) -> String {
    path.replace('\\', "/")
}

/// Whether a specifier or path is absolute.
///
/// Recognises `/root`, drive-letter paths (`C:/`, `C:\`), and UNC paths.
#[must_use]
pub fn is_absolute(path: &str) -> bool {
    if path.starts_with('/') || path.starts_with("\\\\") {
        return true;
    }

    let bytes = path.as_bytes();
    bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes[2] == b'/' || bytes[2] == b'\\')
}

/// Lexically normalize a path.
///
/// - repeated separators collapse to one
/// - `.` segments are dropped
/// - `..` removes the preceding segment; at the root it is dropped, in a
///   relative path with nothing left to remove it is kept
/// - trailing separators are removed (except for `/` itself)
/// - an empty result becomes `.`
#[must_use]
pub fn clean(path: &str) -> String {
    let path = to_slash(path);
    let rooted = path.starts_with('/');
    let mut out: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match out.last() {
                Some(&last) if last != ".." => {
                    out.pop();
                }
                _ if rooted => {}
                _ => out.push(".."),
            },
            other => out.push(other),
        }
    }

    let joined = out.join("/");
    match (rooted, joined.is_empty()) {
        (true, _) => format!("/{joined}"),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

/// Join path elements and normalize the result.
///
/// Empty elements are ignored; joining nothing yields an empty string.
#[must_use]
pub fn join_all(parts: &[&str]) -> String {
    let non_empty: Vec<&str> = parts.iter().copied().filter(|p| !p.is_empty()).collect();
    if non_empty.is_empty() {
        return String::new();
    }
    clean(&non_empty.join("/"))
}

/// Join two path elements and normalize the result.
#[must_use]
pub fn join(base: &str, rel: &str) -> String {
    join_all(&[base, rel])
}

/// The final segment of a path (empty for `/`).
#[must_use]
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Everything before the final segment, cleaned.
#[must_use]
pub fn parent(path: &str) -> String {
    match path.rfind('/') {
        Some(0) => "/".to_string(),
        Some(idx) => clean(&path[..idx]),
        None => ".".to_string(),
    }
}

/// Extension of the final segment, without the dot.
///
/// Dotfiles such as `.babelrc` have no extension.
#[must_use]
pub fn extension(path: &str) -> Option<&str> {
    let name = file_name(path);
    match name.rfind('.') {
        Some(0) | None => None,
        Some(idx) => Some(&name[idx + 1..]),
    }
}

/// Remove the extension from the final segment, leaving directories intact.
#[must_use]
pub fn strip_extension(path: &str) -> &str {
    match extension(path) {
        Some(ext) => &path[..path.len() - ext.len() - 1],
        None => path,
    }
}

/// Whether `path` lies strictly below `ancestor` (both already clean).
#[must_use]
pub fn is_descendant(path: &str, ancestor: &str) -> bool {
    if ancestor == "/" {
        return path.len() > 1 && path.starts_with('/');
    }
    path.len() > ancestor.len()
        && path.starts_with(ancestor)
        && path.as_bytes()[ancestor.len()] == b'/'
}

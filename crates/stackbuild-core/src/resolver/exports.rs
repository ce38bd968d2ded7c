//! Package `exports` evaluation.
//!
//! Produces a candidate path inside the package directory; the caller still
//! runs it through the extension probe before accepting it.
//!
//! Supported shapes:
//! - `"exports": "./index.js"`: every subpath maps to the one entry
//! - `"exports": ["./a.js", "./b.js"]`: first entry starting with the subpath
//! - `"exports": { ".": ..., "./feature": ..., "./utils/*": ... }`
//!
//! Conditions are not negotiated: `default` is preferred, then `import`.

use super::manifest::Exports;
use stackbuild_util::vpath;

/// Condition names honoured, in preference order.
const CONDITIONS: &[&str] = &["default", "import"];

/// Map `subpath` (`"./"`, `"./feature"`, ...) through a package's exports.
///
/// Returns the joined candidate path, or `None` when nothing matches.
#[must_use]
pub fn package_exports_resolve(package_dir: &str, subpath: &str, exports: &Exports) -> Option<String> {
    match exports {
        Exports::Path(target) => Some(vpath::join(package_dir, target)),
        Exports::List(targets) => resolve_list(package_dir, subpath, targets),
        Exports::Map(entries) => resolve_map(package_dir, subpath, entries),
        Exports::Null => None,
    }
}

fn resolve_list(package_dir: &str, subpath: &str, targets: &[String]) -> Option<String> {
    targets
        .iter()
        .find(|target| target.starts_with(subpath))
        .map(|target| vpath::join(package_dir, target))
}

fn resolve_map(package_dir: &str, subpath: &str, entries: &[(String, Exports)]) -> Option<String> {
    // Condition names at the top level are not routed.
    if let Some((key, _)) = entries.iter().find(|(key, _)| !key.starts_with('.')) {
        tracing::debug!(package_dir, key = %key, "exports map has a non-subpath key, skipping exports");
        return None;
    }

    let subpath = if subpath == "./" { "." } else { subpath };

    if let Some((_, value)) = entries.iter().find(|(key, _)| key == subpath) {
        return match value {
            Exports::List(targets) => resolve_list(package_dir, subpath, targets),
            other => condition_target(other).map(|target| vpath::join(package_dir, target)),
        };
    }

    let (sub_prefix, sub_last) = split_last(subpath);

    for (key, value) in entries {
        // `./*` and `./*.css` are both wildcard keys.
        let key_stem = vpath::strip_extension(key);
        if !key_stem.ends_with('*') {
            continue;
        }

        let (key_prefix, _) = split_last(key_stem);
        if key_prefix != sub_prefix {
            continue;
        }

        let Some(target) = condition_target(value) else {
            continue;
        };

        tracing::trace!(package_dir, key = %key, target, "wildcard export matched");
        return Some(vpath::join(package_dir, &substitute_wildcard(target, sub_last)));
    }

    None
}

/// A string target, or the preferred condition of a one-level condition map.
fn condition_target(value: &Exports) -> Option<&str> {
    match value {
        Exports::Path(target) => Some(target.as_str()),
        Exports::Map(conditions) => CONDITIONS.iter().find_map(|name| {
            conditions.iter().find_map(|(key, value)| match value {
                Exports::Path(target) if key == name => Some(target.as_str()),
                _ => None,
            })
        }),
        Exports::List(_) | Exports::Null => None,
    }
}

/// Split into all components but the last, and the last.
fn split_last(path: &str) -> (Vec<&str>, &str) {
    let mut parts: Vec<&str> = path.split('/').collect();
    let last = parts.pop().unwrap_or_default();
    (parts, last)
}

/// Replace the target's final component with `segment`. Any suffix the
/// target spelled out is dropped; the extension search finds the file.
fn substitute_wildcard(target: &str, segment: &str) -> String {
    match target.rfind('/') {
        Some(idx) => format!("{}{segment}", &target[..=idx]),
        None => segment.to_string(),
    }
}

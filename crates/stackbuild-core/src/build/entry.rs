use crate::vfs::FileSystem;

/// Entry file suffixes, highest priority first.
pub const ENTRY_SUFFIXES: &[&str] = &["index.js", "index.jsx", "index.ts", "index.tsx"];

/// Find the project's entry file among the top-level entries of `project_dir`.
///
/// Suffix priority decides; among files with the same suffix the first one
/// listed wins. Directories are ignored. An unreadable directory has no entry.
#[must_use]
pub fn discover_entry_point(fs: &dyn FileSystem, project_dir: &str) -> Option<String> {
    let entries = match fs.list_dir(project_dir, false) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(project_dir, error = %e, "cannot list project directory");
            return None;
        }
    };

    let entry = ENTRY_SUFFIXES.iter().find_map(|suffix| {
        entries
            .iter()
            .find(|e| !e.is_dir && e.name.ends_with(suffix))
            .map(|e| e.name.clone())
    });

    tracing::debug!(project_dir, entry = entry.as_deref().unwrap_or("<none>"), "entry point");
    entry
}

//! Specifier resolution.
//!
//! Maps an import specifier and the directory it appears in to an existing
//! file, following Node.js conventions condensed to a single flattened
//! dependency directory:
//!
//! - Relative specifiers (`./`, `../`): file probe, then directory probe.
//!   Never looked up in dependency directories.
//! - Bare specifiers: package `exports` under the dependency root, then a flat
//!   file/directory probe under the dependency root, then the same flat probe
//!   under the library root. No upward walk.
//! - Absolute specifiers are a caller error.
//!
//! Every probe goes through [`FileSystem`], so the same algorithm runs against
//! the host disk and the sandbox. Nothing is cached between calls.

mod exports;
mod manifest;

pub use exports::package_exports_resolve;
pub use manifest::{Exports, ManifestError, PackageManifest};

use crate::vfs::FileSystem;
use stackbuild_util::vpath;
use std::sync::Arc;
use thiserror::Error;

/// Suffixes probed for every candidate, in priority order. The empty suffix
/// accepts a specifier that already names the file.
pub const RESOLVE_EXTENSIONS: &[&str] = &["", ".ts", ".tsx", ".js", ".jsx", ".mjs", ".cjs", ".css"];

/// Manifest file name.
const PACKAGE_JSON: &str = "package.json";

/// Resolver configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Flattened dependency directory.
    pub dependency_root: String,
    /// Built-in library directory, consulted last.
    pub library_root: String,
    /// Suffixes to probe (in order).
    pub extensions: &'static [&'static str],
}

impl ResolverConfig {
    #[must_use]
    pub fn new(dependency_root: &str, library_root: &str) -> Self {
        Self {
            dependency_root: vpath::clean(dependency_root),
            library_root: vpath::clean(library_root),
            extensions: RESOLVE_EXTENSIONS,
        }
    }
}

/// Outcome of a resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// An existing regular file.
    Resolved(String),
    Unresolved,
}

impl Resolution {
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::Resolved(path) => Some(path.as_str()),
            Self::Unresolved => None,
        }
    }

    #[must_use]
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    #[must_use]
    pub fn into_path(self) -> Option<String> {
        match self {
            Self::Resolved(path) => Some(path),
            Self::Unresolved => None,
        }
    }
}

impl From<Option<String>> for Resolution {
    fn from(path: Option<String>) -> Self {
        path.map_or(Self::Unresolved, Self::Resolved)
    }
}

/// Resolution error. Only raised for specifiers that can never resolve.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("invalid specifier {0:?}: imports must be relative or bare")]
    InvalidSpecifier(String),
}

/// Specifier resolver over a [`FileSystem`].
///
/// Holds no mutable state; clones share the filesystem handle.
#[derive(Clone)]
pub struct Resolver {
    fs: Arc<dyn FileSystem>,
    config: ResolverConfig,
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Resolver {
    #[must_use]
    pub fn new(fs: Arc<dyn FileSystem>, config: ResolverConfig) -> Self {
        Self { fs, config }
    }

    #[must_use]
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolve `specifier` as imported from a file in `resolve_dir`.
    ///
    /// # Errors
    /// Returns [`ResolveError::InvalidSpecifier`] for absolute or empty
    /// specifiers.
    pub fn resolve(&self, specifier: &str, resolve_dir: &str) -> Result<Resolution, ResolveError> {
        if specifier.is_empty() || vpath::is_absolute(specifier) {
            return Err(ResolveError::InvalidSpecifier(specifier.to_string()));
        }

        let resolved = if specifier.starts_with('.') {
            let path = vpath::join(resolve_dir, specifier);
            self.load_as_file(&path).or_else(|| self.load_as_dir(&path))
        } else {
            self.load_node_modules(specifier)
        };

        match &resolved {
            Some(path) => tracing::debug!(specifier, resolve_dir, %path, "resolved"),
            None => tracing::debug!(specifier, resolve_dir, "unresolved"),
        }

        Ok(resolved.into())
    }

    /// First `<path><ext>` that is a regular file.
    fn load_as_file(&self, path: &str) -> Option<String> {
        self.config.extensions.iter().find_map(|ext| {
            let candidate = format!("{path}{ext}");
            tracing::trace!(%candidate, "probe");
            self.fs.is_file(&candidate).then_some(candidate)
        })
    }

    fn load_index(&self, dir: &str) -> Option<String> {
        self.load_as_file(&vpath::join(dir, "index"))
    }

    /// Directory probe: manifest `main`, then `<main>/index`, then `index`.
    fn load_as_dir(&self, path: &str) -> Option<String> {
        if !self.fs.is_dir(path) {
            return None;
        }

        let manifest_path = vpath::join(path, PACKAGE_JSON);
        if self.fs.exists(&manifest_path).exists {
            match PackageManifest::read(self.fs.as_ref(), &manifest_path) {
                Ok(PackageManifest {
                    main: Some(main), ..
                }) => {
                    let main_path = vpath::join(path, &main);
                    if let Some(found) = self
                        .load_as_file(&main_path)
                        .or_else(|| self.load_index(&main_path))
                    {
                        return Some(found);
                    }
                }
                Ok(_) => {}
                Err(e) => log_manifest_error(&e),
            }
        }

        self.load_index(path)
    }

    fn load_node_modules(&self, specifier: &str) -> Option<String> {
        let deps = &self.config.dependency_root;
        let lib = &self.config.library_root;

        self.load_package_exports(deps, specifier)
            .or_else(|| self.load_flat(deps, specifier))
            .or_else(|| self.load_flat(lib, specifier))
    }

    fn load_flat(&self, root: &str, specifier: &str) -> Option<String> {
        let path = vpath::join(root, specifier);
        self.load_as_file(&path).or_else(|| self.load_as_dir(&path))
    }

    /// Find the nearest manifest along the specifier's components and route
    /// the remainder through its `exports`.
    fn load_package_exports(&self, root: &str, specifier: &str) -> Option<String> {
        let components: Vec<&str> = specifier.split('/').filter(|c| !c.is_empty()).collect();

        let (package_dir, manifest_path, split) = (1..=components.len()).rev().find_map(|n| {
            let package_dir = vpath::join(root, &components[..n].join("/"));
            let manifest_path = vpath::join(&package_dir, PACKAGE_JSON);
            self.fs
                .is_file(&manifest_path)
                .then_some((package_dir, manifest_path, n))
        })?;

        let manifest = match PackageManifest::read(self.fs.as_ref(), &manifest_path) {
            Ok(manifest) => manifest,
            Err(e) => {
                log_manifest_error(&e);
                return None;
            }
        };
        let exports = manifest.exports?;

        let subpath = format!("./{}", components[split..].join("/"));
        tracing::debug!(%package_dir, %subpath, "routing through package exports");

        let target = package_exports_resolve(&package_dir, &subpath, &exports)?;
        let found = self.load_as_file(&target);
        if found.is_none() {
            tracing::debug!(%package_dir, %subpath, %target, "exports target does not exist");
        }
        found
    }
}

fn log_manifest_error(error: &ManifestError) {
    match error {
        ManifestError::Read { path, source } if !source.is_not_found() => {
            tracing::warn!(%path, error = %source, "failed to read package manifest");
        }
        ManifestError::Read { .. } => {}
        ManifestError::Parse { path, source } => {
            tracing::debug!(%path, error = %source, "unparsable package manifest, ignoring");
        }
    }
}

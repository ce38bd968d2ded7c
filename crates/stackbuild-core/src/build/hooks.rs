//! Resolve and load hooks lent to the engine in sandbox mode.
//!
//! The engine cannot see sandboxed files, so every import it meets is routed
//! back here: [`EngineHooks::on_resolve`] maps a specifier to a path and
//! [`EngineHooks::on_load`] hands over the bytes.

use super::codes;
use super::loader::{infer_loader, Loader};
use crate::resolver::{Resolution, ResolveError, Resolver};
use crate::vfs::FileSystem;
use stackbuild_proto::Diagnostic;
use std::sync::Arc;

/// Arguments of a resolve callback.
#[derive(Debug, Clone, Copy)]
pub struct ResolveArgs<'a> {
    /// The specifier as written in the source.
    pub path: &'a str,
    /// The importing module, empty for entry points.
    pub importer: &'a str,
    /// Directory relative specifiers are resolved against.
    pub resolve_dir: &'a str,
}

/// A module handed to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedModule {
    pub contents: Vec<u8>,
    pub loader: Loader,
}

/// Callbacks the engine invokes while walking the module graph.
///
/// Errors are reported as diagnostics and do not abort the build.
pub trait EngineHooks: Send + Sync {
    fn on_resolve(&self, args: &ResolveArgs<'_>) -> Result<String, Diagnostic>;

    fn on_load(&self, path: &str) -> Result<LoadedModule, Diagnostic>;
}

/// Hooks backed by the resolver and the sandboxed filesystem.
#[derive(Clone)]
pub struct SandboxHooks {
    resolver: Resolver,
    fs: Arc<dyn FileSystem>,
}

impl std::fmt::Debug for SandboxHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SandboxHooks")
            .field("resolver", &self.resolver)
            .finish_non_exhaustive()
    }
}

impl SandboxHooks {
    #[must_use]
    pub fn new(resolver: Resolver, fs: Arc<dyn FileSystem>) -> Self {
        Self { resolver, fs }
    }
}

impl EngineHooks for SandboxHooks {
    fn on_resolve(&self, args: &ResolveArgs<'_>) -> Result<String, Diagnostic> {
        // Already a sandbox path (bootstrap imports, engine-internal paths).
        if args.path.starts_with('/') {
            return Ok(args.path.to_string());
        }

        match self.resolver.resolve(args.path, args.resolve_dir) {
            Ok(Resolution::Resolved(path)) if path.starts_with('/') => Ok(path),
            Ok(Resolution::Resolved(path)) => Ok(format!("/{path}")),
            Ok(Resolution::Unresolved) => {
                let text = if args.importer.is_empty() {
                    format!("Could not resolve \"{}\"", args.path)
                } else {
                    format!("Could not resolve \"{}\" from {}", args.path, args.importer)
                };
                Err(Diagnostic::error(codes::RESOLVE_UNRESOLVED, text))
            }
            Err(e @ ResolveError::InvalidSpecifier(_)) => {
                Err(Diagnostic::error(codes::RESOLVE_INVALID_SPECIFIER, e.to_string()))
            }
        }
    }

    fn on_load(&self, path: &str) -> Result<LoadedModule, Diagnostic> {
        match self.fs.read_file(path) {
            Ok(contents) => Ok(LoadedModule {
                contents,
                loader: infer_loader(path),
            }),
            Err(e) => {
                tracing::warn!(path, error = %e, "failed to load module");
                Err(Diagnostic::error(codes::LOAD_READ_FAILED, e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::ResolverConfig;
    use crate::vfs::{MemoryTransport, SandboxFs};

    fn hooks(files: &[(&str, &str)]) -> SandboxHooks {
        let fs: Arc<dyn FileSystem> =
            Arc::new(SandboxFs::new(Arc::new(MemoryTransport::with_files(files))));
        let resolver = Resolver::new(fs.clone(), ResolverConfig::new("/node_modules", "/lib"));
        SandboxHooks::new(resolver, fs)
    }

    fn args<'a>(path: &'a str, resolve_dir: &'a str) -> ResolveArgs<'a> {
        ResolveArgs {
            path,
            importer: "/p/index.ts",
            resolve_dir,
        }
    }

    #[test]
    fn test_absolute_paths_pass_through() {
        let h = hooks(&[]);
        assert_eq!(
            h.on_resolve(&args("/p/.build/index.css", "/tmp")).unwrap(),
            "/p/.build/index.css"
        );
    }

    #[test]
    fn test_relative_and_bare_go_through_resolver() {
        let h = hooks(&[("/p/util.ts", ""), ("/lib/bridge/index.ts", "")]);
        assert_eq!(h.on_resolve(&args("./util", "/p")).unwrap(), "/p/util.ts");
        assert_eq!(
            h.on_resolve(&args("bridge", "/tmp")).unwrap(),
            "/lib/bridge/index.ts"
        );
    }

    #[test]
    fn test_relative_result_gets_leading_slash() {
        let h = hooks(&[("/p/util.ts", "")]);
        assert_eq!(h.on_resolve(&args("./util", "p")).unwrap(), "/p/util.ts");
    }

    #[test]
    fn test_unresolved_is_diagnostic() {
        let h = hooks(&[]);
        let diag = h.on_resolve(&args("missing", "/p")).unwrap_err();
        assert_eq!(diag.id, codes::RESOLVE_UNRESOLVED);
        assert!(diag.is_error());
        assert!(diag.text.contains("missing"));
        assert!(diag.text.contains("/p/index.ts"));
    }

    #[test]
    fn test_invalid_specifier_is_diagnostic() {
        let h = hooks(&[]);
        let diag = h.on_resolve(&args("C:/x.ts", "/p")).unwrap_err();
        assert_eq!(diag.id, codes::RESOLVE_INVALID_SPECIFIER);
    }

    #[test]
    fn test_load_infers_loader() {
        let h = hooks(&[("/p/view.tsx", "<div/>"), ("/p/logo.svg", "<svg/>")]);
        let module = h.on_load("/p/view.tsx").unwrap();
        assert_eq!(module.contents, b"<div/>");
        assert_eq!(module.loader, Loader::Tsx);
        assert_eq!(h.on_load("/p/logo.svg").unwrap().loader, Loader::File);
    }

    #[test]
    fn test_load_missing_is_diagnostic() {
        let h = hooks(&[]);
        let diag = h.on_load("/p/gone.ts").unwrap_err();
        assert_eq!(diag.id, codes::LOAD_READ_FAILED);
    }
}

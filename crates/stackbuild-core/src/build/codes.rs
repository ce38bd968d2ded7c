//! Stable diagnostic ids for the build orchestrator.
//!
//! All codes are SCREAMING_SNAKE_CASE and stable across versions. They are the
//! `id` of every [`Diagnostic`](stackbuild_proto::Diagnostic) the orchestrator
//! produces itself; engine diagnostics keep the engine's ids.

/// An import specifier could not be mapped to an existing file.
pub const RESOLVE_UNRESOLVED: &str = "RESOLVE_UNRESOLVED";

/// An import specifier was absolute or empty.
pub const RESOLVE_INVALID_SPECIFIER: &str = "RESOLVE_INVALID_SPECIFIER";

/// A resolved module could not be read.
pub const LOAD_READ_FAILED: &str = "LOAD_READ_FAILED";

/// The bootstrap module could not be written.
pub const BUILD_BOOTSTRAP_WRITE_FAILED: &str = "BUILD_BOOTSTRAP_WRITE_FAILED";

/// The output directory could not be created.
pub const BUILD_OUTDIR_CREATE_FAILED: &str = "BUILD_OUTDIR_CREATE_FAILED";

/// An output artifact could not be persisted.
pub const BUILD_ARTIFACT_WRITE_FAILED: &str = "BUILD_ARTIFACT_WRITE_FAILED";

/// The bundling engine panicked.
pub const BUILD_ENGINE_PANICKED: &str = "BUILD_ENGINE_PANICKED";

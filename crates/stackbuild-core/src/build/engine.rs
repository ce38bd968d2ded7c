//! Boundary to the bundling engine.
//!
//! The engine itself (parsing, transforming, linking, emitting) lives outside
//! this crate. The orchestrator describes a build with [`EngineOptions`],
//! optionally lends it an [`EngineHooks`] pair, and gets back diagnostics plus,
//! when writes are suppressed, the artifacts in memory.

use super::hooks::EngineHooks;
use serde::{Deserialize, Serialize};
use stackbuild_proto::Diagnostic;
use std::sync::Arc;

/// Module format of the emitted bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Esm,
    Cjs,
}

/// Source map emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceMap {
    None,
    Inline,
    External,
    /// A `.map` file next to the output and an inline copy.
    #[default]
    InlineAndExternal,
}

/// One input module and the output name it is emitted under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryPoint {
    pub input_path: String,
    /// Output name without extension (`index` -> `index.js`, `index.css`).
    pub output_path: String,
}

/// Everything the engine needs to run one build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineOptions {
    pub entry_points: Vec<EntryPoint>,
    pub outdir: String,
    pub bundle: bool,
    pub splitting: bool,
    pub format: OutputFormat,
    pub sourcemap: SourceMap,
    /// Whether the engine writes outputs itself. When false they come back in
    /// [`EngineOutput::output_files`].
    pub write: bool,
    pub allow_overwrite: bool,
    /// Extra directories the engine's own resolver searches for bare imports.
    pub node_paths: Vec<String>,
}

/// An emitted file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub path: String,
    pub contents: Vec<u8>,
}

/// What the engine returns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineOutput {
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
    /// Only populated when [`EngineOptions::write`] is false.
    pub output_files: Vec<OutputFile>,
}

/// A bundling engine.
///
/// `bundle` may call the hooks from several threads at once and must not
/// return before every hook call has finished.
pub trait BundleEngine: Send + Sync {
    /// Engine version, empty if unknown.
    fn version(&self) -> String;

    /// Run one build.
    fn bundle(&self, options: &EngineOptions, hooks: Option<Arc<dyn EngineHooks>>) -> EngineOutput;
}

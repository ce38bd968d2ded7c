use crate::error::Error;
use crate::resolver::ResolverConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Runtime configuration for stackbuild.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Current working directory.
    pub cwd: PathBuf,

    /// Whether to emit JSON logs.
    pub json_logs: bool,

    /// Verbosity level (0 = INFO, 1 = DEBUG, 2+ = TRACE).
    pub verbosity: u8,

    /// Which filesystem backend this process builds against.
    pub target: Target,

    /// Lookup roots and scratch space.
    pub directories: Directories,

    /// Modules the bootstrap entry always pulls in.
    pub bootstrap: BootstrapConfig,
}

/// Execution target. Chosen once per process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    /// The engine reads and writes the host disk itself.
    #[default]
    Disk,
    /// Every file access goes through the sandbox boundary.
    Sandbox,
}

impl Target {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disk => "disk",
            Self::Sandbox => "sandbox",
        }
    }

    #[must_use]
    pub fn is_sandbox(&self) -> bool {
        matches!(self, Self::Sandbox)
    }
}

/// Directories used for resolution and temporary files.
///
/// All values are `/`-separated paths in the namespace of the selected
/// filesystem backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Directories {
    /// Flattened dependency directory (a single `node_modules`).
    pub dependency_root: String,
    /// Built-in library directory, consulted after the dependency root.
    pub library_root: String,
    /// Where bootstrap modules are written.
    pub tmp: String,
}

impl Default for Directories {
    fn default() -> Self {
        Self {
            dependency_root: "/node_modules".to_string(),
            library_root: "/lib".to_string(),
            tmp: "/tmp".to_string(),
        }
    }
}

/// Fixed imports of the synthesized bootstrap module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Shared UI stylesheet, as a bare specifier.
    pub shared_stylesheet: String,
    /// Runtime bridge module, as a bare specifier.
    pub runtime_module: String,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            shared_stylesheet: "components/snackbar.css".to_string(),
            runtime_module: "bridge".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            json_logs: false,
            verbosity: 0,
            target: Target::default(),
            directories: Directories::default(),
            bootstrap: BootstrapConfig::default(),
        }
    }
}

impl Config {
    /// Create a new config with the given working directory.
    #[must_use]
    pub fn new(cwd: PathBuf) -> Self {
        Self {
            cwd,
            ..Default::default()
        }
    }

    /// Load a config from a JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Set verbosity level.
    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set JSON log output.
    #[must_use]
    pub fn with_json_logs(mut self, json: bool) -> Self {
        self.json_logs = json;
        self
    }

    /// Set the execution target.
    #[must_use]
    pub fn with_target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }

    /// Set the dependency root.
    #[must_use]
    pub fn with_dependency_root(mut self, dir: impl Into<String>) -> Self {
        self.directories.dependency_root = dir.into();
        self
    }

    /// Set the library root.
    #[must_use]
    pub fn with_library_root(mut self, dir: impl Into<String>) -> Self {
        self.directories.library_root = dir.into();
        self
    }

    /// Set the temp directory for bootstrap modules.
    #[must_use]
    pub fn with_tmp_dir(mut self, dir: impl Into<String>) -> Self {
        self.directories.tmp = dir.into();
        self
    }

    /// Resolver settings derived from this config.
    #[must_use]
    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig::new(
            &self.directories.dependency_root,
            &self.directories.library_root,
        )
    }
}

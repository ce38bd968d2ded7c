use serde::{Deserialize, Serialize};
use stackbuild_util::vpath;

/// How the engine should interpret a loaded module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Loader {
    Ts,
    Tsx,
    Js,
    Jsx,
    Css,
    /// Opaque asset, emitted as a file.
    File,
}

impl Loader {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ts => "ts",
            Self::Tsx => "tsx",
            Self::Js => "js",
            Self::Jsx => "jsx",
            Self::Css => "css",
            Self::File => "file",
        }
    }
}

impl std::fmt::Display for Loader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pick a loader from the final extension of `path`.
#[must_use]
pub fn infer_loader(path: &str) -> Loader {
    match vpath::extension(path) {
        Some("ts") => Loader::Ts,
        Some("tsx") => Loader::Tsx,
        Some("js" | "mjs" | "cjs") => Loader::Js,
        Some("jsx") => Loader::Jsx,
        Some("css") => Loader::Css,
        _ => Loader::File,
    }
}

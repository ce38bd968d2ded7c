//! Package manifest (`package.json`) decoding.
//!
//! Only the two fields resolution cares about are kept. The `exports` field is
//! decoded once into [`Exports`] so the resolver never re-inspects raw JSON.

use crate::vfs::{FileSystem, FsError};
use serde_json::Value;
use thiserror::Error;

/// The `exports` field of a manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exports {
    /// `"exports": "./index.js"`
    Path(String),
    /// `"exports": ["./index.js", "./module.js"]`
    List(Vec<String>),
    /// Subpath keys or condition names, in manifest order.
    Map(Vec<(String, Exports)>),
    /// `null` or another scalar nested inside a map. Never matches.
    Null,
}

impl Exports {
    /// Decode a JSON value. Top-level `null` (or a non-string scalar) means the
    /// field is absent.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match Self::decode(value) {
            Self::Null => None,
            exports => Some(exports),
        }
    }

    fn decode(value: &Value) -> Self {
        match value {
            Value::String(s) => Self::Path(s.clone()),
            Value::Array(items) => Self::List(
                items
                    .iter()
                    .filter_map(|item| item.as_str().map(str::to_string))
                    .collect(),
            ),
            Value::Object(map) => Self::Map(
                map.iter()
                    .map(|(key, value)| (key.clone(), Self::decode(value)))
                    .collect(),
            ),
            Value::Null | Value::Bool(_) | Value::Number(_) => Self::Null,
        }
    }
}

/// Failure to obtain a manifest.
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: FsError,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// The parts of `package.json` that drive resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageManifest {
    pub main: Option<String>,
    pub exports: Option<Exports>,
}

impl PackageManifest {
    /// Parse manifest bytes.
    ///
    /// A `main` that is not a string is ignored.
    ///
    /// # Errors
    /// Returns [`ManifestError::Parse`] if the bytes are not a JSON object.
    pub fn parse(path: &str, bytes: &[u8]) -> Result<Self, ManifestError> {
        let value: Value = serde_json::from_slice(bytes).map_err(|source| ManifestError::Parse {
            path: path.to_string(),
            source,
        })?;

        let Value::Object(fields) = value else {
            return Err(ManifestError::Parse {
                path: path.to_string(),
                source: serde::de::Error::custom("manifest is not an object"),
            });
        };

        Ok(Self {
            main: fields
                .get("main")
                .and_then(Value::as_str)
                .filter(|main| !main.is_empty())
                .map(str::to_string),
            exports: fields.get("exports").and_then(Exports::from_value),
        })
    }

    /// Read and parse a manifest through the filesystem abstraction.
    ///
    /// # Errors
    /// Returns [`ManifestError::Read`] if the file cannot be read, or
    /// [`ManifestError::Parse`] if it is not a JSON object.
    pub fn read(fs: &dyn FileSystem, path: &str) -> Result<Self, ManifestError> {
        let bytes = fs.read_file(path).map_err(|source| ManifestError::Read {
            path: path.to_string(),
            source,
        })?;
        Self::parse(path, &bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_exports_shapes() {
        assert_eq!(
            Exports::from_value(&json!("./a.js")),
            Some(Exports::Path("./a.js".into()))
        );
        assert_eq!(
            Exports::from_value(&json!(["./a.js", 1, "./b.js"])),
            Some(Exports::List(vec!["./a.js".into(), "./b.js".into()]))
        );
        assert_eq!(Exports::from_value(&json!(null)), None);
        assert_eq!(Exports::from_value(&json!(3)), None);
    }

    #[test]
    fn test_map_keeps_manifest_order() {
        let exports = Exports::from_value(&json!({
            "./z": "./z.js",
            "./a": { "import": "./a.mjs", "default": "./a.js" },
            "./blocked": null
        }))
        .unwrap();

        let Exports::Map(entries) = exports else {
            panic!("expected map");
        };
        let keys: Vec<&str> = entries.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["./z", "./a", "./blocked"]);
        assert_eq!(entries[2].1, Exports::Null);
        assert_eq!(
            entries[1].1,
            Exports::Map(vec![
                ("import".into(), Exports::Path("./a.mjs".into())),
                ("default".into(), Exports::Path("./a.js".into())),
            ])
        );
    }

    #[test]
    fn test_parse_main_and_missing_exports() {
        let m = PackageManifest::parse("/p/package.json", br#"{"name":"p","main":"lib/main"}"#)
            .unwrap();
        assert_eq!(m.main.as_deref(), Some("lib/main"));
        assert!(m.exports.is_none());
    }

    #[test]
    fn test_parse_ignores_non_string_main() {
        let m = PackageManifest::parse("/p/package.json", br#"{"main": 5}"#).unwrap();
        assert!(m.main.is_none());
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            PackageManifest::parse("/p/package.json", b"{ nope"),
            Err(ManifestError::Parse { .. })
        ));
        assert!(matches!(
            PackageManifest::parse("/p/package.json", b"[1, 2]"),
            Err(ManifestError::Parse { .. })
        ));
    }
}

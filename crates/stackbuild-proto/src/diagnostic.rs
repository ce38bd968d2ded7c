use serde::{Deserialize, Serialize};

/// Severity of a build diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// Source position of a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    /// File the diagnostic points into.
    pub file: String,
    /// 1-based line.
    pub line: u32,
    /// 0-based column in bytes.
    pub column: u32,
    /// Length of the highlighted span in bytes.
    #[serde(default)]
    pub length: u32,
    /// Contents of the offending line, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_text: Option<String>,
}

impl Location {
    #[must_use]
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
            length: 0,
            line_text: None,
        }
    }
}

/// A message produced while building.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    /// Stable SCREAMING_SNAKE_CASE id, empty when the engine gave none.
    #[serde(default)]
    pub id: String,
    /// Human-readable message.
    pub text: String,
    /// Where the problem is, if known.
    #[serde(default)]
    pub location: Option<Location>,
    pub severity: Severity,
}

impl Diagnostic {
    #[must_use]
    pub fn error(id: &str, text: impl Into<String>) -> Self {
        Self {
            id: id.to_string(),
            text: text.into(),
            location: None,
            severity: Severity::Error,
        }
    }

    #[must_use]
    pub fn warning(id: &str, text: impl Into<String>) -> Self {
        Self {
            id: id.to_string(),
            text: text.into(),
            location: None,
            severity: Severity::Warning,
        }
    }

    #[must_use]
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.location {
            Some(loc) => write!(f, "{}:{}:{}: {}", loc.file, loc.line, loc.column, self.text),
            None => write!(f, "{}", self.text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_json_shape() {
        let d = Diagnostic::error("RESOLVE_UNRESOLVED", "Could not resolve \"x\"")
            .with_location(Location::new("/p/index.ts", 3, 7));
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["severity"], "error");
        assert_eq!(json["location"]["file"], "/p/index.ts");
        assert_eq!(json["location"]["line"], 3);
        assert!(json["location"].get("lineText").is_none());
    }

    #[test]
    fn test_display_with_location() {
        let d = Diagnostic::warning("", "unused").with_location(Location::new("a.ts", 1, 2));
        assert_eq!(d.to_string(), "a.ts:1:2: unused");
        assert!(!d.is_error());
    }
}

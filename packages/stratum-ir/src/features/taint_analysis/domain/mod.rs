//! Taint analysis domain types

use crate::shared::models::{Result, StratumError};

/// Taint analysis mode
///
/// `"full"` is accepted by the parser as a deprecated alias for
/// path-sensitive but is not a variant of the public enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaintMode {
    /// Pure call-graph reachability
    Basic,
    /// CFG/DFG-aware with dominator-validated guards
    PathSensitive,
    /// Tracks tainted fields within objects
    FieldSensitive,
}

impl TaintMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaintMode::Basic => "basic",
            TaintMode::PathSensitive => "path_sensitive",
            TaintMode::FieldSensitive => "field_sensitive",
        }
    }

    pub fn from_str(value: &str) -> Result<TaintMode> {
        match value.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(TaintMode::Basic),
            "path_sensitive" => Ok(TaintMode::PathSensitive),
            "field_sensitive" => Ok(TaintMode::FieldSensitive),
            "full" => {
                tracing::warn!(
                    "taint_mode='full' is deprecated; falling back to path_sensitive"
                );
                Ok(TaintMode::PathSensitive)
            }
            other => Err(StratumError::taint(format!(
                "invalid taint mode: '{}' (expected basic | path_sensitive | field_sensitive)",
                other
            ))),
        }
    }
}

/// Name substrings that mark heuristic sources/sinks/sanitizers when no
/// rule matches are available.
pub mod heuristics {
    pub const SOURCE_MARKERS: &[&str] = &["input", "request", "argv", "environ"];
    pub const SINK_MARKERS: &[&str] = &["execute", "eval", "exec", "system"];
    pub const SANITIZER_MARKERS: &[&str] = &["sanitize", "escape", "quote", "clean"];

    pub fn is_source_name(name: &str) -> bool {
        let lower = name.to_ascii_lowercase();
        SOURCE_MARKERS.iter().any(|marker| lower.contains(marker))
    }

    pub fn is_sink_name(name: &str) -> bool {
        let lower = name.to_ascii_lowercase();
        SINK_MARKERS.iter().any(|marker| lower.contains(marker))
    }

    pub fn is_sanitizer_name(name: &str) -> bool {
        let lower = name.to_ascii_lowercase();
        SANITIZER_MARKERS.iter().any(|marker| lower.contains(marker))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parsing() {
        assert_eq!(TaintMode::from_str("basic").unwrap(), TaintMode::Basic);
        assert_eq!(
            TaintMode::from_str("PATH_SENSITIVE").unwrap(),
            TaintMode::PathSensitive
        );
        assert!(TaintMode::from_str("bogus").is_err());
    }

    #[test]
    fn test_full_is_deprecated_alias() {
        assert_eq!(TaintMode::from_str("full").unwrap(), TaintMode::PathSensitive);
    }

    #[test]
    fn test_heuristic_markers() {
        assert!(heuristics::is_source_name("request.args"));
        assert!(heuristics::is_sink_name("cursor.execute"));
        assert!(heuristics::is_sanitizer_name("html_escape"));
        assert!(!heuristics::is_sink_name("fetch_rows"));
    }
}

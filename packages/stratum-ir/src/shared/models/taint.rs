//! Taint finding record stored on the document

use serde::{Deserialize, Serialize};

/// Severity of a taint finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FindingSeverity {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

impl FindingSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            FindingSeverity::Critical => "critical",
            FindingSeverity::High => "high",
            FindingSeverity::Medium => "medium",
            FindingSeverity::Low => "low",
            FindingSeverity::Info => "info",
        }
    }
}

/// Source-to-sink taint finding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaintFinding {
    /// Source symbol or variable
    pub source: String,
    /// Sink node id or callee
    pub sink: String,
    /// Node ids from source to sink
    pub path: Vec<String>,
    pub is_sanitized: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sanitizer: Option<String>,
    pub severity: FindingSeverity,
    /// Tainted variables observed at the sink
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tainted_vars: Vec<String>,
    /// Branch conditions on the offending path (path-sensitive mode)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path_conditions: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_aliases: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sink_aliases: Vec<String>,
    pub confidence: f64,
}

impl TaintFinding {
    pub fn new(source: impl Into<String>, sink: impl Into<String>, path: Vec<String>) -> Self {
        Self {
            source: source.into(),
            sink: sink.into(),
            path,
            is_sanitized: false,
            sanitizer: None,
            severity: FindingSeverity::Medium,
            tainted_vars: Vec::new(),
            path_conditions: Vec::new(),
            source_aliases: Vec::new(),
            sink_aliases: Vec::new(),
            confidence: 0.5,
        }
    }
}

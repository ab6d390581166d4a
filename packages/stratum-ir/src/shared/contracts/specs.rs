//! Query specs - the LLM-safe structured input contract
//!
//! Exactly three shapes: RetrieveSpec, AnalyzeSpec, EditSpec. Validation
//! is strict and fails fast at the entry point; invalid specs produce a
//! structured error with an error code, the expected schema and suggested
//! fixes so callers can auto-repair.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::error_envelope::codes;

/// Query scope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scope {
    pub repo_id: String,
    pub snapshot_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paths: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub languages: Option<Vec<String>>,
}

impl Scope {
    pub fn new(repo_id: impl Into<String>, snapshot_id: impl Into<String>) -> Self {
        Self {
            repo_id: repo_id.into(),
            snapshot_id: snapshot_id.into(),
            paths: None,
            languages: None,
        }
    }
}

/// Execution limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Limits {
    #[serde(default = "default_max_paths")]
    pub max_paths: u64,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u64>,
}

fn default_max_paths() -> u64 {
    200
}

fn default_timeout_ms() -> u64 {
    30_000
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_paths: default_max_paths(),
            timeout_ms: default_timeout_ms(),
            max_tokens: None,
        }
    }
}

/// Common spec body shared by the three shapes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecBody {
    pub intent: String,
    pub template_id: String,
    pub scope: Scope,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub limits: Limits,
}

/// The three spec shapes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "spec_type", rename_all = "snake_case")]
pub enum QuerySpec {
    Retrieve(SpecBody),
    Analyze(SpecBody),
    Edit(SpecBody),
}

impl QuerySpec {
    pub fn body(&self) -> &SpecBody {
        match self {
            QuerySpec::Retrieve(body) | QuerySpec::Analyze(body) | QuerySpec::Edit(body) => body,
        }
    }

    pub fn spec_type(&self) -> &'static str {
        match self {
            QuerySpec::Retrieve(_) => "retrieve",
            QuerySpec::Analyze(_) => "analyze",
            QuerySpec::Edit(_) => "edit",
        }
    }

    fn expected_intent(&self) -> &'static str {
        self.spec_type()
    }

    /// Strict validation; no partial work may follow an invalid spec.
    pub fn validate(&self) -> std::result::Result<(), SpecValidationError> {
        let body = self.body();

        if body.intent != self.expected_intent() {
            return Err(SpecValidationError::new(
                format!(
                    "intent '{}' does not match spec type '{}'",
                    body.intent,
                    self.spec_type()
                ),
                "intent",
            )
            .with_fix(format!("set intent to \"{}\"", self.expected_intent())));
        }
        if body.template_id.trim().is_empty() {
            return Err(SpecValidationError::new("template_id is empty", "template_id")
                .with_fix("set template_id to a registered template, e.g. \"sql_injection\""));
        }
        if body.scope.repo_id.trim().is_empty() {
            return Err(SpecValidationError::new("scope.repo_id is empty", "scope.repo_id")
                .with_fix("provide the repo id the snapshot was indexed under"));
        }
        if body.scope.snapshot_id.trim().is_empty() {
            return Err(
                SpecValidationError::new("scope.snapshot_id is empty", "scope.snapshot_id")
                    .with_fix("provide the snapshot id returned by the indexer"),
            );
        }
        if body.limits.timeout_ms == 0 {
            return Err(
                SpecValidationError::new("limits.timeout_ms must be positive", "limits.timeout_ms")
                    .with_fix("use the default of 30000 ms"),
            );
        }
        if body.limits.max_paths == 0 {
            return Err(
                SpecValidationError::new("limits.max_paths must be positive", "limits.max_paths")
                    .with_fix("use the default of 200"),
            );
        }
        Ok(())
    }
}

/// Structured validation failure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecValidationError {
    pub error_code: String,
    pub message: String,
    /// JSON schema fragment describing the expected shape of the bad field
    pub hint_schema: serde_json::Value,
    pub suggested_fixes: Vec<String>,
}

impl SpecValidationError {
    pub fn new(message: impl Into<String>, field: &str) -> Self {
        Self {
            error_code: codes::SPEC_INVALID.to_string(),
            message: message.into(),
            hint_schema: Self::schema_hint(field),
            suggested_fixes: Vec::new(),
        }
    }

    pub fn with_fix(mut self, fix: impl Into<String>) -> Self {
        self.suggested_fixes.push(fix.into());
        self
    }

    fn schema_hint(field: &str) -> serde_json::Value {
        serde_json::json!({
            "field": field,
            "spec": {
                "intent": "retrieve | analyze | edit",
                "template_id": "string (registered template)",
                "scope": {
                    "repo_id": "string",
                    "snapshot_id": "string",
                    "paths": ["string (optional)"],
                    "languages": ["string (optional)"]
                },
                "params": "object",
                "limits": {"max_paths": "u64 > 0", "timeout_ms": "u64 > 0", "max_tokens": "u64 (optional)"}
            }
        })
    }
}

impl std::fmt::Display for SpecValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.error_code, self.message)
    }
}

impl std::error::Error for SpecValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze_spec() -> QuerySpec {
        QuerySpec::Analyze(SpecBody {
            intent: "analyze".into(),
            template_id: "sql_injection".into(),
            scope: Scope::new("r", "s"),
            params: BTreeMap::new(),
            limits: Limits::default(),
        })
    }

    #[test]
    fn test_valid_spec() {
        assert!(analyze_spec().validate().is_ok());
    }

    #[test]
    fn test_intent_mismatch() {
        let spec = QuerySpec::Retrieve(SpecBody {
            intent: "analyze".into(),
            template_id: "callers".into(),
            scope: Scope::new("r", "s"),
            params: BTreeMap::new(),
            limits: Limits::default(),
        });
        let err = spec.validate().unwrap_err();
        assert_eq!(err.error_code, codes::SPEC_INVALID);
        assert!(!err.suggested_fixes.is_empty());
        assert!(err.hint_schema.get("spec").is_some());
    }

    #[test]
    fn test_empty_template_rejected() {
        let mut spec = analyze_spec();
        if let QuerySpec::Analyze(body) = &mut spec {
            body.template_id.clear();
        }
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut spec = analyze_spec();
        if let QuerySpec::Analyze(body) = &mut spec {
            body.limits.timeout_ms = 0;
        }
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_spec_json_roundtrip() {
        let spec = analyze_spec();
        let json = serde_json::to_string(&spec).unwrap();
        assert!(json.contains("\"spec_type\":\"analyze\""));
        let parsed: QuerySpec = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.spec_type(), "analyze");
    }
}

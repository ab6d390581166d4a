//! Wire-level error schema
//!
//! All errors reaching the RPC boundary are expressed in this shape.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::shared::models::{ErrorKind, StratumError};

/// Standard error codes (`err_<domain>_<type>`)
pub mod codes {
    pub const INVALID_ARGUMENT: &str = "err_common_invalid_argument";
    pub const NOT_FOUND: &str = "err_common_not_found";
    pub const INTERNAL: &str = "err_common_internal";
    pub const TIMEOUT: &str = "err_common_timeout";
    pub const SPEC_INVALID: &str = "err_spec_invalid";
    pub const ANALYSIS_FAILED: &str = "err_analysis_failed";
}

/// Global error envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// `err_<domain>_<type>`
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

impl ErrorEnvelope {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: BTreeMap::new(),
            trace_id: None,
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.details.insert(key.into(), value);
        self
    }

    pub fn with_trace(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }
}

impl From<&StratumError> for ErrorEnvelope {
    fn from(err: &StratumError) -> Self {
        let code = match err.kind {
            ErrorKind::Validation | ErrorKind::Config => codes::INVALID_ARGUMENT,
            ErrorKind::Query => codes::NOT_FOUND,
            _ => codes::INTERNAL,
        };
        let mut envelope = ErrorEnvelope::new(code, err.message.clone());
        if let Some(file) = &err.file_path {
            envelope = envelope.with_detail("file_path", serde_json::json!(file));
        }
        envelope
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_mapping() {
        let err = StratumError::validation("bad input");
        let envelope = ErrorEnvelope::from(&err);
        assert_eq!(envelope.code, codes::INVALID_ARGUMENT);

        let err = StratumError::internal("boom");
        let envelope = ErrorEnvelope::from(&err);
        assert_eq!(envelope.code, codes::INTERNAL);
    }
}

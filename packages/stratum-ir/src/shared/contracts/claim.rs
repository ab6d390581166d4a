//! Claim models
//!
//! A claim is an assertion about the code, always backed by evidence in the
//! same envelope. Claims are immutable once validated.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::shared::models::{Result, StratumError};

static CLAIM_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").unwrap());

/// How the confidence score was obtained.
///
/// Arbitration priority: Proven > Inferred > Heuristic > Unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceBasis {
    /// Deterministic static proof (constant propagation, type inference)
    Proven,
    /// Path existence proof (taint path, call chain)
    Inferred,
    /// Pattern-based
    Heuristic,
    /// Hypothesis only
    Unknown,
}

/// Claim severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
            Severity::Info => "info",
        }
    }
}

/// Conditions under which a claim holds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProofObligation {
    /// If these hold, the claim holds
    pub assumptions: Vec<String>,
    /// If any of these hold, the claim is void
    pub broken_if: Vec<String>,
    /// Unverified aspects
    pub unknowns: Vec<String>,
}

impl ProofObligation {
    fn validate(&self) -> Result<()> {
        for list in [&self.assumptions, &self.broken_if, &self.unknowns] {
            if list.iter().any(|item| item.trim().is_empty()) {
                return Err(StratumError::validation(
                    "proof obligation lists must not contain empty strings",
                ));
            }
        }
        Ok(())
    }
}

/// Validated claim
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claim {
    pub id: String,
    /// e.g. "sql_injection", "null_deref"
    pub claim_type: String,
    pub severity: Severity,
    /// 0.0 - 1.0
    pub confidence: f64,
    pub confidence_basis: ConfidenceBasis,
    pub proof_obligation: ProofObligation,
    pub suppressed: bool,
    /// Required iff suppressed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suppression_reason: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Claim {
    /// Validating constructor; the only way to obtain a `Claim`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: impl Into<String>,
        claim_type: impl Into<String>,
        severity: Severity,
        confidence: f64,
        confidence_basis: ConfidenceBasis,
        proof_obligation: ProofObligation,
    ) -> Result<Self> {
        let claim = Self {
            id: id.into(),
            claim_type: claim_type.into(),
            severity,
            confidence,
            confidence_basis,
            proof_obligation,
            suppressed: false,
            suppression_reason: None,
            metadata: BTreeMap::new(),
        };
        claim.validate()?;
        Ok(claim)
    }

    pub fn suppress(mut self, reason: impl Into<String>) -> Result<Self> {
        self.suppressed = true;
        self.suppression_reason = Some(reason.into());
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() || !CLAIM_ID_RE.is_match(&self.id) {
            return Err(StratumError::validation(format!(
                "invalid claim id: '{}'",
                self.id
            )));
        }
        if self.claim_type.is_empty() {
            return Err(StratumError::validation("claim type must be non-empty"));
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(StratumError::validation(format!(
                "confidence out of range: {}",
                self.confidence
            )));
        }
        self.proof_obligation.validate()?;

        match (self.suppressed, &self.suppression_reason) {
            (true, None) => {
                return Err(StratumError::validation(
                    "suppression_reason is required when suppressed",
                ))
            }
            (true, Some(reason)) if reason.trim().is_empty() => {
                return Err(StratumError::validation(
                    "suppression_reason is required when suppressed",
                ))
            }
            (false, Some(_)) => {
                return Err(StratumError::validation(
                    "suppression_reason must be absent when not suppressed",
                ))
            }
            _ => {}
        }
        Ok(())
    }

    /// Should this claim be shown to the user?
    pub fn is_actionable(&self) -> bool {
        !self.suppressed
    }

    pub fn is_high_confidence(&self) -> bool {
        self.confidence >= 0.8
    }

    pub fn is_proven(&self) -> bool {
        self.confidence_basis == ConfidenceBasis::Proven
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_claim() -> Claim {
        Claim::new(
            "claim_001",
            "sql_injection",
            Severity::Critical,
            0.95,
            ConfidenceBasis::Inferred,
            ProofObligation {
                assumptions: vec!["taint propagates through data flow".into()],
                broken_if: vec!["sanitizer exists on path".into()],
                unknowns: vec![],
            },
        )
        .unwrap()
    }

    #[test]
    fn test_valid_claim() {
        let claim = valid_claim();
        assert!(claim.is_actionable());
        assert!(claim.is_high_confidence());
        assert!(!claim.is_proven());
    }

    #[test]
    fn test_confidence_range_checked() {
        let result = Claim::new(
            "c1",
            "x",
            Severity::Low,
            1.5,
            ConfidenceBasis::Heuristic,
            ProofObligation::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_suppression_consistency() {
        let claim = valid_claim().suppress("sanitize() dominates sink").unwrap();
        assert!(!claim.is_actionable());
        assert!(claim.suppression_reason.is_some());

        let mut broken = valid_claim();
        broken.suppressed = true;
        assert!(broken.validate().is_err());
    }

    #[test]
    fn test_bad_id_rejected() {
        let result = Claim::new(
            "claim 001",
            "x",
            Severity::Low,
            0.5,
            ConfidenceBasis::Heuristic,
            ProofObligation::default(),
        );
        assert!(result.is_err());
    }
}

//! Result envelope - canonical analysis output
//!
//! Claim + Evidence + Conclusion + Metrics wrapper returned by every
//! analysis template. Validation at construction is exhaustive; an invalid
//! envelope never reaches a consumer.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use super::claim::Claim;
use super::evidence::{validate_evidence_claim_links, Evidence, EvidenceDraft};
use crate::shared::models::{Result, StratumError};

static REQUEST_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^req_[A-Za-z0-9_-]+$").unwrap());

const MAX_SUMMARY_LEN: usize = 500;

/// Overall conclusion and recommendation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conclusion {
    pub reasoning_summary: String,
    /// 0.0 - 1.0
    pub coverage: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub counterevidence: Vec<String>,
    pub recommendation: String,
}

impl Conclusion {
    pub fn new(
        reasoning_summary: impl Into<String>,
        coverage: f64,
        recommendation: impl Into<String>,
    ) -> Result<Self> {
        let conclusion = Self {
            reasoning_summary: reasoning_summary.into(),
            coverage,
            counterevidence: Vec::new(),
            recommendation: recommendation.into(),
        };
        conclusion.validate()?;
        Ok(conclusion)
    }

    pub fn with_counterevidence(mut self, items: Vec<String>) -> Result<Self> {
        self.counterevidence = items;
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<()> {
        if self.reasoning_summary.trim().is_empty() {
            return Err(StratumError::validation("conclusion reasoning_summary is empty"));
        }
        if self.recommendation.trim().is_empty() {
            return Err(StratumError::validation("conclusion recommendation is empty"));
        }
        if !(0.0..=1.0).contains(&self.coverage) {
            return Err(StratumError::validation(format!(
                "coverage out of range: {}",
                self.coverage
            )));
        }
        if self.counterevidence.iter().any(|c| c.trim().is_empty()) {
            return Err(StratumError::validation("empty counterevidence item"));
        }
        Ok(())
    }
}

/// Execution metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metrics {
    pub execution_time_ms: f64,
    #[serde(default)]
    pub paths_analyzed: u64,
    #[serde(default)]
    pub claims_generated: u64,
    #[serde(default)]
    pub claims_suppressed: u64,
    #[serde(default)]
    pub cache_hits: u64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub additional: BTreeMap<String, serde_json::Value>,
}

impl Metrics {
    pub fn new(execution_time_ms: f64) -> Self {
        Self {
            execution_time_ms,
            paths_analyzed: 0,
            claims_generated: 0,
            claims_suppressed: 0,
            cache_hits: 0,
            additional: BTreeMap::new(),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.execution_time_ms <= 0.0 {
            return Err(StratumError::validation(
                "execution_time_ms must be positive",
            ));
        }
        if self.claims_suppressed > self.claims_generated {
            return Err(StratumError::validation(format!(
                "claims_suppressed ({}) cannot exceed claims_generated ({})",
                self.claims_suppressed, self.claims_generated
            )));
        }
        Ok(())
    }
}

/// Human escalation request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Escalation {
    pub required: bool,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub decision_needed: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume_token: Option<String>,
}

impl Escalation {
    pub fn required(
        reason: impl Into<String>,
        decision_needed: impl Into<String>,
        options: Vec<String>,
    ) -> Result<Self> {
        let escalation = Self {
            required: true,
            reason: reason.into(),
            decision_needed: decision_needed.into(),
            options,
            resume_token: None,
        };
        escalation.validate()?;
        Ok(escalation)
    }

    pub fn with_resume_token(mut self, token: impl Into<String>) -> Self {
        self.resume_token = Some(token.into());
        self
    }

    fn validate(&self) -> Result<()> {
        if self.required {
            if self.reason.trim().is_empty() {
                return Err(StratumError::validation(
                    "reason is required when escalation is required",
                ));
            }
            if self.decision_needed.trim().is_empty() {
                return Err(StratumError::validation(
                    "decision_needed is required when escalation is required",
                ));
            }
            if self.options.len() < 2 {
                return Err(StratumError::validation(format!(
                    "at least 2 options required when escalation is required, got {}",
                    self.options.len()
                )));
            }
        }
        if self.options.iter().any(|o| o.trim().is_empty()) {
            return Err(StratumError::validation("empty escalation option"));
        }
        Ok(())
    }
}

/// Canonical result envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultEnvelope {
    pub request_id: String,
    pub summary: String,
    pub claims: Vec<Claim>,
    pub evidences: Vec<Evidence>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conclusion: Option<Conclusion>,
    pub metrics: Metrics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escalation: Option<Escalation>,
    /// `replay:<request_id suffix>`
    pub replay_ref: String,
}

impl ResultEnvelope {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        request_id: impl Into<String>,
        summary: impl Into<String>,
        claims: Vec<Claim>,
        evidences: Vec<Evidence>,
        conclusion: Option<Conclusion>,
        metrics: Metrics,
        escalation: Option<Escalation>,
        replay_ref: impl Into<String>,
    ) -> Result<Self> {
        let envelope = Self {
            request_id: request_id.into(),
            summary: summary.into(),
            claims,
            evidences,
            conclusion,
            metrics,
            escalation,
            replay_ref: replay_ref.into(),
        };
        envelope.validate()?;
        Ok(envelope)
    }

    pub fn validate(&self) -> Result<()> {
        if !REQUEST_ID_RE.is_match(&self.request_id) {
            return Err(StratumError::validation(format!(
                "invalid request_id: '{}'",
                self.request_id
            )));
        }
        if self.summary.trim().is_empty() {
            return Err(StratumError::validation("envelope summary is empty"));
        }
        if self.summary.len() > MAX_SUMMARY_LEN {
            return Err(StratumError::validation(format!(
                "summary exceeds {} chars",
                MAX_SUMMARY_LEN
            )));
        }

        // replay_ref must match request_id suffix
        let expected = format!(
            "replay:{}",
            self.request_id.strip_prefix("req_").unwrap_or(&self.request_id)
        );
        if self.replay_ref != expected {
            return Err(StratumError::validation(format!(
                "replay_ref must be '{}', got '{}'",
                expected, self.replay_ref
            )));
        }

        for claim in &self.claims {
            claim.validate()?;
        }
        for evidence in &self.evidences {
            evidence.validate()?;
        }

        // Evidence → claim link consistency (orphan evidence forbidden)
        let claim_ids: HashSet<String> = self.claims.iter().map(|c| c.id.clone()).collect();
        validate_evidence_claim_links(&self.evidences, &claim_ids)?;

        // Metrics consistency with the actual claim distribution
        self.metrics.validate()?;
        let actual_generated = self.claims.len() as u64;
        if self.metrics.claims_generated != actual_generated {
            return Err(StratumError::validation(format!(
                "metrics.claims_generated ({}) != actual ({})",
                self.metrics.claims_generated, actual_generated
            )));
        }
        let actual_suppressed = self.claims.iter().filter(|c| c.suppressed).count() as u64;
        if self.metrics.claims_suppressed != actual_suppressed {
            return Err(StratumError::validation(format!(
                "metrics.claims_suppressed ({}) != actual ({})",
                self.metrics.claims_suppressed, actual_suppressed
            )));
        }

        if let Some(escalation) = &self.escalation {
            escalation.validate()?;
        }
        if let Some(conclusion) = &self.conclusion {
            conclusion.validate()?;
        }
        Ok(())
    }

    pub fn get_actionable_claims(&self) -> Vec<&Claim> {
        self.claims.iter().filter(|c| c.is_actionable()).collect()
    }

    pub fn get_high_confidence_claims(&self) -> Vec<&Claim> {
        self.claims.iter().filter(|c| c.is_high_confidence()).collect()
    }

    pub fn get_proven_claims(&self) -> Vec<&Claim> {
        self.claims.iter().filter(|c| c.is_proven()).collect()
    }

    pub fn has_escalation(&self) -> bool {
        self.escalation.as_ref().map(|e| e.required).unwrap_or(false)
    }
}

/// Staged envelope construction.
///
/// Evidence drafts can be added before their claims exist; `build`
/// resolves every draft against the final claim set and runs full
/// envelope validation.
pub struct EnvelopeBuilder {
    request_id: String,
    summary: String,
    claims: Vec<Claim>,
    evidences: Vec<Evidence>,
    pending: Vec<(EvidenceDraft, Vec<String>)>,
    conclusion: Option<Conclusion>,
    metrics: Option<Metrics>,
    escalation: Option<Escalation>,
}

impl EnvelopeBuilder {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            summary: String::new(),
            claims: Vec::new(),
            evidences: Vec::new(),
            pending: Vec::new(),
            conclusion: None,
            metrics: None,
            escalation: None,
        }
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn claim(mut self, claim: Claim) -> Self {
        self.claims.push(claim);
        self
    }

    pub fn evidence(mut self, evidence: Evidence) -> Self {
        self.evidences.push(evidence);
        self
    }

    /// Evidence whose claims will exist by build time.
    pub fn draft_evidence(mut self, draft: EvidenceDraft, claim_ids: Vec<String>) -> Self {
        self.pending.push((draft, claim_ids));
        self
    }

    pub fn conclusion(mut self, conclusion: Conclusion) -> Self {
        self.conclusion = Some(conclusion);
        self
    }

    pub fn metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn escalation(mut self, escalation: Escalation) -> Self {
        self.escalation = Some(escalation);
        self
    }

    pub fn build(self) -> Result<ResultEnvelope> {
        let mut metrics = self
            .metrics
            .ok_or_else(|| StratumError::validation("envelope requires metrics"))?;
        metrics.claims_generated = self.claims.len() as u64;
        metrics.claims_suppressed = self.claims.iter().filter(|c| c.suppressed).count() as u64;

        let mut evidences = self.evidences;
        for (draft, claim_ids) in self.pending {
            evidences.push(draft.resolve(claim_ids)?);
        }

        let replay_ref = format!(
            "replay:{}",
            self.request_id.strip_prefix("req_").unwrap_or(&self.request_id)
        );

        ResultEnvelope::new(
            self.request_id,
            self.summary,
            self.claims,
            evidences,
            self.conclusion,
            metrics,
            self.escalation,
            replay_ref,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::contracts::claim::{ConfidenceBasis, ProofObligation, Severity};
    use crate::shared::contracts::evidence::{EvidenceKind, EvidenceLocation, Provenance};
    use serde_json::json;
    use std::collections::BTreeMap;

    fn claim(id: &str) -> Claim {
        Claim::new(
            id,
            "sql_injection",
            Severity::High,
            0.9,
            ConfidenceBasis::Inferred,
            ProofObligation::default(),
        )
        .unwrap()
    }

    fn evidence(id: &str, claim_ids: Vec<String>) -> Evidence {
        Evidence::new(
            id,
            EvidenceKind::CodeSnippet,
            EvidenceLocation::new("api.py", 1, 2),
            BTreeMap::from([("code".to_string(), json!("x = 1"))]),
            Provenance::for_engine("Test"),
            claim_ids,
        )
        .unwrap()
    }

    #[test]
    fn test_valid_envelope() {
        let envelope = EnvelopeBuilder::new("req_abc123")
            .summary("Found 1 issue")
            .claim(claim("c1"))
            .evidence(evidence("ev1", vec!["c1".into()]))
            .metrics(Metrics::new(12.5))
            .build();
        assert!(envelope.is_ok());
        let envelope = envelope.unwrap();
        assert_eq!(envelope.replay_ref, "replay:abc123");
        assert_eq!(envelope.metrics.claims_generated, 1);
    }

    #[test]
    fn test_orphan_evidence_rejected() {
        let envelope = EnvelopeBuilder::new("req_abc")
            .summary("s")
            .claim(claim("c1"))
            .evidence(evidence("ev1", vec!["c_unknown".into()]))
            .metrics(Metrics::new(1.0))
            .build();
        assert!(envelope.is_err());
    }

    #[test]
    fn test_replay_ref_mismatch_rejected() {
        let result = ResultEnvelope::new(
            "req_abc",
            "s",
            vec![],
            vec![],
            None,
            Metrics::new(1.0),
            None,
            "replay:other",
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_metrics_mismatch_rejected() {
        let mut metrics = Metrics::new(1.0);
        metrics.claims_generated = 5;
        let result = ResultEnvelope::new(
            "req_abc",
            "s",
            vec![claim("c1")],
            vec![],
            None,
            metrics,
            None,
            "replay:abc",
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_escalation_needs_two_options() {
        assert!(Escalation::required("risk", "approve?", vec!["approve".into()]).is_err());
        assert!(
            Escalation::required("risk", "approve?", vec!["approve".into(), "reject".into()])
                .is_ok()
        );
    }

    #[test]
    fn test_draft_evidence_resolved_at_build() {
        let draft = EvidenceDraft::new(
            "ev_draft",
            EvidenceKind::CodeSnippet,
            EvidenceLocation::new("api.py", 3, 3),
            BTreeMap::from([("code".to_string(), json!("y = 2"))]),
            Provenance::for_engine("Test"),
        );
        let envelope = EnvelopeBuilder::new("req_x1")
            .summary("s")
            .claim(claim("c9"))
            .draft_evidence(draft, vec!["c9".into()])
            .metrics(Metrics::new(2.0))
            .build()
            .unwrap();
        assert_eq!(envelope.evidences.len(), 1);
        assert_eq!(envelope.evidences[0].claim_ids, vec!["c9"]);
    }
}

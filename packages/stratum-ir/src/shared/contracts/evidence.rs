//! Evidence models
//!
//! Evidence is machine-readable proof for a claim, kind-tagged with a
//! kind-specific content schema. Staged construction goes through
//! `EvidenceDraft` (evidence produced before its claims exist); the
//! validated `Evidence` always links to real claim ids.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::shared::models::{Result, StratumError};

static EVIDENCE_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").unwrap());

/// Evidence kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceKind {
    CodeSnippet,
    DataFlowPath,
    CallPath,
    Diff,
    TestResult,
    CostTerm,
    LoopBound,
    RaceWitness,
    LockRegion,
    DiffDelta,
}

impl EvidenceKind {
    /// Content keys required for this kind
    fn required_content_keys(&self) -> &'static [&'static str] {
        match self {
            EvidenceKind::DataFlowPath => &["source", "sink", "path"],
            EvidenceKind::CostTerm => &["cost_term", "loop_bounds"],
            EvidenceKind::RaceWitness => &["shared_variable", "accesses", "interleaving_path"],
            _ => &[],
        }
    }
}

/// Source location attached to evidence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceLocation {
    /// Relative to repo root; no traversal, no absolute paths
    pub file_path: String,
    pub start_line: u32,
    pub end_line: u32,
    #[serde(default)]
    pub start_col: u32,
    #[serde(default)]
    pub end_col: u32,
}

impl EvidenceLocation {
    pub fn new(file_path: impl Into<String>, start_line: u32, end_line: u32) -> Self {
        Self {
            file_path: file_path.into(),
            start_line,
            end_line,
            start_col: 0,
            end_col: 0,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.file_path.is_empty() {
            return Err(StratumError::validation("evidence location needs a file path"));
        }
        if self.file_path.contains("..") {
            return Err(StratumError::validation(format!(
                "path traversal in evidence location: {}",
                self.file_path
            )));
        }
        if self.file_path.starts_with('/') {
            return Err(StratumError::validation(format!(
                "absolute path in evidence location: {}",
                self.file_path
            )));
        }
        if self.start_line == 0 || self.end_line == 0 {
            return Err(StratumError::validation("evidence lines are 1-based"));
        }
        if self.end_line < self.start_line {
            return Err(StratumError::validation(format!(
                "end_line ({}) before start_line ({})",
                self.end_line, self.start_line
            )));
        }
        if self.start_line == self.end_line && self.end_col > 0 && self.end_col < self.start_col {
            return Err(StratumError::validation("end_col before start_col on same line"));
        }
        Ok(())
    }
}

/// Where the evidence came from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    /// Analysis engine name (TaintAnalyzer, CostAnalyzer, ...)
    pub engine: String,
    /// Analysis template id (sql_injection, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub timestamp: f64,
}

impl Provenance {
    pub fn for_engine(engine: impl Into<String>) -> Self {
        Self {
            engine: engine.into(),
            ..Default::default()
        }
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    pub fn with_snapshot(mut self, snapshot_id: impl Into<String>) -> Self {
        self.snapshot_id = Some(snapshot_id.into());
        self
    }

    fn validate(&self) -> Result<()> {
        if self.engine.is_empty() {
            return Err(StratumError::validation("provenance engine must be non-empty"));
        }
        if let Some(version) = &self.version {
            static SEMVER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\.\d+\.\d+").unwrap());
            if !SEMVER_RE.is_match(version) {
                return Err(StratumError::validation(format!(
                    "invalid semver: {}",
                    version
                )));
            }
        }
        if self.timestamp < 0.0 {
            return Err(StratumError::validation("negative provenance timestamp"));
        }
        Ok(())
    }
}

/// Validated evidence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evidence {
    pub id: String,
    pub kind: EvidenceKind,
    pub location: EvidenceLocation,
    /// Machine-readable, kind-specific content
    pub content: BTreeMap<String, Value>,
    pub provenance: Provenance,
    /// Linked claim ids (non-empty)
    pub claim_ids: Vec<String>,
}

impl Evidence {
    pub fn new(
        id: impl Into<String>,
        kind: EvidenceKind,
        location: EvidenceLocation,
        content: BTreeMap<String, Value>,
        provenance: Provenance,
        claim_ids: Vec<String>,
    ) -> Result<Self> {
        let evidence = Self {
            id: id.into(),
            kind,
            location,
            content,
            provenance,
            claim_ids,
        };
        evidence.validate()?;
        Ok(evidence)
    }

    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() || !EVIDENCE_ID_RE.is_match(&self.id) {
            return Err(StratumError::validation(format!(
                "invalid evidence id: '{}'",
                self.id
            )));
        }
        self.location.validate()?;
        self.provenance.validate()?;

        if self.content.is_empty() {
            return Err(StratumError::validation("evidence content must be non-empty"));
        }
        for key in self.kind.required_content_keys() {
            if !self.content.contains_key(*key) {
                return Err(StratumError::validation(format!(
                    "{:?} evidence requires '{}' in content",
                    self.kind, key
                )));
            }
        }
        if self.kind == EvidenceKind::CostTerm && !self.content["loop_bounds"].is_array() {
            return Err(StratumError::validation("loop_bounds must be a list"));
        }

        if self.claim_ids.is_empty() {
            return Err(StratumError::validation(
                "claim_ids cannot be empty (must link to at least one claim)",
            ));
        }
        if self.claim_ids.iter().any(|id| id.trim().is_empty()) {
            return Err(StratumError::validation("blank claim id in evidence"));
        }
        Ok(())
    }
}

/// Evidence under staged construction: content exists, claims do not yet.
///
/// Replaces the old sentinel-string convention with an explicit builder
/// state; `resolve` produces validated `Evidence` once claim ids are known.
#[derive(Debug, Clone)]
pub struct EvidenceDraft {
    pub id: String,
    pub kind: EvidenceKind,
    pub location: EvidenceLocation,
    pub content: BTreeMap<String, Value>,
    pub provenance: Provenance,
}

impl EvidenceDraft {
    pub fn new(
        id: impl Into<String>,
        kind: EvidenceKind,
        location: EvidenceLocation,
        content: BTreeMap<String, Value>,
        provenance: Provenance,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            location,
            content,
            provenance,
        }
    }

    /// Attach the claims this evidence supports and validate.
    pub fn resolve(self, claim_ids: Vec<String>) -> Result<Evidence> {
        Evidence::new(
            self.id,
            self.kind,
            self.location,
            self.content,
            self.provenance,
            claim_ids,
        )
    }
}

/// Check that every evidence references only known claim ids.
pub fn validate_evidence_claim_links(
    evidences: &[Evidence],
    valid_claim_ids: &std::collections::HashSet<String>,
) -> Result<()> {
    for evidence in evidences {
        for claim_id in &evidence.claim_ids {
            if !valid_claim_ids.contains(claim_id) {
                return Err(StratumError::validation(format!(
                    "evidence '{}' references unknown claim '{}'",
                    evidence.id, claim_id
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn flow_content() -> BTreeMap<String, Value> {
        let mut content = BTreeMap::new();
        content.insert("source".into(), json!("request.args"));
        content.insert("sink".into(), json!("cursor.execute"));
        content.insert("path".into(), json!(["var_1", "call_3"]));
        content
    }

    #[test]
    fn test_valid_data_flow_evidence() {
        let evidence = Evidence::new(
            "req_001_ev_001",
            EvidenceKind::DataFlowPath,
            EvidenceLocation::new("api.py", 42, 42),
            flow_content(),
            Provenance::for_engine("TaintAnalyzer").with_template("sql_injection"),
            vec!["claim_001".into()],
        );
        assert!(evidence.is_ok());
    }

    #[test]
    fn test_missing_required_content_key() {
        let mut content = flow_content();
        content.remove("path");
        let evidence = Evidence::new(
            "ev1",
            EvidenceKind::DataFlowPath,
            EvidenceLocation::new("api.py", 1, 1),
            content,
            Provenance::for_engine("TaintAnalyzer"),
            vec!["claim_001".into()],
        );
        assert!(evidence.is_err());
    }

    #[test]
    fn test_cost_term_loop_bounds_must_be_list() {
        let mut content = BTreeMap::new();
        content.insert("cost_term".into(), json!("n * m"));
        content.insert("loop_bounds".into(), json!("not-a-list"));
        let evidence = Evidence::new(
            "ev1",
            EvidenceKind::CostTerm,
            EvidenceLocation::new("utils.py", 10, 20),
            content,
            Provenance::for_engine("CostAnalyzer"),
            vec!["claim_002".into()],
        );
        assert!(evidence.is_err());
    }

    #[test]
    fn test_path_traversal_rejected() {
        let evidence = Evidence::new(
            "ev1",
            EvidenceKind::CodeSnippet,
            EvidenceLocation::new("../etc/passwd", 1, 1),
            BTreeMap::from([("code".to_string(), json!("x"))]),
            Provenance::for_engine("x"),
            vec!["c1".into()],
        );
        assert!(evidence.is_err());
    }

    #[test]
    fn test_draft_resolution() {
        let draft = EvidenceDraft::new(
            "ev1",
            EvidenceKind::CodeSnippet,
            EvidenceLocation::new("api.py", 1, 2),
            BTreeMap::from([("code".to_string(), json!("x = 1"))]),
            Provenance::for_engine("Snippets"),
        );
        let evidence = draft.resolve(vec!["claim_9".into()]).unwrap();
        assert_eq!(evidence.claim_ids, vec!["claim_9"]);
    }

    #[test]
    fn test_empty_claim_ids_rejected() {
        let draft = EvidenceDraft::new(
            "ev1",
            EvidenceKind::CodeSnippet,
            EvidenceLocation::new("api.py", 1, 2),
            BTreeMap::from([("code".to_string(), json!("x = 1"))]),
            Provenance::for_engine("Snippets"),
        );
        assert!(draft.resolve(vec![]).is_err());
    }
}

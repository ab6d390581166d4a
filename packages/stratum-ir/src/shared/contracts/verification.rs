//! Verification snapshots, executions and workspaces
//!
//! The determinism contract: two executions carrying identical
//! verification snapshots on the same workspace revision must produce
//! byte-equal findings once serialized under total ordering.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Snapshot pinning everything an execution depends on
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VerificationSnapshot {
    /// Engine version, e.g. "0.1.0"
    pub engine_version: String,
    /// `sha256:<12 hex>` over the compiled ruleset
    pub ruleset_hash: String,
    /// `sha256:<12 hex>` over the active policies
    pub policies_hash: String,
    pub index_snapshot_id: String,
    /// VCS revision the workspace was cut from
    pub repo_revision: String,
}

impl VerificationSnapshot {
    /// `sha256:<12 hex chars>` prefix form
    pub fn compute_hash(content: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content);
        let digest = hasher.finalize();
        let hex = format!("{:x}", digest);
        format!("sha256:{}", &hex[..12])
    }
}

/// Agent execution metadata (optional on executions)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentMetadata {
    pub agent_model_id: String,
    pub agent_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_hash: Option<String>,
}

/// Execution state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionState {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl ExecutionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionState::Completed | ExecutionState::Failed | ExecutionState::Cancelled
        )
    }
}

/// Execution record wrapping a single run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Execution {
    pub execution_id: String,
    pub workspace_id: String,
    /// Spec type driving the run (analyze, retrieve, edit)
    pub spec_type: String,
    pub state: ExecutionState,
    pub trace_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_snapshot: Option<VerificationSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_metadata: Option<AgentMetadata>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Execution {
    pub fn new(
        execution_id: impl Into<String>,
        workspace_id: impl Into<String>,
        spec_type: impl Into<String>,
        trace_id: impl Into<String>,
    ) -> Self {
        Self {
            execution_id: execution_id.into(),
            workspace_id: workspace_id.into(),
            spec_type: spec_type.into(),
            state: ExecutionState::Pending,
            trace_id: trace_id.into(),
            verification_snapshot: None,
            agent_metadata: None,
            created_at: Utc::now(),
            completed_at: None,
            result: None,
            error: None,
        }
    }

    pub fn with_snapshot(mut self, snapshot: VerificationSnapshot) -> Self {
        self.verification_snapshot = Some(snapshot);
        self
    }

    pub fn start(&mut self) {
        self.state = ExecutionState::Running;
    }

    pub fn complete(&mut self, result: serde_json::Value) {
        self.state = ExecutionState::Completed;
        self.result = Some(result);
        self.completed_at = Some(Utc::now());
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        self.state = ExecutionState::Failed;
        self.error = Some(error.into());
        self.completed_at = Some(Utc::now());
    }

    pub fn cancel(&mut self) {
        self.state = ExecutionState::Cancelled;
        self.completed_at = Some(Utc::now());
    }
}

/// Immutable revision snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workspace {
    pub workspace_id: String,
    pub repo_id: String,
    /// VCS revision or PR ref
    pub revision: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_workspace_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patchset_id: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Workspace {
    pub fn new(
        workspace_id: impl Into<String>,
        repo_id: impl Into<String>,
        revision: impl Into<String>,
    ) -> Self {
        Self {
            workspace_id: workspace_id.into(),
            repo_id: repo_id.into(),
            revision: revision.into(),
            created_at: Utc::now(),
            parent_workspace_id: None,
            patchset_id: None,
            metadata: BTreeMap::new(),
        }
    }
}

/// Overlay change set applied to a parent workspace
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchSet {
    pub patchset_id: String,
    pub workspace_id: String,
    pub files: Vec<String>,
    /// Per-file overlay content
    pub patches: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub compile_verified: bool,
    pub finding_resolved: bool,
    pub no_regression: bool,
}

impl PatchSet {
    pub fn new(patchset_id: impl Into<String>, workspace_id: impl Into<String>) -> Self {
        Self {
            patchset_id: patchset_id.into(),
            workspace_id: workspace_id.into(),
            files: Vec::new(),
            patches: BTreeMap::new(),
            created_at: Utc::now(),
            compile_verified: false,
            finding_resolved: false,
            no_regression: false,
        }
    }

    pub fn add_patch(&mut self, file: impl Into<String>, content: impl Into<String>) {
        let file = file.into();
        if !self.files.contains(&file) {
            self.files.push(file.clone());
        }
        self.patches.insert(file, content.into());
    }

    pub fn is_verified(&self) -> bool {
        self.compile_verified && self.finding_resolved && self.no_regression
    }
}

/// A reported issue bound to evidence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportedFinding {
    pub finding_id: String,
    pub finding_type: String,
    pub severity: String,
    pub message: String,
    pub file_path: String,
    pub line: u32,
    #[serde(default)]
    pub column: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwe_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_prefix_form() {
        let hash = VerificationSnapshot::compute_hash(b"rules-v1");
        assert!(hash.starts_with("sha256:"));
        assert_eq!(hash.len(), "sha256:".len() + 12);
        // Stable across calls
        assert_eq!(hash, VerificationSnapshot::compute_hash(b"rules-v1"));
        assert_ne!(hash, VerificationSnapshot::compute_hash(b"rules-v2"));
    }

    #[test]
    fn test_execution_lifecycle() {
        let mut execution = Execution::new("ex_1", "ws_1", "analyze", "trace_1");
        assert_eq!(execution.state, ExecutionState::Pending);
        execution.start();
        assert_eq!(execution.state, ExecutionState::Running);
        execution.complete(serde_json::json!({"claims": 0}));
        assert!(execution.state.is_terminal());
        assert!(execution.completed_at.is_some());
    }

    #[test]
    fn test_patchset_verification_flags() {
        let mut patchset = PatchSet::new("ps_1", "ws_1");
        patchset.add_patch("a.py", "print('hi')\n");
        assert!(!patchset.is_verified());
        patchset.compile_verified = true;
        patchset.finding_resolved = true;
        patchset.no_regression = true;
        assert!(patchset.is_verified());
        assert_eq!(patchset.files, vec!["a.py"]);
    }
}

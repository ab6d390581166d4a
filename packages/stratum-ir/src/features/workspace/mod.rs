//! C12: Workspaces, patchset overlays and execution records
//!
//! Workspaces are immutable revision snapshots. A new revision is a child
//! workspace referring to its parent plus a patchset; patchsets apply as
//! overlays, never mutating the base. Reads within an open overlay
//! transaction see the written bytes; rollback discards everything
//! atomically.

use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

use crate::shared::contracts::{Execution, PatchSet, VerificationSnapshot, Workspace};
use crate::shared::models::{Result, StratumError};

/// In-memory workspace store
#[derive(Default)]
pub struct WorkspaceStore {
    workspaces: RwLock<HashMap<String, Workspace>>,
    patchsets: RwLock<HashMap<String, PatchSet>>,
    executions: RwLock<HashMap<String, Execution>>,
    /// Base file contents per workspace
    base_files: RwLock<HashMap<String, BTreeMap<String, String>>>,
}

impl WorkspaceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a root workspace over a set of base files.
    pub fn create_workspace(
        &self,
        repo_id: &str,
        revision: &str,
        files: BTreeMap<String, String>,
    ) -> Workspace {
        let workspace = Workspace::new(format!("ws_{}", Uuid::new_v4().simple()), repo_id, revision);
        self.base_files
            .write()
            .insert(workspace.workspace_id.clone(), files);
        self.workspaces
            .write()
            .insert(workspace.workspace_id.clone(), workspace.clone());
        workspace
    }

    pub fn get_workspace(&self, workspace_id: &str) -> Option<Workspace> {
        self.workspaces.read().get(workspace_id).cloned()
    }

    /// Derive a child workspace by applying a patchset as an overlay. The
    /// parent is never mutated.
    pub fn derive_workspace(
        &self,
        parent_workspace_id: &str,
        patchset: PatchSet,
    ) -> Result<Workspace> {
        let parent = self
            .get_workspace(parent_workspace_id)
            .ok_or_else(|| StratumError::query(format!("workspace not found: {}", parent_workspace_id)))?;

        let mut files = self
            .base_files
            .read()
            .get(parent_workspace_id)
            .cloned()
            .unwrap_or_default();
        for (path, content) in &patchset.patches {
            validate_overlay_path(path)?;
            files.insert(path.clone(), content.clone());
        }

        let mut child = Workspace::new(
            format!("ws_{}", Uuid::new_v4().simple()),
            parent.repo_id.clone(),
            parent.revision.clone(),
        );
        child.parent_workspace_id = Some(parent.workspace_id.clone());
        child.patchset_id = Some(patchset.patchset_id.clone());

        self.base_files
            .write()
            .insert(child.workspace_id.clone(), files);
        self.patchsets
            .write()
            .insert(patchset.patchset_id.clone(), patchset);
        self.workspaces
            .write()
            .insert(child.workspace_id.clone(), child.clone());
        Ok(child)
    }

    pub fn read_file(&self, workspace_id: &str, path: &str) -> Option<String> {
        self.base_files
            .read()
            .get(workspace_id)
            .and_then(|files| files.get(path).cloned())
    }

    pub fn get_patchset(&self, patchset_id: &str) -> Option<PatchSet> {
        self.patchsets.read().get(patchset_id).cloned()
    }

    /// Open an overlay transaction on a workspace.
    pub fn begin_overlay(&self, workspace_id: &str) -> Result<OverlayTransaction<'_>> {
        if !self.workspaces.read().contains_key(workspace_id) {
            return Err(StratumError::query(format!(
                "workspace not found: {}",
                workspace_id
            )));
        }
        Ok(OverlayTransaction {
            store: self,
            workspace_id: workspace_id.to_string(),
            writes: BTreeMap::new(),
            committed: false,
        })
    }

    // ------------------------------------------------------------------
    // Executions
    // ------------------------------------------------------------------

    pub fn create_execution(
        &self,
        workspace_id: &str,
        spec_type: &str,
        snapshot: VerificationSnapshot,
    ) -> Result<Execution> {
        if !self.workspaces.read().contains_key(workspace_id) {
            return Err(StratumError::query(format!(
                "workspace not found: {}",
                workspace_id
            )));
        }
        let execution = Execution::new(
            format!("ex_{}", Uuid::new_v4().simple()),
            workspace_id,
            spec_type,
            format!("trace_{}", Uuid::new_v4().simple()),
        )
        .with_snapshot(snapshot);
        self.executions
            .write()
            .insert(execution.execution_id.clone(), execution.clone());
        Ok(execution)
    }

    pub fn update_execution(&self, execution: Execution) {
        self.executions
            .write()
            .insert(execution.execution_id.clone(), execution);
    }

    pub fn get_execution(&self, execution_id: &str) -> Option<Execution> {
        self.executions.read().get(execution_id).cloned()
    }
}

/// Overlay transaction: writes are visible to reads within the same
/// transaction; commit produces a patchset, rollback discards all writes.
pub struct OverlayTransaction<'a> {
    store: &'a WorkspaceStore,
    workspace_id: String,
    writes: BTreeMap<String, String>,
    committed: bool,
}

impl<'a> OverlayTransaction<'a> {
    pub fn write(&mut self, path: &str, content: impl Into<String>) -> Result<()> {
        validate_overlay_path(path)?;
        self.writes.insert(path.to_string(), content.into());
        Ok(())
    }

    /// Read-your-writes, then the workspace base.
    pub fn read(&self, path: &str) -> Option<String> {
        self.writes
            .get(path)
            .cloned()
            .or_else(|| self.store.read_file(&self.workspace_id, path))
    }

    /// Discard every write.
    pub fn rollback(mut self) {
        self.writes.clear();
        self.committed = false;
    }

    /// Produce a patchset holding the writes (the caller derives the child
    /// workspace from it).
    pub fn commit(mut self) -> PatchSet {
        let mut patchset = PatchSet::new(
            format!("ps_{}", Uuid::new_v4().simple()),
            self.workspace_id.clone(),
        );
        for (path, content) in std::mem::take(&mut self.writes) {
            patchset.add_patch(path, content);
        }
        self.committed = true;
        patchset
    }
}

/// Overlay paths must stay inside the workspace: no traversal, no
/// absolute paths, no symlink-style escapes.
fn validate_overlay_path(path: &str) -> Result<()> {
    if path.starts_with('/') || path.starts_with('\\') {
        return Err(StratumError::validation(format!(
            "absolute path rejected: {}",
            path
        )));
    }
    if path.split(['/', '\\']).any(|segment| segment == "..") {
        return Err(StratumError::validation(format!(
            "path escapes workspace: {}",
            path
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_files() -> BTreeMap<String, String> {
        BTreeMap::from([("api.py".to_string(), "def handler():\n    pass\n".to_string())])
    }

    #[test]
    fn test_overlay_write_then_read() {
        let store = WorkspaceStore::new();
        let workspace = store.create_workspace("r", "rev1", base_files());

        let mut transaction = store.begin_overlay(&workspace.workspace_id).unwrap();
        transaction.write("api.py", "def handler():\n    return 1\n").unwrap();
        assert_eq!(
            transaction.read("api.py").unwrap(),
            "def handler():\n    return 1\n"
        );
        // Unwritten files read through to the base
        assert!(transaction.read("missing.py").is_none());
    }

    #[test]
    fn test_rollback_discards_atomically() {
        let store = WorkspaceStore::new();
        let workspace = store.create_workspace("r", "rev1", base_files());

        let mut transaction = store.begin_overlay(&workspace.workspace_id).unwrap();
        transaction.write("api.py", "changed").unwrap();
        transaction.write("new.py", "content").unwrap();
        transaction.rollback();

        // Base untouched
        assert_eq!(
            store.read_file(&workspace.workspace_id, "api.py").unwrap(),
            "def handler():\n    pass\n"
        );
    }

    #[test]
    fn test_escaping_paths_rejected() {
        let store = WorkspaceStore::new();
        let workspace = store.create_workspace("r", "rev1", base_files());
        let mut transaction = store.begin_overlay(&workspace.workspace_id).unwrap();

        assert!(transaction.write("../outside.py", "x").is_err());
        assert!(transaction.write("/etc/passwd", "x").is_err());
        assert!(transaction.write("a/../../b.py", "x").is_err());
        assert!(transaction.write("nested/ok.py", "x").is_ok());
    }

    #[test]
    fn test_derived_workspace_is_overlay() {
        let store = WorkspaceStore::new();
        let parent = store.create_workspace("r", "rev1", base_files());

        let mut transaction = store.begin_overlay(&parent.workspace_id).unwrap();
        transaction.write("api.py", "patched").unwrap();
        let patchset = transaction.commit();
        let child = store.derive_workspace(&parent.workspace_id, patchset).unwrap();

        assert_eq!(store.read_file(&child.workspace_id, "api.py").unwrap(), "patched");
        // Parent base never mutates
        assert_eq!(
            store.read_file(&parent.workspace_id, "api.py").unwrap(),
            "def handler():\n    pass\n"
        );
        assert_eq!(child.parent_workspace_id.as_deref(), Some(parent.workspace_id.as_str()));
        assert!(child.patchset_id.is_some());
    }

    #[test]
    fn test_execution_records() {
        let store = WorkspaceStore::new();
        let workspace = store.create_workspace("r", "rev1", base_files());
        let snapshot = VerificationSnapshot {
            engine_version: "0.1.0".into(),
            ruleset_hash: VerificationSnapshot::compute_hash(b"rules"),
            policies_hash: VerificationSnapshot::compute_hash(b"policies"),
            index_snapshot_id: "s1".into(),
            repo_revision: "rev1".into(),
        };

        let mut execution = store
            .create_execution(&workspace.workspace_id, "analyze", snapshot)
            .unwrap();
        execution.start();
        execution.complete(serde_json::json!({"claims": 0}));
        store.update_execution(execution.clone());

        let stored = store.get_execution(&execution.execution_id).unwrap();
        assert!(stored.state.is_terminal());
        assert!(stored.verification_snapshot.is_some());
    }
}

//! IR generation domain: scope discipline and stable identity

use sha2::{Digest, Sha256};
use std::collections::HashMap;

use crate::shared::models::{EdgeKind, NodeKind};

/// Scope kind on the FQN stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Module,
    Class,
    Function,
}

#[derive(Debug, Clone)]
pub struct ScopeFrame {
    pub kind: ScopeKind,
    pub name: String,
    pub node_id: Option<String>,
}

/// Stack-based scope tracker maintaining module/class/function FQNs
#[derive(Debug, Default)]
pub struct ScopeStack {
    frames: Vec<ScopeFrame>,
}

impl ScopeStack {
    pub fn new(module_path: impl Into<String>) -> Self {
        Self {
            frames: vec![ScopeFrame {
                kind: ScopeKind::Module,
                name: module_path.into(),
                node_id: None,
            }],
        }
    }

    pub fn push(&mut self, kind: ScopeKind, name: impl Into<String>, node_id: Option<String>) {
        self.frames.push(ScopeFrame {
            kind,
            name: name.into(),
            node_id,
        });
    }

    /// Bind the current (root) frame to its emitted node
    pub fn attach_node_id(&mut self, node_id: impl Into<String>) {
        if let Some(frame) = self.frames.last_mut() {
            frame.node_id = Some(node_id.into());
        }
    }

    pub fn pop(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    /// Dotted FQN of the current scope
    pub fn current_fqn(&self) -> String {
        self.frames
            .iter()
            .map(|f| f.name.as_str())
            .filter(|n| !n.is_empty())
            .collect::<Vec<_>>()
            .join(".")
    }

    /// FQN a child named `name` would get in the current scope
    pub fn child_fqn(&self, name: &str) -> String {
        let current = self.current_fqn();
        if current.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", current, name)
        }
    }

    /// Node id of the nearest enclosing scope that has one
    pub fn enclosing_node_id(&self) -> Option<&str> {
        self.frames
            .iter()
            .rev()
            .find_map(|f| f.node_id.as_deref())
    }

    /// Are we directly inside a class body?
    pub fn in_class(&self) -> bool {
        self.frames
            .last()
            .map(|f| f.kind == ScopeKind::Class)
            .unwrap_or(false)
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}

/// Deterministic id generation
///
/// Node ids hash the canonical identity fields; two runs on identical
/// input yield bit-identical ids, and adding unrelated files never
/// changes ids of existing files.
#[derive(Debug, Default)]
pub struct IdGenerator {
    /// Dense (caller, callee) call-occurrence counters
    call_occurrences: HashMap<(String, String), u32>,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_id(
        repo_id: &str,
        kind: NodeKind,
        file_path: &str,
        fqn: &str,
        language: &str,
    ) -> String {
        let mut hasher = Sha256::new();
        hasher.update(repo_id.as_bytes());
        hasher.update(b"\x1f");
        hasher.update(kind.as_str().as_bytes());
        hasher.update(b"\x1f");
        hasher.update(file_path.as_bytes());
        hasher.update(b"\x1f");
        hasher.update(fqn.as_bytes());
        hasher.update(b"\x1f");
        hasher.update(language.as_bytes());
        let digest = format!("{:x}", hasher.finalize());
        format!("node:{}", &digest[..16])
    }

    /// Edge id over (kind, source, target, occurrence). The occurrence
    /// index distinguishes multi-edges; for Calls it is maintained in the
    /// dense counter map, O(1) per call site.
    pub fn edge_id(
        &mut self,
        kind: EdgeKind,
        source_id: &str,
        target_id: &str,
    ) -> (String, u32) {
        let occurrence = if kind == EdgeKind::Calls {
            let counter = self
                .call_occurrences
                .entry((source_id.to_string(), target_id.to_string()))
                .or_insert(0);
            let value = *counter;
            *counter += 1;
            value
        } else {
            0
        };

        let mut hasher = Sha256::new();
        hasher.update(kind.as_str().as_bytes());
        hasher.update(b"\x1f");
        hasher.update(source_id.as_bytes());
        hasher.update(b"\x1f");
        hasher.update(target_id.as_bytes());
        hasher.update(b"\x1f");
        hasher.update(occurrence.to_le_bytes());
        let digest = format!("{:x}", hasher.finalize());
        (format!("edge:{}", &digest[..16]), occurrence)
    }
}

/// Module path from a relative file path: `pkg/mod.py` -> `pkg.mod`
pub fn module_path_for(file_path: &str) -> String {
    let without_ext = file_path
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(file_path);
    without_ext
        .trim_start_matches("./")
        .replace(['/', '\\'], ".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_stack_fqns() {
        let mut scopes = ScopeStack::new("pkg.mod");
        assert_eq!(scopes.current_fqn(), "pkg.mod");

        scopes.push(ScopeKind::Class, "Service", Some("node:c".into()));
        assert_eq!(scopes.child_fqn("run"), "pkg.mod.Service.run");
        assert!(scopes.in_class());

        scopes.push(ScopeKind::Function, "run", Some("node:f".into()));
        assert_eq!(scopes.current_fqn(), "pkg.mod.Service.run");
        assert_eq!(scopes.enclosing_node_id(), Some("node:f"));

        scopes.pop();
        scopes.pop();
        assert_eq!(scopes.current_fqn(), "pkg.mod");
    }

    #[test]
    fn test_node_id_stability() {
        let a = IdGenerator::node_id("repo", NodeKind::Function, "a.py", "a.f", "python");
        let b = IdGenerator::node_id("repo", NodeKind::Function, "a.py", "a.f", "python");
        assert_eq!(a, b);
        assert!(a.starts_with("node:"));

        let c = IdGenerator::node_id("repo", NodeKind::Function, "b.py", "a.f", "python");
        assert_ne!(a, c);
    }

    #[test]
    fn test_call_occurrence_counter() {
        let mut generator = IdGenerator::new();
        let (e1, occ1) = generator.edge_id(EdgeKind::Calls, "node:a", "node:b");
        let (e2, occ2) = generator.edge_id(EdgeKind::Calls, "node:a", "node:b");
        assert_ne!(e1, e2);
        assert_eq!(occ1, 0);
        assert_eq!(occ2, 1);

        // Non-call kinds do not consume occurrence counters
        let (e3, occ3) = generator.edge_id(EdgeKind::Contains, "node:a", "node:b");
        let (e4, _) = generator.edge_id(EdgeKind::Contains, "node:a", "node:b");
        assert_eq!(e3, e4);
        assert_eq!(occ3, 0);
    }

    #[test]
    fn test_module_path() {
        assert_eq!(module_path_for("pkg/mod.py"), "pkg.mod");
        assert_eq!(module_path_for("./api.py"), "api");
        assert_eq!(module_path_for("src\\app.ts"), "src.app");
    }
}

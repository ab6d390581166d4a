//! IR builder - stateful accumulator shared by the language visitors
//!
//! Owns the scope stack, the id generator and the output vectors. Visitors
//! call `emit_node`/`emit_edge`; malformed declarations are skipped with a
//! diagnostic, never a panic or error return.

use sha2::{Digest, Sha256};

use crate::features::ir_generation::domain::{IdGenerator, ScopeStack};
use crate::shared::models::{
    AttrMap, Diagnostic, Edge, EdgeKind, Node, NodeKind, Span,
};

/// Call site pending resolution against nodes of the same document
#[derive(Debug, Clone)]
pub struct PendingCall {
    pub caller_node_id: String,
    pub callee_name: String,
    pub span: Span,
}

pub struct IrBuilder {
    pub repo_id: String,
    pub file_path: String,
    pub language: String,
    pub scopes: ScopeStack,
    ids: IdGenerator,

    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub diagnostics: Vec<Diagnostic>,
    pub pending_calls: Vec<PendingCall>,

    pub module_node_id: String,
}

impl IrBuilder {
    pub fn new(
        repo_id: impl Into<String>,
        file_path: impl Into<String>,
        language: impl Into<String>,
        module_path: impl Into<String>,
        module_span: Span,
    ) -> Self {
        let repo_id = repo_id.into();
        let file_path = file_path.into();
        let language = language.into();
        let module_path = module_path.into();

        let module_node_id = IdGenerator::node_id(
            &repo_id,
            NodeKind::Module,
            &file_path,
            &module_path,
            &language,
        );

        let module_node = Node::new(
            module_node_id.clone(),
            NodeKind::Module,
            module_path.clone(),
            file_path.clone(),
            module_span,
            language.clone(),
        );

        // Module frame carries the module node id for Contains edges
        let mut scopes = ScopeStack::new(module_path);
        scopes.attach_node_id(module_node_id.clone());

        Self {
            repo_id,
            file_path,
            language,
            scopes,
            ids: IdGenerator::new(),
            nodes: vec![module_node],
            edges: Vec::new(),
            diagnostics: Vec::new(),
            pending_calls: Vec::new(),
            module_node_id,
        }
    }

    /// Emit a node in the current scope, with a Contains edge from the
    /// enclosing scope node. Returns the new node id.
    pub fn emit_node(
        &mut self,
        kind: NodeKind,
        fqn: &str,
        span: Span,
        attrs: AttrMap,
    ) -> String {
        let id = IdGenerator::node_id(&self.repo_id, kind, &self.file_path, fqn, &self.language);

        let parent_id = self
            .scopes
            .enclosing_node_id()
            .unwrap_or(&self.module_node_id)
            .to_string();

        let mut node = Node::new(
            id.clone(),
            kind,
            fqn.to_string(),
            self.file_path.clone(),
            span,
            self.language.clone(),
        )
        .with_parent(parent_id.clone())
        .with_attrs(attrs);
        node.local_seq = self.nodes.len() as u64;
        self.nodes.push(node);

        self.emit_edge(EdgeKind::Contains, &parent_id, &id, Some(span), AttrMap::new());
        id
    }

    pub fn emit_edge(
        &mut self,
        kind: EdgeKind,
        source_id: &str,
        target_id: &str,
        span: Option<Span>,
        mut attrs: AttrMap,
    ) -> String {
        let (id, occurrence) = self.ids.edge_id(kind, source_id, target_id);
        if occurrence > 0 {
            attrs.insert(
                crate::shared::models::attrs::keys::OCCURRENCE.to_string(),
                (occurrence as i64).into(),
            );
        }

        let mut edge = Edge::new(id.clone(), kind, source_id, target_id).with_attrs(attrs);
        edge.span = span;
        edge.local_seq = self.edges.len() as u64;
        self.edges.push(edge);
        id
    }

    /// Record a malformed declaration and continue
    pub fn skip_malformed(&mut self, what: &str, span: Span) {
        self.diagnostics.push(
            Diagnostic::warning(
                "ir_generation",
                self.file_path.clone(),
                format!("skipped malformed {}", what),
            )
            .with_span(span),
        );
    }

    pub fn record_call(&mut self, caller_node_id: &str, callee_name: &str, span: Span) {
        self.pending_calls.push(PendingCall {
            caller_node_id: caller_node_id.to_string(),
            callee_name: callee_name.to_string(),
            span,
        });
    }

    /// Resolve pending call sites against nodes emitted in this document
    /// and emit Calls edges. Unresolvable callees stay in the body
    /// statement summaries only; Calls edges always resolve.
    pub fn resolve_calls(&mut self) {
        use std::collections::HashMap;

        let mut by_name: HashMap<&str, &str> = HashMap::new();
        for node in &self.nodes {
            if matches!(
                node.kind,
                NodeKind::Function | NodeKind::Method | NodeKind::ArrowFunction | NodeKind::Class
            ) {
                if let Some(name) = &node.name {
                    by_name.entry(name.as_str()).or_insert(node.id.as_str());
                }
                by_name.entry(node.fqn.as_str()).or_insert(node.id.as_str());
            }
        }

        let pending = std::mem::take(&mut self.pending_calls);
        let mut resolved: Vec<(String, String, Span)> = Vec::new();
        for call in &pending {
            // `obj.method` resolves by its last segment; plain names as-is
            let simple = call.callee_name.rsplit('.').next().unwrap_or(&call.callee_name);
            let target = by_name
                .get(call.callee_name.as_str())
                .or_else(|| by_name.get(simple));
            if let Some(&target_id) = target {
                if target_id != call.caller_node_id {
                    resolved.push((call.caller_node_id.clone(), target_id.to_string(), call.span));
                }
            }
        }

        for (caller, callee, span) in resolved {
            self.emit_edge(EdgeKind::Calls, &caller, &callee, Some(span), AttrMap::new());
        }
    }

    pub fn content_hash(text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        let digest = format!("{:x}", hasher.finalize());
        digest[..16].to_string()
    }

    /// Attach a content hash to an already-emitted node
    pub fn set_content_hash(&mut self, node_id: &str, body_text: &str) {
        let hash = Self::content_hash(body_text);
        if let Some(node) = self.nodes.iter_mut().find(|n| n.id == node_id) {
            node.content_hash = Some(hash);
        }
    }

    pub fn node_mut(&mut self, node_id: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == node_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> IrBuilder {
        IrBuilder::new("repo", "pkg/mod.py", "python", "pkg.mod", Span::new(1, 0, 50, 0))
    }

    #[test]
    fn test_module_node_created() {
        let b = builder();
        assert_eq!(b.nodes.len(), 1);
        assert_eq!(b.nodes[0].kind, NodeKind::Module);
        assert_eq!(b.nodes[0].fqn, "pkg.mod");
    }

    #[test]
    fn test_emit_node_adds_contains_edge() {
        let mut b = builder();
        let id = b.emit_node(
            NodeKind::Function,
            "pkg.mod.handler",
            Span::new(3, 0, 9, 0),
            AttrMap::new(),
        );
        assert_eq!(b.nodes.len(), 2);
        assert_eq!(b.edges.len(), 1);
        let edge = &b.edges[0];
        assert_eq!(edge.kind, EdgeKind::Contains);
        assert_eq!(edge.source_id, b.module_node_id);
        assert_eq!(edge.target_id, id);
    }

    #[test]
    fn test_call_resolution_within_document() {
        let mut b = builder();
        let caller = b.emit_node(
            NodeKind::Function,
            "pkg.mod.outer",
            Span::new(1, 0, 5, 0),
            AttrMap::new(),
        );
        let callee = b.emit_node(
            NodeKind::Function,
            "pkg.mod.inner",
            Span::new(7, 0, 9, 0),
            AttrMap::new(),
        );
        b.record_call(&caller, "inner", Span::new(2, 4, 2, 11));
        b.record_call(&caller, "unknown_external", Span::new(3, 4, 3, 20));
        b.resolve_calls();

        let calls: Vec<&Edge> = b.edges.iter().filter(|e| e.kind == EdgeKind::Calls).collect();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].source_id, caller);
        assert_eq!(calls[0].target_id, callee);
    }

    #[test]
    fn test_multi_call_occurrences_distinct() {
        let mut b = builder();
        let caller = b.emit_node(NodeKind::Function, "pkg.mod.f", Span::new(1, 0, 5, 0), AttrMap::new());
        let callee = b.emit_node(NodeKind::Function, "pkg.mod.g", Span::new(7, 0, 9, 0), AttrMap::new());
        b.record_call(&caller, "g", Span::new(2, 0, 2, 3));
        b.record_call(&caller, "g", Span::new(3, 0, 3, 3));
        b.resolve_calls();

        let calls: Vec<&Edge> = b.edges.iter().filter(|e| e.kind == EdgeKind::Calls).collect();
        assert_eq!(calls.len(), 2);
        assert_ne!(calls[0].id, calls[1].id);
    }
}

//! IR Node - core vertex of the structural IR

use serde::{Deserialize, Serialize};

use super::attrs::AttrMap;
use super::span::Span;

/// Node kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeKind {
    File,
    Module,
    Class,
    Interface,
    Enum,
    Function,
    Method,
    ArrowFunction,
    Variable,
    Field,
    Parameter,
    Import,
    Constant,
    TypeAlias,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::File => "File",
            NodeKind::Module => "Module",
            NodeKind::Class => "Class",
            NodeKind::Interface => "Interface",
            NodeKind::Enum => "Enum",
            NodeKind::Function => "Function",
            NodeKind::Method => "Method",
            NodeKind::ArrowFunction => "ArrowFunction",
            NodeKind::Variable => "Variable",
            NodeKind::Field => "Field",
            NodeKind::Parameter => "Parameter",
            NodeKind::Import => "Import",
            NodeKind::Constant => "Constant",
            NodeKind::TypeAlias => "TypeAlias",
        }
    }

    pub fn from_str_loose(s: &str) -> Option<NodeKind> {
        let normalized = s.trim().to_ascii_lowercase();
        let kind = match normalized.as_str() {
            "file" => NodeKind::File,
            "module" => NodeKind::Module,
            "class" => NodeKind::Class,
            "interface" => NodeKind::Interface,
            "enum" => NodeKind::Enum,
            "function" => NodeKind::Function,
            "method" => NodeKind::Method,
            "arrowfunction" | "arrow_function" => NodeKind::ArrowFunction,
            "variable" => NodeKind::Variable,
            "field" => NodeKind::Field,
            "parameter" => NodeKind::Parameter,
            "import" => NodeKind::Import,
            "constant" => NodeKind::Constant,
            "typealias" | "type_alias" => NodeKind::TypeAlias,
            _ => return None,
        };
        Some(kind)
    }

    /// Kinds that define callable bodies (CFG/DFG owners)
    pub fn is_callable(&self) -> bool {
        matches!(
            self,
            NodeKind::Function | NodeKind::Method | NodeKind::ArrowFunction
        )
    }

    /// Kinds that participate in symbol occurrence tracking
    pub fn is_symbol(&self) -> bool {
        !matches!(self, NodeKind::File | NodeKind::Module)
    }
}

/// Per-function control flow summary carried on the defining node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlFlowSummary {
    pub cyclomatic_complexity: u32,
    pub has_loop: bool,
    pub has_try: bool,
    pub branch_count: u32,
}

/// IR Node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Stable hash id (`node:<16 hex>`)
    pub id: String,
    pub kind: NodeKind,
    /// Fully qualified name (dotted path from module root)
    pub fqn: String,
    /// Simple name (last FQN segment); None for anonymous nodes
    pub name: Option<String>,
    pub file_path: String,
    pub span: Span,
    pub language: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docstring: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_span: Option<Span>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub control_flow_summary: Option<ControlFlowSummary>,
    /// Free-form attributes (decorators, generics, return type, hooks, ...)
    #[serde(default, skip_serializing_if = "AttrMap::is_empty")]
    pub attrs: AttrMap,
    /// Dense insertion-order sequence; tie-breaker for total ordering
    #[serde(default)]
    pub local_seq: u64,
}

impl Node {
    pub fn new(
        id: String,
        kind: NodeKind,
        fqn: String,
        file_path: String,
        span: Span,
        language: String,
    ) -> Self {
        let name = fqn.rsplit('.').next().map(|s| s.to_string());
        Self {
            id,
            kind,
            fqn,
            name,
            file_path,
            span,
            language,
            parent_id: None,
            docstring: None,
            body_span: None,
            content_hash: None,
            control_flow_summary: None,
            attrs: AttrMap::new(),
            local_seq: 0,
        }
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_docstring(mut self, docstring: impl Into<String>) -> Self {
        self.docstring = Some(docstring.into());
        self
    }

    pub fn with_body_span(mut self, span: Span) -> Self {
        self.body_span = Some(span);
        self
    }

    pub fn with_attrs(mut self, attrs: AttrMap) -> Self {
        self.attrs = attrs;
        self
    }

    /// Ordering key for deterministic total ordering:
    /// (file_path, kind, start_line, end_line, local_seq)
    pub fn ordering_key(&self) -> (&str, NodeKind, u32, u32, u64) {
        (
            self.file_path.as_str(),
            self.kind,
            self.span.start_line,
            self.span.end_line,
            self.local_seq,
        )
    }

    /// Private per language convention: leading underscore, dunder excepted
    pub fn is_private(&self) -> bool {
        match &self.name {
            Some(name) => name.starts_with('_') && !name.starts_with("__"),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_node() -> Node {
        Node::new(
            "node:abc123".to_string(),
            NodeKind::Function,
            "pkg.mod.handler".to_string(),
            "pkg/mod.py".to_string(),
            Span::new(10, 0, 20, 0),
            "python".to_string(),
        )
    }

    #[test]
    fn test_name_from_fqn() {
        let node = sample_node();
        assert_eq!(node.name.as_deref(), Some("handler"));
    }

    #[test]
    fn test_kind_roundtrip() {
        assert_eq!(NodeKind::from_str_loose("method"), Some(NodeKind::Method));
        assert_eq!(
            NodeKind::from_str_loose("ARROW_FUNCTION"),
            Some(NodeKind::ArrowFunction)
        );
        assert_eq!(NodeKind::from_str_loose("nope"), None);
    }

    #[test]
    fn test_privacy_convention() {
        let mut node = sample_node();
        node.name = Some("_helper".to_string());
        assert!(node.is_private());
        node.name = Some("__init__".to_string());
        assert!(!node.is_private());
    }
}

//! IR Edge - directed connection between nodes

use serde::{Deserialize, Serialize};

use super::attrs::AttrMap;
use super::span::Span;

/// Edge kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EdgeKind {
    Contains,
    Calls,
    Imports,
    Reads,
    Writes,
    Binds,
    FlowsTo,
    CrossLangImport,
    FfiImport,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::Contains => "Contains",
            EdgeKind::Calls => "Calls",
            EdgeKind::Imports => "Imports",
            EdgeKind::Reads => "Reads",
            EdgeKind::Writes => "Writes",
            EdgeKind::Binds => "Binds",
            EdgeKind::FlowsTo => "FlowsTo",
            EdgeKind::CrossLangImport => "CrossLangImport",
            EdgeKind::FfiImport => "FfiImport",
        }
    }

    /// Import-like edges may target unresolved module tokens
    pub fn allows_external_target(&self) -> bool {
        matches!(
            self,
            EdgeKind::Imports | EdgeKind::CrossLangImport | EdgeKind::FfiImport
        )
    }
}

/// IR Edge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    /// Stable hash id (`edge:<16 hex>`)
    pub id: String,
    pub kind: EdgeKind,
    pub source_id: String,
    /// Target node id, or an unresolved module token for import kinds
    pub target_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
    #[serde(default, skip_serializing_if = "AttrMap::is_empty")]
    pub attrs: AttrMap,
    /// Dense insertion-order sequence; tie-breaker for total ordering
    #[serde(default)]
    pub local_seq: u64,
}

impl Edge {
    pub fn new(
        id: String,
        kind: EdgeKind,
        source_id: impl Into<String>,
        target_id: impl Into<String>,
    ) -> Self {
        Self {
            id,
            kind,
            source_id: source_id.into(),
            target_id: target_id.into(),
            span: None,
            attrs: AttrMap::new(),
            local_seq: 0,
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn with_attrs(mut self, attrs: AttrMap) -> Self {
        self.attrs = attrs;
        self
    }

    /// Ordering key for deterministic total ordering:
    /// (source_id, target_id, kind, local_seq)
    pub fn ordering_key(&self) -> (&str, &str, EdgeKind, u64) {
        (
            self.source_id.as_str(),
            self.target_id.as_str(),
            self.kind,
            self.local_seq,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_external_targets() {
        assert!(EdgeKind::Imports.allows_external_target());
        assert!(EdgeKind::FfiImport.allows_external_target());
        assert!(!EdgeKind::Calls.allows_external_target());
        assert!(!EdgeKind::Binds.allows_external_target());
    }

    #[test]
    fn test_ordering_key_shape() {
        let edge = Edge::new("edge:1".into(), EdgeKind::Calls, "a", "b");
        let key = edge.ordering_key();
        assert_eq!(key.0, "a");
        assert_eq!(key.1, "b");
        assert_eq!(key.2, EdgeKind::Calls);
    }
}

//! Control Flow Graph types
//!
//! Shared across flow_graph, ssa, taint and cost features, so they live in
//! shared/models to avoid circular feature dependencies.

use serde::{Deserialize, Serialize};

use super::span::Span;

/// CFG block kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CfgBlockKind {
    Entry,
    Exit,
    Block,
    LoopHeader,
    If,
    Else,
    Try,
    Except,
    Finally,
    Switch,
}

impl CfgBlockKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CfgBlockKind::Entry => "Entry",
            CfgBlockKind::Exit => "Exit",
            CfgBlockKind::Block => "Block",
            CfgBlockKind::LoopHeader => "LoopHeader",
            CfgBlockKind::If => "If",
            CfgBlockKind::Else => "Else",
            CfgBlockKind::Try => "Try",
            CfgBlockKind::Except => "Except",
            CfgBlockKind::Finally => "Finally",
            CfgBlockKind::Switch => "Switch",
        }
    }
}

/// CFG edge label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CfgEdgeKind {
    Unconditional,
    True,
    False,
    Exception,
    Back,
}

impl CfgEdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CfgEdgeKind::Unconditional => "UNCONDITIONAL",
            CfgEdgeKind::True => "TRUE",
            CfgEdgeKind::False => "FALSE",
            CfgEdgeKind::Exception => "EXCEPTION",
            CfgEdgeKind::Back => "BACK",
        }
    }
}

/// CFG basic block
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CfgBlock {
    pub id: String,
    pub kind: CfgBlockKind,
    /// Owning function node id
    pub function_node_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
    /// Statements in source order (text form, for bound heuristics and PDG)
    pub statements: Vec<String>,
    pub predecessors: Vec<String>,
    pub successors: Vec<String>,
    /// Variables defined in this block
    pub defined_vars: Vec<String>,
    /// Variables used in this block
    pub used_vars: Vec<String>,
}

impl CfgBlock {
    pub fn new(id: impl Into<String>, kind: CfgBlockKind, function_node_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            function_node_id: function_node_id.into(),
            span: None,
            statements: Vec::new(),
            predecessors: Vec::new(),
            successors: Vec::new(),
            defined_vars: Vec::new(),
            used_vars: Vec::new(),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }
}

/// CFG edge connecting two basic blocks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CfgEdge {
    pub source_block_id: String,
    pub target_block_id: String,
    pub kind: CfgEdgeKind,
}

impl CfgEdge {
    pub fn new(
        source_block_id: impl Into<String>,
        target_block_id: impl Into<String>,
        kind: CfgEdgeKind,
    ) -> Self {
        Self {
            source_block_id: source_block_id.into(),
            target_block_id: target_block_id.into(),
            kind,
        }
    }
}

/// Per-function control flow graph wrapper (blocks + edges + entry/exit ids)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlFlowGraph {
    pub function_node_id: String,
    pub entry_block_id: String,
    pub exit_block_id: String,
    pub block_ids: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_kind_labels() {
        assert_eq!(CfgEdgeKind::Back.as_str(), "BACK");
        assert_eq!(CfgEdgeKind::Unconditional.as_str(), "UNCONDITIONAL");
    }

    #[test]
    fn test_block_construction() {
        let block = CfgBlock::new("b0", CfgBlockKind::Entry, "node:f")
            .with_span(Span::new(1, 0, 1, 0));
        assert_eq!(block.kind, CfgBlockKind::Entry);
        assert!(block.statements.is_empty());
    }
}

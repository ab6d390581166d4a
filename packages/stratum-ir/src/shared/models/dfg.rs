//! Data flow graph snapshot and SSA context

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::dominator::DominatorTree;
use super::span::Span;

/// DFG variable with SSA versioning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DfgVariable {
    /// Base variable name
    pub name: String,
    /// Owning function node id
    pub function_id: String,
    /// Highest SSA version assigned
    pub version_count: u32,
}

/// Event kind in the data flow graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DfgEventKind {
    Read,
    Write,
    Phi,
}

impl DfgEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DfgEventKind::Read => "read",
            DfgEventKind::Write => "write",
            DfgEventKind::Phi => "phi",
        }
    }
}

/// Single def/use/phi event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DfgEvent {
    pub id: String,
    pub kind: DfgEventKind,
    pub variable: String,
    /// SSA version observed or produced
    pub version: u32,
    pub block_id: String,
    pub function_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
}

/// Data flow edge between events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DfgEdge {
    pub from_event: String,
    pub to_event: String,
    pub variable: String,
}

/// Document-level DFG snapshot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DfgSnapshot {
    pub variables: Vec<DfgVariable>,
    pub events: Vec<DfgEvent>,
    pub edges: Vec<DfgEdge>,
}

impl DfgSnapshot {
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty() && self.events.is_empty() && self.edges.is_empty()
    }

    pub fn merge(&mut self, other: DfgSnapshot) {
        self.variables.extend(other.variables);
        self.events.extend(other.events);
        self.edges.extend(other.edges);
    }
}

/// Phi node placement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhiNode {
    pub variable: String,
    pub block_id: String,
    pub version: u32,
    /// Incoming (predecessor block id, version) pairs
    pub operands: Vec<(String, u32)>,
}

/// Per-function SSA context
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SsaContext {
    pub function_id: String,
    pub phi_nodes: Vec<PhiNode>,
    /// Final version per variable
    pub versions: BTreeMap<String, u32>,
    pub dominator_tree: DominatorTree,
}

impl SsaContext {
    pub fn new(function_id: impl Into<String>) -> Self {
        Self {
            function_id: function_id.into(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_merge() {
        let mut a = DfgSnapshot::default();
        a.variables.push(DfgVariable {
            name: "x".into(),
            function_id: "f".into(),
            version_count: 2,
        });
        let mut b = DfgSnapshot::default();
        b.events.push(DfgEvent {
            id: "ev:1".into(),
            kind: DfgEventKind::Write,
            variable: "y".into(),
            version: 0,
            block_id: "b0".into(),
            function_id: "f".into(),
            span: None,
        });

        a.merge(b);
        assert_eq!(a.variables.len(), 1);
        assert_eq!(a.events.len(), 1);
    }
}

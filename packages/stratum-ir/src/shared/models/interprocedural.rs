//! Inter-procedural data flow edges

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterproceduralEdgeKind {
    /// Call argument flows into callee parameter
    ArgToParam,
    /// Callee return flows back to the call site
    ReturnToCallsite,
}

impl InterproceduralEdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterproceduralEdgeKind::ArgToParam => "arg_to_param",
            InterproceduralEdgeKind::ReturnToCallsite => "return_to_callsite",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterproceduralEdge {
    pub kind: InterproceduralEdgeKind,
    /// Caller side: argument expression id or call site node id
    pub from_id: String,
    /// Callee side: parameter node id or callsite expression id
    pub to_id: String,
    pub caller_fqn: String,
    pub callee_fqn: String,
    /// Argument position for ArgToParam edges
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arg_index: Option<u32>,
}

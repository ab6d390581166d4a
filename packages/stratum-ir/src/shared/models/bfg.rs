//! Basic flow graph (straight-line basic blocks)
//!
//! Coarser than the CFG: one block per maximal straight-line segment,
//! used by chunking-style consumers and nesting heuristics.

use serde::{Deserialize, Serialize};

use super::span::Span;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BfgBlock {
    pub id: String,
    pub function_node_id: String,
    pub span: Option<Span>,
    pub statement_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BfgGraph {
    pub function_node_id: String,
    pub block_ids: Vec<String>,
}

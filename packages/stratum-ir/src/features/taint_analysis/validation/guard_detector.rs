//! Guard detection
//!
//! Finds early-exit guard patterns (`if x is None: return`, `if not x:
//! raise ...`) in the CFG. A guard is valid for a sink block iff the guard
//! block dominates it; that check belongs to the callers (constraint
//! validator, path-sensitive taint).

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

use crate::shared::models::{CfgBlock, CfgBlockKind, CfgEdge, CfgEdgeKind, DominatorTree};

/// A detected guard
#[derive(Debug, Clone)]
pub struct Guard {
    pub guarded_var: String,
    pub guard_block_id: String,
    /// Block from which the protection applies (the guard block itself;
    /// everything it dominates past the early exit is protected)
    pub protected_from_id: String,
    pub condition: String,
}

impl Guard {
    /// Valid for a sink block iff the guard dominates it.
    pub fn is_valid_guard(&self, sink_block_id: &str, dominator_tree: &DominatorTree) -> bool {
        dominator_tree.dominates(&self.protected_from_id, sink_block_id)
    }
}

static NONE_CHECK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:if\s+)?([A-Za-z_][A-Za-z0-9_]*)\s+is\s+None").unwrap());
static NOT_CHECK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:if\s+)?not\s+([A-Za-z_][A-Za-z0-9_]*)\b").unwrap());

#[derive(Debug, Default)]
pub struct GuardDetector;

impl GuardDetector {
    pub fn new() -> Self {
        Self
    }

    /// Detect guards in one function's CFG.
    pub fn detect(&self, blocks: &[&CfgBlock], edges: &[&CfgEdge]) -> Vec<Guard> {
        let exit_id = blocks
            .iter()
            .find(|b| b.kind == CfgBlockKind::Exit)
            .map(|b| b.id.clone());

        let mut true_successor: HashMap<&str, &str> = HashMap::new();
        for edge in edges {
            if edge.kind == CfgEdgeKind::True {
                true_successor.insert(edge.source_block_id.as_str(), edge.target_block_id.as_str());
            }
        }
        let block_by_id: HashMap<&str, &CfgBlock> =
            blocks.iter().map(|b| (b.id.as_str(), *b)).collect();

        let mut guards = Vec::new();

        for block in blocks {
            if block.kind != CfgBlockKind::If {
                continue;
            }
            let Some(condition) = block.statements.first() else {
                continue;
            };

            let guarded_var = NONE_CHECK_RE
                .captures(condition)
                .or_else(|| NOT_CHECK_RE.captures(condition))
                .map(|captures| captures.get(1).unwrap().as_str().to_string());
            let Some(guarded_var) = guarded_var else {
                continue;
            };

            // The true branch must exit early for this to guard the rest
            let Some(&true_block_id) = true_successor.get(block.id.as_str()) else {
                continue;
            };
            let exits_early = block_by_id
                .get(true_block_id)
                .map(|true_block| {
                    let returns = true_block
                        .statements
                        .iter()
                        .any(|s| s.starts_with("return") || s.starts_with("raise"));
                    let jumps_to_exit = exit_id
                        .as_ref()
                        .map(|exit| {
                            edges.iter().any(|e| {
                                e.source_block_id == true_block_id && &e.target_block_id == exit
                            })
                        })
                        .unwrap_or(false);
                    returns || jumps_to_exit
                })
                .unwrap_or(false);

            if exits_early {
                tracing::debug!("guard detected: {} at {}", guarded_var, block.id);
                guards.push(Guard {
                    guarded_var,
                    guard_block_id: block.id.clone(),
                    protected_from_id: block.id.clone(),
                    condition: condition.clone(),
                });
            }
        }

        guards
    }
}

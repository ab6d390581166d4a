//! SSA construction
//!
//! Phi nodes are placed at iterated dominance frontiers of each variable's
//! definition blocks; versions are numbered along a dominator-tree walk.
//! Granularity is block-level (the CFG records defined/used variables per
//! block), which is what the taint and guard consumers need.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::features::ssa::infrastructure::dominator::compute_dominator_tree;
use crate::shared::models::{
    CfgBlock, CfgEdge, DfgEvent, DfgEventKind, DominatorTree, PhiNode, SsaContext,
};

/// SSA build output for one function
pub struct SsaResult {
    pub context: SsaContext,
    pub events: Vec<DfgEvent>,
}

pub struct SsaBuilder;

impl SsaBuilder {
    pub fn build(
        function_id: &str,
        blocks: &[&CfgBlock],
        edges: &[&CfgEdge],
        entry_id: &str,
    ) -> SsaResult {
        let dominator_tree = compute_dominator_tree(blocks, edges, entry_id);

        // Definition sites per variable
        let mut def_blocks: HashMap<&str, Vec<&str>> = HashMap::new();
        for block in blocks {
            for var in &block.defined_vars {
                def_blocks.entry(var.as_str()).or_default().push(block.id.as_str());
            }
        }

        // Phi placement at iterated dominance frontiers; BTreeMap keeps
        // per-block phi emission in variable order across runs
        let mut phi_sites: BTreeMap<&str, HashSet<String>> = BTreeMap::new();
        for (&var, defs) in &def_blocks {
            let mut placed: HashSet<String> = HashSet::new();
            let mut worklist: Vec<String> = defs.iter().map(|s| s.to_string()).collect();
            while let Some(block_id) = worklist.pop() {
                for frontier_block in dominator_tree.frontier(&block_id) {
                    if placed.insert(frontier_block.clone()) {
                        worklist.push(frontier_block.clone());
                    }
                }
            }
            if !placed.is_empty() {
                phi_sites.insert(var, placed);
            }
        }

        // Rename along a dominator-tree preorder walk
        let block_by_id: HashMap<&str, &CfgBlock> =
            blocks.iter().map(|b| (b.id.as_str(), *b)).collect();
        let preds: HashMap<&str, Vec<&str>> = {
            let mut map: HashMap<&str, Vec<&str>> = HashMap::new();
            for edge in edges {
                map.entry(edge.target_block_id.as_str())
                    .or_default()
                    .push(edge.source_block_id.as_str());
            }
            map
        };

        let mut versions: BTreeMap<String, u32> = BTreeMap::new();
        let mut current: HashMap<String, u32> = HashMap::new();
        let mut phi_nodes: Vec<PhiNode> = Vec::new();
        let mut events: Vec<DfgEvent> = Vec::new();
        let mut event_counter = 0u64;

        for block_id in dom_preorder(&dominator_tree, entry_id) {
            let Some(block) = block_by_id.get(block_id.as_str()) else {
                continue;
            };

            // Phis first
            for (&var, sites) in &phi_sites {
                if sites.contains(&block_id) {
                    let version = bump(&mut versions, var);
                    current.insert(var.to_string(), version);
                    let operands: Vec<(String, u32)> = preds
                        .get(block_id.as_str())
                        .map(|ps| {
                            ps.iter()
                                .map(|p| (p.to_string(), current.get(var).copied().unwrap_or(0)))
                                .collect()
                        })
                        .unwrap_or_default();
                    phi_nodes.push(PhiNode {
                        variable: var.to_string(),
                        block_id: block_id.clone(),
                        version,
                        operands,
                    });
                    events.push(make_event(
                        &mut event_counter,
                        DfgEventKind::Phi,
                        var,
                        version,
                        &block_id,
                        function_id,
                        block.span,
                    ));
                }
            }

            // Uses read the reaching version
            for var in &block.used_vars {
                let version = current.get(var.as_str()).copied().unwrap_or(0);
                events.push(make_event(
                    &mut event_counter,
                    DfgEventKind::Read,
                    var,
                    version,
                    &block_id,
                    function_id,
                    block.span,
                ));
            }

            // Definitions produce fresh versions
            for var in &block.defined_vars {
                let version = bump(&mut versions, var);
                current.insert(var.clone(), version);
                events.push(make_event(
                    &mut event_counter,
                    DfgEventKind::Write,
                    var,
                    version,
                    &block_id,
                    function_id,
                    block.span,
                ));
            }
        }

        let mut context = SsaContext::new(function_id);
        context.phi_nodes = phi_nodes;
        context.versions = versions;
        context.dominator_tree = dominator_tree;

        SsaResult { context, events }
    }
}

fn bump(versions: &mut BTreeMap<String, u32>, var: &str) -> u32 {
    let counter = versions.entry(var.to_string()).or_insert(0);
    *counter += 1;
    *counter
}

fn make_event(
    counter: &mut u64,
    kind: DfgEventKind,
    variable: &str,
    version: u32,
    block_id: &str,
    function_id: &str,
    span: Option<crate::shared::models::Span>,
) -> DfgEvent {
    *counter += 1;
    DfgEvent {
        id: format!("ev:{}:{}", function_id, counter),
        kind,
        variable: variable.to_string(),
        version,
        block_id: block_id.to_string(),
        function_id: function_id.to_string(),
        span,
    }
}

/// Preorder over the dominator tree starting at entry
fn dom_preorder(tree: &DominatorTree, entry: &str) -> Vec<String> {
    let mut children: HashMap<&str, Vec<&str>> = HashMap::new();
    for (block, idom) in &tree.idom {
        if block != idom {
            children.entry(idom.as_str()).or_default().push(block.as_str());
        }
    }
    for kids in children.values_mut() {
        kids.sort();
    }

    let mut order = Vec::new();
    let mut stack = vec![entry.to_string()];
    while let Some(block) = stack.pop() {
        order.push(block.clone());
        if let Some(kids) = children.get(block.as_str()) {
            for &kid in kids.iter().rev() {
                stack.push(kid.to_string());
            }
        }
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::{CfgBlockKind, CfgEdgeKind};

    fn block(id: &str, defined: &[&str], used: &[&str]) -> CfgBlock {
        let mut b = CfgBlock::new(id, CfgBlockKind::Block, "node:f");
        b.defined_vars = defined.iter().map(|s| s.to_string()).collect();
        b.used_vars = used.iter().map(|s| s.to_string()).collect();
        b
    }

    fn edge(from: &str, to: &str, kind: CfgEdgeKind) -> CfgEdge {
        CfgEdge::new(from, to, kind)
    }

    /// if/else both defining x forces a phi at the join
    #[test]
    fn test_phi_at_join() {
        let blocks = vec![
            block("entry", &[], &[]),
            block("then", &["x"], &[]),
            block("else", &["x"], &[]),
            block("join", &[], &["x"]),
        ];
        let edges = vec![
            edge("entry", "then", CfgEdgeKind::True),
            edge("entry", "else", CfgEdgeKind::False),
            edge("then", "join", CfgEdgeKind::Unconditional),
            edge("else", "join", CfgEdgeKind::Unconditional),
        ];
        let block_refs: Vec<&CfgBlock> = blocks.iter().collect();
        let edge_refs: Vec<&CfgEdge> = edges.iter().collect();

        let result = SsaBuilder::build("node:f", &block_refs, &edge_refs, "entry");

        let phis: Vec<&PhiNode> = result.context.phi_nodes.iter().collect();
        assert_eq!(phis.len(), 1);
        assert_eq!(phis[0].variable, "x");
        assert_eq!(phis[0].block_id, "join");
        assert_eq!(phis[0].operands.len(), 2);

        // x gets versions in both arms plus the phi
        assert!(result.context.versions["x"] >= 3);
    }

    #[test]
    fn test_straight_line_no_phi() {
        let blocks = vec![block("entry", &["x"], &[]), block("next", &["y"], &["x"])];
        let edges = vec![edge("entry", "next", CfgEdgeKind::Unconditional)];
        let block_refs: Vec<&CfgBlock> = blocks.iter().collect();
        let edge_refs: Vec<&CfgEdge> = edges.iter().collect();

        let result = SsaBuilder::build("node:f", &block_refs, &edge_refs, "entry");
        assert!(result.context.phi_nodes.is_empty());

        let reads: Vec<&DfgEvent> = result
            .events
            .iter()
            .filter(|e| e.kind == DfgEventKind::Read)
            .collect();
        assert_eq!(reads.len(), 1);
        // The read sees the version written in entry
        assert_eq!(reads[0].version, 1);
    }
}

//! Dominator tree computation
//!
//! Iterative algorithm of Cooper, Harvey and Kennedy over reverse
//! postorder, followed by dominance frontier computation. Runs per
//! function on the CFG block graph.

use std::collections::HashMap;

use crate::shared::models::{CfgBlock, CfgEdge, DominatorTree};

/// Compute the dominator tree for one function's blocks.
///
/// `entry_id` must be one of the blocks; unreachable blocks get no idom
/// entry and are ignored by downstream consumers.
pub fn compute_dominator_tree(
    blocks: &[&CfgBlock],
    edges: &[&CfgEdge],
    entry_id: &str,
) -> DominatorTree {
    let known: std::collections::HashSet<&str> = blocks.iter().map(|b| b.id.as_str()).collect();

    let mut successors: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut predecessors: HashMap<&str, Vec<&str>> = HashMap::new();
    for edge in edges {
        // Edges into other functions' blocks are not part of this graph
        if !known.contains(edge.source_block_id.as_str())
            || !known.contains(edge.target_block_id.as_str())
        {
            continue;
        }
        successors
            .entry(edge.source_block_id.as_str())
            .or_default()
            .push(edge.target_block_id.as_str());
        predecessors
            .entry(edge.target_block_id.as_str())
            .or_default()
            .push(edge.source_block_id.as_str());
    }

    // Reverse postorder from entry
    let rpo = reverse_postorder(entry_id, &successors);
    let order_index: HashMap<&str, usize> = rpo.iter().enumerate().map(|(i, &b)| (b, i)).collect();

    let mut idom: HashMap<&str, &str> = HashMap::new();
    idom.insert(entry_id, entry_id);

    let mut changed = true;
    while changed {
        changed = false;
        for &block in rpo.iter().skip(1) {
            let preds = match predecessors.get(block) {
                Some(preds) => preds,
                None => continue,
            };

            // First processed predecessor
            let mut new_idom: Option<&str> = None;
            for &pred in preds {
                if idom.contains_key(pred) {
                    new_idom = Some(match new_idom {
                        None => pred,
                        Some(current) => intersect(pred, current, &idom, &order_index),
                    });
                }
            }

            if let Some(new_idom) = new_idom {
                if idom.get(block) != Some(&new_idom) {
                    idom.insert(block, new_idom);
                    changed = true;
                }
            }
        }
    }

    let mut tree = DominatorTree::new(entry_id);
    for (&block, &dominator) in &idom {
        tree.idom.insert(block.to_string(), dominator.to_string());
    }

    // Dominance frontiers
    for &block in &rpo {
        let preds = match predecessors.get(block) {
            Some(preds) if preds.len() >= 2 => preds,
            _ => continue,
        };
        let Some(&block_idom) = idom.get(block) else {
            continue;
        };
        for &pred in preds {
            if !idom.contains_key(pred) {
                continue;
            }
            let mut runner = pred;
            while runner != block_idom {
                let frontier = tree.frontiers.entry(runner.to_string()).or_default();
                if !frontier.contains(&block.to_string()) {
                    frontier.push(block.to_string());
                }
                match idom.get(runner) {
                    Some(&next) if next != runner => runner = next,
                    _ => break,
                }
            }
        }
    }

    tree
}

fn reverse_postorder<'a>(
    entry: &'a str,
    successors: &HashMap<&'a str, Vec<&'a str>>,
) -> Vec<&'a str> {
    let mut visited: Vec<&str> = Vec::new();
    let mut postorder: Vec<&str> = Vec::new();
    dfs(entry, successors, &mut visited, &mut postorder);
    postorder.reverse();
    postorder
}

fn dfs<'a>(
    block: &'a str,
    successors: &HashMap<&'a str, Vec<&'a str>>,
    visited: &mut Vec<&'a str>,
    postorder: &mut Vec<&'a str>,
) {
    if visited.contains(&block) {
        return;
    }
    visited.push(block);
    if let Some(succs) = successors.get(block) {
        for &succ in succs {
            dfs(succ, successors, visited, postorder);
        }
    }
    postorder.push(block);
}

fn intersect<'a>(
    mut a: &'a str,
    mut b: &'a str,
    idom: &HashMap<&'a str, &'a str>,
    order: &HashMap<&str, usize>,
) -> &'a str {
    while a != b {
        let order_of = |x: &str| order.get(x).copied().unwrap_or(usize::MAX);
        while order_of(a) > order_of(b) {
            a = idom[a];
        }
        while order_of(b) > order_of(a) {
            b = idom[b];
        }
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::{CfgBlockKind, CfgEdgeKind};

    fn block(id: &str) -> CfgBlock {
        CfgBlock::new(id, CfgBlockKind::Block, "node:f")
    }

    fn edge(from: &str, to: &str) -> CfgEdge {
        CfgEdge::new(from, to, CfgEdgeKind::Unconditional)
    }

    /// Diamond: entry -> a, entry -> b, a -> join, b -> join
    #[test]
    fn test_diamond_dominators() {
        let blocks = vec![block("entry"), block("a"), block("b"), block("join")];
        let edges = vec![
            edge("entry", "a"),
            edge("entry", "b"),
            edge("a", "join"),
            edge("b", "join"),
        ];
        let block_refs: Vec<&CfgBlock> = blocks.iter().collect();
        let edge_refs: Vec<&CfgEdge> = edges.iter().collect();

        let tree = compute_dominator_tree(&block_refs, &edge_refs, "entry");

        assert!(tree.dominates("entry", "join"));
        assert!(!tree.dominates("a", "join"));
        assert!(!tree.dominates("b", "join"));
        assert_eq!(tree.immediate_dominator("join"), Some("entry"));

        // Both arms have the join in their frontier
        assert!(tree.frontier("a").contains(&"join".to_string()));
        assert!(tree.frontier("b").contains(&"join".to_string()));
    }

    /// Loop: entry -> header, header -> body, body -> header, header -> after
    #[test]
    fn test_loop_dominators() {
        let blocks = vec![block("entry"), block("header"), block("body"), block("after")];
        let edges = vec![
            edge("entry", "header"),
            edge("header", "body"),
            edge("body", "header"),
            edge("header", "after"),
        ];
        let block_refs: Vec<&CfgBlock> = blocks.iter().collect();
        let edge_refs: Vec<&CfgEdge> = edges.iter().collect();

        let tree = compute_dominator_tree(&block_refs, &edge_refs, "entry");

        assert!(tree.dominates("header", "body"));
        assert!(tree.dominates("header", "after"));
        // Back edge: body's frontier includes the header
        assert!(tree.frontier("body").contains(&"header".to_string()));
    }
}

//! Flow graph application layer
//!
//! Builds CFGs (and the coarse BFG projection) for every function in a
//! document, matching syntax function bodies to IR nodes by span.

use crate::features::flow_graph::infrastructure::CfgBuilder;
use crate::features::parsing::domain::{ParsedTree, SyntaxKind, SyntaxNode};
use crate::shared::models::{BfgBlock, BfgGraph, CfgBlockKind, IRDocument, NodeKind};

/// Build flow graphs for all callable nodes in the document.
pub fn build_flow_graphs(document: &mut IRDocument, tree: &ParsedTree) {
    let functions: Vec<(String, crate::shared::models::Span)> = document
        .nodes
        .iter()
        .filter(|n| n.kind.is_callable() || n.kind == NodeKind::Method)
        .filter_map(|n| n.body_span.map(|span| (n.id.clone(), span)))
        .collect();

    let mut bodies: Vec<(String, SyntaxNode)> = Vec::new();
    tree.root.walk(&mut |syntax| {
        if matches!(
            syntax.kind,
            SyntaxKind::FunctionDef | SyntaxKind::MethodDef | SyntaxKind::ArrowFunctionDef
        ) {
            if let Some(body) = syntax.child_by_field("body") {
                if let Some((node_id, _)) = functions.iter().find(|(_, span)| *span == body.span) {
                    bodies.push((node_id.clone(), body.clone()));
                }
            }
        }
    });

    for (node_id, body) in bodies {
        let function_cfg = CfgBuilder::build(&node_id, &body);

        // BFG: one coarse block per non-structural CFG block
        let bfg_blocks: Vec<BfgBlock> = function_cfg
            .blocks
            .iter()
            .filter(|b| !matches!(b.kind, CfgBlockKind::Entry | CfgBlockKind::Exit))
            .map(|b| BfgBlock {
                id: format!("bfg:{}", b.id),
                function_node_id: node_id.clone(),
                span: b.span,
                statement_count: b.statements.len() as u32,
            })
            .collect();
        if !bfg_blocks.is_empty() {
            document.bfg_graphs.push(BfgGraph {
                function_node_id: node_id.clone(),
                block_ids: bfg_blocks.iter().map(|b| b.id.clone()).collect(),
            });
            document.bfg_blocks.extend(bfg_blocks);
        }

        document.cfgs.push(function_cfg.graph);
        document.cfg_blocks.extend(function_cfg.blocks);
        document.cfg_edges.extend(function_cfg.edges);
    }

    document.invalidate_indexes();
}

//! C3: Data flow graph with SSA
//!
//! Walks each function's CFG, builds SSA (phi placement + versions), and
//! emits the document-level DFG snapshot plus Reads/Writes edges back
//! into the structural IR with `var_name` attrs.

use std::collections::HashMap;

use crate::features::ssa::infrastructure::SsaBuilder;
use crate::shared::models::attrs::keys;
use crate::shared::models::{
    AttrMap, AttrValue, DfgEdge, DfgEventKind, DfgSnapshot, DfgVariable, Edge, EdgeKind,
    IRDocument, NodeKind,
};

/// Build the DFG/SSA layer for every function with a CFG.
pub fn build_data_flow(document: &mut IRDocument) {
    let mut snapshot = DfgSnapshot::default();
    let mut new_edges: Vec<Edge> = Vec::new();
    let mut edge_counter = 0usize;

    // Variable/parameter nodes by (function fqn prefix + name)
    let var_targets: HashMap<String, String> = document
        .nodes
        .iter()
        .filter(|n| {
            matches!(
                n.kind,
                NodeKind::Variable | NodeKind::Parameter | NodeKind::Field | NodeKind::Constant
            )
        })
        .map(|n| (n.fqn.clone(), n.id.clone()))
        .collect();

    let function_fqns: HashMap<String, String> = document
        .nodes
        .iter()
        .filter(|n| n.kind.is_callable())
        .map(|n| (n.id.clone(), n.fqn.clone()))
        .collect();

    let cfgs = document.cfgs.clone();
    for cfg in &cfgs {
        let blocks: Vec<&crate::shared::models::CfgBlock> = document
            .cfg_blocks
            .iter()
            .filter(|b| b.function_node_id == cfg.function_node_id)
            .collect();
        let edges: Vec<&crate::shared::models::CfgEdge> = document
            .cfg_edges
            .iter()
            .filter(|e| {
                blocks.iter().any(|b| b.id == e.source_block_id)
                    || blocks.iter().any(|b| b.id == e.target_block_id)
            })
            .collect();
        if blocks.is_empty() {
            continue;
        }

        let result = SsaBuilder::build(
            &cfg.function_node_id,
            &blocks,
            &edges,
            &cfg.entry_block_id,
        );

        // DFG edges: each write/phi reaches the reads of the same version
        for event in &result.events {
            if event.kind == DfgEventKind::Read {
                if let Some(def) = result.events.iter().find(|e| {
                    matches!(e.kind, DfgEventKind::Write | DfgEventKind::Phi)
                        && e.variable == event.variable
                        && e.version == event.version
                }) {
                    snapshot.edges.push(DfgEdge {
                        from_event: def.id.clone(),
                        to_event: event.id.clone(),
                        variable: event.variable.clone(),
                    });
                }
            }
        }

        for (variable, version_count) in &result.context.versions {
            snapshot.variables.push(DfgVariable {
                name: variable.clone(),
                function_id: cfg.function_node_id.clone(),
                version_count: *version_count,
            });
        }

        // Reads/Writes edges into the structural IR where the variable
        // resolves to a node (parameters, fields, module variables)
        if let Some(function_fqn) = function_fqns.get(&cfg.function_node_id) {
            for event in &result.events {
                let candidate = format!("{}.{}", function_fqn, event.variable);
                let target = var_targets.get(&candidate).or_else(|| {
                    // Module-scope variable: strip the function segment
                    let module_fqn = function_fqn
                        .rsplit_once('.')
                        .map(|(module, _)| format!("{}.{}", module, event.variable));
                    module_fqn.and_then(|fqn| var_targets.get(&fqn))
                });
                let Some(target_id) = target else {
                    continue;
                };
                let kind = match event.kind {
                    DfgEventKind::Read => EdgeKind::Reads,
                    DfgEventKind::Write => EdgeKind::Writes,
                    DfgEventKind::Phi => continue,
                };
                edge_counter += 1;
                let mut attrs = AttrMap::new();
                attrs.insert(keys::VAR_NAME.to_string(), AttrValue::from(event.variable.as_str()));
                let mut edge = Edge::new(
                    format!("edge:dfg:{}:{}", cfg.function_node_id, edge_counter),
                    kind,
                    cfg.function_node_id.clone(),
                    target_id.clone(),
                )
                .with_attrs(attrs);
                edge.span = event.span;
                new_edges.push(edge);
            }
        }

        document
            .dominator_trees
            .insert(cfg.function_node_id.clone(), result.context.dominator_tree.clone());
        snapshot.events.extend(result.events);
        document
            .ssa_contexts
            .insert(cfg.function_node_id.clone(), result.context);
    }

    if !snapshot.is_empty() {
        document
            .dfg_snapshot
            .get_or_insert_with(DfgSnapshot::default)
            .merge(snapshot);
    }
    if !new_edges.is_empty() {
        document.edges.extend(new_edges);
    }
    document.invalidate_indexes();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::flow_graph::application::build_flow_graphs;
    use crate::features::ir_generation::application::{generate_file_ir, FileInput};
    use crate::features::parsing::infrastructure::TreeSitterParser;
    use crate::features::parsing::ports::ParserFrontend;

    fn analyzed(source: &str) -> IRDocument {
        let file = FileInput {
            path: "t.py".into(),
            source: source.into(),
        };
        let mut doc = generate_file_ir("r", "s", &file, None).unwrap();
        let mut parser = TreeSitterParser::python();
        let tree = parser.parse(source, "t.py").unwrap();
        build_flow_graphs(&mut doc, &tree);
        build_data_flow(&mut doc);
        doc
    }

    #[test]
    fn test_dfg_snapshot_populated() {
        let doc = analyzed("def f(a):\n    x = a\n    return x\n");
        let snapshot = doc.dfg_snapshot.as_ref().expect("dfg snapshot");
        assert!(!snapshot.events.is_empty());
        assert!(snapshot.variables.iter().any(|v| v.name == "x"));
        assert!(!doc.ssa_contexts.is_empty());
        assert!(!doc.dominator_trees.is_empty());
    }

    #[test]
    fn test_reads_edge_for_parameter() {
        let doc = analyzed("def f(a):\n    return a + 1\n");
        let reads: Vec<&Edge> = doc.edges.iter().filter(|e| e.kind == EdgeKind::Reads).collect();
        assert!(!reads.is_empty());
        assert_eq!(
            reads[0].attrs.get(keys::VAR_NAME).and_then(|v| v.as_str()),
            Some("a")
        );
    }

    #[test]
    fn test_branch_produces_phi_context() {
        let doc = analyzed(
            "def f(c):\n    if c:\n        x = 1\n    else:\n        x = 2\n    return x\n",
        );
        let context = doc.ssa_contexts.values().next().expect("ssa context");
        assert!(!context.phi_nodes.is_empty());
    }
}

//! PDG construction from IR edges
//!
//! One PDG node per function node; Reads/Writes edges become Data
//! dependencies (updating defined/used sets from `var_name`), Calls edges
//! become Control dependencies.

use crate::features::pdg::infrastructure::pdg_graph::ProgramDependenceGraph;
use crate::shared::models::attrs::keys;
use crate::shared::models::{AttrAccess, EdgeKind, IRDocument, NodeKind, PdgEdge, PdgNode};

/// Build the PDG for a document and mirror the records onto it.
///
/// Callables and the variable-like nodes they read/write all become PDG
/// nodes, so Reads/Writes edges materialize as Data dependencies and
/// slicing traverses through the variables.
pub fn build_pdg(document: &mut IRDocument) -> ProgramDependenceGraph {
    let mut pdg = ProgramDependenceGraph::new(document.repo_id.clone());

    let pdg_source_nodes: Vec<(String, String, u32, crate::shared::models::Span, String)> =
        document
            .nodes
            .iter()
            .filter(|n| {
                n.kind.is_callable()
                    || matches!(
                        n.kind,
                        NodeKind::Variable | NodeKind::Parameter | NodeKind::Field | NodeKind::Constant
                    )
            })
            .map(|n| {
                (
                    n.id.clone(),
                    n.name.clone().unwrap_or_default(),
                    n.span.start_line,
                    n.span,
                    n.file_path.clone(),
                )
            })
            .collect();

    tracing::debug!(
        "building PDG: {} nodes, {} edges",
        pdg_source_nodes.len(),
        document.edges.len()
    );

    for (id, name, line, span, file_path) in &pdg_source_nodes {
        pdg.add_node(PdgNode::new(id.clone(), name.clone(), *line, *span).with_file(file_path));
    }

    let mut defined: Vec<(String, String)> = Vec::new();
    let mut used: Vec<(String, String)> = Vec::new();

    for edge in &document.edges {
        match edge.kind {
            EdgeKind::Reads | EdgeKind::Writes => {
                pdg.add_edge(PdgEdge::data(
                    edge.source_id.clone(),
                    edge.target_id.clone(),
                    edge.attrs.get_str(keys::VAR_NAME).unwrap_or_default(),
                ));
                if let Some(var_name) = edge.attrs.get_str(keys::VAR_NAME) {
                    if edge.kind == EdgeKind::Writes {
                        defined.push((edge.source_id.clone(), var_name.to_string()));
                    } else {
                        used.push((edge.source_id.clone(), var_name.to_string()));
                    }
                }
            }
            EdgeKind::Calls => {
                pdg.add_edge(PdgEdge::control(
                    edge.source_id.clone(),
                    edge.target_id.clone(),
                ));
            }
            _ => {}
        }
    }

    // Mirror the graph onto the document records (total-order friendly)
    document.pdg_nodes = pdg.nodes().cloned().collect();
    for (node_id, var) in defined {
        if let Some(record) = document.pdg_nodes.iter_mut().find(|n| n.node_id == node_id) {
            if !record.defined_vars.contains(&var) {
                record.defined_vars.push(var);
            }
        }
    }
    for (node_id, var) in used {
        if let Some(record) = document.pdg_nodes.iter_mut().find(|n| n.node_id == node_id) {
            if !record.used_vars.contains(&var) {
                record.used_vars.push(var);
            }
        }
    }
    document.pdg_edges = pdg.edges().cloned().collect();

    pdg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::data_flow::build_data_flow;
    use crate::features::flow_graph::application::build_flow_graphs;
    use crate::features::ir_generation::application::{generate_file_ir, FileInput};
    use crate::features::parsing::infrastructure::TreeSitterParser;
    use crate::features::parsing::ports::ParserFrontend;
    use crate::shared::models::DependencyType;

    #[test]
    fn test_pdg_from_ir() {
        let source =
            "def inner(a):\n    return a\n\ndef outer(x):\n    y = inner(x)\n    return y\n";
        let file = FileInput {
            path: "t.py".into(),
            source: source.into(),
        };
        let mut doc = generate_file_ir("r", "s", &file, None).unwrap();
        let mut parser = TreeSitterParser::python();
        let tree = parser.parse(source, "t.py").unwrap();
        build_flow_graphs(&mut doc, &tree);
        build_data_flow(&mut doc);

        let pdg = build_pdg(&mut doc);
        // Two callables plus their parameters and locals
        assert!(pdg.node_count() >= 4);
        assert!(doc
            .pdg_edges
            .iter()
            .any(|e| e.dependency_type == DependencyType::Control));
        assert!(doc
            .pdg_edges
            .iter()
            .any(|e| e.dependency_type == DependencyType::Data));
        assert_eq!(doc.pdg_nodes.len(), pdg.node_count());
    }
}

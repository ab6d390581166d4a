//! C3: Inter-procedural data flow edges
//!
//! For each call expression whose callee resolves inside the document,
//! synthesize arg -> param and return -> callsite edges.

use std::collections::HashMap;

use crate::shared::models::{
    ExprKind, IRDocument, InterproceduralEdge, InterproceduralEdgeKind, NodeKind,
};

/// Build inter-procedural edges over the lowered expressions.
pub fn build_interprocedural_edges(document: &mut IRDocument) {
    // Callee lookup: simple name and fqn of callable nodes
    let mut callables: HashMap<&str, &str> = HashMap::new();
    let mut callable_fqns: HashMap<&str, &str> = HashMap::new();
    for node in &document.nodes {
        if node.kind.is_callable() {
            if let Some(name) = &node.name {
                callables.entry(name.as_str()).or_insert(node.id.as_str());
            }
            callables.entry(node.fqn.as_str()).or_insert(node.id.as_str());
            callable_fqns.insert(node.id.as_str(), node.fqn.as_str());
        }
    }

    // Parameters per callable, in declaration order (local_seq order)
    let mut params_by_function: HashMap<&str, Vec<(&str, u64)>> = HashMap::new();
    for node in &document.nodes {
        if node.kind == NodeKind::Parameter {
            if let Some(parent) = &node.parent_id {
                params_by_function
                    .entry(parent.as_str())
                    .or_default()
                    .push((node.id.as_str(), node.local_seq));
            }
        }
    }
    for params in params_by_function.values_mut() {
        params.sort_by_key(|(_, seq)| *seq);
    }

    let mut edges: Vec<InterproceduralEdge> = Vec::new();

    for expr in document.expressions.iter() {
        if !matches!(expr.kind, ExprKind::Call | ExprKind::Instantiate) {
            continue;
        }
        let Some(callee_name) = expr.callee_name() else {
            continue;
        };
        let simple = callee_name.rsplit('.').next().unwrap_or(callee_name);
        let Some(&callee_id) = callables.get(callee_name).or_else(|| callables.get(simple)) else {
            continue;
        };
        let callee_fqn = callable_fqns.get(callee_id).copied().unwrap_or(callee_name);

        for (index, arg_id) in expr.arg_expr_ids().iter().enumerate() {
            let Some(params) = params_by_function.get(callee_id) else {
                break;
            };
            let Some((param_id, _)) = params.get(index) else {
                break;
            };
            edges.push(InterproceduralEdge {
                kind: InterproceduralEdgeKind::ArgToParam,
                from_id: format!("expr:{}", arg_id),
                to_id: param_id.to_string(),
                caller_fqn: expr.function_fqn.clone(),
                callee_fqn: callee_fqn.to_string(),
                arg_index: Some(index as u32),
            });
        }

        edges.push(InterproceduralEdge {
            kind: InterproceduralEdgeKind::ReturnToCallsite,
            from_id: callee_id.to_string(),
            to_id: format!("expr:{}", expr.id),
            caller_fqn: expr.function_fqn.clone(),
            callee_fqn: callee_fqn.to_string(),
            arg_index: None,
        });
    }

    if !edges.is_empty() {
        tracing::debug!("interprocedural edges: {}", edges.len());
        document.interprocedural_edges.extend(edges);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::expression_builder::lower_expressions;
    use crate::features::flow_graph::application::build_flow_graphs;
    use crate::features::ir_generation::application::{generate_file_ir, FileInput};
    use crate::features::parsing::infrastructure::TreeSitterParser;
    use crate::features::parsing::ports::ParserFrontend;

    #[test]
    fn test_arg_param_and_return_edges() {
        let source = "def callee(value):\n    return value\n\ndef caller(x):\n    return callee(x)\n";
        let file = FileInput {
            path: "t.py".into(),
            source: source.into(),
        };
        let mut doc = generate_file_ir("r", "s", &file, None).unwrap();
        let mut parser = TreeSitterParser::python();
        let tree = parser.parse(source, "t.py").unwrap();
        build_flow_graphs(&mut doc, &tree);
        lower_expressions(&mut doc, &tree);
        build_interprocedural_edges(&mut doc);

        assert!(doc
            .interprocedural_edges
            .iter()
            .any(|e| e.kind == InterproceduralEdgeKind::ArgToParam && e.arg_index == Some(0)));
        assert!(doc
            .interprocedural_edges
            .iter()
            .any(|e| e.kind == InterproceduralEdgeKind::ReturnToCallsite));
    }
}

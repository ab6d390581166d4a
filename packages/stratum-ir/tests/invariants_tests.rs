//! Structural invariants of generated documents and index equivalence.

use std::collections::HashSet;

use stratum_ir::shared::models::AttrAccess;
use stratum_ir::{
    build_corpus, CancellationToken, EdgeKind, FileInput, NodeKind, PipelineConfig,
};

fn corpus() -> Vec<FileInput> {
    vec![
        FileInput {
            path: "api.py".into(),
            source: "import os\nfrom flask import request\n\nMAX = 10\n\ndef handler(user_id: int):\n    q = request.args['q']\n    return q\n\nclass Service:\n    def run(self):\n        return handler(1)\n".into(),
        },
        FileInput {
            path: "page.html".into(),
            source: "<p>{{ q }}</p>\n".into(),
        },
    ]
}

#[test]
fn every_non_root_node_has_exactly_one_contains_edge() {
    let document = build_corpus(
        &PipelineConfig::new("repo", "snap"),
        &corpus(),
        &CancellationToken::new(),
    )
    .unwrap();

    for node in &document.nodes {
        let incoming_contains = document
            .edges
            .iter()
            .filter(|e| e.kind == EdgeKind::Contains && e.target_id == node.id)
            .count();
        if node.parent_id.is_none() {
            assert_eq!(incoming_contains, 0, "root node {} has a container", node.fqn);
        } else {
            assert_eq!(
                incoming_contains, 1,
                "node {} has {} containing edges",
                node.fqn, incoming_contains
            );
        }
    }
}

#[test]
fn all_edge_endpoints_resolve_or_are_external_tokens() {
    let document = build_corpus(
        &PipelineConfig::new("repo", "snap"),
        &corpus(),
        &CancellationToken::new(),
    )
    .unwrap();

    let node_ids: HashSet<&str> = document.nodes.iter().map(|n| n.id.as_str()).collect();
    let slot_ids: HashSet<&str> = document
        .template_slots
        .iter()
        .map(|s| s.slot_id.as_str())
        .collect();

    for edge in &document.edges {
        assert!(
            node_ids.contains(edge.source_id.as_str()),
            "unresolved edge source: {} ({:?})",
            edge.source_id,
            edge.kind
        );
        let target_resolves = node_ids.contains(edge.target_id.as_str())
            || slot_ids.contains(edge.target_id.as_str())
            || (edge.kind.allows_external_target() && edge.target_id.starts_with("module:"));
        assert!(
            target_resolves,
            "unresolved edge target: {} ({:?})",
            edge.target_id,
            edge.kind
        );
    }
}

#[test]
fn nodes_by_kind_index_equals_linear_filter() {
    let document = build_corpus(
        &PipelineConfig::new("repo", "snap"),
        &corpus(),
        &CancellationToken::new(),
    )
    .unwrap();

    for kind in [
        NodeKind::Module,
        NodeKind::Class,
        NodeKind::Function,
        NodeKind::Method,
        NodeKind::Parameter,
        NodeKind::Variable,
        NodeKind::Constant,
        NodeKind::Import,
    ] {
        let indexed: Vec<&str> = document
            .get_nodes_by_kind(kind)
            .iter()
            .map(|n| n.id.as_str())
            .collect();
        let scanned: Vec<&str> = document
            .nodes
            .iter()
            .filter(|n| n.kind == kind)
            .map(|n| n.id.as_str())
            .collect();
        assert_eq!(indexed, scanned, "index mismatch for {:?}", kind);
    }
}

#[test]
fn typed_handler_query_returns_single_function() {
    // Querying by kind finds exactly one function of that name with its
    // annotated return type intact.
    let files = vec![FileInput {
        path: "api.py".into(),
        source: "def get_user_handler(user_id: int) -> User:\n    return db.query(User).filter(User.id == user_id).first()\n".into(),
    }];
    let document = build_corpus(
        &PipelineConfig::new("r", "s"),
        &files,
        &CancellationToken::new(),
    )
    .unwrap();

    let functions = document.get_nodes_by_kind(NodeKind::Function);
    assert_eq!(functions.len(), 1);
    let handler = functions[0];
    assert_eq!(handler.name.as_deref(), Some("get_user_handler"));
    let return_type = handler.attrs.get_str("return_type").unwrap();
    assert!(return_type.contains("User"));
}

#[test]
fn template_slots_indexed_by_context_and_file() {
    let document = build_corpus(
        &PipelineConfig::new("repo", "snap"),
        &corpus(),
        &CancellationToken::new(),
    )
    .unwrap();

    assert_eq!(document.get_slots_by_file("page.html").len(), 1);
    let slot = &document.template_slots[0];
    assert_eq!(document.get_slot(&slot.slot_id).unwrap().slot_id, slot.slot_id);
}

#[test]
fn occurrence_index_tracks_definitions_and_references() {
    let document = build_corpus(
        &PipelineConfig::new("repo", "snap"),
        &corpus(),
        &CancellationToken::new(),
    )
    .unwrap();

    let handler = document
        .nodes
        .iter()
        .find(|n| n.name.as_deref() == Some("handler"))
        .unwrap();
    let definitions = document.find_definitions(&handler.id);
    assert_eq!(definitions.len(), 1);
    // Service.run calls handler -> at least one non-definition occurrence
    let references = document.find_references(&handler.id);
    let non_definition = references.len() - definitions.len();
    assert!(non_definition >= 1);
}

#[test]
fn diagnostics_preserved_for_lossy_inputs() {
    let files = vec![FileInput {
        path: "broken.py".into(),
        source: "def broken(:\n    pass\n".into(),
    }];
    let document = build_corpus(
        &PipelineConfig::new("repo", "snap"),
        &files,
        &CancellationToken::new(),
    )
    .unwrap();
    assert!(!document.diagnostics.is_empty());
}

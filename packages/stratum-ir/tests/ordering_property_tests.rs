//! Property tests for the total ordering contract.

use proptest::prelude::*;

use stratum_ir::shared::models::{Edge, EdgeKind, IRDocument, Node, NodeKind, Span};

fn arbitrary_kind(index: usize) -> NodeKind {
    match index % 5 {
        0 => NodeKind::Function,
        1 => NodeKind::Class,
        2 => NodeKind::Variable,
        3 => NodeKind::Method,
        _ => NodeKind::Parameter,
    }
}

proptest! {
    /// Sorting by the documented keys plus local_seq is a strict total
    /// order for any node multiset, including duplicates.
    #[test]
    fn node_ordering_is_total(
        entries in prop::collection::vec((0u32..5, 1u32..50, 0usize..3), 1..40)
    ) {
        let mut document = IRDocument::new("r", "s");
        for (i, (file_index, line, kind_index)) in entries.iter().enumerate() {
            let mut node = Node::new(
                format!("node:{}", i),
                arbitrary_kind(*kind_index),
                format!("m.sym{}", i),
                format!("file{}.py", file_index),
                Span::new(*line, 0, line + 1, 0),
                "python".to_string(),
            );
            // Deliberately identical spans across entries are fine: the
            // tie-breaker must still produce a strict order
            node.local_seq = 0;
            document.nodes.push(node);
        }

        document.assign_local_seq();
        document.enforce_total_ordering();

        let keys: Vec<_> = document.nodes.iter().map(|n| n.ordering_key()).collect();
        for pair in keys.windows(2) {
            prop_assert!(pair[0] < pair[1]);
        }
    }

    /// Same property for edges, including parallel edges between the same
    /// endpoints.
    #[test]
    fn edge_ordering_is_total(
        entries in prop::collection::vec((0u32..4, 0u32..4), 1..40)
    ) {
        let mut document = IRDocument::new("r", "s");
        for (i, (source, target)) in entries.iter().enumerate() {
            document.edges.push(Edge::new(
                format!("edge:{}", i),
                EdgeKind::Calls,
                format!("node:{}", source),
                format!("node:{}", target),
            ));
        }

        document.assign_local_seq();
        document.enforce_total_ordering();

        let keys: Vec<_> = document.edges.iter().map(|e| e.ordering_key()).collect();
        for pair in keys.windows(2) {
            prop_assert!(pair[0] < pair[1]);
        }
    }

    /// Sorting twice is idempotent.
    #[test]
    fn ordering_is_idempotent(count in 1usize..30) {
        let mut document = IRDocument::new("r", "s");
        for i in 0..count {
            document.nodes.push(Node::new(
                format!("node:{}", i),
                NodeKind::Function,
                format!("m.f{}", i),
                "m.py".to_string(),
                Span::new(1, 0, 2, 0),
                "python".to_string(),
            ));
        }
        document.assign_local_seq();
        document.enforce_total_ordering();
        let first: Vec<String> = document.nodes.iter().map(|n| n.id.clone()).collect();
        document.enforce_total_ordering();
        let second: Vec<String> = document.nodes.iter().map(|n| n.id.clone()).collect();
        prop_assert_eq!(first, second);
    }
}

//! Index-build benchmark
//!
//! The full lazy index set over a 10k-node document targets ~3ms.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use stratum_ir::shared::models::{Edge, EdgeKind, IRDocument, Node, NodeKind, Span};

fn synthetic_document(node_count: usize) -> IRDocument {
    let mut document = IRDocument::new("bench", "snap");
    for i in 0..node_count {
        let kind = if i % 3 == 0 {
            NodeKind::Function
        } else if i % 3 == 1 {
            NodeKind::Variable
        } else {
            NodeKind::Class
        };
        document.nodes.push(Node::new(
            format!("node:{}", i),
            kind,
            format!("pkg.mod{}.sym{}", i % 50, i),
            format!("pkg/mod{}.py", i % 50),
            Span::new((i % 1000) as u32 + 1, 0, (i % 1000) as u32 + 5, 0),
            "python".to_string(),
        ));
        if i > 0 {
            document.edges.push(Edge::new(
                format!("edge:{}", i),
                EdgeKind::Calls,
                format!("node:{}", i - 1),
                format!("node:{}", i),
            ));
        }
    }
    document.assign_local_seq();
    document
}

fn bench_index_build(c: &mut Criterion) {
    let document = synthetic_document(10_000);

    c.bench_function("build_indexes_10k_nodes", |b| {
        b.iter(|| {
            document.invalidate_indexes();
            black_box(document.ensure_indexes());
        })
    });

    c.bench_function("kind_lookup_indexed", |b| {
        document.ensure_indexes();
        b.iter(|| black_box(document.get_nodes_by_kind(NodeKind::Function).len()))
    });
}

criterion_group!(benches, bench_index_build);
criterion_main!(benches);

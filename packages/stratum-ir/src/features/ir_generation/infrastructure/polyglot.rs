//! Polyglot import classification
//!
//! Inspects Imports edges against a catalog of known FFI bridge libraries
//! and language-specific patterns, then emits CrossLangImport / FfiImport
//! edges alongside the plain Imports edge.

use lazy_static::lazy_static;
use std::collections::HashMap;

use crate::shared::models::{AttrMap, AttrValue, Edge, EdgeKind, IRDocument};

lazy_static! {
    /// module prefix -> (bridged language, is_ffi)
    static ref FFI_CATALOG: HashMap<&'static str, (&'static str, bool)> = HashMap::from([
        // Python <-> native
        ("ctypes", ("c", true)),
        ("cffi", ("c", true)),
        ("cython", ("c", true)),
        ("pybind11", ("cpp", true)),
        ("jpype", ("java", true)),
        ("py4j", ("java", true)),
        ("rpy2", ("r", true)),
        // JS <-> native
        ("ffi-napi", ("c", true)),
        ("node-gyp-build", ("c", true)),
        ("wasm-bindgen", ("rust", true)),
        // Cross-language RPC bridges (not raw FFI)
        ("grpc", ("any", false)),
        ("grpcio", ("any", false)),
        ("thrift", ("any", false)),
        ("py_mini_racer", ("javascript", false)),
    ]);
}

/// Scan a document's import edges and add polyglot edges in place.
pub fn classify_polyglot_imports(document: &mut IRDocument) {
    let mut new_edges: Vec<Edge> = Vec::new();

    for edge in &document.edges {
        if edge.kind != EdgeKind::Imports {
            continue;
        }
        let Some(module) = edge.target_id.strip_prefix("module:") else {
            continue;
        };
        let root = module.split('.').next().unwrap_or(module);

        if let Some((bridged_language, is_ffi)) = FFI_CATALOG.get(root) {
            let kind = if *is_ffi {
                EdgeKind::FfiImport
            } else {
                EdgeKind::CrossLangImport
            };
            let mut attrs = AttrMap::new();
            attrs.insert(
                "bridged_language".to_string(),
                AttrValue::from(*bridged_language),
            );
            attrs.insert("library".to_string(), AttrValue::from(root));

            let mut polyglot = Edge::new(
                format!("{}:{}", edge.id, kind.as_str().to_lowercase()),
                kind,
                edge.source_id.clone(),
                edge.target_id.clone(),
            )
            .with_attrs(attrs);
            polyglot.span = edge.span;
            new_edges.push(polyglot);
        }
    }

    if !new_edges.is_empty() {
        tracing::debug!("polyglot imports classified: {}", new_edges.len());
        document.edges.extend(new_edges);
        document.invalidate_indexes();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::{Node, NodeKind, Span};

    #[test]
    fn test_ffi_import_detected() {
        let mut doc = IRDocument::new("r", "s");
        let node = Node::new(
            "node:i".into(),
            NodeKind::Import,
            "m.import:ctypes".into(),
            "m.py".into(),
            Span::new(1, 0, 1, 12),
            "python".into(),
        );
        doc.nodes.push(node);
        doc.edges.push(Edge::new(
            "edge:1".into(),
            EdgeKind::Imports,
            "node:i",
            "module:ctypes",
        ));

        classify_polyglot_imports(&mut doc);
        assert!(doc.edges.iter().any(|e| e.kind == EdgeKind::FfiImport));
    }

    #[test]
    fn test_rpc_bridge_is_cross_lang_not_ffi() {
        let mut doc = IRDocument::new("r", "s");
        doc.edges.push(Edge::new(
            "edge:1".into(),
            EdgeKind::Imports,
            "node:i",
            "module:grpc",
        ));
        classify_polyglot_imports(&mut doc);
        assert!(doc.edges.iter().any(|e| e.kind == EdgeKind::CrossLangImport));
        assert!(!doc.edges.iter().any(|e| e.kind == EdgeKind::FfiImport));
    }

    #[test]
    fn test_plain_import_untouched() {
        let mut doc = IRDocument::new("r", "s");
        doc.edges.push(Edge::new(
            "edge:1".into(),
            EdgeKind::Imports,
            "node:i",
            "module:os",
        ));
        classify_polyglot_imports(&mut doc);
        assert_eq!(doc.edges.len(), 1);
    }
}

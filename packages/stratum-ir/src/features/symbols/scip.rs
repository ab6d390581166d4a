//! SCIP-style symbol descriptors
//!
//! Canonical form: `scheme-<lang> <package> <version> <root> <descriptor>`
//! with descriptor suffix `()` for functions/methods, `#` for
//! classes/interfaces/enums, `.` otherwise.

use crate::shared::models::{IRDocument, Node, NodeKind, UnifiedSymbol};

/// Descriptor suffix for a node kind
fn descriptor_suffix(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::Function | NodeKind::Method | NodeKind::ArrowFunction => "()",
        NodeKind::Class | NodeKind::Interface | NodeKind::Enum => "#",
        _ => ".",
    }
}

/// Format the SCIP descriptor for a node
pub fn format_descriptor(node: &Node) -> String {
    format!("{}{}", node.fqn.replace('.', "/"), descriptor_suffix(node.kind))
}

/// Full canonical symbol string for a node
pub fn format_symbol(node: &Node, package: &str, version: &str) -> String {
    format!(
        "scheme-{} {} {} {} {}",
        node.language,
        package,
        version,
        "root",
        format_descriptor(node)
    )
}

/// Generate unified symbols for all symbol-bearing nodes
pub fn generate_unified_symbols(document: &mut IRDocument, package: &str, version: &str) {
    let symbols: Vec<UnifiedSymbol> = document
        .nodes
        .iter()
        .filter(|n| n.kind.is_symbol())
        .map(|node| UnifiedSymbol {
            symbol: format_symbol(node, package, version),
            language: node.language.clone(),
            node_id: Some(node.id.clone()),
            package: package.to_string(),
            descriptor: format_descriptor(node),
        })
        .collect();
    document.unified_symbols = symbols;
}

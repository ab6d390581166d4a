//! Occurrence tracking (SCIP-compatible)
//!
//! Occurrences are generated alongside nodes/edges and indexed by symbol,
//! file and role.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::edge::{Edge, EdgeKind};
use super::node::{Node, NodeKind};
use super::span::Span;

/// Symbol role bitflags
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymbolRole {
    None = 0,
    Definition = 1,
    Reference = 2,
    ReadAccess = 4,
    WriteAccess = 8,
    Import = 16,
    Type = 32,
}

impl SymbolRole {
    pub fn value(&self) -> u8 {
        *self as u8
    }
}

/// Combined roles as bitflags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct SymbolRoles(pub u8);

impl SymbolRoles {
    pub fn new() -> Self {
        Self(0)
    }

    pub fn definition() -> Self {
        Self(SymbolRole::Definition as u8)
    }

    pub fn reference() -> Self {
        Self(SymbolRole::Reference as u8)
    }

    pub fn add(&mut self, role: SymbolRole) {
        self.0 |= role as u8;
    }

    pub fn has(&self, role: SymbolRole) -> bool {
        self.0 & (role as u8) != 0
    }

    pub fn is_definition(&self) -> bool {
        self.has(SymbolRole::Definition)
    }

    pub fn is_reference(&self) -> bool {
        self.has(SymbolRole::Reference) || self.has(SymbolRole::ReadAccess)
    }
}

/// Per-file symbol occurrence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Occurrence {
    pub id: String,
    /// node.id for definitions, edge.target_id for references
    pub symbol_id: String,
    pub span: Span,
    pub roles: u8,
    pub file_path: String,
    /// 0.0 - 1.0
    pub importance_score: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_symbol_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub syntax_kind: Option<String>,
}

impl Occurrence {
    /// Role bitflags of this occurrence
    pub fn roles(&self) -> SymbolRoles {
        SymbolRoles(self.roles)
    }

    /// Definition occurrence from a symbol node
    pub fn from_node(node: &Node, counter: &mut u64) -> Option<Self> {
        if !node.kind.is_symbol() {
            return None;
        }

        *counter += 1;
        let id = format!("occ:def:{}:{}", node.id, counter);
        let importance = Self::estimate_importance(node);

        Some(Self {
            id,
            symbol_id: node.id.clone(),
            span: node.span,
            roles: SymbolRole::Definition as u8,
            file_path: node.file_path.clone(),
            importance_score: importance,
            parent_symbol_id: node.parent_id.clone(),
            syntax_kind: Some(node.kind.as_str().to_string()),
        })
    }

    /// Reference occurrence from an edge
    pub fn from_edge(edge: &Edge, source_node: &Node, counter: &mut u64) -> Option<Self> {
        let roles = Self::edge_kind_to_roles(edge.kind)?;

        *counter += 1;
        let ref_type = if roles & (SymbolRole::Import as u8) != 0 {
            "import"
        } else if roles & (SymbolRole::WriteAccess as u8) != 0 {
            "write"
        } else {
            "ref"
        };
        let id = format!("occ:{}:{}:{}", ref_type, edge.source_id, counter);

        let span = edge.span.unwrap_or(source_node.span);

        Some(Self {
            id,
            symbol_id: edge.target_id.clone(),
            span,
            roles,
            file_path: source_node.file_path.clone(),
            importance_score: 0.5,
            parent_symbol_id: Some(edge.source_id.clone()),
            syntax_kind: Some(edge.kind.as_str().to_string()),
        })
    }

    fn edge_kind_to_roles(kind: EdgeKind) -> Option<u8> {
        match kind {
            EdgeKind::Calls => Some(SymbolRole::Reference as u8 | SymbolRole::ReadAccess as u8),
            EdgeKind::Reads => Some(SymbolRole::Reference as u8 | SymbolRole::ReadAccess as u8),
            EdgeKind::Writes => Some(SymbolRole::Reference as u8 | SymbolRole::WriteAccess as u8),
            EdgeKind::Imports | EdgeKind::CrossLangImport | EdgeKind::FfiImport => {
                Some(SymbolRole::Import as u8)
            }
            // Structural and flow edges don't create occurrences
            EdgeKind::Contains | EdgeKind::Binds | EdgeKind::FlowsTo => None,
        }
    }

    /// Importance is a monotone blend of definition weight, docs and export
    fn estimate_importance(node: &Node) -> f32 {
        let mut score = 0.5f32;

        if let Some(ref name) = node.name {
            if !name.starts_with('_') || name.starts_with("__") {
                score += 0.2;
            }
        }

        if node.docstring.is_some() {
            score += 0.1;
        }

        if node.parent_id.is_none() {
            score += 0.1;
        }

        score += match node.kind {
            NodeKind::Class | NodeKind::Interface | NodeKind::Enum => 0.1,
            NodeKind::Function | NodeKind::Method => 0.05,
            _ => 0.0,
        };

        score.min(1.0)
    }
}

/// Occurrence index by symbol, file and role
#[derive(Debug, Default)]
pub struct OccurrenceIndex {
    by_symbol: HashMap<String, Vec<usize>>,
    by_file: HashMap<String, Vec<usize>>,
    by_role: HashMap<u8, Vec<usize>>,
    occurrences: Vec<Occurrence>,
}

impl OccurrenceIndex {
    pub fn build(occurrences: &[Occurrence]) -> Self {
        let mut index = Self {
            occurrences: occurrences.to_vec(),
            ..Default::default()
        };
        for (i, occ) in index.occurrences.iter().enumerate() {
            index
                .by_symbol
                .entry(occ.symbol_id.clone())
                .or_default()
                .push(i);
            index
                .by_file
                .entry(occ.file_path.clone())
                .or_default()
                .push(i);
            for role in [
                SymbolRole::Definition,
                SymbolRole::Reference,
                SymbolRole::ReadAccess,
                SymbolRole::WriteAccess,
                SymbolRole::Import,
                SymbolRole::Type,
            ] {
                if occ.roles & (role as u8) != 0 {
                    index.by_role.entry(role as u8).or_default().push(i);
                }
            }
        }
        index
    }

    pub fn by_symbol(&self, symbol_id: &str) -> Vec<&Occurrence> {
        self.resolve(self.by_symbol.get(symbol_id))
    }

    pub fn by_file(&self, file_path: &str) -> Vec<&Occurrence> {
        self.resolve(self.by_file.get(file_path))
    }

    pub fn by_role(&self, role: SymbolRole) -> Vec<&Occurrence> {
        self.resolve(self.by_role.get(&(role as u8)))
    }

    pub fn definitions(&self, symbol_id: &str) -> Vec<&Occurrence> {
        self.by_symbol(symbol_id)
            .into_iter()
            .filter(|o| o.roles().is_definition())
            .collect()
    }

    pub fn references(&self, symbol_id: &str) -> Vec<&Occurrence> {
        self.by_symbol(symbol_id)
            .into_iter()
            .filter(|o| !o.roles().is_definition())
            .collect()
    }

    pub fn high_importance(&self, min_score: f32) -> Vec<&Occurrence> {
        let mut result: Vec<&Occurrence> = self
            .occurrences
            .iter()
            .filter(|o| o.importance_score >= min_score)
            .collect();
        result.sort_by(|a, b| {
            b.importance_score
                .partial_cmp(&a.importance_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        result
    }

    fn resolve(&self, indices: Option<&Vec<usize>>) -> Vec<&Occurrence> {
        indices
            .map(|ids| ids.iter().map(|&i| &self.occurrences[i]).collect())
            .unwrap_or_default()
    }
}

/// Occurrence generator for a document
#[derive(Debug, Default)]
pub struct OccurrenceGenerator {
    counter: u64,
}

impl OccurrenceGenerator {
    pub fn new() -> Self {
        Self { counter: 0 }
    }

    pub fn generate(&mut self, nodes: &[Node], edges: &[Edge]) -> Vec<Occurrence> {
        let mut occurrences = Vec::with_capacity(nodes.len() + edges.len());

        let node_by_id: HashMap<&str, &Node> = nodes.iter().map(|n| (n.id.as_str(), n)).collect();

        for node in nodes {
            if let Some(occ) = Occurrence::from_node(node, &mut self.counter) {
                occurrences.push(occ);
            }
        }

        for edge in edges {
            if let Some(source_node) = node_by_id.get(edge.source_id.as_str()) {
                if let Some(occ) = Occurrence::from_edge(edge, source_node, &mut self.counter) {
                    occurrences.push(occ);
                }
            }
        }

        occurrences
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_node(id: &str, kind: NodeKind, fqn: &str) -> Node {
        Node::new(
            id.to_string(),
            kind,
            fqn.to_string(),
            "test.py".to_string(),
            Span::new(1, 0, 5, 0),
            "python".to_string(),
        )
    }

    #[test]
    fn test_definition_occurrence() {
        let node = make_node("node:1", NodeKind::Function, "mod.foo");
        let mut counter = 0u64;
        let occ = Occurrence::from_node(&node, &mut counter).unwrap();

        assert!(occ.id.starts_with("occ:def:"));
        assert_eq!(occ.symbol_id, "node:1");
        assert_eq!(occ.roles, SymbolRole::Definition as u8);
    }

    #[test]
    fn test_file_node_has_no_occurrence() {
        let node = make_node("node:f", NodeKind::File, "test");
        let mut counter = 0u64;
        assert!(Occurrence::from_node(&node, &mut counter).is_none());
    }

    #[test]
    fn test_index_roles() {
        let func = make_node("node:1", NodeKind::Function, "mod.foo");
        let var = make_node("node:2", NodeKind::Variable, "mod.foo.x");
        let edge = Edge::new("edge:1".into(), EdgeKind::Reads, "node:1", "node:2");

        let mut generator = OccurrenceGenerator::new();
        let occs = generator.generate(&[func, var], &[edge]);
        let index = OccurrenceIndex::build(&occs);

        assert_eq!(index.by_role(SymbolRole::Definition).len(), 2);
        assert_eq!(index.references("node:2").len(), 1);
        assert_eq!(index.definitions("node:1").len(), 1);
    }
}

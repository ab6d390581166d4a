//! IR Document - top-level container for every IR layer
//!
//! The document exclusively owns all contained entities; consumers take
//! references that never outlive it. Back-references (parents, PDG edges,
//! dominator trees) are stored by id, never by pointer.
//!
//! Indexes are lazy, idempotent and safe to build from any thread holding
//! a read reference; builders synchronize internally behind a RwLock.
//! Mutating the document invalidates them.

use ahash::AHashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::bfg::{BfgBlock, BfgGraph};
use super::cfg::{CfgBlock, CfgBlockKind, CfgEdge, ControlFlowGraph};
use super::dfg::{DfgSnapshot, SsaContext};
use super::diagnostic::Diagnostic;
use super::dominator::DominatorTree;
use super::edge::{Edge, EdgeKind};
use super::expression::{ExprId, ExprKind, Expression, ExpressionArena};
use super::interprocedural::InterproceduralEdge;
use super::node::{Node, NodeKind};
use super::occurrence::{Occurrence, OccurrenceIndex, SymbolRole};
use super::pdg::{PdgEdge, PdgNode};
use super::symbol::{PackageMetadata, UnifiedSymbol};
use super::taint::TaintFinding;
use super::template::{SlotContextKind, TemplateElement, TemplateSlot};
use super::type_entities::{SignatureEntity, TypeEntity};

/// Current IR schema version
pub const SCHEMA_VERSION: &str = "2.3";

/// Complete IR snapshot for a repository
#[derive(Debug, Serialize, Deserialize)]
pub struct IRDocument {
    // Identity
    pub repo_id: String,
    pub snapshot_id: String,
    pub schema_version: String,

    // Structural IR
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,

    // Semantic IR
    pub types: Vec<TypeEntity>,
    pub signatures: Vec<SignatureEntity>,
    pub cfgs: Vec<ControlFlowGraph>,
    pub cfg_blocks: Vec<CfgBlock>,
    pub cfg_edges: Vec<CfgEdge>,
    pub bfg_graphs: Vec<BfgGraph>,
    pub bfg_blocks: Vec<BfgBlock>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dfg_snapshot: Option<DfgSnapshot>,
    pub expressions: ExpressionArena,
    pub interprocedural_edges: Vec<InterproceduralEdge>,

    // Occurrence IR
    pub occurrences: Vec<Occurrence>,
    pub diagnostics: Vec<Diagnostic>,
    pub packages: Vec<PackageMetadata>,
    pub unified_symbols: Vec<UnifiedSymbol>,

    // Analysis layers
    pub pdg_nodes: Vec<PdgNode>,
    pub pdg_edges: Vec<PdgEdge>,
    pub taint_findings: Vec<TaintFinding>,
    /// function_id -> SSA context (phi placements + dominator tree)
    pub ssa_contexts: BTreeMap<String, SsaContext>,
    /// function_id -> dominator tree
    pub dominator_trees: BTreeMap<String, DominatorTree>,

    // Template IR
    pub template_slots: Vec<TemplateSlot>,
    pub template_elements: Vec<TemplateElement>,

    // Metadata
    pub meta: BTreeMap<String, serde_json::Value>,

    // Lazy indexes (never serialized)
    #[serde(skip)]
    indexes: RwLock<Option<Arc<DocumentIndexes>>>,
}

impl Clone for IRDocument {
    fn clone(&self) -> Self {
        Self {
            repo_id: self.repo_id.clone(),
            snapshot_id: self.snapshot_id.clone(),
            schema_version: self.schema_version.clone(),
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
            types: self.types.clone(),
            signatures: self.signatures.clone(),
            cfgs: self.cfgs.clone(),
            cfg_blocks: self.cfg_blocks.clone(),
            cfg_edges: self.cfg_edges.clone(),
            bfg_graphs: self.bfg_graphs.clone(),
            bfg_blocks: self.bfg_blocks.clone(),
            dfg_snapshot: self.dfg_snapshot.clone(),
            expressions: self.expressions.clone(),
            interprocedural_edges: self.interprocedural_edges.clone(),
            occurrences: self.occurrences.clone(),
            diagnostics: self.diagnostics.clone(),
            packages: self.packages.clone(),
            unified_symbols: self.unified_symbols.clone(),
            pdg_nodes: self.pdg_nodes.clone(),
            pdg_edges: self.pdg_edges.clone(),
            taint_findings: self.taint_findings.clone(),
            ssa_contexts: self.ssa_contexts.clone(),
            dominator_trees: self.dominator_trees.clone(),
            template_slots: self.template_slots.clone(),
            template_elements: self.template_elements.clone(),
            meta: self.meta.clone(),
            // Indexes are rebuilt on demand in the clone
            indexes: RwLock::new(None),
        }
    }
}

/// Index set built lazily over the document
///
/// All lookups are index-based (positions into the owning vectors), never
/// pointer-based.
#[derive(Debug, Default)]
pub struct DocumentIndexes {
    node_by_id: AHashMap<String, usize>,
    edges_by_source: AHashMap<String, Vec<usize>>,
    edges_by_target: AHashMap<String, Vec<usize>>,
    file_nodes: AHashMap<String, Vec<usize>>,
    nodes_by_kind: AHashMap<NodeKind, Vec<usize>>,
    cfg_blocks_by_kind: AHashMap<CfgBlockKind, Vec<usize>>,
    cfg_block_by_id: AHashMap<String, usize>,
    expressions_by_kind: AHashMap<ExprKind, Vec<ExprId>>,
    slots_by_context: AHashMap<SlotContextKind, Vec<usize>>,
    slots_by_file: AHashMap<String, Vec<usize>>,
    slots_by_id: AHashMap<String, usize>,
    bindings_by_slot: AHashMap<String, Vec<usize>>,
    bindings_by_source: AHashMap<String, Vec<usize>>,
    occurrence_index: OccurrenceIndex,
}

impl IRDocument {
    pub fn new(repo_id: impl Into<String>, snapshot_id: impl Into<String>) -> Self {
        Self {
            repo_id: repo_id.into(),
            snapshot_id: snapshot_id.into(),
            schema_version: SCHEMA_VERSION.to_string(),
            nodes: Vec::new(),
            edges: Vec::new(),
            types: Vec::new(),
            signatures: Vec::new(),
            cfgs: Vec::new(),
            cfg_blocks: Vec::new(),
            cfg_edges: Vec::new(),
            bfg_graphs: Vec::new(),
            bfg_blocks: Vec::new(),
            dfg_snapshot: None,
            expressions: ExpressionArena::new(),
            interprocedural_edges: Vec::new(),
            occurrences: Vec::new(),
            diagnostics: Vec::new(),
            packages: Vec::new(),
            unified_symbols: Vec::new(),
            pdg_nodes: Vec::new(),
            pdg_edges: Vec::new(),
            taint_findings: Vec::new(),
            ssa_contexts: BTreeMap::new(),
            dominator_trees: BTreeMap::new(),
            template_slots: Vec::new(),
            template_elements: Vec::new(),
            meta: BTreeMap::new(),
            indexes: RwLock::new(None),
        }
    }

    // ------------------------------------------------------------------
    // Ordering
    // ------------------------------------------------------------------

    /// Assign dense insertion-order sequence numbers to nodes and edges.
    ///
    /// local_seq is the tie-breaker for total ordering; call before
    /// `enforce_total_ordering`.
    pub fn assign_local_seq(&mut self) {
        for (idx, node) in self.nodes.iter_mut().enumerate() {
            node.local_seq = idx as u64;
        }
        for (idx, edge) in self.edges.iter_mut().enumerate() {
            edge.local_seq = idx as u64;
        }
        self.invalidate_indexes();
    }

    /// Sort nodes and edges into the documented total order.
    ///
    /// Nodes: (file_path, kind, start_line, end_line, local_seq)
    /// Edges: (source_id, target_id, kind, local_seq)
    ///
    /// With local_seq assigned, no two records compare equal, so the same
    /// input always serializes identically.
    pub fn enforce_total_ordering(&mut self) {
        self.nodes.sort_by(|a, b| {
            a.ordering_key().cmp(&b.ordering_key())
        });
        self.edges.sort_by(|a, b| {
            a.ordering_key().cmp(&b.ordering_key())
        });
        self.invalidate_indexes();
    }

    // ------------------------------------------------------------------
    // Index building
    // ------------------------------------------------------------------

    pub fn invalidate_indexes(&self) {
        *self.indexes.write() = None;
    }

    /// Build (or fetch) the full index set. Idempotent.
    pub fn ensure_indexes(&self) -> Arc<DocumentIndexes> {
        if let Some(indexes) = self.indexes.read().as_ref() {
            return Arc::clone(indexes);
        }

        let mut guard = self.indexes.write();
        // Another writer may have built while we waited
        if let Some(indexes) = guard.as_ref() {
            return Arc::clone(indexes);
        }

        let built = Arc::new(self.build_indexes());
        *guard = Some(Arc::clone(&built));
        built
    }

    fn build_indexes(&self) -> DocumentIndexes {
        let mut idx = DocumentIndexes::default();

        for (i, node) in self.nodes.iter().enumerate() {
            idx.node_by_id.insert(node.id.clone(), i);
            idx.file_nodes
                .entry(node.file_path.clone())
                .or_default()
                .push(i);
            idx.nodes_by_kind.entry(node.kind).or_default().push(i);
        }

        for (i, edge) in self.edges.iter().enumerate() {
            idx.edges_by_source
                .entry(edge.source_id.clone())
                .or_default()
                .push(i);
            idx.edges_by_target
                .entry(edge.target_id.clone())
                .or_default()
                .push(i);
            if edge.kind == EdgeKind::Binds {
                idx.bindings_by_slot
                    .entry(edge.target_id.clone())
                    .or_default()
                    .push(i);
                idx.bindings_by_source
                    .entry(edge.source_id.clone())
                    .or_default()
                    .push(i);
            }
        }

        for (i, block) in self.cfg_blocks.iter().enumerate() {
            idx.cfg_blocks_by_kind.entry(block.kind).or_default().push(i);
            idx.cfg_block_by_id.insert(block.id.clone(), i);
        }

        for expr in self.expressions.iter() {
            idx.expressions_by_kind
                .entry(expr.kind)
                .or_default()
                .push(expr.id);
        }

        for (i, slot) in self.template_slots.iter().enumerate() {
            idx.slots_by_context
                .entry(slot.context_kind)
                .or_default()
                .push(i);
            idx.slots_by_file
                .entry(slot.file_path.clone())
                .or_default()
                .push(i);
            idx.slots_by_id.insert(slot.slot_id.clone(), i);
        }

        idx.occurrence_index = OccurrenceIndex::build(&self.occurrences);

        idx
    }

    // ------------------------------------------------------------------
    // Queries (all O(1)-average through the index set)
    // ------------------------------------------------------------------

    pub fn get_node(&self, node_id: &str) -> Option<&Node> {
        let idx = self.ensure_indexes();
        idx.node_by_id.get(node_id).map(|&i| &self.nodes[i])
    }

    pub fn get_edges_from(&self, source_id: &str) -> Vec<&Edge> {
        let idx = self.ensure_indexes();
        Self::collect(&self.edges, idx.edges_by_source.get(source_id))
    }

    pub fn get_edges_by_target(&self, target_id: &str) -> Vec<&Edge> {
        let idx = self.ensure_indexes();
        Self::collect(&self.edges, idx.edges_by_target.get(target_id))
    }

    pub fn get_file_nodes(&self, file_path: &str) -> Vec<&Node> {
        let idx = self.ensure_indexes();
        Self::collect(&self.nodes, idx.file_nodes.get(file_path))
    }

    pub fn get_nodes_by_kind(&self, kind: NodeKind) -> Vec<&Node> {
        let idx = self.ensure_indexes();
        Self::collect(&self.nodes, idx.nodes_by_kind.get(&kind))
    }

    pub fn get_cfg_blocks_by_kind(&self, kind: CfgBlockKind) -> Vec<&CfgBlock> {
        let idx = self.ensure_indexes();
        Self::collect(&self.cfg_blocks, idx.cfg_blocks_by_kind.get(&kind))
    }

    pub fn get_cfg_block(&self, block_id: &str) -> Option<&CfgBlock> {
        let idx = self.ensure_indexes();
        idx.cfg_block_by_id.get(block_id).map(|&i| &self.cfg_blocks[i])
    }

    pub fn get_expressions_by_kind(&self, kind: ExprKind) -> Vec<&Expression> {
        let idx = self.ensure_indexes();
        idx.expressions_by_kind
            .get(&kind)
            .map(|ids| ids.iter().filter_map(|&id| self.expressions.get(id)).collect())
            .unwrap_or_default()
    }

    pub fn get_expression(&self, id: ExprId) -> Option<&Expression> {
        self.expressions.get(id)
    }

    pub fn find_nodes_by_name(&self, name: &str) -> Vec<&Node> {
        self.nodes
            .iter()
            .filter(|n| n.name.as_deref() == Some(name))
            .collect()
    }

    // Occurrence queries

    pub fn find_references(&self, symbol_id: &str) -> Vec<Occurrence> {
        let idx = self.ensure_indexes();
        idx.occurrence_index
            .by_symbol(symbol_id)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn find_definitions(&self, symbol_id: &str) -> Vec<Occurrence> {
        let idx = self.ensure_indexes();
        idx.occurrence_index
            .definitions(symbol_id)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn get_file_occurrences(&self, file_path: &str) -> Vec<Occurrence> {
        let idx = self.ensure_indexes();
        idx.occurrence_index
            .by_file(file_path)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn get_occurrences_by_role(&self, role: SymbolRole) -> Vec<Occurrence> {
        let idx = self.ensure_indexes();
        idx.occurrence_index
            .by_role(role)
            .into_iter()
            .cloned()
            .collect()
    }

    // Template queries

    pub fn get_slots_by_context(&self, context: SlotContextKind) -> Vec<&TemplateSlot> {
        let idx = self.ensure_indexes();
        Self::collect(&self.template_slots, idx.slots_by_context.get(&context))
    }

    pub fn get_slots_by_file(&self, file_path: &str) -> Vec<&TemplateSlot> {
        let idx = self.ensure_indexes();
        Self::collect(&self.template_slots, idx.slots_by_file.get(file_path))
    }

    pub fn get_slot(&self, slot_id: &str) -> Option<&TemplateSlot> {
        let idx = self.ensure_indexes();
        idx.slots_by_id.get(slot_id).map(|&i| &self.template_slots[i])
    }

    /// Binds edges targeting a slot (slot → its source variables)
    pub fn get_slot_bindings(&self, slot_id: &str) -> Vec<&Edge> {
        let idx = self.ensure_indexes();
        Self::collect(&self.edges, idx.bindings_by_slot.get(slot_id))
    }

    /// Slots a variable is exposed at (reverse Binds lookup)
    pub fn get_variable_slots(&self, variable_id: &str) -> Vec<&TemplateSlot> {
        let idx = self.ensure_indexes();
        let Some(edge_ids) = idx.bindings_by_source.get(variable_id) else {
            return Vec::new();
        };
        edge_ids
            .iter()
            .filter_map(|&i| idx.slots_by_id.get(self.edges[i].target_id.as_str()))
            .map(|&slot_idx| &self.template_slots[slot_idx])
            .collect()
    }

    pub fn get_raw_html_sinks(&self) -> Vec<&TemplateSlot> {
        self.get_slots_by_context(SlotContextKind::RawHtml)
    }

    pub fn get_url_sinks(&self) -> Vec<&TemplateSlot> {
        self.get_slots_by_context(SlotContextKind::UrlAttr)
    }

    fn collect<'a, T>(items: &'a [T], indices: Option<&Vec<usize>>) -> Vec<&'a T> {
        indices
            .map(|ids| ids.iter().map(|&i| &items[i]).collect())
            .unwrap_or_default()
    }

    // ------------------------------------------------------------------
    // Statistics
    // ------------------------------------------------------------------

    pub fn get_stats(&self) -> BTreeMap<String, serde_json::Value> {
        let mut stats = BTreeMap::new();
        stats.insert("schema_version".into(), self.schema_version.clone().into());
        stats.insert("repo_id".into(), self.repo_id.clone().into());
        stats.insert("snapshot_id".into(), self.snapshot_id.clone().into());
        stats.insert("nodes".into(), self.nodes.len().into());
        stats.insert("edges".into(), self.edges.len().into());
        stats.insert("types".into(), self.types.len().into());
        stats.insert("signatures".into(), self.signatures.len().into());
        stats.insert("cfg_blocks".into(), self.cfg_blocks.len().into());
        stats.insert("expressions".into(), self.expressions.len().into());
        stats.insert("occurrences".into(), self.occurrences.len().into());
        stats.insert("pdg_nodes".into(), self.pdg_nodes.len().into());
        stats.insert("pdg_edges".into(), self.pdg_edges.len().into());
        stats.insert("taint_findings".into(), self.taint_findings.len().into());
        stats.insert("template_slots".into(), self.template_slots.len().into());
        stats.insert("diagnostics".into(), self.diagnostics.len().into());
        stats
    }

    /// Conservative memory estimate for size-based cache eviction
    pub fn estimated_size(&self) -> usize {
        self.nodes.len() * 200
            + self.edges.len() * 100
            + self.occurrences.len() * 50
            + self.types.len() * 150
            + self.signatures.len() * 200
            + self.cfg_blocks.len() * 300
            + self.cfg_edges.len() * 50
            + self.bfg_blocks.len() * 200
            + self.expressions.len() * 180
            + self.interprocedural_edges.len() * 120
            + self.pdg_nodes.len() * 250
            + self.pdg_edges.len() * 80
            + self.taint_findings.len() * 300
            + self.template_slots.len() * 150
            + self.template_elements.len() * 100
            + self.diagnostics.len() * 200
            + self.ssa_contexts.len() * 2000
            + 2000
    }

    /// Merge another (single-file) document into this one.
    ///
    /// Identity fields of `self` win; layers are concatenated. Callers are
    /// expected to re-run `assign_local_seq` + `enforce_total_ordering`.
    pub fn absorb(&mut self, other: IRDocument) {
        self.nodes.extend(other.nodes);
        self.edges.extend(other.edges);
        self.types.extend(other.types);
        self.signatures.extend(other.signatures);
        self.cfgs.extend(other.cfgs);
        self.cfg_blocks.extend(other.cfg_blocks);
        self.cfg_edges.extend(other.cfg_edges);
        self.bfg_graphs.extend(other.bfg_graphs);
        self.bfg_blocks.extend(other.bfg_blocks);
        if let Some(snapshot) = other.dfg_snapshot {
            self.dfg_snapshot
                .get_or_insert_with(DfgSnapshot::default)
                .merge(snapshot);
        }
        self.expressions.extend(other.expressions);
        self.interprocedural_edges.extend(other.interprocedural_edges);
        self.occurrences.extend(other.occurrences);
        self.diagnostics.extend(other.diagnostics);
        self.packages.extend(other.packages);
        self.unified_symbols.extend(other.unified_symbols);
        self.pdg_nodes.extend(other.pdg_nodes);
        self.pdg_edges.extend(other.pdg_edges);
        self.taint_findings.extend(other.taint_findings);
        self.ssa_contexts.extend(other.ssa_contexts);
        self.dominator_trees.extend(other.dominator_trees);
        self.template_slots.extend(other.template_slots);
        self.template_elements.extend(other.template_elements);
        self.invalidate_indexes();
    }

    /// Serialize under total ordering (the canonical byte form)
    pub fn to_canonical_json(&mut self) -> crate::shared::models::Result<String> {
        self.assign_local_seq();
        self.enforce_total_ordering();
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::span::Span;

    fn make_node(id: &str, kind: NodeKind, fqn: &str, file: &str, line: u32) -> Node {
        Node::new(
            id.to_string(),
            kind,
            fqn.to_string(),
            file.to_string(),
            Span::new(line, 0, line + 3, 0),
            "python".to_string(),
        )
    }

    #[test]
    fn test_index_equivalence_by_kind() {
        let mut doc = IRDocument::new("r", "s");
        doc.nodes.push(make_node("node:1", NodeKind::Function, "m.f", "m.py", 1));
        doc.nodes.push(make_node("node:2", NodeKind::Class, "m.C", "m.py", 10));
        doc.nodes.push(make_node("node:3", NodeKind::Function, "m.g", "m.py", 20));

        let indexed = doc.get_nodes_by_kind(NodeKind::Function);
        let scanned: Vec<&Node> = doc
            .nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Function)
            .collect();
        let indexed_ids: Vec<&str> = indexed.iter().map(|n| n.id.as_str()).collect();
        let scanned_ids: Vec<&str> = scanned.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(indexed_ids, scanned_ids);
    }

    #[test]
    fn test_total_ordering_is_deterministic() {
        let mut doc = IRDocument::new("r", "s");
        doc.nodes.push(make_node("node:2", NodeKind::Function, "m.g", "m.py", 20));
        doc.nodes.push(make_node("node:1", NodeKind::Function, "m.f", "m.py", 1));
        doc.assign_local_seq();
        doc.enforce_total_ordering();

        assert_eq!(doc.nodes[0].id, "node:1");
        assert_eq!(doc.nodes[1].id, "node:2");

        // No two records compare equal after local_seq assignment
        let keys: Vec<_> = doc.nodes.iter().map(|n| n.ordering_key()).collect();
        for pair in keys.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn test_indexes_invalidate_on_mutation() {
        let mut doc = IRDocument::new("r", "s");
        doc.nodes.push(make_node("node:1", NodeKind::Function, "m.f", "m.py", 1));
        assert_eq!(doc.get_nodes_by_kind(NodeKind::Function).len(), 1);

        doc.nodes.push(make_node("node:2", NodeKind::Function, "m.g", "m.py", 5));
        doc.invalidate_indexes();
        assert_eq!(doc.get_nodes_by_kind(NodeKind::Function).len(), 2);
    }

    #[test]
    fn test_slot_binding_lookup() {
        let mut doc = IRDocument::new("r", "s");
        let slot = TemplateSlot::new("page.html", Span::new(4, 2, 4, 12), SlotContextKind::RawHtml);
        let slot_id = slot.slot_id.clone();
        doc.template_slots.push(slot);
        doc.nodes.push(make_node("node:v", NodeKind::Variable, "m.bio", "m.py", 2));
        doc.edges.push(Edge::new(
            "edge:1".into(),
            EdgeKind::Binds,
            "node:v",
            slot_id.clone(),
        ));

        assert_eq!(doc.get_slot_bindings(&slot_id).len(), 1);
        let slots = doc.get_variable_slots("node:v");
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].slot_id, slot_id);
        assert_eq!(doc.get_raw_html_sinks().len(), 1);
    }
}

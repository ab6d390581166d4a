//! Selective type enricher
//!
//! Fills type attrs on public-API nodes through a multi-step fallback
//! chain, cheapest first:
//!
//! 1. attrs already carry a return type from the IR generator
//! 2. convention (dunder table, test functions, fixtures, builders,
//!    bool-prefixes, mutator prefixes)
//! 3. literal inference over body statement summaries
//! 4. builtin registry (receiver type + method name)
//! 5. call-graph propagation for single-statement wrappers
//! 6. `type[Name]` for class nodes
//! 7. external language server (optional, semaphore-bounded)
//!
//! Local steps run synchronously over every eligible node; only the
//! leftover set goes to the LSP. Each success records its `type_source`.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::features::type_resolution::domain::builtin_registry::BuiltinMethodRegistry;
use crate::features::type_resolution::ports::LspTypePort;
use crate::shared::models::attrs::keys;
use crate::shared::models::{AttrAccess, AttrValue, IRDocument, Node, NodeKind};

/// Enricher configuration
#[derive(Debug, Clone)]
pub struct EnricherConfig {
    /// Skip the LSP fallback entirely (local chain only)
    pub skip_lsp_fallback: bool,
    /// Concurrent LSP queries
    pub lsp_concurrency: usize,
}

impl Default for EnricherConfig {
    fn default() -> Self {
        Self {
            skip_lsp_fallback: true,
            lsp_concurrency: 20,
        }
    }
}

/// Per-run statistics, one counter per resolution source
#[derive(Debug, Default, Clone)]
pub struct EnrichmentStats {
    pub total_queries: u64,
    pub ir_hits: u64,
    pub convention_hits: u64,
    pub literal_hits: u64,
    pub registry_hits: u64,
    pub callgraph_hits: u64,
    pub class_hits: u64,
    pub lsp_hits: u64,
}

impl EnrichmentStats {
    pub fn local_hits(&self) -> u64 {
        self.ir_hits
            + self.convention_hits
            + self.literal_hits
            + self.registry_hits
            + self.callgraph_hits
            + self.class_hits
    }

    pub fn local_hit_rate(&self) -> f64 {
        if self.total_queries == 0 {
            return 0.0;
        }
        self.local_hits() as f64 / self.total_queries as f64
    }
}

/// Dunder return-type conventions
static DUNDER_RETURN_TYPES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("__init__", "None"),
        ("__new__", "Self"),
        ("__del__", "None"),
        ("__str__", "str"),
        ("__repr__", "str"),
        ("__bytes__", "bytes"),
        ("__format__", "str"),
        ("__len__", "int"),
        ("__length_hint__", "int"),
        ("__bool__", "bool"),
        ("__hash__", "int"),
        ("__sizeof__", "int"),
        ("__iter__", "Iterator"),
        ("__next__", "Any"),
        ("__reversed__", "Iterator"),
        ("__contains__", "bool"),
        ("__enter__", "Self"),
        ("__exit__", "bool | None"),
        ("__aenter__", "Self"),
        ("__aexit__", "bool | None"),
        ("__await__", "Generator"),
        ("__aiter__", "AsyncIterator"),
        ("__anext__", "Any"),
        ("__eq__", "bool"),
        ("__ne__", "bool"),
        ("__lt__", "bool"),
        ("__le__", "bool"),
        ("__gt__", "bool"),
        ("__ge__", "bool"),
        ("__add__", "Self"),
        ("__sub__", "Self"),
        ("__mul__", "Self"),
        ("__truediv__", "Self"),
        ("__floordiv__", "Self"),
        ("__mod__", "Self"),
        ("__pow__", "Self"),
        ("__and__", "Self"),
        ("__or__", "Self"),
        ("__xor__", "Self"),
        ("__neg__", "Self"),
        ("__pos__", "Self"),
        ("__abs__", "Self"),
        ("__invert__", "Self"),
        ("__int__", "int"),
        ("__float__", "float"),
        ("__complex__", "complex"),
        ("__index__", "int"),
        ("__round__", "int"),
        ("__call__", "Any"),
        ("__getitem__", "Any"),
        ("__setitem__", "None"),
        ("__delitem__", "None"),
        ("__getattr__", "Any"),
        ("__setattr__", "None"),
        ("__delattr__", "None"),
        ("__get__", "Any"),
        ("__set__", "None"),
        ("__set_name__", "None"),
        ("__instancecheck__", "bool"),
        ("__subclasscheck__", "bool"),
    ])
});

const NONE_RETURNING_PREFIXES: &[&str] = &[
    "set_", "update_", "delete_", "remove_", "clear_", "reset_", "init_", "setup_", "cleanup_",
    "teardown_", "register_", "unregister_", "add_", "append_",
];

const NONE_RETURNING_NAMES: &[&str] = &["close", "shutdown", "dispose", "finalize"];

const BOOL_PREFIXES: &[&str] = &[
    "is_", "has_", "can_", "should_", "will_", "was_", "did_", "check_", "validate_",
];

/// How a type was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeSource {
    Ir,
    Convention,
    Literal,
    Registry,
    CallGraph,
    Class,
    Lsp,
}

impl TypeSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeSource::Ir => "ir",
            TypeSource::Convention => "convention",
            TypeSource::Literal => "literal",
            TypeSource::Registry => "yaml",
            TypeSource::CallGraph => "callgraph",
            TypeSource::Class => "class",
            TypeSource::Lsp => "lsp",
        }
    }
}

pub struct SelectiveTypeEnricher {
    lsp: Arc<dyn LspTypePort>,
    config: EnricherConfig,
    registry: BuiltinMethodRegistry,
    /// file_path -> source lines, for name-column resolution
    file_lines_cache: HashMap<String, Vec<String>>,
    stats: EnrichmentStats,
}

impl SelectiveTypeEnricher {
    pub fn new(lsp: Arc<dyn LspTypePort>, config: EnricherConfig) -> Self {
        Self {
            lsp,
            config,
            registry: BuiltinMethodRegistry::new(),
            file_lines_cache: HashMap::new(),
            stats: EnrichmentStats::default(),
        }
    }

    pub fn stats(&self) -> &EnrichmentStats {
        &self.stats
    }

    /// Provide raw sources for name-column resolution of LSP queries
    pub fn cache_source(&mut self, file_path: &str, source: &str) {
        self.file_lines_cache.insert(
            file_path.to_string(),
            source.lines().map(|l| l.to_string()).collect(),
        );
    }

    /// Bulk enrichment over a set of documents: synchronous local steps
    /// for every eligible node, then a batched LSP pass for the rest.
    pub async fn enrich_bulk(&mut self, documents: &mut [&mut IRDocument], language: &str) -> u64 {
        self.stats = EnrichmentStats::default();

        if !self.lsp.is_language_supported(language) {
            tracing::warn!("language '{}' not supported for LSP enrichment", language);
        }

        // Return types already known per function name, for call-graph
        // propagation
        let mut known_returns: HashMap<String, String> = HashMap::new();
        for document in documents.iter() {
            for node in &document.nodes {
                if let Some(return_type) = node.attrs.get_str(keys::RETURN_TYPE) {
                    if let Some(name) = &node.name {
                        known_returns.insert(name.clone(), return_type.to_string());
                    }
                }
            }
        }

        let mut enriched = 0u64;
        let mut lsp_needed: Vec<(usize, String)> = Vec::new();

        for (doc_index, document) in documents.iter_mut().enumerate() {
            let eligible: Vec<String> = document
                .nodes
                .iter()
                .filter(|n| is_public_api(n))
                .map(|n| n.id.clone())
                .collect();

            for node_id in eligible {
                self.stats.total_queries += 1;
                let node = document
                    .nodes
                    .iter_mut()
                    .find(|n| n.id == node_id)
                    .expect("node id collected above");

                match try_local_inference(node, &self.registry, &known_returns) {
                    Some((inferred, source)) => {
                        record_hit(&mut self.stats, source);
                        apply_type(node, &inferred, source);
                        enriched += 1;
                    }
                    None => lsp_needed.push((doc_index, node_id)),
                }
            }
        }

        if !lsp_needed.is_empty() {
            if self.config.skip_lsp_fallback {
                tracing::info!(
                    "skipping LSP fallback for {} nodes (disabled)",
                    lsp_needed.len()
                );
            } else {
                enriched += self
                    .run_lsp_fallback(documents, language, lsp_needed)
                    .await;
            }
        }

        tracing::info!(
            "type enrichment: {}/{} resolved, local rate {:.1}%",
            enriched,
            self.stats.total_queries,
            self.stats.local_hit_rate() * 100.0
        );
        enriched
    }

    async fn run_lsp_fallback(
        &mut self,
        documents: &mut [&mut IRDocument],
        language: &str,
        lsp_needed: Vec<(usize, String)>,
    ) -> u64 {
        let semaphore = Arc::new(Semaphore::new(self.config.lsp_concurrency.max(1)));
        let mut enriched = 0u64;

        // Resolve hover positions first (needs the file-line cache)
        let mut queries: Vec<(usize, String, String, u32, u32)> = Vec::new();
        for (doc_index, node_id) in lsp_needed {
            let Some(node) = documents[doc_index].nodes.iter().find(|n| n.id == node_id) else {
                continue;
            };
            let column = self.find_name_column(node);
            queries.push((
                doc_index,
                node_id,
                node.file_path.clone(),
                node.span.start_line,
                column,
            ));
        }

        let mut handles = Vec::new();
        for (doc_index, node_id, file_path, line, column) in queries {
            let lsp = Arc::clone(&self.lsp);
            let semaphore = Arc::clone(&semaphore);
            let language = language.to_string();
            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire().await.ok()?;
                let info = lsp.get_type_info(&language, &file_path, line, column).await?;
                Some((doc_index, node_id, info))
            }));
        }

        for handle in handles {
            if let Ok(Some((doc_index, node_id, info))) = handle.await {
                if let Some(node) = documents[doc_index]
                    .nodes
                    .iter_mut()
                    .find(|n| n.id == node_id)
                {
                    apply_type(node, &info.type_string, TypeSource::Lsp);
                    if let Some(docs) = info.documentation {
                        node.attrs.insert("lsp_docs".to_string(), AttrValue::from(docs));
                    }
                    node.attrs
                        .insert("lsp_is_nullable".to_string(), AttrValue::Bool(info.is_nullable));
                    self.stats.lsp_hits += 1;
                    enriched += 1;
                }
            }
        }
        enriched
    }

    /// Column of the symbol name, not the keyword. Reads the raw source
    /// line: for `class Helper:` the span points at `class` but hover
    /// works on `Helper`.
    fn find_name_column(&self, node: &Node) -> u32 {
        let Some(name) = &node.name else {
            return node.span.start_col;
        };
        let Some(lines) = self.file_lines_cache.get(&node.file_path) else {
            return node.span.start_col;
        };
        let line_index = (node.span.start_line as usize).saturating_sub(1);
        let Some(line) = lines.get(line_index) else {
            return node.span.start_col;
        };

        let from = node.span.start_col as usize;
        if from <= line.len() {
            if let Some(position) = line[from..].find(name.as_str()) {
                return (from + position) as u32;
            }
        }
        line.find(name.as_str())
            .map(|p| p as u32)
            .unwrap_or(node.span.start_col)
    }
}

fn record_hit(stats: &mut EnrichmentStats, source: TypeSource) {
    match source {
        TypeSource::Ir => stats.ir_hits += 1,
        TypeSource::Convention => stats.convention_hits += 1,
        TypeSource::Literal => stats.literal_hits += 1,
        TypeSource::Registry => stats.registry_hits += 1,
        TypeSource::CallGraph => stats.callgraph_hits += 1,
        TypeSource::Class => stats.class_hits += 1,
        TypeSource::Lsp => stats.lsp_hits += 1,
    }
}

fn apply_type(node: &mut Node, inferred: &str, source: TypeSource) {
    node.attrs
        .insert(keys::ENRICHED_TYPE.to_string(), AttrValue::from(inferred));
    node.attrs
        .insert(keys::TYPE_SOURCE.to_string(), AttrValue::from(source.as_str()));
    node.attrs
        .insert(keys::TYPE_ENHANCED.to_string(), AttrValue::Bool(true));
}

/// Public-API filter: symbol kinds, non-private (dunder excepted), real
/// file path, non-sentinel span.
pub fn is_public_api(node: &Node) -> bool {
    let symbol_kinds = matches!(
        node.kind,
        NodeKind::Class
            | NodeKind::Function
            | NodeKind::Method
            | NodeKind::Interface
            | NodeKind::Enum
            | NodeKind::TypeAlias
            | NodeKind::Constant
    );
    if !symbol_kinds {
        return false;
    }
    let Some(name) = &node.name else {
        return false;
    };
    if node.file_path.is_empty() || node.file_path.starts_with('<') || node.file_path == "builtins"
    {
        return false;
    }
    if node.span.start_line == 0 {
        return false;
    }
    if name.starts_with('_') && !name.starts_with("__") {
        return false;
    }
    if node.attrs.get_bool("is_private").unwrap_or(false) {
        return false;
    }
    if node.attrs.get_bool(keys::IS_EXPORTED) == Some(false) {
        return false;
    }
    true
}

/// The synchronous part of the chain (steps 1-6).
fn try_local_inference(
    node: &Node,
    registry: &BuiltinMethodRegistry,
    known_returns: &HashMap<String, String>,
) -> Option<(String, TypeSource)> {
    // Step 1: IR generator already extracted the type
    if let Some(type_info) = node.attrs.get_map(keys::TYPE_INFO) {
        if let Some(return_type) = type_info.get("return_type").and_then(|v| v.as_str()) {
            return Some((return_type.to_string(), TypeSource::Ir));
        }
    }
    if let Some(return_type) = node.attrs.get_str(keys::RETURN_TYPE) {
        return Some((return_type.to_string(), TypeSource::Ir));
    }

    // Step 2: conventions
    if let Some(inferred) = try_convention_inference(node) {
        return Some((inferred, TypeSource::Convention));
    }

    // Step 3: return literal inference
    if let Some(inferred) = try_literal_inference(node) {
        return Some((inferred, TypeSource::Literal));
    }

    // Step 4: builtin registry
    if node.kind == NodeKind::Method {
        if let (Some(receiver), Some(name)) =
            (node.attrs.get_str(keys::RECEIVER_TYPE), node.name.as_deref())
        {
            if let Some(inferred) = registry.method_return_type(receiver, name) {
                return Some((inferred.to_string(), TypeSource::Registry));
            }
        }
    }
    if node.kind == NodeKind::Function {
        if let Some(name) = node.name.as_deref() {
            if let Some(inferred) = registry.function_return_type(name) {
                return Some((inferred.to_string(), TypeSource::Registry));
            }
        }
    }

    // Step 5: call-graph propagation for `return callee(...)` wrappers
    if let Some(inferred) = try_callgraph_inference(node, known_returns) {
        return Some((inferred, TypeSource::CallGraph));
    }

    // Step 6: classes type as themselves
    if node.kind == NodeKind::Class {
        if let Some(name) = &node.name {
            return Some((format!("type[{}]", name), TypeSource::Class));
        }
    }

    None
}

fn body_statements(node: &Node) -> Vec<(String, String)> {
    node.attrs
        .get_list(keys::BODY_STATEMENTS)
        .map(|statements| {
            statements
                .iter()
                .filter_map(|s| s.as_map())
                .map(|m| {
                    (
                        m.get("type").and_then(|v| v.as_str()).unwrap_or("").to_string(),
                        m.get("value").and_then(|v| v.as_str()).unwrap_or("").to_string(),
                    )
                })
                .collect()
        })
        .unwrap_or_default()
}

fn try_convention_inference(node: &Node) -> Option<String> {
    if !matches!(node.kind, NodeKind::Function | NodeKind::Method) {
        return None;
    }
    let name = node.name.as_deref()?;
    let body = body_statements(node);

    // Dunder methods
    if name.starts_with("__") && name.ends_with("__") {
        if let Some(return_type) = DUNDER_RETURN_TYPES.get(name) {
            return Some(return_type.to_string());
        }
    }

    // Test functions never return values
    if name.starts_with("test_") {
        return Some("None".to_string());
    }
    if matches!(
        name,
        "setUp" | "tearDown" | "setUpClass" | "tearDownClass" | "setUpModule" | "tearDownModule"
    ) {
        return Some("None".to_string());
    }

    // Fixture decorators
    let decorators = node
        .attrs
        .get(keys::DECORATORS)
        .map(|v| v.as_str_list())
        .unwrap_or_default();
    if decorators
        .iter()
        .any(|d| *d == "fixture" || d.starts_with("pytest.fixture") || d.starts_with("fixture("))
    {
        return Some("Any".to_string());
    }

    // Abstract bodies: pass / ellipsis / raise NotImplementedError
    if body.len() == 1 {
        let (stmt_type, value) = &body[0];
        if stmt_type == "pass" || stmt_type == "ellipsis" {
            return Some("Any".to_string());
        }
        if stmt_type == "raise" && value.contains("NotImplementedError") {
            return Some("Any".to_string());
        }
    }

    // Mutator prefixes return None unless a valued return exists
    let has_valued_return = body
        .iter()
        .any(|(stmt_type, value)| stmt_type == "return" && !value.trim().is_empty());
    if NONE_RETURNING_PREFIXES.iter().any(|p| name.starts_with(p))
        || NONE_RETURNING_NAMES.contains(&name)
    {
        if !has_valued_return {
            return Some("None".to_string());
        }
    }

    // Builder pattern returning self
    if name.starts_with("with_") || matches!(name, "build" | "configure" | "chain") {
        if body
            .iter()
            .any(|(stmt_type, value)| stmt_type == "return" && value.trim() == "self")
        {
            return Some("Self".to_string());
        }
    }

    // Predicate family
    if BOOL_PREFIXES.iter().any(|p| name.starts_with(p)) {
        return Some("bool".to_string());
    }

    None
}

fn try_literal_inference(node: &Node) -> Option<String> {
    if !matches!(node.kind, NodeKind::Function | NodeKind::Method) {
        return None;
    }
    let body = body_statements(node);
    if body.is_empty() {
        return None;
    }

    let mut return_types: Vec<String> = Vec::new();
    for (stmt_type, value) in &body {
        if stmt_type == "return" && !value.trim().is_empty() {
            if let Some(inferred) = infer_literal_type(value) {
                if !return_types.contains(&inferred) {
                    return_types.push(inferred);
                }
            }
        }
    }

    match return_types.len() {
        0 => None,
        1 => Some(return_types.remove(0)),
        _ => {
            return_types.sort();
            Some(return_types.join(" | "))
        }
    }
}

static INT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?\d+$").unwrap());
static HEX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^0[xX][0-9a-fA-F]+$").unwrap());
static FLOAT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?(\d+\.\d*|\d*\.\d+|\d+\.?\d*[eE][+-]?\d+)$").unwrap());
static CONSTRUCTOR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([A-Z][a-zA-Z0-9_]*)\s*\(").unwrap());

/// Type of a literal return payload
fn infer_literal_type(value: &str) -> Option<String> {
    let value = value.trim();

    if value == "None" {
        return Some("None".to_string());
    }
    if value == "True" || value == "False" {
        return Some("bool".to_string());
    }

    let first_quote = value.starts_with('"') || value.starts_with('\'');
    let string_prefixes = ["r\"", "r'", "f\"", "f'", "rf\"", "rf'", "fr\"", "fr'"];
    if (first_quote && value.len() >= 2) || string_prefixes.iter().any(|p| value.starts_with(p)) {
        return Some("str".to_string());
    }
    if value.starts_with("b\"") || value.starts_with("b'") {
        return Some("bytes".to_string());
    }

    if INT_RE.is_match(value) || HEX_RE.is_match(value) {
        return Some("int".to_string());
    }
    if FLOAT_RE.is_match(value) {
        return Some("float".to_string());
    }

    if value.starts_with('[') && value.ends_with(']') {
        return Some("list".to_string());
    }
    if value.starts_with('{') && value.ends_with('}') {
        return Some(if value.contains(':') { "dict" } else { "set" }.to_string());
    }
    if value.starts_with('(') && value.ends_with(')') && value.contains(',') {
        return Some("tuple".to_string());
    }

    // Builtin constructors before the generic ClassName( pattern
    for (constructor, type_name) in [
        ("dict(", "dict"),
        ("list(", "list"),
        ("set(", "set"),
        ("tuple(", "tuple"),
        ("str(", "str"),
        ("int(", "int"),
        ("float(", "float"),
        ("bool(", "bool"),
        ("bytes(", "bytes"),
        ("frozenset(", "frozenset"),
    ] {
        if value.starts_with(constructor) {
            return Some(type_name.to_string());
        }
    }

    if let Some(captures) = CONSTRUCTOR_RE.captures(value) {
        return Some(captures.get(1).unwrap().as_str().to_string());
    }

    if value.starts_with("lambda ") || value.starts_with("lambda:") {
        return Some("Callable".to_string());
    }

    None
}

/// `def wrapper(): return inner()` copies inner's return type when known
fn try_callgraph_inference(node: &Node, known_returns: &HashMap<String, String>) -> Option<String> {
    if !matches!(node.kind, NodeKind::Function | NodeKind::Method) {
        return None;
    }
    let body = body_statements(node);
    if body.len() != 1 {
        return None;
    }
    let (stmt_type, value) = &body[0];
    if stmt_type != "return" {
        return None;
    }
    let value = value.trim();
    if !value.ends_with(')') || !value.contains('(') {
        return None;
    }
    let callee = value.split('(').next()?.trim();
    let simple = callee.rsplit('.').next().unwrap_or(callee);
    known_returns.get(simple).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::ir_generation::application::{generate_file_ir, FileInput};
    use crate::features::type_resolution::ports::NoopLsp;

    fn enrich(source: &str) -> IRDocument {
        let file = FileInput {
            path: "api.py".into(),
            source: source.into(),
        };
        let mut doc = generate_file_ir("repo", "snap", &file, None).unwrap();
        let mut enricher =
            SelectiveTypeEnricher::new(Arc::new(NoopLsp), EnricherConfig::default());
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        runtime.block_on(async {
            let mut docs = [&mut doc];
            enricher.enrich_bulk(&mut docs, "python").await
        });
        doc
    }

    fn enriched_type<'a>(doc: &'a IRDocument, name: &str) -> Option<(&'a str, &'a str)> {
        let node = doc.nodes.iter().find(|n| n.name.as_deref() == Some(name))?;
        Some((
            node.attrs.get_str(keys::ENRICHED_TYPE)?,
            node.attrs.get_str(keys::TYPE_SOURCE)?,
        ))
    }

    #[test]
    fn test_annotation_wins() {
        let doc = enrich("def f() -> int:\n    return compute()\n");
        assert_eq!(enriched_type(&doc, "f"), Some(("int", "ir")));
    }

    #[test]
    fn test_dunder_convention() {
        let doc = enrich("class A:\n    def __len__(self):\n        return self.n\n");
        assert_eq!(enriched_type(&doc, "__len__"), Some(("int", "convention")));
    }

    #[test]
    fn test_bool_prefix_convention() {
        let doc = enrich("def is_ready(state):\n    return state == 2\n");
        assert_eq!(enriched_type(&doc, "is_ready"), Some(("bool", "convention")));
    }

    #[test]
    fn test_literal_inference_union_sorted() {
        let doc = enrich(
            "def get(flag):\n    if flag:\n        return 1\n    return \"x\"\n",
        );
        assert_eq!(enriched_type(&doc, "get"), Some(("int | str", "literal")));
    }

    #[test]
    fn test_class_fallback() {
        let doc = enrich("class Repository:\n    pass\n");
        assert_eq!(
            enriched_type(&doc, "Repository"),
            Some(("type[Repository]", "class"))
        );
    }

    #[test]
    fn test_private_not_enriched() {
        let doc = enrich("def _internal():\n    return 1\n");
        let node = doc
            .nodes
            .iter()
            .find(|n| n.name.as_deref() == Some("_internal"))
            .unwrap();
        assert!(node.attrs.get(keys::ENRICHED_TYPE).is_none());
    }

    #[test]
    fn test_mutator_returns_none() {
        let doc = enrich("def set_name(obj, name):\n    obj.name = name\n");
        assert_eq!(enriched_type(&doc, "set_name"), Some(("None", "convention")));
    }

    #[test]
    fn test_constructor_literal() {
        let doc = enrich("def make():\n    return Config()\n");
        assert_eq!(enriched_type(&doc, "make"), Some(("Config", "literal")));
    }

    #[test]
    fn test_coverage_on_small_corpus() {
        let doc = enrich(
            "def test_one():\n    assert True\n\nclass Store:\n    def __repr__(self):\n        return str(self)\n\ndef is_empty(items):\n    return not items\n\ndef total():\n    return 0\n",
        );
        let eligible: Vec<&Node> = doc.nodes.iter().filter(|n| is_public_api(n)).collect();
        let enriched = eligible
            .iter()
            .filter(|n| n.attrs.get_bool(keys::TYPE_ENHANCED) == Some(true))
            .count();
        // Local-only chain covers at least 70% of eligible nodes
        assert!(enriched as f64 / eligible.len() as f64 >= 0.7);
    }
}

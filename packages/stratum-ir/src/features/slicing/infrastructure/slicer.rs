//! Program slicer
//!
//! PDG-based backward/forward slicing with LRU memoization, code fragment
//! extraction and a token estimate for LLM context sizing.

use lru::LruCache;
use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;

use crate::features::pdg::infrastructure::ProgramDependenceGraph;

/// Slice configuration
#[derive(Debug, Clone)]
pub struct SliceConfig {
    pub max_depth: usize,
    pub max_function_depth: usize,
    pub include_control: bool,
    pub include_data: bool,
    pub interprocedural: bool,
    pub strict_mode: bool,
}

impl Default for SliceConfig {
    fn default() -> Self {
        Self {
            max_depth: 50,
            max_function_depth: 3,
            include_control: true,
            include_data: true,
            interprocedural: true,
            strict_mode: false,
        }
    }
}

/// Code fragment included in a slice
#[derive(Debug, Clone)]
pub struct CodeFragment {
    pub file_path: String,
    pub start_line: u32,
    pub end_line: u32,
    pub code: String,
    pub node_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SliceType {
    Backward,
    Forward,
}

impl SliceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SliceType::Backward => "backward",
            SliceType::Forward => "forward",
        }
    }
}

/// Slice result
#[derive(Debug, Clone)]
pub struct SliceResult {
    pub target: String,
    pub slice_type: SliceType,
    pub slice_nodes: HashSet<String>,
    pub code_fragments: Vec<CodeFragment>,
    pub total_tokens: usize,
    pub confidence: f64,
    pub metadata: HashMap<String, String>,
}

impl SliceResult {
    pub fn empty(target: &str, slice_type: SliceType) -> Self {
        Self {
            target: target.to_string(),
            slice_type,
            slice_nodes: HashSet::new(),
            code_fragments: Vec::new(),
            total_tokens: 0,
            confidence: 0.0,
            metadata: HashMap::new(),
        }
    }

    pub fn with_error(target: &str, slice_type: SliceType, error: &str) -> Self {
        let mut result = Self::empty(target, slice_type);
        result.metadata.insert("error".to_string(), error.to_string());
        result
    }
}

/// Program slicer with memoization
pub struct ProgramSlicer {
    config: SliceConfig,
    cache: LruCache<(String, SliceType, usize), SliceResult>,
    cache_hits: u64,
    cache_misses: u64,
}

impl ProgramSlicer {
    pub fn new() -> Self {
        Self::with_config(SliceConfig::default())
    }

    pub fn with_config(config: SliceConfig) -> Self {
        Self {
            config,
            cache: LruCache::new(NonZeroUsize::new(1000).expect("nonzero capacity")),
            cache_hits: 0,
            cache_misses: 0,
        }
    }

    pub fn backward_slice(
        &mut self,
        pdg: &ProgramDependenceGraph,
        target: &str,
        max_depth: Option<usize>,
    ) -> SliceResult {
        self.run_slice(pdg, target, max_depth, SliceType::Backward)
    }

    pub fn forward_slice(
        &mut self,
        pdg: &ProgramDependenceGraph,
        source: &str,
        max_depth: Option<usize>,
    ) -> SliceResult {
        self.run_slice(pdg, source, max_depth, SliceType::Forward)
    }

    fn run_slice(
        &mut self,
        pdg: &ProgramDependenceGraph,
        start: &str,
        max_depth: Option<usize>,
        slice_type: SliceType,
    ) -> SliceResult {
        let depth = max_depth.unwrap_or(self.config.max_depth);
        let cache_key = (start.to_string(), slice_type, depth);

        if let Some(result) = self.cache.get(&cache_key) {
            self.cache_hits += 1;
            return result.clone();
        }
        self.cache_misses += 1;

        if !pdg.contains_node(start) {
            let result = if self.config.strict_mode {
                SliceResult::with_error(start, slice_type, "NODE_NOT_FOUND")
            } else {
                SliceResult::empty(start, slice_type)
            };
            self.cache.put(cache_key, result.clone());
            return result;
        }

        let slice_nodes = pdg.slice_filtered(
            start,
            Some(depth),
            slice_type == SliceType::Backward,
            self.config.include_control,
            self.config.include_data,
        );

        let code_fragments = self.extract_fragments(pdg, &slice_nodes);
        let total_tokens = Self::count_tokens(&code_fragments);
        let confidence = Self::confidence(pdg, &slice_nodes);

        let result = SliceResult {
            target: start.to_string(),
            slice_type,
            slice_nodes,
            code_fragments,
            total_tokens,
            confidence,
            metadata: HashMap::new(),
        };
        self.cache.put(cache_key, result.clone());
        result
    }

    fn extract_fragments(
        &self,
        pdg: &ProgramDependenceGraph,
        slice_nodes: &HashSet<String>,
    ) -> Vec<CodeFragment> {
        let mut fragments: Vec<CodeFragment> = slice_nodes
            .iter()
            .filter_map(|id| pdg.get_node(id))
            .map(|node| CodeFragment {
                file_path: node.file_path.clone().unwrap_or_default(),
                start_line: node.span.start_line,
                end_line: node.span.end_line,
                code: node.statement.clone(),
                node_id: node.node_id.clone(),
            })
            .collect();
        fragments.sort_by(|a, b| {
            (a.file_path.as_str(), a.start_line).cmp(&(b.file_path.as_str(), b.start_line))
        });
        fragments
    }

    /// Rough token estimate (4 chars per token)
    fn count_tokens(fragments: &[CodeFragment]) -> usize {
        fragments.iter().map(|f| f.code.len() / 4 + 1).sum()
    }

    /// Confidence degrades as slice nodes miss from the PDG
    fn confidence(pdg: &ProgramDependenceGraph, slice_nodes: &HashSet<String>) -> f64 {
        if slice_nodes.is_empty() {
            return 0.0;
        }
        let resolved = slice_nodes.iter().filter(|id| pdg.contains_node(id)).count();
        resolved as f64 / slice_nodes.len() as f64
    }

    pub fn cache_stats(&self) -> (u64, u64) {
        (self.cache_hits, self.cache_misses)
    }
}

impl Default for ProgramSlicer {
    fn default() -> Self {
        Self::new()
    }
}

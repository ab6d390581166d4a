//! Unified analyzer
//!
//! Orchestrates the advanced analyses over a completed document: PDG from
//! IR edges, taint in the configured mode, slicer setup, optional alias
//! enrichment. Per-function analysis failures degrade to diagnostics; the
//! batch never aborts.

use std::collections::{HashMap, HashSet};

use crate::features::pdg::infrastructure::{build_pdg, ProgramDependenceGraph};
use crate::features::slicing::infrastructure::{ProgramSlicer, SliceConfig};
use crate::features::taint_analysis::domain::{heuristics, TaintMode};
use crate::features::taint_analysis::infrastructure::alias_analyzer::{AliasAnalyzer, AliasKind};
use crate::features::taint_analysis::infrastructure::basic::{BasicTaintAnalyzer, CallGraph};
use crate::features::taint_analysis::infrastructure::field_sensitive::{
    FieldSensitiveTaintAnalyzer, FieldSource,
};
use crate::features::taint_analysis::infrastructure::path_sensitive::PathSensitiveTaintAnalyzer;
use crate::features::taint_analysis::rules::{
    EffectKind, RuleMatch, TaintRuleCompiler, TaintRuleExecutor, DEFAULT_PYTHON_ATOMS,
};
use crate::features::taint_analysis::validation::GuardDetector;
use crate::shared::cancellation::CancellationToken;
use crate::shared::models::attrs::keys;
use crate::shared::models::{
    AttrAccess, EdgeKind, IRDocument, Result, TaintFinding,
};

/// Unified analyzer configuration
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    pub enable_pdg: bool,
    pub enable_taint: bool,
    pub enable_slicing: bool,
    pub taint_mode: TaintMode,
    pub enable_alias: bool,
    /// Rule matches below this confidence are dropped
    pub min_rule_confidence: f64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            enable_pdg: true,
            enable_taint: true,
            enable_slicing: true,
            taint_mode: TaintMode::Basic,
            enable_alias: true,
            min_rule_confidence: 0.7,
        }
    }
}

/// Per-run statistics
#[derive(Debug, Default, Clone)]
pub struct AnalyzerStats {
    pub pdg_nodes: usize,
    pub pdg_edges: usize,
    pub taint_findings: usize,
    pub alias_count: usize,
    pub rule_matches: usize,
}

/// Non-serializable analysis products (the document keeps the records)
pub struct AnalysisHandles {
    pub pdg: Option<ProgramDependenceGraph>,
    pub slicer: Option<ProgramSlicer>,
    pub aliases: Option<AliasAnalyzer>,
}

pub struct UnifiedAnalyzer {
    config: AnalyzerConfig,
    stats: AnalyzerStats,
    /// Compiled rule executor; None degrades to name heuristics only
    executor: Option<TaintRuleExecutor>,
}

impl UnifiedAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        let executor = match TaintRuleCompiler::new().compile_str(DEFAULT_PYTHON_ATOMS) {
            Ok(rules) => Some(TaintRuleExecutor::new(rules)),
            Err(error) => {
                tracing::warn!("rule compilation failed, heuristics only: {}", error);
                None
            }
        };
        tracing::info!(
            "unified analyzer initialized (taint_mode={})",
            config.taint_mode.as_str()
        );
        Self {
            config,
            stats: AnalyzerStats::default(),
            executor,
        }
    }

    /// Analyzer over a caller-supplied compiled ruleset.
    pub fn with_rules(
        config: AnalyzerConfig,
        rules: Vec<crate::features::taint_analysis::rules::CompiledRule>,
    ) -> Self {
        let mut analyzer = Self::new(config);
        analyzer.executor = Some(TaintRuleExecutor::new(rules));
        analyzer
    }

    pub fn stats(&self) -> &AnalyzerStats {
        &self.stats
    }

    /// Run the configured analyses, mutating the document in place.
    pub fn analyze(
        &mut self,
        document: &mut IRDocument,
        cancel: &CancellationToken,
    ) -> Result<AnalysisHandles> {
        tracing::info!("starting unified analysis for {}", document.repo_id);

        let mut handles = AnalysisHandles {
            pdg: None,
            slicer: None,
            aliases: None,
        };

        if self.config.enable_pdg {
            cancel.check()?;
            let pdg = build_pdg(document);
            self.stats.pdg_nodes = pdg.node_count();
            self.stats.pdg_edges = pdg.edge_count();
            tracing::info!(
                "PDG built: {} nodes, {} edges",
                self.stats.pdg_nodes,
                self.stats.pdg_edges
            );
            handles.pdg = Some(pdg);
        }

        if self.config.enable_alias {
            cancel.check()?;
            handles.aliases = Some(self.run_alias_analysis(document));
        }

        if self.config.enable_taint {
            cancel.check()?;
            let mut findings = self.run_taint(document, cancel)?;
            if let Some(aliases) = &handles.aliases {
                aliases.enrich_findings(&mut findings);
            }
            self.stats.taint_findings = findings.len();
            tracing::info!("taint analysis complete: {} findings", findings.len());
            document.taint_findings = findings;
        }

        if self.config.enable_slicing && handles.pdg.is_some() {
            handles.slicer = Some(ProgramSlicer::with_config(SliceConfig {
                interprocedural: true,
                max_function_depth: 2,
                max_depth: 100,
                ..SliceConfig::default()
            }));
            tracing::info!("slicer ready");
        }

        Ok(handles)
    }

    fn run_taint(
        &mut self,
        document: &IRDocument,
        cancel: &CancellationToken,
    ) -> Result<Vec<TaintFinding>> {
        // Rule-driven source/sink identification first; name heuristics
        // remain as the fallback inside each mode
        let matches = self.rule_matches(document);
        self.stats.rule_matches = matches.len();

        match self.config.taint_mode {
            TaintMode::Basic => Ok(self.run_basic_taint(document, &matches)),
            TaintMode::PathSensitive => self.run_path_sensitive_taint(document, &matches, cancel),
            TaintMode::FieldSensitive => Ok(self.run_field_sensitive_taint(document, &matches)),
        }
    }

    fn rule_matches(&mut self, document: &IRDocument) -> Vec<RuleMatch> {
        match &mut self.executor {
            Some(executor) => {
                executor.execute(&document.expressions, self.config.min_rule_confidence)
            }
            None => Vec::new(),
        }
    }

    /// Variables defined in the blocks where a source rule matched
    fn rule_source_variables(document: &IRDocument, matches: &[RuleMatch]) -> HashSet<String> {
        let mut variables = HashSet::new();
        for rule_match in matches.iter().filter(|m| m.effect_kind == EffectKind::Source) {
            let Some(expr) = document.expressions.get(rule_match.expr_id) else {
                continue;
            };
            let Some(block_id) = &expr.block_id else {
                continue;
            };
            if let Some(block) = document.get_cfg_block(block_id) {
                variables.extend(block.defined_vars.iter().cloned());
            }
        }
        variables
    }

    /// Function node ids owning at least one match of the given effect
    fn rule_tagged_functions(
        document: &IRDocument,
        matches: &[RuleMatch],
        effect: EffectKind,
    ) -> HashSet<String> {
        let fqn_to_id: HashMap<&str, &str> = document
            .nodes
            .iter()
            .filter(|n| n.kind.is_callable())
            .map(|n| (n.fqn.as_str(), n.id.as_str()))
            .collect();
        matches
            .iter()
            .filter(|m| m.effect_kind == effect)
            .filter_map(|m| fqn_to_id.get(m.function_fqn.as_str()))
            .map(|id| id.to_string())
            .collect()
    }

    fn run_basic_taint(&self, document: &IRDocument, matches: &[RuleMatch]) -> Vec<TaintFinding> {
        let mut call_graph: CallGraph = HashMap::new();
        for edge in &document.edges {
            if edge.kind == EdgeKind::Calls {
                call_graph
                    .entry(edge.source_id.clone())
                    .or_default()
                    .push(edge.target_id.clone());
            }
        }
        let node_names: HashMap<String, String> = document
            .nodes
            .iter()
            .filter_map(|n| n.name.clone().map(|name| (n.id.clone(), name)))
            .collect();

        let rule_sources = Self::rule_tagged_functions(document, matches, EffectKind::Source);
        let rule_sinks = Self::rule_tagged_functions(document, matches, EffectKind::Sink);

        BasicTaintAnalyzer::analyze_with_tags(&call_graph, &node_names, &rule_sources, &rule_sinks)
    }

    fn run_path_sensitive_taint(
        &self,
        document: &IRDocument,
        matches: &[RuleMatch],
        cancel: &CancellationToken,
    ) -> Result<Vec<TaintFinding>> {
        if document.cfg_blocks.is_empty() {
            tracing::warn!("no CFG available for path-sensitive taint, falling back to basic");
            return Ok(self.run_basic_taint(document, matches));
        }

        let detector = GuardDetector::new();
        let seed_sources = Self::rule_source_variables(document, matches);
        let mut findings = Vec::new();

        for (index, cfg) in document.cfgs.iter().enumerate() {
            cancel.check_every(index + 1)?;

            let blocks: Vec<&crate::shared::models::CfgBlock> = document
                .cfg_blocks
                .iter()
                .filter(|b| b.function_node_id == cfg.function_node_id)
                .collect();
            let edges: Vec<&crate::shared::models::CfgEdge> = document
                .cfg_edges
                .iter()
                .filter(|e| blocks.iter().any(|b| b.id == e.source_block_id))
                .collect();
            let Some(tree) = document.dominator_trees.get(&cfg.function_node_id) else {
                continue;
            };

            let guards = detector.detect(&blocks, &edges);
            let analyzer =
                PathSensitiveTaintAnalyzer::new(blocks, edges, tree, &guards);
            findings.extend(analyzer.analyze(&seed_sources, &cfg.entry_block_id));
        }

        Ok(findings)
    }

    fn run_field_sensitive_taint(
        &self,
        document: &IRDocument,
        matches: &[RuleMatch],
    ) -> Vec<TaintFinding> {
        let blocks: Vec<&crate::shared::models::CfgBlock> = document.cfg_blocks.iter().collect();

        // Whole-object sources: variables assigned where a source rule
        // matched, plus the statement-text fallback
        let mut sources: Vec<FieldSource> = Vec::new();
        for variable in Self::rule_source_variables(document, matches) {
            sources.push((variable, None));
        }
        for block in &blocks {
            for statement in &block.statements {
                if heuristics::is_source_name(statement) {
                    for var in &block.defined_vars {
                        let source = (var.clone(), None);
                        if !sources.contains(&source) {
                            sources.push(source);
                        }
                    }
                }
            }
        }

        FieldSensitiveTaintAnalyzer::analyze(&blocks, &sources, &HashSet::new())
    }

    fn run_alias_analysis(&self, document: &IRDocument) -> AliasAnalyzer {
        let mut analyzer = AliasAnalyzer::new();
        let mut count = 0usize;

        for edge in &document.edges {
            match edge.kind {
                EdgeKind::Writes => {
                    analyzer.add_alias(&edge.source_id, &edge.target_id, AliasKind::Direct, true);
                    count += 1;
                }
                EdgeKind::Reads => {
                    if let Some(var_name) = edge.attrs.get_str(keys::VAR_NAME) {
                        analyzer.add_alias(var_name, &edge.target_id, AliasKind::Direct, false);
                        count += 1;
                    }
                }
                _ => {}
            }
        }

        tracing::info!("alias analysis: {} aliases tracked", count);
        analyzer
    }
}

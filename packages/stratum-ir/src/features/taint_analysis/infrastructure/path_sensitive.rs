//! Path-sensitive taint analysis
//!
//! Worklist iteration over the function CFG with a taint state per block.
//! Join points merge meet-over-paths: tainted variables union, path
//! conditions intersect, depth takes the maximum. A flow reaching a sink
//! unsanitized and unguarded on some path is an actionable finding; a flow
//! sanitized on every path still surfaces as a sanitized finding carrying
//! the sanitizer name, so downstream claims suppress with a reason instead
//! of losing the flow.

use rustc_hash::FxHashMap;
use std::collections::{HashMap, HashSet, VecDeque};

use crate::features::taint_analysis::domain::heuristics;
use crate::features::taint_analysis::validation::guard_detector::Guard;
use crate::shared::models::{
    CfgBlock, CfgBlockKind, CfgEdge, CfgEdgeKind, DominatorTree, FindingSeverity, TaintFinding,
};

/// Branch decision on an execution path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathCondition {
    pub var: String,
    pub value: bool,
}

impl PathCondition {
    pub fn to_display(&self) -> String {
        if self.value {
            self.var.clone()
        } else {
            format!("!{}", self.var)
        }
    }
}

/// Taint state at a program point
#[derive(Debug, Clone, Default)]
pub struct TaintState {
    pub tainted_vars: HashSet<String>,
    /// Sanitized variable -> the sanitizer call that cleaned it
    pub sanitized_vars: HashMap<String, String>,
    pub path_conditions: Vec<PathCondition>,
    pub depth: usize,
}

impl TaintState {
    pub fn with_sources(sources: &HashSet<String>) -> Self {
        Self {
            tainted_vars: sources.clone(),
            ..Default::default()
        }
    }

    pub fn is_tainted(&self, var: &str) -> bool {
        self.tainted_vars.contains(var) && !self.sanitized_vars.contains_key(var)
    }

    pub fn sanitize(&mut self, var: &str, sanitizer: &str) {
        self.sanitized_vars
            .insert(var.to_string(), sanitizer.to_string());
    }

    pub fn sanitizer_of(&self, var: &str) -> Option<&str> {
        self.sanitized_vars.get(var).map(|s| s.as_str())
    }

    /// Meet-over-paths merge: union taint, intersect conditions, max depth
    pub fn merge(&mut self, other: &TaintState) {
        self.tainted_vars.extend(other.tainted_vars.iter().cloned());
        self.path_conditions
            .retain(|c| other.path_conditions.contains(c));
        self.depth = self.depth.max(other.depth);
        // A variable is sanitized only if sanitized on every path
        self.sanitized_vars
            .retain(|var, _| other.sanitized_vars.contains_key(var));
    }
}

/// Loop iteration cap (k-limiting)
const MAX_VISITS_PER_BLOCK: usize = 8;

pub struct PathSensitiveTaintAnalyzer<'a> {
    blocks: Vec<&'a CfgBlock>,
    edges: Vec<&'a CfgEdge>,
    dominator_tree: &'a DominatorTree,
    guards: &'a [Guard],
}

impl<'a> PathSensitiveTaintAnalyzer<'a> {
    pub fn new(
        blocks: Vec<&'a CfgBlock>,
        edges: Vec<&'a CfgEdge>,
        dominator_tree: &'a DominatorTree,
        guards: &'a [Guard],
    ) -> Self {
        Self {
            blocks,
            edges,
            dominator_tree,
            guards,
        }
    }

    /// `sources`: initially tainted variable names.
    pub fn analyze(&self, sources: &HashSet<String>, entry_id: &str) -> Vec<TaintFinding> {
        let block_by_id: HashMap<&str, &CfgBlock> =
            self.blocks.iter().map(|b| (b.id.as_str(), *b)).collect();
        let mut successors: HashMap<&str, Vec<(&str, CfgEdgeKind)>> = HashMap::new();
        for edge in &self.edges {
            successors
                .entry(edge.source_block_id.as_str())
                .or_default()
                .push((edge.target_block_id.as_str(), edge.kind));
        }

        let mut states: FxHashMap<String, TaintState> = FxHashMap::default();
        let mut visits: FxHashMap<String, usize> = FxHashMap::default();
        let mut findings: Vec<TaintFinding> = Vec::new();
        let mut reported: HashSet<(String, String)> = HashSet::new();

        let mut worklist: VecDeque<(String, TaintState)> = VecDeque::new();
        worklist.push_back((entry_id.to_string(), TaintState::with_sources(sources)));

        while let Some((block_id, incoming)) = worklist.pop_front() {
            let visit_count = visits.entry(block_id.clone()).or_insert(0);
            *visit_count += 1;
            if *visit_count > MAX_VISITS_PER_BLOCK {
                continue;
            }

            // Merge into the stored state; skip if nothing changed
            let state = match states.get_mut(&block_id) {
                Some(existing) => {
                    let before = existing.tainted_vars.len();
                    let sanitized_before = existing.sanitized_vars.len();
                    existing.merge(&incoming);
                    if existing.tainted_vars.len() == before
                        && existing.sanitized_vars.len() == sanitized_before
                        && *visit_count > 1
                    {
                        continue;
                    }
                    existing.clone()
                }
                None => {
                    states.insert(block_id.clone(), incoming.clone());
                    incoming
                }
            };

            let Some(block) = block_by_id.get(block_id.as_str()) else {
                continue;
            };

            let mut out_state = state.clone();
            self.transfer(block, &mut out_state, &mut findings, &mut reported);

            if let Some(next_blocks) = successors.get(block_id.as_str()) {
                for (target, edge_kind) in next_blocks {
                    let mut branch_state = out_state.clone();
                    branch_state.depth += 1;
                    match edge_kind {
                        CfgEdgeKind::True => {
                            if let Some(condition_var) = condition_var(block) {
                                branch_state.path_conditions.push(PathCondition {
                                    var: condition_var,
                                    value: true,
                                });
                            }
                        }
                        CfgEdgeKind::False => {
                            if let Some(condition_var) = condition_var(block) {
                                branch_state.path_conditions.push(PathCondition {
                                    var: condition_var,
                                    value: false,
                                });
                            }
                        }
                        _ => {}
                    }
                    worklist.push_back((target.to_string(), branch_state));
                }
            }
        }

        findings
    }

    /// Per-block transfer: propagate assignments, apply sanitizers,
    /// report tainted sink calls.
    fn transfer(
        &self,
        block: &CfgBlock,
        state: &mut TaintState,
        findings: &mut Vec<TaintFinding>,
        reported: &mut HashSet<(String, String)>,
    ) {
        for statement in &block.statements {
            // Sanitizer call sanitizes every variable it mentions
            if heuristics::is_sanitizer_name(statement) {
                let sanitizer = sanitizer_callee(statement);
                for var in &block.used_vars {
                    if statement.contains(var.as_str()) {
                        state.sanitize(var, &sanitizer);
                    }
                }
                for var in &block.defined_vars {
                    state.sanitize(var, &sanitizer);
                }
                continue;
            }

            // Source call taints the defined variables
            if heuristics::is_source_name(statement) {
                for var in &block.defined_vars {
                    state.tainted_vars.insert(var.clone());
                }
            }

            // Assignment propagation: defined becomes tainted if any used
            // variable mentioned by this statement is tainted
            let uses_tainted = block
                .used_vars
                .iter()
                .any(|var| statement.contains(var.as_str()) && state.is_tainted(var));
            if uses_tainted {
                for var in &block.defined_vars {
                    if statement.contains(var.as_str()) {
                        state.tainted_vars.insert(var.clone());
                    }
                }
            }

            // Sink: a tainted, unguarded variable flows into a sink call.
            // Sanitized-on-all-paths flows still surface, marked sanitized,
            // so consumers can suppress them with the sanitizer named.
            if heuristics::is_sink_name(statement) {
                let mut tainted_snapshot: Vec<String> =
                    state.tainted_vars.iter().cloned().collect();
                tainted_snapshot.sort();
                for var in block.used_vars.iter().chain(tainted_snapshot.iter()) {
                    if !statement.contains(var.as_str()) || !state.tainted_vars.contains(var) {
                        continue;
                    }
                    if self.is_guard_protected(&block.id, var) {
                        continue;
                    }
                    let key = (block.id.clone(), var.clone());
                    if !reported.insert(key) {
                        continue;
                    }
                    let mut finding = TaintFinding::new(
                        var.clone(),
                        statement.clone(),
                        vec![block.id.clone()],
                    );
                    finding.tainted_vars = vec![var.clone()];
                    finding.path_conditions = state
                        .path_conditions
                        .iter()
                        .map(|c| c.to_display())
                        .collect();
                    match state.sanitizer_of(var) {
                        Some(sanitizer) => {
                            finding.is_sanitized = true;
                            finding.sanitizer = Some(sanitizer.to_string());
                            finding.severity = FindingSeverity::Low;
                            finding.confidence = 0.4;
                        }
                        None => {
                            finding.severity = FindingSeverity::High;
                            finding.confidence = 0.85;
                        }
                    }
                    findings.push(finding);
                }
            }
        }
    }

    /// A variable is protected at a block iff a detected guard for it
    /// dominates the block.
    pub fn is_guard_protected(&self, block_id: &str, var: &str) -> bool {
        self.guards.iter().any(|guard| {
            guard.guarded_var == var
                && self.dominator_tree.dominates(&guard.protected_from_id, block_id)
        })
    }
}

/// Callee token of a sanitizer statement (`q = sanitize(q)` -> `sanitize`)
fn sanitizer_callee(statement: &str) -> String {
    statement
        .split(|c: char| !(c.is_alphanumeric() || c == '_' || c == '.'))
        .find(|token| heuristics::is_sanitizer_name(token))
        .unwrap_or("sanitizer")
        .to_string()
}

/// Condition variable of a branching block (first used variable)
fn condition_var(block: &CfgBlock) -> Option<String> {
    if !matches!(block.kind, CfgBlockKind::If | CfgBlockKind::LoopHeader) {
        return None;
    }
    block.used_vars.first().cloned()
}

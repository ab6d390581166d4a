//! Cost analyzer
//!
//! Per function: walk the LoopHeader blocks, extract a symbolic bound per
//! loop by pattern-matching the header's lowered expressions (statement
//! text as the fallback), classify each loop and take the worst-case
//! verdict. Results cache per (snapshot_id, function_fqn); analyzer
//! instances never share cache entries.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::features::cost_analysis::domain::{
    BoundResult, ComplexityClass, CostResult, Hotspot, InferenceMethod, Verdict,
};
use crate::features::cost_analysis::infrastructure::complexity::classify;
use crate::shared::models::{
    CfgBlock, CfgBlockKind, CfgEdgeKind, ExprId, ExprKind, IRDocument, NodeKind, Result,
    StratumError,
};

const MAX_NESTING_BFS_ITERATIONS: usize = 10_000;

pub struct CostAnalyzer {
    cache: Option<HashMap<(String, String), CostResult>>,
}

impl CostAnalyzer {
    pub fn new(enable_cache: bool) -> Self {
        tracing::info!("cost analyzer initialized (cache={})", enable_cache);
        Self {
            cache: if enable_cache { Some(HashMap::new()) } else { None },
        }
    }

    /// Analyze one function by FQN.
    pub fn analyze_function(
        &mut self,
        document: &IRDocument,
        function_fqn: &str,
    ) -> Result<CostResult> {
        let cache_key = (document.snapshot_id.clone(), function_fqn.to_string());
        if let Some(cache) = &self.cache {
            if let Some(result) = cache.get(&cache_key) {
                tracing::debug!("cost cache hit: {}", function_fqn);
                return Ok(result.clone());
            }
        }

        let function = document
            .nodes
            .iter()
            .find(|n| {
                matches!(n.kind, NodeKind::Function | NodeKind::Method | NodeKind::ArrowFunction)
                    && n.fqn == function_fqn
            })
            .ok_or_else(|| StratumError::cost(format!("function not found: {}", function_fqn)))?;

        let blocks: Vec<&CfgBlock> = document
            .cfg_blocks
            .iter()
            .filter(|b| b.function_node_id == function.id)
            .collect();

        let loop_headers: Vec<&CfgBlock> = blocks
            .iter()
            .filter(|b| b.kind == CfgBlockKind::LoopHeader)
            .copied()
            .collect();

        if loop_headers.is_empty() {
            let result = Self::constant_result(function_fqn);
            self.cache_result(cache_key, &result);
            return Ok(result);
        }

        let nesting = self.nesting_levels(&blocks, document, &function.id);

        let mut loop_bounds: Vec<BoundResult> = Vec::new();
        for header in &loop_headers {
            let (bound, verdict, confidence, method) = self.extract_bound(document, header);
            loop_bounds.push(BoundResult {
                bound,
                verdict,
                confidence,
                method,
                block_id: header.id.clone(),
                line: header.span.map(|s| s.start_line).unwrap_or(0),
                nesting_level: nesting.get(header.id.as_str()).copied().unwrap_or(0),
            });
        }

        let (complexity, confidence, cost_term) = classify(&loop_bounds);
        let verdict = loop_bounds
            .iter()
            .fold(Verdict::Proven, |acc, b| acc.worst(b.verdict));
        let explanation = Self::explanation(complexity, verdict, loop_bounds.len());
        let hotspots = loop_bounds
            .iter()
            .filter(|b| b.nesting_level == 0)
            .map(|b| Hotspot {
                line: b.line,
                reason: if loop_bounds.iter().any(|x| x.nesting_level > 0) {
                    "nested loop".to_string()
                } else {
                    "loop".to_string()
                },
            })
            .collect();

        let result = CostResult {
            function_fqn: function_fqn.to_string(),
            complexity,
            verdict,
            confidence,
            explanation,
            cost_term,
            loop_bounds,
            hotspots,
        };
        self.cache_result(cache_key, &result);

        tracing::info!(
            "cost analysis complete: {} -> {} ({})",
            function_fqn,
            result.complexity.as_str(),
            result.verdict.as_str()
        );
        Ok(result)
    }

    /// Bound of a loop header:
    /// - `range(...)` call expression -> recursive extraction of its first
    ///   argument (NameLoad -> var, Literal -> text, len(..) pattern)
    /// - statement text fallback for `for x in collection`
    /// - `while` headers are heuristic
    fn extract_bound(
        &self,
        document: &IRDocument,
        header: &CfgBlock,
    ) -> (String, Verdict, f64, InferenceMethod) {
        let statement = header.statements.first().map(|s| s.as_str()).unwrap_or("");

        // Expression-level extraction: a range(...) call inside the header
        if let Some(span) = header.span {
            let range_call = document.expressions.iter().find(|e| {
                e.is_call_like()
                    && e.span.start_line == span.start_line
                    && e.callee_name()
                        .map(|c| c == "range" || c.ends_with(".range"))
                        .unwrap_or(false)
            });
            if let Some(call) = range_call {
                // The bound comes from the first range argument
                if let Some(&arg_id) = call.arg_expr_ids().first() {
                    if let Some((bound, verdict, confidence)) =
                        self.bound_from_expression(document, arg_id)
                    {
                        return (bound, verdict, confidence, InferenceMethod::Expression);
                    }
                }
            }
        }

        // Text-level fallbacks
        if statement.contains("while") {
            return ("?".to_string(), Verdict::Heuristic, 0.3, InferenceMethod::Heuristic);
        }
        if statement.contains("range(") {
            let bound = Self::range_bound_from_text(statement);
            return (bound, Verdict::Proven, 0.9, InferenceMethod::Pattern);
        }
        if statement.contains(" in ") {
            // Iterating a collection: bounded by its length
            let collection = statement
                .split(" in ")
                .nth(1)
                .unwrap_or("collection")
                .trim_end_matches(':')
                .trim();
            return (
                format!("len({})", collection),
                Verdict::Likely,
                0.75,
                InferenceMethod::Pattern,
            );
        }
        ("?".to_string(), Verdict::Heuristic, 0.3, InferenceMethod::Heuristic)
    }

    /// Recursive bound from an argument expression
    fn bound_from_expression(
        &self,
        document: &IRDocument,
        expr_id: ExprId,
    ) -> Option<(String, Verdict, f64)> {
        let expr = document.expressions.get(expr_id)?;
        match expr.kind {
            ExprKind::NameLoad => expr
                .var_name()
                .map(|name| (name.to_string(), Verdict::Proven, 0.95)),
            ExprKind::Literal => expr
                .literal_value()
                .map(|value| (value.to_string(), Verdict::Proven, 1.0)),
            ExprKind::Call | ExprKind::Instantiate => {
                let callee = expr.callee_name()?;
                if callee == "len" || callee.ends_with(".len") {
                    let args = expr.arg_expr_ids();
                    let inner = args
                        .first()
                        .and_then(|&id| document.expressions.get(id))
                        .and_then(|e| e.var_name().or_else(|| e.literal_value()))
                        .unwrap_or("...");
                    return Some((format!("len({})", inner), Verdict::Likely, 0.8));
                }
                // Nested range or other call: recurse on the first argument
                let args = expr.arg_expr_ids();
                let first = args.first()?;
                self.bound_from_expression(document, *first)
            }
            ExprKind::BinOp => {
                let operator = expr
                    .attrs
                    .get("operator")
                    .and_then(|v| v.as_str())
                    .unwrap_or("+");
                Some((format!("expr({})", operator), Verdict::Likely, 0.6))
            }
            _ => None,
        }
    }

    fn range_bound_from_text(statement: &str) -> String {
        let Some(start) = statement.find("range(") else {
            return "n".to_string();
        };
        let args_start = start + "range(".len();
        let Some(end) = statement[args_start..].find(')') else {
            return "n".to_string();
        };
        let args = &statement[args_start..args_start + end];
        args.split(',')
            .next()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .unwrap_or("n")
            .to_string()
    }

    /// Loop nesting via BFS from entry, counting loop headers on the path
    fn nesting_levels(
        &self,
        blocks: &[&CfgBlock],
        document: &IRDocument,
        function_node_id: &str,
    ) -> HashMap<String, usize> {
        let mut levels = HashMap::new();
        if blocks.is_empty() {
            return levels;
        }

        let mut successors: HashMap<&str, Vec<&str>> = HashMap::new();
        for edge in &document.cfg_edges {
            if edge.kind == CfgEdgeKind::Back {
                continue;
            }
            if blocks.iter().any(|b| b.id == edge.source_block_id) {
                successors
                    .entry(edge.source_block_id.as_str())
                    .or_default()
                    .push(edge.target_block_id.as_str());
            }
        }

        let entry = blocks
            .iter()
            .find(|b| b.kind == CfgBlockKind::Entry)
            .map(|b| b.id.as_str())
            .unwrap_or(blocks[0].id.as_str());

        let loop_ids: HashSet<&str> = blocks
            .iter()
            .filter(|b| b.kind == CfgBlockKind::LoopHeader)
            .map(|b| b.id.as_str())
            .collect();

        let mut visited: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<(&str, usize)> = VecDeque::new();
        queue.push_back((entry, 0));
        let mut iterations = 0usize;

        while let Some((block_id, loops_on_path)) = queue.pop_front() {
            iterations += 1;
            if iterations >= MAX_NESTING_BFS_ITERATIONS {
                tracing::error!("nesting BFS cap hit for {}", function_node_id);
                break;
            }
            if !visited.insert(block_id) {
                continue;
            }

            let next_loops = if loop_ids.contains(block_id) {
                levels.insert(block_id.to_string(), loops_on_path);
                loops_on_path + 1
            } else {
                loops_on_path
            };

            if let Some(succs) = successors.get(block_id) {
                for succ in succs {
                    if !visited.contains(succ) {
                        queue.push_back((succ, next_loops));
                    }
                }
            }
        }

        levels
    }

    fn constant_result(function_fqn: &str) -> CostResult {
        CostResult {
            function_fqn: function_fqn.to_string(),
            complexity: ComplexityClass::Constant,
            verdict: Verdict::Proven,
            confidence: 1.0,
            explanation: "No loops: O(1)".to_string(),
            cost_term: "1".to_string(),
            loop_bounds: Vec::new(),
            hotspots: Vec::new(),
        }
    }

    fn explanation(complexity: ComplexityClass, verdict: Verdict, loop_count: usize) -> String {
        if complexity == ComplexityClass::Constant {
            return "No loops: O(1)".to_string();
        }
        match verdict {
            Verdict::Proven => format!("{}: {} loop(s) proven", complexity.as_str(), loop_count),
            Verdict::Likely => format!("{}: {} loop(s) likely", complexity.as_str(), loop_count),
            Verdict::Heuristic => {
                format!("{} (conservative): unbounded loop(s)", complexity.as_str())
            }
        }
    }

    fn cache_result(&mut self, key: (String, String), result: &CostResult) {
        if let Some(cache) = &mut self.cache {
            cache.insert(key, result.clone());
        }
    }

    pub fn invalidate_cache(&mut self, function_fqn: Option<&str>) -> usize {
        let Some(cache) = &mut self.cache else {
            return 0;
        };
        match function_fqn {
            Some(fqn) => {
                let before = cache.len();
                cache.retain(|(_, cached_fqn), _| cached_fqn != fqn);
                before - cache.len()
            }
            None => {
                let count = cache.len();
                cache.clear();
                count
            }
        }
    }
}

impl Default for CostAnalyzer {
    fn default() -> Self {
        Self::new(true)
    }
}

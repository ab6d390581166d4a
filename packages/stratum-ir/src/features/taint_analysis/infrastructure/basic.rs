//! Basic taint analysis
//!
//! Pure call-graph reachability from source-tagged nodes to sink-tagged
//! nodes. Reports the path and whether a sanitizer sits on it.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::features::taint_analysis::domain::heuristics;
use crate::shared::models::{FindingSeverity, TaintFinding};

/// Adjacency call graph: caller node id -> callee node ids
pub type CallGraph = HashMap<String, Vec<String>>;

pub struct BasicTaintAnalyzer;

impl BasicTaintAnalyzer {
    /// `node_names`: node id -> display name used for source/sink/sanitizer
    /// classification.
    pub fn analyze(call_graph: &CallGraph, node_names: &HashMap<String, String>) -> Vec<TaintFinding> {
        Self::analyze_with_tags(call_graph, node_names, &HashSet::new(), &HashSet::new())
    }

    /// Reachability with rule-tagged source/sink node ids merged into the
    /// name-heuristic classification.
    pub fn analyze_with_tags(
        call_graph: &CallGraph,
        node_names: &HashMap<String, String>,
        tagged_sources: &HashSet<String>,
        tagged_sinks: &HashSet<String>,
    ) -> Vec<TaintFinding> {
        let mut sources: Vec<&String> = node_names
            .iter()
            .filter(|(id, name)| {
                heuristics::is_source_name(name) || tagged_sources.contains(id.as_str())
            })
            .map(|(id, _)| id)
            .collect();
        // Findings come out in source-id order regardless of map layout
        sources.sort();
        let sinks: HashSet<&String> = node_names
            .iter()
            .filter(|(id, name)| {
                heuristics::is_sink_name(name) || tagged_sinks.contains(id.as_str())
            })
            .map(|(id, _)| id)
            .collect();

        if sources.is_empty() || sinks.is_empty() {
            return Vec::new();
        }

        let mut findings = Vec::new();
        for source in sources {
            for (sink, path) in Self::reachable_sinks(call_graph, source, &sinks) {
                let sanitizer = path.iter().find_map(|node_id| {
                    node_names
                        .get(node_id)
                        .filter(|name| heuristics::is_sanitizer_name(name))
                        .cloned()
                });

                let mut finding = TaintFinding::new(
                    node_names.get(source).cloned().unwrap_or_else(|| source.clone()),
                    sink.clone(),
                    path,
                );
                finding.is_sanitized = sanitizer.is_some();
                finding.sanitizer = sanitizer;
                finding.severity = if finding.is_sanitized {
                    FindingSeverity::Low
                } else {
                    FindingSeverity::High
                };
                finding.confidence = if finding.is_sanitized { 0.4 } else { 0.7 };
                findings.push(finding);
            }
        }
        findings
    }

    /// BFS reachability, returning the first path to each sink
    fn reachable_sinks(
        call_graph: &CallGraph,
        source: &str,
        sinks: &HashSet<&String>,
    ) -> Vec<(String, Vec<String>)> {
        let mut results = Vec::new();
        let mut visited: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<(String, Vec<String>)> = VecDeque::new();
        queue.push_back((source.to_string(), vec![source.to_string()]));

        while let Some((current, path)) = queue.pop_front() {
            if !visited.insert(current.clone()) {
                continue;
            }
            if current != source && sinks.iter().any(|s| s.as_str() == current) {
                results.push((current.clone(), path.clone()));
            }
            if let Some(callees) = call_graph.get(&current) {
                for callee in callees {
                    if !visited.contains(callee) {
                        let mut next = path.clone();
                        next.push(callee.clone());
                        queue.push_back((callee.clone(), next));
                    }
                }
            }
        }
        results
    }
}

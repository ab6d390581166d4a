//! Field-sensitive taint analysis
//!
//! Tracks tainted fields within objects. Sources are (variable, field?)
//! pairs: a None field taints the whole object, a Some field taints only
//! accesses of that field.

use std::collections::{HashMap, HashSet};

use crate::features::taint_analysis::domain::heuristics;
use crate::shared::models::{CfgBlock, FindingSeverity, TaintFinding};

/// (variable, optional field) source
pub type FieldSource = (String, Option<String>);

#[derive(Debug, Default)]
struct FieldTaint {
    /// Whole-object taint
    whole: HashSet<String>,
    /// (object, field) taint
    fields: HashSet<(String, String)>,
}

impl FieldTaint {
    fn taint(&mut self, source: &FieldSource) {
        match &source.1 {
            None => {
                self.whole.insert(source.0.clone());
            }
            Some(field) => {
                self.fields.insert((source.0.clone(), field.clone()));
            }
        }
    }

    /// Is `object.field` (or bare `object`) tainted?
    fn is_access_tainted(&self, object: &str, field: Option<&str>) -> bool {
        if self.whole.contains(object) {
            return true;
        }
        match field {
            Some(field) => self.fields.contains(&(object.to_string(), field.to_string())),
            None => false,
        }
    }
}

pub struct FieldSensitiveTaintAnalyzer;

impl FieldSensitiveTaintAnalyzer {
    /// `sinks`: node/block ids whose statements are sink candidates.
    pub fn analyze(
        blocks: &[&CfgBlock],
        sources: &[FieldSource],
        sinks: &HashSet<String>,
    ) -> Vec<TaintFinding> {
        let mut taint = FieldTaint::default();
        for source in sources {
            taint.taint(source);
        }

        let mut findings = Vec::new();

        for block in blocks {
            let is_sink_block = sinks.contains(&block.id);
            for statement in &block.statements {
                // Field assignment propagation: `a.f = b.g` style
                if let Some((left, right)) = statement.split_once('=') {
                    let left_access = parse_access(left);
                    let right_access = parse_access(right);
                    if let (Some(left_access), Some(right_access)) = (left_access, right_access) {
                        if taint
                            .is_access_tainted(&right_access.0, right_access.1.as_deref())
                        {
                            match left_access.1 {
                                Some(field) => {
                                    taint.fields.insert((left_access.0, field));
                                }
                                None => {
                                    taint.whole.insert(left_access.0);
                                }
                            }
                        }
                    }
                }

                // Sink check
                if is_sink_block || heuristics::is_sink_name(statement) {
                    let accesses = collect_accesses(statement);
                    for (object, field) in accesses {
                        if taint.is_access_tainted(&object, field.as_deref()) {
                            let mut finding = TaintFinding::new(
                                match &field {
                                    Some(f) => format!("{}.{}", object, f),
                                    None => object.clone(),
                                },
                                block.id.clone(),
                                vec![block.id.clone()],
                            );
                            finding.severity = FindingSeverity::High;
                            finding.confidence = 0.75;
                            finding.tainted_vars = vec![object.clone()];
                            findings.push(finding);
                        }
                    }
                }
            }
        }

        findings
    }
}

/// `obj.field` -> (obj, Some(field)); `obj` -> (obj, None)
fn parse_access(text: &str) -> Option<(String, Option<String>)> {
    let trimmed = text.trim().trim_end_matches([')', ',']);
    let token: String = trimmed
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == '.')
        .collect();
    if token.is_empty() {
        return None;
    }
    match token.split_once('.') {
        Some((object, field)) if !object.is_empty() && !field.is_empty() => Some((
            object.to_string(),
            Some(field.split('.').next().unwrap_or(field).to_string()),
        )),
        _ => Some((token, None)),
    }
}

/// All dotted/bare accesses mentioned in a statement
fn collect_accesses(statement: &str) -> Vec<(String, Option<String>)> {
    let mut accesses = Vec::new();
    for token in statement.split(|c: char| !(c.is_alphanumeric() || c == '_' || c == '.')) {
        if token.is_empty() || token.chars().next().map(|c| c.is_numeric()).unwrap_or(true) {
            continue;
        }
        if let Some(access) = parse_access(token) {
            if !accesses.contains(&access) {
                accesses.push(access);
            }
        }
    }
    accesses
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::CfgBlockKind;

    fn block(id: &str, statements: &[&str]) -> CfgBlock {
        let mut b = CfgBlock::new(id, CfgBlockKind::Block, "node:f");
        b.statements = statements.iter().map(|s| s.to_string()).collect();
        b
    }

    #[test]
    fn test_field_taint_reaches_sink() {
        let blocks = vec![block("b1", &["cursor.execute(user.name)"])];
        let block_refs: Vec<&CfgBlock> = blocks.iter().collect();
        let sources = vec![("user".to_string(), Some("name".to_string()))];
        let sinks = HashSet::new();

        let findings = FieldSensitiveTaintAnalyzer::analyze(&block_refs, &sources, &sinks);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].source, "user.name");
    }

    #[test]
    fn test_untainted_field_not_reported() {
        let blocks = vec![block("b1", &["cursor.execute(user.id)"])];
        let block_refs: Vec<&CfgBlock> = blocks.iter().collect();
        let sources = vec![("user".to_string(), Some("name".to_string()))];
        let findings =
            FieldSensitiveTaintAnalyzer::analyze(&block_refs, &sources, &HashSet::new());
        assert!(findings.is_empty());
    }

    #[test]
    fn test_whole_object_taint() {
        let blocks = vec![block("b1", &["cursor.execute(payload.body)"])];
        let block_refs: Vec<&CfgBlock> = blocks.iter().collect();
        let sources = vec![("payload".to_string(), None)];
        let findings =
            FieldSensitiveTaintAnalyzer::analyze(&block_refs, &sources, &HashSet::new());
        assert_eq!(findings.len(), 1);
    }

    #[test]
    fn test_field_assignment_propagation() {
        let blocks = vec![block(
            "b1",
            &["copy.value = user.name", "cursor.execute(copy.value)"],
        )];
        let block_refs: Vec<&CfgBlock> = blocks.iter().collect();
        let sources = vec![("user".to_string(), Some("name".to_string()))];
        let findings =
            FieldSensitiveTaintAnalyzer::analyze(&block_refs, &sources, &HashSet::new());
        assert!(!findings.is_empty());
    }
}

//! Taint rule executor
//!
//! Evaluates every compiled rule against an adapted expression stream in a
//! single loop. Matches below the caller-supplied confidence threshold are
//! dropped.

use crate::features::taint_analysis::rules::atoms::{ArgConstraint, CompiledRule, EffectKind};
use crate::features::taint_analysis::rules::entity::ExpressionEntity;
use crate::shared::models::{ExprId, ExpressionArena};

/// A rule match against one expression
#[derive(Debug, Clone)]
pub struct RuleMatch {
    pub rule_id: String,
    pub effect_kind: EffectKind,
    pub expr_id: ExprId,
    pub confidence: f64,
    pub line: u32,
    pub column: u32,
    pub file_path: String,
    pub function_fqn: String,
    /// The matched call / read text
    pub matched_name: String,
}

#[derive(Debug, Default, Clone)]
pub struct ExecutorStats {
    pub entities_scanned: u64,
    pub rules_evaluated: u64,
    pub matches: u64,
}

pub struct TaintRuleExecutor {
    rules: Vec<CompiledRule>,
    stats: ExecutorStats,
}

impl TaintRuleExecutor {
    pub fn new(rules: Vec<CompiledRule>) -> Self {
        Self {
            rules,
            stats: ExecutorStats::default(),
        }
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn stats(&self) -> &ExecutorStats {
        &self.stats
    }

    /// Match every rule against every expression in the arena.
    pub fn execute(&mut self, arena: &ExpressionArena, min_confidence: f64) -> Vec<RuleMatch> {
        let mut matches = Vec::new();

        for expr in arena.iter() {
            self.stats.entities_scanned += 1;
            let entity = ExpressionEntity::new(expr, arena);

            for rule in &self.rules {
                self.stats.rules_evaluated += 1;
                if let Some(matched_name) = match_rule(rule, &entity) {
                    if rule.confidence < min_confidence {
                        continue;
                    }
                    let (line, column) = entity.location();
                    matches.push(RuleMatch {
                        rule_id: rule.id.clone(),
                        effect_kind: rule.effect_kind,
                        expr_id: entity.id(),
                        confidence: rule.confidence,
                        line,
                        column,
                        file_path: entity.file_path().to_string(),
                        function_fqn: entity.function_fqn().to_string(),
                        matched_name,
                    });
                    self.stats.matches += 1;
                }
            }
        }

        matches
    }

    pub fn find_sources(&mut self, arena: &ExpressionArena, min_confidence: f64) -> Vec<RuleMatch> {
        self.execute(arena, min_confidence)
            .into_iter()
            .filter(|m| m.effect_kind == EffectKind::Source)
            .collect()
    }

    pub fn find_sinks(&mut self, arena: &ExpressionArena, min_confidence: f64) -> Vec<RuleMatch> {
        self.execute(arena, min_confidence)
            .into_iter()
            .filter(|m| m.effect_kind == EffectKind::Sink)
            .collect()
    }

    pub fn find_sanitizers(
        &mut self,
        arena: &ExpressionArena,
        min_confidence: f64,
    ) -> Vec<RuleMatch> {
        self.execute(arena, min_confidence)
            .into_iter()
            .filter(|m| m.effect_kind == EffectKind::Sanitizer)
            .collect()
    }
}

/// Evaluate one rule against one entity; returns the matched name.
fn match_rule(rule: &CompiledRule, entity: &ExpressionEntity) -> Option<String> {
    if let Some(kind_filter) = &rule.kind_filter {
        if kind_filter != entity.kind() {
            return None;
        }
    }

    if let Some(base_type_pattern) = &rule.base_type_pattern {
        // Receiver text falls back for untyped receivers
        let base = entity
            .base_type()
            .map(|b| b.to_string())
            .or_else(|| {
                entity
                    .expression()
                    .attrs
                    .get("receiver")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string())
            })?;
        if !base_type_pattern.is_match(&base) {
            return None;
        }
    }

    let mut matched_name = None;

    if let Some(method_pattern) = &rule.method_pattern {
        let method = entity.method_name()?;
        if !method_pattern.is_match(method) {
            return None;
        }
        matched_name = Some(entity.call().unwrap_or(method).to_string());
    }

    if let Some(name_pattern) = &rule.name_pattern {
        let name = entity.read().or_else(|| entity.call())?;
        if !name_pattern.is_match(name) {
            return None;
        }
        matched_name = Some(name.to_string());
    }

    // Argument constraints
    for (&index, constraint) in &rule.arg_constraints {
        let index = index as usize;
        let satisfied = match constraint {
            ArgConstraint::NotConst => !entity.is_constant(index) && entity.get_arg(index).is_some(),
            ArgConstraint::StringLiteral => entity.is_string_literal(index),
            ArgConstraint::AnyValue => entity.get_arg(index).is_some(),
        };
        if !satisfied {
            return None;
        }
    }

    // A rule with no patterns at all only needs the kind filter
    Some(matched_name.unwrap_or_else(|| {
        entity
            .call()
            .or_else(|| entity.read())
            .unwrap_or("")
            .to_string()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::taint_analysis::rules::atoms::{TaintRuleCompiler, DEFAULT_PYTHON_ATOMS};
    use crate::shared::models::attrs::keys;
    use crate::shared::models::{AttrValue, ExprKind, Expression, Span};

    fn execute_arena(arena: &ExpressionArena) -> Vec<RuleMatch> {
        let rules = TaintRuleCompiler::new()
            .compile_str(DEFAULT_PYTHON_ATOMS)
            .unwrap();
        let mut executor = TaintRuleExecutor::new(rules);
        executor.execute(arena, 0.7)
    }

    #[test]
    fn test_sink_match_with_nonconst_arg() {
        let mut arena = ExpressionArena::new();
        arena.push(
            Expression::new(0, ExprKind::NameLoad, Span::zero(), "t.py")
                .with_attr(keys::NAME, AttrValue::from("q")),
        );
        arena.push(
            Expression::new(1, ExprKind::Call, Span::new(3, 0, 3, 20), "t.py")
                .with_attr(keys::CALLEE_NAME, AttrValue::from("cursor.execute"))
                .with_attr(keys::METHOD_NAME, AttrValue::from("execute"))
                .with_attr(keys::ARG_EXPR_IDS, AttrValue::List(vec![AttrValue::Int(0)])),
        );

        let matches = execute_arena(&arena);
        assert!(matches
            .iter()
            .any(|m| m.rule_id == "py.sink.sql_execute" && m.effect_kind == EffectKind::Sink));
    }

    #[test]
    fn test_const_only_arg_fails_not_const() {
        let mut arena = ExpressionArena::new();
        arena.push(
            Expression::new(0, ExprKind::Literal, Span::zero(), "t.py")
                .with_attr(keys::VALUE, AttrValue::from("\"SELECT 1\""))
                .with_attr(keys::VALUE_TYPE, AttrValue::from("str")),
        );
        arena.push(
            Expression::new(1, ExprKind::Call, Span::zero(), "t.py")
                .with_attr(keys::CALLEE_NAME, AttrValue::from("cursor.execute"))
                .with_attr(keys::METHOD_NAME, AttrValue::from("execute"))
                .with_attr(keys::ARG_EXPR_IDS, AttrValue::List(vec![AttrValue::Int(0)])),
        );

        let matches = execute_arena(&arena);
        assert!(!matches.iter().any(|m| m.rule_id == "py.sink.sql_execute"));
    }

    #[test]
    fn test_source_read_match() {
        let mut arena = ExpressionArena::new();
        arena.push(
            Expression::new(0, ExprKind::Attribute, Span::zero(), "t.py")
                .with_attr(keys::NAME, AttrValue::from("request.args"))
                .with_attr(keys::ATTR_NAME, AttrValue::from("args")),
        );
        let matches = execute_arena(&arena);
        assert!(matches
            .iter()
            .any(|m| m.effect_kind == EffectKind::Source && m.matched_name == "request.args"));
    }

    #[test]
    fn test_confidence_threshold_drops_matches() {
        let mut arena = ExpressionArena::new();
        arena.push(
            Expression::new(0, ExprKind::Attribute, Span::zero(), "t.py")
                .with_attr(keys::NAME, AttrValue::from("os.environ")),
        );
        let rules = TaintRuleCompiler::new()
            .compile_str(DEFAULT_PYTHON_ATOMS)
            .unwrap();
        let mut executor = TaintRuleExecutor::new(rules);
        // environ rule has confidence 0.7, threshold 0.8 drops it
        let matches = executor.execute(&arena, 0.8);
        assert!(!matches.iter().any(|m| m.rule_id == "py.source.environ"));
    }
}

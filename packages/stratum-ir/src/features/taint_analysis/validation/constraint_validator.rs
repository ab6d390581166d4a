//! Constraint validation on IR expressions
//!
//! Evaluates `{key: value}` rule constraints against expressions through a
//! closed dispatch table. Unknown keys are an error, never silently true.
//! Path-sensitivity consults the dominator-based guard detector.

use regex::RegexBuilder;
use std::collections::HashMap;

use crate::features::taint_analysis::validation::guard_detector::Guard;
use crate::shared::models::attrs::keys;
use crate::shared::models::{
    AttrAccess, DominatorTree, ExprKind, Expression, Result, StratumError,
};

/// Constraint value
#[derive(Debug, Clone, PartialEq)]
pub enum ConstraintValue {
    Text(String),
    Flag(bool),
}

impl ConstraintValue {
    pub fn text(value: &str) -> Self {
        ConstraintValue::Text(value.to_string())
    }

    fn as_text(&self) -> Option<&str> {
        match self {
            ConstraintValue::Text(s) => Some(s),
            ConstraintValue::Flag(_) => None,
        }
    }

    fn as_flag(&self) -> Option<bool> {
        match self {
            ConstraintValue::Flag(b) => Some(*b),
            ConstraintValue::Text(_) => None,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct ValidationStats {
    pub total_validated: u64,
    pub passed: u64,
    pub failed: u64,
    pub by_key: HashMap<String, u64>,
}

impl ValidationStats {
    pub fn success_rate(&self) -> f64 {
        if self.total_validated == 0 {
            return 0.0;
        }
        self.passed as f64 / self.total_validated as f64
    }
}

/// Constraint validator with dominator-based guard support
#[derive(Debug, Default)]
pub struct ConstraintValidator {
    dominator_tree: Option<DominatorTree>,
    guards: Vec<Guard>,
    stats: ValidationStats,
}

impl ConstraintValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_dominator_tree(&mut self, tree: DominatorTree) {
        self.dominator_tree = Some(tree);
    }

    pub fn set_guards(&mut self, guards: Vec<Guard>) {
        tracing::debug!("guards registered: {}", guards.len());
        self.guards = guards;
    }

    pub fn stats(&self) -> &ValidationStats {
        &self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = ValidationStats::default();
    }

    /// A variable is protected at a sink block iff a detected guard for it
    /// dominates the block.
    pub fn is_guard_protected(&self, sink_block_id: &str, variable: &str) -> bool {
        let Some(tree) = &self.dominator_tree else {
            return false;
        };
        self.guards
            .iter()
            .filter(|guard| guard.guarded_var == variable)
            .any(|guard| guard.is_valid_guard(sink_block_id, tree))
    }

    /// Validate all constraints; all must pass.
    pub fn validate(
        &mut self,
        expr: &Expression,
        constraints: &[(String, ConstraintValue)],
    ) -> Result<bool> {
        if constraints.is_empty() {
            return Ok(true);
        }
        self.stats.total_validated += 1;

        for (key, value) in constraints {
            if !self.validate_constraint(expr, key, value)? {
                self.stats.failed += 1;
                tracing::debug!("constraint failed: {}", key);
                return Ok(false);
            }
        }
        self.stats.passed += 1;
        Ok(true)
    }

    /// Dispatch one constraint. Unknown keys raise an error.
    pub fn validate_constraint(
        &mut self,
        expr: &Expression,
        key: &str,
        value: &ConstraintValue,
    ) -> Result<bool> {
        *self.stats.by_key.entry(key.to_string()).or_insert(0) += 1;

        match key {
            "arg_type" => Ok(self.validate_arg_type(expr, value)?),
            "return_type" => Ok(self.validate_return_type(expr, value)),
            "arg_source" | "value_source" => Ok(self.validate_value_source(expr, value)),
            "flow_sensitivity" => {
                // Advisory: full def-use flow checks live in the DFG layer
                if value.as_flag() == Some(true) {
                    tracing::debug!("flow_sensitivity requested (advisory)");
                }
                Ok(true)
            }
            "path_sensitivity" => Ok(self.validate_path_sensitivity(expr, value)),
            "context_sensitive" => {
                if value.as_flag() == Some(true) {
                    tracing::debug!("context_sensitive requested (advisory)");
                }
                Ok(true)
            }
            "scope" => Ok(self.validate_scope(expr, value)),
            "value_pattern" => Ok(self.validate_value_pattern(expr, value)),
            "name_pattern" => Ok(self.validate_name_pattern(expr, value)),
            unknown => Err(StratumError::validation(format!(
                "unknown constraint key: {}",
                unknown
            ))),
        }
    }

    // ------------------------------------------------------------------
    // Type constraints
    // ------------------------------------------------------------------

    fn validate_arg_type(&self, expr: &Expression, value: &ConstraintValue) -> Result<bool> {
        let Some(value) = value.as_text() else {
            return Ok(false);
        };
        let result = match value {
            "not_const" => !is_constant(expr),
            "string" => type_text(expr)
                .map(|t| t.contains("str") || t.contains("string"))
                .unwrap_or(false),
            "numeric" => type_text(expr)
                .map(|t| ["int", "float", "number", "decimal"].iter().any(|k| t.contains(k)))
                .unwrap_or(false),
            "collection" => type_text(expr)
                .map(|t| {
                    ["list", "dict", "set", "tuple", "array"].iter().any(|k| t.contains(k))
                })
                .unwrap_or(false),
            "callable" => type_text(expr)
                .map(|t| ["function", "callable", "method", "lambda"].iter().any(|k| t.contains(k)))
                .unwrap_or(false),
            other => {
                return Err(StratumError::validation(format!(
                    "unknown arg_type value: {}",
                    other
                )))
            }
        };
        Ok(result)
    }

    fn validate_return_type(&self, expr: &Expression, value: &ConstraintValue) -> bool {
        let Some(expected) = value.as_text() else {
            return false;
        };
        expr.inferred_type
            .as_deref()
            .map(|inferred| inferred == expected || inferred.contains(expected))
            .unwrap_or(false)
    }

    // ------------------------------------------------------------------
    // Source constraints
    // ------------------------------------------------------------------

    fn validate_value_source(&self, expr: &Expression, value: &ConstraintValue) -> bool {
        let Some(value) = value.as_text() else {
            return false;
        };
        match value {
            "external" => {
                let name = expr.attrs.get_str(keys::NAME).unwrap_or("");
                ["request", "input", "user", "stdin"]
                    .iter()
                    .any(|marker| name.to_ascii_lowercase().contains(marker))
            }
            "internal" => !self.validate_value_source(expr, &ConstraintValue::text("external")),
            "parameter" => expr.attrs.get_bool(keys::FROM_PARAMETER).unwrap_or(false),
            "global" => expr.attrs.get_bool(keys::IS_GLOBAL).unwrap_or(false),
            _ => false,
        }
    }

    // ------------------------------------------------------------------
    // Flow constraints
    // ------------------------------------------------------------------

    fn validate_path_sensitivity(&self, expr: &Expression, value: &ConstraintValue) -> bool {
        if value.as_flag() != Some(true) {
            return true;
        }
        // Guard-protected variables satisfy the path condition outright
        if self.dominator_tree.is_some() && !self.guards.is_empty() {
            let block_id = expr.block_id.as_deref().unwrap_or("");
            let variable = expr.attrs.get_str(keys::NAME).unwrap_or("");
            if !block_id.is_empty()
                && !variable.is_empty()
                && self.is_guard_protected(block_id, variable)
            {
                tracing::debug!("path_sensitivity: {} guard-protected", variable);
                return true;
            }
        }
        // No guard info: the constraint is advisory, assume satisfied
        true
    }

    // ------------------------------------------------------------------
    // Context constraints
    // ------------------------------------------------------------------

    fn validate_scope(&self, expr: &Expression, value: &ConstraintValue) -> bool {
        let Some(expected) = value.as_text() else {
            return false;
        };
        expr.attrs
            .get_str(keys::SCOPE)
            .map(|scope| scope == expected)
            .unwrap_or(false)
    }

    // ------------------------------------------------------------------
    // Pattern constraints (case-insensitive regex)
    // ------------------------------------------------------------------

    fn validate_value_pattern(&self, expr: &Expression, value: &ConstraintValue) -> bool {
        let Some(pattern) = value.as_text() else {
            return false;
        };
        let Ok(regex) = RegexBuilder::new(pattern).case_insensitive(true).build() else {
            return false;
        };
        if let Some(constant) = expr.attrs.get_str(keys::VALUE) {
            if regex.is_match(constant) {
                return true;
            }
        }
        expr.attrs
            .get_str(keys::NAME)
            .map(|name| regex.is_match(name))
            .unwrap_or(false)
    }

    fn validate_name_pattern(&self, expr: &Expression, value: &ConstraintValue) -> bool {
        let Some(pattern) = value.as_text() else {
            return false;
        };
        let Ok(regex) = RegexBuilder::new(pattern).case_insensitive(true).build() else {
            return false;
        };
        expr.attrs
            .get_str(keys::NAME)
            .or_else(|| expr.attrs.get_str(keys::CALLEE_NAME))
            .map(|name| regex.is_match(name))
            .unwrap_or(false)
    }
}

fn is_constant(expr: &Expression) -> bool {
    if expr.kind == ExprKind::Literal {
        return true;
    }
    expr.attrs.get(keys::VALUE).is_some()
}

fn type_text(expr: &Expression) -> Option<String> {
    expr.inferred_type
        .clone()
        .or_else(|| expr.attrs.get_str(keys::VALUE_TYPE).map(|s| s.to_string()))
        .map(|t| t.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::{AttrValue, Span};

    fn name_expr(name: &str) -> Expression {
        Expression::new(0, ExprKind::NameLoad, Span::zero(), "t.py")
            .with_attr(keys::NAME, AttrValue::from(name))
    }

    #[test]
    fn test_not_const_passes_for_name() {
        let mut validator = ConstraintValidator::new();
        let expr = name_expr("q");
        let passed = validator
            .validate(&expr, &[("arg_type".into(), ConstraintValue::text("not_const"))])
            .unwrap();
        assert!(passed);
    }

    #[test]
    fn test_not_const_fails_for_literal() {
        let mut validator = ConstraintValidator::new();
        let expr = Expression::new(0, ExprKind::Literal, Span::zero(), "t.py")
            .with_attr(keys::VALUE, AttrValue::from("42"));
        let passed = validator
            .validate(&expr, &[("arg_type".into(), ConstraintValue::text("not_const"))])
            .unwrap();
        assert!(!passed);
    }

    #[test]
    fn test_unknown_key_errors() {
        let mut validator = ConstraintValidator::new();
        let expr = name_expr("x");
        let result = validator.validate(
            &expr,
            &[("bogus_key".into(), ConstraintValue::Flag(true))],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_external_source_heuristic() {
        let mut validator = ConstraintValidator::new();
        let expr = name_expr("request.args");
        assert!(validator
            .validate(&expr, &[("arg_source".into(), ConstraintValue::text("external"))])
            .unwrap());

        let expr = name_expr("config_value");
        assert!(!validator
            .validate(&expr, &[("arg_source".into(), ConstraintValue::text("external"))])
            .unwrap());
    }

    #[test]
    fn test_name_pattern_case_insensitive() {
        let mut validator = ConstraintValidator::new();
        let expr = name_expr("UserQuery");
        assert!(validator
            .validate(
                &expr,
                &[("name_pattern".into(), ConstraintValue::text(".*query.*"))]
            )
            .unwrap());
    }

    #[test]
    fn test_scope_constraint() {
        let mut validator = ConstraintValidator::new();
        let expr = Expression::new(0, ExprKind::NameLoad, Span::zero(), "t.py")
            .with_attr(keys::SCOPE, AttrValue::from("parameter"));
        assert!(validator
            .validate(&expr, &[("scope".into(), ConstraintValue::text("parameter"))])
            .unwrap());
        assert!(!validator
            .validate(&expr, &[("scope".into(), ConstraintValue::text("global"))])
            .unwrap());
    }

    #[test]
    fn test_stats_accumulate() {
        let mut validator = ConstraintValidator::new();
        let expr = name_expr("q");
        let constraints = vec![("arg_type".to_string(), ConstraintValue::text("not_const"))];
        validator.validate(&expr, &constraints).unwrap();
        validator.validate(&expr, &constraints).unwrap();

        let stats = validator.stats();
        assert_eq!(stats.total_validated, 2);
        assert_eq!(stats.passed, 2);
        assert_eq!(stats.by_key.get("arg_type"), Some(&2));
        assert!((stats.success_rate() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_guard_protection() {
        let mut validator = ConstraintValidator::new();
        let mut tree = DominatorTree::new("entry");
        tree.idom.insert("guard".into(), "entry".into());
        tree.idom.insert("use".into(), "guard".into());
        validator.set_dominator_tree(tree);
        validator.set_guards(vec![Guard {
            guarded_var: "x".into(),
            guard_block_id: "guard".into(),
            protected_from_id: "guard".into(),
            condition: "x is None".into(),
        }]);

        assert!(validator.is_guard_protected("use", "x"));
        assert!(!validator.is_guard_protected("use", "y"));
    }
}

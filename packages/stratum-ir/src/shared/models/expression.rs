//! Expression IR - lowered representation of evaluable sub-trees
//!
//! Expressions live in a flat arena for cache locality. The arena exposes
//! insertion-order iteration and an id map for O(1) resolution of argument
//! references (`arg_expr_ids`).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::attrs::{keys, AttrAccess, AttrMap, AttrValue};
use super::span::Span;

/// Expression id, unique within a document
pub type ExprId = u64;

/// Expression kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExprKind {
    Literal,
    NameLoad,
    Attribute,
    Subscript,
    Call,
    Instantiate,
    BinOp,
    UnaryOp,
    Compare,
    BoolOp,
    Assign,
    Collection,
    Lambda,
    Comprehension,
}

impl ExprKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExprKind::Literal => "Literal",
            ExprKind::NameLoad => "NameLoad",
            ExprKind::Attribute => "Attribute",
            ExprKind::Subscript => "Subscript",
            ExprKind::Call => "Call",
            ExprKind::Instantiate => "Instantiate",
            ExprKind::BinOp => "BinOp",
            ExprKind::UnaryOp => "UnaryOp",
            ExprKind::Compare => "Compare",
            ExprKind::BoolOp => "BoolOp",
            ExprKind::Assign => "Assign",
            ExprKind::Collection => "Collection",
            ExprKind::Lambda => "Lambda",
            ExprKind::Comprehension => "Comprehension",
        }
    }
}

/// Lowered expression
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expression {
    pub id: ExprId,
    pub kind: ExprKind,
    /// Owning function FQN (empty for module-level expressions)
    pub function_fqn: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_id: Option<String>,
    pub span: Span,
    pub file_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inferred_type: Option<String>,
    /// callee_name, arg_expr_ids, call_kwargs, operator, value, var_name, ...
    #[serde(default, skip_serializing_if = "AttrMap::is_empty")]
    pub attrs: AttrMap,
}

impl Expression {
    pub fn new(id: ExprId, kind: ExprKind, span: Span, file_path: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            function_fqn: String::new(),
            block_id: None,
            span,
            file_path: file_path.into(),
            inferred_type: None,
            attrs: AttrMap::new(),
        }
    }

    pub fn in_function(mut self, fqn: impl Into<String>) -> Self {
        self.function_fqn = fqn.into();
        self
    }

    pub fn in_block(mut self, block_id: impl Into<String>) -> Self {
        self.block_id = Some(block_id.into());
        self
    }

    pub fn with_attr(mut self, key: &str, value: AttrValue) -> Self {
        self.attrs.insert(key.to_string(), value);
        self
    }

    pub fn callee_name(&self) -> Option<&str> {
        self.attrs.get_str(keys::CALLEE_NAME)
    }

    /// Ordered argument expression ids, literals included
    pub fn arg_expr_ids(&self) -> Vec<ExprId> {
        self.attrs
            .get_list(keys::ARG_EXPR_IDS)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_int().map(|i| i as ExprId))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn literal_value(&self) -> Option<&str> {
        self.attrs.get_str(keys::VALUE)
    }

    pub fn var_name(&self) -> Option<&str> {
        self.attrs.get_str(keys::VAR_NAME)
    }

    pub fn is_call_like(&self) -> bool {
        matches!(self.kind, ExprKind::Call | ExprKind::Instantiate)
    }
}

/// Flat expression arena with O(1) id lookup
///
/// Insertion order is the logical order; ids are assigned densely by the
/// arena unless the caller provides them. The id index rebuilds on
/// deserialization.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExpressionArena {
    expressions: Vec<Expression>,
    #[serde(skip)]
    id_index: HashMap<ExprId, usize>,
}

impl<'de> Deserialize<'de> for ExpressionArena {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            expressions: Vec<Expression>,
        }
        let raw = Raw::deserialize(deserializer)?;
        let mut arena = ExpressionArena {
            expressions: raw.expressions,
            id_index: HashMap::new(),
        };
        arena.rebuild_index();
        Ok(arena)
    }
}

impl ExpressionArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next expression id
    pub fn next_id(&self) -> ExprId {
        self.expressions.len() as ExprId
    }

    pub fn push(&mut self, expr: Expression) -> ExprId {
        let id = expr.id;
        self.id_index.insert(id, self.expressions.len());
        self.expressions.push(expr);
        id
    }

    pub fn get(&self, id: ExprId) -> Option<&Expression> {
        self.id_index
            .get(&id)
            .and_then(|&idx| self.expressions.get(idx))
    }

    pub fn get_mut(&mut self, id: ExprId) -> Option<&mut Expression> {
        let idx = *self.id_index.get(&id)?;
        self.expressions.get_mut(idx)
    }

    /// Insertion-order iteration
    pub fn iter(&self) -> impl Iterator<Item = &Expression> {
        self.expressions.iter()
    }

    pub fn len(&self) -> usize {
        self.expressions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expressions.is_empty()
    }

    /// Rebuild the id index after deserialization
    pub fn rebuild_index(&mut self) {
        self.id_index = self
            .expressions
            .iter()
            .enumerate()
            .map(|(idx, e)| (e.id, idx))
            .collect();
    }

    /// Absorb another arena, offsetting its ids past this arena's so the
    /// merged id space stays dense and collision-free. Intra-expression
    /// id references (`arg_expr_ids`, `value_expr_id`) are remapped.
    pub fn extend(&mut self, other: ExpressionArena) {
        let offset = self.expressions.len() as ExprId;
        for mut expr in other.expressions {
            expr.id += offset;
            if let Some(AttrValue::List(ids)) = expr.attrs.get_mut(keys::ARG_EXPR_IDS) {
                for id in ids.iter_mut() {
                    if let AttrValue::Int(value) = id {
                        *value += offset as i64;
                    }
                }
            }
            if let Some(AttrValue::Int(value)) = expr.attrs.get_mut("value_expr_id") {
                *value += offset as i64;
            }
            self.push(expr);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arena_order_and_lookup() {
        let mut arena = ExpressionArena::new();
        let a = arena.push(Expression::new(0, ExprKind::NameLoad, Span::zero(), "t.py"));
        let b = arena.push(Expression::new(1, ExprKind::Call, Span::zero(), "t.py"));

        let ids: Vec<ExprId> = arena.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![a, b]);
        assert_eq!(arena.get(b).unwrap().kind, ExprKind::Call);
        assert!(arena.get(99).is_none());
    }

    #[test]
    fn test_arg_expr_ids_roundtrip() {
        let expr = Expression::new(5, ExprKind::Call, Span::zero(), "t.py").with_attr(
            keys::ARG_EXPR_IDS,
            AttrValue::List(vec![AttrValue::Int(1), AttrValue::Int(3)]),
        );
        assert_eq!(expr.arg_expr_ids(), vec![1, 3]);
    }

    #[test]
    fn test_id_index_survives_deserialize() {
        let mut arena = ExpressionArena::new();
        arena.push(Expression::new(0, ExprKind::Literal, Span::zero(), "t.py"));
        let json = serde_json::to_string(&arena).unwrap();
        let restored: ExpressionArena = serde_json::from_str(&json).unwrap();
        assert!(restored.get(0).is_some());
    }
}

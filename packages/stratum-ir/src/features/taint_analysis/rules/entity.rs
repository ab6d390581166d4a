//! Expression -> rule entity adapter
//!
//! Compiled rules see the entity protocol, not raw expressions: kind tag,
//! base type, call name, qualified call, read attribute, positional args
//! and kwargs resolved from `arg_expr_ids` preserving ordering, so literal
//! and non-literal arguments stay index-aligned.

use crate::shared::models::attrs::keys;
use crate::shared::models::{AttrAccess, ExprKind, Expression, ExpressionArena};

pub struct ExpressionEntity<'a> {
    expr: &'a Expression,
    arena: &'a ExpressionArena,
}

impl<'a> ExpressionEntity<'a> {
    pub fn new(expr: &'a Expression, arena: &'a ExpressionArena) -> Self {
        Self { expr, arena }
    }

    pub fn id(&self) -> u64 {
        self.expr.id
    }

    /// Entity kind tag
    pub fn kind(&self) -> &'static str {
        match self.expr.kind {
            ExprKind::Call | ExprKind::Instantiate => "call",
            ExprKind::Attribute | ExprKind::NameLoad => "read",
            ExprKind::Subscript => "subscript",
            ExprKind::Assign => "assign",
            ExprKind::Literal => "literal",
            ExprKind::BinOp => "binop",
            ExprKind::UnaryOp => "unaryop",
            ExprKind::Compare => "compare",
            ExprKind::BoolOp => "boolop",
            ExprKind::Collection => "collection",
            ExprKind::Lambda => "lambda",
            ExprKind::Comprehension => "comprehension",
        }
    }

    /// Receiver base type: resolved receiver type when available, else the
    /// conservative inferred type.
    pub fn base_type(&self) -> Option<&str> {
        self.expr
            .attrs
            .get_str(keys::RECEIVER_TYPE)
            .or(self.expr.inferred_type.as_deref())
    }

    /// Called method/function name
    pub fn call(&self) -> Option<&str> {
        if !self.expr.is_call_like() {
            return None;
        }
        self.expr.attrs.get_str(keys::CALLEE_NAME)
    }

    /// `base_type.method` when they compose cleanly; an already-dotted
    /// callee is never qualified twice.
    pub fn qualified_call(&self) -> Option<String> {
        let call = self.call()?;

        if let (Some(base_type), Some(method)) =
            (self.base_type(), self.expr.attrs.get_str(keys::METHOD_NAME))
        {
            return Some(format!("{}.{}", base_type, method));
        }
        if call.contains('.') {
            return Some(call.to_string());
        }
        match self.base_type() {
            Some(base_type) => Some(format!("{}.{}", base_type, call)),
            None => Some(call.to_string()),
        }
    }

    /// Bare method name for method calls
    pub fn method_name(&self) -> Option<&str> {
        self.expr.attrs.get_str(keys::METHOD_NAME).or_else(|| {
            self.call()
                .map(|c| c.rsplit('.').next().unwrap_or(c))
        })
    }

    /// Attribute name for ATTRIBUTE reads; plain name for NameLoad
    pub fn read(&self) -> Option<&str> {
        match self.expr.kind {
            ExprKind::Attribute => self
                .expr
                .attrs
                .get_str(keys::NAME)
                .or_else(|| self.expr.attrs.get_str(keys::ATTR_NAME)),
            ExprKind::NameLoad => self.expr.attrs.get_str(keys::NAME),
            _ => None,
        }
    }

    /// Positional argument expressions, index-aligned with the source
    pub fn args(&self) -> Vec<&Expression> {
        self.expr
            .arg_expr_ids()
            .into_iter()
            .filter_map(|id| self.arena.get(id))
            .collect()
    }

    pub fn get_arg(&self, index: usize) -> Option<&Expression> {
        let ids = self.expr.arg_expr_ids();
        ids.get(index).and_then(|&id| self.arena.get(id))
    }

    pub fn kwargs(&self) -> Vec<(String, String)> {
        self.expr
            .attrs
            .get_map(keys::CALL_KWARGS)
            .map(|map| {
                map.iter()
                    .filter_map(|(key, value)| {
                        value.as_str().map(|v| (key.clone(), v.to_string()))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Is argument `index` a constant?
    pub fn is_constant(&self, index: usize) -> bool {
        self.get_arg(index)
            .map(|arg| arg.kind == ExprKind::Literal)
            .unwrap_or(false)
    }

    /// Is argument `index` a string literal?
    pub fn is_string_literal(&self, index: usize) -> bool {
        self.get_arg(index)
            .map(|arg| {
                arg.kind == ExprKind::Literal
                    && arg.attrs.get_str(keys::VALUE_TYPE) == Some("str")
            })
            .unwrap_or(false)
    }

    pub fn location(&self) -> (u32, u32) {
        (self.expr.span.start_line, self.expr.span.start_col)
    }

    pub fn file_path(&self) -> &str {
        &self.expr.file_path
    }

    pub fn function_fqn(&self) -> &str {
        &self.expr.function_fqn
    }

    pub fn expression(&self) -> &Expression {
        self.expr
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::{AttrValue, Span};

    fn arena_with_call() -> ExpressionArena {
        let mut arena = ExpressionArena::new();
        let literal = Expression::new(0, ExprKind::Literal, Span::zero(), "t.py")
            .with_attr(keys::VALUE, AttrValue::from("\"SELECT 1\""))
            .with_attr(keys::VALUE_TYPE, AttrValue::from("str"));
        arena.push(literal);
        let name = Expression::new(1, ExprKind::NameLoad, Span::zero(), "t.py")
            .with_attr(keys::NAME, AttrValue::from("q"));
        arena.push(name);
        let call = Expression::new(2, ExprKind::Call, Span::new(5, 4, 5, 30), "t.py")
            .with_attr(keys::CALLEE_NAME, AttrValue::from("cursor.execute"))
            .with_attr(keys::METHOD_NAME, AttrValue::from("execute"))
            .with_attr(keys::RECEIVER_TYPE, AttrValue::from("Cursor"))
            .with_attr(
                keys::ARG_EXPR_IDS,
                AttrValue::List(vec![AttrValue::Int(0), AttrValue::Int(1)]),
            );
        arena.push(call);
        arena
    }

    #[test]
    fn test_call_entity_protocol() {
        let arena = arena_with_call();
        let call = arena.get(2).unwrap();
        let entity = ExpressionEntity::new(call, &arena);

        assert_eq!(entity.kind(), "call");
        assert_eq!(entity.call(), Some("cursor.execute"));
        assert_eq!(entity.method_name(), Some("execute"));
        assert_eq!(entity.qualified_call().as_deref(), Some("Cursor.execute"));
        assert_eq!(entity.args().len(), 2);
        assert!(entity.is_constant(0));
        assert!(entity.is_string_literal(0));
        assert!(!entity.is_constant(1));
        assert_eq!(entity.location(), (5, 4));
    }

    #[test]
    fn test_dotted_callee_not_doubly_qualified() {
        let mut arena = ExpressionArena::new();
        let call = Expression::new(0, ExprKind::Call, Span::zero(), "t.py")
            .with_attr(keys::CALLEE_NAME, AttrValue::from("cursor.execute"));
        arena.push(call);

        let entity = ExpressionEntity::new(arena.get(0).unwrap(), &arena);
        // No base type and no method name: the dotted callee stays as-is
        assert_eq!(entity.qualified_call().as_deref(), Some("cursor.execute"));
    }

    #[test]
    fn test_read_entity() {
        let mut arena = ExpressionArena::new();
        let attr = Expression::new(0, ExprKind::Attribute, Span::zero(), "t.py")
            .with_attr(keys::NAME, AttrValue::from("request.args"))
            .with_attr(keys::ATTR_NAME, AttrValue::from("args"));
        arena.push(attr);

        let entity = ExpressionEntity::new(arena.get(0).unwrap(), &arena);
        assert_eq!(entity.kind(), "read");
        assert_eq!(entity.read(), Some("request.args"));
        assert!(entity.call().is_none());
    }
}

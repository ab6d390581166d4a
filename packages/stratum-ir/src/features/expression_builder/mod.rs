//! C3: Expression lowering
//!
//! Lowers evaluable sub-trees (returns, calls, assignments, attribute
//! accesses, collection literals) into the document expression arena.
//! Call arguments preserve source order including literal arguments
//! (`arg_expr_ids`); without that, constant propagation and rule argument
//! constraints break.

use std::collections::BTreeMap;

use crate::features::parsing::domain::{ParsedTree, SyntaxKind, SyntaxNode};
use crate::shared::models::attrs::keys;
use crate::shared::models::{
    AttrValue, CfgBlock, ExprId, ExprKind, Expression, IRDocument, NodeKind, Span,
};

pub struct ExpressionLowering<'a> {
    document: &'a mut IRDocument,
    function_fqn: String,
    function_node_id: String,
}

/// Lower expressions for every function in the document.
pub fn lower_expressions(document: &mut IRDocument, tree: &ParsedTree) {
    let functions: Vec<(String, String, Span)> = document
        .nodes
        .iter()
        .filter(|n| n.kind.is_callable() || n.kind == NodeKind::Method)
        .filter_map(|n| n.body_span.map(|span| (n.id.clone(), n.fqn.clone(), span)))
        .collect();

    let mut bodies: Vec<(String, String, SyntaxNode)> = Vec::new();
    tree.root.walk(&mut |syntax| {
        if matches!(
            syntax.kind,
            SyntaxKind::FunctionDef | SyntaxKind::MethodDef | SyntaxKind::ArrowFunctionDef
        ) {
            if let Some(body) = syntax.child_by_field("body") {
                if let Some((id, fqn, _)) = functions.iter().find(|(_, _, span)| *span == body.span)
                {
                    bodies.push((id.clone(), fqn.clone(), body.clone()));
                }
            }
        }
    });

    for (node_id, fqn, body) in bodies {
        let mut lowering = ExpressionLowering {
            document,
            function_fqn: fqn,
            function_node_id: node_id,
        };
        lowering.lower_body(&body);
    }
    document.invalidate_indexes();
}

impl<'a> ExpressionLowering<'a> {
    fn lower_body(&mut self, body: &SyntaxNode) {
        for child in &body.children {
            self.lower_statement(child);
        }
    }

    fn lower_statement(&mut self, node: &SyntaxNode) {
        match &node.kind {
            SyntaxKind::AssignmentStmt => {
                self.lower_assignment(node);
            }
            SyntaxKind::ReturnStmt | SyntaxKind::RaiseStmt => {
                for child in &node.children {
                    self.lower_expr(child);
                }
            }
            // Nested function bodies get their own lowering pass
            SyntaxKind::FunctionDef | SyntaxKind::ClassDef | SyntaxKind::DecoratedDef => {}
            _ => {
                // Expression statements and control-flow bodies
                if node.kind == SyntaxKind::CallExpr
                    || node.kind == SyntaxKind::AttributeExpr
                    || node.kind == SyntaxKind::CollectionExpr
                {
                    self.lower_expr(node);
                } else {
                    for child in &node.children {
                        self.lower_statement(child);
                    }
                }
            }
        }
    }

    fn lower_assignment(&mut self, node: &SyntaxNode) {
        let value_id = node.child_by_field("right").and_then(|right| self.lower_expr(right));

        let var_name = node
            .child_by_field("left")
            .filter(|left| left.kind == SyntaxKind::NameExpr)
            .map(|left| left.text.trim().to_string());

        let id = self.next_id();
        let mut expr = Expression::new(id, ExprKind::Assign, node.span, self.file_path())
            .in_function(self.function_fqn.clone());
        if let Some(var_name) = var_name {
            expr = expr.with_attr(keys::VAR_NAME, AttrValue::from(var_name));
        }
        if let Some(value_id) = value_id {
            expr = expr.with_attr("value_expr_id", AttrValue::Int(value_id as i64));
        }
        self.push(expr);
    }

    /// Lower an expression subtree, returning its arena id
    fn lower_expr(&mut self, node: &SyntaxNode) -> Option<ExprId> {
        match &node.kind {
            SyntaxKind::CallExpr => self.lower_call(node),
            SyntaxKind::NameExpr => {
                let id = self.next_id();
                let expr = Expression::new(id, ExprKind::NameLoad, node.span, self.file_path())
                    .in_function(self.function_fqn.clone())
                    .with_attr(keys::VAR_NAME, AttrValue::from(node.text.trim()))
                    .with_attr(keys::NAME, AttrValue::from(node.text.trim()));
                Some(self.push(expr))
            }
            SyntaxKind::AttributeExpr => {
                let base = node.child_by_field("object").map(|n| n.text.trim().to_string());
                let attribute = node
                    .child_by_field("attribute")
                    .or_else(|| node.child_by_field("property"))
                    .map(|n| n.text.trim().to_string());
                let id = self.next_id();
                let mut expr = Expression::new(id, ExprKind::Attribute, node.span, self.file_path())
                    .in_function(self.function_fqn.clone())
                    .with_attr(keys::NAME, AttrValue::from(node.text.trim()));
                if let Some(attribute) = attribute {
                    expr = expr.with_attr(keys::ATTR_NAME, AttrValue::from(attribute));
                }
                if let Some(base) = base {
                    expr = expr.with_attr("base", AttrValue::from(base));
                }
                Some(self.push(expr))
            }
            SyntaxKind::SubscriptExpr => {
                for child in &node.children {
                    self.lower_expr(child);
                }
                let id = self.next_id();
                let expr = Expression::new(id, ExprKind::Subscript, node.span, self.file_path())
                    .in_function(self.function_fqn.clone())
                    .with_attr(keys::NAME, AttrValue::from(node.text.trim()));
                Some(self.push(expr))
            }
            SyntaxKind::LiteralExpr => {
                let id = self.next_id();
                let expr = Expression::new(id, ExprKind::Literal, node.span, self.file_path())
                    .in_function(self.function_fqn.clone())
                    .with_attr(keys::VALUE, AttrValue::from(node.text.trim()))
                    .with_attr(
                        keys::VALUE_TYPE,
                        AttrValue::from(literal_type(&node.raw_kind)),
                    );
                Some(self.push(expr))
            }
            SyntaxKind::CollectionExpr => {
                for child in &node.children {
                    self.lower_expr(child);
                }
                let id = self.next_id();
                let expr = Expression::new(id, ExprKind::Collection, node.span, self.file_path())
                    .in_function(self.function_fqn.clone());
                Some(self.push(expr))
            }
            SyntaxKind::BinaryExpr => self.lower_operator(node, ExprKind::BinOp),
            SyntaxKind::CompareExpr => self.lower_operator(node, ExprKind::Compare),
            SyntaxKind::BooleanExpr => self.lower_operator(node, ExprKind::BoolOp),
            SyntaxKind::UnaryExpr => self.lower_operator(node, ExprKind::UnaryOp),
            SyntaxKind::LambdaDef => {
                let id = self.next_id();
                let expr = Expression::new(id, ExprKind::Lambda, node.span, self.file_path())
                    .in_function(self.function_fqn.clone());
                Some(self.push(expr))
            }
            SyntaxKind::ComprehensionExpr => {
                for child in &node.children {
                    self.lower_expr(child);
                }
                let id = self.next_id();
                let expr = Expression::new(id, ExprKind::Comprehension, node.span, self.file_path())
                    .in_function(self.function_fqn.clone());
                Some(self.push(expr))
            }
            SyntaxKind::AssignmentStmt => {
                self.lower_assignment(node);
                None
            }
            _ => {
                let mut last = None;
                for child in &node.children {
                    if let Some(id) = self.lower_expr(child) {
                        last = Some(id);
                    }
                }
                last
            }
        }
    }

    fn lower_call(&mut self, node: &SyntaxNode) -> Option<ExprId> {
        let function = node.child_by_field("function")?;
        let callee_name = function.text.trim().to_string();

        // Arguments first, so arg_expr_ids resolve in the arena
        let mut arg_ids: Vec<AttrValue> = Vec::new();
        let mut kwargs: BTreeMap<String, AttrValue> = BTreeMap::new();
        if let Some(arguments) = node.find_child(&SyntaxKind::ArgumentList) {
            for argument in &arguments.children {
                if argument.kind == SyntaxKind::KeywordArgument {
                    let name = argument
                        .child_by_field("name")
                        .map(|n| n.text.trim().to_string())
                        .unwrap_or_default();
                    let value_text = argument
                        .child_by_field("value")
                        .map(|n| n.text.trim().to_string())
                        .unwrap_or_default();
                    if !name.is_empty() {
                        kwargs.insert(name, AttrValue::from(value_text));
                    }
                    if let Some(value) = argument.child_by_field("value") {
                        self.lower_expr(value);
                    }
                    continue;
                }
                if matches!(
                    argument.raw_kind.as_str(),
                    "(" | ")" | "," | "comment"
                ) {
                    continue;
                }
                if let Some(arg_id) = self.lower_expr(argument) {
                    arg_ids.push(AttrValue::Int(arg_id as i64));
                }
            }
        }

        let is_instantiation = callee_name
            .chars()
            .next()
            .map(|c| c.is_ascii_uppercase())
            .unwrap_or(false)
            && !callee_name.contains('.');

        let kind = if is_instantiation {
            ExprKind::Instantiate
        } else {
            ExprKind::Call
        };

        let id = self.next_id();
        let mut expr = Expression::new(id, kind, node.span, self.file_path())
            .in_function(self.function_fqn.clone())
            .with_attr(keys::CALLEE_NAME, AttrValue::from(callee_name.clone()))
            .with_attr(keys::ARG_EXPR_IDS, AttrValue::List(arg_ids));
        if !kwargs.is_empty() {
            expr = expr.with_attr(keys::CALL_KWARGS, AttrValue::Map(kwargs));
        }

        // Method calls carry the receiver and bare method name
        if function.kind == SyntaxKind::AttributeExpr {
            if let Some(object) = function.child_by_field("object") {
                expr = expr.with_attr("receiver", AttrValue::from(object.text.trim()));
            }
            if let Some(attribute) = function
                .child_by_field("attribute")
                .or_else(|| function.child_by_field("property"))
            {
                expr = expr.with_attr(keys::METHOD_NAME, AttrValue::from(attribute.text.trim()));
            }
        }

        Some(self.push(expr))
    }

    fn lower_operator(&mut self, node: &SyntaxNode, kind: ExprKind) -> Option<ExprId> {
        for child in &node.children {
            self.lower_expr(child);
        }
        let operator = node
            .children
            .iter()
            .find(|c| {
                c.children.is_empty()
                    && !matches!(c.kind, SyntaxKind::NameExpr | SyntaxKind::LiteralExpr)
                    && !c.text.trim().is_empty()
            })
            .map(|c| c.text.trim().to_string());

        let id = self.next_id();
        let mut expr = Expression::new(id, kind, node.span, self.file_path())
            .in_function(self.function_fqn.clone());
        if let Some(operator) = operator {
            expr = expr.with_attr(keys::OPERATOR, AttrValue::from(operator));
        }
        Some(self.push(expr))
    }

    fn next_id(&self) -> ExprId {
        self.document.expressions.next_id()
    }

    fn push(&mut self, mut expr: Expression) -> ExprId {
        if let Some(block_id) = resolve_block(
            &self.document.cfg_blocks,
            &self.function_node_id,
            expr.span.start_line,
        ) {
            expr.block_id = Some(block_id);
        }
        self.document.expressions.push(expr)
    }

    fn file_path(&self) -> String {
        self.document
            .nodes
            .iter()
            .find(|n| n.id == self.function_node_id)
            .map(|n| n.file_path.clone())
            .unwrap_or_default()
    }
}

/// Smallest CFG block of the function containing the line
fn resolve_block(blocks: &[CfgBlock], function_node_id: &str, line: u32) -> Option<String> {
    blocks
        .iter()
        .filter(|b| b.function_node_id == function_node_id)
        .filter(|b| b.span.map(|s| s.contains_line(line)).unwrap_or(false))
        .min_by_key(|b| b.span.map(|s| s.line_count()).unwrap_or(u32::MAX))
        .map(|b| b.id.clone())
}

fn literal_type(raw_kind: &str) -> &'static str {
    match raw_kind {
        "string" | "template_string" => "str",
        "integer" | "number" => "int",
        "float" => "float",
        "true" | "false" => "bool",
        "none" | "null" | "undefined" => "None",
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::flow_graph::application::build_flow_graphs;
    use crate::features::ir_generation::application::{generate_file_ir, FileInput};
    use crate::features::parsing::infrastructure::TreeSitterParser;
    use crate::features::parsing::ports::ParserFrontend;
    use crate::shared::models::AttrAccess;

    fn lowered(source: &str) -> IRDocument {
        let file = FileInput {
            path: "t.py".into(),
            source: source.into(),
        };
        let mut doc = generate_file_ir("r", "s", &file, None).unwrap();
        let mut parser = TreeSitterParser::python();
        let tree = parser.parse(source, "t.py").unwrap();
        build_flow_graphs(&mut doc, &tree);
        lower_expressions(&mut doc, &tree);
        doc
    }

    #[test]
    fn test_call_with_literal_args_preserves_order() {
        let doc = lowered("def f(q):\n    cursor.execute(\"SELECT 1\", q)\n");
        let call = doc
            .expressions
            .iter()
            .find(|e| e.kind == ExprKind::Call)
            .expect("call expression");
        assert_eq!(call.callee_name(), Some("cursor.execute"));

        let arg_ids = call.arg_expr_ids();
        assert_eq!(arg_ids.len(), 2);

        // First argument resolves to the string literal, second to the name
        let first = doc.expressions.get(arg_ids[0]).unwrap();
        assert_eq!(first.kind, ExprKind::Literal);
        assert_eq!(first.literal_value(), Some("\"SELECT 1\""));
        let second = doc.expressions.get(arg_ids[1]).unwrap();
        assert_eq!(second.kind, ExprKind::NameLoad);
        assert_eq!(second.var_name(), Some("q"));
    }

    #[test]
    fn test_method_call_receiver() {
        let doc = lowered("def f():\n    db.session.commit()\n");
        let call = doc
            .expressions
            .iter()
            .find(|e| e.kind == ExprKind::Call)
            .unwrap();
        assert_eq!(
            call.attrs.get_str(keys::METHOD_NAME),
            Some("commit")
        );
        assert_eq!(call.attrs.get_str("receiver"), Some("db.session"));
    }

    #[test]
    fn test_kwargs_captured() {
        let doc = lowered("def f():\n    request(url=\"http://x\", timeout=5)\n");
        let call = doc
            .expressions
            .iter()
            .find(|e| e.is_call_like())
            .unwrap();
        let kwargs = call.attrs.get_map(keys::CALL_KWARGS).expect("kwargs");
        assert!(kwargs.contains_key("url"));
        assert!(kwargs.contains_key("timeout"));
    }

    #[test]
    fn test_instantiation_detected() {
        let doc = lowered("def f():\n    user = User(1)\n");
        assert!(doc
            .expressions
            .iter()
            .any(|e| e.kind == ExprKind::Instantiate));
        assert!(doc.expressions.iter().any(|e| e.kind == ExprKind::Assign));
    }

    #[test]
    fn test_expressions_have_block_ids() {
        let doc = lowered("def f(x):\n    if x:\n        g(x)\n    return x\n");
        let call = doc.expressions.iter().find(|e| e.kind == ExprKind::Call);
        assert!(call.is_some());
        assert!(call.unwrap().block_id.is_some());
    }
}

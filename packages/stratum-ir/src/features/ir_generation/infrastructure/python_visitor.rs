//! Python structural IR visitor
//!
//! Walks the owned syntax tree and emits nodes and edges through the
//! builder. Extraction covers decorators, async flags, parameters with
//! annotations, docstrings, exception-handling info and body-statement
//! summaries for downstream enrichment.

use crate::features::ir_generation::domain::ScopeKind;
use crate::features::ir_generation::infrastructure::ir_builder::IrBuilder;
use crate::features::parsing::domain::{ParsedTree, SyntaxKind, SyntaxNode};
use crate::shared::models::attrs::keys;
use crate::shared::models::{
    AttrMap, AttrValue, ControlFlowSummary, EdgeKind, NodeKind, Span,
};
use std::collections::BTreeMap;

/// Cap on collected body statement summaries per function
const MAX_BODY_STATEMENTS: usize = 64;

pub struct PythonVisitor<'a> {
    builder: &'a mut IrBuilder,
}

impl<'a> PythonVisitor<'a> {
    pub fn new(builder: &'a mut IrBuilder) -> Self {
        Self { builder }
    }

    pub fn visit(&mut self, tree: &ParsedTree) {
        for child in &tree.root.children {
            self.visit_statement(child, &[]);
        }
        self.builder.resolve_calls();
    }

    fn visit_statement(&mut self, node: &SyntaxNode, decorators: &[String]) {
        match &node.kind {
            SyntaxKind::DecoratedDef => {
                let mut collected: Vec<String> = decorators.to_vec();
                for child in &node.children {
                    if child.kind == SyntaxKind::Decorator {
                        collected.push(child.text.trim_start_matches('@').trim().to_string());
                    }
                }
                for child in &node.children {
                    if child.kind != SyntaxKind::Decorator {
                        self.visit_statement(child, &collected);
                    }
                }
            }
            SyntaxKind::FunctionDef => self.handle_function(node, decorators),
            SyntaxKind::ClassDef => self.handle_class(node, decorators),
            SyntaxKind::ImportDecl => self.handle_import(node),
            SyntaxKind::AssignmentStmt => self.handle_assignment(node),
            // Definitions may hide under branches at module/class level
            SyntaxKind::IfStmt
            | SyntaxKind::ElifClause
            | SyntaxKind::ElseClause
            | SyntaxKind::TryStmt
            | SyntaxKind::ExceptClause
            | SyntaxKind::FinallyClause
            | SyntaxKind::WithStmt
            | SyntaxKind::Block => {
                for child in &node.children {
                    self.visit_statement(child, &[]);
                }
            }
            SyntaxKind::Other(raw) if raw == "expression_statement" => {
                for child in &node.children {
                    self.visit_statement(child, &[]);
                }
            }
            _ => {}
        }
    }

    // ------------------------------------------------------------------
    // Functions and methods
    // ------------------------------------------------------------------

    fn handle_function(&mut self, node: &SyntaxNode, decorators: &[String]) {
        let Some(name_node) = node.child_by_field("name") else {
            self.builder.skip_malformed("function definition", node.span);
            return;
        };
        let name = name_node.text.trim().to_string();
        if name.is_empty() {
            self.builder.skip_malformed("function definition", node.span);
            return;
        }

        let kind = if self.builder.scopes.in_class() {
            NodeKind::Method
        } else {
            NodeKind::Function
        };
        let fqn = self.builder.scopes.child_fqn(&name);
        let body = node.child_by_field("body");

        let mut attrs = AttrMap::new();
        if !decorators.is_empty() {
            attrs.insert(keys::DECORATORS.to_string(), AttrValue::from(decorators.to_vec()));
        }
        if node.child_by_raw("async").is_some() {
            attrs.insert(keys::IS_ASYNC.to_string(), AttrValue::Bool(true));
        }
        if let Some(return_type) = node.child_by_field("return_type") {
            let mut type_info = BTreeMap::new();
            type_info.insert(
                "return_type".to_string(),
                AttrValue::from(return_type.text.trim()),
            );
            attrs.insert(keys::TYPE_INFO.to_string(), AttrValue::Map(type_info));
            attrs.insert(
                keys::RETURN_TYPE.to_string(),
                AttrValue::from(return_type.text.trim()),
            );
        }

        if let Some(body) = body {
            attrs.insert(
                keys::BODY_STATEMENTS.to_string(),
                AttrValue::List(collect_body_statements(body)),
            );
            let exception_info = collect_exception_info(body);
            if let Some(info) = exception_info {
                attrs.insert(keys::EXCEPTION_HANDLING.to_string(), info);
            }
        }

        let node_id = self.builder.emit_node(kind, &fqn, node.span, attrs);

        if let Some(body) = body {
            let summary = control_flow_summary(body);
            if let Some(ir_node) = self.builder.node_mut(&node_id) {
                ir_node.body_span = Some(body.span);
                ir_node.control_flow_summary = Some(summary);
                if let Some(docstring) = extract_docstring(body) {
                    ir_node.docstring = Some(docstring);
                }
            }
            self.builder.set_content_hash(&node_id, &body.text);
        }

        // Parameters become Variable nodes of parameter kind
        self.builder
            .scopes
            .push(ScopeKind::Function, name.clone(), Some(node_id.clone()));
        if let Some(params) = node.child_by_field("parameters") {
            self.handle_parameters(params);
        }

        if let Some(body) = body {
            self.collect_calls(body, &node_id);
            // Nested definitions
            for child in &body.children {
                self.visit_statement(child, &[]);
            }
        }
        self.builder.scopes.pop();
    }

    fn handle_parameters(&mut self, params: &SyntaxNode) {
        for param in &params.children {
            let (name, annotation, default) = match &param.kind {
                SyntaxKind::NameExpr => (param.text.trim().to_string(), None, None),
                SyntaxKind::ParameterDecl => {
                    let name = param
                        .child_by_raw("identifier")
                        .map(|n| n.text.trim().to_string())
                        .unwrap_or_default();
                    let annotation = param
                        .child_by_field("type")
                        .map(|n| n.text.trim().to_string());
                    let default = param
                        .child_by_field("value")
                        .map(|n| n.text.trim().to_string());
                    (name, annotation, default)
                }
                _ => continue,
            };
            if name.is_empty() || name == "self" || name == "cls" {
                continue;
            }

            let fqn = self.builder.scopes.child_fqn(&name);
            let mut attrs = AttrMap::new();
            attrs.insert(keys::SCOPE.to_string(), AttrValue::from("parameter"));
            attrs.insert(keys::FROM_PARAMETER.to_string(), AttrValue::Bool(true));
            if let Some(annotation) = annotation {
                attrs.insert("type_annotation".to_string(), AttrValue::from(annotation));
            }
            if let Some(default) = default {
                attrs.insert("default_value".to_string(), AttrValue::from(default));
            }
            self.builder
                .emit_node(NodeKind::Parameter, &fqn, param.span, attrs);
        }
    }

    // ------------------------------------------------------------------
    // Classes
    // ------------------------------------------------------------------

    fn handle_class(&mut self, node: &SyntaxNode, decorators: &[String]) {
        let Some(name_node) = node.child_by_field("name") else {
            self.builder.skip_malformed("class definition", node.span);
            return;
        };
        let name = name_node.text.trim().to_string();
        if name.is_empty() {
            self.builder.skip_malformed("class definition", node.span);
            return;
        }

        let fqn = self.builder.scopes.child_fqn(&name);
        let mut attrs = AttrMap::new();
        if !decorators.is_empty() {
            attrs.insert(keys::DECORATORS.to_string(), AttrValue::from(decorators.to_vec()));
        }
        if let Some(superclasses) = node.child_by_field("superclasses") {
            let bases: Vec<String> = superclasses
                .children
                .iter()
                .filter(|c| {
                    matches!(
                        c.kind,
                        SyntaxKind::NameExpr | SyntaxKind::AttributeExpr | SyntaxKind::SubscriptExpr
                    )
                })
                .map(|c| c.text.trim().to_string())
                .collect();
            if !bases.is_empty() {
                attrs.insert("base_classes".to_string(), AttrValue::from(bases));
            }
        }

        let node_id = self.builder.emit_node(NodeKind::Class, &fqn, node.span, attrs);

        let body = node.child_by_field("body");
        if let Some(body) = body {
            if let Some(ir_node) = self.builder.node_mut(&node_id) {
                ir_node.body_span = Some(body.span);
                if let Some(docstring) = extract_docstring(body) {
                    ir_node.docstring = Some(docstring);
                }
            }
            self.builder.set_content_hash(&node_id, &body.text);

            self.builder
                .scopes
                .push(ScopeKind::Class, name, Some(node_id.clone()));
            for child in &body.children {
                self.visit_statement(child, &[]);
            }
            self.builder.scopes.pop();
        }
    }

    // ------------------------------------------------------------------
    // Imports
    // ------------------------------------------------------------------

    fn handle_import(&mut self, node: &SyntaxNode) {
        // `from x import a, b` has a module_name field; `import a.b` lists
        // dotted_name children directly
        let module_token = node
            .child_by_field("module_name")
            .map(|n| n.text.trim().to_string());

        let imported: Vec<String> = node
            .children
            .iter()
            .filter(|c| c.raw_kind == "dotted_name" || c.raw_kind == "aliased_import")
            .map(|c| c.text.trim().to_string())
            .collect();

        let token = match &module_token {
            Some(module) => module.clone(),
            None => match imported.first() {
                Some(first) => first.clone(),
                None => {
                    self.builder.skip_malformed("import statement", node.span);
                    return;
                }
            },
        };

        let fqn = self.builder.scopes.child_fqn(&format!("import:{}", token));
        let mut attrs = AttrMap::new();
        attrs.insert("module".to_string(), AttrValue::from(token.clone()));
        if module_token.is_some() {
            // Names pulled from the module in a from-import
            let names: Vec<String> = node
                .children
                .iter()
                .filter(|c| c.field.as_deref() == Some("name"))
                .map(|c| c.text.trim().to_string())
                .collect();
            if !names.is_empty() {
                attrs.insert("imported_names".to_string(), AttrValue::from(names));
            }
        }

        let import_node_id = self.builder.emit_node(NodeKind::Import, &fqn, node.span, attrs);

        // Imports edge targets the unresolved module token
        self.builder.emit_edge(
            EdgeKind::Imports,
            &import_node_id,
            &format!("module:{}", token),
            Some(node.span),
            AttrMap::new(),
        );
    }

    // ------------------------------------------------------------------
    // Assignments (module-level variables, class fields)
    // ------------------------------------------------------------------

    fn handle_assignment(&mut self, node: &SyntaxNode) {
        let Some(left) = node.child_by_field("left") else {
            return;
        };
        if left.kind != SyntaxKind::NameExpr {
            return;
        }
        let name = left.text.trim().to_string();
        if name.is_empty() {
            return;
        }

        let in_class = self.builder.scopes.in_class();
        let kind = if in_class {
            NodeKind::Field
        } else if name.chars().all(|c| c.is_ascii_uppercase() || c == '_' || c.is_ascii_digit()) {
            NodeKind::Constant
        } else {
            NodeKind::Variable
        };

        let fqn = self.builder.scopes.child_fqn(&name);
        // Re-assignment in the same scope maps to the same node id; skip
        if self.builder.nodes.iter().any(|n| n.fqn == fqn && n.kind == kind) {
            return;
        }

        let mut attrs = AttrMap::new();
        if let Some(annotation) = node.child_by_field("type") {
            let text = annotation.text.trim().to_string();
            attrs.insert("type_annotation".to_string(), AttrValue::from(text.clone()));
            attrs.insert(
                "is_nullable".to_string(),
                AttrValue::Bool(text.starts_with("Optional[") || text.ends_with("| None")),
            );
        }
        if let Some(right) = node.child_by_field("right") {
            if let Some(value_type) = literal_type_of(right) {
                attrs.insert(keys::VALUE_TYPE.to_string(), AttrValue::from(value_type));
            }
            if right.kind == SyntaxKind::LiteralExpr {
                attrs.insert(keys::VALUE.to_string(), AttrValue::from(right.text.trim()));
            }
        }

        self.builder.emit_node(kind, &fqn, node.span, attrs);
    }

    // ------------------------------------------------------------------
    // Call collection
    // ------------------------------------------------------------------

    fn collect_calls(&mut self, body: &SyntaxNode, caller_id: &str) {
        let mut calls: Vec<(String, Span)> = Vec::new();
        body.walk(&mut |n| {
            if n.kind == SyntaxKind::CallExpr {
                if let Some(function) = n.child_by_field("function") {
                    calls.push((function.text.trim().to_string(), n.span));
                }
            }
            // Lambdas inside the body belong to the same caller
        });
        for (callee, span) in calls {
            if !callee.is_empty() {
                self.builder.record_call(caller_id, &callee, span);
            }
        }
    }
}

// ----------------------------------------------------------------------
// Extraction helpers
// ----------------------------------------------------------------------

/// First body statement that is a bare string literal
fn extract_docstring(body: &SyntaxNode) -> Option<String> {
    let first = body.children.first()?;
    let string_node = if first.raw_kind == "expression_statement" {
        first.children.first()?
    } else {
        first
    };
    if string_node.raw_kind != "string" {
        return None;
    }
    let text = string_node.text.trim();
    let stripped = text
        .trim_start_matches("r\"\"\"")
        .trim_start_matches("\"\"\"")
        .trim_start_matches("'''")
        .trim_end_matches("\"\"\"")
        .trim_end_matches("'''")
        .trim_matches('"')
        .trim_matches('\'')
        .trim();
    if stripped.is_empty() {
        None
    } else {
        Some(stripped.to_string())
    }
}

/// Cyclomatic complexity and loop/try/branch flags over a function body
fn control_flow_summary(body: &SyntaxNode) -> ControlFlowSummary {
    let mut branch_count = 0u32;
    let mut has_loop = false;
    let mut has_try = false;

    body.walk(&mut |n| match n.kind {
        SyntaxKind::IfStmt | SyntaxKind::ElifClause | SyntaxKind::ConditionalExpr => {
            branch_count += 1;
        }
        SyntaxKind::ForStmt | SyntaxKind::WhileStmt => {
            branch_count += 1;
            has_loop = true;
        }
        SyntaxKind::TryStmt => {
            has_try = true;
        }
        SyntaxKind::ExceptClause => {
            branch_count += 1;
        }
        SyntaxKind::BooleanExpr => {
            branch_count += 1;
        }
        _ => {}
    });

    ControlFlowSummary {
        cyclomatic_complexity: branch_count + 1,
        has_loop,
        has_try,
        branch_count,
    }
}

/// Statement summaries for downstream convention/literal/null analysis
fn collect_body_statements(body: &SyntaxNode) -> Vec<AttrValue> {
    let mut statements = Vec::new();
    collect_statements_into(body, &mut statements);
    statements.truncate(MAX_BODY_STATEMENTS);
    statements
}

fn collect_statements_into(node: &SyntaxNode, out: &mut Vec<AttrValue>) {
    if out.len() >= MAX_BODY_STATEMENTS {
        return;
    }
    for child in &node.children {
        if out.len() >= MAX_BODY_STATEMENTS {
            return;
        }
        match &child.kind {
            SyntaxKind::ReturnStmt => {
                let value = child
                    .children
                    .iter()
                    .find(|c| c.raw_kind != "return")
                    .map(|c| c.text.trim().to_string())
                    .unwrap_or_default();
                out.push(statement_entry("return", &value));
            }
            SyntaxKind::RaiseStmt => {
                let value = child
                    .children
                    .iter()
                    .find(|c| c.raw_kind != "raise")
                    .map(|c| c.text.trim().to_string())
                    .unwrap_or_default();
                out.push(statement_entry("raise", &value));
            }
            SyntaxKind::YieldExpr => {
                out.push(statement_entry("yield", child.text.trim()));
            }
            SyntaxKind::AssignmentStmt => {
                out.push(statement_entry("assign", child.text.trim()));
                collect_statements_into(child, out);
            }
            SyntaxKind::CallExpr => {
                let callee = child
                    .child_by_field("function")
                    .map(|f| f.text.trim().to_string())
                    .unwrap_or_default();
                let mut entry = BTreeMap::new();
                entry.insert("type".to_string(), AttrValue::from("call"));
                entry.insert("value".to_string(), AttrValue::from(child.text.trim()));
                entry.insert("callee".to_string(), AttrValue::from(callee));
                out.push(AttrValue::Map(entry));
            }
            SyntaxKind::AttributeExpr => {
                out.push(statement_entry("attribute", child.text.trim()));
            }
            SyntaxKind::Other(raw) if raw == "pass_statement" => {
                out.push(statement_entry("pass", ""));
            }
            SyntaxKind::Other(raw) if raw == "ellipsis" => {
                out.push(statement_entry("ellipsis", ""));
            }
            _ => collect_statements_into(child, out),
        }
    }
}

fn statement_entry(stmt_type: &str, value: &str) -> AttrValue {
    let mut entry = BTreeMap::new();
    entry.insert("type".to_string(), AttrValue::from(stmt_type));
    entry.insert("value".to_string(), AttrValue::from(value));
    AttrValue::Map(entry)
}

/// Per-try exception handling info
fn collect_exception_info(body: &SyntaxNode) -> Option<AttrValue> {
    let mut tries: Vec<AttrValue> = Vec::new();
    body.walk(&mut |n| {
        if n.kind == SyntaxKind::TryStmt {
            let mut has_except = false;
            let mut has_finally = false;
            let mut exception_types: Vec<String> = Vec::new();
            for child in &n.children {
                match child.kind {
                    SyntaxKind::ExceptClause => {
                        has_except = true;
                        if let Some(exception) = child
                            .children
                            .iter()
                            .find(|c| matches!(c.kind, SyntaxKind::NameExpr | SyntaxKind::AttributeExpr))
                        {
                            exception_types.push(exception.text.trim().to_string());
                        }
                    }
                    SyntaxKind::FinallyClause => has_finally = true,
                    _ => {}
                }
            }
            let mut entry = BTreeMap::new();
            entry.insert("has_except".to_string(), AttrValue::Bool(has_except));
            entry.insert("has_finally".to_string(), AttrValue::Bool(has_finally));
            entry.insert(
                "exception_types".to_string(),
                AttrValue::from(exception_types),
            );
            tries.push(AttrValue::Map(entry));
        }
    });

    if tries.is_empty() {
        return None;
    }
    let mut info = BTreeMap::new();
    info.insert("try_count".to_string(), AttrValue::Int(tries.len() as i64));
    info.insert("tries".to_string(), AttrValue::List(tries));
    Some(AttrValue::Map(info))
}

/// Quick literal type classification of an expression node
fn literal_type_of(node: &SyntaxNode) -> Option<&'static str> {
    match node.raw_kind.as_str() {
        "string" => Some("str"),
        "integer" => Some("int"),
        "float" => Some("float"),
        "true" | "false" => Some("bool"),
        "none" => Some("None"),
        "list" => Some("list"),
        "dictionary" => Some("dict"),
        "set" => Some("set"),
        "tuple" => Some("tuple"),
        _ => None,
    }
}

//! TypeScript structural IR visitor
//!
//! Secondary backend: classes, interfaces, enums, functions, arrow
//! functions bound to declarations, fields, imports and react hook usage.

use crate::features::ir_generation::domain::ScopeKind;
use crate::features::ir_generation::infrastructure::ir_builder::IrBuilder;
use crate::features::parsing::domain::{ParsedTree, SyntaxKind, SyntaxNode};
use crate::shared::models::attrs::keys;
use crate::shared::models::{AttrMap, AttrValue, EdgeKind, NodeKind};
use std::collections::BTreeMap;

/// React hook category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookCategory {
    State,
    Effect,
    Memo,
    Ref,
    Context,
    Custom,
}

impl HookCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            HookCategory::State => "state",
            HookCategory::Effect => "effect",
            HookCategory::Memo => "memo",
            HookCategory::Ref => "ref",
            HookCategory::Context => "context",
            HookCategory::Custom => "custom",
        }
    }

    pub fn classify(hook_name: &str) -> Option<HookCategory> {
        match hook_name {
            "useState" | "useReducer" => Some(HookCategory::State),
            "useEffect" | "useLayoutEffect" | "useInsertionEffect" => Some(HookCategory::Effect),
            "useMemo" | "useCallback" => Some(HookCategory::Memo),
            "useRef" | "useImperativeHandle" => Some(HookCategory::Ref),
            "useContext" => Some(HookCategory::Context),
            name if name.starts_with("use")
                && name.len() > 3
                && name.as_bytes()[3].is_ascii_uppercase() =>
            {
                Some(HookCategory::Custom)
            }
            _ => None,
        }
    }
}

pub struct TypeScriptVisitor<'a> {
    builder: &'a mut IrBuilder,
}

impl<'a> TypeScriptVisitor<'a> {
    pub fn new(builder: &'a mut IrBuilder) -> Self {
        Self { builder }
    }

    pub fn visit(&mut self, tree: &ParsedTree) {
        for child in &tree.root.children {
            self.visit_statement(child);
        }
        self.builder.resolve_calls();
    }

    fn visit_statement(&mut self, node: &SyntaxNode) {
        match &node.kind {
            SyntaxKind::FunctionDef => self.handle_function(node, NodeKind::Function),
            SyntaxKind::ClassDef => self.handle_class(node, NodeKind::Class),
            SyntaxKind::InterfaceDef => self.handle_class(node, NodeKind::Interface),
            SyntaxKind::EnumDef => self.handle_class(node, NodeKind::Enum),
            SyntaxKind::TypeAliasDecl => self.handle_type_alias(node),
            SyntaxKind::ImportDecl => self.handle_import(node),
            SyntaxKind::VariableDecl => self.handle_variable_declaration(node),
            SyntaxKind::Other(raw) if raw == "export_statement" || raw == "ambient_declaration" => {
                for child in &node.children {
                    self.visit_statement(child);
                }
            }
            SyntaxKind::Block => {
                for child in &node.children {
                    self.visit_statement(child);
                }
            }
            _ => {}
        }
    }

    fn handle_function(&mut self, node: &SyntaxNode, kind: NodeKind) {
        let Some(name_node) = node.child_by_field("name") else {
            self.builder.skip_malformed("function declaration", node.span);
            return;
        };
        let name = name_node.text.trim().to_string();
        if name.is_empty() {
            self.builder.skip_malformed("function declaration", node.span);
            return;
        }

        let fqn = self.builder.scopes.child_fqn(&name);
        let mut attrs = AttrMap::new();
        if node.child_by_raw("async").is_some() {
            attrs.insert(keys::IS_ASYNC.to_string(), AttrValue::Bool(true));
        }
        if let Some(return_type) = node.child_by_field("return_type") {
            let text = return_type.text.trim_start_matches(':').trim().to_string();
            attrs.insert(keys::RETURN_TYPE.to_string(), AttrValue::from(text));
        }

        let body = node.child_by_field("body");
        if let Some(body) = body {
            let hooks = collect_hooks(body);
            if !hooks.is_empty() {
                attrs.insert(keys::USES_HOOKS.to_string(), AttrValue::List(hooks));
            }
        }

        let kind = if self.builder.scopes.in_class() {
            NodeKind::Method
        } else {
            kind
        };
        let node_id = self.builder.emit_node(kind, &fqn, node.span, attrs);

        if let Some(body) = body {
            if let Some(ir_node) = self.builder.node_mut(&node_id) {
                ir_node.body_span = Some(body.span);
            }
            self.builder.set_content_hash(&node_id, &body.text);

            self.builder
                .scopes
                .push(ScopeKind::Function, name, Some(node_id.clone()));
            self.handle_parameters(node);
            self.collect_calls(body, &node_id);
            self.builder.scopes.pop();
        }
    }

    fn handle_parameters(&mut self, node: &SyntaxNode) {
        let Some(params) = node.child_by_field("parameters") else {
            return;
        };
        for param in &params.children {
            if param.kind != SyntaxKind::ParameterDecl {
                continue;
            }
            let name = param
                .child_by_raw("identifier")
                .map(|n| n.text.trim().to_string())
                .unwrap_or_default();
            if name.is_empty() {
                continue;
            }
            let fqn = self.builder.scopes.child_fqn(&name);
            let mut attrs = AttrMap::new();
            attrs.insert(keys::SCOPE.to_string(), AttrValue::from("parameter"));
            attrs.insert(keys::FROM_PARAMETER.to_string(), AttrValue::Bool(true));
            if let Some(annotation) = param.child_by_field("type") {
                attrs.insert(
                    "type_annotation".to_string(),
                    AttrValue::from(annotation.text.trim_start_matches(':').trim()),
                );
            }
            self.builder.emit_node(NodeKind::Parameter, &fqn, param.span, attrs);
        }
    }

    fn handle_class(&mut self, node: &SyntaxNode, kind: NodeKind) {
        let Some(name_node) = node.child_by_field("name") else {
            self.builder.skip_malformed("type declaration", node.span);
            return;
        };
        let name = name_node.text.trim().to_string();
        let fqn = self.builder.scopes.child_fqn(&name);

        let mut attrs = AttrMap::new();
        if let Some(type_params) = node.child_by_field("type_parameters") {
            attrs.insert(keys::GENERICS.to_string(), AttrValue::from(type_params.text.trim()));
        }

        let node_id = self.builder.emit_node(kind, &fqn, node.span, attrs);

        let Some(body) = node.child_by_field("body") else {
            return;
        };
        self.builder.set_content_hash(&node_id, &body.text);
        self.builder
            .scopes
            .push(ScopeKind::Class, name, Some(node_id.clone()));

        for member in &body.children {
            match &member.kind {
                SyntaxKind::MethodDef => self.handle_function(member, NodeKind::Method),
                SyntaxKind::FieldDecl => self.handle_field(member),
                _ => {}
            }
        }
        self.builder.scopes.pop();
    }

    fn handle_field(&mut self, node: &SyntaxNode) {
        let Some(name_node) = node.child_by_field("name") else {
            return;
        };
        let name = name_node.text.trim().to_string();
        if name.is_empty() {
            return;
        }
        let fqn = self.builder.scopes.child_fqn(&name);
        let mut attrs = AttrMap::new();
        if let Some(annotation) = node.child_by_field("type") {
            let text = annotation.text.trim_start_matches(':').trim().to_string();
            attrs.insert(
                "is_nullable".to_string(),
                AttrValue::Bool(
                    text.contains("| null") || text.contains("| undefined") || node.text.contains('?'),
                ),
            );
            attrs.insert("type_annotation".to_string(), AttrValue::from(text));
        }
        self.builder.emit_node(NodeKind::Field, &fqn, node.span, attrs);
    }

    fn handle_type_alias(&mut self, node: &SyntaxNode) {
        let Some(name_node) = node.child_by_field("name") else {
            return;
        };
        let fqn = self.builder.scopes.child_fqn(name_node.text.trim());
        self.builder
            .emit_node(NodeKind::TypeAlias, &fqn, node.span, AttrMap::new());
    }

    fn handle_import(&mut self, node: &SyntaxNode) {
        let Some(source) = node.child_by_field("source") else {
            self.builder.skip_malformed("import statement", node.span);
            return;
        };
        let module = source.text.trim().trim_matches('"').trim_matches('\'').to_string();
        let fqn = self.builder.scopes.child_fqn(&format!("import:{}", module));

        let mut attrs = AttrMap::new();
        attrs.insert("module".to_string(), AttrValue::from(module.clone()));

        let import_node_id = self.builder.emit_node(NodeKind::Import, &fqn, node.span, attrs);
        self.builder.emit_edge(
            EdgeKind::Imports,
            &import_node_id,
            &format!("module:{}", module),
            Some(node.span),
            AttrMap::new(),
        );
    }

    /// `const f = (x) => ...` becomes an ArrowFunction node
    fn handle_variable_declaration(&mut self, node: &SyntaxNode) {
        for declarator in node.find_children(&SyntaxKind::AssignmentStmt) {
            let Some(name_node) = declarator.child_by_field("name") else {
                continue;
            };
            let name = name_node.text.trim().to_string();
            let value = declarator.child_by_field("value");

            if let Some(value) = value {
                if value.kind == SyntaxKind::ArrowFunctionDef {
                    let fqn = self.builder.scopes.child_fqn(&name);
                    let mut attrs = AttrMap::new();
                    if value.child_by_raw("async").is_some() {
                        attrs.insert(keys::IS_ASYNC.to_string(), AttrValue::Bool(true));
                    }
                    let hooks = collect_hooks(value);
                    if !hooks.is_empty() {
                        attrs.insert(keys::USES_HOOKS.to_string(), AttrValue::List(hooks));
                    }
                    let node_id =
                        self.builder
                            .emit_node(NodeKind::ArrowFunction, &fqn, declarator.span, attrs);
                    if let Some(body) = value.child_by_field("body") {
                        if let Some(ir_node) = self.builder.node_mut(&node_id) {
                            ir_node.body_span = Some(body.span);
                        }
                        self.builder.set_content_hash(&node_id, &body.text);
                    }
                    self.builder
                        .scopes
                        .push(ScopeKind::Function, name, Some(node_id.clone()));
                    self.collect_calls(value, &node_id);
                    self.builder.scopes.pop();
                    continue;
                }
            }

            let fqn = self.builder.scopes.child_fqn(&name);
            self.builder
                .emit_node(NodeKind::Variable, &fqn, declarator.span, AttrMap::new());
        }
    }

    fn collect_calls(&mut self, body: &SyntaxNode, caller_id: &str) {
        let mut calls = Vec::new();
        body.walk(&mut |n| {
            if n.kind == SyntaxKind::CallExpr {
                if let Some(function) = n.child_by_field("function") {
                    calls.push((function.text.trim().to_string(), n.span));
                }
            }
        });
        for (callee, span) in calls {
            if !callee.is_empty() {
                self.builder.record_call(caller_id, &callee, span);
            }
        }
    }
}

/// Hook usages as (name, category) maps
fn collect_hooks(body: &SyntaxNode) -> Vec<AttrValue> {
    let mut hooks: Vec<AttrValue> = Vec::new();
    let mut seen: Vec<String> = Vec::new();
    body.walk(&mut |n| {
        if n.kind == SyntaxKind::CallExpr {
            if let Some(function) = n.child_by_field("function") {
                let name = function.text.trim();
                if let Some(category) = HookCategory::classify(name) {
                    if !seen.contains(&name.to_string()) {
                        seen.push(name.to_string());
                        let mut entry = BTreeMap::new();
                        entry.insert("name".to_string(), AttrValue::from(name));
                        entry.insert("category".to_string(), AttrValue::from(category.as_str()));
                        hooks.push(AttrValue::Map(entry));
                    }
                }
            }
        }
    });
    hooks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::parsing::infrastructure::TreeSitterParser;
    use crate::features::parsing::ports::ParserFrontend;
    use crate::shared::models::attrs::AttrAccess;

    fn build(source: &str) -> IrBuilder {
        let mut parser = TreeSitterParser::typescript();
        let tree = parser.parse(source, "app.ts").unwrap();
        let mut builder = IrBuilder::new("repo", "app.ts", "typescript", "app", tree.root.span);
        TypeScriptVisitor::new(&mut builder).visit(&tree);
        builder
    }

    #[test]
    fn test_interface_and_class() {
        let builder = build(
            "interface User { id: number; }\nclass Repo {\n  find(id: number): User { return null as any; }\n}\n",
        );
        assert!(builder.nodes.iter().any(|n| n.kind == NodeKind::Interface));
        assert!(builder.nodes.iter().any(|n| n.kind == NodeKind::Class));
        assert!(builder.nodes.iter().any(|n| n.kind == NodeKind::Method));
    }

    #[test]
    fn test_arrow_function_with_hooks() {
        let builder = build(
            "const Profile = () => {\n  const [user, setUser] = useState(null);\n  useEffect(() => {}, []);\n  return user;\n};\n",
        );
        let arrow = builder
            .nodes
            .iter()
            .find(|n| n.kind == NodeKind::ArrowFunction)
            .expect("arrow function node");
        let hooks = arrow.attrs.get_list(keys::USES_HOOKS).expect("hooks attr");
        assert_eq!(hooks.len(), 2);
        let categories: Vec<&str> = hooks
            .iter()
            .filter_map(|h| h.as_map())
            .filter_map(|m| m.get("category"))
            .filter_map(|v| v.as_str())
            .collect();
        assert!(categories.contains(&"state"));
        assert!(categories.contains(&"effect"));
    }

    #[test]
    fn test_hook_classification() {
        assert_eq!(HookCategory::classify("useState"), Some(HookCategory::State));
        assert_eq!(HookCategory::classify("useMemo"), Some(HookCategory::Memo));
        assert_eq!(
            HookCategory::classify("useCustomThing"),
            Some(HookCategory::Custom)
        );
        assert_eq!(HookCategory::classify("user"), None);
        assert_eq!(HookCategory::classify("used"), None);
    }

    #[test]
    fn test_import_token() {
        let builder = build("import { useState } from 'react';\n");
        let edge = builder
            .edges
            .iter()
            .find(|e| e.kind == EdgeKind::Imports)
            .unwrap();
        assert_eq!(edge.target_id, "module:react");
    }
}

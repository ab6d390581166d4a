//! Tree-sitter parser implementation
//!
//! This is where the tree-sitter dependency lives. Trees are converted to
//! the owned domain model immediately; the concrete trees are retained per
//! file only to speed up incremental re-parses.

use std::collections::HashMap;

use tree_sitter::{InputEdit, Parser as TsParser, Point, Tree};

use crate::features::parsing::domain::{ParseError, ParsedTree, SyntaxKind, SyntaxNode};
use crate::features::parsing::ports::ParserFrontend;
use crate::shared::models::{Result, Span, StratumError};

/// Supported languages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserLanguage {
    Python,
    TypeScript,
}

impl ParserLanguage {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "py" | "pyi" => Some(ParserLanguage::Python),
            "ts" | "tsx" | "js" | "jsx" => Some(ParserLanguage::TypeScript),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ParserLanguage::Python => "python",
            ParserLanguage::TypeScript => "typescript",
        }
    }
}

/// Tree-sitter based parser with per-file incremental tree cache
pub struct TreeSitterParser {
    language: ParserLanguage,
    old_trees: HashMap<String, Tree>,
}

impl TreeSitterParser {
    pub fn python() -> Self {
        Self {
            language: ParserLanguage::Python,
            old_trees: HashMap::new(),
        }
    }

    pub fn typescript() -> Self {
        Self {
            language: ParserLanguage::TypeScript,
            old_trees: HashMap::new(),
        }
    }

    pub fn for_language(language: ParserLanguage) -> Self {
        Self {
            language,
            old_trees: HashMap::new(),
        }
    }

    fn ts_language(&self) -> tree_sitter::Language {
        match self.language {
            ParserLanguage::Python => tree_sitter_python::language(),
            ParserLanguage::TypeScript => tree_sitter_typescript::language_typescript(),
        }
    }

    fn make_parser(&self) -> Result<TsParser> {
        let mut parser = TsParser::new();
        parser
            .set_language(&self.ts_language())
            .map_err(|e| StratumError::parse(format!("failed to set language: {}", e)))?;
        Ok(parser)
    }

    fn convert_tree(&self, tree: &Tree, source: &str, file_path: &str) -> ParsedTree {
        let root_node = tree.root_node();
        let root = self.convert_node(&root_node, None, source);

        let mut errors = Vec::new();
        self.collect_errors(&root_node, &mut errors);

        ParsedTree::new(
            root,
            source.to_string(),
            file_path.to_string(),
            self.language.name().to_string(),
        )
        .with_errors(errors)
    }

    fn convert_node(
        &self,
        node: &tree_sitter::Node,
        field: Option<&str>,
        source: &str,
    ) -> SyntaxNode {
        let kind = self.map_node_kind(node.kind());
        let span = node_span(node);
        let text = source.get(node.byte_range()).unwrap_or("").to_string();

        let mut children = Vec::new();
        let mut cursor = node.walk();
        if cursor.goto_first_child() {
            loop {
                let child = cursor.node();
                if !child.is_extra() {
                    let child_field = cursor.field_name();
                    children.push(self.convert_node(&child, child_field, source));
                }
                if !cursor.goto_next_sibling() {
                    break;
                }
            }
        }

        SyntaxNode::new(kind, span)
            .with_raw_kind(node.kind())
            .with_field(field.map(|f| f.to_string()))
            .with_text(text)
            .with_children(children)
    }

    fn map_node_kind(&self, ts_kind: &str) -> SyntaxKind {
        match self.language {
            ParserLanguage::Python => Self::map_python_kind(ts_kind),
            ParserLanguage::TypeScript => Self::map_typescript_kind(ts_kind),
        }
    }

    fn map_python_kind(ts_kind: &str) -> SyntaxKind {
        match ts_kind {
            "function_definition" => SyntaxKind::FunctionDef,
            "class_definition" => SyntaxKind::ClassDef,
            "decorated_definition" => SyntaxKind::DecoratedDef,
            "lambda" => SyntaxKind::LambdaDef,

            "assignment" | "augmented_assignment" => SyntaxKind::AssignmentStmt,
            "parameter" | "default_parameter" | "typed_parameter" | "typed_default_parameter" => {
                SyntaxKind::ParameterDecl
            }
            "import_statement" | "import_from_statement" => SyntaxKind::ImportDecl,

            "call" => SyntaxKind::CallExpr,
            "identifier" => SyntaxKind::NameExpr,
            "attribute" => SyntaxKind::AttributeExpr,
            "subscript" => SyntaxKind::SubscriptExpr,
            "string" | "integer" | "float" | "true" | "false" | "none" => SyntaxKind::LiteralExpr,
            "list" | "dictionary" | "set" | "tuple" => SyntaxKind::CollectionExpr,
            "binary_operator" => SyntaxKind::BinaryExpr,
            "comparison_operator" => SyntaxKind::CompareExpr,
            "boolean_operator" => SyntaxKind::BooleanExpr,
            "unary_operator" | "not_operator" => SyntaxKind::UnaryExpr,
            "conditional_expression" => SyntaxKind::ConditionalExpr,
            "list_comprehension" | "dictionary_comprehension" | "set_comprehension"
            | "generator_expression" => SyntaxKind::ComprehensionExpr,

            "return_statement" => SyntaxKind::ReturnStmt,
            "if_statement" => SyntaxKind::IfStmt,
            "elif_clause" => SyntaxKind::ElifClause,
            "else_clause" => SyntaxKind::ElseClause,
            "for_statement" => SyntaxKind::ForStmt,
            "while_statement" => SyntaxKind::WhileStmt,
            "try_statement" => SyntaxKind::TryStmt,
            "except_clause" => SyntaxKind::ExceptClause,
            "finally_clause" => SyntaxKind::FinallyClause,
            "with_statement" => SyntaxKind::WithStmt,
            "match_statement" => SyntaxKind::SwitchStmt,

            "break_statement" => SyntaxKind::BreakStmt,
            "continue_statement" => SyntaxKind::ContinueStmt,
            "raise_statement" => SyntaxKind::RaiseStmt,
            "yield" => SyntaxKind::YieldExpr,
            "await" => SyntaxKind::AwaitExpr,

            "block" | "module" => SyntaxKind::Block,
            "comment" => SyntaxKind::Comment,
            "decorator" => SyntaxKind::Decorator,
            "type" => SyntaxKind::TypeAnnotation,
            "argument_list" => SyntaxKind::ArgumentList,
            "keyword_argument" => SyntaxKind::KeywordArgument,

            other => SyntaxKind::Other(other.to_string()),
        }
    }

    fn map_typescript_kind(ts_kind: &str) -> SyntaxKind {
        match ts_kind {
            "function_declaration" | "function_expression" | "generator_function_declaration" => {
                SyntaxKind::FunctionDef
            }
            "class_declaration" => SyntaxKind::ClassDef,
            "interface_declaration" => SyntaxKind::InterfaceDef,
            "enum_declaration" => SyntaxKind::EnumDef,
            "method_definition" => SyntaxKind::MethodDef,
            "arrow_function" => SyntaxKind::ArrowFunctionDef,
            "type_alias_declaration" => SyntaxKind::TypeAliasDecl,

            "lexical_declaration" | "variable_declaration" => SyntaxKind::VariableDecl,
            "variable_declarator" => SyntaxKind::AssignmentStmt,
            "required_parameter" | "optional_parameter" => SyntaxKind::ParameterDecl,
            "public_field_definition" | "property_signature" => SyntaxKind::FieldDecl,
            "import_statement" => SyntaxKind::ImportDecl,

            "call_expression" | "new_expression" => SyntaxKind::CallExpr,
            "identifier" | "property_identifier" | "type_identifier" => SyntaxKind::NameExpr,
            "member_expression" => SyntaxKind::AttributeExpr,
            "subscript_expression" => SyntaxKind::SubscriptExpr,
            "string" | "template_string" | "number" | "true" | "false" | "null" | "undefined" => {
                SyntaxKind::LiteralExpr
            }
            "array" | "object" => SyntaxKind::CollectionExpr,
            "binary_expression" => SyntaxKind::BinaryExpr,
            "unary_expression" => SyntaxKind::UnaryExpr,
            "ternary_expression" => SyntaxKind::ConditionalExpr,

            "return_statement" => SyntaxKind::ReturnStmt,
            "if_statement" => SyntaxKind::IfStmt,
            "else_clause" => SyntaxKind::ElseClause,
            "for_statement" | "for_in_statement" => SyntaxKind::ForStmt,
            "while_statement" | "do_statement" => SyntaxKind::WhileStmt,
            "try_statement" => SyntaxKind::TryStmt,
            "catch_clause" => SyntaxKind::ExceptClause,
            "finally_clause" => SyntaxKind::FinallyClause,
            "switch_statement" => SyntaxKind::SwitchStmt,

            "break_statement" => SyntaxKind::BreakStmt,
            "continue_statement" => SyntaxKind::ContinueStmt,
            "throw_statement" => SyntaxKind::RaiseStmt,
            "yield_expression" => SyntaxKind::YieldExpr,
            "await_expression" => SyntaxKind::AwaitExpr,

            "statement_block" | "program" | "class_body" => SyntaxKind::Block,
            "comment" => SyntaxKind::Comment,
            "decorator" => SyntaxKind::Decorator,
            "type_annotation" => SyntaxKind::TypeAnnotation,
            "arguments" => SyntaxKind::ArgumentList,

            other => SyntaxKind::Other(other.to_string()),
        }
    }

    fn collect_errors(&self, node: &tree_sitter::Node, errors: &mut Vec<ParseError>) {
        if node.is_error() || node.is_missing() {
            errors.push(ParseError {
                message: format!("Parse error at {:?}", node.kind()),
                span: node_span(node),
            });
        }

        for i in 0..node.child_count() {
            if let Some(child) = node.child(i) {
                self.collect_errors(&child, errors);
            }
        }
    }
}

fn node_span(node: &tree_sitter::Node) -> Span {
    Span::new(
        node.start_position().row as u32 + 1,
        node.start_position().column as u32,
        node.end_position().row as u32 + 1,
        node.end_position().column as u32,
    )
}

/// Byte offset to (row, column) point
fn byte_to_point(source: &str, byte: usize) -> Point {
    let mut row = 0usize;
    let mut col = 0usize;
    for (i, b) in source.bytes().enumerate() {
        if i >= byte {
            break;
        }
        if b == b'\n' {
            row += 1;
            col = 0;
        } else {
            col += 1;
        }
    }
    Point { row, column: col }
}

/// Minimal single-range edit between two versions of a file
fn compute_edit(old_source: &str, new_source: &str) -> InputEdit {
    let old_bytes = old_source.as_bytes();
    let new_bytes = new_source.as_bytes();

    let mut prefix = 0usize;
    let max_prefix = old_bytes.len().min(new_bytes.len());
    while prefix < max_prefix && old_bytes[prefix] == new_bytes[prefix] {
        prefix += 1;
    }

    let mut suffix = 0usize;
    while suffix < old_bytes.len().saturating_sub(prefix)
        && suffix < new_bytes.len().saturating_sub(prefix)
        && old_bytes[old_bytes.len() - 1 - suffix] == new_bytes[new_bytes.len() - 1 - suffix]
    {
        suffix += 1;
    }

    let old_end = old_bytes.len() - suffix;
    let new_end = new_bytes.len() - suffix;

    InputEdit {
        start_byte: prefix,
        old_end_byte: old_end,
        new_end_byte: new_end,
        start_position: byte_to_point(old_source, prefix),
        old_end_position: byte_to_point(old_source, old_end),
        new_end_position: byte_to_point(new_source, new_end),
    }
}

impl ParserFrontend for TreeSitterParser {
    fn parse(&mut self, source: &str, file_path: &str) -> Result<ParsedTree> {
        let mut parser = self.make_parser()?;
        let tree = parser
            .parse(source, None)
            .ok_or_else(|| StratumError::parse("failed to parse source").with_file(file_path))?;

        let parsed = self.convert_tree(&tree, source, file_path);
        self.old_trees.insert(file_path.to_string(), tree);
        Ok(parsed)
    }

    fn parse_incremental(
        &mut self,
        old_source: &str,
        new_source: &str,
        file_path: &str,
    ) -> Result<ParsedTree> {
        let mut parser = self.make_parser()?;

        let old_tree = match self.old_trees.get_mut(file_path) {
            Some(tree) => {
                tree.edit(&compute_edit(old_source, new_source));
                Some(tree.clone())
            }
            None => None,
        };

        let tree = parser
            .parse(new_source, old_tree.as_ref())
            .ok_or_else(|| StratumError::parse("failed to re-parse source").with_file(file_path))?;

        let parsed = self.convert_tree(&tree, new_source, file_path);
        self.old_trees.insert(file_path.to_string(), tree);
        Ok(parsed)
    }

    fn supports_extension(&self, ext: &str) -> bool {
        ParserLanguage::from_extension(ext) == Some(self.language)
    }

    fn language_name(&self) -> &'static str {
        self.language.name()
    }
}

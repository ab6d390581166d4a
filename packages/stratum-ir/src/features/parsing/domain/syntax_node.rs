//! Language-neutral syntax node representation
//!
//! Owned conversion of the concrete syntax tree; downstream visitors never
//! touch parser internals. Every node keeps its source text slice and the
//! original grammar kind for fine-grained matching.

use crate::shared::models::Span;

/// Syntax node kind (language-neutral)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntaxKind {
    // Definitions
    FunctionDef,
    ClassDef,
    InterfaceDef,
    EnumDef,
    MethodDef,
    LambdaDef,
    ArrowFunctionDef,

    // Declarations
    VariableDecl,
    ParameterDecl,
    FieldDecl,
    ImportDecl,
    TypeAliasDecl,

    // Expressions
    CallExpr,
    NameExpr,
    AttributeExpr,
    SubscriptExpr,
    LiteralExpr,
    CollectionExpr,
    BinaryExpr,
    UnaryExpr,
    CompareExpr,
    BooleanExpr,
    ComprehensionExpr,
    ConditionalExpr,

    // Statements
    AssignmentStmt,
    ReturnStmt,
    IfStmt,
    ElseClause,
    ElifClause,
    ForStmt,
    WhileStmt,
    TryStmt,
    ExceptClause,
    FinallyClause,
    WithStmt,
    SwitchStmt,

    // Control flow
    BreakStmt,
    ContinueStmt,
    RaiseStmt,
    YieldExpr,
    AwaitExpr,

    // Other
    Block,
    Comment,
    Decorator,
    DecoratedDef,
    TypeAnnotation,
    ArgumentList,
    KeywordArgument,
    StringNode,

    // Unknown
    Other(String),
}

impl SyntaxKind {
    pub fn is_definition(&self) -> bool {
        matches!(
            self,
            SyntaxKind::FunctionDef
                | SyntaxKind::ClassDef
                | SyntaxKind::InterfaceDef
                | SyntaxKind::EnumDef
                | SyntaxKind::MethodDef
                | SyntaxKind::LambdaDef
                | SyntaxKind::ArrowFunctionDef
        )
    }

    pub fn is_control_flow(&self) -> bool {
        matches!(
            self,
            SyntaxKind::IfStmt
                | SyntaxKind::ForStmt
                | SyntaxKind::WhileStmt
                | SyntaxKind::TryStmt
                | SyntaxKind::SwitchStmt
                | SyntaxKind::BreakStmt
                | SyntaxKind::ContinueStmt
                | SyntaxKind::ReturnStmt
                | SyntaxKind::RaiseStmt
        )
    }

    pub fn is_branching(&self) -> bool {
        matches!(
            self,
            SyntaxKind::IfStmt | SyntaxKind::ForStmt | SyntaxKind::WhileStmt | SyntaxKind::SwitchStmt
        )
    }
}

/// Language-neutral syntax node
#[derive(Debug, Clone)]
pub struct SyntaxNode {
    pub kind: SyntaxKind,
    pub span: Span,
    /// Source text slice covered by this node
    pub text: String,
    pub children: Vec<SyntaxNode>,
    /// Original grammar kind, for language-specific matching
    pub raw_kind: String,
    /// Grammar field name this node was attached under, when known
    pub field: Option<String>,
}

impl SyntaxNode {
    pub fn new(kind: SyntaxKind, span: Span) -> Self {
        Self {
            kind,
            span,
            text: String::new(),
            children: Vec::new(),
            raw_kind: String::new(),
            field: None,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_children(mut self, children: Vec<SyntaxNode>) -> Self {
        self.children = children;
        self
    }

    pub fn with_raw_kind(mut self, raw_kind: impl Into<String>) -> Self {
        self.raw_kind = raw_kind.into();
        self
    }

    pub fn with_field(mut self, field: Option<String>) -> Self {
        self.field = field;
        self
    }

    pub fn find_child(&self, kind: &SyntaxKind) -> Option<&SyntaxNode> {
        self.children.iter().find(|c| &c.kind == kind)
    }

    pub fn find_children(&self, kind: &SyntaxKind) -> Vec<&SyntaxNode> {
        self.children.iter().filter(|c| &c.kind == kind).collect()
    }

    /// First child attached under the given grammar field
    pub fn child_by_field(&self, field: &str) -> Option<&SyntaxNode> {
        self.children
            .iter()
            .find(|c| c.field.as_deref() == Some(field))
    }

    /// First child with the given raw grammar kind
    pub fn child_by_raw(&self, raw_kind: &str) -> Option<&SyntaxNode> {
        self.children.iter().find(|c| c.raw_kind == raw_kind)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Depth-first walk over self and all descendants
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a SyntaxNode)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_predicates() {
        assert!(SyntaxKind::FunctionDef.is_definition());
        assert!(SyntaxKind::ArrowFunctionDef.is_definition());
        assert!(!SyntaxKind::CallExpr.is_definition());
        assert!(SyntaxKind::WhileStmt.is_branching());
        assert!(!SyntaxKind::ReturnStmt.is_branching());
    }

    #[test]
    fn test_child_by_field() {
        let name = SyntaxNode::new(SyntaxKind::NameExpr, Span::zero())
            .with_text("foo")
            .with_field(Some("name".to_string()));
        let def = SyntaxNode::new(SyntaxKind::FunctionDef, Span::zero()).with_children(vec![name]);
        assert_eq!(def.child_by_field("name").unwrap().text(), "foo");
        assert!(def.child_by_field("body").is_none());
    }
}

//! Parsed tree representation
//!
//! Parse errors surface as a lossy tree plus a diagnostic list; downstream
//! stages must tolerate partial trees.

use super::syntax_node::SyntaxNode;
use crate::shared::models::Span;

/// Parsed syntax tree
#[derive(Debug, Clone)]
pub struct ParsedTree {
    pub root: SyntaxNode,
    pub source: String,
    pub file_path: String,
    pub language: String,
    pub has_errors: bool,
    pub errors: Vec<ParseError>,
}

/// Parse error
#[derive(Debug, Clone)]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

impl ParsedTree {
    pub fn new(root: SyntaxNode, source: String, file_path: String, language: String) -> Self {
        Self {
            root,
            source,
            file_path,
            language,
            has_errors: false,
            errors: Vec::new(),
        }
    }

    pub fn with_errors(mut self, errors: Vec<ParseError>) -> Self {
        self.has_errors = !errors.is_empty();
        self.errors = errors;
        self
    }

    /// Byte-accurate span of a node (spans are already materialized on the
    /// owned tree; this is the stable lookup point for consumers)
    pub fn span_of(&self, node: &SyntaxNode) -> Span {
        node.span
    }

    /// Source line at a 1-based line number
    pub fn line(&self, line_number: u32) -> Option<&str> {
        if line_number == 0 {
            return None;
        }
        self.source.lines().nth((line_number - 1) as usize)
    }

    pub fn line_count(&self) -> usize {
        self.source.lines().count()
    }

    pub fn is_empty(&self) -> bool {
        self.source.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::parsing::domain::SyntaxKind;

    #[test]
    fn test_line_lookup() {
        let root = SyntaxNode::new(SyntaxKind::Block, Span::zero());
        let tree = ParsedTree::new(
            root,
            "line1\nline2\nline3".to_string(),
            "test.py".to_string(),
            "python".to_string(),
        );
        assert_eq!(tree.line_count(), 3);
        assert_eq!(tree.line(2), Some("line2"));
        assert_eq!(tree.line(0), None);
        assert_eq!(tree.line(9), None);
    }
}

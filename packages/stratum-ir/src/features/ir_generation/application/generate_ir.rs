//! Per-file structural IR generation (C1 -> C2)
//!
//! Produces a partial document: nodes, edges, diagnostics and occurrences.
//! Semantic layers are filled by later stages.

use crate::features::ir_generation::domain::module_path_for;
use crate::features::ir_generation::infrastructure::ir_builder::IrBuilder;
use crate::features::ir_generation::infrastructure::python_visitor::PythonVisitor;
use crate::features::ir_generation::infrastructure::template_scanner::scan_template;
use crate::features::ir_generation::infrastructure::typescript_visitor::TypeScriptVisitor;
use crate::features::parsing::domain::ParsedTree;
use crate::features::parsing::infrastructure::{ParserLanguage, TreeSitterParser};
use crate::features::parsing::ports::ParserFrontend;
use crate::shared::models::{Diagnostic, IRDocument, OccurrenceGenerator, Result};

/// One source file to index
#[derive(Debug, Clone)]
pub struct FileInput {
    pub path: String,
    pub source: String,
}

/// Generate the structural IR for a single file.
///
/// Unknown extensions yield an empty document with a diagnostic; template
/// files go through the slot scanner instead of a language visitor. A
/// pre-parsed tree can be supplied to skip C1.
pub fn generate_file_ir(
    repo_id: &str,
    snapshot_id: &str,
    file: &FileInput,
    pre_parsed: Option<ParsedTree>,
) -> Result<IRDocument> {
    let mut document = IRDocument::new(repo_id, snapshot_id);

    let extension = file.path.rsplit('.').next().unwrap_or_default();

    if matches!(extension, "html" | "htm" | "jinja" | "jinja2" | "j2") {
        scan_template(&mut document, &file.path, &file.source);
        return Ok(document);
    }

    let Some(language) = ParserLanguage::from_extension(extension) else {
        document.diagnostics.push(Diagnostic::warning(
            "parse",
            file.path.clone(),
            format!("unsupported extension: .{}", extension),
        ));
        return Ok(document);
    };

    let tree = match pre_parsed {
        Some(tree) => tree,
        None => {
            let mut parser = TreeSitterParser::for_language(language);
            parser.parse(&file.source, &file.path)?
        }
    };

    for error in &tree.errors {
        document.diagnostics.push(
            Diagnostic::error("parse", file.path.clone(), error.message.clone())
                .with_span(error.span),
        );
    }

    let module_path = module_path_for(&file.path);
    let mut builder = IrBuilder::new(
        repo_id,
        file.path.clone(),
        language.name(),
        module_path,
        tree.root.span,
    );

    match language {
        ParserLanguage::Python => PythonVisitor::new(&mut builder).visit(&tree),
        ParserLanguage::TypeScript => TypeScriptVisitor::new(&mut builder).visit(&tree),
    }

    document.nodes = builder.nodes;
    document.edges = builder.edges;
    document.diagnostics.extend(builder.diagnostics);

    let mut generator = OccurrenceGenerator::new();
    document.occurrences = generator.generate(&document.nodes, &document.edges);

    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::NodeKind;

    #[test]
    fn test_python_file_ir() {
        let file = FileInput {
            path: "api.py".into(),
            source: "def get_user(user_id: int):\n    return user_id\n".into(),
        };
        let doc = generate_file_ir("repo", "snap", &file, None).unwrap();
        assert!(doc.nodes.iter().any(|n| n.kind == NodeKind::Function));
        assert!(!doc.occurrences.is_empty());
    }

    #[test]
    fn test_unsupported_extension_is_diagnostic_not_error() {
        let file = FileInput {
            path: "data.csv".into(),
            source: "a,b\n".into(),
        };
        let doc = generate_file_ir("repo", "snap", &file, None).unwrap();
        assert!(doc.nodes.is_empty());
        assert_eq!(doc.diagnostics.len(), 1);
    }

    #[test]
    fn test_template_file_produces_slots() {
        let file = FileInput {
            path: "page.html".into(),
            source: "<p>{{ name }}</p>\n".into(),
        };
        let doc = generate_file_ir("repo", "snap", &file, None).unwrap();
        assert_eq!(doc.template_slots.len(), 1);
    }
}

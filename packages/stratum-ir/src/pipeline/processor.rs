//! Pipeline processor
//!
//! Per-file stage chain C1 -> C5 and the whole-corpus build. Stages C1-C4
//! are single-threaded per file and run in parallel across files with a
//! pool of min(cpu, file_count) workers. Merging is deterministic: files
//! process in path order and the merged document is re-sequenced and
//! sorted into total order at the end. Per-file failures become
//! diagnostics; the batch never aborts.

use rayon::prelude::*;
use std::sync::Arc;

use crate::features::data_flow::build_data_flow;
use crate::features::expression_builder::lower_expressions;
use crate::features::flow_graph::application::build_flow_graphs;
use crate::features::interprocedural::build_interprocedural_edges;
use crate::features::ir_generation::application::{generate_file_ir, FileInput};
use crate::features::ir_generation::infrastructure::polyglot::classify_polyglot_imports;
use crate::features::ir_generation::infrastructure::template_scanner::bind_template_slots;
use crate::features::parsing::infrastructure::{ParserLanguage, TreeSitterParser};
use crate::features::parsing::ports::ParserFrontend;
use crate::features::symbols::generate_unified_symbols;
use crate::features::type_resolution::infrastructure::{
    build_signatures, EnricherConfig, SelectiveTypeEnricher, TypeResolver,
};
use crate::features::type_resolution::ports::{LspTypePort, NoopLsp};
use crate::shared::cancellation::CancellationToken;
use crate::shared::models::{Diagnostic, IRDocument, Result};

/// Pipeline configuration
#[derive(Clone)]
pub struct PipelineConfig {
    pub repo_id: String,
    pub snapshot_id: String,
    /// Primary language for type enrichment
    pub language: String,
    pub enricher: EnricherConfig,
    pub lsp: Arc<dyn LspTypePort>,
}

impl PipelineConfig {
    pub fn new(repo_id: impl Into<String>, snapshot_id: impl Into<String>) -> Self {
        Self {
            repo_id: repo_id.into(),
            snapshot_id: snapshot_id.into(),
            language: "python".to_string(),
            enricher: EnricherConfig::default(),
            lsp: Arc::new(NoopLsp),
        }
    }
}

/// Build the complete IR document for a corpus of files (stages C1-C5;
/// the unified analyzer and templates run on demand afterwards).
pub fn build_corpus(
    config: &PipelineConfig,
    files: &[FileInput],
    cancel: &CancellationToken,
) -> Result<IRDocument> {
    cancel.check()?;

    // Deterministic order regardless of input order
    let mut sorted_files: Vec<&FileInput> = files.iter().collect();
    sorted_files.sort_by(|a, b| a.path.cmp(&b.path));

    let workers = num_cpus::get().min(sorted_files.len().max(1));
    tracing::info!(
        "pipeline: {} files across {} workers",
        sorted_files.len(),
        workers
    );

    // C1-C4 per file, parallel across files
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .map_err(|e| crate::shared::models::StratumError::internal(format!(
            "worker pool: {}",
            e
        )))?;

    let per_file: Vec<IRDocument> = pool.install(|| {
        sorted_files
            .par_iter()
            .map(|file| process_file(config, file, cancel))
            .collect()
    });

    cancel.check()?;

    // Deterministic merge in path order
    let mut document = IRDocument::new(config.repo_id.clone(), config.snapshot_id.clone());
    for file_document in per_file {
        document.absorb(file_document);
    }

    // Corpus-wide steps
    classify_polyglot_imports(&mut document);
    bind_template_slots(&mut document);
    build_interprocedural_edges(&mut document);
    generate_unified_symbols(&mut document, &config.repo_id, "0.0.0");

    // C5: bulk type enrichment
    cancel.check()?;
    let mut enricher = SelectiveTypeEnricher::new(Arc::clone(&config.lsp), config.enricher.clone());
    for file in &sorted_files {
        enricher.cache_source(&file.path, &file.source);
    }
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| crate::shared::models::StratumError::internal(format!("runtime: {}", e)))?;
    runtime.block_on(async {
        let mut documents = [&mut document];
        enricher.enrich_bulk(&mut documents, &config.language).await
    });

    // Canonical ordering: dense local_seq then documented sort keys
    document.assign_local_seq();
    document.enforce_total_ordering();
    Ok(document)
}

/// One file through C1 -> C4. Failures become diagnostics on an otherwise
/// empty per-file document.
fn process_file(config: &PipelineConfig, file: &FileInput, cancel: &CancellationToken) -> IRDocument {
    if cancel.is_cancelled() {
        return IRDocument::new(config.repo_id.clone(), config.snapshot_id.clone());
    }

    let extension = file.path.rsplit('.').next().unwrap_or_default();
    let language = ParserLanguage::from_extension(extension);

    // C1: parse once, reuse the tree for C2 and C3
    let tree = language.and_then(|language| {
        let mut parser = TreeSitterParser::for_language(language);
        match parser.parse(&file.source, &file.path) {
            Ok(tree) => Some(tree),
            Err(error) => {
                tracing::warn!("parse failed for {}: {}", file.path, error);
                None
            }
        }
    });

    // C2: structural IR
    let mut document =
        match generate_file_ir(&config.repo_id, &config.snapshot_id, file, tree.clone()) {
            Ok(document) => document,
            Err(error) => {
                let mut document =
                    IRDocument::new(config.repo_id.clone(), config.snapshot_id.clone());
                document.diagnostics.push(Diagnostic::error(
                    "ir_generation",
                    file.path.clone(),
                    error.to_string(),
                ));
                return document;
            }
        };

    // C3: flow graphs, DFG/SSA, expressions; C4 occurrences were emitted
    // with the structural pass
    if let Some(tree) = &tree {
        build_flow_graphs(&mut document, tree);
        build_data_flow(&mut document);
        lower_expressions(&mut document, tree);

        let mut resolver = TypeResolver::new(tree.language.clone());
        build_signatures(&mut document, &mut resolver);
        document.types = resolver.into_entities();
    }

    document
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::NodeKind;

    fn corpus() -> Vec<FileInput> {
        vec![
            FileInput {
                path: "api.py".into(),
                source: "def get_user_handler(user_id: int) -> User:\n    return db.query(user_id)\n".into(),
            },
            FileInput {
                path: "models.py".into(),
                source: "class User:\n    def __repr__(self):\n        return self.name\n".into(),
            },
        ]
    }

    #[test]
    fn test_corpus_build_end_to_end() {
        let config = PipelineConfig::new("repo", "snap1");
        let document = build_corpus(&config, &corpus(), &CancellationToken::new()).unwrap();

        assert!(document.nodes.iter().any(|n| n.kind == NodeKind::Function));
        assert!(document.nodes.iter().any(|n| n.kind == NodeKind::Class));
        assert!(!document.occurrences.is_empty());
        assert!(!document.signatures.is_empty());
        assert!(!document.unified_symbols.is_empty());
        assert!(!document.cfg_blocks.is_empty());
    }

    #[test]
    fn test_input_order_does_not_matter() {
        let config = PipelineConfig::new("repo", "snap1");
        let mut files = corpus();
        let mut first = build_corpus(&config, &files, &CancellationToken::new()).unwrap();
        files.reverse();
        let mut second = build_corpus(&config, &files, &CancellationToken::new()).unwrap();
        assert_eq!(
            first.to_canonical_json().unwrap(),
            second.to_canonical_json().unwrap()
        );
    }

    #[test]
    fn test_failing_file_does_not_abort_batch() {
        let config = PipelineConfig::new("repo", "snap1");
        let files = vec![
            FileInput {
                path: "bad.py".into(),
                source: "def broken(:\n".into(),
            },
            FileInput {
                path: "good.py".into(),
                source: "def fine():\n    pass\n".into(),
            },
        ];
        let document = build_corpus(&config, &files, &CancellationToken::new()).unwrap();
        assert!(document
            .nodes
            .iter()
            .any(|n| n.name.as_deref() == Some("fine")));
        assert!(!document.diagnostics.is_empty());
    }
}

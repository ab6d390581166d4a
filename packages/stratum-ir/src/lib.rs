/*
 * Stratum IR - layered code-analysis engine
 *
 * Feature-first architecture:
 * - shared/    : common models and contracts (Node, Edge, Span, envelopes)
 * - features/  : vertical slices (parsing -> ir -> flow -> dfg -> ssa ->
 *                pdg -> taint -> slicing -> cost -> query)
 * - pipeline/  : orchestration (corpus discovery, per-file stage chain)
 *
 * The pipeline ingests source trees, builds a layered queryable IR
 * (structural nodes/edges, CFG/DFG/SSA, expressions, occurrences,
 * template slots), and serves structured queries and analysis templates
 * over it. Determinism contract: identical inputs under an identical
 * verification snapshot serialize byte-identically after total ordering.
 */

#![allow(dead_code)] // Some analysis surfaces are consumed by downstream services only
#![allow(clippy::too_many_arguments)] // Analysis entry points carry full context
#![allow(clippy::type_complexity)]

pub mod features;
pub mod pipeline;
pub mod shared;

// Re-exports for the public API surface
pub use shared::cancellation::CancellationToken;
pub use shared::contracts::{
    Claim, Conclusion, EnvelopeBuilder, Escalation, Evidence, EvidenceDraft, EvidenceKind,
    Execution, Metrics, PagedResponse, PatchSet, QuerySpec, ResultEnvelope, VerificationSnapshot,
    Workspace,
};
pub use shared::models::{
    Edge, EdgeKind, IRDocument, Node, NodeKind, Span, StratumError, TaintFinding,
};

pub use features::ir_generation::application::{generate_file_ir, FileInput};
pub use features::query_engine::{QueryEngine, QueryOutcome};
pub use features::taint_analysis::application::{AnalyzerConfig, UnifiedAnalyzer};
pub use features::taint_analysis::domain::TaintMode;
pub use pipeline::{build_corpus, discover_files, PipelineConfig};

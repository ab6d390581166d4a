//! Contracts: the canonical output/input shapes shared with consumers

pub mod claim;
pub mod envelope;
pub mod error_envelope;
pub mod evidence;
pub mod pagination;
pub mod specs;
pub mod verification;

pub use claim::{Claim, ConfidenceBasis, ProofObligation, Severity};
pub use envelope::{Conclusion, EnvelopeBuilder, Escalation, Metrics, ResultEnvelope};
pub use error_envelope::{codes, ErrorEnvelope};
pub use evidence::{
    validate_evidence_claim_links, Evidence, EvidenceDraft, EvidenceKind, EvidenceLocation,
    Provenance,
};
pub use pagination::{
    decode_cursor, encode_cursor, PagedResponse, PaginationParams, ResultSummary,
};
pub use specs::{Limits, QuerySpec, Scope, SpecBody, SpecValidationError};
pub use verification::{
    AgentMetadata, Execution, ExecutionState, PatchSet, ReportedFinding, VerificationSnapshot,
    Workspace,
};

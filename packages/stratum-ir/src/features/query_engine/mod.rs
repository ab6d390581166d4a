//! C10: Query engine
//!
//! Spec validation/execution and the analysis templates. The per-document
//! index set itself lives on `IRDocument` (shared/models/document.rs).

pub mod application;
pub mod templates;

pub use application::{QueryEngine, QueryOutcome, SpecExecutionError};

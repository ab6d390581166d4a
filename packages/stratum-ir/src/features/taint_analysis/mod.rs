//! C6/C7/C9: Taint analysis
//!
//! Multi-mode taint (basic, path-sensitive, field-sensitive), YAML rule
//! compilation and execution, constraint validation with dominator-based
//! guards, and the unified analysis orchestrator.

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod rules;
pub mod validation;

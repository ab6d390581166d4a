//! Cost analysis infrastructure

pub mod analyzer;
pub mod complexity;

pub use analyzer::CostAnalyzer;

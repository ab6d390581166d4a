//! Taint analysis application layer

pub mod unified_analyzer;

pub use unified_analyzer::{
    AnalysisHandles, AnalyzerConfig, AnalyzerStats, UnifiedAnalyzer,
};

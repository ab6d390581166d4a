//! Pipeline orchestration

pub mod corpus;
pub mod processor;

pub use corpus::discover_files;
pub use processor::{build_corpus, PipelineConfig};

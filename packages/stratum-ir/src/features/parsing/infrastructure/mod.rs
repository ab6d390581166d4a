//! Parsing infrastructure

mod tree_sitter_parser;

pub use tree_sitter_parser::{ParserLanguage, TreeSitterParser};

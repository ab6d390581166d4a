//! Parsing ports

use crate::features::parsing::domain::ParsedTree;
use crate::shared::models::Result;

/// Per-language parser frontend
pub trait ParserFrontend {
    fn parse(&mut self, source: &str, file_path: &str) -> Result<ParsedTree>;

    /// Re-parse after an edit, reusing the previous tree for the file when
    /// one is cached
    fn parse_incremental(
        &mut self,
        old_source: &str,
        new_source: &str,
        file_path: &str,
    ) -> Result<ParsedTree>;

    fn supports_extension(&self, ext: &str) -> bool;

    fn language_name(&self) -> &'static str;
}

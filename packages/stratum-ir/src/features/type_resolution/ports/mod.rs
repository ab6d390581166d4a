//! Type resolution ports

use async_trait::async_trait;

/// Type info returned by an external language server
#[derive(Debug, Clone)]
pub struct LspTypeInfo {
    pub type_string: String,
    pub documentation: Option<String>,
    pub signature: Option<String>,
    pub is_nullable: bool,
    pub is_union: bool,
}

/// External language server used as the last-resort type source.
///
/// Queries are hover-style: (language, file, 1-based line, 0-based column
/// of the symbol name).
#[async_trait]
pub trait LspTypePort: Send + Sync {
    async fn get_type_info(
        &self,
        language: &str,
        file_path: &str,
        line: u32,
        column: u32,
    ) -> Option<LspTypeInfo>;

    fn is_language_supported(&self, language: &str) -> bool;
}

/// Disabled LSP: every query misses. The enricher then relies entirely on
/// the local fallback chain.
#[derive(Debug, Default)]
pub struct NoopLsp;

#[async_trait]
impl LspTypePort for NoopLsp {
    async fn get_type_info(
        &self,
        _language: &str,
        _file_path: &str,
        _line: u32,
        _column: u32,
    ) -> Option<LspTypeInfo> {
        None
    }

    fn is_language_supported(&self, _language: &str) -> bool {
        true
    }
}

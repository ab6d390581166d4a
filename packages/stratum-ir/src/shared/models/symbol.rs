//! Cross-language unified symbols and package metadata

use serde::{Deserialize, Serialize};

/// SCIP-style unified symbol
///
/// Canonical form: `scheme-<lang> <package> <version> <root> <descriptor>`
/// where the descriptor suffix is `()` for functions, `#` for
/// classes/interfaces/enums, `.` otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnifiedSymbol {
    pub symbol: String,
    pub language: String,
    /// Node id this symbol resolves to, when local
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    pub package: String,
    pub descriptor: String,
}

/// Package metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageMetadata {
    pub name: String,
    pub version: String,
    pub manager: String,
    pub language: String,
}

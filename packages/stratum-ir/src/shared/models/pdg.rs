//! Program Dependence Graph record types
//!
//! Serializable node/edge records stored on the document. The traversable
//! petgraph-backed structure lives in the pdg feature.

use serde::{Deserialize, Serialize};

use super::span::Span;

/// Dependency type in the PDG
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DependencyType {
    Control,
    Data,
}

impl DependencyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyType::Control => "CONTROL",
            DependencyType::Data => "DATA",
        }
    }
}

/// PDG node: one per function-level statement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdgNode {
    pub node_id: String,
    pub statement: String,
    pub line_number: u32,
    pub span: Span,
    pub defined_vars: Vec<String>,
    pub used_vars: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
}

impl PdgNode {
    pub fn new(node_id: impl Into<String>, statement: impl Into<String>, line_number: u32, span: Span) -> Self {
        Self {
            node_id: node_id.into(),
            statement: statement.into(),
            line_number,
            span,
            defined_vars: Vec::new(),
            used_vars: Vec::new(),
            file_path: None,
        }
    }

    pub fn with_file(mut self, file_path: impl Into<String>) -> Self {
        self.file_path = Some(file_path.into());
        self
    }
}

/// PDG edge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdgEdge {
    pub from_node: String,
    pub to_node: String,
    pub dependency_type: DependencyType,
    /// Variable name for data deps, condition label for control deps
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl PdgEdge {
    pub fn data(from: impl Into<String>, to: impl Into<String>, variable: impl Into<String>) -> Self {
        Self {
            from_node: from.into(),
            to_node: to.into(),
            dependency_type: DependencyType::Data,
            label: Some(variable.into()),
        }
    }

    pub fn control(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from_node: from.into(),
            to_node: to.into(),
            dependency_type: DependencyType::Control,
            label: Some("call".to_string()),
        }
    }
}

//! Unified error type for the stratum-ir crate
//!
//! Every pipeline stage reports through `StratumError` with a categorized
//! kind, optional file/line context and a chained source error.

use std::fmt;

/// Error kind categorization, one per pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Parse,
    IrGeneration,
    FlowAnalysis,
    TypeResolution,
    DataFlow,
    Ssa,
    Pdg,
    TaintAnalysis,
    Slicing,
    CostAnalysis,
    Query,
    Validation,
    Config,
    Io,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Parse => "parse",
            ErrorKind::IrGeneration => "ir_generation",
            ErrorKind::FlowAnalysis => "flow_analysis",
            ErrorKind::TypeResolution => "type_resolution",
            ErrorKind::DataFlow => "data_flow",
            ErrorKind::Ssa => "ssa",
            ErrorKind::Pdg => "pdg",
            ErrorKind::TaintAnalysis => "taint_analysis",
            ErrorKind::Slicing => "slicing",
            ErrorKind::CostAnalysis => "cost_analysis",
            ErrorKind::Query => "query",
            ErrorKind::Validation => "validation",
            ErrorKind::Config => "config",
            ErrorKind::Io => "io",
            ErrorKind::Internal => "internal",
        }
    }
}

/// Unified error type
#[derive(Debug)]
pub struct StratumError {
    pub kind: ErrorKind,
    pub message: String,
    pub file_path: Option<String>,
    pub line: Option<u32>,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl StratumError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            file_path: None,
            line: None,
            source: None,
        }
    }

    pub fn with_file(mut self, file_path: impl Into<String>) -> Self {
        self.file_path = Some(file_path.into());
        self
    }

    pub fn with_line(mut self, line: u32) -> Self {
        self.line = Some(line);
        self
    }

    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Parse, message)
    }

    pub fn ir_generation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::IrGeneration, message)
    }

    pub fn flow_analysis(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::FlowAnalysis, message)
    }

    pub fn type_resolution(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeResolution, message)
    }

    pub fn data_flow(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DataFlow, message)
    }

    pub fn ssa(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Ssa, message)
    }

    pub fn pdg(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Pdg, message)
    }

    pub fn taint(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TaintAnalysis, message)
    }

    pub fn cost(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::CostAnalysis, message)
    }

    pub fn query(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Query, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Io, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}

impl fmt::Display for StratumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind.as_str(), self.message)?;
        if let Some(ref file) = self.file_path {
            write!(f, " in {}", file)?;
            if let Some(line) = self.line {
                write!(f, ":{}", line)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for StratumError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, StratumError>;

impl From<std::io::Error> for StratumError {
    fn from(err: std::io::Error) -> Self {
        StratumError::io(format!("IO error: {}", err)).with_source(err)
    }
}

impl From<serde_json::Error> for StratumError {
    fn from(err: serde_json::Error) -> Self {
        StratumError::internal(format!("JSON serialization error: {}", err)).with_source(err)
    }
}

impl From<serde_yaml::Error> for StratumError {
    fn from(err: serde_yaml::Error) -> Self {
        StratumError::config(format!("YAML error: {}", err)).with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StratumError::parse("unexpected token")
            .with_file("test.py")
            .with_line(42);

        let msg = format!("{}", err);
        assert!(msg.contains("parse"));
        assert!(msg.contains("unexpected token"));
        assert!(msg.contains("test.py"));
        assert!(msg.contains("42"));
    }

    #[test]
    fn test_kind_strings() {
        assert_eq!(ErrorKind::TaintAnalysis.as_str(), "taint_analysis");
        assert_eq!(ErrorKind::CostAnalysis.as_str(), "cost_analysis");
    }
}

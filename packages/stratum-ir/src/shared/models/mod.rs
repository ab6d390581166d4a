//! Shared models
//!
//! Types used across multiple features live here to avoid circular feature
//! dependencies.

pub mod attrs;
mod bfg;
mod cfg;
mod dfg;
mod diagnostic;
mod document;
mod dominator;
mod edge;
mod error;
pub mod expression;
mod interprocedural;
mod node;
pub mod occurrence;
mod pdg;
mod span;
mod symbol;
mod taint;
pub mod template;
pub mod type_entities;

pub use attrs::{AttrAccess, AttrMap, AttrValue};
pub use bfg::{BfgBlock, BfgGraph};
pub use cfg::{CfgBlock, CfgBlockKind, CfgEdge, CfgEdgeKind, ControlFlowGraph};
pub use dfg::{DfgEdge, DfgEvent, DfgEventKind, DfgSnapshot, DfgVariable, PhiNode, SsaContext};
pub use diagnostic::{Diagnostic, DiagnosticSeverity};
pub use document::{DocumentIndexes, IRDocument, SCHEMA_VERSION};
pub use dominator::DominatorTree;
pub use edge::{Edge, EdgeKind};
pub use error::{ErrorKind, Result, StratumError};
pub use expression::{ExprId, ExprKind, Expression, ExpressionArena};
pub use interprocedural::{InterproceduralEdge, InterproceduralEdgeKind};
pub use node::{ControlFlowSummary, Node, NodeKind};
pub use occurrence::{Occurrence, OccurrenceGenerator, OccurrenceIndex, SymbolRole, SymbolRoles};
pub use pdg::{DependencyType, PdgEdge, PdgNode};
pub use span::{Location, Span};
pub use symbol::{PackageMetadata, UnifiedSymbol};
pub use taint::{FindingSeverity, TaintFinding};
pub use template::{SlotContextKind, TemplateElement, TemplateSlot};
pub use type_entities::{SignatureEntity, TypeEntity, TypeInterner};

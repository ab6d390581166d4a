//! C2: Structural IR generator
//!
//! Per-language visitors producing nodes and edges with stable hash ids.

pub mod application;
pub mod domain;
pub mod infrastructure;

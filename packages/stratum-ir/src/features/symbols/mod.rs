//! C4: Occurrence & symbol layer
//!
//! SCIP-style descriptors and the cross-language symbol bridge.
//! Occurrence generation itself lives in shared/models (emitted alongside
//! nodes and edges for performance).

pub mod bridge;
pub mod scip;

pub use bridge::{bridge_type, BridgeDirection};
pub use scip::{format_descriptor, format_symbol, generate_unified_symbols};

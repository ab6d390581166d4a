//! C3/C5: Type resolution, signatures and enrichment

pub mod domain;
pub mod infrastructure;
pub mod ports;

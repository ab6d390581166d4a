//! C6: Program dependence graph

pub mod infrastructure;

//! SSA infrastructure

pub mod dominator;
pub mod ssa_builder;

pub use dominator::compute_dominator_tree;
pub use ssa_builder::{SsaBuilder, SsaResult};

//! PDG infrastructure

pub mod pdg_builder;
pub mod pdg_graph;

pub use pdg_builder::build_pdg;
pub use pdg_graph::ProgramDependenceGraph;

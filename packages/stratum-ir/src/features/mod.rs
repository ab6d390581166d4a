//! Feature modules (pipeline stages and analyses)

pub mod cost_analysis;
pub mod data_flow;
pub mod expression_builder;
pub mod flow_graph;
pub mod incremental;
pub mod interprocedural;
pub mod ir_generation;
pub mod parsing;
pub mod pdg;
pub mod query_engine;
pub mod slicing;
pub mod ssa;
pub mod symbols;
pub mod taint_analysis;
pub mod type_resolution;
pub mod workspace;

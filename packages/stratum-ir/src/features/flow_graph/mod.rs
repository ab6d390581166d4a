//! C3: Control flow graphs

pub mod application;
pub mod infrastructure;

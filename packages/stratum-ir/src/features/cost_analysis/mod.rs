//! C8: Cost / complexity inference

pub mod domain;
pub mod infrastructure;

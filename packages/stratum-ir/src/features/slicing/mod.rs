//! C6: Program slicing

pub mod infrastructure;

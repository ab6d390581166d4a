//! C3: SSA form and dominator analysis

pub mod infrastructure;

//! C9: Constraint validation and guard detection

pub mod constraint_validator;
pub mod guard_detector;

pub use constraint_validator::{ConstraintValidator, ConstraintValue, ValidationStats};
pub use guard_detector::{Guard, GuardDetector};

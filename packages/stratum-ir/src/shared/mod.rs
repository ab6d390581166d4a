//! Shared models, contracts and utilities

pub mod cancellation;
pub mod contracts;
pub mod models;

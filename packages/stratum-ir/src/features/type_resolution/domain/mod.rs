//! Type resolution domain

pub mod builtin_registry;

pub use builtin_registry::BuiltinMethodRegistry;

//! Type resolution infrastructure

pub mod signature_builder;
pub mod type_enricher;
pub mod type_resolver;

pub use signature_builder::build_signatures;
pub use type_enricher::{
    is_public_api, EnricherConfig, EnrichmentStats, SelectiveTypeEnricher, TypeSource,
};
pub use type_resolver::TypeResolver;

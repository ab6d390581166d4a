//! Textual type annotation resolution
//!
//! Resolves raw annotation text against the module's import table to an
//! interned TypeEntity id. Results are cached per (language, raw text)
//! inside the interner.

use std::collections::HashMap;

use crate::shared::models::{TypeInterner, TypeEntity};

pub struct TypeResolver {
    interner: TypeInterner,
    /// local alias -> imported module/type path
    import_table: HashMap<String, String>,
    language: String,
}

impl TypeResolver {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            interner: TypeInterner::new(),
            import_table: HashMap::new(),
            language: language.into(),
        }
    }

    /// Register an import binding (`from models import User` ->
    /// `User -> models.User`)
    pub fn register_import(&mut self, local_name: impl Into<String>, target: impl Into<String>) {
        self.import_table.insert(local_name.into(), target.into());
    }

    /// Resolve a raw annotation to a TypeEntity id.
    pub fn resolve(&mut self, raw: &str) -> String {
        let expanded = self.expand_imports(raw.trim());
        self.interner.intern(&self.language, &expanded)
    }

    pub fn get(&self, id: &str) -> Option<&TypeEntity> {
        self.interner.get(id)
    }

    pub fn into_entities(self) -> Vec<TypeEntity> {
        self.interner.entities().to_vec()
    }

    /// Qualify the base name through the import table; generic parameters
    /// stay as written.
    fn expand_imports(&self, raw: &str) -> String {
        let base_end = raw.find(['[', '<']).unwrap_or(raw.len());
        let base = &raw[..base_end];
        match self.import_table.get(base.trim()) {
            Some(target) => format!("{}{}", target, &raw[base_end..]),
            None => raw.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_caches_by_raw_text() {
        let mut resolver = TypeResolver::new("python");
        let a = resolver.resolve("list[User]");
        let b = resolver.resolve("list[User]");
        assert_eq!(a, b);
    }

    #[test]
    fn test_import_expansion() {
        let mut resolver = TypeResolver::new("python");
        resolver.register_import("User", "app.models.User");
        let id = resolver.resolve("User");
        assert_eq!(resolver.get(&id).unwrap().display, "app.models.User");

        let generic_id = resolver.resolve("Optional[int]");
        assert!(resolver.get(&generic_id).unwrap().is_nullable);
    }
}

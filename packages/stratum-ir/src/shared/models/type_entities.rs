//! Type and signature entities
//!
//! Interned and referenced by id from nodes. Immutable after construction.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Resolved type entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeEntity {
    pub id: String,
    /// Raw annotation text as written (`list[User]`, `Optional[str]`)
    pub raw: String,
    /// Normalized display form
    pub display: String,
    pub language: String,
    pub is_nullable: bool,
    /// Generic parameters, outermost level
    pub type_params: Vec<String>,
}

/// Function signature entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureEntity {
    pub id: String,
    /// Parameter type entity ids, in declaration order (None = unannotated)
    pub param_type_ids: Vec<Option<String>>,
    pub return_type_id: Option<String>,
    pub is_async: bool,
    pub is_variadic: bool,
}

/// Interner for type entities, keyed by (language, raw text)
#[derive(Debug, Default)]
pub struct TypeInterner {
    by_key: HashMap<(String, String), String>,
    entities: Vec<TypeEntity>,
}

impl TypeInterner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a raw annotation, returning the entity id
    pub fn intern(&mut self, language: &str, raw: &str) -> String {
        let key = (language.to_string(), raw.to_string());
        if let Some(id) = self.by_key.get(&key) {
            return id.clone();
        }

        let id = format!("type:{}", self.entities.len());
        let (display, is_nullable, type_params) = Self::normalize(raw);
        self.entities.push(TypeEntity {
            id: id.clone(),
            raw: raw.to_string(),
            display,
            language: language.to_string(),
            is_nullable,
            type_params,
        });
        self.by_key.insert(key, id.clone());
        id
    }

    pub fn get(&self, id: &str) -> Option<&TypeEntity> {
        let idx: usize = id.strip_prefix("type:")?.parse().ok()?;
        self.entities.get(idx)
    }

    pub fn entities(&self) -> &[TypeEntity] {
        &self.entities
    }

    fn normalize(raw: &str) -> (String, bool, Vec<String>) {
        let trimmed = raw.trim();

        // Optional[T] / T | None
        let is_nullable = trimmed.starts_with("Optional[")
            || trimmed.ends_with("| None")
            || trimmed.ends_with("|None");

        let type_params = Self::outer_params(trimmed);
        (trimmed.to_string(), is_nullable, type_params)
    }

    /// Outermost generic parameters of `Base[A, B]` / `Base<A, B>`
    fn outer_params(text: &str) -> Vec<String> {
        let open = text.find(['[', '<']);
        let Some(start) = open else {
            return Vec::new();
        };
        let close = text.rfind([']', '>']);
        let Some(end) = close else {
            return Vec::new();
        };
        if end <= start + 1 {
            return Vec::new();
        }

        let inner = &text[start + 1..end];
        let mut params = Vec::new();
        let mut depth = 0usize;
        let mut current = String::new();
        for ch in inner.chars() {
            match ch {
                '[' | '<' => {
                    depth += 1;
                    current.push(ch);
                }
                ']' | '>' => {
                    depth = depth.saturating_sub(1);
                    current.push(ch);
                }
                ',' if depth == 0 => {
                    params.push(current.trim().to_string());
                    current.clear();
                }
                _ => current.push(ch),
            }
        }
        if !current.trim().is_empty() {
            params.push(current.trim().to_string());
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_caches_by_language_and_raw() {
        let mut interner = TypeInterner::new();
        let a = interner.intern("python", "list[User]");
        let b = interner.intern("python", "list[User]");
        let c = interner.intern("typescript", "list[User]");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_nullable_detection() {
        let mut interner = TypeInterner::new();
        let id = interner.intern("python", "Optional[str]");
        assert!(interner.get(&id).unwrap().is_nullable);
        let id2 = interner.intern("python", "str | None");
        assert!(interner.get(&id2).unwrap().is_nullable);
    }

    #[test]
    fn test_outer_params_nested() {
        let mut interner = TypeInterner::new();
        let id = interner.intern("python", "dict[str, list[int]]");
        let entity = interner.get(&id).unwrap();
        assert_eq!(entity.type_params, vec!["str", "list[int]"]);
    }
}

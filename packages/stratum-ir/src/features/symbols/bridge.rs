//! Cross-language symbol bridge
//!
//! Static builtin mapping plus recursive generic-type rewrite rules:
//! `list[T] <-> java.util.List<map(T)>`, `dict[K,V]`, `Optional[T]`.
//! User-defined types are preserved verbatim.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Language pair for a bridge direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BridgeDirection {
    PythonToJava,
    JavaToPython,
    PythonToTypeScript,
}

static PY_TO_JAVA: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("str", "String"),
        ("int", "int"),
        ("float", "double"),
        ("bool", "boolean"),
        ("bytes", "byte[]"),
        ("None", "void"),
        ("object", "Object"),
    ])
});

static JAVA_TO_PY: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("String", "str"),
        ("int", "int"),
        ("long", "int"),
        ("double", "float"),
        ("boolean", "bool"),
        ("void", "None"),
        ("Object", "object"),
    ])
});

static PY_TO_TS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("str", "string"),
        ("int", "number"),
        ("float", "number"),
        ("bool", "boolean"),
        ("None", "null"),
    ])
});

/// Map a type expression across languages, rewriting generics recursively.
pub fn bridge_type(type_text: &str, direction: BridgeDirection) -> String {
    let trimmed = type_text.trim();

    match direction {
        BridgeDirection::PythonToJava => {
            if let Some(inner) = generic_inner(trimmed, "list") {
                return format!("java.util.List<{}>", bridge_type(inner, direction));
            }
            if let Some(inner) = generic_inner(trimmed, "dict") {
                let (key, value) = split_two(inner);
                return format!(
                    "java.util.Map<{},{}>",
                    bridge_type(key, direction),
                    bridge_type(value, direction)
                );
            }
            if let Some(inner) = generic_inner(trimmed, "set") {
                return format!("java.util.Set<{}>", bridge_type(inner, direction));
            }
            if let Some(inner) = generic_inner(trimmed, "Optional") {
                return format!("java.util.Optional<{}>", bridge_type(inner, direction));
            }
            PY_TO_JAVA
                .get(trimmed)
                .map(|m| m.to_string())
                .unwrap_or_else(|| trimmed.to_string())
        }
        BridgeDirection::JavaToPython => {
            if let Some(inner) = generic_inner(trimmed, "java.util.List") {
                return format!("list[{}]", bridge_type(inner, direction));
            }
            if let Some(inner) = generic_inner(trimmed, "java.util.Map") {
                let (key, value) = split_two(inner);
                return format!(
                    "dict[{}, {}]",
                    bridge_type(key, direction),
                    bridge_type(value, direction)
                );
            }
            if let Some(inner) = generic_inner(trimmed, "java.util.Optional") {
                return format!("Optional[{}]", bridge_type(inner, direction));
            }
            JAVA_TO_PY
                .get(trimmed)
                .map(|m| m.to_string())
                .unwrap_or_else(|| trimmed.to_string())
        }
        BridgeDirection::PythonToTypeScript => {
            if let Some(inner) = generic_inner(trimmed, "list") {
                return format!("{}[]", bridge_type(inner, direction));
            }
            if let Some(inner) = generic_inner(trimmed, "dict") {
                let (key, value) = split_two(inner);
                return format!(
                    "Record<{}, {}>",
                    bridge_type(key, direction),
                    bridge_type(value, direction)
                );
            }
            if let Some(inner) = generic_inner(trimmed, "Optional") {
                return format!("{} | null", bridge_type(inner, direction));
            }
            PY_TO_TS
                .get(trimmed)
                .map(|m| m.to_string())
                .unwrap_or_else(|| trimmed.to_string())
        }
    }
}

/// `base[inner]` or `base<inner>` -> inner
fn generic_inner<'a>(text: &'a str, base: &str) -> Option<&'a str> {
    for (open, close) in [('[', ']'), ('<', '>')] {
        let prefix_len = base.len();
        if text.len() > prefix_len + 1
            && text.starts_with(base)
            && text.as_bytes()[prefix_len] == open as u8
            && text.ends_with(close)
        {
            return Some(&text[prefix_len + 1..text.len() - 1]);
        }
    }
    None
}

/// Split `K, V` at the top nesting level
fn split_two(inner: &str) -> (&str, &str) {
    let mut depth = 0usize;
    for (i, ch) in inner.char_indices() {
        match ch {
            '[' | '<' => depth += 1,
            ']' | '>' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                return (inner[..i].trim(), inner[i + 1..].trim());
            }
            _ => {}
        }
    }
    (inner.trim(), "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_generic_rewrites() {
        assert_eq!(
            bridge_type("list[User]", BridgeDirection::PythonToJava),
            "java.util.List<User>"
        );
        assert_eq!(
            bridge_type("Optional[str]", BridgeDirection::PythonToJava),
            "java.util.Optional<String>"
        );
        assert_eq!(
            bridge_type("dict[str, int]", BridgeDirection::PythonToJava),
            "java.util.Map<String,int>"
        );
    }

    #[test]
    fn test_user_type_preserved() {
        assert_eq!(bridge_type("User", BridgeDirection::PythonToJava), "User");
        assert_eq!(
            bridge_type("OrderService", BridgeDirection::JavaToPython),
            "OrderService"
        );
    }

    #[test]
    fn test_recursive_rewrite() {
        assert_eq!(
            bridge_type("list[list[str]]", BridgeDirection::PythonToJava),
            "java.util.List<java.util.List<String>>"
        );
        assert_eq!(
            bridge_type("dict[str, list[User]]", BridgeDirection::PythonToJava),
            "java.util.Map<String,java.util.List<User>>"
        );
    }

    #[test]
    fn test_reverse_direction() {
        assert_eq!(
            bridge_type("java.util.List<String>", BridgeDirection::JavaToPython),
            "list[str]"
        );
        assert_eq!(
            bridge_type("java.util.Optional<String>", BridgeDirection::JavaToPython),
            "Optional[str]"
        );
    }

    #[test]
    fn test_typescript_direction() {
        assert_eq!(
            bridge_type("list[int]", BridgeDirection::PythonToTypeScript),
            "number[]"
        );
        assert_eq!(
            bridge_type("Optional[str]", BridgeDirection::PythonToTypeScript),
            "string | null"
        );
    }
}

//! Tagged attribute values
//!
//! Node/Edge/Expression attribute bags are heterogeneous. Instead of raw
//! JSON values everywhere, attrs use a closed tagged type so callers go
//! through accessors that validate the tag. `AttrMap` is a BTreeMap so
//! serialized attrs iterate in key order (total-ordering requirement).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Attribute map attached to nodes, edges and expressions
pub type AttrMap = BTreeMap<String, AttrValue>;

/// Tagged attribute value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<AttrValue>),
    Map(BTreeMap<String, AttrValue>),
}

impl AttrValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttrValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            AttrValue::Float(f) => Some(*f),
            AttrValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[AttrValue]> {
        match self {
            AttrValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, AttrValue>> {
        match self {
            AttrValue::Map(m) => Some(m),
            _ => None,
        }
    }

    /// List of strings, dropping non-string entries
    pub fn as_str_list(&self) -> Vec<&str> {
        match self {
            AttrValue::List(items) => items.iter().filter_map(|v| v.as_str()).collect(),
            _ => Vec::new(),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Str(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::Str(s)
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        AttrValue::Bool(b)
    }
}

impl From<i64> for AttrValue {
    fn from(i: i64) -> Self {
        AttrValue::Int(i)
    }
}

impl From<f64> for AttrValue {
    fn from(f: f64) -> Self {
        AttrValue::Float(f)
    }
}

impl From<Vec<String>> for AttrValue {
    fn from(items: Vec<String>) -> Self {
        AttrValue::List(items.into_iter().map(AttrValue::Str).collect())
    }
}

/// Typed accessors over an attr map
pub trait AttrAccess {
    fn get_str(&self, key: &str) -> Option<&str>;
    fn get_bool(&self, key: &str) -> Option<bool>;
    fn get_int(&self, key: &str) -> Option<i64>;
    fn get_list(&self, key: &str) -> Option<&[AttrValue]>;
    fn get_map(&self, key: &str) -> Option<&BTreeMap<String, AttrValue>>;
}

impl AttrAccess for AttrMap {
    fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(|v| v.as_str())
    }

    fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| v.as_bool())
    }

    fn get_int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|v| v.as_int())
    }

    fn get_list(&self, key: &str) -> Option<&[AttrValue]> {
        self.get(key).and_then(|v| v.as_list())
    }

    fn get_map(&self, key: &str) -> Option<&BTreeMap<String, AttrValue>> {
        self.get(key).and_then(|v| v.as_map())
    }
}

/// Well-known attr keys shared across layers
pub mod keys {
    pub const DECORATORS: &str = "decorators";
    pub const GENERICS: &str = "generics";
    pub const RETURN_TYPE: &str = "return_type";
    pub const TYPE_INFO: &str = "type_info";
    pub const IS_ASYNC: &str = "is_async";
    pub const USES_HOOKS: &str = "uses_hooks";
    pub const BODY_STATEMENTS: &str = "body_statements";
    pub const EXCEPTION_HANDLING: &str = "exception_handling";
    pub const RECEIVER_TYPE: &str = "receiver_type";
    pub const CALLEE_NAME: &str = "callee_name";
    pub const METHOD_NAME: &str = "method_name";
    pub const ATTR_NAME: &str = "attr_name";
    pub const ARG_EXPR_IDS: &str = "arg_expr_ids";
    pub const CALL_KWARGS: &str = "call_kwargs";
    pub const OPERATOR: &str = "operator";
    pub const VALUE: &str = "value";
    pub const VALUE_TYPE: &str = "value_type";
    pub const VAR_NAME: &str = "var_name";
    pub const NAME: &str = "name";
    pub const SCOPE: &str = "scope";
    pub const BLOCK_ID: &str = "block_id";
    pub const ENRICHED_TYPE: &str = "enriched_type";
    pub const TYPE_SOURCE: &str = "type_source";
    pub const TYPE_ENHANCED: &str = "type_enhanced";
    pub const OCCURRENCE: &str = "occurrence";
    pub const IS_EXPORTED: &str = "is_exported";
    pub const FROM_PARAMETER: &str = "from_parameter";
    pub const IS_GLOBAL: &str = "is_global";
}

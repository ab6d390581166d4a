//! Builtin method return-type registry
//!
//! `(receiver_type, method_name) -> return_type` for the common builtin
//! types, plus return types for builtin functions. Lookup is O(1) and
//! never touches a language server.

use once_cell::sync::Lazy;
use std::collections::HashMap;

static METHOD_RETURNS: Lazy<HashMap<(&'static str, &'static str), &'static str>> =
    Lazy::new(|| {
        HashMap::from([
            // str
            (("str", "upper"), "str"),
            (("str", "lower"), "str"),
            (("str", "strip"), "str"),
            (("str", "lstrip"), "str"),
            (("str", "rstrip"), "str"),
            (("str", "replace"), "str"),
            (("str", "join"), "str"),
            (("str", "format"), "str"),
            (("str", "split"), "list[str]"),
            (("str", "splitlines"), "list[str]"),
            (("str", "startswith"), "bool"),
            (("str", "endswith"), "bool"),
            (("str", "find"), "int"),
            (("str", "index"), "int"),
            (("str", "count"), "int"),
            (("str", "encode"), "bytes"),
            (("str", "isdigit"), "bool"),
            (("str", "isalpha"), "bool"),
            // list
            (("list", "append"), "None"),
            (("list", "extend"), "None"),
            (("list", "insert"), "None"),
            (("list", "remove"), "None"),
            (("list", "pop"), "Any"),
            (("list", "clear"), "None"),
            (("list", "index"), "int"),
            (("list", "count"), "int"),
            (("list", "sort"), "None"),
            (("list", "reverse"), "None"),
            (("list", "copy"), "list"),
            // dict
            (("dict", "get"), "Any"),
            (("dict", "keys"), "KeysView"),
            (("dict", "values"), "ValuesView"),
            (("dict", "items"), "ItemsView"),
            (("dict", "pop"), "Any"),
            (("dict", "update"), "None"),
            (("dict", "setdefault"), "Any"),
            (("dict", "clear"), "None"),
            (("dict", "copy"), "dict"),
            // set
            (("set", "add"), "None"),
            (("set", "discard"), "None"),
            (("set", "union"), "set"),
            (("set", "intersection"), "set"),
            (("set", "issubset"), "bool"),
            // bytes
            (("bytes", "decode"), "str"),
            (("bytes", "hex"), "str"),
        ])
    });

static FUNCTION_RETURNS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("len", "int"),
        ("abs", "int"),
        ("min", "Any"),
        ("max", "Any"),
        ("sum", "int"),
        ("sorted", "list"),
        ("reversed", "Iterator"),
        ("enumerate", "enumerate"),
        ("zip", "zip"),
        ("map", "map"),
        ("filter", "filter"),
        ("range", "range"),
        ("isinstance", "bool"),
        ("issubclass", "bool"),
        ("hasattr", "bool"),
        ("getattr", "Any"),
        ("repr", "str"),
        ("str", "str"),
        ("int", "int"),
        ("float", "float"),
        ("bool", "bool"),
        ("list", "list"),
        ("dict", "dict"),
        ("set", "set"),
        ("tuple", "tuple"),
        ("open", "IO"),
        ("print", "None"),
        ("id", "int"),
        ("hash", "int"),
        ("round", "int"),
        ("input", "str"),
    ])
});

#[derive(Debug, Default)]
pub struct BuiltinMethodRegistry;

impl BuiltinMethodRegistry {
    pub fn new() -> Self {
        Self
    }

    /// Return type of a method on a builtin receiver type
    pub fn method_return_type(&self, receiver_type: &str, method_name: &str) -> Option<&'static str> {
        // `list[str]` behaves as `list` for method dispatch
        let base = receiver_type.split(['[', '<']).next().unwrap_or(receiver_type);
        METHOD_RETURNS.get(&(base, method_name)).copied()
    }

    /// Return type of a builtin function
    pub fn function_return_type(&self, name: &str) -> Option<&'static str> {
        FUNCTION_RETURNS.get(name).copied()
    }

    pub fn is_builtin_function(&self, name: &str) -> bool {
        FUNCTION_RETURNS.contains_key(name)
    }
}

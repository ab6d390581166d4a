//! Signature construction
//!
//! Builds one SignatureEntity per callable node from its parameter nodes
//! and return-type attr, and attaches the signature id to the node.

use std::collections::HashMap;

use crate::features::type_resolution::infrastructure::type_resolver::TypeResolver;
use crate::shared::models::attrs::keys;
use crate::shared::models::{AttrAccess, AttrValue, IRDocument, NodeKind, SignatureEntity};

pub fn build_signatures(document: &mut IRDocument, resolver: &mut TypeResolver) {
    // Parameters grouped under their functions, in declaration order
    let mut params_by_function: HashMap<String, Vec<(u64, Option<String>, bool)>> = HashMap::new();
    for node in &document.nodes {
        if node.kind != NodeKind::Parameter {
            continue;
        }
        let Some(parent) = &node.parent_id else {
            continue;
        };
        let annotation = node.attrs.get_str("type_annotation").map(|s| s.to_string());
        let is_variadic = node
            .name
            .as_deref()
            .map(|n| n.starts_with('*'))
            .unwrap_or(false);
        params_by_function
            .entry(parent.clone())
            .or_default()
            .push((node.local_seq, annotation, is_variadic));
    }
    for params in params_by_function.values_mut() {
        params.sort_by_key(|(seq, _, _)| *seq);
    }

    let mut signatures = Vec::new();
    let mut signature_attr: Vec<(String, String)> = Vec::new();

    for node in &document.nodes {
        if !node.kind.is_callable() && node.kind != NodeKind::Method {
            continue;
        }

        let params = params_by_function.get(&node.id);
        let param_type_ids: Vec<Option<String>> = params
            .map(|params| {
                params
                    .iter()
                    .map(|(_, annotation, _)| {
                        annotation.as_ref().map(|a| resolver.resolve(a))
                    })
                    .collect()
            })
            .unwrap_or_default();
        let is_variadic = params
            .map(|params| params.iter().any(|(_, _, variadic)| *variadic))
            .unwrap_or(false);

        let return_type_id = node
            .attrs
            .get_str(keys::RETURN_TYPE)
            .map(|raw| resolver.resolve(raw));

        let is_async = node.attrs.get_bool(keys::IS_ASYNC).unwrap_or(false);

        let id = format!("sig:{}", node.id);
        signatures.push(SignatureEntity {
            id: id.clone(),
            param_type_ids,
            return_type_id,
            is_async,
            is_variadic,
        });
        signature_attr.push((node.id.clone(), id));
    }

    for (node_id, signature_id) in signature_attr {
        if let Some(node) = document.nodes.iter_mut().find(|n| n.id == node_id) {
            node.attrs
                .insert("signature_id".to_string(), AttrValue::from(signature_id));
        }
    }

    document.signatures = signatures;
}

//! Template slot extraction for markup files
//!
//! Scans jinja-style templates for `{{ expr }}` interpolations and
//! classifies each slot by rendering context. Slots in url-bearing
//! attributes or behind the `|safe` filter are sinks. Binds edges connect
//! source variables to the slots they render into.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::shared::models::{
    AttrMap, Edge, EdgeKind, IRDocument, Node, Span, SlotContextKind, TemplateSlot,
};

static INTERPOLATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*([^}]+?)\s*\}\}").unwrap());

static URL_ATTR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\b(?:href|src|action|formaction)\s*=\s*["']?$"#).unwrap());

static ATTR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"[\w-]+\s*=\s*["']?$"#).unwrap());

/// Scan one template file and append slots + Binds edges to the document.
pub fn scan_template(document: &mut IRDocument, file_path: &str, source: &str) {
    let mut slots: Vec<TemplateSlot> = Vec::new();

    for (line_idx, line) in source.lines().enumerate() {
        for captures in INTERPOLATION_RE.captures_iter(line) {
            let matched = captures.get(0).unwrap();
            let expression = captures.get(1).unwrap().as_str().trim();
            let col = matched.start() as u32;
            let line_number = line_idx as u32 + 1;

            let prefix = &line[..matched.start()];
            let context = classify_context(prefix, expression, line);

            let span = Span::new(line_number, col, line_number, matched.end() as u32);
            let slot = TemplateSlot::new(file_path, span, context)
                .with_expression(expression.to_string());
            slots.push(slot);
        }
    }

    if slots.is_empty() {
        return;
    }

    // Bind slots to source variables by name
    let mut binds: Vec<Edge> = Vec::new();
    for slot in &slots {
        let Some(expression) = &slot.expression_text else {
            continue;
        };
        let base_var = expression
            .split(['|', '.', '[', '(']).next()
            .unwrap_or(expression)
            .trim();
        if base_var.is_empty() {
            continue;
        }
        if let Some(source_node) = find_variable(&document.nodes, base_var) {
            let mut edge = Edge::new(
                format!("edge:bind:{}:{}", source_node.id, slot.slot_id),
                EdgeKind::Binds,
                source_node.id.clone(),
                slot.slot_id.clone(),
            )
            .with_attrs(AttrMap::new());
            edge.span = Some(slot.span);
            binds.push(edge);
        }
    }

    tracing::debug!(
        "template scan: {} slots, {} bindings in {}",
        slots.len(),
        binds.len(),
        file_path
    );
    document.template_slots.extend(slots);
    document.edges.extend(binds);
    document.invalidate_indexes();
}

/// Corpus-level binding pass: once documents merge, slots scanned from
/// template files can bind to variables defined in code files.
pub fn bind_template_slots(document: &mut IRDocument) {
    let bound_slots: std::collections::HashSet<String> = document
        .edges
        .iter()
        .filter(|e| e.kind == EdgeKind::Binds)
        .map(|e| e.target_id.clone())
        .collect();

    let mut binds: Vec<Edge> = Vec::new();
    for slot in &document.template_slots {
        if bound_slots.contains(&slot.slot_id) {
            continue;
        }
        let Some(expression) = &slot.expression_text else {
            continue;
        };
        let base_var = expression
            .split(['|', '.', '[', '(']).next()
            .unwrap_or(expression)
            .trim();
        if base_var.is_empty() {
            continue;
        }
        if let Some(source_node) = find_variable(&document.nodes, base_var) {
            let mut edge = Edge::new(
                format!("edge:bind:{}:{}", source_node.id, slot.slot_id),
                EdgeKind::Binds,
                source_node.id.clone(),
                slot.slot_id.clone(),
            );
            edge.span = Some(slot.span);
            binds.push(edge);
        }
    }

    if !binds.is_empty() {
        tracing::debug!("late template bindings: {}", binds.len());
        document.edges.extend(binds);
        document.invalidate_indexes();
    }
}

fn classify_context(prefix: &str, expression: &str, line: &str) -> SlotContextKind {
    // |safe disables escaping -> raw HTML sink
    if expression.contains("|safe") || expression.ends_with("| safe") {
        return SlotContextKind::RawHtml;
    }
    if URL_ATTR_RE.is_match(prefix) {
        return SlotContextKind::UrlAttr;
    }
    if in_script_block(line, prefix) {
        return SlotContextKind::ScriptLiteral;
    }
    if prefix.trim_end().ends_with("style=\"") || prefix.contains("<style") {
        return SlotContextKind::CssLiteral;
    }
    if ATTR_RE.is_match(prefix) {
        return SlotContextKind::Attr;
    }
    SlotContextKind::Text
}

fn in_script_block(line: &str, prefix: &str) -> bool {
    prefix.contains("<script") || (line.contains("<script") && !prefix.contains("</script"))
}

fn find_variable<'a>(nodes: &'a [Node], name: &str) -> Option<&'a Node> {
    nodes
        .iter()
        .find(|n| n.kind.is_symbol() && n.name.as_deref() == Some(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::NodeKind;

    #[test]
    fn test_text_and_raw_html_contexts() {
        let mut doc = IRDocument::new("r", "s");
        let source = "<p>{{ user_name }}</p>\n<div>{{ user_bio|safe }}</div>\n";
        scan_template(&mut doc, "profile.html", source);

        assert_eq!(doc.template_slots.len(), 2);
        assert_eq!(doc.template_slots[0].context_kind, SlotContextKind::Text);
        assert!(!doc.template_slots[0].is_sink);
        assert_eq!(doc.template_slots[1].context_kind, SlotContextKind::RawHtml);
        assert!(doc.template_slots[1].is_sink);
    }

    #[test]
    fn test_url_attr_context() {
        let mut doc = IRDocument::new("r", "s");
        scan_template(&mut doc, "a.html", "<a href=\"{{ target_url }}\">go</a>\n");
        assert_eq!(doc.template_slots[0].context_kind, SlotContextKind::UrlAttr);
        assert!(doc.template_slots[0].is_sink);
    }

    #[test]
    fn test_binds_edge_to_known_variable() {
        let mut doc = IRDocument::new("r", "s");
        doc.nodes.push(Node::new(
            "node:v".into(),
            NodeKind::Variable,
            "views.user_bio".into(),
            "views.py".into(),
            Span::new(3, 0, 3, 10),
            "python".into(),
        ));
        scan_template(&mut doc, "profile.html", "<div>{{ user_bio|safe }}</div>\n");

        let binds: Vec<&Edge> = doc.edges.iter().filter(|e| e.kind == EdgeKind::Binds).collect();
        assert_eq!(binds.len(), 1);
        assert_eq!(binds[0].source_id, "node:v");
        assert!(binds[0].target_id.starts_with("slot:profile.html:"));
    }

    #[test]
    fn test_slot_id_shape() {
        let mut doc = IRDocument::new("r", "s");
        scan_template(&mut doc, "x.html", "<p>{{ a }}</p>\n");
        assert_eq!(doc.template_slots[0].slot_id, "slot:x.html:1:3");
    }
}

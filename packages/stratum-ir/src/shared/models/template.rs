//! Template IR - markup interpolation slots
//!
//! A slot is a location in markup where a dynamic value is rendered; the
//! primary XSS analysis target. Slots connect to source variables through
//! Binds edges (slot is the edge target).

use serde::{Deserialize, Serialize};

use super::span::Span;

/// Rendering context of a template slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlotContextKind {
    Text,
    Attr,
    UrlAttr,
    ScriptLiteral,
    RawHtml,
    CssLiteral,
}

impl SlotContextKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotContextKind::Text => "text",
            SlotContextKind::Attr => "attr",
            SlotContextKind::UrlAttr => "url_attr",
            SlotContextKind::ScriptLiteral => "script_literal",
            SlotContextKind::RawHtml => "raw_html",
            SlotContextKind::CssLiteral => "css_literal",
        }
    }

    /// Contexts that are sinks without further escaping
    pub fn is_sink_context(&self) -> bool {
        matches!(
            self,
            SlotContextKind::RawHtml | SlotContextKind::UrlAttr | SlotContextKind::ScriptLiteral
        )
    }
}

/// Template slot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateSlot {
    /// `slot:<file>:<line>:<col>`
    pub slot_id: String,
    pub file_path: String,
    pub span: Span,
    pub context_kind: SlotContextKind,
    pub is_sink: bool,
    /// Source expression text as written in the template
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression_text: Option<String>,
}

impl TemplateSlot {
    pub fn new(file_path: impl Into<String>, span: Span, context_kind: SlotContextKind) -> Self {
        let file_path = file_path.into();
        let slot_id = format!("slot:{}:{}:{}", file_path, span.start_line, span.start_col);
        Self {
            slot_id,
            file_path,
            span,
            context_kind,
            is_sink: context_kind.is_sink_context(),
            expression_text: None,
        }
    }

    pub fn with_expression(mut self, text: impl Into<String>) -> Self {
        self.expression_text = Some(text.into());
        self
    }
}

/// Parsed template element (skeleton)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateElement {
    pub element_id: String,
    pub file_path: String,
    pub tag: String,
    pub span: Span,
    pub slot_ids: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_id_format() {
        let slot = TemplateSlot::new("profile.tsx", Span::new(42, 15, 42, 30), SlotContextKind::RawHtml);
        assert_eq!(slot.slot_id, "slot:profile.tsx:42:15");
        assert!(slot.is_sink);
    }

    #[test]
    fn test_text_context_not_sink() {
        let slot = TemplateSlot::new("a.html", Span::new(1, 0, 1, 5), SlotContextKind::Text);
        assert!(!slot.is_sink);
    }
}

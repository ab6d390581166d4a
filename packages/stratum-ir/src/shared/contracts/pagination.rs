//! Cursor-based pagination
//!
//! Every list-returning query uses `PagedResponse`. Cursors are opaque
//! URL-safe base64 strings encoding `offset[:timestamp]`. `total` is
//! optional; consumers must tolerate `None`.

use base64::Engine;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::shared::models::{Result, StratumError};

/// Summary of a large result set for LLM consumption
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultSummary {
    pub description: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub top_groups: BTreeMap<String, u64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub stats: BTreeMap<String, serde_json::Value>,
}

impl ResultSummary {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            top_groups: BTreeMap::new(),
            stats: BTreeMap::new(),
        }
    }
}

/// Paged response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResponse<T> {
    pub items: Vec<T>,
    /// None when the total is unknown
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    pub limit: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev_cursor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<ResultSummary>,
}

impl<T> PagedResponse<T> {
    pub fn has_more(&self) -> bool {
        self.next_cursor.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Page a full result set at `offset` with `limit` items per page
    pub fn page(items: Vec<T>, offset: usize, limit: usize) -> Self {
        let total = items.len() as u64;
        let end = (offset + limit).min(items.len());
        let page: Vec<T> = items
            .into_iter()
            .skip(offset)
            .take(limit)
            .collect();

        let next_cursor = if end < total as usize {
            Some(encode_cursor(end as u64, None))
        } else {
            None
        };
        let prev_cursor = if offset > 0 {
            Some(encode_cursor(offset.saturating_sub(limit) as u64, None))
        } else {
            None
        };

        Self {
            items: page,
            total: Some(total),
            limit: limit as u64,
            next_cursor,
            prev_cursor,
            summary: None,
        }
    }

    pub fn with_summary(mut self, summary: ResultSummary) -> Self {
        self.summary = Some(summary);
        self
    }
}

/// Pagination request parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationParams {
    #[serde(default = "default_limit")]
    pub limit: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    #[serde(default = "default_true")]
    pub summarize: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_by: Option<String>,
}

fn default_limit() -> u64 {
    50
}

fn default_true() -> bool {
    true
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            limit: 50,
            cursor: None,
            summarize: true,
            group_by: None,
        }
    }
}

/// Encode a cursor as URL-safe base64 over `offset[:timestamp]`
pub fn encode_cursor(offset: u64, timestamp: Option<&str>) -> String {
    let data = match timestamp {
        Some(ts) => format!("{}:{}", offset, ts),
        None => format!("{}", offset),
    };
    base64::engine::general_purpose::URL_SAFE.encode(data.as_bytes())
}

/// Decode a cursor back into `(offset, timestamp)`
pub fn decode_cursor(cursor: &str) -> Result<(u64, Option<String>)> {
    let bytes = base64::engine::general_purpose::URL_SAFE
        .decode(cursor.as_bytes())
        .map_err(|e| StratumError::validation(format!("invalid cursor: {}", e)))?;
    let data = String::from_utf8(bytes)
        .map_err(|e| StratumError::validation(format!("invalid cursor: {}", e)))?;

    let mut parts = data.splitn(2, ':');
    let offset: u64 = parts
        .next()
        .unwrap_or_default()
        .parse()
        .map_err(|_| StratumError::validation(format!("invalid cursor offset: {}", data)))?;
    let timestamp = parts.next().map(|s| s.to_string());
    Ok((offset, timestamp))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_roundtrip() {
        let cursor = encode_cursor(42, Some("2025-01-01"));
        let (offset, timestamp) = decode_cursor(&cursor).unwrap();
        assert_eq!(offset, 42);
        assert_eq!(timestamp.as_deref(), Some("2025-01-01"));
    }

    #[test]
    fn test_cursor_without_timestamp() {
        let cursor = encode_cursor(7, None);
        let (offset, timestamp) = decode_cursor(&cursor).unwrap();
        assert_eq!(offset, 7);
        assert!(timestamp.is_none());
    }

    #[test]
    fn test_invalid_cursor_rejected() {
        assert!(decode_cursor("!!not-base64!!").is_err());
    }

    #[test]
    fn test_paging() {
        let items: Vec<u32> = (0..10).collect();
        let page = PagedResponse::page(items, 0, 4);
        assert_eq!(page.items, vec![0, 1, 2, 3]);
        assert_eq!(page.total, Some(10));
        assert!(page.has_more());
        assert!(page.prev_cursor.is_none());

        let (next_offset, _) = decode_cursor(page.next_cursor.as_ref().unwrap()).unwrap();
        assert_eq!(next_offset, 4);

        let items: Vec<u32> = (0..10).collect();
        let last = PagedResponse::page(items, 8, 4);
        assert_eq!(last.items, vec![8, 9]);
        assert!(!last.has_more());
        assert!(last.prev_cursor.is_some());
    }
}

//! Query engine
//!
//! Validates structured specs and executes them against a document:
//! retrieve queries return paginated node/edge lists, analyze and edit
//! specs dispatch to their templates and return result envelopes. Timeouts
//! are enforced at stage boundaries; exceeded executions surface as fatal
//! errors with partial metrics.

use serde_json::json;
use std::time::Instant;
use uuid::Uuid;

use crate::features::query_engine::templates;
use crate::shared::cancellation::CancellationToken;
use crate::shared::contracts::{
    decode_cursor, PagedResponse, PaginationParams, QuerySpec, ResultEnvelope, ResultSummary,
    SpecValidationError,
};
use crate::shared::models::{IRDocument, NodeKind, Result, StratumError};

/// Outcome of a spec execution
#[derive(Debug)]
pub enum QueryOutcome {
    /// Retrieve specs return a page of matching records
    Page(PagedResponse<serde_json::Value>),
    /// Analyze/edit specs return an envelope
    Envelope(ResultEnvelope),
}

pub struct QueryEngine<'a> {
    document: &'a mut IRDocument,
}

impl<'a> QueryEngine<'a> {
    pub fn new(document: &'a mut IRDocument) -> Self {
        Self { document }
    }

    /// Strict validation, then execution. Invalid specs fail fast with the
    /// structured error and no partial work.
    pub fn execute(
        &mut self,
        spec: &QuerySpec,
        cancel: &CancellationToken,
    ) -> std::result::Result<QueryOutcome, SpecExecutionError> {
        spec.validate().map_err(SpecExecutionError::Invalid)?;

        let started = Instant::now();
        let timeout_ms = spec.body().limits.timeout_ms;

        let outcome = match spec {
            QuerySpec::Retrieve(body) => self
                .execute_retrieve(&body.template_id, &body.params)
                .map(QueryOutcome::Page),
            QuerySpec::Analyze(body) => self
                .execute_analyze(&body.template_id, &body.params, cancel)
                .map(QueryOutcome::Envelope),
            QuerySpec::Edit(body) => self
                .execute_edit(&body.template_id, &body.params)
                .map(QueryOutcome::Envelope),
        }
        .map_err(SpecExecutionError::Failed)?;

        let elapsed_ms = started.elapsed().as_millis() as u64;
        if elapsed_ms > timeout_ms {
            return Err(SpecExecutionError::Failed(StratumError::query(format!(
                "execution exceeded timeout: {}ms > {}ms",
                elapsed_ms, timeout_ms
            ))));
        }

        Ok(outcome)
    }

    fn execute_retrieve(
        &mut self,
        template_id: &str,
        params: &std::collections::BTreeMap<String, serde_json::Value>,
    ) -> Result<PagedResponse<serde_json::Value>> {
        // Pagination fields ride alongside the template params
        let pagination: PaginationParams = serde_json::from_value(serde_json::Value::Object(
            params.clone().into_iter().collect(),
        ))
        .map_err(|e| StratumError::query(format!("invalid pagination params: {}", e)))?;
        let limit = pagination.limit as usize;
        let offset = match &pagination.cursor {
            Some(cursor) => decode_cursor(cursor)?.0 as usize,
            None => 0,
        };

        let items: Vec<serde_json::Value> = match template_id {
            "nodes_by_kind" => {
                let kind_text = params
                    .get("kind")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| StratumError::query("nodes_by_kind requires 'kind' param"))?;
                let kind = NodeKind::from_str_loose(kind_text)
                    .ok_or_else(|| StratumError::query(format!("unknown node kind: {}", kind_text)))?;
                self.document
                    .get_nodes_by_kind(kind)
                    .into_iter()
                    .map(|n| json!({"id": n.id, "fqn": n.fqn, "file_path": n.file_path, "line": n.span.start_line}))
                    .collect()
            }
            "callers" => {
                let symbol = params
                    .get("symbol")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| StratumError::query("callers requires 'symbol' param"))?;
                let target = self
                    .document
                    .find_nodes_by_name(symbol)
                    .first()
                    .map(|n| n.id.clone())
                    .ok_or_else(|| StratumError::query(format!("symbol not found: {}", symbol)))?;
                self.document
                    .get_edges_by_target(&target)
                    .into_iter()
                    .filter(|e| e.kind == crate::shared::models::EdgeKind::Calls)
                    .map(|e| json!({"caller": e.source_id, "edge_id": e.id}))
                    .collect()
            }
            "references" => {
                let symbol = params
                    .get("symbol")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| StratumError::query("references requires 'symbol' param"))?;
                let target = self
                    .document
                    .find_nodes_by_name(symbol)
                    .first()
                    .map(|n| n.id.clone())
                    .ok_or_else(|| StratumError::query(format!("symbol not found: {}", symbol)))?;
                self.document
                    .find_references(&target)
                    .into_iter()
                    .map(|o| {
                        json!({"file_path": o.file_path, "line": o.span.start_line, "roles": o.roles})
                    })
                    .collect()
            }
            other => {
                return Err(StratumError::query(format!(
                    "unknown retrieve template: {}",
                    other
                )))
            }
        };

        let total = items.len();
        let mut page = PagedResponse::page(items, offset, limit);
        if pagination.summarize {
            page = page.with_summary(ResultSummary::new(format!(
                "{} result(s) for template '{}'",
                total, template_id
            )));
        }
        Ok(page)
    }

    fn execute_analyze(
        &mut self,
        template_id: &str,
        params: &std::collections::BTreeMap<String, serde_json::Value>,
        cancel: &CancellationToken,
    ) -> Result<ResultEnvelope> {
        let request_id = new_request_id();
        match template_id {
            "sql_injection" => templates::run_sql_injection(self.document, &request_id, cancel),
            "cost_complexity" => {
                let function_fqn = params.get("function").and_then(|v| v.as_str());
                templates::run_cost_complexity(self.document, &request_id, function_fqn)
            }
            other => Err(StratumError::query(format!(
                "unknown analyze template: {}",
                other
            ))),
        }
    }

    fn execute_edit(
        &mut self,
        template_id: &str,
        params: &std::collections::BTreeMap<String, serde_json::Value>,
    ) -> Result<ResultEnvelope> {
        let request_id = new_request_id();
        match template_id {
            "rename_symbol" => {
                let symbol = params
                    .get("symbol")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| StratumError::query("rename_symbol requires 'symbol' param"))?;
                templates::run_rename_symbol(self.document, &request_id, symbol)
            }
            other => Err(StratumError::query(format!(
                "unknown edit template: {}",
                other
            ))),
        }
    }
}

/// Validation failures and execution failures are distinct: the former
/// carry repair hints, the latter carry the engine error.
#[derive(Debug, thiserror::Error)]
pub enum SpecExecutionError {
    #[error("{0}")]
    Invalid(SpecValidationError),
    #[error("{0}")]
    Failed(StratumError),
}

fn new_request_id() -> String {
    format!("req_{}", Uuid::new_v4().simple())
}

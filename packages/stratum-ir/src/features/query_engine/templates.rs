//! Analysis templates
//!
//! Named pipelines behind AnalyzeSpec/EditSpec template ids. Every
//! template emits the canonical result envelope: claims backed by
//! evidence, a conclusion, metrics and (for risky edits) an escalation.

use serde_json::json;
use std::collections::BTreeMap;
use std::time::Instant;

use crate::features::cost_analysis::infrastructure::CostAnalyzer;
use crate::features::taint_analysis::application::{AnalyzerConfig, UnifiedAnalyzer};
use crate::features::taint_analysis::domain::TaintMode;
use crate::shared::cancellation::CancellationToken;
use crate::shared::contracts::{
    Claim, Conclusion, ConfidenceBasis, EnvelopeBuilder, Escalation, Evidence, EvidenceKind,
    EvidenceLocation, Metrics, ProofObligation, Provenance, ResultEnvelope, Severity,
};
use crate::shared::models::{EdgeKind, IRDocument, Result, StratumError};

/// Escalation threshold for symbol renames
const RENAME_ESCALATION_THRESHOLD: usize = 50;

/// `sql_injection`: path-sensitive taint over the document; one claim per
/// finding with a DataFlowPath evidence.
pub fn run_sql_injection(
    document: &mut IRDocument,
    request_id: &str,
    cancel: &CancellationToken,
) -> Result<ResultEnvelope> {
    let started = Instant::now();

    let mut analyzer = UnifiedAnalyzer::new(AnalyzerConfig {
        taint_mode: TaintMode::PathSensitive,
        ..AnalyzerConfig::default()
    });
    analyzer.analyze(document, cancel)?;

    let mut builder = EnvelopeBuilder::new(request_id);
    let mut claim_count = 0usize;

    let findings = document.taint_findings.clone();
    for (index, finding) in findings.iter().enumerate() {
        claim_count += 1;
        let claim_id = format!("claim_{:03}", index + 1);

        let mut claim = Claim::new(
            claim_id.clone(),
            "sql_injection",
            if finding.is_sanitized {
                Severity::Low
            } else {
                Severity::Critical
            },
            finding.confidence,
            ConfidenceBasis::Inferred,
            ProofObligation {
                assumptions: vec!["taint propagates through data flow".to_string()],
                broken_if: vec!["sanitizer exists on path".to_string()],
                unknowns: vec![],
            },
        )?;
        if finding.is_sanitized {
            let sanitizer = finding
                .sanitizer
                .clone()
                .unwrap_or_else(|| "sanitizer".to_string());
            claim = claim.suppress(format!("sanitized by {}", sanitizer))?;
        }

        let file_path = sink_file(document, finding).unwrap_or_else(|| "unknown.py".to_string());
        let line = sink_line(document, finding).unwrap_or(1);
        let mut content = BTreeMap::new();
        content.insert("source".to_string(), json!(finding.source));
        content.insert("sink".to_string(), json!(finding.sink));
        content.insert("path".to_string(), json!(finding.path));
        content.insert("has_sanitizer".to_string(), json!(finding.is_sanitized));
        if !finding.path_conditions.is_empty() {
            content.insert("path_conditions".to_string(), json!(finding.path_conditions));
        }

        let evidence = Evidence::new(
            format!("{}_ev_{:03}", request_id, index + 1),
            EvidenceKind::DataFlowPath,
            EvidenceLocation::new(file_path, line, line),
            content,
            Provenance::for_engine("TaintAnalyzer")
                .with_template("sql_injection")
                .with_snapshot(document.snapshot_id.clone()),
            vec![claim_id],
        )?;

        builder = builder.claim(claim).evidence(evidence);
    }

    let conclusion = if claim_count > 0 {
        Conclusion::new(
            format!(
                "Path-sensitive taint analysis found {} SQL injection flow(s)",
                claim_count
            ),
            0.85,
            "Use parameterized queries instead of string interpolation at the reported sinks",
        )?
    } else {
        Conclusion::new(
            "Path-sensitive taint analysis found no source-to-sink flows",
            0.85,
            "No action required",
        )?
    };

    let mut metrics = Metrics::new(elapsed_ms(started));
    metrics.paths_analyzed = document.cfg_edges.len() as u64;

    builder
        .summary(format!("Found {} SQL injection flow(s)", claim_count))
        .conclusion(conclusion)
        .metrics(metrics)
        .build()
}

/// `cost_complexity`: per-function asymptotic cost with CostTerm evidence.
pub fn run_cost_complexity(
    document: &IRDocument,
    request_id: &str,
    function_fqn: Option<&str>,
) -> Result<ResultEnvelope> {
    let started = Instant::now();
    let mut analyzer = CostAnalyzer::new(true);

    let targets: Vec<String> = match function_fqn {
        Some(fqn) => vec![fqn.to_string()],
        None => document
            .nodes
            .iter()
            .filter(|n| n.kind.is_callable())
            .map(|n| n.fqn.clone())
            .collect(),
    };

    let mut builder = EnvelopeBuilder::new(request_id);
    let mut claim_count = 0usize;

    for (index, fqn) in targets.iter().enumerate() {
        // Per-function failures degrade to heuristic, never abort the batch
        let result = match analyzer.analyze_function(document, fqn) {
            Ok(result) => result,
            Err(error) => {
                tracing::warn!("cost analysis failed for {}: {}", fqn, error);
                continue;
            }
        };

        // Only surface functions with nontrivial cost
        if result.loop_bounds.is_empty() {
            continue;
        }

        claim_count += 1;
        let claim_id = format!("claim_{:03}", claim_count);
        let basis = match result.verdict {
            crate::features::cost_analysis::domain::Verdict::Proven => ConfidenceBasis::Proven,
            crate::features::cost_analysis::domain::Verdict::Likely => ConfidenceBasis::Inferred,
            crate::features::cost_analysis::domain::Verdict::Heuristic => {
                ConfidenceBasis::Heuristic
            }
        };

        let claim = Claim::new(
            claim_id.clone(),
            "cost_complexity",
            Severity::Info,
            result.confidence,
            basis,
            ProofObligation {
                assumptions: vec!["loop bounds derive from header expressions".to_string()],
                broken_if: vec!["loop mutates its own bound".to_string()],
                unknowns: if result.verdict
                    == crate::features::cost_analysis::domain::Verdict::Heuristic
                {
                    vec!["loop bound unknown".to_string()]
                } else {
                    vec![]
                },
            },
        )?;

        let function_node = document.nodes.iter().find(|n| &n.fqn == fqn);
        let (file_path, line) = function_node
            .map(|n| (n.file_path.clone(), n.span.start_line.max(1)))
            .unwrap_or_else(|| ("unknown.py".to_string(), 1));

        let mut content = BTreeMap::new();
        content.insert("cost_term".to_string(), json!(result.cost_term));
        content.insert(
            "loop_bounds".to_string(),
            json!(result
                .loop_bounds
                .iter()
                .map(|b| {
                    json!({
                        "loop_id": b.block_id,
                        "bound": b.bound,
                        "method": match b.method {
                            crate::features::cost_analysis::domain::InferenceMethod::Expression => "expression",
                            crate::features::cost_analysis::domain::InferenceMethod::Pattern => "pattern",
                            crate::features::cost_analysis::domain::InferenceMethod::Heuristic => "heuristic",
                        },
                        "confidence": b.confidence,
                    })
                })
                .collect::<Vec<_>>()),
        );
        content.insert(
            "hotspots".to_string(),
            json!(result
                .hotspots
                .iter()
                .map(|h| json!({"line": h.line, "reason": h.reason}))
                .collect::<Vec<_>>()),
        );

        let evidence = Evidence::new(
            format!("{}_ev_{:03}", request_id, index + 1),
            EvidenceKind::CostTerm,
            EvidenceLocation::new(file_path, line, line),
            content,
            Provenance::for_engine("CostAnalyzer")
                .with_template("cost_complexity")
                .with_snapshot(document.snapshot_id.clone()),
            vec![claim_id],
        )?;

        builder = builder.claim(claim).evidence(evidence);
    }

    let conclusion = Conclusion::new(
        format!("Analyzed {} function(s) for asymptotic cost", targets.len()),
        0.9,
        if claim_count > 0 {
            "Review the reported loops; prefer bounded iteration where possible"
        } else {
            "No loop-bearing functions found"
        },
    )?;

    builder
        .summary(format!("{} function(s) carry loops", claim_count))
        .conclusion(conclusion)
        .metrics(Metrics::new(elapsed_ms(started)))
        .build()
}

/// `rename_symbol`: impact assessment for an EditSpec. Renames touching at
/// least the escalation threshold of call sites require a human decision.
pub fn run_rename_symbol(
    document: &IRDocument,
    request_id: &str,
    symbol_name: &str,
) -> Result<ResultEnvelope> {
    let started = Instant::now();

    let target = document
        .nodes
        .iter()
        .find(|n| n.name.as_deref() == Some(symbol_name))
        .ok_or_else(|| StratumError::query(format!("symbol not found: {}", symbol_name)))?;

    let call_sites = document
        .get_edges_by_target(&target.id)
        .into_iter()
        .filter(|e| matches!(e.kind, EdgeKind::Calls | EdgeKind::Reads | EdgeKind::Writes))
        .count();

    let claim = Claim::new(
        "claim_001",
        "rename_impact",
        if call_sites >= RENAME_ESCALATION_THRESHOLD {
            Severity::High
        } else {
            Severity::Info
        },
        0.95,
        ConfidenceBasis::Proven,
        ProofObligation {
            assumptions: vec!["reference index is complete for this snapshot".to_string()],
            broken_if: vec!["dynamic attribute access targets the symbol".to_string()],
            unknowns: vec![],
        },
    )?;

    let mut content = BTreeMap::new();
    content.insert("symbol".to_string(), json!(symbol_name));
    content.insert("call_sites".to_string(), json!(call_sites));

    let evidence = Evidence::new(
        format!("{}_ev_001", request_id),
        EvidenceKind::CallPath,
        EvidenceLocation::new(target.file_path.clone(), target.span.start_line.max(1), target.span.end_line.max(1)),
        content,
        Provenance::for_engine("RenamePlanner").with_template("rename_symbol"),
        vec!["claim_001".to_string()],
    )?;

    let mut builder = EnvelopeBuilder::new(request_id)
        .summary(format!(
            "Rename of '{}' affects {} site(s)",
            symbol_name, call_sites
        ))
        .claim(claim)
        .evidence(evidence)
        .conclusion(Conclusion::new(
            format!("{} references resolved for '{}'", call_sites, symbol_name),
            1.0,
            if call_sites >= RENAME_ESCALATION_THRESHOLD {
                "High-impact rename: require human approval before applying"
            } else {
                "Safe to apply the rename mechanically"
            },
        )?)
        .metrics(Metrics::new(elapsed_ms(started)));

    if call_sites >= RENAME_ESCALATION_THRESHOLD {
        let escalation = Escalation::required(
            format!("High-risk edit: {}+ symbols affected", call_sites),
            "Approve or reject symbol rename",
            vec!["approve".to_string(), "reject".to_string(), "modify".to_string()],
        )?
        .with_resume_token(format!("resume:{}", request_id));
        builder = builder.escalation(escalation);
    }

    builder.build()
}

fn sink_file(document: &IRDocument, finding: &crate::shared::models::TaintFinding) -> Option<String> {
    // Sink path entries are CFG block ids; map back to the owning function
    let block_id = finding.path.last()?;
    document
        .get_cfg_block(block_id)
        .and_then(|block| document.get_node(&block.function_node_id))
        .map(|node| node.file_path.clone())
}

fn sink_line(document: &IRDocument, finding: &crate::shared::models::TaintFinding) -> Option<u32> {
    let block_id = finding.path.last()?;
    document
        .get_cfg_block(block_id)
        .and_then(|block| block.span)
        .map(|span| span.start_line.max(1))
}

fn elapsed_ms(started: Instant) -> f64 {
    let elapsed = started.elapsed().as_secs_f64() * 1000.0;
    // Metrics require strictly positive execution time
    elapsed.max(0.001)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::data_flow::build_data_flow;
    use crate::features::expression_builder::lower_expressions;
    use crate::features::flow_graph::application::build_flow_graphs;
    use crate::features::ir_generation::application::{generate_file_ir, FileInput};
    use crate::features::parsing::infrastructure::TreeSitterParser;
    use crate::features::parsing::ports::ParserFrontend;

    fn document(source: &str) -> IRDocument {
        let file = FileInput {
            path: "handler.py".into(),
            source: source.into(),
        };
        let mut doc = generate_file_ir("r", "s", &file, None).unwrap();
        let mut parser = TreeSitterParser::python();
        let tree = parser.parse(source, "handler.py").unwrap();
        build_flow_graphs(&mut doc, &tree);
        build_data_flow(&mut doc);
        lower_expressions(&mut doc, &tree);
        doc
    }

    #[test]
    fn test_sql_injection_template_envelope() {
        let mut doc = document(
            "def handler():\n    q = request.args['q']\n    cursor.execute(q)\n",
        );
        let envelope =
            run_sql_injection(&mut doc, "req_tpl1", &CancellationToken::new()).unwrap();

        assert!(!envelope.claims.is_empty());
        assert_eq!(envelope.claims[0].claim_type, "sql_injection");
        assert_eq!(envelope.claims[0].confidence_basis, ConfidenceBasis::Inferred);
        assert!(envelope
            .evidences
            .iter()
            .any(|e| e.kind == EvidenceKind::DataFlowPath));
        assert!(envelope
            .conclusion
            .as_ref()
            .unwrap()
            .recommendation
            .contains("parameterized queries"));
        assert_eq!(envelope.replay_ref, "replay:tpl1");
    }

    #[test]
    fn test_sanitized_flow_suppressed() {
        let mut doc = document(
            "def handler():\n    q = request.args['q']\n    q = sanitize(q)\n    cursor.execute(q)\n",
        );
        let envelope =
            run_sql_injection(&mut doc, "req_tpl2", &CancellationToken::new()).unwrap();

        // The sanitized flow becomes a suppressed claim naming the sanitizer
        assert!(envelope.get_actionable_claims().is_empty());
        assert_eq!(envelope.claims.len(), 1);
        let claim = &envelope.claims[0];
        assert!(claim.suppressed);
        assert!(claim
            .suppression_reason
            .as_deref()
            .unwrap()
            .contains("sanitize"));
        assert_eq!(envelope.metrics.claims_suppressed, 1);
    }

    #[test]
    fn test_cost_template() {
        let doc = document("def f(n):\n    for i in range(n):\n        pass\n");
        let envelope = run_cost_complexity(&doc, "req_cost1", Some("handler.f")).unwrap();
        assert_eq!(envelope.claims.len(), 1);
        assert!(envelope
            .evidences
            .iter()
            .any(|e| e.kind == EvidenceKind::CostTerm));
        let content = &envelope.evidences[0].content;
        assert!(content["loop_bounds"].is_array());
    }

    #[test]
    fn test_rename_escalation_threshold() {
        // Build a document with 60 call sites on one function
        let mut source = String::from("def target():\n    return 1\n\ndef caller():\n");
        for _ in 0..60 {
            source.push_str("    target()\n");
        }
        let doc = document(&source);
        let envelope = run_rename_symbol(&doc, "req_edit1", "target").unwrap();

        assert!(envelope.has_escalation());
        let escalation = envelope.escalation.as_ref().unwrap();
        assert!(escalation.options.len() >= 2);
        assert!(escalation.resume_token.is_some());
    }

    #[test]
    fn test_rename_small_impact_no_escalation() {
        let doc = document("def target():\n    return 1\n\ndef caller():\n    return target()\n");
        let envelope = run_rename_symbol(&doc, "req_edit2", "target").unwrap();
        assert!(!envelope.has_escalation());
    }
}

//! End-to-end analysis properties: taint round-trip, cost verdicts,
//! dominator guards, cross-language bridge, spec-driven templates.

use std::collections::BTreeMap;

use stratum_ir::features::cost_analysis::domain::{ComplexityClass, Verdict};
use stratum_ir::features::cost_analysis::infrastructure::CostAnalyzer;
use stratum_ir::features::symbols::{bridge_type, BridgeDirection};
use stratum_ir::features::taint_analysis::validation::{ConstraintValidator, GuardDetector};
use stratum_ir::shared::contracts::{Limits, Scope, SpecBody};
use stratum_ir::{
    build_corpus, AnalyzerConfig, CancellationToken, FileInput, PipelineConfig, QueryEngine,
    QueryOutcome, QuerySpec, TaintMode, UnifiedAnalyzer,
};

fn build(source: &str) -> stratum_ir::IRDocument {
    let files = vec![FileInput {
        path: "handler.py".into(),
        source: source.into(),
    }];
    build_corpus(
        &PipelineConfig::new("r", "s"),
        &files,
        &CancellationToken::new(),
    )
    .unwrap()
}

// ----------------------------------------------------------------------
// Taint round-trip
// ----------------------------------------------------------------------

#[test]
fn tainted_sql_execution_yields_high_confidence_finding() {
    let mut document = build(
        "def handler():\n    q = request.args['q']\n    cursor.execute(q)\n",
    );
    let mut analyzer = UnifiedAnalyzer::new(AnalyzerConfig {
        taint_mode: TaintMode::PathSensitive,
        ..AnalyzerConfig::default()
    });
    analyzer
        .analyze(&mut document, &CancellationToken::new())
        .unwrap();

    assert!(!document.taint_findings.is_empty());
    let finding = &document.taint_findings[0];
    assert!(finding.confidence >= 0.8);
    assert!(!finding.is_sanitized);
}

#[test]
fn sanitized_flow_produces_suppressed_claim_via_template() {
    // The sql_injection template turns sanitized flows into suppressed
    // claims with a suppression reason referencing the sanitizer.
    let mut document = build(
        "def handler():\n    q = request.args['q']\n    q = sanitize(q)\n    cursor.execute(q)\n",
    );
    let spec = QuerySpec::Analyze(SpecBody {
        intent: "analyze".into(),
        template_id: "sql_injection".into(),
        scope: Scope::new("r", "s"),
        params: BTreeMap::new(),
        limits: Limits {
            max_paths: 200,
            timeout_ms: 30_000,
            max_tokens: None,
        },
    });
    let mut engine = QueryEngine::new(&mut document);
    let outcome = engine.execute(&spec, &CancellationToken::new()).unwrap();

    match outcome {
        QueryOutcome::Envelope(envelope) => {
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
        QueryOutcome::Page(_) => panic!("expected envelope"),
    }
}

// ----------------------------------------------------------------------
// AnalyzeSpec over a tainted handler
// ----------------------------------------------------------------------

#[test]
fn analyze_spec_produces_envelope_with_flow_evidence() {
    let mut document = build(
        "def handler():\n    q = request.args['q']\n    cursor.execute(q)\n",
    );
    let spec = QuerySpec::Analyze(SpecBody {
        intent: "analyze".into(),
        template_id: "sql_injection".into(),
        scope: Scope::new("r", "s"),
        params: BTreeMap::new(),
        limits: Limits {
            max_paths: 200,
            timeout_ms: 30_000,
            max_tokens: None,
        },
    });

    let mut engine = QueryEngine::new(&mut document);
    let outcome = engine.execute(&spec, &CancellationToken::new()).unwrap();
    let QueryOutcome::Envelope(envelope) = outcome else {
        panic!("expected envelope");
    };

    assert!(!envelope.claims.is_empty());
    assert_eq!(envelope.claims[0].claim_type, "sql_injection");
    assert!(envelope.evidences.iter().any(|e| {
        e.content.contains_key("source")
            && e.content.contains_key("sink")
            && e.content.contains_key("path")
    }));
    assert!(envelope
        .conclusion
        .as_ref()
        .unwrap()
        .recommendation
        .to_lowercase()
        .contains("parameterized"));
}

// ----------------------------------------------------------------------
// High-impact rename escalates
// ----------------------------------------------------------------------

#[test]
fn edit_spec_rename_escalates_at_fifty_sites() {
    let mut source = String::from("def target():\n    return 1\n\ndef caller():\n");
    for _ in 0..55 {
        source.push_str("    target()\n");
    }
    let mut document = build(&source);

    let mut params = BTreeMap::new();
    params.insert("symbol".to_string(), serde_json::json!("target"));
    let spec = QuerySpec::Edit(SpecBody {
        intent: "edit".into(),
        template_id: "rename_symbol".into(),
        scope: Scope::new("r", "s"),
        params,
        limits: Limits {
            max_paths: 200,
            timeout_ms: 30_000,
            max_tokens: None,
        },
    });

    let mut engine = QueryEngine::new(&mut document);
    let QueryOutcome::Envelope(envelope) =
        engine.execute(&spec, &CancellationToken::new()).unwrap()
    else {
        panic!("expected envelope");
    };

    assert!(envelope.has_escalation());
    let escalation = envelope.escalation.as_ref().unwrap();
    assert!(escalation.options.len() >= 2);
    assert!(escalation.resume_token.is_some());
}

// ----------------------------------------------------------------------
// Cost verdicts
// ----------------------------------------------------------------------

#[test]
fn range_loop_is_proven_linear_with_bound_n() {
    let document = build("def f(n):\n    for i in range(n):\n        pass\n");
    let mut analyzer = CostAnalyzer::new(false);
    let result = analyzer.analyze_function(&document, "handler.f").unwrap();
    assert_eq!(result.verdict, Verdict::Proven);
    assert_eq!(result.complexity, ComplexityClass::Linear);
    assert_eq!(result.loop_bounds[0].bound, "n");
}

#[test]
fn nested_loops_are_proven_polynomial_with_both_bounds() {
    let document = build(
        "def f(n, m):\n    for i in range(n):\n        for j in range(m):\n            pass\n",
    );
    let mut analyzer = CostAnalyzer::new(false);
    let result = analyzer.analyze_function(&document, "handler.f").unwrap();
    assert_eq!(result.verdict, Verdict::Proven);
    assert_eq!(result.complexity, ComplexityClass::Polynomial);
    let bounds: Vec<&str> = result.loop_bounds.iter().map(|b| b.bound.as_str()).collect();
    assert!(bounds.contains(&"n"));
    assert!(bounds.contains(&"m"));
}

#[test]
fn while_loop_is_heuristic() {
    let document = build("def f(cond):\n    while cond:\n        step()\n");
    let mut analyzer = CostAnalyzer::new(false);
    let result = analyzer.analyze_function(&document, "handler.f").unwrap();
    assert_eq!(result.verdict, Verdict::Heuristic);
}

#[test]
fn branchy_function_is_constant_proven() {
    let document = build(
        "def login(u, p):\n    if not u or not p:\n        return None\n    return authenticate(u, p)\n",
    );
    let mut analyzer = CostAnalyzer::new(false);
    let result = analyzer.analyze_function(&document, "handler.login").unwrap();
    assert_eq!(result.verdict, Verdict::Proven);
    assert_eq!(result.complexity, ComplexityClass::Constant);

    let login = document
        .nodes
        .iter()
        .find(|n| n.name.as_deref() == Some("login"))
        .unwrap();
    assert!(login.control_flow_summary.as_ref().unwrap().branch_count >= 1);
}

// ----------------------------------------------------------------------
// Dominator guard
// ----------------------------------------------------------------------

#[test]
fn none_guard_protects_dominated_use() {
    let document = build(
        "def f(x):\n    if x is None:\n        return\n    use(x)\n",
    );

    let function = document
        .nodes
        .iter()
        .find(|n| n.name.as_deref() == Some("f"))
        .unwrap();
    let blocks: Vec<&stratum_ir::shared::models::CfgBlock> = document
        .cfg_blocks
        .iter()
        .filter(|b| b.function_node_id == function.id)
        .collect();
    let edges: Vec<&stratum_ir::shared::models::CfgEdge> = document
        .cfg_edges
        .iter()
        .filter(|e| blocks.iter().any(|b| b.id == e.source_block_id))
        .collect();

    let guards = GuardDetector::new().detect(&blocks, &edges);
    assert_eq!(guards.len(), 1);
    assert_eq!(guards[0].guarded_var, "x");

    let tree = document.dominator_trees.get(&function.id).unwrap();
    let use_block = blocks
        .iter()
        .find(|b| b.statements.iter().any(|s| s.contains("use(x)")))
        .expect("use block");

    let mut validator = ConstraintValidator::new();
    validator.set_dominator_tree(tree.clone());
    validator.set_guards(guards);
    assert!(validator.is_guard_protected(&use_block.id, "x"));
    assert!(!validator.is_guard_protected(&use_block.id, "y"));
}

// ----------------------------------------------------------------------
// Cross-language bridge
// ----------------------------------------------------------------------

#[test]
fn python_java_bridge_mappings() {
    assert_eq!(
        bridge_type("list[User]", BridgeDirection::PythonToJava),
        "java.util.List<User>"
    );
    assert_eq!(
        bridge_type("Optional[str]", BridgeDirection::PythonToJava),
        "java.util.Optional<String>"
    );
    assert_eq!(bridge_type("User", BridgeDirection::PythonToJava), "User");
}

// ----------------------------------------------------------------------
// Taint mode surface
// ----------------------------------------------------------------------

#[test]
fn full_mode_maps_to_path_sensitive() {
    assert_eq!(
        TaintMode::from_str("full").unwrap(),
        TaintMode::PathSensitive
    );
}

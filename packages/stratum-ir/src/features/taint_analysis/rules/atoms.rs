//! Taint rule atoms and compilation
//!
//! Rules are declared in YAML atoms, one file per language. The compiler
//! turns each atom into a `CompiledRule` (a closed type with pre-built
//! regexes); matching happens in a single executor loop, never through
//! per-language rule hierarchies.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::shared::models::{Result, StratumError};

/// What a rule marks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectKind {
    Source,
    Sink,
    Sanitizer,
}

impl EffectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EffectKind::Source => "source",
            EffectKind::Sink => "sink",
            EffectKind::Sanitizer => "sanitizer",
        }
    }
}

/// Per-argument constraint in a rule atom
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgConstraint {
    NotConst,
    StringLiteral,
    AnyValue,
}

/// One YAML rule atom
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleAtom {
    pub id: String,
    pub language: String,
    pub effect: EffectKind,
    /// Entity kind filter: call, read, assign, literal, binop, ...
    #[serde(default)]
    pub kind: Option<String>,
    /// Regex over the receiver base type
    #[serde(default)]
    pub base_type: Option<String>,
    /// Regex over the called method/function name
    #[serde(default)]
    pub method: Option<String>,
    /// Regex over read attribute / plain name
    #[serde(default)]
    pub name: Option<String>,
    /// Argument index -> constraint
    #[serde(default)]
    pub arg_constraints: BTreeMap<u32, ArgConstraint>,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

fn default_confidence() -> f64 {
    0.8
}

/// Rule atoms file: `rules:` list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleFile {
    pub rules: Vec<RuleAtom>,
}

/// Compiled, matchable rule
#[derive(Debug)]
pub struct CompiledRule {
    pub id: String,
    pub language: String,
    pub effect_kind: EffectKind,
    pub kind_filter: Option<String>,
    pub base_type_pattern: Option<Regex>,
    pub method_pattern: Option<Regex>,
    pub name_pattern: Option<Regex>,
    pub arg_constraints: BTreeMap<u32, ArgConstraint>,
    pub confidence: f64,
}

#[derive(Debug, Default)]
pub struct TaintRuleCompiler;

impl TaintRuleCompiler {
    pub fn new() -> Self {
        Self
    }

    /// Compile YAML rule atoms into matchable rules.
    pub fn compile_str(&self, yaml: &str) -> Result<Vec<CompiledRule>> {
        let file: RuleFile = serde_yaml::from_str(yaml)?;
        file.rules.into_iter().map(|atom| self.compile_atom(atom)).collect()
    }

    /// Compile a rule atoms file (one per language, e.g.
    /// `rules/atoms/python.atoms.yaml`).
    pub fn compile_file(&self, path: &std::path::Path) -> Result<Vec<CompiledRule>> {
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            StratumError::config(format!("cannot read rule atoms {}: {}", path.display(), e))
        })?;
        self.compile_str(&yaml)
    }

    fn compile_atom(&self, atom: RuleAtom) -> Result<CompiledRule> {
        if atom.id.trim().is_empty() {
            return Err(StratumError::config("rule atom without id"));
        }
        if !(0.0..=1.0).contains(&atom.confidence) {
            return Err(StratumError::config(format!(
                "rule '{}': confidence out of range",
                atom.id
            )));
        }

        let compile = |pattern: &Option<String>, what: &str| -> Result<Option<Regex>> {
            match pattern {
                None => Ok(None),
                Some(pattern) => RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map(Some)
                    .map_err(|e| {
                        StratumError::config(format!(
                            "rule '{}': bad {} pattern: {}",
                            atom.id, what, e
                        ))
                    }),
            }
        };

        Ok(CompiledRule {
            base_type_pattern: compile(&atom.base_type, "base_type")?,
            method_pattern: compile(&atom.method, "method")?,
            name_pattern: compile(&atom.name, "name")?,
            id: atom.id,
            language: atom.language,
            effect_kind: atom.effect,
            kind_filter: atom.kind,
            arg_constraints: atom.arg_constraints,
            confidence: atom.confidence,
        })
    }
}

/// A small default Python ruleset used when no atoms file is supplied.
pub const DEFAULT_PYTHON_ATOMS: &str = r#"
rules:
  - id: py.source.request
    language: python
    effect: source
    kind: read
    name: "request\\.(args|form|values|json|data|cookies)|request\\.GET|request\\.POST"
    confidence: 0.9
  - id: py.source.input
    language: python
    effect: source
    kind: call
    method: "^input$|^raw_input$"
    confidence: 0.85
  - id: py.source.environ
    language: python
    effect: source
    kind: read
    name: "os\\.environ|sys\\.argv"
    confidence: 0.7
  - id: py.sink.sql_execute
    language: python
    effect: sink
    kind: call
    method: "^execute$|^executemany$|^executescript$"
    arg_constraints:
      0: not_const
    confidence: 0.9
  - id: py.sink.eval
    language: python
    effect: sink
    kind: call
    method: "^eval$|^exec$"
    confidence: 0.95
  - id: py.sink.os_system
    language: python
    effect: sink
    kind: call
    method: "^system$|^popen$|^spawn"
    base_type: "os|subprocess"
    confidence: 0.9
  - id: py.sanitizer.escape
    language: python
    effect: sanitizer
    kind: call
    method: "escape|quote|sanitize|clean"
    confidence: 0.8
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_default_atoms() {
        let compiler = TaintRuleCompiler::new();
        let rules = compiler.compile_str(DEFAULT_PYTHON_ATOMS).unwrap();
        assert!(rules.len() >= 6);
        assert!(rules.iter().any(|r| r.effect_kind == EffectKind::Source));
        assert!(rules.iter().any(|r| r.effect_kind == EffectKind::Sink));
        assert!(rules.iter().any(|r| r.effect_kind == EffectKind::Sanitizer));
    }

    #[test]
    fn test_bad_regex_rejected() {
        let yaml = "rules:\n  - id: x\n    language: python\n    effect: sink\n    method: \"[unclosed\"\n";
        let compiler = TaintRuleCompiler::new();
        assert!(compiler.compile_str(yaml).is_err());
    }

    #[test]
    fn test_bad_confidence_rejected() {
        let yaml =
            "rules:\n  - id: x\n    language: python\n    effect: sink\n    confidence: 1.5\n";
        let compiler = TaintRuleCompiler::new();
        assert!(compiler.compile_str(yaml).is_err());
    }

    #[test]
    fn test_arg_constraints_parsed() {
        let compiler = TaintRuleCompiler::new();
        let rules = compiler.compile_str(DEFAULT_PYTHON_ATOMS).unwrap();
        let sql = rules.iter().find(|r| r.id == "py.sink.sql_execute").unwrap();
        assert_eq!(sql.arg_constraints.get(&0), Some(&ArgConstraint::NotConst));
    }

    #[test]
    fn test_compile_bundled_atoms_files() {
        let atoms_dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("rules")
            .join("atoms");
        let compiler = TaintRuleCompiler::new();

        let python = compiler.compile_file(&atoms_dir.join("python.atoms.yaml")).unwrap();
        assert!(python.len() >= 7);
        assert!(python.iter().all(|r| r.language == "python"));

        let typescript = compiler
            .compile_file(&atoms_dir.join("typescript.atoms.yaml"))
            .unwrap();
        assert!(typescript.len() >= 5);
        assert!(typescript.iter().all(|r| r.language == "typescript"));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let compiler = TaintRuleCompiler::new();
        let result = compiler.compile_file(std::path::Path::new("no/such/file.yaml"));
        assert!(result.is_err());
    }
}

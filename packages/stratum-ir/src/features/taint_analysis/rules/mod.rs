//! C7: Taint rule compiler and executor

pub mod atoms;
pub mod entity;
pub mod executor;

pub use atoms::{
    ArgConstraint, CompiledRule, EffectKind, RuleAtom, RuleFile, TaintRuleCompiler,
    DEFAULT_PYTHON_ATOMS,
};
pub use entity::ExpressionEntity;
pub use executor::{ExecutorStats, RuleMatch, TaintRuleExecutor};

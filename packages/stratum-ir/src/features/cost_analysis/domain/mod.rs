//! Cost analysis domain types

use serde::{Deserialize, Serialize};

/// Asymptotic complexity class
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ComplexityClass {
    Constant,
    Logarithmic,
    Linear,
    Linearithmic,
    Polynomial,
    Exponential,
}

impl ComplexityClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComplexityClass::Constant => "O(1)",
            ComplexityClass::Logarithmic => "O(log n)",
            ComplexityClass::Linear => "O(n)",
            ComplexityClass::Linearithmic => "O(n log n)",
            ComplexityClass::Polynomial => "O(n^k)",
            ComplexityClass::Exponential => "O(2^n)",
        }
    }
}

/// Confidence class of a bound or function verdict.
/// Worst-case ordering: proven > likely > heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Proven,
    Likely,
    Heuristic,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Proven => "proven",
            Verdict::Likely => "likely",
            Verdict::Heuristic => "heuristic",
        }
    }

    /// The weaker of two verdicts
    pub fn worst(self, other: Verdict) -> Verdict {
        use Verdict::*;
        match (self, other) {
            (Heuristic, _) | (_, Heuristic) => Heuristic,
            (Likely, _) | (_, Likely) => Likely,
            _ => Proven,
        }
    }
}

/// How a bound was inferred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InferenceMethod {
    Expression,
    Pattern,
    Heuristic,
}

/// One loop's inferred bound
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundResult {
    /// Symbolic bound text ("n", "10", "len(items)", "?")
    pub bound: String,
    pub verdict: Verdict,
    pub confidence: f64,
    pub method: InferenceMethod,
    pub block_id: String,
    pub line: u32,
    /// 0 = outermost
    pub nesting_level: usize,
}

/// A hotspot worth surfacing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hotspot {
    pub line: u32,
    pub reason: String,
}

/// Per-function cost analysis result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostResult {
    pub function_fqn: String,
    pub complexity: ComplexityClass,
    pub verdict: Verdict,
    pub confidence: f64,
    pub explanation: String,
    /// Symbolic cost term ("n * m", "1")
    pub cost_term: String,
    pub loop_bounds: Vec<BoundResult>,
    pub hotspots: Vec<Hotspot>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_worst_case() {
        assert_eq!(Verdict::Proven.worst(Verdict::Likely), Verdict::Likely);
        assert_eq!(Verdict::Likely.worst(Verdict::Heuristic), Verdict::Heuristic);
        assert_eq!(Verdict::Proven.worst(Verdict::Proven), Verdict::Proven);
    }

    #[test]
    fn test_complexity_ordering() {
        assert!(ComplexityClass::Constant < ComplexityClass::Linear);
        assert!(ComplexityClass::Linear < ComplexityClass::Polynomial);
        assert!(ComplexityClass::Polynomial < ComplexityClass::Exponential);
    }
}

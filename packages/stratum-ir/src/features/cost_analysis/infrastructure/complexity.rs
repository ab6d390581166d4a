//! Complexity classification
//!
//! Maps loop bounds and nesting depth to a complexity class and a
//! symbolic cost term.

use crate::features::cost_analysis::domain::{BoundResult, ComplexityClass};

/// Classify a function from its loop bounds.
/// Returns (class, confidence, cost term).
pub fn classify(loop_bounds: &[BoundResult]) -> (ComplexityClass, f64, String) {
    if loop_bounds.is_empty() {
        return (ComplexityClass::Constant, 1.0, "1".to_string());
    }

    let max_nesting = loop_bounds.iter().map(|b| b.nesting_level).max().unwrap_or(0);
    let all_constant = loop_bounds.iter().all(|b| is_numeric(&b.bound));

    let complexity = if all_constant {
        // Fixed iteration counts stay constant regardless of nesting
        ComplexityClass::Constant
    } else if max_nesting == 0 {
        if loop_bounds.iter().any(|b| is_logarithmic(&b.bound)) {
            ComplexityClass::Logarithmic
        } else {
            ComplexityClass::Linear
        }
    } else {
        ComplexityClass::Polynomial
    };

    let confidence = loop_bounds
        .iter()
        .map(|b| b.confidence)
        .fold(1.0f64, f64::min);

    // Cost term: product along the nesting chain
    let mut terms: Vec<&str> = loop_bounds.iter().map(|b| b.bound.as_str()).collect();
    terms.sort();
    terms.dedup();
    let cost_term = if terms.len() == 1 && max_nesting == 0 {
        terms[0].to_string()
    } else {
        loop_bounds
            .iter()
            .map(|b| b.bound.as_str())
            .collect::<Vec<_>>()
            .join(" * ")
    };

    (complexity, confidence, cost_term)
}

fn is_numeric(bound: &str) -> bool {
    bound.parse::<u64>().is_ok()
}

fn is_logarithmic(bound: &str) -> bool {
    bound.contains("log")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::cost_analysis::domain::{InferenceMethod, Verdict};

    fn bound(text: &str, nesting: usize) -> BoundResult {
        BoundResult {
            bound: text.to_string(),
            verdict: Verdict::Proven,
            confidence: 0.9,
            method: InferenceMethod::Expression,
            block_id: "b".to_string(),
            line: 1,
            nesting_level: nesting,
        }
    }

    #[test]
    fn test_single_loop_linear() {
        let (complexity, _, term) = classify(&[bound("n", 0)]);
        assert_eq!(complexity, ComplexityClass::Linear);
        assert_eq!(term, "n");
    }

    #[test]
    fn test_nested_loops_polynomial() {
        let (complexity, _, term) = classify(&[bound("n", 0), bound("m", 1)]);
        assert_eq!(complexity, ComplexityClass::Polynomial);
        assert_eq!(term, "n * m");
    }

    #[test]
    fn test_constant_bounds_stay_constant() {
        let (complexity, _, _) = classify(&[bound("10", 0)]);
        assert_eq!(complexity, ComplexityClass::Constant);
    }

    #[test]
    fn test_no_loops() {
        let (complexity, confidence, term) = classify(&[]);
        assert_eq!(complexity, ComplexityClass::Constant);
        assert!((confidence - 1.0).abs() < f64::EPSILON);
        assert_eq!(term, "1");
    }
}

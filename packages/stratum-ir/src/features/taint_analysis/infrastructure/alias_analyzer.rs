//! Alias analysis
//!
//! May-/must-alias registry built from assignment edges. When enabled,
//! taint findings are enriched with the aliases of their source and sink.

use std::collections::{HashMap, HashSet};

use crate::shared::models::TaintFinding;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasKind {
    /// Direct assignment (`a = b`)
    Direct,
    /// Through a container or field
    Indirect,
}

#[derive(Debug, Default)]
pub struct AliasAnalyzer {
    may_aliases: HashMap<String, HashSet<String>>,
    must_aliases: HashMap<String, HashSet<String>>,
}

impl AliasAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_alias(&mut self, source: &str, target: &str, _kind: AliasKind, is_must: bool) {
        let map = if is_must {
            &mut self.must_aliases
        } else {
            &mut self.may_aliases
        };
        map.entry(source.to_string())
            .or_default()
            .insert(target.to_string());
        map.entry(target.to_string())
            .or_default()
            .insert(source.to_string());
    }

    /// All may- and must-aliases of a name
    pub fn get_aliases(&self, name: &str) -> HashSet<String> {
        let mut result = HashSet::new();
        if let Some(set) = self.may_aliases.get(name) {
            result.extend(set.iter().cloned());
        }
        if let Some(set) = self.must_aliases.get(name) {
            result.extend(set.iter().cloned());
        }
        result
    }

    pub fn must_alias(&self, a: &str, b: &str) -> bool {
        self.must_aliases
            .get(a)
            .map(|set| set.contains(b))
            .unwrap_or(false)
    }

    pub fn alias_count(&self) -> usize {
        self.may_aliases.len() + self.must_aliases.len()
    }

    /// Attach alias sets to findings in place.
    pub fn enrich_findings(&self, findings: &mut [TaintFinding]) {
        for finding in findings {
            finding.source_aliases = self.get_aliases(&finding.source).into_iter().collect();
            finding.sink_aliases = self.get_aliases(&finding.sink).into_iter().collect();
            finding.source_aliases.sort();
            finding.sink_aliases.sort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_registry() {
        let mut analyzer = AliasAnalyzer::new();
        analyzer.add_alias("a", "b", AliasKind::Direct, true);
        analyzer.add_alias("b", "c", AliasKind::Direct, false);

        assert!(analyzer.must_alias("a", "b"));
        assert!(analyzer.must_alias("b", "a"));
        assert!(!analyzer.must_alias("b", "c"));
        assert!(analyzer.get_aliases("b").contains("c"));
    }

    #[test]
    fn test_finding_enrichment() {
        let mut analyzer = AliasAnalyzer::new();
        analyzer.add_alias("user_input", "raw", AliasKind::Direct, true);

        let mut findings = vec![TaintFinding::new("user_input", "execute", vec![])];
        analyzer.enrich_findings(&mut findings);
        assert_eq!(findings[0].source_aliases, vec!["raw"]);
    }
}

//! Dominator tree
//!
//! Block A dominates block B iff every path from entry to B passes through
//! A. Stored by block id; documents keep one tree per function.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Dominator tree over CFG blocks
///
/// Maps are BTreeMaps so serialized trees iterate in key order (the
/// document's byte-determinism depends on it).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DominatorTree {
    pub entry_block_id: String,
    /// Immediate dominator per block (entry maps to itself)
    pub idom: BTreeMap<String, String>,
    /// Dominance frontier per block
    pub frontiers: BTreeMap<String, Vec<String>>,
}

impl DominatorTree {
    pub fn new(entry_block_id: impl Into<String>) -> Self {
        let entry = entry_block_id.into();
        let mut idom = BTreeMap::new();
        idom.insert(entry.clone(), entry.clone());
        Self {
            entry_block_id: entry,
            idom,
            frontiers: BTreeMap::new(),
        }
    }

    /// True iff `a` dominates `b` (every block dominates itself)
    pub fn dominates(&self, a: &str, b: &str) -> bool {
        if a == b {
            return true;
        }
        let mut current = b;
        // Walk up the idom chain; entry's idom is itself
        loop {
            match self.idom.get(current) {
                Some(parent) if parent == current => return false,
                Some(parent) if parent == a => return true,
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    pub fn immediate_dominator(&self, block_id: &str) -> Option<&str> {
        self.idom.get(block_id).map(|s| s.as_str())
    }

    pub fn frontier(&self, block_id: &str) -> &[String] {
        self.frontiers
            .get(block_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// All blocks dominated by `a` (including itself)
    pub fn dominated_by(&self, a: &str) -> Vec<&str> {
        self.idom
            .keys()
            .filter(|b| self.dominates(a, b))
            .map(|s| s.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// entry → b1 → b2, entry → b3
    fn diamond() -> DominatorTree {
        let mut tree = DominatorTree::new("entry");
        tree.idom.insert("b1".into(), "entry".into());
        tree.idom.insert("b2".into(), "b1".into());
        tree.idom.insert("b3".into(), "entry".into());
        tree
    }

    #[test]
    fn test_dominates_chain() {
        let tree = diamond();
        assert!(tree.dominates("entry", "b2"));
        assert!(tree.dominates("b1", "b2"));
        assert!(!tree.dominates("b3", "b2"));
        assert!(tree.dominates("b2", "b2"));
    }

    #[test]
    fn test_entry_dominates_all() {
        let tree = diamond();
        for block in ["b1", "b2", "b3"] {
            assert!(tree.dominates("entry", block));
        }
    }
}

//! Incremental update plugin
//!
//! Pending changes are serialized per transaction id; transactions are
//! independent. A TTL sweeper prunes transactions that have seen no
//! activity for 60 seconds.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Stale-transaction TTL
pub const TRANSACTION_TTL: Duration = Duration::from_secs(60);

/// One pending file change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingChange {
    Upsert { path: String, content: String },
    Delete { path: String },
}

#[derive(Debug)]
struct Transaction {
    changes: Vec<PendingChange>,
    last_touched: Instant,
}

/// Transaction-scoped incremental change buffer
#[derive(Debug, Default)]
pub struct IncrementalUpdatePlugin {
    transactions: Mutex<HashMap<String, Transaction>>,
}

impl IncrementalUpdatePlugin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, transaction_id: &str, change: PendingChange) {
        let mut transactions = self.transactions.lock();
        let transaction = transactions
            .entry(transaction_id.to_string())
            .or_insert_with(|| Transaction {
                changes: Vec::new(),
                last_touched: Instant::now(),
            });
        transaction.changes.push(change);
        transaction.last_touched = Instant::now();
    }

    /// Take a transaction's changes, closing it.
    pub fn take(&self, transaction_id: &str) -> Vec<PendingChange> {
        self.transactions
            .lock()
            .remove(transaction_id)
            .map(|t| t.changes)
            .unwrap_or_default()
    }

    pub fn pending_count(&self, transaction_id: &str) -> usize {
        self.transactions
            .lock()
            .get(transaction_id)
            .map(|t| t.changes.len())
            .unwrap_or(0)
    }

    /// Drop transactions idle past the TTL. Returns how many were pruned.
    pub fn prune_stale(&self) -> usize {
        self.prune_older_than(TRANSACTION_TTL)
    }

    fn prune_older_than(&self, ttl: Duration) -> usize {
        let mut transactions = self.transactions.lock();
        let before = transactions.len();
        transactions.retain(|_, t| t.last_touched.elapsed() < ttl);
        let pruned = before - transactions.len();
        if pruned > 0 {
            tracing::debug!("pruned {} stale incremental transactions", pruned);
        }
        pruned
    }

    pub fn transaction_count(&self) -> usize {
        self.transactions.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transactions_are_independent() {
        let plugin = IncrementalUpdatePlugin::new();
        plugin.record(
            "tx1",
            PendingChange::Upsert {
                path: "a.py".into(),
                content: "x = 1".into(),
            },
        );
        plugin.record("tx2", PendingChange::Delete { path: "b.py".into() });

        assert_eq!(plugin.pending_count("tx1"), 1);
        assert_eq!(plugin.pending_count("tx2"), 1);

        let changes = plugin.take("tx1");
        assert_eq!(changes.len(), 1);
        assert_eq!(plugin.pending_count("tx1"), 0);
        assert_eq!(plugin.pending_count("tx2"), 1);
    }

    #[test]
    fn test_prune_only_drops_stale() {
        let plugin = IncrementalUpdatePlugin::new();
        plugin.record("tx1", PendingChange::Delete { path: "a.py".into() });
        // Nothing is older than the TTL yet
        assert_eq!(plugin.prune_stale(), 0);
        assert_eq!(plugin.transaction_count(), 1);
        // A zero TTL prunes everything
        assert_eq!(plugin.prune_older_than(Duration::ZERO), 1);
        assert_eq!(plugin.transaction_count(), 0);
    }
}

//! Cancellation token
//!
//! Long-running operations accept a token and check it at stage boundaries
//! and inside worklists (at least every `CHECK_INTERVAL` iterations).
//! Cancellation returns promptly; partial results are discarded unless
//! explicitly emitted.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::shared::models::{Result, StratumError};

/// Iterations between in-loop cancellation checks
pub const CHECK_INTERVAL: usize = 1024;

#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Error out if cancelled; call at stage boundaries.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(StratumError::internal("operation cancelled"))
        } else {
            Ok(())
        }
    }

    /// Cheap in-loop variant: only pays the atomic load every
    /// `CHECK_INTERVAL` iterations.
    pub fn check_every(&self, iteration: usize) -> Result<()> {
        if iteration % CHECK_INTERVAL == 0 {
            self.check()
        } else {
            Ok(())
        }
    }
}

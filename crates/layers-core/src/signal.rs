//! Named change signals used as cache expiration dependencies.
//!
//! Each key owns a monotonically advancing epoch. A [`ChangeToken`] records
//! the epoch it was taken at and reports a change once the epoch moves.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tracing::debug;

/// Process-wide registry of change signals.
#[derive(Debug, Default)]
pub struct Signal {
    epochs: Mutex<HashMap<String, Arc<AtomicU64>>>,
}

impl Signal {
    pub fn new() -> Self {
        Self::default()
    }

    fn epoch(&self, key: &str) -> Arc<AtomicU64> {
        let mut epochs = self.epochs.lock().unwrap_or_else(|e| e.into_inner());
        epochs
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(AtomicU64::new(0)))
            .clone()
    }

    /// Take a token bound to the current epoch of `key`.
    pub fn get_token(&self, key: &str) -> ChangeToken {
        let epoch = self.epoch(key);
        let observed = epoch.load(Ordering::SeqCst);
        ChangeToken {
            key: key.to_string(),
            epoch,
            observed,
        }
    }

    /// Advance the epoch of `key`, expiring every token taken before.
    pub fn signal_token(&self, key: &str) {
        let next = self.epoch(key).fetch_add(1, Ordering::SeqCst) + 1;
        debug!(event = "signal.raised", key = %key, epoch = next);
    }
}

/// Snapshot of a signal epoch.
#[derive(Debug, Clone)]
pub struct ChangeToken {
    key: String,
    epoch: Arc<AtomicU64>,
    observed: u64,
}

impl ChangeToken {
    /// Whether the signal has been raised since this token was taken.
    pub fn has_changed(&self) -> bool {
        self.epoch.load(Ordering::SeqCst) != self.observed
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

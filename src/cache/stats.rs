//! Cache Statistics Module
//!
//! Tracks refresh outcomes recorded against the cache.

use serde::Serialize;

// == Cache Stats ==
/// Counters updated by the refresh pipeline.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Number of successful image stores
    pub updates: u64,
    /// Number of source refreshes that exhausted every lookback date
    pub exhausted: u64,
    /// Current number of entries in the cache
    pub total_entries: usize,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Success Rate ==
    /// Returns updates / (updates + exhausted), or 0.0 before any refresh.
    pub fn success_rate(&self) -> f64 {
        let total = self.updates + self.exhausted;
        if total == 0 {
            0.0
        } else {
            self.updates as f64 / total as f64
        }
    }

    // == Record Update ==
    pub fn record_update(&mut self) {
        self.updates += 1;
    }

    // == Record Exhausted ==
    pub fn record_exhausted(&mut self) {
        self.exhausted += 1;
    }

    // == Update Entry Count ==
    pub fn set_total_entries(&mut self, count: usize) {
        self.total_entries = count;
    }
}

//! Cache Statistics Module
//!
//! Tracks eviction sweep activity and reports a snapshot of the cache size.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Cache Stats ==
/// Point-in-time view of the cache and its sweep history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Entries physically present, including expired ones not yet evicted
    pub total_entries: usize,
    /// Distinct expiry timestamps in the index
    pub buckets: usize,
    /// Sweeps that actually walked the index
    pub sweeps: u64,
    /// Sweep calls that waited on another sweep and did no work
    pub coalesced_sweeps: u64,
    /// Entries removed by sweeps
    pub evictions: u64,
    /// Sweeps whose walk was cut short by cancellation or the per-sweep cap
    pub truncated_sweeps: u64,
}

impl CacheStats {
    // == Coalesce Rate ==
    /// Fraction of sweep calls that were absorbed by another sweep.
    ///
    /// Returns 0.0 if no sweep has been requested.
    pub fn coalesce_rate(&self) -> f64 {
        let total = self.sweeps + self.coalesced_sweeps;
        if total == 0 {
            0.0
        } else {
            self.coalesced_sweeps as f64 / total as f64
        }
    }
}

// == Sweep Counters ==
/// Lock-free counters updated by sweeps.
#[derive(Debug, Default)]
pub(crate) struct SweepCounters {
    sweeps: AtomicU64,
    coalesced: AtomicU64,
    evictions: AtomicU64,
    truncated: AtomicU64,
}

impl SweepCounters {
    pub(crate) fn record_sweep(&self, evicted: u64, truncated: bool) {
        self.sweeps.fetch_add(1, Ordering::Relaxed);
        self.evictions.fetch_add(evicted, Ordering::Relaxed);
        if truncated {
            self.truncated.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_coalesced(&self) {
        self.coalesced.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, total_entries: usize, buckets: usize) -> CacheStats {
        CacheStats {
            total_entries,
            buckets,
            sweeps: self.sweeps.load(Ordering::Relaxed),
            coalesced_sweeps: self.coalesced.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            truncated_sweeps: self.truncated.load(Ordering::Relaxed),
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_default() {
        let stats = CacheStats::default();
        assert_eq!(stats.sweeps, 0);
        assert_eq!(stats.evictions, 0);
        assert_eq!(stats.total_entries, 0);
    }

    #[test]
    fn test_coalesce_rate_no_sweeps() {
        assert_eq!(CacheStats::default().coalesce_rate(), 0.0);
    }

    #[test]
    fn test_coalesce_rate_mixed() {
        let counters = SweepCounters::default();
        counters.record_sweep(5, false);
        counters.record_coalesced();

        assert_eq!(counters.snapshot(0, 0).coalesce_rate(), 0.5);
    }

    #[test]
    fn test_record_sweep() {
        let counters = SweepCounters::default();
        counters.record_sweep(3, false);
        counters.record_sweep(2, true);

        let stats = counters.snapshot(7, 2);
        assert_eq!(stats.sweeps, 2);
        assert_eq!(stats.evictions, 5);
        assert_eq!(stats.truncated_sweeps, 1);
        assert_eq!(stats.total_entries, 7);
        assert_eq!(stats.buckets, 2);
    }

    #[test]
    fn test_stats_serialize() {
        let json = serde_json::to_value(CacheStats::default()).unwrap();

        assert_eq!(json["coalesced_sweeps"], 0);
        assert_eq!(json["buckets"], 0);
    }
}

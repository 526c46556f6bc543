//! Per-source cache statistics.
//!
//! Counters are atomic and monotonically non-decreasing; they reset only
//! on process restart. Reads take a copy-out snapshot so callers never
//! observe torn values across the whole map.

use dashmap::DashMap;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Live counters for one chart source.
#[derive(Debug, Default)]
pub struct SourceStats {
    requests: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    failures: AtomicU64,
}

impl SourceStats {
    #[inline]
    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

/// Immutable counter snapshot for one source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub requests: u64,
    pub hits: u64,
    pub misses: u64,
    pub failures: u64,
}

/// Process-wide statistics, one entry per source identifier.
#[derive(Debug, Default)]
pub struct CacheStatsMap {
    sources: DashMap<String, Arc<SourceStats>>,
}

impl CacheStatsMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the counters for a source, creating them on first use.
    pub fn for_source(&self, identifier: &str) -> Arc<SourceStats> {
        self.sources
            .entry(identifier.to_string())
            .or_default()
            .clone()
    }

    /// Copy-out snapshot of every source's counters.
    pub fn snapshot(&self) -> HashMap<String, StatsSnapshot> {
        self.sources
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().snapshot()))
            .collect()
    }
}

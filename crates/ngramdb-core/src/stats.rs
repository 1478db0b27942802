//! Operation counters for the engine.
//!
//! Counters are relaxed atomics: they are diagnostics, not synchronization.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Live engine counters.
#[derive(Debug, Default)]
pub struct EngineStats {
    initial_patterns: AtomicU64,
    additions: AtomicU64,
    deletions: AtomicU64,
    missed_deletions: AtomicU64,
    queries: AtomicU64,
    matches: AtomicU64,
    query_bytes: AtomicU64,
    pattern_bytes: AtomicU64,
}

/// Point-in-time copy of [`EngineStats`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatsSnapshot {
    /// Patterns loaded before the operation stream.
    pub initial_patterns: u64,
    /// Add operations applied.
    pub additions: u64,
    /// Delete operations applied, including no-ops.
    pub deletions: u64,
    /// Deletes that found no open pattern to close.
    pub missed_deletions: u64,
    /// Queries matched.
    pub queries: u64,
    /// Distinct substrings reported across all queries.
    pub matches: u64,
    /// Mean query document length in bytes.
    pub avg_query_len: f64,
    /// Mean pattern length in bytes.
    pub avg_pattern_len: f64,
}

impl EngineStats {
    pub(crate) fn record_pattern(&self, initial: bool, len: usize) {
        if initial {
            self.initial_patterns.fetch_add(1, Ordering::Relaxed);
        } else {
            self.additions.fetch_add(1, Ordering::Relaxed);
        }
        self.pattern_bytes.fetch_add(len as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_deletion(&self, closed: bool) {
        self.deletions.fetch_add(1, Ordering::Relaxed);
        if !closed {
            self.missed_deletions.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_query(&self, document_len: usize, matches: usize) {
        self.queries.fetch_add(1, Ordering::Relaxed);
        self.query_bytes
            .fetch_add(document_len as u64, Ordering::Relaxed);
        self.matches.fetch_add(matches as u64, Ordering::Relaxed);
    }

    /// Captures the current counter values.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        let initial_patterns = self.initial_patterns.load(Ordering::Relaxed);
        let additions = self.additions.load(Ordering::Relaxed);
        let queries = self.queries.load(Ordering::Relaxed);
        let patterns = initial_patterns + additions;

        StatsSnapshot {
            initial_patterns,
            additions,
            deletions: self.deletions.load(Ordering::Relaxed),
            missed_deletions: self.missed_deletions.load(Ordering::Relaxed),
            queries,
            matches: self.matches.load(Ordering::Relaxed),
            avg_query_len: average(self.query_bytes.load(Ordering::Relaxed), queries),
            avg_pattern_len: average(self.pattern_bytes.load(Ordering::Relaxed), patterns),
        }
    }
}

fn average(total: u64, count: u64) -> f64 {
    if count == 0 {
        0.0
    } else {
        total as f64 / count as f64
    }
}

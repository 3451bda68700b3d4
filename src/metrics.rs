//! Query statistics.
//!
//! Every query takes a [`QueryMetrics`] handle and records what it did into
//! it. The handle uses atomic counters, so one handle may be shared by
//! queries running on several threads. Metrics never influence results.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Collector for query statistics.
#[derive(Debug, Default)]
pub struct QueryMetrics {
    issued_queries: AtomicU64,
    refinements: AtomicU64,
    proven_results: AtomicU64,
    scans: AtomicU64,
    filter_passes: AtomicU64,
    candidates: AtomicU64,
    scanned_bytes: AtomicU64,
    query_nanos: AtomicU64,
}

impl QueryMetrics {
    /// Create a new metrics collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an issued query.
    pub fn record_query(&self) {
        self.issued_queries.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one call of the refinement callback.
    pub fn record_refinement(&self) {
        self.refinements.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a range result whose upper bound already proved membership.
    pub fn record_proven_result(&self) {
        self.proven_results.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a full scan of the approximation file.
    pub fn record_scan(&self) {
        self.scans.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one filter pass that read `bytes` of approximations.
    pub fn record_filter_pass(&self, bytes: u64) {
        self.filter_passes.fetch_add(1, Ordering::Relaxed);
        self.scanned_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Record the number of candidates that survived filtering.
    pub fn record_candidates(&self, candidates: usize) {
        self.candidates
            .fetch_add(candidates as u64, Ordering::Relaxed);
    }

    /// Record the wall-clock time of one query.
    pub fn record_query_time(&self, elapsed: Duration) {
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.query_nanos.fetch_add(nanos, Ordering::Relaxed);
    }

    pub fn scans(&self) -> u64 {
        self.scans.load(Ordering::Relaxed)
    }

    /// Get a snapshot of the current counters.
    pub fn snapshot(&self) -> QueryStatistics {
        let issued_queries = self.issued_queries.load(Ordering::Relaxed);
        let query_nanos = self.query_nanos.load(Ordering::Relaxed);
        let avg_query_time = if issued_queries > 0 {
            Duration::from_nanos(query_nanos / issued_queries)
        } else {
            Duration::ZERO
        };

        QueryStatistics {
            issued_queries,
            refinements: self.refinements.load(Ordering::Relaxed),
            proven_results: self.proven_results.load(Ordering::Relaxed),
            scans: self.scans.load(Ordering::Relaxed),
            filter_passes: self.filter_passes.load(Ordering::Relaxed),
            candidates: self.candidates.load(Ordering::Relaxed),
            scanned_bytes: self.scanned_bytes.load(Ordering::Relaxed),
            query_time: Duration::from_nanos(query_nanos),
            avg_query_time,
        }
    }

    /// Reset all counters.
    pub fn reset(&self) {
        for counter in [
            &self.issued_queries,
            &self.refinements,
            &self.proven_results,
            &self.scans,
            &self.filter_passes,
            &self.candidates,
            &self.scanned_bytes,
            &self.query_nanos,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }

    /// Emit the counters at info level, prefixed with `index_name`.
    pub fn log_statistics(&self, index_name: &str) {
        let stats = self.snapshot();
        log::info!("{index_name}.issuedQueries: {}", stats.issued_queries);
        log::info!("{index_name}.refinements: {}", stats.refinements);
        log::info!(
            "{index_name}.refinementsPerQuery: {:.2}",
            stats.refinements_per_query()
        );
        log::info!("{index_name}.scans: {}", stats.scans);
        log::info!("{index_name}.scannedBytes: {}", stats.scanned_bytes);
        log::info!("{index_name}.queryTime: {:?}", stats.query_time);
    }
}

/// Point-in-time copy of [`QueryMetrics`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryStatistics {
    /// Number of queries issued.
    pub issued_queries: u64,
    /// Number of exact distance computations.
    pub refinements: u64,
    /// Range results already proven by their upper bound.
    pub proven_results: u64,
    /// Number of full approximation file scans.
    pub scans: u64,
    /// Number of filter passes over approximations.
    pub filter_passes: u64,
    /// Candidates that survived filtering, summed over queries.
    pub candidates: u64,
    /// Estimated bytes of approximations read.
    pub scanned_bytes: u64,
    /// Total query time.
    pub query_time: Duration,
    /// Average time per query.
    pub avg_query_time: Duration,
}

impl QueryStatistics {
    /// Average refinements per query.
    pub fn refinements_per_query(&self) -> f64 {
        if self.issued_queries == 0 {
            0.0
        } else {
            self.refinements as f64 / self.issued_queries as f64
        }
    }
}

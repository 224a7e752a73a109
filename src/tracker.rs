//! Run statistics shared by all fetch workers
//!
//! [`OutcomeTracker`] is the single mutable aggregate of a run. Workers of one window
//! report into it concurrently; every update takes the same lock, so counters and the
//! failure list never observe a partial update.

use crate::types::{ErrorKind, FailureRecord};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::sync::Mutex;

/// Snapshot of run statistics
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RunStats {
    /// Unique identifiers in the input
    pub total_products: usize,
    /// Products persisted, including those replayed from earlier runs
    pub completed: usize,
    /// Terminal failures, including those replayed from earlier runs
    pub failed: usize,
    /// Failures per error kind
    pub error_counts: BTreeMap<ErrorKind, usize>,
    /// Persisted products with at least one missing field
    pub incomplete_records: usize,
    /// Failures recorded during this run, in report order
    pub failures: Vec<FailureRecord>,
    /// When the run started
    pub started_at: Option<DateTime<Utc>>,
    /// When the run finished
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunStats {
    /// Wall-clock duration of the run, once it has both timestamps
    pub fn duration(&self) -> Option<Duration> {
        let (start, end) = (self.started_at?, self.finished_at?);
        (end - start).to_std().ok()
    }

    /// Average wall-clock time per completed product
    pub fn average_per_product(&self) -> Option<Duration> {
        let duration = self.duration()?;
        if self.completed == 0 {
            return None;
        }
        Some(duration.div_f64(self.completed as f64))
    }

    /// Share of `kind` among all counted failures, in percent
    pub fn failure_share(&self, kind: &ErrorKind) -> f64 {
        let total: usize = self.error_counts.values().sum();
        if total == 0 {
            return 0.0;
        }
        let count = self.error_counts.get(kind).copied().unwrap_or(0);
        count as f64 / total as f64 * 100.0
    }
}

impl std::fmt::Display for RunStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "========== Crawl Summary ==========")?;
        writeln!(f, "Total products: {}", self.total_products)?;
        writeln!(f, "Completed: {}", self.completed)?;
        writeln!(f, "Failed: {}", self.failed)?;
        if !self.error_counts.is_empty() {
            writeln!(f)?;
            writeln!(f, "Errors by kind:")?;
            for (kind, count) in &self.error_counts {
                writeln!(f, "  {}: {} ({:.1}%)", kind, count, self.failure_share(kind))?;
            }
        }
        writeln!(f)?;
        writeln!(f, "Products with missing fields: {}", self.incomplete_records)?;
        if let Some(duration) = self.duration() {
            writeln!(f)?;
            writeln!(f, "Execution time: {:.2} seconds", duration.as_secs_f64())?;
            if let Some(avg) = self.average_per_product() {
                writeln!(f, "Average time per product: {:.3} seconds", avg.as_secs_f64())?;
            }
        }
        Ok(())
    }
}

/// Concurrency-safe run statistics aggregate
///
/// Shared as `Arc<OutcomeTracker>` between the scheduler and its workers.
#[derive(Debug, Default)]
pub struct OutcomeTracker {
    stats: Mutex<RunStats>,
}

impl OutcomeTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the number of unique input identifiers
    pub async fn set_total(&self, total: usize) {
        self.stats.lock().await.total_products = total;
    }

    /// Stamp the start of the run
    pub async fn mark_started(&self) {
        self.stats.lock().await.started_at = Some(Utc::now());
    }

    /// Stamp the end of the run
    pub async fn mark_finished(&self) {
        self.stats.lock().await.finished_at = Some(Utc::now());
    }

    /// Count one fetched product
    pub async fn record_success(&self, incomplete: bool) {
        let mut stats = self.stats.lock().await;
        stats.completed += 1;
        if incomplete {
            stats.incomplete_records += 1;
        }
    }

    /// Count one terminal failure and keep its record for persistence
    pub async fn record_failure(&self, record: FailureRecord) {
        let mut stats = self.stats.lock().await;
        stats.failed += 1;
        *stats
            .error_counts
            .entry(record.error_kind.clone())
            .or_insert(0) += 1;
        stats.failures.push(record);
    }

    /// Count a failure persisted by an earlier run.
    ///
    /// Only the counters change; the record is already on disk and is not part of
    /// this run's failure list.
    pub async fn replay_failure(&self, kind: ErrorKind) {
        let mut stats = self.stats.lock().await;
        stats.failed += 1;
        *stats.error_counts.entry(kind).or_insert(0) += 1;
    }

    /// Failures recorded during this run
    pub async fn failures(&self) -> Vec<FailureRecord> {
        self.stats.lock().await.failures.clone()
    }

    /// Copy of the current statistics
    pub async fn snapshot(&self) -> RunStats {
        self.stats.lock().await.clone()
    }
}

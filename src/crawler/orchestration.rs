//! Crawl orchestration: top-level lifecycle of one run.

use std::collections::BTreeMap;
use std::time::Instant;

use crate::error::Result;
use crate::resume::{
    completed_ids, deduplicate_input, filter_pending, find_cross_batch_duplicates,
    replay_persisted_state,
};
use crate::types::{ProductId, RunState};

use super::batching::{fetch_batch, plan_batches};
use super::{CrawlReport, Crawler};

/// Duplicates listed individually in the audit log
const AUDIT_LOG_LIMIT: usize = 5;

impl Crawler {
    /// Crawl `ids`, resuming from whatever the output directory already holds.
    ///
    /// Phases:
    /// 1. Deduplicate the input and replay persisted outcomes into the tracker
    /// 2. Drop identifiers already present in a batch unit
    /// 3. Fetch the rest batch by batch, window by window, persisting each batch
    /// 4. Persist this run's failures, summarize and audit for duplicates
    ///
    /// Individual product failures never fail the run; they end up in the failure
    /// partitions. Errors writing the output directory are returned.
    pub async fn run(&self, ids: Vec<ProductId>) -> Result<CrawlReport> {
        log_state(RunState::Running);
        self.tracker.mark_started().await;
        self.store.ensure_dir().await?;

        // Phase 1: input dedup and replay
        let input_len = ids.len();
        let unique = deduplicate_input(ids);
        if unique.len() < input_len {
            tracing::info!(
                removed = input_len - unique.len(),
                unique = unique.len(),
                "Removed duplicate identifiers from input"
            );
        }
        let unique_len = unique.len();
        self.tracker.set_total(unique_len).await;
        replay_persisted_state(&self.store, &self.tracker).await;

        // Phase 2: resume filter
        let completed = completed_ids(&self.store).await;
        let pending = filter_pending(unique, &completed);
        let skipped = unique_len - pending.len();
        if skipped > 0 {
            tracing::info!(
                skipped = skipped,
                pending = pending.len(),
                "Skipping products already persisted by earlier runs"
            );
        }

        if pending.is_empty() {
            tracing::info!("All products have already been crawled");
            self.tracker.mark_finished().await;
            return Ok(self.finish(RunState::AlreadyDone, Vec::new(), Vec::new()).await);
        }

        // Phase 3: batches
        let first_index = self.store.layout().last_batch_number().await?;
        let batches = plan_batches(pending, self.config.crawl.batch_size, first_index)?;
        let batch_count = batches.len();
        tracing::info!(
            batches = batch_count,
            batch_size = self.config.crawl.batch_size,
            concurrency = self.config.crawl.concurrency,
            first_batch = first_index.saturating_add(1),
            "Starting crawl"
        );

        let mut written = Vec::new();
        let mut skipped_batches = Vec::new();
        for (position, batch) in batches.iter().enumerate() {
            let number = batch.number();

            if self.store.batch_exists(number).await? {
                tracing::info!(batch = number, "Batch unit already exists, skipping");
                skipped_batches.push(number);
                continue;
            }

            tracing::info!(
                batch = number,
                position = position + 1,
                of = batch_count,
                products = batch.ids.len(),
                "Processing batch"
            );
            let started = Instant::now();
            let records =
                fetch_batch(&self.worker, &batch.ids, self.config.crawl.concurrency).await;
            let path = self.store.write_batch(&records, batch.index).await?;
            written.push(number);

            let elapsed = started.elapsed();
            let stats = self.tracker.snapshot().await;
            let processed = stats.completed + stats.failed;
            let progress = if stats.total_products == 0 {
                100.0
            } else {
                processed as f64 / stats.total_products as f64 * 100.0
            };
            tracing::info!(
                batch = number,
                saved = records.len(),
                path = %path.display(),
                elapsed_secs = %format!("{:.2}", elapsed.as_secs_f64()),
                rate = %format!("{:.2}/s", records.len() as f64 / elapsed.as_secs_f64().max(f64::EPSILON)),
                progress = %format!("{processed}/{} ({progress:.1}%)", stats.total_products),
                failed_so_far = stats.failed,
                "Batch saved"
            );

            let is_last = position + 1 == batch_count;
            if !is_last && !self.config.crawl.batch_pause.is_zero() {
                tracing::debug!(
                    pause_ms = self.config.crawl.batch_pause.as_millis(),
                    "Pausing before next batch"
                );
                tokio::time::sleep(self.config.crawl.batch_pause).await;
            }
        }

        // Phase 4: failures, summary, audit
        self.tracker.mark_finished().await;
        let failures = self.tracker.failures().await;
        self.store.write_failures(&failures).await?;

        Ok(self
            .finish(RunState::Completed, written, skipped_batches)
            .await)
    }

    async fn finish(
        &self,
        state: RunState,
        batches_written: Vec<u32>,
        batches_skipped: Vec<u32>,
    ) -> CrawlReport {
        let stats = self.tracker.snapshot().await;
        tracing::info!(
            total = stats.total_products,
            completed = stats.completed,
            failed = stats.failed,
            incomplete = stats.incomplete_records,
            duration_secs = %format!("{:.2}", stats.duration().unwrap_or_default().as_secs_f64()),
            "Crawl summary"
        );

        let duplicates = find_cross_batch_duplicates(&self.store).await;
        log_duplicates(&duplicates);
        log_state(state);

        CrawlReport {
            state,
            stats,
            batches_written,
            batches_skipped,
            duplicates,
        }
    }
}

fn log_state(state: RunState) {
    tracing::info!(state = %state, "Crawl state changed");
}

fn log_duplicates(duplicates: &BTreeMap<ProductId, Vec<u32>>) {
    if duplicates.is_empty() {
        tracing::info!("No duplicate products across batch units");
        return;
    }

    tracing::warn!(
        count = duplicates.len(),
        "Products persisted in more than one batch unit"
    );
    for (id, batches) in duplicates.iter().take(AUDIT_LOG_LIMIT) {
        tracing::warn!(product_id = %id, batches = ?batches, "Duplicate product");
    }
    if duplicates.len() > AUDIT_LOG_LIMIT {
        tracing::warn!(
            remaining = duplicates.len() - AUDIT_LOG_LIMIT,
            "More duplicate products not listed"
        );
    }
}

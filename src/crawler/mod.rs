//! Crawl execution: batches, concurrency windows and end-of-run persistence.
//!
//! Split into focused submodules:
//! - [`orchestration`] - Top-level run lifecycle, resume and final reporting
//! - [`batching`] - Batch planning and windowed concurrent fetching

mod batching;
mod orchestration;


use crate::config::Config;
use crate::error::Result;
use crate::fetcher::{FetchWorker, HttpProductSource, ProductSource};
use crate::store::{BatchStore, OutputLayout};
use crate::tracker::{OutcomeTracker, RunStats};
use crate::types::{ProductId, RunState};
use std::collections::BTreeMap;
use std::sync::Arc;

/// What a finished [`Crawler::run`] did
#[derive(Clone, Debug, PartialEq)]
pub struct CrawlReport {
    /// Final state of the run
    pub state: RunState,
    /// Statistics at the end of the run, replayed counts included
    pub stats: RunStats,
    /// Batch numbers persisted by this run
    pub batches_written: Vec<u32>,
    /// Batch numbers skipped because their unit already existed
    pub batches_skipped: Vec<u32>,
    /// Identifiers found in more than one batch unit, with the batch numbers
    pub duplicates: BTreeMap<ProductId, Vec<u32>>,
}

/// Resumable bulk fetcher of catalog products
///
/// One crawler performs one run; statistics accumulate in its tracker.
pub struct Crawler {
    config: Arc<Config>,
    store: BatchStore,
    tracker: Arc<OutcomeTracker>,
    worker: FetchWorker,
}

impl Crawler {
    /// Crawler fetching from the HTTP API described by `config.api`
    pub fn new(config: Config) -> Result<Self> {
        let source = Arc::new(HttpProductSource::new(&config.api)?);
        Self::with_source(config, source)
    }

    /// Crawler fetching from a custom [`ProductSource`]
    pub fn with_source(config: Config, source: Arc<dyn ProductSource>) -> Result<Self> {
        config.validate()?;
        let tracker = Arc::new(OutcomeTracker::new());
        let store = BatchStore::new(OutputLayout::new(config.output_dir.clone()));
        let worker = FetchWorker::new(source, config.retry.clone(), tracker.clone());

        Ok(Self {
            config: Arc::new(config),
            store,
            tracker,
            worker,
        })
    }

    /// Run statistics, live while a run is in progress
    pub fn tracker(&self) -> &Arc<OutcomeTracker> {
        &self.tracker
    }

    /// Output directory access
    pub fn store(&self) -> &BatchStore {
        &self.store
    }

    /// Active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}

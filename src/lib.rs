//! # catalog-crawler
//!
//! Resumable bulk fetcher for product records of a remote catalog API.
//!
//! ## Design Philosophy
//!
//! catalog-crawler is designed to be:
//! - **Resumable** - Progress lives only in the output directory; re-running the same
//!   input picks up where the previous run stopped
//! - **Bounded** - Products are fetched in fixed-size concurrency windows with a
//!   pause between batches
//! - **Failure tolerant** - Every product gets a bounded number of attempts; failures
//!   are persisted by kind instead of aborting the run
//!
//! ## Quick Start
//!
//! ```no_run
//! use catalog_crawler::{Config, Crawler, ProductId};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config {
//!         output_dir: "products_json".into(),
//!         ..Default::default()
//!     };
//!
//!     let crawler = Crawler::new(config)?;
//!     let report = crawler
//!         .run(vec![ProductId::new("74021317"), ProductId::new("58259141")])
//!         .await?;
//!
//!     println!("{}", report.stats);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Batch scheduling and run lifecycle
pub mod crawler;
/// Error types
pub mod error;
/// Single-product fetching against the catalog API
pub mod fetcher;
/// Identifier list loading
pub mod input;
/// Input deduplication and resume state
pub mod resume;
/// Retry logic with linear backoff
pub mod retry;
/// Output directory persistence
pub mod store;
/// Run statistics
pub mod tracker;
/// Core types
pub mod types;
/// Helper functions
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlReport, Crawler};
pub use error::{Error, FetchError, Result};
pub use fetcher::{FetchWorker, HttpProductSource, ProductSource};
pub use store::{BatchStore, OutputLayout};
pub use tracker::{OutcomeTracker, RunStats};
pub use types::{ErrorKind, FailureRecord, FetchOutcome, ProductId, ProductRecord, RunState};

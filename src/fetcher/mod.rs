//! Fetching one product: remote lookup, retries and outcome reporting.
//!
//! - [`ProductSource`] - Abstraction over the catalog API, enabling testability
//! - [`HttpProductSource`] - Production source backed by reqwest
//! - [`FetchWorker`] - One identifier in, one [`FetchOutcome`] out
//! - [`normalize()`] - Payload to persisted record conversion

mod normalize;


pub use normalize::{RawImage, RawProduct, clean_description, normalize};

use crate::config::{ApiConfig, RetryConfig};
use crate::error::{FetchError, Result};
use crate::retry::fetch_with_retry;
use crate::tracker::OutcomeTracker;
use crate::types::{ErrorKind, FailureRecord, FetchOutcome, ProductId};
use std::sync::Arc;

/// Abstraction over product detail lookups.
#[async_trait::async_trait]
pub trait ProductSource: Send + Sync {
    /// Perform a single attempt to fetch the product `id`.
    async fn fetch_product(&self, id: &ProductId) -> std::result::Result<RawProduct, FetchError>;
}

/// Production [`ProductSource`] issuing `GET {base_url}/{id}` requests.
#[derive(Clone, Debug)]
pub struct HttpProductSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpProductSource {
    /// Build the HTTP client with the configured per-request timeout and user agent.
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// URL requested for `id`
    pub fn product_url(&self, id: &ProductId) -> String {
        format!("{}/{}", self.base_url, urlencoding::encode(id.as_str()))
    }
}

#[async_trait::async_trait]
impl ProductSource for HttpProductSource {
    async fn fetch_product(&self, id: &ProductId) -> std::result::Result<RawProduct, FetchError> {
        let response = self.client.get(self.product_url(id)).send().await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(FetchError::Status(status.as_u16()));
        }

        Ok(response.json::<RawProduct>().await?)
    }
}

/// Fetches single products with retries and reports every outcome to the tracker.
///
/// Cheap to clone; all clones share the source and the tracker.
#[derive(Clone)]
pub struct FetchWorker {
    source: Arc<dyn ProductSource>,
    retry: RetryConfig,
    tracker: Arc<OutcomeTracker>,
}

impl FetchWorker {
    /// Create a worker over `source`
    pub fn new(
        source: Arc<dyn ProductSource>,
        retry: RetryConfig,
        tracker: Arc<OutcomeTracker>,
    ) -> Self {
        Self {
            source,
            retry,
            tracker,
        }
    }

    /// Fetch `id` until it succeeds or the attempt budget is spent.
    ///
    /// Never fails: exhausted retries become [`FetchOutcome::Failed`] with the error
    /// kind classified from the last error message. Both outcomes are counted in the
    /// tracker before returning.
    pub async fn fetch(&self, id: &ProductId) -> FetchOutcome {
        let source = &self.source;
        let result = fetch_with_retry(&self.retry, |attempt| async move {
            let result = source.fetch_product(id).await;
            if attempt == 0
                && let Err(e) = &result
            {
                log_first_failure(id, e);
            }
            result
        })
        .await;

        match result {
            Ok(raw) => {
                let record = normalize(raw);
                self.tracker.record_success(record.is_incomplete()).await;
                FetchOutcome::Fetched(record)
            }
            Err(exhausted) => {
                let message = exhausted.last_error.to_string();
                let kind = ErrorKind::classify(&message);
                tracing::debug!(
                    product_id = %id,
                    attempts = exhausted.attempts,
                    kind = %kind,
                    error = %message,
                    "Product failed after all attempts"
                );
                let record = FailureRecord::now(id.clone(), kind, message);
                self.tracker.record_failure(record.clone()).await;
                FetchOutcome::Failed(record)
            }
        }
    }
}

fn log_first_failure(id: &ProductId, error: &FetchError) {
    match error {
        FetchError::Status(404) => {
            tracing::debug!(product_id = %id, "Product not found");
        }
        FetchError::Status(code) => {
            tracing::warn!(product_id = %id, status = code, "Unexpected HTTP status");
        }
        FetchError::Timeout => {
            tracing::warn!(product_id = %id, "Request timed out");
        }
        FetchError::Transport(message) => {
            tracing::warn!(product_id = %id, error = %message, "Request failed");
        }
    }
}

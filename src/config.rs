//! Configuration types for catalog-crawler

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default product detail endpoint; the product id is appended as the last path segment
pub const DEFAULT_API_BASE_URL: &str = "https://api.tiki.vn/product-detail/api/v1/products";

/// Where the identifier list is read from
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct InputConfig {
    /// CSV file holding the identifiers (default: "dataset/product_ids.csv")
    #[serde(default = "default_input_path")]
    pub path: PathBuf,

    /// Column holding the identifiers (default: "id")
    #[serde(default = "default_id_column")]
    pub id_column: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            path: default_input_path(),
            id_column: default_id_column(),
        }
    }
}

/// Batch and window sizing
///
/// Used as a flattened sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CrawlConfig {
    /// Number of identifiers persisted together as one batch unit (default: 1000)
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Width of a concurrency window, i.e. fetches in flight at once (default: 50)
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Pause between two batches to bound the request rate (default: 2 seconds)
    #[serde(default = "default_batch_pause", with = "duration_serde")]
    pub batch_pause: Duration,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            concurrency: default_concurrency(),
            batch_pause: default_batch_pause(),
        }
    }
}

/// Catalog API client settings
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ApiConfig {
    /// Product endpoint; `{base_url}/{id}` is requested for each product
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Timeout of a single request attempt (default: 20 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout: default_request_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// Retry configuration for failed fetches
///
/// Delays grow linearly: the sleep after attempt `i` (0-based) is
/// `base_delay * (i + 1)`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RetryConfig {
    /// Total number of attempts per product, first one included (default: 5)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Backoff unit (default: 1 second)
    #[serde(default = "default_base_delay", with = "duration_serde")]
    pub base_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay: default_base_delay(),
        }
    }
}

/// Main configuration for the crawler
///
/// Every field has a default, so an empty JSON object is a valid configuration.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Identifier list location
    #[serde(default)]
    pub input: InputConfig,

    /// Directory receiving batch units and failure partitions (default: "products_json")
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Batch and window sizing
    #[serde(flatten)]
    pub crawl: CrawlConfig,

    /// Catalog API client settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Retry policy for individual products
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input: InputConfig::default(),
            output_dir: default_output_dir(),
            crawl: CrawlConfig::default(),
            api: ApiConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl Config {
    /// Load a configuration from a JSON file. Missing keys fall back to defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| Error::storage(path, e))?;
        let config: Config = serde_json::from_str(&raw)?;
        Ok(config)
    }

    /// Check the settings that would make a run meaningless or impossible.
    pub fn validate(&self) -> Result<()> {
        if self.crawl.batch_size == 0 {
            return Err(Error::config("batch_size", "batch_size must be greater than zero"));
        }
        if self.crawl.concurrency == 0 {
            return Err(Error::config(
                "concurrency",
                "concurrency must be greater than zero",
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::config(
                "retry.max_attempts",
                "max_attempts must be at least 1",
            ));
        }
        if self.api.request_timeout.is_zero() {
            return Err(Error::config(
                "api.request_timeout",
                "request_timeout must be greater than zero",
            ));
        }
        match url::Url::parse(&self.api.base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => {
                return Err(Error::config(
                    "api.base_url",
                    format!("unsupported URL scheme '{}'", url.scheme()),
                ));
            }
            Err(e) => {
                return Err(Error::config(
                    "api.base_url",
                    format!("invalid URL '{}': {}", self.api.base_url, e),
                ));
            }
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(Error::config("output_dir", "output_dir must not be empty"));
        }
        if self.input.id_column.trim().is_empty() {
            return Err(Error::config("input.id_column", "id_column must not be empty"));
        }
        Ok(())
    }
}

// Default value functions
fn default_input_path() -> PathBuf {
    PathBuf::from("dataset").join("product_ids.csv")
}

fn default_id_column() -> String {
    "id".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("products_json")
}

fn default_batch_size() -> usize {
    1000
}

fn default_concurrency() -> usize {
    50
}

fn default_batch_pause() -> Duration {
    Duration::from_secs(2)
}

fn default_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(20)
}

fn default_user_agent() -> String {
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_max_attempts() -> u32 {
    5
}

fn default_base_delay() -> Duration {
    Duration::from_secs(1)
}

// Duration serialization helper (fractional seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(duration.as_secs_f64())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.input.path, PathBuf::from("dataset").join("product_ids.csv"));
        assert_eq!(config.input.id_column, "id");
        assert_eq!(config.output_dir, PathBuf::from("products_json"));
        assert_eq!(config.crawl.batch_size, 1000);
        assert_eq!(config.crawl.concurrency, 50);
        assert_eq!(config.crawl.batch_pause, Duration::from_secs(2));
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.base_delay, Duration::from_secs(1));
        assert_eq!(config.api.request_timeout, Duration::from_secs(20));
        assert_eq!(config.api.base_url, DEFAULT_API_BASE_URL);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_json_object_yields_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn partial_json_overrides_only_given_keys() {
        let json = r#"{
            "output_dir": "out",
            "batch_size": 10,
            "batch_pause": 0.5,
            "retry": { "max_attempts": 3 },
            "api": { "request_timeout": 5 }
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();

        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.crawl.batch_size, 10);
        assert_eq!(config.crawl.concurrency, 50);
        assert_eq!(config.crawl.batch_pause, Duration::from_millis(500));
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.base_delay, Duration::from_secs(1));
        assert_eq!(config.api.request_timeout, Duration::from_secs(5));
        assert_eq!(config.api.base_url, DEFAULT_API_BASE_URL);
    }

    #[test]
    fn negative_duration_is_rejected() {
        let result = serde_json::from_str::<Config>(r#"{"batch_pause": -1}"#);
        assert!(result.is_err());
    }

    #[test]
    fn serialization_roundtrip_preserves_sub_configs() {
        let mut config = Config::default();
        config.crawl.concurrency = 7;
        config.retry.base_delay = Duration::from_millis(250);

        let json = serde_json::to_string(&config).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn validate_rejects_zero_batch_size() {
        let mut config = Config::default();
        config.crawl.batch_size = 0;
        match config.validate().unwrap_err() {
            Error::Config { key, .. } => assert_eq!(key.as_deref(), Some("batch_size")),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn validate_rejects_zero_concurrency() {
        let mut config = Config::default();
        config.crawl.concurrency = 0;
        match config.validate().unwrap_err() {
            Error::Config { key, .. } => assert_eq!(key.as_deref(), Some("concurrency")),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn validate_rejects_zero_attempts() {
        let mut config = Config::default();
        config.retry.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_output_dir() {
        let config = Config {
            output_dir: PathBuf::new(),
            ..Config::default()
        };
        match config.validate().unwrap_err() {
            Error::Config { key, .. } => assert_eq!(key.as_deref(), Some("output_dir")),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn validate_rejects_bad_base_url() {
        let mut config = Config::default();
        config.api.base_url = "not a url".to_string();
        assert!(config.validate().is_err());

        config.api.base_url = "ftp://example.com/products".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn from_file_reads_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crawler.json");
        std::fs::write(&path, r#"{"concurrency": 4, "input": {"id_column": "product_id"}}"#)
            .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.crawl.concurrency, 4);
        assert_eq!(config.input.id_column, "product_id");
        assert_eq!(config.input.path, PathBuf::from("dataset").join("product_ids.csv"));
    }

    #[test]
    fn from_file_missing_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::from_file(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, Error::Storage { .. }), "got {err:?}");
    }
}

//! Core types for catalog-crawler

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Opaque identifier of one remote product
///
/// The catalog API returns numeric ids, while input files carry them as text, so
/// deserialization accepts both a JSON string and a JSON number.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    /// Create a new ProductId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProductId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ProductId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl<'de> Deserialize<'de> for ProductId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(serde_json::Number),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => ProductId(s),
            Raw::Number(n) => ProductId(n.to_string()),
        })
    }
}

/// Normalized product as persisted in a batch unit
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    /// Product id as reported by the API
    pub id: Option<ProductId>,
    /// Display name
    pub name: Option<String>,
    /// URL slug
    pub url_key: Option<String>,
    /// Price, kept as the API's JSON number
    pub price: Option<serde_json::Number>,
    /// Description with markup removed and whitespace collapsed
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    /// Image base URLs in source order
    #[serde(default, deserialize_with = "images_without_nulls")]
    pub images: Vec<String>,
}

impl ProductRecord {
    /// Whether any required field is missing or empty.
    ///
    /// Required: id, name, url_key, price (zero counts as missing), description and
    /// at least one image.
    pub fn is_incomplete(&self) -> bool {
        let blank = |s: &Option<String>| s.as_deref().is_none_or(str::is_empty);
        let missing_id = self.id.as_ref().is_none_or(|id| id.as_str().is_empty());
        let missing_price = self.price.as_ref().is_none_or(is_zero);

        missing_id
            || blank(&self.name)
            || blank(&self.url_key)
            || missing_price
            || self.description.is_empty()
            || self.images.is_empty()
    }
}

fn is_zero(n: &serde_json::Number) -> bool {
    n.as_f64() == Some(0.0)
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn images_without_nulls<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let images: Option<Vec<Option<String>>> = Option::deserialize(deserializer)?;
    Ok(images.unwrap_or_default().into_iter().flatten().collect())
}

/// Classification tag of a terminal fetch failure
///
/// Serialized as its string tag: the status token (`"404"`, `"500"`), `"TIMEOUT"`,
/// `"ERROR"` or `"UNKNOWN"`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum ErrorKind {
    /// HTTP-status-like token taken from the error message
    Status(String),
    /// The request timed out
    Timeout,
    /// Any other transport or decode failure
    Error,
    /// Replayed record that carried no kind
    Unknown,
}

impl ErrorKind {
    /// Classify the message of the last failed attempt.
    ///
    /// A message mentioning a timeout (case-insensitive) starts as [`ErrorKind::Timeout`],
    /// anything else as [`ErrorKind::Error`]. A message containing `HTTP` is then
    /// classified by its second whitespace-separated token (`"HTTP 503"` → `"503"`),
    /// or `HTTP_ERROR` when there is no such token. This is text based and can
    /// misclassify non-HTTP messages that happen to contain `HTTP`.
    ///
    /// # Examples
    ///
    /// ```
    /// use catalog_crawler::types::ErrorKind;
    ///
    /// assert_eq!(ErrorKind::classify("HTTP 404"), ErrorKind::Status("404".into()));
    /// assert_eq!(ErrorKind::classify("Request timeout"), ErrorKind::Timeout);
    /// assert_eq!(ErrorKind::classify("connection refused"), ErrorKind::Error);
    /// ```
    pub fn classify(message: &str) -> Self {
        if message.contains("HTTP") {
            let token = message.split_whitespace().nth(1).unwrap_or("HTTP_ERROR");
            return ErrorKind::from(token.to_string());
        }
        if message.to_lowercase().contains("timeout") {
            ErrorKind::Timeout
        } else {
            ErrorKind::Error
        }
    }

    /// String tag of this kind
    pub fn as_str(&self) -> &str {
        match self {
            ErrorKind::Status(token) => token,
            ErrorKind::Timeout => "TIMEOUT",
            ErrorKind::Error => "ERROR",
            ErrorKind::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for ErrorKind {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "TIMEOUT" => ErrorKind::Timeout,
            "ERROR" => ErrorKind::Error,
            "UNKNOWN" | "" => ErrorKind::Unknown,
            _ => ErrorKind::Status(tag),
        }
    }
}

impl From<ErrorKind> for String {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::Status(token) => token,
            other => other.as_str().to_string(),
        }
    }
}

/// One product that could not be fetched
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    /// The identifier that failed
    pub product_id: ProductId,
    /// Classification of the last error
    #[serde(rename = "error_code", alias = "error_kind", default = "unknown_kind")]
    pub error_kind: ErrorKind,
    /// Message of the last error
    #[serde(default)]
    pub error_message: String,
    /// When the failure was recorded
    #[serde(deserialize_with = "lenient_timestamp")]
    pub timestamp: DateTime<Utc>,
}

fn unknown_kind() -> ErrorKind {
    ErrorKind::Unknown
}

/// Timestamp layouts without an offset, read as UTC
const NAIVE_TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse a failure timestamp written by this crate or by older tooling.
///
/// RFC 3339 values keep their offset; naive ISO 8601 values such as
/// `2024-05-01T10:00:00.123456` are taken to be UTC.
///
/// ```
/// use catalog_crawler::types::parse_timestamp;
///
/// assert!(parse_timestamp("2024-05-01T10:00:00Z").is_some());
/// assert!(parse_timestamp("2024-05-01T10:00:00.123456").is_some());
/// assert!(parse_timestamp("yesterday").is_none());
/// ```
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NAIVE_TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("unrecognized timestamp '{raw}'")))
}

impl FailureRecord {
    /// Build a failure record stamped with the current time
    pub fn now(product_id: ProductId, error_kind: ErrorKind, error_message: String) -> Self {
        Self {
            product_id,
            error_kind,
            error_message,
            timestamp: Utc::now(),
        }
    }
}

/// Result of fetching one product
#[derive(Clone, Debug, PartialEq)]
pub enum FetchOutcome {
    /// The product was fetched and normalized
    Fetched(ProductRecord),
    /// All attempts failed
    Failed(FailureRecord),
}

impl FetchOutcome {
    /// The record, if the fetch succeeded
    pub fn into_record(self) -> Option<ProductRecord> {
        match self {
            FetchOutcome::Fetched(record) => Some(record),
            FetchOutcome::Failed(_) => None,
        }
    }
}

/// Lifecycle of a crawl run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// Created, not started
    Pending,
    /// Fetching and persisting batches
    Running,
    /// Every input identifier was already persisted; nothing was fetched
    AlreadyDone,
    /// All batches were processed
    Completed,
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunState::Pending => "pending",
            RunState::Running => "running",
            RunState::AlreadyDone => "already_done",
            RunState::Completed => "completed",
        };
        f.write_str(s)
    }
}

//! Conversion of catalog API payloads into persisted product records

use crate::types::{ProductId, ProductRecord};
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

#[allow(clippy::expect_used)]
static MARKUP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));

#[allow(clippy::expect_used)]
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Product detail payload, limited to the fields the crawler keeps
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct RawProduct {
    /// Product id
    #[serde(default)]
    pub id: Option<ProductId>,
    /// Display name
    #[serde(default)]
    pub name: Option<String>,
    /// URL slug
    #[serde(default)]
    pub url_key: Option<String>,
    /// Price
    #[serde(default)]
    pub price: Option<serde_json::Number>,
    /// HTML description
    #[serde(default)]
    pub description: Option<String>,
    /// Product images
    #[serde(default)]
    pub images: Option<Vec<RawImage>>,
}

/// One entry of the `images` array
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct RawImage {
    /// Full-size image URL
    #[serde(default)]
    pub base_url: Option<String>,
}

/// Remove markup tags and collapse whitespace runs into single spaces.
///
/// # Examples
///
/// ```
/// use catalog_crawler::fetcher::clean_description;
///
/// let html = "<p>Fast  charging</p>\n<ul><li>20W</li></ul>";
/// assert_eq!(clean_description(Some(html)), "Fast charging 20W");
/// assert_eq!(clean_description(None), "");
/// ```
pub fn clean_description(text: Option<&str>) -> String {
    let Some(text) = text.filter(|t| !t.is_empty()) else {
        return String::new();
    };
    let stripped = MARKUP.replace_all(text, "");
    WHITESPACE.replace_all(&stripped, " ").trim().to_string()
}

/// Build the persisted record from an API payload.
///
/// Image entries without a `base_url` are dropped; order is kept.
pub fn normalize(raw: RawProduct) -> ProductRecord {
    let description = clean_description(raw.description.as_deref());
    let images = raw
        .images
        .unwrap_or_default()
        .into_iter()
        .filter_map(|image| image.base_url)
        .collect();

    ProductRecord {
        id: raw.id,
        name: raw.name,
        url_key: raw.url_key,
        price: raw.price,
        description,
        images,
    }
}

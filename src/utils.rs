//! Utility functions for file operations and message handling

use crate::error::{Error, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// Truncate `text` to at most `max_chars` characters, respecting UTF-8 boundaries.
///
/// # Examples
///
/// ```
/// use catalog_crawler::utils::truncate_chars;
///
/// assert_eq!(truncate_chars("connection refused", 10), "connection");
/// assert_eq!(truncate_chars("ok", 10), "ok");
/// ```
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Path of the temporary sibling used while writing `path`.
///
/// `products_1.json` becomes `products_1.json.tmp`, so partially written files never
/// match the output naming patterns.
pub fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Serialize `value` as pretty-printed JSON and write it to `path` atomically.
///
/// The content is first written to a temporary sibling file and then renamed over
/// `path`, so readers see either the old file or the complete new one.
pub async fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    let tmp_path = temp_path_for(path);

    tokio::fs::write(&tmp_path, &bytes)
        .await
        .map_err(|e| Error::storage(&tmp_path, e))?;

    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        // Best effort: do not leave the temporary file around
        tokio::fs::remove_file(&tmp_path).await.ok();
        return Err(Error::storage(path, e));
    }

    Ok(())
}

/// Read and deserialize a JSON file.
pub async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| Error::storage(path, e))?;
    Ok(serde_json::from_slice(&bytes)?)
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn truncate_respects_multibyte_characters() {
        let text = "\u{0110}i\u{1ec7}n tho\u{1ea1}i";
        let truncated = truncate_chars(text, 5);
        assert_eq!(truncated, "\u{0110}i\u{1ec7}n ");
        assert_eq!(truncated.chars().count(), 5);
    }

    #[test]
    fn temp_path_keeps_full_file_name() {
        let tmp = temp_path_for(Path::new("/out/products_3.json"));
        assert_eq!(tmp, PathBuf::from("/out/products_3.json.tmp"));
    }

    #[tokio::test]
    async fn write_json_atomic_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.json");

        write_json_atomic(&path, &vec![1, 2, 3]).await.unwrap();

        let loaded: Vec<i32> = read_json(&path).await.unwrap();
        assert_eq!(loaded, vec![1, 2, 3]);
        assert!(!temp_path_for(&path).exists(), "temp file should be renamed away");
    }

    #[tokio::test]
    async fn write_json_atomic_replaces_existing_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.json");

        write_json_atomic(&path, &vec!["old"]).await.unwrap();
        write_json_atomic(&path, &vec!["new", "content"]).await.unwrap();

        let loaded: Vec<String> = read_json(&path).await.unwrap();
        assert_eq!(loaded, vec!["new", "content"]);
    }

    #[tokio::test]
    async fn write_json_atomic_into_missing_directory_fails_with_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("data.json");

        let err = write_json_atomic(&path, &vec![1]).await.unwrap_err();
        assert!(matches!(err, Error::Storage { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn read_json_reports_malformed_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.json");
        tokio::fs::write(&path, b"[{not json").await.unwrap();

        let err = read_json::<Vec<i32>>(&path).await.unwrap_err();
        assert!(matches!(err, Error::Serialization(_)), "got {err:?}");
    }
}

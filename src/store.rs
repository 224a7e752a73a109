//! Durable output: batch units and failure partitions
//!
//! Output directory layout:
//! - `products_<N>.json`: batch unit `N` (1-based), array of [`ProductRecord`]
//! - `failed_<kind>.json`: failures of one kind, merged across runs, one per product
//! - `all_failed_products.json`: failures of the latest run only
//!
//! Every file is written to a temporary sibling first and renamed into place.

use crate::error::{Error, Result};
use crate::types::{ErrorKind, FailureRecord, ProductId, ProductRecord};
use crate::utils::{read_json, write_json_atomic};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

const BATCH_PREFIX: &str = "products_";
const FAILURE_PREFIX: &str = "failed_";
const JSON_SUFFIX: &str = ".json";
const ALL_FAILED_FILE: &str = "all_failed_products.json";

/// A batch unit present on disk
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchUnitRef {
    /// 1-based batch number
    pub number: u32,
    /// Location of the file
    pub path: PathBuf,
}

/// File naming inside the output directory
#[derive(Clone, Debug)]
pub struct OutputLayout {
    dir: PathBuf,
}

impl OutputLayout {
    /// Layout rooted at `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The output directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of batch unit `number` (1-based)
    pub fn batch_path(&self, number: u32) -> PathBuf {
        self.dir.join(format!("{BATCH_PREFIX}{number}{JSON_SUFFIX}"))
    }

    /// Path of the merged failure partition for `kind`
    pub fn failure_partition_path(&self, kind: &ErrorKind) -> PathBuf {
        self.dir.join(format!(
            "{FAILURE_PREFIX}{}{JSON_SUFFIX}",
            kind.as_str().to_lowercase()
        ))
    }

    /// Path of the per-run consolidated failure list
    pub fn all_failed_path(&self) -> PathBuf {
        self.dir.join(ALL_FAILED_FILE)
    }

    /// Batch number encoded in a file name like `products_12.json`
    pub fn parse_batch_number(file_name: &str) -> Option<u32> {
        file_name
            .strip_prefix(BATCH_PREFIX)?
            .strip_suffix(JSON_SUFFIX)?
            .parse()
            .ok()
    }

    /// Whether a file name is a failure partition like `failed_404.json`
    pub fn is_failure_partition(file_name: &str) -> bool {
        file_name.starts_with(FAILURE_PREFIX) && file_name.ends_with(JSON_SUFFIX)
    }

    /// All batch units on disk, sorted by number. A missing directory has none.
    pub async fn batch_units(&self) -> Result<Vec<BatchUnitRef>> {
        let mut units: Vec<BatchUnitRef> = self
            .file_names()
            .await?
            .into_iter()
            .filter_map(|name| {
                Self::parse_batch_number(&name).map(|number| BatchUnitRef {
                    number,
                    path: self.dir.join(&name),
                })
            })
            .collect();
        units.sort_by_key(|u| u.number);
        Ok(units)
    }

    /// All failure partitions on disk, sorted by file name
    pub async fn failure_partitions(&self) -> Result<Vec<PathBuf>> {
        let mut paths: Vec<PathBuf> = self
            .file_names()
            .await?
            .into_iter()
            .filter(|name| Self::is_failure_partition(name))
            .map(|name| self.dir.join(name))
            .collect();
        paths.sort();
        Ok(paths)
    }

    /// Highest batch number on disk (0 when there is none)
    pub async fn last_batch_number(&self) -> Result<u32> {
        Ok(self
            .batch_units()
            .await?
            .last()
            .map(|u| u.number)
            .unwrap_or(0))
    }

    async fn file_names(&self) -> Result<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::storage(&self.dir, e)),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Error::storage(&self.dir, e))?
        {
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }
}

/// Outcome of merging one failure partition
#[derive(Clone, Debug, PartialEq)]
pub struct PartitionWrite {
    /// Kind stored in the partition
    pub kind: ErrorKind,
    /// Records of this run for the kind
    pub reported: usize,
    /// Records actually appended (not already present)
    pub added: usize,
    /// Records in the partition after the merge
    pub total: usize,
}

/// Outcome of [`BatchStore::write_failures`]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FailureWriteReport {
    /// One entry per merged error kind, sorted by kind
    pub partitions: Vec<PartitionWrite>,
    /// Kinds whose existing partition could not be read and was left untouched
    pub untouched: Vec<ErrorKind>,
    /// Records written to the consolidated per-run file
    pub consolidated: usize,
}

impl FailureWriteReport {
    /// Share of `kind` among this run's failures, in percent
    pub fn share(&self, kind: &ErrorKind) -> f64 {
        let total = self.consolidated;
        if total == 0 {
            return 0.0;
        }
        let count = self
            .partitions
            .iter()
            .find(|p| &p.kind == kind)
            .map(|p| p.reported)
            .unwrap_or(0);
        count as f64 / total as f64 * 100.0
    }
}

/// Writer and reader of the output directory
#[derive(Clone, Debug)]
pub struct BatchStore {
    layout: OutputLayout,
}

impl BatchStore {
    /// Store over the given layout
    pub fn new(layout: OutputLayout) -> Self {
        Self { layout }
    }

    /// File naming used by this store
    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    /// Create the output directory if needed
    pub async fn ensure_dir(&self) -> Result<()> {
        tokio::fs::create_dir_all(self.layout.dir())
            .await
            .map_err(|e| Error::storage(self.layout.dir(), e))
    }

    /// Whether batch unit `number` (1-based) exists
    pub async fn batch_exists(&self, number: u32) -> Result<bool> {
        let path = self.layout.batch_path(number);
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| Error::storage(&path, e))
    }

    /// Persist `records` as the batch unit of 0-based `batch_index`.
    ///
    /// Does not check whether the unit already exists; callers decide that before
    /// fetching.
    pub async fn write_batch(&self, records: &[ProductRecord], batch_index: u32) -> Result<PathBuf> {
        let path = self.layout.batch_path(batch_index + 1);
        write_json_atomic(&path, records).await?;
        tracing::debug!(path = %path.display(), records = records.len(), "Batch unit written");
        Ok(path)
    }

    /// Read one batch unit
    pub async fn read_batch(&self, path: &Path) -> Result<Vec<ProductRecord>> {
        read_json(path).await
    }

    /// Read one failure partition
    pub async fn read_failures(&self, path: &Path) -> Result<Vec<FailureRecord>> {
        read_json(path).await
    }

    /// Persist this run's failures.
    ///
    /// Each kind is merged into its partition, skipping product ids the partition
    /// already holds. A partition that exists but cannot be parsed is never
    /// overwritten; its kind is reported in [`FailureWriteReport::untouched`] and the
    /// records only reach the consolidated file. The consolidated file receives
    /// `failures` unchanged. Nothing is written when `failures` is empty.
    pub async fn write_failures(&self, failures: &[FailureRecord]) -> Result<FailureWriteReport> {
        if failures.is_empty() {
            return Ok(FailureWriteReport::default());
        }

        let mut by_kind: BTreeMap<&ErrorKind, Vec<&FailureRecord>> = BTreeMap::new();
        for record in failures {
            by_kind.entry(&record.error_kind).or_default().push(record);
        }

        let mut report = FailureWriteReport::default();
        for (kind, records) in by_kind {
            let path = self.layout.failure_partition_path(kind);
            let Some(mut merged) = self.load_existing_partition(&path).await else {
                tracing::warn!(
                    kind = %kind,
                    failures = records.len(),
                    path = %path.display(),
                    "Failure partition left untouched, this run's failures of this kind are only in the consolidated file"
                );
                report.untouched.push(kind.clone());
                continue;
            };

            let mut known: HashSet<ProductId> =
                merged.iter().map(|r| r.product_id.clone()).collect();
            let mut added = 0;
            for record in &records {
                if known.insert(record.product_id.clone()) {
                    merged.push((*record).clone());
                    added += 1;
                }
            }

            write_json_atomic(&path, &merged).await?;

            tracing::info!(
                kind = %kind,
                added = added,
                total = merged.len(),
                path = %path.display(),
                "Failure partition saved"
            );
            report.partitions.push(PartitionWrite {
                kind: kind.clone(),
                reported: records.len(),
                added,
                total: merged.len(),
            });
        }

        let all_failed = self.layout.all_failed_path();
        write_json_atomic(&all_failed, failures).await?;
        report.consolidated = failures.len();
        tracing::info!(path = %all_failed.display(), records = failures.len(), "All failed products saved");

        for partition in &report.partitions {
            tracing::info!(
                kind = %partition.kind,
                failures = partition.reported,
                share = %format!("{:.1}%", report.share(&partition.kind)),
                "Failure breakdown"
            );
        }

        Ok(report)
    }

    /// Existing records of a partition; `None` when it exists but cannot be read
    async fn load_existing_partition(&self, path: &Path) -> Option<Vec<FailureRecord>> {
        match tokio::fs::try_exists(path).await {
            Ok(true) => {}
            Ok(false) => return Some(Vec::new()),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Could not check failure partition");
                return None;
            }
        }
        match self.read_failures(path).await {
            Ok(records) => Some(records),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Existing failure partition unreadable"
                );
                None
            }
        }
    }
}

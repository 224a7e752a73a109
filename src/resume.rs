//! Input deduplication and resume state recovered from the output directory
//!
//! Nothing here keeps state between runs: completed work is recomputed from the batch
//! units on disk every time a crawl starts. Unreadable or malformed files are skipped
//! with a warning.

use crate::store::BatchStore;
use crate::tracker::OutcomeTracker;
use crate::types::ProductId;
use std::collections::{BTreeMap, HashSet};

/// Remove repeated identifiers, keeping the first occurrence of each.
pub fn deduplicate_input(ids: Vec<ProductId>) -> Vec<ProductId> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.into_iter().filter(|id| seen.insert(id.clone())).collect()
}

/// Keep the identifiers not in `completed`, preserving order.
pub fn filter_pending(ids: Vec<ProductId>, completed: &HashSet<ProductId>) -> Vec<ProductId> {
    ids.into_iter().filter(|id| !completed.contains(id)).collect()
}

/// Identifiers of every record persisted in a batch unit.
pub async fn completed_ids(store: &BatchStore) -> HashSet<ProductId> {
    let mut completed = HashSet::new();
    for_each_batch_unit(store, |_, records| {
        completed.extend(records.iter().filter_map(|r| r.id.clone()));
    })
    .await;
    completed
}

/// Identifiers persisted in more than one batch unit (or twice in one), mapped to
/// the batch numbers holding them.
pub async fn find_cross_batch_duplicates(store: &BatchStore) -> BTreeMap<ProductId, Vec<u32>> {
    let mut seen: BTreeMap<ProductId, Vec<u32>> = BTreeMap::new();
    for_each_batch_unit(store, |number, records| {
        for id in records.iter().filter_map(|r| r.id.as_ref()) {
            seen.entry(id.clone()).or_default().push(number);
        }
    })
    .await;
    seen.retain(|_, units| units.len() > 1);
    seen
}

/// Counts replayed from disk into the tracker
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Records found in batch units
    pub completed: usize,
    /// Of those, records with missing fields
    pub incomplete: usize,
    /// Records found in failure partitions
    pub failed: usize,
}

/// Count everything already persisted into `tracker`.
///
/// Every record of every batch unit counts as completed (and as incomplete when a
/// field is missing); every record of every failure partition counts as a failure of
/// its kind.
pub async fn replay_persisted_state(store: &BatchStore, tracker: &OutcomeTracker) -> ReplaySummary {
    let mut summary = ReplaySummary::default();

    let mut outcomes = Vec::new();
    for_each_batch_unit(store, |_, records| {
        outcomes.extend(records.iter().map(|r| r.is_incomplete()));
    })
    .await;
    for incomplete in outcomes {
        tracker.record_success(incomplete).await;
        summary.completed += 1;
        if incomplete {
            summary.incomplete += 1;
        }
    }

    let partitions = match store.layout().failure_partitions().await {
        Ok(paths) => paths,
        Err(e) => {
            tracing::warn!(error = %e, "Could not list failure partitions");
            Vec::new()
        }
    };
    for path in partitions {
        match store.read_failures(&path).await {
            Ok(records) => {
                for record in records {
                    tracker.replay_failure(record.error_kind).await;
                    summary.failed += 1;
                }
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable failure partition");
            }
        }
    }

    if summary != ReplaySummary::default() {
        tracing::info!(
            completed = summary.completed,
            incomplete = summary.incomplete,
            failed = summary.failed,
            "Replayed results of earlier runs"
        );
    }
    summary
}

async fn for_each_batch_unit<F>(store: &BatchStore, mut visit: F)
where
    F: FnMut(u32, &[crate::types::ProductRecord]),
{
    let units = match store.layout().batch_units().await {
        Ok(units) => units,
        Err(e) => {
            tracing::warn!(error = %e, "Could not list batch units");
            return;
        }
    };
    for unit in units {
        match store.read_batch(&unit.path).await {
            Ok(records) => visit(unit.number, &records),
            Err(e) => {
                tracing::warn!(path = %unit.path.display(), error = %e, "Skipping unreadable batch unit");
            }
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::OutputLayout;
    use crate::types::{ErrorKind, FailureRecord, ProductRecord};
    use tempfile::tempdir;

    fn ids(raw: &[&str]) -> Vec<ProductId> {
        raw.iter().map(|s| ProductId::new(*s)).collect()
    }

    fn record(id: &str) -> ProductRecord {
        ProductRecord {
            id: Some(ProductId::new(id)),
            name: Some("n".to_string()),
            url_key: Some("u".to_string()),
            price: Some(serde_json::Number::from(5)),
            description: "d".to_string(),
            images: vec!["i".to_string()],
        }
    }

    fn store(dir: &std::path::Path) -> BatchStore {
        BatchStore::new(OutputLayout::new(dir))
    }

    #[test]
    fn deduplicate_keeps_first_occurrence_order() {
        let input = ids(&["3", "1", "3", "2", "1", "3"]);
        assert_eq!(deduplicate_input(input), ids(&["3", "1", "2"]));
    }

    #[test]
    fn deduplicate_without_repeats_is_identity() {
        let input = ids(&["a", "b", "c"]);
        assert_eq!(deduplicate_input(input.clone()), input);
        assert!(deduplicate_input(Vec::new()).is_empty());
    }

    #[test]
    fn filter_pending_preserves_order() {
        let completed: HashSet<_> = ids(&["2", "4"]).into_iter().collect();
        let pending = filter_pending(ids(&["1", "2", "3", "4", "5"]), &completed);
        assert_eq!(pending, ids(&["1", "3", "5"]));
    }

    #[tokio::test]
    async fn completed_ids_reads_all_units() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        store.write_batch(&[record("A"), record("B")], 0).await.unwrap();
        store.write_batch(&[record("C")], 1).await.unwrap();

        let completed = completed_ids(&store).await;
        let expected: HashSet<_> = ids(&["A", "B", "C"]).into_iter().collect();
        assert_eq!(completed, expected);
    }

    #[tokio::test]
    async fn completed_ids_on_missing_directory_is_empty() {
        let dir = tempdir().unwrap();
        let store = store(&dir.path().join("nothing-here"));
        assert!(completed_ids(&store).await.is_empty());
    }

    #[tokio::test]
    async fn malformed_unit_is_skipped() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        store.write_batch(&[record("A")], 0).await.unwrap();
        tokio::fs::write(dir.path().join("products_2.json"), b"not json")
            .await
            .unwrap();

        let completed = completed_ids(&store).await;
        assert_eq!(completed.len(), 1);
        assert!(completed.contains(&ProductId::new("A")));
    }

    #[tokio::test]
    async fn records_without_id_are_ignored() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        let mut anonymous = record("x");
        anonymous.id = None;
        store.write_batch(&[anonymous], 0).await.unwrap();

        assert!(completed_ids(&store).await.is_empty());
        assert!(find_cross_batch_duplicates(&store).await.is_empty());
    }

    #[tokio::test]
    async fn duplicates_across_units_are_reported() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        store.write_batch(&[record("X"), record("Y")], 0).await.unwrap();
        store.write_batch(&[record("X"), record("Z")], 1).await.unwrap();

        let duplicates = find_cross_batch_duplicates(&store).await;
        assert_eq!(duplicates.len(), 1);
        assert_eq!(duplicates[&ProductId::new("X")], vec![1, 2]);
    }

    #[tokio::test]
    async fn disjoint_units_have_no_duplicates() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        store.write_batch(&[record("X")], 0).await.unwrap();
        store.write_batch(&[record("Y")], 1).await.unwrap();

        assert!(find_cross_batch_duplicates(&store).await.is_empty());
    }

    #[tokio::test]
    async fn replay_counts_units_and_failure_partitions() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        let mut incomplete = record("B");
        incomplete.price = None;
        store.write_batch(&[record("A"), incomplete], 0).await.unwrap();
        store
            .write_failures(&[
                FailureRecord::now(ProductId::new("C"), ErrorKind::Timeout, "t".into()),
                FailureRecord::now(ProductId::new("D"), ErrorKind::Status("404".into()), "h".into()),
            ])
            .await
            .unwrap();

        let tracker = OutcomeTracker::new();
        let summary = replay_persisted_state(&store, &tracker).await;
        assert_eq!(
            summary,
            ReplaySummary {
                completed: 2,
                incomplete: 1,
                failed: 2
            }
        );

        let stats = tracker.snapshot().await;
        assert_eq!(stats.completed, 2);
        assert_eq!(stats.incomplete_records, 1);
        assert_eq!(stats.failed, 2);
        assert_eq!(stats.error_counts[&ErrorKind::Timeout], 1);
        assert_eq!(stats.error_counts[&ErrorKind::Status("404".into())], 1);
        // all_failed_products.json is a per-run file and is not replayed
        assert!(stats.failures.is_empty());
    }
}

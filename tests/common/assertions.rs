//! Assertions over the output directory

use catalog_crawler::{FailureRecord, OutputLayout, ProductRecord};
use std::collections::HashMap;
use std::path::Path;

/// Records of batch unit `number`
pub fn read_unit(dir: &Path, number: u32) -> Vec<ProductRecord> {
    let raw = std::fs::read_to_string(OutputLayout::new(dir).batch_path(number)).unwrap();
    serde_json::from_str(&raw).unwrap()
}

/// Identifiers of batch unit `number`, in file order
pub fn unit_ids(dir: &Path, number: u32) -> Vec<String> {
    read_unit(dir, number)
        .into_iter()
        .filter_map(|record| record.id.map(|id| id.to_string()))
        .collect()
}

/// Records of a failure file (partition or consolidated list)
pub fn read_failures(path: &Path) -> Vec<FailureRecord> {
    let raw = std::fs::read_to_string(path).unwrap();
    serde_json::from_str(&raw).unwrap()
}

/// No `.tmp` file survived a write
pub fn assert_no_temp_files(dir: &Path) {
    for entry in std::fs::read_dir(dir).unwrap() {
        let name = entry.unwrap().file_name();
        let name = name.to_string_lossy();
        assert!(!name.ends_with(".tmp"), "leftover temporary file {name}");
    }
}

/// Every identifier persisted in at most one batch unit entry
pub fn assert_each_id_persisted_once(dir: &Path) {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for entry in std::fs::read_dir(dir).unwrap() {
        let name = entry.unwrap().file_name().to_string_lossy().to_string();
        if let Some(number) = OutputLayout::parse_batch_number(&name) {
            for id in unit_ids(dir, number) {
                *counts.entry(id).or_insert(0) += 1;
            }
        }
    }
    let repeated: Vec<_> = counts.iter().filter(|(_, n)| **n > 1).collect();
    assert!(repeated.is_empty(), "ids persisted more than once: {repeated:?}");
}

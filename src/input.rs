//! Identifier list loading from CSV files

use crate::error::{Error, Result};
use crate::types::ProductId;
use std::path::Path;

/// Read the identifiers of column `column` from the CSV file at `path`.
///
/// The first row is the header. Cells are trimmed and empty cells are skipped;
/// repeated identifiers are kept (the crawler deduplicates them). A missing file or
/// column is an [`Error::Input`].
pub fn load_identifiers(path: &Path, column: &str) -> Result<Vec<ProductId>> {
    let file = std::fs::File::open(path).map_err(|e| Error::Input {
        path: path.to_path_buf(),
        message: format!("cannot open: {e}"),
    })?;
    let mut reader = csv::Reader::from_reader(file);

    let position = reader
        .headers()?
        .iter()
        .position(|header| header.trim() == column)
        .ok_or_else(|| Error::Input {
            path: path.to_path_buf(),
            message: format!("column '{column}' not found"),
        })?;

    let mut ids = Vec::new();
    for record in reader.records() {
        let record = record?;
        if let Some(cell) = record.get(position).map(str::trim)
            && !cell.is_empty()
        {
            ids.push(ProductId::new(cell));
        }
    }

    tracing::info!(path = %path.display(), count = ids.len(), "Loaded product identifiers");
    Ok(ids)
}

//! Header-level inspection of delimited files

use crate::error::CsvResult;
use crate::options::CsvOptions;
use crate::reader;
use std::path::Path;

/// Result of [`validate_structure`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructureValidation {
    /// True iff every required column is present
    pub valid: bool,
    /// Header columns in file order
    pub columns: Vec<String>,
    /// Required columns the header lacks
    pub missing: Vec<String>,
}

/// Shape of a delimited file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetInfo {
    pub row_count: usize,
    pub column_count: usize,
    pub columns: Vec<String>,
}

/// Check that the header contains every required column (order independent).
///
/// Only the header row is read.
pub fn validate_structure(
    path: &Path,
    required: &[&str],
    options: &CsvOptions,
) -> CsvResult<StructureValidation> {
    let file = reader::open(path, options)?;
    let missing: Vec<String> = required
        .iter()
        .filter(|name| !file.columns.iter().any(|c| c == *name))
        .map(|name| name.to_string())
        .collect();

    if !missing.is_empty() {
        log::debug!(
            "{} is missing required columns: {}",
            path.display(),
            missing.join(", ")
        );
    }

    Ok(StructureValidation {
        valid: missing.is_empty(),
        columns: file.columns,
        missing,
    })
}

/// Count rows and columns without materialising records.
///
/// An empty file reports zero rows and no columns.
pub fn get_dataset_info(path: &Path, options: &CsvOptions) -> CsvResult<DatasetInfo> {
    let mut file = reader::open(path, options)?;
    let row_count = file.count_rows()?;
    let columns = std::mem::take(&mut file.columns);

    Ok(DatasetInfo {
        row_count,
        column_count: columns.len(),
        columns,
    })
}

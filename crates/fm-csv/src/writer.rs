//! Delimited file writing

use crate::error::{CsvError, CsvResult};
use crate::options::CsvOptions;
use fm_core::{Dataset, Value};
use std::fs;
use std::path::Path;

/// Outcome of [`export_dataset`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportResult {
    pub success: bool,
    pub record_count: usize,
}

/// Write a dataset with default options (comma, UTF-8)
pub fn export_dataset(data: &Dataset, path: &Path) -> CsvResult<ExportResult> {
    export_dataset_with(data, path, &CsvOptions::default())
}

/// Write a dataset to `path`, creating parent directories and overwriting
/// any existing file.
///
/// The header is the dataset's column list; each record is written in that
/// column order, with absent and null values as empty fields.
pub fn export_dataset_with(
    data: &Dataset,
    path: &Path,
    options: &CsvOptions,
) -> CsvResult<ExportResult> {
    let encoding = options.resolve_encoding()?;

    let mut writer = csv::WriterBuilder::new()
        .delimiter(options.delimiter)
        .from_writer(Vec::new());

    let write_err = |e: csv::Error| CsvError::Write {
        path: path.display().to_string(),
        message: e.to_string(),
    };

    if !data.columns.is_empty() {
        writer.write_record(&data.columns).map_err(write_err)?;
    }

    let mut row: Vec<String> = Vec::with_capacity(data.columns.len());
    for record in &data.records {
        row.clear();
        row.extend(data.columns.iter().map(|column| {
            record
                .get(column)
                .map(Value::to_string)
                .unwrap_or_default()
        }));
        writer.write_record(&row).map_err(write_err)?;
    }

    let bytes = writer.into_inner().map_err(|e| CsvError::Write {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    let bytes = if encoding == encoding_rs::UTF_8 {
        bytes
    } else {
        let text = String::from_utf8_lossy(&bytes);
        let (encoded, _, had_unmappable) = encoding.encode(&text);
        if had_unmappable {
            log::warn!(
                "Some characters could not be represented in {} while writing {}",
                encoding.name(),
                path.display()
            );
        }
        encoded.into_owned()
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| CsvError::io(parent, e))?;
        }
    }
    fs::write(path, bytes).map_err(|e| CsvError::io(path, e))?;

    log::info!("Exported {} records to {}", data.len(), path.display());
    Ok(ExportResult {
        success: true,
        record_count: data.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::import_dataset;
    use fm_core::record;
    use tempfile::TempDir;

    fn people() -> Dataset {
        Dataset::new(
            vec!["id".into(), "name".into(), "email".into(), "age".into()],
            vec![
                record([("id", "1"), ("name", "John"), ("email", "john@x.com"), ("age", "30")]),
                record([("id", "2"), ("name", "Jane"), ("email", "jane@x.com"), ("age", "25")]),
            ],
        )
    }

    #[test]
    fn test_export_creates_parent_dirs_and_overwrites() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("people.csv");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "stale content that is longer than the new file\n".repeat(20)).unwrap();

        let result = export_dataset(&people(), &path).unwrap();
        assert!(result.success);
        assert_eq!(result.record_count, 2);

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "id,name,email,age\n1,John,john@x.com,30\n2,Jane,jane@x.com,25\n"
        );
    }

    #[test]
    fn test_export_writes_missing_and_null_as_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sparse.csv");
        let mut data = Dataset::with_columns(vec!["a".into(), "b".into(), "c".into()]);
        let mut rec = record([("a", Value::Int(1))]);
        rec.insert("b".into(), Value::Null);
        data.records.push(rec);

        export_dataset(&data, &path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a,b,c\n1,,\n");
    }

    #[test]
    fn test_export_quotes_fields_with_delimiters() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("quoted.csv");
        let data = Dataset::new(
            vec!["id".into(), "note".into()],
            vec![record([("id", "1"), ("note", "hello, world")])],
        );
        export_dataset(&data, &path).unwrap();

        let back = import_dataset(&path, &CsvOptions::default()).unwrap().data;
        assert_eq!(back.records[0]["note"], Value::text("hello, world"));
    }

    #[test]
    fn test_export_with_delimiter_and_encoding() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("latin.csv");
        let data = Dataset::new(
            vec!["id".into(), "name".into()],
            vec![record([("id", "1"), ("name", "José")])],
        );
        let opts = CsvOptions::default()
            .with_delimiter(b'|')
            .with_encoding("windows-1252");
        export_dataset_with(&data, &path, &opts).unwrap();

        let raw = std::fs::read(&path).unwrap();
        assert_eq!(raw, b"id|name\n1|Jos\xE9\n");

        let back = import_dataset(&path, &opts).unwrap().data;
        assert_eq!(back.records[0]["name"], Value::text("José"));
    }
}

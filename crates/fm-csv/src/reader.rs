//! Delimited file reading
//!
//! Files are read as byte records and decoded with the configured text
//! encoding. Rows are materialised in chunks of at most `chunk_size` records
//! so that callers streaming a large file never hold more than one chunk.

use crate::error::{CsvError, CsvResult};
use crate::options::CsvOptions;
use encoding_rs::Encoding;
use fm_core::{Dataset, Record, Value};
use std::borrow::Cow;
use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Outcome of [`import_dataset`]
#[derive(Debug, Clone, PartialEq)]
pub struct ImportResult {
    pub success: bool,
    pub record_count: usize,
    pub data: Dataset,
}

/// An open delimited file whose header has already been read
pub(crate) struct OpenedFile {
    reader: csv::Reader<File>,
    pub(crate) columns: Vec<String>,
    encoding: &'static Encoding,
    path: PathBuf,
}

/// Open a file and decode its header row
pub(crate) fn open(path: &Path, options: &CsvOptions) -> CsvResult<OpenedFile> {
    if !path.is_file() {
        return Err(CsvError::FileNotFound {
            path: path.display().to_string(),
        });
    }

    let encoding = options.resolve_encoding()?;
    let file = File::open(path).map_err(|e| CsvError::io(path, e))?;
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(options.delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(file);

    let headers = reader
        .byte_headers()
        .map_err(|e| CsvError::from_csv(path, e))?
        .clone();
    let columns = decode_headers(path, &headers, encoding)?;

    Ok(OpenedFile {
        reader,
        columns,
        encoding,
        path: path.to_path_buf(),
    })
}

fn decode<'a>(bytes: &'a [u8], encoding: &'static Encoding) -> Option<Cow<'a, str>> {
    encoding.decode_without_bom_handling_and_without_replacement(bytes)
}

fn decode_headers(
    path: &Path,
    headers: &csv::ByteRecord,
    encoding: &'static Encoding,
) -> CsvResult<Vec<String>> {
    let mut columns = Vec::with_capacity(headers.len());
    let mut seen = HashSet::new();

    for (idx, raw) in headers.iter().enumerate() {
        let decoded = decode(raw, encoding).ok_or_else(|| {
            CsvError::parse(
                path,
                1,
                format!("header column {} is not valid {}", idx + 1, encoding.name()),
            )
        })?;
        let name = if idx == 0 {
            decoded.trim_start_matches('\u{feff}').trim().to_string()
        } else {
            decoded.trim().to_string()
        };

        if name.is_empty() {
            return Err(CsvError::parse(
                path,
                1,
                format!("header column {} is empty", idx + 1),
            ));
        }
        if !seen.insert(name.clone()) {
            return Err(CsvError::parse(
                path,
                1,
                format!("duplicate header column '{}'", name),
            ));
        }
        columns.push(name);
    }

    Ok(columns)
}

impl OpenedFile {
    /// Read the next raw row; `false` at end of file
    pub(crate) fn read_raw(&mut self, record: &mut csv::ByteRecord) -> CsvResult<bool> {
        self.reader
            .read_byte_record(record)
            .map_err(|e| CsvError::from_csv(&self.path, e))
    }

    /// Decode a raw row into a record keyed by header column.
    ///
    /// Short rows are allowed; trailing columns they do not reach are left
    /// out of the record. Rows wider than the header are malformed.
    pub(crate) fn decode_record(&self, raw: &csv::ByteRecord) -> CsvResult<Record> {
        let line = raw.position().map(|p| p.line()).unwrap_or(0);
        if raw.len() > self.columns.len() {
            return Err(CsvError::parse(
                &self.path,
                line,
                format!(
                    "row has {} fields but the header has {}",
                    raw.len(),
                    self.columns.len()
                ),
            ));
        }

        let mut record = Record::new();
        for (column, bytes) in self.columns.iter().zip(raw.iter()) {
            let value = if bytes.is_empty() {
                Value::Null
            } else {
                let text = decode(bytes, self.encoding).ok_or_else(|| {
                    CsvError::parse(
                        &self.path,
                        line,
                        format!(
                            "field '{}' is not valid {}",
                            column,
                            self.encoding.name()
                        ),
                    )
                })?;
                Value::Text(text.into_owned())
            };
            record.insert(column.clone(), value);
        }
        Ok(record)
    }

    /// Count the remaining rows without materialising them
    pub(crate) fn count_rows(&mut self) -> CsvResult<usize> {
        let mut raw = csv::ByteRecord::new();
        let mut count = 0;
        while self.read_raw(&mut raw)? {
            count += 1;
        }
        Ok(count)
    }
}

/// Iterator over a delimited file in chunks of at most `chunk_size` records.
///
/// Created by [`read_chunks`]. Yields `Err` at most once, after which it is
/// exhausted.
pub struct DatasetChunks {
    file: OpenedFile,
    chunk_size: usize,
    raw: csv::ByteRecord,
    finished: bool,
}

impl DatasetChunks {
    /// Header columns of the file
    pub fn columns(&self) -> &[String] {
        &self.file.columns
    }

    fn fail(&mut self, err: CsvError) -> Option<CsvResult<Dataset>> {
        self.finished = true;
        Some(Err(err))
    }
}

impl Iterator for DatasetChunks {
    type Item = CsvResult<Dataset>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let mut records = Vec::new();
        while records.len() < self.chunk_size {
            match self.file.read_raw(&mut self.raw) {
                Ok(true) => match self.file.decode_record(&self.raw) {
                    Ok(record) => records.push(record),
                    Err(e) => return self.fail(e),
                },
                Ok(false) => {
                    self.finished = true;
                    break;
                }
                Err(e) => return self.fail(e),
            }
        }

        if records.is_empty() {
            return None;
        }
        Some(Ok(Dataset::new(self.file.columns.clone(), records)))
    }
}

/// Stream a delimited file as chunks of records.
///
/// The header is read (and validated) eagerly, so a missing file or a
/// malformed header fails here rather than on the first chunk.
pub fn read_chunks(path: &Path, options: &CsvOptions) -> CsvResult<DatasetChunks> {
    let file = open(path, options)?;
    Ok(DatasetChunks {
        file,
        chunk_size: options.chunk_size.max(1),
        raw: csv::ByteRecord::new(),
        finished: false,
    })
}

/// Parse a whole delimited file into a dataset
pub fn import_dataset(path: &Path, options: &CsvOptions) -> CsvResult<ImportResult> {
    let chunks = read_chunks(path, options)?;
    let mut data = Dataset::with_columns(chunks.columns().to_vec());

    for (index, chunk) in chunks.enumerate() {
        let chunk = chunk?;
        log::debug!(
            "Read chunk {} of {} ({} rows)",
            index + 1,
            path.display(),
            chunk.len()
        );
        data.extend(chunk);
    }

    log::info!("Imported {} records from {}", data.len(), path.display());
    Ok(ImportResult {
        success: true,
        record_count: data.len(),
        data,
    })
}

/// Parse only the first `n` records of a file
pub fn sample_dataset(path: &Path, n: usize, options: &CsvOptions) -> CsvResult<Dataset> {
    let sample_options = options.clone().with_chunk_size(n);
    let mut chunks = read_chunks(path, &sample_options)?;
    let mut data = Dataset::with_columns(chunks.columns().to_vec());

    if n > 0 {
        if let Some(chunk) = chunks.next() {
            data.extend(chunk?);
        }
    }
    Ok(data)
}

#[cfg(test)]
#[path = "reader_test.rs"]
mod tests;

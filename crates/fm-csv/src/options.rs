//! Reading and writing options for delimited files

use crate::error::{CsvError, CsvResult};
use encoding_rs::Encoding;
use fm_core::CsvConfig;

/// Options shared by every flat-file operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvOptions {
    /// Field delimiter byte
    pub delimiter: u8,

    /// Text encoding label (WHATWG label, e.g. "utf-8", "latin1")
    pub encoding: String,

    /// Maximum number of rows materialised per internal read chunk
    pub chunk_size: usize,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            encoding: "utf-8".to_string(),
            chunk_size: 10_000,
        }
    }
}

impl CsvOptions {
    /// Build options from the project configuration
    pub fn from_config(config: &CsvConfig) -> Self {
        Self {
            delimiter: if config.delimiter.is_ascii() {
                config.delimiter as u8
            } else {
                b','
            },
            encoding: config.encoding.clone(),
            chunk_size: config.chunk_size.max(1),
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_encoding(mut self, label: impl Into<String>) -> Self {
        self.encoding = label.into();
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Resolve the encoding label
    pub fn resolve_encoding(&self) -> CsvResult<&'static Encoding> {
        Encoding::for_label(self.encoding.trim().as_bytes()).ok_or_else(|| {
            CsvError::UnsupportedEncoding {
                label: self.encoding.clone(),
            }
        })
    }
}

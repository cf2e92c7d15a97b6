//! fm-csv - Flat-file adapter for Fieldmove
//!
//! Parses and writes delimited files, validates their structure, and
//! provides pure transform/filter/sample operations over [`Dataset`]s.
//!
//! [`Dataset`]: fm_core::Dataset

pub mod error;
pub mod inspect;
pub mod options;
pub mod reader;
pub mod transform;
pub mod writer;

pub use error::{CsvError, CsvResult};
pub use inspect::{get_dataset_info, validate_structure, DatasetInfo, StructureValidation};
pub use options::CsvOptions;
pub use reader::{import_dataset, read_chunks, sample_dataset, DatasetChunks, ImportResult};
pub use transform::{filter_data, transform_data, TransformFn, TransformRule, TransformRules};
pub use writer::{export_dataset, export_dataset_with, ExportResult};

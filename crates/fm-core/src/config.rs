//! Configuration types and parsing for fieldmove.yml

use crate::error::{CoreError, CoreResult};
use crate::identifiers::TableName;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

/// Main project configuration from fieldmove.yml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Project name
    pub name: String,

    /// Database rows are read from
    #[serde(default)]
    pub source: DatabaseConfig,

    /// Database rows are written to
    #[serde(default)]
    pub target: DatabaseConfig,

    /// Tables to migrate, in order
    #[serde(default)]
    pub tables: Vec<TableName>,

    /// Page size used by the table migrator
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Time limit for one table migration attempt and for applying one
    /// loaded record (seconds, 0 disables)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Directory backup markers are written to
    #[serde(default = "default_backup_dir")]
    pub backup_dir: String,

    /// Directory daily migration logs are written to
    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    /// File the plan run state is persisted to for resume
    #[serde(default = "default_state_file")]
    pub state_file: String,

    /// Flat-file reading/writing options
    #[serde(default)]
    pub csv: CsvConfig,

    /// Default plan options
    #[serde(default)]
    pub plan: PlanOptions,

    /// Declarative field transforms applied by `fm transform` and `fm load`
    #[serde(default)]
    pub transforms: BTreeMap<String, TransformDef>,

    /// Batch load settings
    #[serde(default)]
    pub load: LoadConfig,
}

/// Database type selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DbType {
    /// DuckDB (default)
    #[default]
    DuckDb,
    /// Process-local in-memory tables
    Memory,
}

impl std::fmt::Display for DbType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DbType::DuckDb => write!(f, "duckdb"),
            DbType::Memory => write!(f, "memory"),
        }
    }
}

/// Database connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Database type (duckdb or memory)
    #[serde(rename = "type", default)]
    pub db_type: DbType,

    /// Database path (for DuckDB file-based or :memory:)
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            db_type: DbType::default(),
            path: default_db_path(),
        }
    }
}

/// Flat-file options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CsvConfig {
    /// Field delimiter (default: comma)
    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    /// Text encoding label, e.g. "utf-8", "windows-1252"
    #[serde(default = "default_encoding")]
    pub encoding: String,

    /// Maximum rows per internal read chunk
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

impl Default for CsvConfig {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            encoding: default_encoding(),
            chunk_size: default_chunk_size(),
        }
    }
}

/// Options controlling which steps a migration plan contains and how it runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlanOptions {
    /// Add a validation step before the backup
    #[serde(default = "default_true")]
    pub pre_validation: bool,

    /// Add a verification step after all tables are migrated
    #[serde(default = "default_true")]
    pub post_validation: bool,

    /// Add a cleanup step at the end
    #[serde(default)]
    pub post_cleanup: bool,

    /// Keep executing remaining steps after a step fails
    #[serde(default)]
    pub continue_on_error: bool,

    /// How many times a failed table migration is retried
    #[serde(default)]
    pub max_table_retries: u32,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            pre_validation: true,
            post_validation: true,
            post_cleanup: false,
            continue_on_error: false,
            max_table_retries: 0,
        }
    }
}

/// Target type of a coercion rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoerceType {
    Integer,
    Float,
    Boolean,
    String,
}

/// Declarative transform rule as written in fieldmove.yml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransformDef {
    /// Replace values found in `values`; others pass through unless
    /// `unmapped` is set
    Mapping {
        values: BTreeMap<String, Value>,
        #[serde(default)]
        unmapped: Option<Value>,
    },
    /// Convert the value to another scalar type
    Coerce { to: CoerceType },
    Lowercase,
    Uppercase,
    Trim,
}

/// Settings for loading flat files through the batch engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoadConfig {
    /// Columns every record must populate; violations become warnings
    #[serde(default)]
    pub required_columns: Vec<String>,

    /// Columns identifying a record for duplicate detection
    #[serde(default)]
    pub key_columns: Vec<String>,

    /// Write a backup marker when a load starts
    #[serde(default = "default_true")]
    pub backup: bool,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            required_columns: Vec::new(),
            key_columns: Vec::new(),
            backup: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_batch_size() -> usize {
    1000
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_backup_dir() -> String {
    "backups".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_state_file() -> String {
    "target/run_state.json".to_string()
}

fn default_delimiter() -> char {
    ','
}

fn default_encoding() -> String {
    "utf-8".to_string()
}

fn default_chunk_size() -> usize {
    10_000
}

const DEFAULT_DB_PATH: &str = ":memory:";

fn default_db_path() -> String {
    DEFAULT_DB_PATH.to_string()
}

impl Config {
    /// Load configuration from a file path
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::io_with_path(path, e))?;
        let config: Config = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a project directory
    /// Looks for fieldmove.yml or fieldmove.yaml
    pub fn load_from_dir(dir: &Path) -> CoreResult<Self> {
        let yml_path = dir.join("fieldmove.yml");
        let yaml_path = dir.join("fieldmove.yaml");

        if yml_path.exists() {
            Self::load(&yml_path)
        } else if yaml_path.exists() {
            Self::load(&yaml_path)
        } else {
            Err(CoreError::ConfigNotFound {
                path: yml_path.display().to_string(),
            })
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> CoreResult<()> {
        if self.name.is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "Project name cannot be empty".to_string(),
            });
        }

        if self.batch_size == 0 {
            return Err(CoreError::ConfigInvalid {
                message: "batch_size must be greater than zero".to_string(),
            });
        }

        if self.csv.chunk_size == 0 {
            return Err(CoreError::ConfigInvalid {
                message: "csv.chunk_size must be greater than zero".to_string(),
            });
        }

        if !self.csv.delimiter.is_ascii() {
            return Err(CoreError::ConfigInvalid {
                message: format!(
                    "csv.delimiter must be a single ASCII character, found '{}'",
                    self.csv.delimiter
                ),
            });
        }

        let mut seen = HashSet::new();
        for table in &self.tables {
            if !seen.insert(table.as_str()) {
                return Err(CoreError::ConfigInvalid {
                    message: format!("Table '{}' is listed more than once", table),
                });
            }
        }

        Ok(())
    }

    /// The delimiter as a byte, as the flat-file reader expects it
    pub fn delimiter_byte(&self) -> u8 {
        // validate() guarantees the delimiter is ASCII
        self.csv.delimiter as u8
    }

    /// Get the absolute backup directory relative to a project root
    pub fn backup_dir_absolute(&self, root: &Path) -> PathBuf {
        root.join(&self.backup_dir)
    }

    /// Get the absolute log directory relative to a project root
    pub fn log_dir_absolute(&self, root: &Path) -> PathBuf {
        root.join(&self.log_dir)
    }

    /// Get the absolute run state path relative to a project root
    pub fn state_file_absolute(&self, root: &Path) -> PathBuf {
        root.join(&self.state_file)
    }

    /// Per-call timeout, `None` when disabled
    pub fn timeout(&self) -> Option<std::time::Duration> {
        (self.timeout_secs > 0).then(|| std::time::Duration::from_secs(self.timeout_secs))
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

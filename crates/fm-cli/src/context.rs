//! Runtime context for CLI commands

use anyhow::{bail, Context, Result};
use fm_core::{Config, DatabaseConfig, DbType, TableName};
use fm_csv::CsvOptions;
use fm_db::QueryHandle;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cli::{CsvArgs, GlobalArgs};

/// Loaded project configuration plus the directory it is rooted at
pub struct RuntimeContext {
    /// The loaded configuration
    pub config: Config,

    /// Project root; relative paths in the config resolve against it
    pub root: PathBuf,

    /// Verbose output enabled
    pub verbose: bool,
}

impl RuntimeContext {
    /// Load the project configuration; fails if there is none
    pub fn load(args: &GlobalArgs) -> Result<Self> {
        let root = PathBuf::from(&args.project_dir);
        let config = if let Some(config_path) = &args.config {
            Config::load(Path::new(config_path)).context("Failed to load configuration file")?
        } else {
            Config::load_from_dir(&root).context("Failed to load project configuration")?
        };

        let ctx = Self {
            config,
            root,
            verbose: args.verbose,
        };
        ctx.verbose(&format!("Loaded project '{}'", ctx.config.name));
        Ok(ctx)
    }

    /// Load the project configuration if one exists. An explicit
    /// `--config` must load.
    pub fn load_optional(args: &GlobalArgs) -> Result<Option<Self>> {
        let root = Path::new(&args.project_dir);
        let has_config = args.config.is_some()
            || root.join("fieldmove.yml").exists()
            || root.join("fieldmove.yaml").exists();
        if has_config {
            Self::load(args).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Print verbose output if enabled
    pub fn verbose(&self, msg: &str) {
        if self.verbose {
            eprintln!("[verbose] {}", msg);
        }
    }

    /// Tables named in a comma-separated argument, else every configured table
    pub fn filter_tables(&self, tables_arg: &Option<String>) -> Result<Vec<TableName>> {
        match tables_arg {
            Some(tables) => parse_tables(tables),
            None => Ok(self.config.tables.clone()),
        }
    }

    pub fn source(&self) -> Result<Arc<dyn QueryHandle>> {
        fm_db::connect(&self.resolve_db(&self.config.source))
            .context("Failed to connect to source database")
    }

    pub fn target(&self) -> Result<Arc<dyn QueryHandle>> {
        fm_db::connect(&self.resolve_db(&self.config.target))
            .context("Failed to connect to target database")
    }

    /// File-backed database paths are relative to the project root
    fn resolve_db(&self, db: &DatabaseConfig) -> DatabaseConfig {
        let mut resolved = db.clone();
        if db.db_type == DbType::DuckDb && db.path != ":memory:" && Path::new(&db.path).is_relative() {
            resolved.path = self.root.join(&db.path).display().to_string();
        }
        resolved
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.config.backup_dir_absolute(&self.root)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.config.log_dir_absolute(&self.root)
    }

    pub fn state_file(&self) -> PathBuf {
        self.config.state_file_absolute(&self.root)
    }
}

/// Parse `a,b , c` into table names, ignoring empty entries
pub fn parse_tables(list: &str) -> Result<Vec<TableName>> {
    let tables: Vec<TableName> = list
        .split(',')
        .filter_map(|s| TableName::try_new(s.trim()))
        .collect();
    if tables.is_empty() {
        bail!("No table names given in '{}'", list);
    }
    Ok(tables)
}

/// Flat-file options: project config if present, then command-line overrides
pub fn csv_options(ctx: Option<&RuntimeContext>, args: &CsvArgs) -> Result<CsvOptions> {
    let mut options = match ctx {
        Some(ctx) => CsvOptions::from_config(&ctx.config.csv),
        None => CsvOptions::default(),
    };
    if let Some(delimiter) = args.delimiter {
        if !delimiter.is_ascii() {
            bail!("Delimiter must be a single ASCII character, got '{}'", delimiter);
        }
        options = options.with_delimiter(delimiter as u8);
    }
    if let Some(encoding) = &args.encoding {
        options = options.with_encoding(encoding.clone());
    }
    Ok(options)
}

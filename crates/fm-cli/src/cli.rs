//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Fieldmove - move data between flat files and databases
#[derive(Parser, Debug)]
#[command(name = "fm")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to project directory
    #[arg(short = 'p', long, global = true, default_value = ".")]
    pub project_dir: String,

    /// Override config file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show row and column counts of a delimited file
    Info(InfoArgs),

    /// Print the first rows of a delimited file
    Sample(SampleArgs),

    /// Check that a delimited file has the required columns
    Validate(ValidateArgs),

    /// Apply the configured field transforms to a delimited file
    Transform(TransformArgs),

    /// Show the migration plan for the configured tables
    Plan(PlanArgs),

    /// Migrate tables from the source to the target database
    Migrate(MigrateArgs),

    /// Compare source and target row counts
    Verify(VerifyArgs),

    /// Load a delimited file into a target table in batches
    Load(LoadArgs),
}

/// Output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON output
    Json,
}

/// Flat-file reading overrides shared by file commands
#[derive(Args, Debug, Clone, Default)]
pub struct CsvArgs {
    /// Field delimiter (single ASCII character)
    #[arg(short, long)]
    pub delimiter: Option<char>,

    /// Text encoding label, e.g. utf-8, windows-1252
    #[arg(short, long)]
    pub encoding: Option<String>,
}

/// Arguments for the info command
#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Delimited file to inspect
    pub file: String,

    #[command(flatten)]
    pub csv: CsvArgs,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Arguments for the sample command
#[derive(Args, Debug)]
pub struct SampleArgs {
    /// Delimited file to sample
    pub file: String,

    /// Number of rows to print
    #[arg(short = 'n', long, default_value_t = 10)]
    pub rows: usize,

    #[command(flatten)]
    pub csv: CsvArgs,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Arguments for the validate command
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Delimited file to check
    pub file: String,

    /// Required columns (comma-separated, default: load.required_columns)
    #[arg(short, long, value_delimiter = ',')]
    pub required: Vec<String>,

    #[command(flatten)]
    pub csv: CsvArgs,
}

/// Arguments for the transform command
#[derive(Args, Debug)]
pub struct TransformArgs {
    /// Input delimited file
    pub input: String,

    /// Output delimited file (overwritten)
    pub output: String,

    #[command(flatten)]
    pub csv: CsvArgs,
}

/// Arguments for the plan command
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Tables to include (comma-separated, default: all configured)
    #[arg(short, long)]
    pub tables: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Arguments for the migrate command
#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// Tables to migrate (comma-separated, default: all configured)
    #[arg(short, long)]
    pub tables: Option<String>,

    /// Override the configured page size
    #[arg(short, long)]
    pub batch_size: Option<usize>,

    /// Continue the run recorded in the state file
    #[arg(long)]
    pub resume: bool,

    /// Override the run state file path
    #[arg(long)]
    pub state_file: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Arguments for the verify command
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Tables to verify (comma-separated, default: all configured)
    #[arg(short, long)]
    pub tables: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Arguments for the load command
#[derive(Args, Debug)]
pub struct LoadArgs {
    /// Delimited file to load
    pub file: String,

    /// Target table (must already exist)
    #[arg(short, long)]
    pub table: String,

    /// Skip writing a backup marker
    #[arg(long)]
    pub no_backup: bool,

    #[command(flatten)]
    pub csv: CsvArgs,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;

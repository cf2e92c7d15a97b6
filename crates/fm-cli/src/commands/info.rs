//! Info command implementation

use anyhow::{Context, Result};
use fm_csv::get_dataset_info;
use serde_json::json;
use std::path::Path;

use crate::cli::{GlobalArgs, InfoArgs, OutputFormat};
use crate::commands::common::print_json;
use crate::context::{csv_options, RuntimeContext};

/// Execute the info command
pub async fn execute(args: &InfoArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = RuntimeContext::load_optional(global)?;
    let options = csv_options(ctx.as_ref(), &args.csv)?;

    let info = get_dataset_info(Path::new(&args.file), &options)
        .with_context(|| format!("Failed to inspect {}", args.file))?;

    match args.output {
        OutputFormat::Json => print_json(&json!({
            "file": args.file,
            "row_count": info.row_count,
            "column_count": info.column_count,
            "columns": info.columns,
        })),
        OutputFormat::Text => {
            println!("{}", args.file);
            println!("  rows:    {}", info.row_count);
            println!("  columns: {}", info.column_count);
            for column in &info.columns {
                println!("    - {}", column);
            }
            Ok(())
        }
    }
}

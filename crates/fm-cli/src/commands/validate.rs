//! Validate command implementation

use anyhow::{bail, Context, Result};
use fm_csv::validate_structure;
use std::path::Path;

use crate::cli::{GlobalArgs, ValidateArgs};
use crate::commands::common::ExitCode;
use crate::context::{csv_options, RuntimeContext};

/// Execute the validate command
pub async fn execute(args: &ValidateArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = RuntimeContext::load_optional(global)?;
    let options = csv_options(ctx.as_ref(), &args.csv)?;

    let required: Vec<String> = if args.required.is_empty() {
        ctx.as_ref()
            .map(|c| c.config.load.required_columns.clone())
            .unwrap_or_default()
    } else {
        args.required.iter().map(|s| s.trim().to_string()).collect()
    };
    if required.is_empty() {
        bail!("No required columns given; pass --required or set load.required_columns");
    }
    let required: Vec<&str> = required.iter().map(String::as_str).collect();

    let result = validate_structure(Path::new(&args.file), &required, &options)
        .with_context(|| format!("Failed to read {}", args.file))?;

    if result.valid {
        println!("✓ {} has all {} required columns", args.file, required.len());
        Ok(())
    } else {
        println!("✗ {} is missing columns: {}", args.file, result.missing.join(", "));
        if global.verbose {
            eprintln!("[verbose] Header columns: {}", result.columns.join(", "));
        }
        Err(ExitCode(1).into())
    }
}

//! Transform command implementation

use anyhow::{bail, Context, Result};
use fm_csv::{export_dataset_with, import_dataset, transform_data, TransformRules};
use std::path::Path;

use crate::cli::{GlobalArgs, TransformArgs};
use crate::context::{csv_options, RuntimeContext};

/// Execute the transform command
pub async fn execute(args: &TransformArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = RuntimeContext::load(global)?;
    let options = csv_options(Some(&ctx), &args.csv)?;

    if ctx.config.transforms.is_empty() {
        bail!("No transforms configured in fieldmove.yml");
    }
    let rules = TransformRules::from_defs(&ctx.config.transforms);
    ctx.verbose(&format!("Applying {} field rules", rules.len()));

    let imported = import_dataset(Path::new(&args.input), &options)
        .with_context(|| format!("Failed to read {}", args.input))?;
    let transformed = transform_data(&imported.data, &rules);
    let exported = export_dataset_with(&transformed, Path::new(&args.output), &options)
        .with_context(|| format!("Failed to write {}", args.output))?;

    println!(
        "Transformed {} records: {} -> {}",
        exported.record_count, args.input, args.output
    );
    Ok(())
}

//! Sample command implementation

use anyhow::{Context, Result};
use fm_csv::sample_dataset;
use std::path::Path;

use crate::cli::{GlobalArgs, OutputFormat, SampleArgs};
use crate::commands::common::{cell, print_json};
use crate::context::{csv_options, RuntimeContext};

const MAX_CELL_WIDTH: usize = 24;

/// Execute the sample command
pub async fn execute(args: &SampleArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = RuntimeContext::load_optional(global)?;
    let options = csv_options(ctx.as_ref(), &args.csv)?;

    let data = sample_dataset(Path::new(&args.file), args.rows, &options)
        .with_context(|| format!("Failed to read {}", args.file))?;

    if args.output == OutputFormat::Json {
        return print_json(&data.records);
    }

    if data.columns.is_empty() {
        println!("{} is empty.", args.file);
        return Ok(());
    }

    let widths: Vec<usize> = data
        .columns
        .iter()
        .map(|column| {
            data.records
                .iter()
                .map(|r| cell(r.get(column), MAX_CELL_WIDTH).chars().count())
                .chain(std::iter::once(column.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let header: Vec<String> = data
        .columns
        .iter()
        .zip(&widths)
        .map(|(c, w)| format!("{:<width$}", c, width = *w))
        .collect();
    println!("{}", header.join(" | "));
    println!(
        "{}",
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-")
    );
    for record in &data.records {
        let row: Vec<String> = data
            .columns
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{:<width$}", cell(record.get(c), MAX_CELL_WIDTH), width = *w))
            .collect();
        println!("{}", row.join(" | "));
    }
    println!("\n({} rows)", data.len());
    Ok(())
}

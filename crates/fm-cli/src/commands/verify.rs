//! Verify command implementation

use anyhow::{bail, Result};
use fm_migrate::TableMigrator;

use crate::cli::{GlobalArgs, OutputFormat, VerifyArgs};
use crate::commands::common::{print_json, ExitCode};
use crate::context::RuntimeContext;

/// Execute the verify command
pub async fn execute(args: &VerifyArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = RuntimeContext::load(global)?;
    let tables = ctx.filter_tables(&args.tables)?;
    if tables.is_empty() {
        bail!("No tables to verify; list them under `tables:` or pass --tables");
    }

    let migrator = TableMigrator::new(ctx.source()?, ctx.target()?);
    let mut results = Vec::with_capacity(tables.len());
    for table in &tables {
        results.push(migrator.verify_migration(table).await?);
    }
    let mismatches = results.iter().filter(|r| !r.matches).count();

    if args.output == OutputFormat::Json {
        print_json(&results)?;
    } else {
        for r in &results {
            if r.matches {
                println!("  ✓ {} ({} rows)", r.table, r.source_records);
            } else {
                println!(
                    "  ✗ {} source={} target={} (off by {})",
                    r.table, r.source_records, r.target_records, r.discrepancy
                );
            }
        }
        println!();
        println!("{} of {} tables match", results.len() - mismatches, results.len());
    }

    if mismatches > 0 {
        return Err(ExitCode(1).into());
    }
    Ok(())
}

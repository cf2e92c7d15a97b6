//! Plan command implementation

use anyhow::{bail, Result};
use fm_migrate::MigrationPlan;

use crate::cli::{GlobalArgs, OutputFormat, PlanArgs};
use crate::commands::common::print_json;
use crate::context::RuntimeContext;

/// Execute the plan command
pub async fn execute(args: &PlanArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = RuntimeContext::load(global)?;
    let tables = ctx.filter_tables(&args.tables)?;
    if tables.is_empty() {
        bail!("No tables to plan; list them under `tables:` or pass --tables");
    }

    let plan = MigrationPlan::new(tables, ctx.config.plan);
    match args.output {
        OutputFormat::Json => print_json(&plan),
        OutputFormat::Text => {
            println!("Migration plan ({} steps):", plan.len());
            for step in plan.steps() {
                match &step.table {
                    Some(table) => println!("  {:>2}. {} {}", step.index, step.step_type, table),
                    None => println!("  {:>2}. {}", step.index, step.step_type),
                }
            }
            ctx.verbose(&format!("Plan fingerprint: {}", plan.fingerprint()));
            Ok(())
        }
    }
}

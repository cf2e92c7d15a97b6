//! Migrate command implementation

use anyhow::{bail, Context, Result};
use fm_migrate::{ExecutionSummary, MigrationPlan, PlanOrchestrator, PlanOutcome, StepStatus};
use std::path::PathBuf;

use crate::cli::{GlobalArgs, MigrateArgs, OutputFormat};
use crate::commands::common::{format_duration, print_json, ExitCode};
use crate::context::RuntimeContext;

/// Execute the migrate command
pub async fn execute(args: &MigrateArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = RuntimeContext::load(global)?;
    let tables = ctx.filter_tables(&args.tables)?;
    if tables.is_empty() {
        bail!("No tables to migrate; list them under `tables:` or pass --tables");
    }

    let state_file = args
        .state_file
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(|| ctx.state_file());
    let batch_size = args.batch_size.unwrap_or(ctx.config.batch_size);

    let orchestrator = PlanOrchestrator::new(ctx.source()?, ctx.target()?, ctx.backup_dir())
        .with_batch_size(batch_size)
        .context("Invalid batch size")?
        .with_table_timeout(ctx.config.timeout());
    let mut orchestrator = if args.resume {
        ctx.verbose(&format!("Resuming from {}", state_file.display()));
        orchestrator.resume_from(state_file)
    } else {
        orchestrator.with_state_file(state_file)
    };

    let plan = MigrationPlan::new(tables, ctx.config.plan);
    ctx.verbose(&format!(
        "Executing {} steps with batch size {}",
        plan.len(),
        batch_size
    ));

    // Ctrl-C pauses at the next step boundary; the run can be resumed later
    let pause = orchestrator.pause_handle();
    let verbose = ctx.verbose;
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            if verbose {
                eprintln!("[verbose] Interrupt received, pausing after the current step");
            }
            pause.pause();
        }
    });

    let outcome = orchestrator.execute_plan(&plan).await?;
    let summary = orchestrator.get_execution_summary();

    if args.output == OutputFormat::Json {
        print_json(&serde_json::json!({
            "outcome": outcome_label(&outcome),
            "execution": summary,
            "steps": orchestrator.execution_log(),
        }))?;
    } else {
        for entry in orchestrator.execution_log() {
            let mark = match entry.status {
                StepStatus::Completed => "✓",
                _ => "✗",
            };
            let detail = match (&entry.table, &entry.error) {
                (_, Some(error)) => format!(" - {}", error),
                (Some(_), None) => format!(" ({} rows)", entry.records_migrated),
                (None, None) => String::new(),
            };
            println!(
                "  {} {} [{}]{}",
                mark,
                entry.step,
                format_duration(entry.duration.as_millis()),
                detail
            );
        }
        println!();
        print_summary(&outcome, &summary);
    }

    match outcome {
        PlanOutcome::Completed
        | PlanOutcome::Paused { .. }
        | PlanOutcome::AlreadyCompleted { .. } => Ok(()),
        PlanOutcome::CompletedWithErrors { .. } | PlanOutcome::Failed { .. } => {
            Err(ExitCode(4).into())
        }
    }
}

fn outcome_label(outcome: &PlanOutcome) -> &'static str {
    match outcome {
        PlanOutcome::Completed => "completed",
        PlanOutcome::CompletedWithErrors { .. } => "completed_with_errors",
        PlanOutcome::Failed { .. } => "failed",
        PlanOutcome::Paused { .. } => "paused",
        PlanOutcome::AlreadyCompleted { .. } => "already_completed",
    }
}

fn print_summary(outcome: &PlanOutcome, summary: &ExecutionSummary) {
    match outcome {
        PlanOutcome::Completed => println!("Migration completed."),
        PlanOutcome::CompletedWithErrors { failed_steps } => {
            println!("Migration finished with failed steps: {}", failed_steps.join(", "))
        }
        PlanOutcome::Failed { step, error } => println!("Migration stopped at {}: {}", step, error),
        PlanOutcome::Paused { next_step } => {
            println!("Migration paused before {}; rerun with --resume to continue.", next_step)
        }
        PlanOutcome::AlreadyCompleted { run_id } => println!(
            "Run {} already completed every step; delete the state file to migrate again.",
            run_id
        ),
    }
    println!(
        "{} steps completed, {} failed; {} records across {} tables in {}",
        summary.summary.completed_steps,
        summary.summary.failed_steps,
        summary.stats.records_migrated,
        summary.stats.tables_migrated,
        format_duration(summary.stats.total_duration.as_millis())
    );
}

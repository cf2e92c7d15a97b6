//! Load command implementation

use anyhow::{anyhow, Context, Result};
use fm_batch::{
    BatchEngine, HandleRecordMigrator, KeyDuplicateDetector, MigrationConfig,
    RequiredFieldsValidator,
};
use fm_core::TableName;
use fm_csv::{read_chunks, TransformRules};
use std::path::Path;

use crate::cli::{GlobalArgs, LoadArgs, OutputFormat};
use crate::commands::common::{format_duration, print_json, ExitCode};
use crate::context::{csv_options, RuntimeContext};

/// Execute the load command
pub async fn execute(args: &LoadArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = RuntimeContext::load(global)?;
    let options = csv_options(Some(&ctx), &args.csv)?;
    let table = TableName::try_new(args.table.trim())
        .ok_or_else(|| anyhow!("Table name cannot be empty"))?;
    let rules = TransformRules::from_defs(&ctx.config.transforms);
    let load = &ctx.config.load;

    let mut engine = BatchEngine::new(ctx.backup_dir())
        .with_log_dir(ctx.log_dir())
        .with_validator(RequiredFieldsValidator::new(load.required_columns.clone()))
        .with_duplicate_detector(KeyDuplicateDetector::new(load.key_columns.clone()))
        .with_record_migrator(HandleRecordMigrator::new(ctx.target()?, table.clone()))
        .with_record_timeout(ctx.config.timeout());

    let chunks = read_chunks(Path::new(&args.file), &options)
        .with_context(|| format!("Failed to open {}", args.file))?;

    let id = engine.start_migration(&MigrationConfig {
        backup: load.backup && !args.no_backup,
    })?;
    ctx.verbose(&format!("Started migration {} into '{}'", id, table));

    for chunk in chunks {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                engine.cancel_migration(&id)?;
                return Err(e).with_context(|| format!("Failed to read {}", args.file));
            }
        };
        let records = if rules.is_empty() {
            chunk.records
        } else {
            chunk.records.iter().map(|r| rules.apply_record(r)).collect()
        };

        let result = engine.process_migration_batch(&id, records).await?;
        ctx.verbose(&format!(
            "Batch of {}: {} ok, {} failed, {} duplicates",
            result.batch_size, result.success_count, result.failure_count, result.duplicate_count
        ));
    }

    let summary = engine.complete_migration(&id)?;
    let warnings = engine
        .instance(&id)
        .map(|i| i.warnings.len())
        .unwrap_or(0);

    if args.output == OutputFormat::Json {
        print_json(&summary)?;
    } else {
        println!(
            "Loaded {} into '{}': {} migrated, {} failed, {} duplicates ({:.1}% success) in {}",
            args.file,
            table,
            summary.processed,
            summary.failed,
            summary.duplicates,
            summary.success_rate * 100.0,
            format_duration(summary.duration.as_millis())
        );
        if warnings > 0 {
            println!("{} validation warnings (see {})", warnings, ctx.log_dir().display());
        }
    }

    if summary.failed > 0 {
        return Err(ExitCode(4).into());
    }
    Ok(())
}

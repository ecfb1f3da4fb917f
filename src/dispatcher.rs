//! Command dispatcher: routes parsed CLI commands to their handlers.
//!
//! Documents are independent, so batches fan out to blocking workers that
//! share one read-only `StatementProcessor`. A document that cannot be read
//! is reported and the rest of the batch still runs.

use anyhow::{bail, Result};
use colored::Colorize;
use fatura::config::EngineConfig;
use fatura::engine::StatementProcessor;
use fatura::export::export_csv;
use fatura::models::ProcessedStatement;
use fatura::source::load_document;
use fatura::stats::StatementStats;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::cli::formatters::{self, ValidationOutcome, ValidationRow};
use crate::cli::Commands;

const DEFAULT_WORKERS: usize = 4;

/// Route a parsed command to its handler
pub async fn dispatch_command(
    command: Commands,
    config: EngineConfig,
    json_output: bool,
) -> Result<()> {
    match command {
        Commands::Process { files, csv } => {
            dispatch_process(files, csv.as_deref(), config, json_output).await
        }
        Commands::Validate { files } => dispatch_validate(files, config, json_output).await,
        Commands::Inspect { file } => dispatch_inspect(&file, json_output),
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Process every file on a bounded pool of blocking workers. Results come
/// back in the order the files were given.
async fn process_batch(
    processor: Arc<StatementProcessor>,
    files: Vec<PathBuf>,
) -> Result<Vec<(String, Result<ProcessedStatement>)>> {
    let workers = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(DEFAULT_WORKERS);
    let semaphore = Arc::new(Semaphore::new(workers));
    let mut join_set = JoinSet::new();

    for (index, path) in files.into_iter().enumerate() {
        let processor = Arc::clone(&processor);
        let permit = Arc::clone(&semaphore).acquire_owned().await?;

        join_set.spawn_blocking(move || {
            let _permit = permit;
            let name = display_name(&path);
            let result = load_document(&path).map(|pages| processor.process(&name, &pages));
            (index, name, result)
        });
    }

    let mut results = Vec::new();
    while let Some(joined) = join_set.join_next().await {
        results.push(joined?);
    }
    results.sort_by_key(|(index, _, _)| *index);

    Ok(results
        .into_iter()
        .map(|(_, name, result)| (name, result))
        .collect())
}

async fn dispatch_process(
    files: Vec<PathBuf>,
    csv: Option<&Path>,
    config: EngineConfig,
    json_output: bool,
) -> Result<()> {
    let processor = Arc::new(StatementProcessor::new(config)?);
    let total = files.len();
    let results = process_batch(processor, files).await?;

    let mut processed = Vec::new();
    let mut failed = 0;
    for (name, result) in results {
        match result {
            Ok(statement) => {
                let stats = StatementStats::from_transactions(&statement.transactions);
                processed.push((statement, stats));
            }
            Err(e) => {
                failed += 1;
                warn!("Skipping {}: {:#}", name, e);
                eprintln!("{} {}: {:#}", "✗".red().bold(), name, e);
            }
        }
    }

    if json_output {
        println!("{}", formatters::format_statements_json(&processed));
    } else {
        for (statement, stats) in &processed {
            println!("{}", formatters::format_statement_table(statement, stats));
        }
    }

    if let Some(path) = csv {
        let transactions: Vec<_> = processed
            .iter()
            .flat_map(|(statement, _)| statement.transactions.iter().cloned())
            .collect();
        export_csv(path, &transactions)?;
        if !json_output {
            println!(
                "{} Exported {} transactions to {}",
                "✓".green().bold(),
                transactions.len(),
                path.display()
            );
        }
    }

    if failed > 0 {
        bail!("{} of {} statements could not be read", failed, total);
    }
    Ok(())
}

async fn dispatch_validate(
    files: Vec<PathBuf>,
    config: EngineConfig,
    json_output: bool,
) -> Result<()> {
    let processor = Arc::new(StatementProcessor::new(config)?);
    let results = process_batch(processor, files).await?;

    let rows: Vec<ValidationRow> = results
        .into_iter()
        .map(|(file, result)| {
            let outcome = match result {
                Ok(statement) => ValidationOutcome::Checked(statement.validation),
                Err(e) => {
                    warn!("Skipping {}: {:#}", file, e);
                    ValidationOutcome::Failed {
                        error: format!("{:#}", e),
                    }
                }
            };
            ValidationRow { file, outcome }
        })
        .collect();

    if json_output {
        println!("{}", formatters::format_validation_json(&rows));
    } else {
        println!("{}", formatters::format_validation_table(&rows));
    }

    let failing = rows.iter().filter(|row| !row.passed()).count();
    info!("Validated {} statements, {} failing", rows.len(), failing);
    if failing > 0 {
        bail!("{} of {} statements did not validate", failing, rows.len());
    }
    Ok(())
}

fn dispatch_inspect(file: &Path, json_output: bool) -> Result<()> {
    let pages = load_document(file)?;
    let name = display_name(file);
    if json_output {
        println!("{}", formatters::format_pages_json(&name, &pages));
    } else {
        print!("{}", formatters::format_pages(&name, &pages));
    }
    Ok(())
}

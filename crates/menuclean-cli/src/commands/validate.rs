//! Validate command - load tables into the store and run the check catalog.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use colored::Colorize;
use menuclean::validate::CheckStatus;
use menuclean::{
    EntityKind, Loader, MenucleanConfig, RunContext, RunSummary, TestGroup, ValidationRunner,
};
use tracing::{info, warn};

pub struct ValidateArgs {
    pub path: PathBuf,
    pub output: PathBuf,
    pub db: Option<PathBuf>,
    pub reset: Option<Vec<String>>,
    pub tests: Vec<String>,
    pub json: bool,
}

pub fn run(
    args: ValidateArgs,
    config: &MenucleanConfig,
    interrupt: Arc<AtomicBool>,
) -> Result<(), Box<dyn std::error::Error>> {
    let tables = tables_to_load(args.reset.as_deref(), args.db.is_none());
    let groups = args
        .tests
        .iter()
        .map(|g| g.parse::<TestGroup>())
        .collect::<Result<Vec<_>, _>>()?;

    std::fs::create_dir_all(&args.output)?;
    let mut ctx = RunContext::open_sqlite(args.db.as_deref(), interrupt, &args.output)?;
    let result = load_and_check(&mut ctx, config, &args.path, &tables, &groups);
    ctx.close()?;

    let summary = result?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary, &args.output);
    }
    Ok(())
}

fn load_and_check(
    ctx: &mut RunContext,
    config: &MenucleanConfig,
    dataset: &Path,
    tables: &[EntityKind],
    groups: &[TestGroup],
) -> Result<RunSummary, Box<dyn std::error::Error>> {
    if !tables.is_empty() {
        let interrupt = ctx.interrupt_handle();
        let output = ctx.output_dir().to_path_buf();
        let reports = Loader::new(config).reset_and_load(
            ctx.store_mut(),
            tables,
            dataset,
            &interrupt,
            &output,
        )?;
        for report in &reports {
            info!(
                table = %report.table,
                inserted = report.inserted,
                failed = report.failed_rows.len(),
                "Loaded"
            );
        }
    }

    let summary = ValidationRunner::new(config)
        .with_output_dir(ctx.output_dir())
        .run(ctx.store(), groups, ctx.interrupt())?;
    Ok(summary)
}

/// Tables to reset and reload.
///
/// `--reset` without names means every table; unknown names are skipped
/// with a warning. An in-memory store starts empty, so it loads every table
/// unless told otherwise.
fn tables_to_load(reset: Option<&[String]>, in_memory: bool) -> Vec<EntityKind> {
    match reset {
        Some([]) => EntityKind::ALL.to_vec(),
        Some(names) => names
            .iter()
            .filter_map(|name| match name.parse::<EntityKind>() {
                Ok(kind) => Some(kind),
                Err(e) => {
                    warn!(table = %name, "{}; not reset", e);
                    None
                }
            })
            .collect(),
        None if in_memory => EntityKind::ALL.to_vec(),
        None => Vec::new(),
    }
}

fn print_summary(summary: &RunSummary, output: &Path) {
    println!();
    for outcome in summary.outcomes.iter().filter(|o| !o.passed()) {
        match &outcome.status {
            CheckStatus::Errored(reason) => println!(
                "  {} {}::{} - {}",
                "ERROR".red().bold(),
                outcome.suite,
                outcome.name,
                reason
            ),
            _ => println!(
                "  {} {}::{} ({} ids)",
                "FAIL".yellow().bold(),
                outcome.suite,
                outcome.name,
                outcome.failed_ids.len()
            ),
        }
    }

    let status = if summary.failed == 0 && summary.errored == 0 {
        "OK".green().bold()
    } else {
        "FAILED".red().bold()
    };
    println!();
    println!(
        "Ran {} checks: {} ({} passed, {} failures, {} errors)",
        summary.run.to_string().white().bold(),
        status,
        summary.passed.to_string().green(),
        summary.failed.to_string().yellow(),
        summary.errored.to_string().red()
    );
    println!("Failure files written to {}", output.display());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_to_load() {
        assert_eq!(tables_to_load(Some(&[]), false), EntityKind::ALL.to_vec());
        assert_eq!(tables_to_load(None, true).len(), 4);
        assert!(tables_to_load(None, false).is_empty());

        let named = vec!["Dish".to_string(), "MenuItem".to_string()];
        assert_eq!(
            tables_to_load(Some(&named), false),
            vec![EntityKind::Dish, EntityKind::MenuItem]
        );
    }

    #[test]
    fn test_unknown_reset_table_skipped() {
        let named = vec!["Restaurant".to_string(), "Menu".to_string()];
        assert_eq!(tables_to_load(Some(&named), false), vec![EntityKind::Menu]);
        assert!(tables_to_load(Some(&["Restaurant".to_string()]), true).is_empty());
    }
}

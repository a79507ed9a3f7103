//! Report-change command - count cells changed by cleaning.

use std::path::PathBuf;

use colored::Colorize;
use menuclean::{ChangeReporter, MenucleanConfig, Parser};

pub fn run(
    dirty: PathBuf,
    clean: PathBuf,
    output: PathBuf,
    config: &MenucleanConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    for dir in [&dirty, &clean] {
        if !dir.is_dir() {
            return Err(format!("Directory not found: {}", dir.display()).into());
        }
    }

    let reporter = ChangeReporter::new(Parser::with_config(config.parser.clone()));
    let result = reporter.compare_dirs(&dirty, &clean, &output)?;

    if result.reports.is_empty() && result.failures.is_empty() {
        println!("{}", "No cleaned files with a raw counterpart.".yellow());
        return Ok(());
    }

    for report in &result.reports {
        println!("{} {}", "Table:".cyan().bold(), report.table.white().bold());
        println!("  Total changed cells: {}", report.total_changed_cells);
        println!("  Total rows with changes: {}", report.rows_with_changes);
        println!("  Rows removed: {}", report.removed_ids.len());
        if !report.added_ids.is_empty() {
            println!("  Rows added: {}", report.added_ids.len().to_string().yellow());
        }
        println!("  Changed cells per column:");
        for (column, count) in &report.column_changes {
            let count = if *count > 0 {
                count.to_string().yellow()
            } else {
                count.to_string().dimmed()
            };
            println!("    {:<24} {}", column, count);
        }
        println!();
    }

    for failure in &result.failures {
        println!("{} {}: {}", "FAILED".red().bold(), failure.file, failure.error);
    }
    if !result.failures.is_empty() {
        return Err(format!("{} file(s) could not be compared", result.failures.len()).into());
    }
    Ok(())
}

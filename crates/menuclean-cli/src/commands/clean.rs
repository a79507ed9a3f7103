//! Clean command - repair every export file of a directory.

use std::path::PathBuf;

use colored::Colorize;
use menuclean::{CleanBatch, MenucleanConfig};

pub fn run(
    input: PathBuf,
    output: PathBuf,
    tests: PathBuf,
    config: &MenucleanConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    if !input.is_dir() {
        return Err(format!("Input directory not found: {}", input.display()).into());
    }

    println!(
        "{} {} -> {}",
        "Cleaning".cyan().bold(),
        input.display(),
        output.display()
    );

    let summary = CleanBatch::new(config).run(&input, &output, &tests)?;

    for table in &summary.tables {
        println!(
            "  {} {} rows in, {} rows out, {} cells changed",
            table.source.file.white().bold(),
            table.rows_in,
            table.rows_out.to_string().green(),
            table.cells_changed.to_string().yellow()
        );
    }
    for failure in &summary.failures {
        println!("  {} {}: {}", "FAILED".red().bold(), failure.file, failure.error);
    }

    println!();
    println!(
        "{} tables cleaned, {} rows removed, {} cells changed",
        summary.tables.len().to_string().white().bold(),
        summary.rows_removed().to_string().white().bold(),
        summary.cells_changed().to_string().white().bold()
    );

    if !summary.is_complete() {
        return Err(format!("{} table(s) could not be cleaned", summary.failures.len()).into());
    }
    Ok(())
}

//! Profile command - missing values and logic issues per file.

use std::path::PathBuf;

use colored::Colorize;
use menuclean::profile::{PROFILE_REPORT, profile_dir};
use menuclean::{MenucleanConfig, Parser};

pub fn run(path: PathBuf, output: PathBuf, config: &MenucleanConfig) -> Result<(), Box<dyn std::error::Error>> {
    if !path.is_dir() {
        return Err(format!("Dataset directory not found: {}", path.display()).into());
    }

    let parser = Parser::with_config(config.parser.clone());
    let profiles = profile_dir(&parser, &path, &output)?;

    for profile in &profiles {
        print!("{}", profile.render());
        if profile.has_issues() {
            println!("{}", "Logic issues found".yellow());
        }
    }

    println!(
        "{} {} file(s); report appended to {}",
        "Profiled".cyan().bold(),
        profiles.len(),
        output.join(PROFILE_REPORT).display()
    );
    Ok(())
}

//! Menuclean CLI - clean and validate historical menu datasets.

mod cli;
mod commands;
mod logging;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use cli::{Cli, Commands};
use logging::{LogConfig, init_logging};
use menuclean::MenucleanConfig;
use tracing::warn;

fn main() {
    let cli = Cli::parse();

    let log_config = LogConfig::from_verbosity(cli.verbose)
        .with_format(cli.log_format)
        .with_log_file(cli.log_file.clone());
    if let Err(e) = init_logging(&log_config) {
        eprintln!("Error: failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    let config = match &cli.config {
        Some(path) => match MenucleanConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },
        None => MenucleanConfig::default(),
    };

    let interrupt = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&interrupt);
    if let Err(e) = ctrlc::set_handler(move || {
        warn!("Interrupt received; stopping after the current row");
        handler_flag.store(true, Ordering::SeqCst);
    }) {
        warn!("Could not install interrupt handler: {}", e);
    }

    let result = match cli.command {
        Commands::Clean {
            input,
            output,
            tests,
        } => commands::clean::run(input, output, tests, &config),

        Commands::Validate {
            path,
            output,
            db,
            reset,
            tests,
            json,
        } => commands::validate::run(
            commands::validate::ValidateArgs {
                path,
                output,
                db,
                reset,
                tests,
                json,
            },
            &config,
            interrupt,
        ),

        Commands::ReportChange {
            dirty,
            clean,
            output,
        } => commands::report_change::run(dirty, clean, output, &config),

        Commands::Profile { path, output } => commands::profile::run(path, output, &config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

//! CLI argument definitions using clap.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

use crate::logging::LogFormat;

/// Menuclean: clean and validate historical menu datasets
#[derive(Parser)]
#[command(name = "menuclean")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Append logs to this file instead of stderr
    #[arg(long, global = true, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Log output format (pretty, compact, json)
    #[arg(long, global = true, default_value = "pretty")]
    pub log_format: LogFormat,

    /// JSON configuration file overriding the built-in defaults
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Clean every export file of a directory
    Clean {
        /// Directory holding the raw export files
        #[arg(short, long = "inpdir", value_name = "DIR")]
        input: PathBuf,

        /// Directory receiving cleaned_<file> outputs
        #[arg(short, long = "outdir", value_name = "DIR")]
        output: PathBuf,

        /// Directory holding <Suite>_FailedID.json files from a validation run
        #[arg(short, long = "testdir", value_name = "DIR")]
        tests: PathBuf,
    },

    /// Load a dataset into the record store and run validation checks
    Validate {
        /// Directory holding <Table>.csv files
        #[arg(short, long, value_name = "DIR")]
        path: PathBuf,

        /// Directory receiving failure files and load reports
        #[arg(short, long = "outdir", value_name = "DIR", default_value = ".")]
        output: PathBuf,

        /// SQLite database file (in-memory when omitted)
        #[arg(long, value_name = "FILE")]
        db: Option<PathBuf>,

        /// Drop, recreate and reload these tables (all when given without values)
        #[arg(long, num_args = 0.., value_name = "TABLE")]
        reset: Option<Vec<String>>,

        /// Test groups to run (schema, dish, menu, menupage, menuitem, all)
        #[arg(long, num_args = 1.., value_name = "GROUP", default_value = "all")]
        tests: Vec<String>,

        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Count what cleaning changed, per column
    ReportChange {
        /// Directory holding the raw files
        #[arg(short, long = "dirtydir", value_name = "DIR")]
        dirty: PathBuf,

        /// Directory holding the cleaned files
        #[arg(short, long = "cleandir", value_name = "DIR")]
        clean: PathBuf,

        /// Directory receiving changed_count_<file> outputs
        #[arg(short, long = "outdir", value_name = "DIR", default_value = ".")]
        output: PathBuf,
    },

    /// Profile missing values and obvious logic issues
    Profile {
        /// Directory holding the export files
        #[arg(short, long, value_name = "DIR")]
        path: PathBuf,

        /// Directory receiving profiling_report.txt
        #[arg(short, long = "outdir", value_name = "DIR", default_value = ".")]
        output: PathBuf,
    },
}

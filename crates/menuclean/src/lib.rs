//! Menuclean: cleaning and validation for historical menu exports.
//!
//! Menuclean repairs the four menu tables (`Dish`, `Menu`, `MenuPage`,
//! `MenuItem`) with a fixed pipeline of conditional stages, loads them into a
//! relational store and checks them against a catalog of named rules. The
//! ids each check flags are written out and removed by the next cleaning
//! pass.
//!
//! # Core Principles
//!
//! - **Column-driven**: a stage runs only when the columns it needs exist
//! - **Non-destructive**: every stage returns a new table
//! - **Collected failures**: a check reports every violating id, never just the first
//!
//! # Example
//!
//! ```no_run
//! use menuclean::{CleaningPipeline, EntityKind, Parser};
//!
//! let (table, _) = Parser::new().parse_file("Dish.csv").unwrap();
//! let outcome = CleaningPipeline::standard()
//!     .run(&table, Some(EntityKind::Dish), &[])
//!     .unwrap();
//!
//! println!("Rows removed: {}", outcome.rows_removed());
//! println!("Cells changed: {}", outcome.cells_changed());
//! ```

pub mod batch;
pub mod clean;
pub mod config;
pub mod context;
pub mod error;
pub mod input;
pub mod profile;
pub mod report;
pub mod rules;
pub mod schema;
pub mod store;
pub mod table;
pub mod validate;

pub use batch::{CleanBatch, CleanSummary};
pub use clean::{CleanOutcome, CleaningPipeline, ExclusionLoader, ExclusionSet};
pub use config::MenucleanConfig;
pub use context::RunContext;
pub use error::{MenucleanError, Result};
pub use input::{Parser, SourceFormat, SourceMetadata};
pub use report::{ChangeReport, ChangeReporter};
pub use rules::Predicate;
pub use schema::EntityKind;
pub use store::{InsertReport, Loader, MemoryStore, RecordStore, SqliteStore};
pub use table::{RecordTable, Value};
pub use validate::{RunSummary, TestGroup, ValidationRunner};

//! Loading export files into a record store.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;

use tracing::{error, info, warn};

use crate::config::MenucleanConfig;
use crate::error::{MenucleanError, Result};
use crate::input::{Parser, ParserConfig};
use crate::schema::EntityKind;
use crate::table::{RecordTable, Value, parse_timestamp};

use super::{InsertReport, RecordStore};

/// Suffix of the report written when a load is incomplete.
pub const LOAD_REPORT_SUFFIX: &str = "_load_report.json";

/// Reads entity files and bulk-inserts them into a store.
pub struct Loader {
    parser: Parser,
    timestamp_columns: Vec<String>,
}

impl Default for Loader {
    fn default() -> Self {
        Self::new(&MenucleanConfig::default())
    }
}

impl Loader {
    pub fn new(config: &MenucleanConfig) -> Self {
        Self {
            parser: Parser::with_config(config.parser.clone()),
            timestamp_columns: config.timestamp_columns.clone(),
        }
    }

    pub fn with_parser(mut self, config: ParserConfig) -> Self {
        self.parser = Parser::with_config(config);
        self
    }

    /// Rewrite timestamp columns as `YYYY-MM-DD HH:MM:SS`.
    ///
    /// A trailing ` UTC` is dropped; values that do not read as a timestamp
    /// become null.
    pub fn normalize_timestamps(&self, table: &RecordTable) -> Result<RecordTable> {
        let mut current = table.clone();
        for column in self.timestamp_columns.iter().filter(|c| table.has_column(c)) {
            current = current.map_column(column, |value| match value {
                Value::Null => Value::Null,
                other => {
                    let raw = other.to_string();
                    let stripped = raw.trim().trim_end_matches(" UTC");
                    parse_timestamp(stripped)
                        .map(|ts| Value::Text(ts.format("%Y-%m-%d %H:%M:%S").to_string()))
                        .unwrap_or(Value::Null)
                }
            })?;
        }
        Ok(current)
    }

    /// Load one file into the table named by its stem.
    ///
    /// When rows fail or the load is interrupted a
    /// `<Table>_load_report.json` is written to `report_dir`.
    pub fn load_file(
        &self,
        store: &mut dyn RecordStore,
        path: &Path,
        interrupt: &AtomicBool,
        report_dir: &Path,
    ) -> Result<InsertReport> {
        let (table, source) = self.parser.parse_file(path)?;
        let kind: EntityKind = table.name.parse()?;
        info!(table = %kind, rows = source.row_count, file = %source.file, "Start inserting");

        let table = self.normalize_timestamps(&table)?;
        let report = store.bulk_insert(kind, &table, interrupt)?;

        for &row in &report.failed_rows {
            if let Some(id) = table.id_of(row) {
                error!(table = %kind, row, id, "Row was not inserted");
            } else {
                error!(table = %kind, row, "Row was not inserted");
            }
        }

        if !report.is_complete() {
            let out = write_load_report(&report, report_dir)?;
            warn!(
                table = %kind,
                failed = report.failed_rows.len(),
                pending = report.pending_rows.len(),
                path = %out.display(),
                "Load incomplete"
            );
        }
        Ok(report)
    }

    /// Reset each listed table and reload it from `<dataset_dir>/<Table>.csv`.
    ///
    /// Tables without a file stay empty. Stops with
    /// [`MenucleanError::Interrupted`] once a load is interrupted.
    pub fn reset_and_load(
        &self,
        store: &mut dyn RecordStore,
        tables: &[EntityKind],
        dataset_dir: &Path,
        interrupt: &AtomicBool,
        report_dir: &Path,
    ) -> Result<Vec<InsertReport>> {
        for &kind in tables {
            info!(table = %kind, "Dropping and creating table");
            store.reset_table(kind)?;
        }

        let mut reports = Vec::new();
        for &kind in tables {
            let path = dataset_dir.join(format!("{}.csv", kind.table_name()));
            if !path.is_file() {
                warn!(table = %kind, path = %path.display(), "No data file; table left empty");
                continue;
            }
            let report = self.load_file(store, &path, interrupt, report_dir)?;
            let interrupted = report.interrupted;
            reports.push(report);
            if interrupted {
                return Err(MenucleanError::Interrupted(format!(
                    "loading {} stopped; see {}{}",
                    kind, kind, LOAD_REPORT_SUFFIX
                )));
            }
        }
        Ok(reports)
    }
}

fn write_load_report(report: &InsertReport, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir).map_err(|e| MenucleanError::io(dir, e))?;
    let path = dir.join(format!("{}{}", report.table, LOAD_REPORT_SUFFIX));
    let json = serde_json::to_string_pretty(report)?;
    fs::write(&path, json).map_err(|e| MenucleanError::io(&path, e))?;
    Ok(path)
}

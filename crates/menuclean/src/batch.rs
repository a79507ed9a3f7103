//! Cleaning a whole export directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::clean::{CleaningPipeline, ExclusionLoader, StageReport};
use crate::config::MenucleanConfig;
use crate::error::{MenucleanError, Result};
use crate::input::{Parser, SourceMetadata, csv_files, write_csv};
use crate::report::CLEANED_PREFIX;
use crate::schema::EntityKind;

/// Summary file written next to the cleaned tables.
pub const CLEAN_SUMMARY: &str = "clean_summary.json";

/// Result of cleaning one file.
#[derive(Debug, Clone, Serialize)]
pub struct TableSummary {
    pub source: SourceMetadata,
    pub entity: Option<EntityKind>,
    pub output: PathBuf,
    pub exclusion_sets: Vec<String>,
    pub rows_in: usize,
    pub rows_out: usize,
    pub cells_changed: usize,
    pub stages: Vec<StageReport>,
}

/// A file the batch could not clean.
#[derive(Debug, Clone, Serialize)]
pub struct TableFailure {
    pub file: String,
    pub error: String,
}

/// Result of a batch run.
#[derive(Debug, Clone, Serialize)]
pub struct CleanSummary {
    pub started_at: DateTime<Utc>,
    pub tables: Vec<TableSummary>,
    pub failures: Vec<TableFailure>,
}

impl CleanSummary {
    pub fn rows_removed(&self) -> usize {
        self.tables.iter().map(|t| t.rows_in - t.rows_out).sum()
    }

    pub fn cells_changed(&self) -> usize {
        self.tables.iter().map(|t| t.cells_changed).sum()
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Cleans every export file of a directory, one table at a time.
pub struct CleanBatch {
    parser: Parser,
    pipeline: CleaningPipeline,
    exclusions: ExclusionLoader,
}

impl Default for CleanBatch {
    fn default() -> Self {
        Self::new(&MenucleanConfig::default())
    }
}

impl CleanBatch {
    pub fn new(config: &MenucleanConfig) -> Self {
        Self {
            parser: Parser::with_config(config.parser.clone()),
            pipeline: CleaningPipeline::standard(),
            exclusions: ExclusionLoader::from_config(config),
        }
    }

    pub fn with_pipeline(mut self, pipeline: CleaningPipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Clean every `*.csv` of `input_dir` into `output_dir/cleaned_<file>`.
    ///
    /// Exclusion sets are read from `exclusion_dir`. A table that fails is
    /// logged and recorded; the others still run. `clean_summary.json` is
    /// written once all tables are done.
    pub fn run(&self, input_dir: &Path, output_dir: &Path, exclusion_dir: &Path) -> Result<CleanSummary> {
        fs::create_dir_all(output_dir).map_err(|e| MenucleanError::io(output_dir, e))?;
        let mut summary = CleanSummary {
            started_at: Utc::now(),
            tables: Vec::new(),
            failures: Vec::new(),
        };

        for path in csv_files(input_dir)? {
            let file = path
                .file_name()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            if file.starts_with(CLEANED_PREFIX) {
                warn!(file = %file, "Already cleaned; skipped");
                continue;
            }

            info!(file = %file, "Cleaning");
            let started = Instant::now();
            match self.clean_file(&path, output_dir, exclusion_dir) {
                Ok(table) => {
                    info!(
                        file = %file,
                        rows_in = table.rows_in,
                        rows_out = table.rows_out,
                        cells_changed = table.cells_changed,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Saved {}",
                        table.output.display()
                    );
                    summary.tables.push(table);
                }
                Err(e) => {
                    error!(file = %file, error = %e, "Cleaning failed");
                    summary.failures.push(TableFailure {
                        file,
                        error: e.to_string(),
                    });
                }
            }
        }

        let summary_path = output_dir.join(CLEAN_SUMMARY);
        let json = serde_json::to_string_pretty(&summary)?;
        fs::write(&summary_path, json).map_err(|e| MenucleanError::io(&summary_path, e))?;
        Ok(summary)
    }

    /// Clean one file. Nothing is written unless the whole table succeeds.
    pub fn clean_file(&self, path: &Path, output_dir: &Path, exclusion_dir: &Path) -> Result<TableSummary> {
        let (table, source) = self.parser.parse_file(path)?;
        let entity = EntityKind::from_file_stem(&table.name);
        let sets = match entity {
            Some(kind) => self.exclusions.load_for(kind, exclusion_dir)?,
            None => Vec::new(),
        };

        let outcome = self.pipeline.run(&table, entity, &sets)?;
        let output = output_dir.join(format!("{}{}", CLEANED_PREFIX, source.file));
        write_csv(&outcome.table, &output)?;

        Ok(TableSummary {
            entity,
            output,
            exclusion_sets: sets.iter().map(|s| s.name.clone()).collect(),
            rows_in: table.row_count(),
            rows_out: outcome.table.row_count(),
            cells_changed: outcome.cells_changed(),
            stages: outcome.stages,
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn dirs() -> (TempDir, TempDir, TempDir) {
        (TempDir::new().unwrap(), TempDir::new().unwrap(), TempDir::new().unwrap())
    }

    #[test]
    fn test_failure_isolated() {
        let (input, output, tests) = dirs();
        fs::write(input.path().join("Dish.csv"), "id,first_appeared\n1,1200\n").unwrap();
        fs::write(input.path().join("Notes.csv"), "id,price,high_price\n1,3,1\n").unwrap();

        let summary = CleanBatch::default()
            .run(input.path(), output.path(), tests.path())
            .unwrap();

        // Dish needs its exclusion files, which are absent.
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].file, "Dish.csv");
        assert!(!output.path().join("cleaned_Dish.csv").exists());

        assert_eq!(summary.tables.len(), 1);
        assert_eq!(summary.tables[0].entity, None);
        assert_eq!(summary.cells_changed(), 1);
        assert!(output.path().join("cleaned_Notes.csv").is_file());
        assert!(output.path().join(CLEAN_SUMMARY).is_file());
    }

    #[test]
    fn test_untouched_columns_written_verbatim() {
        let (input, output, tests) = dirs();
        let raw = "id,code,name\n1,007,+5\n2,abc, 12 \n3,0.50,1e3\n";
        fs::write(input.path().join("Notes.csv"), raw).unwrap();

        let summary = CleanBatch::default()
            .run(input.path(), output.path(), tests.path())
            .unwrap();
        assert_eq!(summary.cells_changed(), 0);

        let cleaned = fs::read_to_string(output.path().join("cleaned_Notes.csv")).unwrap();
        assert_eq!(cleaned, raw);
    }

    #[test]
    fn test_entity_resolved_from_stem_prefix() {
        let (input, output, tests) = dirs();
        fs::write(input.path().join("MenuPage_2021.csv"), "id,menu_id\n1,0\n2,5\n3,5\n").unwrap();
        for suite in ["TestMenuPageDuplicate", "TestMenuPageNumberValid"] {
            fs::write(tests.path().join(format!("{suite}_FailedID.json")), r#"{"test_uuid": [3]}"#).unwrap();
        }

        let summary = CleanBatch::default()
            .run(input.path(), output.path(), tests.path())
            .unwrap();
        assert!(summary.is_complete());
        assert_eq!(summary.tables[0].entity, Some(EntityKind::MenuPage));

        let cleaned = fs::read_to_string(output.path().join("cleaned_MenuPage_2021.csv")).unwrap();
        assert_eq!(cleaned, "id,menu_id\n2,5\n");
    }

    #[test]
    fn test_menu_with_exclusions() {
        let (input, output, tests) = dirs();
        fs::write(input.path().join("Menu.csv"), "id,date\n1,1890/4/2\n2,1900\n0,x\n2,dup\n").unwrap();
        fs::write(
            tests.path().join("TestTablesSchema_FailedID.json"),
            r#"{"test_menu": [], "test_menu_page_menu_id_fk": [1]}"#,
        )
        .unwrap();

        let summary = CleanBatch::default()
            .run(input.path(), output.path(), tests.path())
            .unwrap();
        assert!(summary.is_complete());

        let table = &summary.tables[0];
        assert_eq!(table.entity, Some(EntityKind::Menu));
        assert_eq!(table.rows_in, 4);
        assert_eq!(table.rows_out, 2);
        assert_eq!(table.exclusion_sets, vec!["TestTablesSchema"]);

        let cleaned = fs::read_to_string(output.path().join("cleaned_Menu.csv")).unwrap();
        assert_eq!(cleaned, "id,date\n1,1890-04-02\n2,1900-01-01\n");
    }
}

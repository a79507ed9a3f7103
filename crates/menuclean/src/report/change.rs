//! Cell and row level differences between a raw and a cleaned table.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, error, info};

use crate::error::{MenucleanError, Result};
use crate::input::{Parser, csv_files};
use crate::table::{ID_COLUMN, RecordTable};

/// Prefix the cleaning batch puts on its output files.
pub const CLEANED_PREFIX: &str = "cleaned_";

/// Prefix of the per-column count files.
pub const CHANGED_COUNT_PREFIX: &str = "changed_count_";

/// What cleaning changed in one table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChangeReport {
    pub table: String,
    /// Differing cells over rows present in both tables.
    pub total_changed_cells: usize,
    /// Rows with a differing cell, plus removed rows.
    pub rows_with_changes: usize,
    /// Differing cells per shared column, in raw column order.
    pub column_changes: IndexMap<String, usize>,
    /// Ids present before cleaning and absent after.
    pub removed_ids: Vec<i64>,
    /// Ids present only after cleaning.
    pub added_ids: Vec<i64>,
}

impl ChangeReport {
    /// Compare `dirty` to `clean`, matching rows by id.
    ///
    /// When an id repeats, its first row is the one compared. Only columns
    /// present in both tables are compared.
    pub fn compute(dirty: &RecordTable, clean: &RecordTable) -> Result<Self> {
        for table in [dirty, clean] {
            if !table.has_column(ID_COLUMN) {
                return Err(MenucleanError::MissingColumn {
                    table: table.name.clone(),
                    column: ID_COLUMN.to_string(),
                });
            }
        }

        let shared: Vec<(String, usize, usize)> = dirty
            .headers
            .iter()
            .enumerate()
            .filter(|(_, h)| h.as_str() != ID_COLUMN)
            .filter_map(|(d, h)| clean.column_index(h).map(|c| (h.clone(), d, c)))
            .collect();

        let dirty_rows = first_rows(dirty);
        let clean_rows = first_rows(clean);

        let mut report = ChangeReport {
            table: clean.name.trim_start_matches(CLEANED_PREFIX).to_string(),
            column_changes: shared.iter().map(|(h, _, _)| (h.clone(), 0)).collect(),
            ..Self::default()
        };

        for (id, &d_row) in &dirty_rows {
            let Some(&c_row) = clean_rows.get(id) else {
                report.removed_ids.push(*id);
                report.rows_with_changes += 1;
                continue;
            };

            let mut row_changed = false;
            for (header, d_col, c_col) in &shared {
                let before = dirty.get(d_row, *d_col);
                let after = clean.get(c_row, *c_col);
                let same = match (before, after) {
                    (Some(a), Some(b)) => a.same_as(b),
                    (None, None) => true,
                    _ => false,
                };
                if !same {
                    row_changed = true;
                    report.total_changed_cells += 1;
                    if let Some(count) = report.column_changes.get_mut(header) {
                        *count += 1;
                    }
                }
            }
            if row_changed {
                report.rows_with_changes += 1;
            }
        }

        report.added_ids = clean_rows
            .keys()
            .filter(|id| !dirty_rows.contains_key(id))
            .copied()
            .collect();
        Ok(report)
    }

    /// Write the `column,changed_cells` table.
    pub fn write_column_counts(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| MenucleanError::io(parent, e))?;
        }
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(["column", "changed_cells"])?;
        for (column, count) in &self.column_changes {
            writer.write_record([column.as_str(), &count.to_string()])?;
        }
        writer.flush().map_err(|e| MenucleanError::io(path, e))?;
        Ok(())
    }
}

/// Row index of the first occurrence of every id, ordered by id.
fn first_rows(table: &RecordTable) -> BTreeMap<i64, usize> {
    let mut rows = BTreeMap::new();
    for idx in 0..table.row_count() {
        if let Some(id) = table.id_of(idx) {
            rows.entry(id).or_insert(idx);
        }
    }
    rows
}

/// One file of a directory comparison that could not be reported.
#[derive(Debug, Clone, Serialize)]
pub struct ReportFailure {
    pub file: String,
    pub error: String,
}

/// Outcome of comparing a dirty and a clean directory.
#[derive(Debug, Default, Serialize)]
pub struct DirectoryReport {
    pub reports: Vec<ChangeReport>,
    pub failures: Vec<ReportFailure>,
}

/// Pairs cleaned files with their raw counterparts and reports the changes.
pub struct ChangeReporter {
    parser: Parser,
}

impl Default for ChangeReporter {
    fn default() -> Self {
        Self::new(Parser::new())
    }
}

impl ChangeReporter {
    pub fn new(parser: Parser) -> Self {
        Self { parser }
    }

    /// Raw file for a cleaned file: `cleaned_X.csv` pairs with `X.csv`,
    /// falling back to a file of the same name.
    pub fn dirty_counterpart(dirty_dir: &Path, clean_file: &str) -> Option<PathBuf> {
        let stripped = clean_file.strip_prefix(CLEANED_PREFIX).unwrap_or(clean_file);
        [stripped, clean_file]
            .into_iter()
            .map(|name| dirty_dir.join(name))
            .find(|path| path.is_file())
    }

    /// Compare every paired file and write `changed_count_<X>.csv` for each.
    ///
    /// A file that cannot be read or compared is recorded and skipped.
    pub fn compare_dirs(&self, dirty_dir: &Path, clean_dir: &Path, out_dir: &Path) -> Result<DirectoryReport> {
        std::fs::create_dir_all(out_dir).map_err(|e| MenucleanError::io(out_dir, e))?;
        let mut result = DirectoryReport::default();

        for clean_path in csv_files(clean_dir)? {
            let file = clean_path
                .file_name()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let Some(dirty_path) = Self::dirty_counterpart(dirty_dir, &file) else {
                debug!(file = %file, "No raw counterpart; skipped");
                continue;
            };

            match self.compare_files(&dirty_path, &clean_path, out_dir) {
                Ok(report) => result.reports.push(report),
                Err(e) => {
                    error!(file = %file, error = %e, "Change report failed");
                    result.failures.push(ReportFailure {
                        file,
                        error: e.to_string(),
                    });
                }
            }
        }
        Ok(result)
    }

    fn compare_files(&self, dirty_path: &Path, clean_path: &Path, out_dir: &Path) -> Result<ChangeReport> {
        let (dirty, _) = self.parser.parse_file(dirty_path)?;
        let (clean, _) = self.parser.parse_file(clean_path)?;
        let report = ChangeReport::compute(&dirty, &clean)?;

        let file = dirty_path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        report.write_column_counts(out_dir.join(format!("{}{}", CHANGED_COUNT_PREFIX, file)))?;

        info!(
            table = %report.table,
            changed_cells = report.total_changed_cells,
            changed_rows = report.rows_with_changes,
            removed = report.removed_ids.len(),
            "Change report"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn make_table(name: &str, headers: Vec<&str>, rows: Vec<Vec<&str>>) -> RecordTable {
        RecordTable::from_strings(
            name,
            headers.into_iter().map(String::from).collect(),
            rows.into_iter()
                .map(|r| r.into_iter().map(String::from).collect())
                .collect(),
        )
    }

    #[test]
    fn test_single_repair() {
        let dirty = make_table(
            "MenuItem",
            vec!["id", "price", "high_price"],
            vec![vec!["1", "2", "1"], vec!["2", "1", "3"]],
        );
        let clean = make_table(
            "cleaned_MenuItem",
            vec!["id", "price", "high_price"],
            vec![vec!["2", "1", "3"], vec!["1", "2", "2"]],
        );
        let report = ChangeReport::compute(&dirty, &clean).unwrap();

        assert_eq!(report.table, "MenuItem");
        assert_eq!(report.total_changed_cells, 1);
        assert_eq!(report.rows_with_changes, 1);
        assert_eq!(report.column_changes["high_price"], 1);
        assert_eq!(report.column_changes["price"], 0);
    }

    #[test]
    fn test_removed_rows() {
        let dirty = make_table(
            "Dish",
            vec!["id", "first_appeared", "legacy"],
            vec![vec!["1", "1200", "x"], vec!["5", "1900", "y"], vec!["5", "1", "z"]],
        );
        let clean = make_table("Dish", vec!["id", "first_appeared"], vec![vec!["1", "1500"], vec!["9", "1900"]]);
        let report = ChangeReport::compute(&dirty, &clean).unwrap();

        assert_eq!(report.removed_ids, vec![5]);
        assert_eq!(report.added_ids, vec![9]);
        assert_eq!(report.total_changed_cells, 1);
        assert_eq!(report.rows_with_changes, 2);
        assert!(!report.column_changes.contains_key("legacy"));
    }

    #[test]
    fn test_nulls_compare_equal() {
        let dirty = make_table("Menu", vec!["id", "date"], vec![vec!["1", ""], vec!["2", "1900.0"]]);
        let clean = make_table("Menu", vec!["id", "date"], vec![vec!["1", ""], vec!["2", "1900"]]);
        let report = ChangeReport::compute(&dirty, &clean).unwrap();
        assert_eq!(report.total_changed_cells, 0);
    }

    #[test]
    fn test_requires_id() {
        let dirty = make_table("Menu", vec!["name"], vec![]);
        let clean = make_table("Menu", vec!["id", "name"], vec![]);
        assert!(matches!(
            ChangeReport::compute(&dirty, &clean),
            Err(MenucleanError::MissingColumn { .. })
        ));
    }

    #[test]
    fn test_compare_dirs() {
        let dirty = TempDir::new().unwrap();
        let clean = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        fs::write(dirty.path().join("Dish.csv"), "id,last_appeared\n1,2030\n2,1900\n").unwrap();
        fs::write(clean.path().join("cleaned_Dish.csv"), "id,last_appeared\n1,2025\n2,1900\n").unwrap();
        fs::write(clean.path().join("cleaned_Menu.csv"), "id\n1\n").unwrap();
        fs::write(dirty.path().join("Broken.csv"), "name\nx\n").unwrap();
        fs::write(clean.path().join("Broken.csv"), "name\nx\n").unwrap();

        let result = ChangeReporter::default()
            .compare_dirs(dirty.path(), clean.path(), out.path())
            .unwrap();

        assert_eq!(result.reports.len(), 1);
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].file, "Broken.csv");
        let counts = fs::read_to_string(out.path().join("changed_count_Dish.csv")).unwrap();
        assert_eq!(counts, "column,changed_cells\nlast_appeared,1\n");
    }
}

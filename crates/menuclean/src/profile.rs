//! Quick per-file profile of a raw export directory.
//!
//! Counts missing values per column and a few known logic issues (zero
//! prices, repeated ids). The rendered profiles are appended to
//! `profiling_report.txt`.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{error, info};

use crate::error::{MenucleanError, Result};
use crate::input::{Parser, csv_files};
use crate::table::{ID_COLUMN, RecordTable};

/// File the profiles are appended to.
pub const PROFILE_REPORT: &str = "profiling_report.txt";

/// Columns whose zero values are reported.
const ZERO_PRICE_COLUMNS: [&str; 3] = ["lowest_price", "highest_price", "price"];

const RULE: &str = "--------------------------------------------------";

/// Profile of one file.
#[derive(Debug, Clone, Serialize)]
pub struct FileProfile {
    pub path: PathBuf,
    pub row_count: usize,
    /// Null cells per column, in column order.
    pub missing: IndexMap<String, usize>,
    /// Logic issue counts; only issues whose column exists are present.
    pub logic_issues: IndexMap<String, usize>,
}

impl FileProfile {
    pub fn compute(table: &RecordTable, path: impl Into<PathBuf>) -> Result<Self> {
        let missing = table
            .headers
            .iter()
            .map(|h| {
                let count = table
                    .column_values(h)
                    .map_or(0, |values| values.filter(|v| v.is_null()).count());
                (h.clone(), count)
            })
            .collect();

        let mut logic_issues = IndexMap::new();
        for column in ZERO_PRICE_COLUMNS {
            if let Some(values) = table.column_values(column) {
                let zeros = values.filter(|v| v.as_f64() == Some(0.0)).count();
                logic_issues.insert(format!("{}_is_zero", column), zeros);
            }
        }
        if table.has_column(ID_COLUMN) {
            let repeated = table.row_count() - table.dedup_by(ID_COLUMN)?.row_count();
            logic_issues.insert("duplicated_id".to_string(), repeated);
        }

        Ok(Self {
            path: path.into(),
            row_count: table.row_count(),
            missing,
            logic_issues,
        })
    }

    /// Total null cells across all columns.
    pub fn total_missing(&self) -> usize {
        self.missing.values().sum()
    }

    /// Whether any logic issue has a non-zero count.
    pub fn has_issues(&self) -> bool {
        self.logic_issues.values().any(|&n| n > 0)
    }

    /// Text block appended to the report file.
    pub fn render(&self) -> String {
        let width = self.missing.keys().map(String::len).max().unwrap_or(0);
        let mut out = format!("\nFile: {}\nRows: {}\nMissing values:\n", self.path.display(), self.row_count);
        for (column, count) in &self.missing {
            out.push_str(&format!("{:<width$}    {}\n", column, count, width = width));
        }
        out.push_str("Logic-based issues:\n");
        for (issue, count) in &self.logic_issues {
            out.push_str(&format!("{}: {}\n", issue, count));
        }
        out.push_str(RULE);
        out.push('\n');
        out
    }
}

/// Profile every `*.csv` in `data_dir`, appending to `<out_dir>/profiling_report.txt`.
///
/// Unreadable files are logged and skipped.
pub fn profile_dir(parser: &Parser, data_dir: &Path, out_dir: &Path) -> Result<Vec<FileProfile>> {
    std::fs::create_dir_all(out_dir).map_err(|e| MenucleanError::io(out_dir, e))?;
    let report_path = out_dir.join(PROFILE_REPORT);
    let mut report = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&report_path)
        .map_err(|e| MenucleanError::io(&report_path, e))?;

    let mut profiles = Vec::new();
    for path in csv_files(data_dir)? {
        let profile = match parser
            .parse_file(&path)
            .and_then(|(table, _)| FileProfile::compute(&table, &path))
        {
            Ok(profile) => profile,
            Err(e) => {
                error!(path = %path.display(), error = %e, "Profiling failed");
                continue;
            }
        };
        info!(path = %path.display(), rows = profile.row_count, "Profiled file");
        report
            .write_all(profile.render().as_bytes())
            .map_err(|e| MenucleanError::io(&report_path, e))?;
        profiles.push(profile);
    }
    Ok(profiles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_profile_counts() {
        let table = Parser::new()
            .parse_bytes(
                "Dish",
                b"id,name,lowest_price,highest_price\n1,Soup,0,1\n1,,0.0,\n2,Tea,,0\n",
                b',',
            )
            .unwrap();
        let profile = FileProfile::compute(&table, "Dish.csv").unwrap();

        assert_eq!(profile.row_count, 3);
        assert_eq!(profile.missing["name"], 1);
        assert_eq!(profile.missing["lowest_price"], 1);
        assert_eq!(profile.logic_issues["lowest_price_is_zero"], 2);
        assert_eq!(profile.logic_issues["highest_price_is_zero"], 1);
        assert_eq!(profile.logic_issues["duplicated_id"], 1);
        assert!(!profile.logic_issues.contains_key("price_is_zero"));
        assert_eq!(profile.total_missing(), 3);
        assert!(profile.has_issues());
    }

    #[test]
    fn test_profile_dir_appends() {
        let data = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        fs::write(data.path().join("MenuItem.csv"), "id,price\n1,0\n2,3\n").unwrap();

        let parser = Parser::new();
        profile_dir(&parser, data.path(), out.path()).unwrap();
        let profiles = profile_dir(&parser, data.path(), out.path()).unwrap();

        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].logic_issues["price_is_zero"], 1);
        let text = fs::read_to_string(out.path().join(PROFILE_REPORT)).unwrap();
        assert_eq!(text.matches("File: ").count(), 2);
        assert!(text.contains("duplicated_id: 0"));
    }
}

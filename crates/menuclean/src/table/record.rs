//! In-memory record table.

use std::collections::HashSet;

use crate::error::{MenucleanError, Result};

use super::value::Value;

/// Name of the identifier column.
pub const ID_COLUMN: &str = "id";

static NULL: Value = Value::Null;

/// Rows of typed cells under named columns.
///
/// Every transforming operation returns a new table and leaves the receiver
/// untouched; row order is preserved.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordTable {
    /// Table name (usually the file stem).
    pub name: String,
    /// Column headers.
    pub headers: Vec<String>,
    /// Row data (row-major order).
    pub rows: Vec<Vec<Value>>,
}

impl RecordTable {
    /// Create a new record table.
    pub fn new(name: impl Into<String>, headers: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            name: name.into(),
            headers,
            rows,
        }
    }

    /// Create a table from raw string cells, inferring each value.
    pub fn from_strings(
        name: impl Into<String>,
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
    ) -> Self {
        let rows = rows
            .into_iter()
            .map(|row| row.iter().map(|cell| Value::parse(cell)).collect())
            .collect();
        Self::new(name, headers, rows)
    }

    /// Get the number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Get the number of columns.
    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Whether the column exists.
    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Whether every listed column exists.
    pub fn has_columns<S: AsRef<str>>(&self, names: &[S]) -> bool {
        names.iter().all(|n| self.has_column(n.as_ref()))
    }

    /// Get a cell by position.
    pub fn get(&self, row: usize, col: usize) -> Option<&Value> {
        self.rows.get(row).and_then(|r| r.get(col))
    }

    /// Get a cell by column name.
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let col = self.column_index(column)?;
        self.get(row, col)
    }

    /// All values of a column, in row order.
    pub fn column_values(&self, column: &str) -> Option<impl Iterator<Item = &Value>> {
        let col = self.column_index(column)?;
        Some(self.rows.iter().map(move |row| row.get(col).unwrap_or(&NULL)))
    }

    /// Identifier of a row, when the table has an integer `id`.
    pub fn id_of(&self, row: usize) -> Option<i64> {
        self.value(row, ID_COLUMN).and_then(Value::as_i64)
    }

    /// All non-null identifiers in row order.
    pub fn ids(&self) -> Vec<i64> {
        (0..self.row_count()).filter_map(|row| self.id_of(row)).collect()
    }

    /// Keep the rows for which `keep` returns true.
    pub fn filter<F>(&self, mut keep: F) -> RecordTable
    where
        F: FnMut(usize, &[Value]) -> bool,
    {
        let rows = self
            .rows
            .iter()
            .enumerate()
            .filter(|(idx, row)| keep(*idx, row))
            .map(|(_, row)| row.clone())
            .collect();
        RecordTable::new(self.name.clone(), self.headers.clone(), rows)
    }

    /// Remove rows whose key repeats an earlier row's key (first seen wins).
    ///
    /// Missing keys are treated as one key, so at most one null-keyed row
    /// survives.
    pub fn dedup_by(&self, column: &str) -> Result<RecordTable> {
        let col = self.require_column(column)?;
        let mut seen = HashSet::new();
        Ok(self.filter(|_, row| seen.insert(dedup_key(row.get(col).unwrap_or(&NULL)))))
    }

    /// Replace `target` with `replacement(row)` on every row where `mask` holds.
    pub fn replace_where<M, R>(&self, target: &str, mut mask: M, mut replacement: R) -> Result<RecordTable>
    where
        M: FnMut(usize, &[Value]) -> bool,
        R: FnMut(usize, &[Value]) -> Value,
    {
        let col = self.require_column(target)?;
        let rows = self
            .rows
            .iter()
            .enumerate()
            .map(|(idx, row)| {
                let mut row = row.clone();
                if mask(idx, &row) {
                    let value = replacement(idx, &row);
                    if col < row.len() {
                        row[col] = value;
                    }
                }
                row
            })
            .collect();
        Ok(RecordTable::new(self.name.clone(), self.headers.clone(), rows))
    }

    /// Transform every cell of a column.
    pub fn map_column<F>(&self, column: &str, mut f: F) -> Result<RecordTable>
    where
        F: FnMut(&Value) -> Value,
    {
        let col = self.require_column(column)?;
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let mut row = row.clone();
                if let Some(cell) = row.get_mut(col) {
                    *cell = f(cell);
                }
                row
            })
            .collect();
        Ok(RecordTable::new(self.name.clone(), self.headers.clone(), rows))
    }

    /// Add a column, or replace it when it already exists.
    pub fn with_column(&self, column: &str, values: Vec<Value>) -> Result<RecordTable> {
        if values.len() != self.row_count() {
            return Err(MenucleanError::EmptyData(format!(
                "column '{}' has {} values for {} rows",
                column,
                values.len(),
                self.row_count()
            )));
        }
        let mut headers = self.headers.clone();
        let col = match self.column_index(column) {
            Some(col) => col,
            None => {
                headers.push(column.to_string());
                headers.len() - 1
            }
        };
        let rows = self
            .rows
            .iter()
            .zip(values)
            .map(|(row, value)| {
                let mut row = row.clone();
                if row.len() <= col {
                    row.resize(col + 1, Value::Null);
                }
                row[col] = value;
                row
            })
            .collect();
        Ok(RecordTable::new(self.name.clone(), headers, rows))
    }

    /// Count cells that differ between two tables of the same shape.
    ///
    /// Rows are compared by position; returns `None` when the shapes differ.
    pub fn changed_cells(&self, other: &RecordTable) -> Option<usize> {
        if self.headers != other.headers || self.row_count() != other.row_count() {
            return None;
        }
        let changed = self
            .rows
            .iter()
            .zip(&other.rows)
            .map(|(a, b)| a.iter().zip(b).filter(|(x, y)| !x.same_as(y)).count())
            .sum();
        Some(changed)
    }

    fn require_column(&self, column: &str) -> Result<usize> {
        self.column_index(column)
            .ok_or_else(|| MenucleanError::MissingColumn {
                table: self.name.clone(),
                column: column.to_string(),
            })
    }
}

/// Hashable key for deduplication; numbers compare by value.
fn dedup_key(value: &Value) -> String {
    match value.as_f64() {
        Some(n) => format!("n:{}", n),
        None if value.is_null() => "null".to_string(),
        None => format!("s:{}", value),
    }
}

//! In-memory record store.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{info, warn};

use crate::error::{MenucleanError, Result};
use crate::rules::Predicate;
use crate::schema::EntityKind;
use crate::table::{RecordTable, Value};

use super::{InsertReport, RecordStore, insertable_columns};

/// A [`RecordStore`] holding each entity as a [`RecordTable`].
///
/// Enforces the same primary-key uniqueness and range checks as the SQL
/// schema, which makes it a stand-in for a database in tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: HashMap<EntityKind, RecordTable>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored rows of an entity.
    pub fn table(&self, kind: EntityKind) -> Option<&RecordTable> {
        self.tables.get(&kind)
    }

    fn require(&self, kind: EntityKind) -> Result<&RecordTable> {
        self.tables
            .get(&kind)
            .ok_or_else(|| MenucleanError::MissingTable(kind.table_name().to_string()))
    }

    fn empty_table(kind: EntityKind) -> RecordTable {
        let headers = kind
            .schema()
            .column_names()
            .into_iter()
            .map(String::from)
            .collect();
        RecordTable::new(kind.table_name(), headers, Vec::new())
    }

    /// Why a row would be rejected, if it would.
    fn violation(kind: EntityKind, row: &[Value], existing: &HashSet<i64>) -> Option<String> {
        let schema = kind.schema();
        for (def, value) in schema.columns.iter().zip(row) {
            if let (Some((min, max)), Some(v)) = (def.check, value.as_f64()) {
                if v < min as f64 || v > max as f64 {
                    return Some(format!("CHECK constraint failed: {}", def.name));
                }
            }
        }
        match row.first().and_then(Value::as_i64) {
            Some(id) if existing.contains(&id) => Some(format!("UNIQUE constraint failed: {}.id", kind)),
            _ => None,
        }
    }
}

impl RecordStore for MemoryStore {
    fn has_table(&self, kind: EntityKind) -> Result<bool> {
        Ok(self.tables.contains_key(&kind))
    }

    fn reset_table(&mut self, kind: EntityKind) -> Result<()> {
        self.tables.insert(kind, Self::empty_table(kind));
        info!(table = %kind, "Reset table");
        Ok(())
    }

    fn count_rows(&self, kind: EntityKind) -> Result<u64> {
        Ok(self.require(kind)?.row_count() as u64)
    }

    fn ids_where(&self, kind: EntityKind, predicate: &Predicate) -> Result<Vec<i64>> {
        let table = self.require(kind)?;
        if let Some(missing) = predicate.columns().into_iter().find(|c| !table.has_column(c)) {
            return Err(MenucleanError::MissingColumn {
                table: kind.table_name().to_string(),
                column: missing.to_string(),
            });
        }
        let mut ids: Vec<i64> = predicate
            .matching_rows(table)
            .into_iter()
            .filter_map(|row| table.id_of(row))
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }

    fn dangling_references(
        &self,
        child: EntityKind,
        column: &str,
        parent: EntityKind,
    ) -> Result<Vec<i64>> {
        let child_table = self.require(child)?;
        let parent_ids: HashSet<i64> = self.require(parent)?.ids().into_iter().collect();
        let values = child_table
            .column_values(column)
            .ok_or_else(|| MenucleanError::MissingColumn {
                table: child.table_name().to_string(),
                column: column.to_string(),
            })?;

        let mut ids: Vec<i64> = values
            .enumerate()
            .filter(|(_, v)| !v.as_i64().is_some_and(|r| parent_ids.contains(&r)))
            .filter_map(|(row, _)| child_table.id_of(row))
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }

    fn duplicate_ids(&self, kind: EntityKind, columns: &[&str]) -> Result<Vec<i64>> {
        let table = self.require(kind)?;
        let indices = columns
            .iter()
            .map(|c| {
                table.column_index(c).ok_or_else(|| MenucleanError::MissingColumn {
                    table: kind.table_name().to_string(),
                    column: c.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let key_of = |row: &[Value]| -> Option<Vec<String>> {
            indices
                .iter()
                .map(|&i| match row.get(i) {
                    None | Some(Value::Null) => None,
                    Some(v) => Some(v.as_f64().map(|n| n.to_string()).unwrap_or_else(|| v.to_string())),
                })
                .collect()
        };

        let mut counts: HashMap<Vec<String>, usize> = HashMap::new();
        for row in &table.rows {
            if let Some(key) = key_of(row) {
                *counts.entry(key).or_default() += 1;
            }
        }

        let ids: BTreeSet<i64> = table
            .rows
            .iter()
            .enumerate()
            .filter(|(_, row)| key_of(row).is_some_and(|k| counts.get(&k).is_some_and(|&n| n > 1)))
            .filter_map(|(idx, _)| table.id_of(idx))
            .collect();
        Ok(ids.into_iter().collect())
    }

    fn bulk_insert(
        &mut self,
        kind: EntityKind,
        table: &RecordTable,
        interrupt: &AtomicBool,
    ) -> Result<InsertReport> {
        let mut report = InsertReport::new(kind);
        let columns = insertable_columns(kind, table);
        if columns.is_empty() {
            return Err(MenucleanError::EmptyData(format!(
                "{}: no schema columns to insert",
                table.name
            )));
        }

        let target = self
            .tables
            .entry(kind)
            .or_insert_with(|| Self::empty_table(kind));
        let mut existing: HashSet<i64> = target.ids().into_iter().collect();
        let schema_columns = kind.schema().column_names();

        for (idx, row) in table.rows.iter().enumerate() {
            if interrupt.load(Ordering::SeqCst) {
                warn!(table = %kind, row = idx, "Insert interrupted");
                report.interrupted = true;
                report.pending_rows = (idx..table.row_count()).collect();
                break;
            }

            let mut stored: Vec<Value> = schema_columns
                .iter()
                .map(|name| {
                    table
                        .column_index(name)
                        .filter(|_| columns.contains(name))
                        .and_then(|i| row.get(i))
                        .cloned()
                        .unwrap_or_default()
                })
                .collect();

            // A missing key is assigned like an SQL rowid.
            if stored.first().is_some_and(Value::is_null) {
                let next = existing.iter().max().map_or(1, |m| m + 1);
                stored[0] = Value::Integer(next);
            }

            match Self::violation(kind, &stored, &existing) {
                Some(reason) => {
                    warn!(table = %kind, row = idx, error = %reason, "Failed to insert row");
                    report.failed_rows.push(idx);
                }
                None => {
                    if let Some(id) = stored.first().and_then(Value::as_i64) {
                        existing.insert(id);
                    }
                    target.rows.push(stored);
                    report.inserted += 1;
                }
            }
        }

        info!(
            table = %kind,
            inserted = report.inserted,
            failed = report.failed_rows.len(),
            "Bulk insert finished"
        );
        Ok(report)
    }
}

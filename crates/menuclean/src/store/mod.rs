//! Persistent record store interface and its implementations.
//!
//! Validation and loading only need a handful of operations from the
//! store: row counts, predicate lookups, join-based dangling-reference
//! lookups, group-by duplicate detection and bulk insertion. Each is a
//! named method on [`RecordStore`] so the checks never build queries
//! themselves.

mod load;
mod memory;
mod sqlite;

use std::sync::atomic::AtomicBool;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;
use crate::rules::Predicate;
use crate::schema::EntityKind;
use crate::table::RecordTable;

pub use load::{LOAD_REPORT_SUFFIX, Loader};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Operations the validation and load paths need from a store.
pub trait RecordStore {
    /// Whether the entity's table exists.
    fn has_table(&self, kind: EntityKind) -> Result<bool>;

    /// Drop the entity's table if present and create it empty.
    fn reset_table(&mut self, kind: EntityKind) -> Result<()>;

    /// Number of stored rows.
    fn count_rows(&self, kind: EntityKind) -> Result<u64>;

    /// Ids of rows matching `predicate`, ascending.
    fn ids_where(&self, kind: EntityKind, predicate: &Predicate) -> Result<Vec<i64>>;

    /// Ids of `child` rows whose `column` has no matching `parent.id`.
    ///
    /// A null reference counts as dangling.
    fn dangling_references(
        &self,
        child: EntityKind,
        column: &str,
        parent: EntityKind,
    ) -> Result<Vec<i64>>;

    /// Ids of every row whose key over `columns` is shared with another row.
    ///
    /// Rows with a null in any key column are never duplicates.
    fn duplicate_ids(&self, kind: EntityKind, columns: &[&str]) -> Result<Vec<i64>>;

    /// Insert every row of `table`, creating the entity's table if needed.
    ///
    /// A row that fails is recorded and skipped. When `interrupt` is raised
    /// the rows inserted so far are kept and the remainder is reported as
    /// pending.
    fn bulk_insert(
        &mut self,
        kind: EntityKind,
        table: &RecordTable,
        interrupt: &AtomicBool,
    ) -> Result<InsertReport>;

    /// Release the store.
    fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

/// Outcome of a bulk insert.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InsertReport {
    pub table: String,
    pub inserted: usize,
    /// Input row indices (0-based, excluding the header) that failed.
    pub failed_rows: Vec<usize>,
    /// Input row indices not attempted because of an interrupt.
    pub pending_rows: Vec<usize>,
    pub interrupted: bool,
}

impl InsertReport {
    pub(crate) fn new(kind: EntityKind) -> Self {
        Self {
            table: kind.table_name().to_string(),
            ..Self::default()
        }
    }

    /// Whether every row was inserted.
    pub fn is_complete(&self) -> bool {
        self.failed_rows.is_empty() && !self.interrupted
    }
}

/// Schema columns of `kind` present in `table`, in schema order.
///
/// Columns the schema does not know are reported once and ignored.
pub(crate) fn insertable_columns(kind: EntityKind, table: &RecordTable) -> Vec<&'static str> {
    let schema = kind.schema();
    for header in &table.headers {
        if schema.get_column(header).is_none() {
            warn!(table = %kind, column = %header, "Column not in schema; skipped on insert");
        }
    }
    schema
        .column_names()
        .into_iter()
        .filter(|name| table.has_column(name))
        .collect()
}

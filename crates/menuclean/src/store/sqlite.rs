//! SQLite-backed record store.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use rusqlite::types::{ToSql, ToSqlOutput, Value as SqlValue, ValueRef};
use rusqlite::{Connection, params, params_from_iter};
use tracing::{debug, info, warn};

use crate::error::{MenucleanError, Result};
use crate::rules::{Predicate, quote_ident};
use crate::schema::{ColumnType, EntityKind, TableSchema};
use crate::table::{ID_COLUMN, RecordTable, Value};

use super::{InsertReport, RecordStore, insertable_columns};

const SQL_TARGET: &str = "menuclean::sql";

static NULL: Value = Value::Null;

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Integer(i) => ToSqlOutput::Owned(SqlValue::Integer(*i)),
            Value::Float(f) => ToSqlOutput::Owned(SqlValue::Real(*f)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Date(d) => ToSqlOutput::Owned(SqlValue::Text(d.format("%Y-%m-%d").to_string())),
        })
    }
}

fn from_sql(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Value::Text(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

/// Cell as bound for a column of `column_type`.
///
/// Numeric text such as `007` or ` 12 ` is stored as a number in numeric
/// columns so SQL comparisons see its value.
fn bind_value(value: &Value, column_type: ColumnType) -> Value {
    match value {
        Value::Text(_) if column_type.is_numeric() => {
            match (column_type, value.as_i64(), value.as_f64()) {
                (ColumnType::Integer, Some(i), _) => Value::Integer(i),
                (_, _, Some(f)) => Value::Float(f),
                _ => value.clone(),
            }
        }
        other => other.clone(),
    }
}

/// `CREATE TABLE` statement for a schema.
pub(crate) fn create_table_sql(schema: &TableSchema) -> String {
    let mut parts: Vec<String> = schema
        .columns
        .iter()
        .map(|c| {
            let mut def = format!("{} {}", quote_ident(c.name), c.column_type.sql_type());
            if c.name == ID_COLUMN {
                def.push_str(" PRIMARY KEY");
            }
            def
        })
        .collect();
    for column in schema.checked_columns() {
        if let Some((min, max)) = column.check {
            parts.push(format!(
                "CHECK ({} BETWEEN {} AND {})",
                quote_ident(column.name),
                min,
                max
            ));
        }
    }
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
        quote_ident(schema.entity.table_name()),
        parts.join(",\n    ")
    )
}

/// A [`RecordStore`] over a SQLite database.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) a database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| MenucleanError::io(parent, e))?;
        }
        let conn = Connection::open(path)?;
        info!(path = %path.display(), "Opened SQLite store");
        Ok(Self { conn })
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    fn query_ids(&self, sql: &str) -> Result<Vec<i64>> {
        debug!(target: SQL_TARGET, %sql);
        let mut stmt = self.conn.prepare(sql)?;
        let ids = stmt
            .query_map([], |row| row.get::<_, Option<i64>>(0))?
            .filter_map(|id| id.transpose())
            .collect::<rusqlite::Result<Vec<i64>>>()?;
        Ok(ids)
    }

    /// Read `id` plus the listed columns into a table.
    fn scan(&self, kind: EntityKind, columns: &[&str]) -> Result<RecordTable> {
        let mut headers = vec![ID_COLUMN.to_string()];
        headers.extend(columns.iter().filter(|c| **c != ID_COLUMN).map(|c| c.to_string()));

        let select = headers.iter().map(|h| quote_ident(h)).collect::<Vec<_>>().join(", ");
        let sql = format!("SELECT {} FROM {}", select, quote_ident(kind.table_name()));
        debug!(target: SQL_TARGET, %sql);

        let mut stmt = self.conn.prepare(&sql)?;
        let width = headers.len();
        let rows = stmt
            .query_map([], |row| {
                (0..width)
                    .map(|i| row.get_ref(i).map(from_sql))
                    .collect::<rusqlite::Result<Vec<Value>>>()
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(RecordTable::new(kind.table_name(), headers, rows))
    }

    fn require_table(&self, kind: EntityKind) -> Result<()> {
        if self.has_table(kind)? {
            Ok(())
        } else {
            Err(MenucleanError::MissingTable(kind.table_name().to_string()))
        }
    }
}

impl RecordStore for SqliteStore {
    fn has_table(&self, kind: EntityKind) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![kind.table_name()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn reset_table(&mut self, kind: EntityKind) -> Result<()> {
        let sql = format!(
            "DROP TABLE IF EXISTS {};\n{};",
            quote_ident(kind.table_name()),
            create_table_sql(kind.schema())
        );
        debug!(target: SQL_TARGET, %sql);
        self.conn.execute_batch(&sql)?;
        info!(table = %kind, "Reset table");
        Ok(())
    }

    fn count_rows(&self, kind: EntityKind) -> Result<u64> {
        self.require_table(kind)?;
        let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(kind.table_name()));
        debug!(target: SQL_TARGET, %sql);
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn ids_where(&self, kind: EntityKind, predicate: &Predicate) -> Result<Vec<i64>> {
        self.require_table(kind)?;
        match predicate.to_sql() {
            Some(condition) => self.query_ids(&format!(
                "SELECT {id} FROM {table} WHERE {condition} ORDER BY {id}",
                id = quote_ident(ID_COLUMN),
                table = quote_ident(kind.table_name()),
            )),
            None => {
                let table = self.scan(kind, &predicate.columns())?;
                let mut ids: Vec<i64> = predicate
                    .matching_rows(&table)
                    .into_iter()
                    .filter_map(|row| table.id_of(row))
                    .collect();
                ids.sort_unstable();
                Ok(ids)
            }
        }
    }

    fn dangling_references(
        &self,
        child: EntityKind,
        column: &str,
        parent: EntityKind,
    ) -> Result<Vec<i64>> {
        self.require_table(child)?;
        self.require_table(parent)?;
        self.query_ids(&format!(
            "SELECT c.{id} FROM {child} c LEFT JOIN {parent} p ON c.{column} = p.{id} \
             WHERE p.{id} IS NULL ORDER BY c.{id}",
            id = quote_ident(ID_COLUMN),
            child = quote_ident(child.table_name()),
            parent = quote_ident(parent.table_name()),
            column = quote_ident(column),
        ))
    }

    fn duplicate_ids(&self, kind: EntityKind, columns: &[&str]) -> Result<Vec<i64>> {
        self.require_table(kind)?;
        if columns.is_empty() {
            return Ok(Vec::new());
        }
        let keys: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
        let not_null = keys
            .iter()
            .map(|k| format!("{} IS NOT NULL", k))
            .collect::<Vec<_>>()
            .join(" AND ");
        let join_on = keys
            .iter()
            .map(|k| format!("t.{k} = d.{k}"))
            .collect::<Vec<_>>()
            .join(" AND ");
        let key_list = keys.join(", ");
        let table = quote_ident(kind.table_name());

        self.query_ids(&format!(
            "SELECT t.{id} FROM {table} t JOIN (\
             SELECT {key_list} FROM {table} WHERE {not_null} \
             GROUP BY {key_list} HAVING COUNT(*) > 1) d ON {join_on} ORDER BY t.{id}",
            id = quote_ident(ID_COLUMN),
        ))
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
        let schema = kind.schema();
        let bindings: Vec<(usize, ColumnType)> = columns
            .iter()
            .filter_map(|c| {
                let def = schema.get_column(c)?;
                Some((table.column_index(c)?, def.column_type))
            })
            .collect();

        let create = create_table_sql(schema);
        debug!(target: SQL_TARGET, sql = %create);
        self.conn.execute_batch(&create)?;

        let placeholders = (1..=columns.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(kind.table_name()),
            columns.iter().map(|c| quote_ident(c)).collect::<Vec<_>>().join(", "),
            placeholders
        );
        debug!(target: SQL_TARGET, %sql, rows = table.row_count());

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(&sql)?;
            for (idx, row) in table.rows.iter().enumerate() {
                if interrupt.load(Ordering::SeqCst) {
                    warn!(table = %kind, row = idx, "Insert interrupted");
                    report.interrupted = true;
                    report.pending_rows = (idx..table.row_count()).collect();
                    break;
                }
                let values: Vec<Value> = bindings
                    .iter()
                    .map(|&(i, column_type)| bind_value(row.get(i).unwrap_or(&NULL), column_type))
                    .collect();
                match stmt.execute(params_from_iter(values)) {
                    Ok(_) => report.inserted += 1,
                    Err(e) => {
                        warn!(table = %kind, row = idx, error = %e, "Failed to insert row");
                        report.failed_rows.push(idx);
                    }
                }
            }
        }
        tx.commit()?;

        info!(
            table = %kind,
            inserted = report.inserted,
            failed = report.failed_rows.len(),
            "Bulk insert finished"
        );
        Ok(report)
    }

    fn close(self: Box<Self>) -> Result<()> {
        self.conn.close().map_err(|(_, e)| MenucleanError::Store(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{col, lit};

    fn make_table(name: &str, headers: Vec<&str>, rows: Vec<Vec<&str>>) -> RecordTable {
        RecordTable::from_strings(
            name,
            headers.into_iter().map(String::from).collect(),
            rows.into_iter()
                .map(|r| r.into_iter().map(String::from).collect())
                .collect(),
        )
    }

    fn store_with(kind: EntityKind, table: &RecordTable) -> SqliteStore {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.reset_table(kind).unwrap();
        store
            .bulk_insert(kind, table, &AtomicBool::new(false))
            .unwrap();
        store
    }

    #[test]
    fn test_create_table_sql_has_checks() {
        let sql = create_table_sql(EntityKind::Dish.schema());
        assert!(sql.contains("\"id\" INTEGER PRIMARY KEY"));
        assert!(sql.contains("CHECK (\"first_appeared\" BETWEEN 0 AND 9999)"));
        assert!(sql.contains("\"lowest_price\" REAL"));
    }

    #[test]
    fn test_insert_records_failures() {
        let table = make_table(
            "Dish",
            vec!["id", "name", "first_appeared"],
            vec![vec!["1", "Soup", "1900"], vec!["1", "Dup", "1900"], vec!["2", "Tea", "12000"]],
        );
        let mut store = SqliteStore::open_in_memory().unwrap();
        let report = store
            .bulk_insert(EntityKind::Dish, &table, &AtomicBool::new(false))
            .unwrap();

        assert_eq!(report.inserted, 1);
        assert_eq!(report.failed_rows, vec![1, 2]);
        assert_eq!(store.count_rows(EntityKind::Dish).unwrap(), 1);
    }

    #[test]
    fn test_numeric_text_bound_as_number() {
        let table = make_table(
            "Dish",
            vec!["id", "name", "first_appeared", "lowest_price"],
            vec![vec!["007", "007", " 1900 ", "+0.50"], vec!["8", "Tea", "1200", "-1"]],
        );
        let store = store_with(EntityKind::Dish, &table);

        let early = Predicate::lt(col("first_appeared"), lit(1500));
        assert_eq!(store.ids_where(EntityKind::Dish, &early).unwrap(), vec![8]);
        assert_eq!(store.ids_where(EntityKind::Dish, &Predicate::negative("lowest_price")).unwrap(), vec![8]);
        assert_eq!(
            store.ids_where(EntityKind::Dish, &Predicate::eq(col("name"), lit("007"))).unwrap(),
            vec![7]
        );
        assert_eq!(bind_value(&Value::from("abc"), ColumnType::Integer), Value::from("abc"));
    }

    #[test]
    fn test_interrupt_before_first_row() {
        let table = make_table("Menu", vec!["id"], vec![vec!["1"], vec!["2"]]);
        let mut store = SqliteStore::open_in_memory().unwrap();
        let report = store
            .bulk_insert(EntityKind::Menu, &table, &AtomicBool::new(true))
            .unwrap();

        assert!(report.interrupted);
        assert_eq!(report.inserted, 0);
        assert_eq!(report.pending_rows, vec![0, 1]);
        assert!(store.has_table(EntityKind::Menu).unwrap());
    }

    #[test]
    fn test_ids_where_sql_and_fallback() {
        let table = make_table(
            "Menu",
            vec!["id", "date", "page_count"],
            vec![vec!["1", "1900-01-01", "-1"], vec!["2", "c. 1900", "3"], vec!["3", "2030-5-1", "2"]],
        );
        let store = store_with(EntityKind::Menu, &table);

        assert_eq!(store.ids_where(EntityKind::Menu, &Predicate::negative("page_count")).unwrap(), vec![1]);
        assert_eq!(store.ids_where(EntityKind::Menu, &Predicate::unparseable_date("date")).unwrap(), vec![2]);
        assert_eq!(store.ids_where(EntityKind::Menu, &Predicate::year_after("date", 2025)).unwrap(), vec![3]);
    }

    #[test]
    fn test_timestamp_comparison() {
        let table = make_table(
            "MenuItem",
            vec!["id", "created_at", "updated_at"],
            vec![vec!["1", "2011-03-28 15:00:44", "2011-03-28 14:00:00"], vec!["2", "2011-03-28 15:00:44", ""]],
        );
        let store = store_with(EntityKind::MenuItem, &table);
        let p = Predicate::gt(col("created_at"), col("updated_at"));
        assert_eq!(store.ids_where(EntityKind::MenuItem, &p).unwrap(), vec![1]);
        assert!(store
            .ids_where(EntityKind::MenuItem, &Predicate::eq(col("id"), lit(9)))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_duplicates_and_dangling() {
        let pages = make_table(
            "MenuPage",
            vec!["id", "menu_id", "page_number", "uuid"],
            vec![
                vec!["1", "10", "1", "abc"],
                vec!["2", "10", "1", "abc"],
                vec!["3", "11", "", "def"],
                vec!["4", "11", "", ""],
                vec!["5", "", "2", ""],
            ],
        );
        let menus = make_table("Menu", vec!["id"], vec![vec!["10"]]);
        let mut store = store_with(EntityKind::MenuPage, &pages);
        store.reset_table(EntityKind::Menu).unwrap();
        store.bulk_insert(EntityKind::Menu, &menus, &AtomicBool::new(false)).unwrap();

        assert_eq!(store.duplicate_ids(EntityKind::MenuPage, &["uuid"]).unwrap(), vec![1, 2]);
        assert_eq!(
            store.duplicate_ids(EntityKind::MenuPage, &["menu_id", "page_number"]).unwrap(),
            vec![1, 2]
        );
        assert_eq!(
            store.dangling_references(EntityKind::MenuPage, "menu_id", EntityKind::Menu).unwrap(),
            vec![3, 4, 5]
        );
    }

    #[test]
    fn test_missing_table() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(!store.has_table(EntityKind::Dish).unwrap());
        assert!(matches!(
            store.count_rows(EntityKind::Dish),
            Err(MenucleanError::MissingTable(_))
        ));
    }
}

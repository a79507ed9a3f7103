//! Writing record tables back to CSV.

use std::path::Path;

use crate::error::{MenucleanError, Result};
use crate::table::RecordTable;

/// Write `table` as comma-separated values with a header row.
///
/// Null cells are written as empty fields.
pub fn write_csv(table: &RecordTable, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| MenucleanError::io(parent, e))?;
    }

    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(&table.headers)?;
    for row in &table.rows {
        writer.write_record(row.iter().map(|v| v.to_string()))?;
    }
    writer.flush().map_err(|e| MenucleanError::io(path, e))?;
    Ok(())
}

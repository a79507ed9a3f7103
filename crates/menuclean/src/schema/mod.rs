//! Persisted schema of the four menu entities.

mod table;
mod types;

pub use table::{ColumnDef, ForeignKey, TableSchema};
pub use types::{ColumnType, EntityKind};

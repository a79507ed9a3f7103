//! In-memory record tables and cell values.

mod record;
mod value;

pub use record::{ID_COLUMN, RecordTable};
pub use value::{Value, parse_timestamp};

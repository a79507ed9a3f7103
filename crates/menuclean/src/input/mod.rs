//! Reading and writing tabular files.

mod parser;
mod source;
mod writer;

pub use parser::{Parser, ParserConfig};
pub use source::{SourceFormat, SourceMetadata, csv_files};
pub use writer::write_csv;

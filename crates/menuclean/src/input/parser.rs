//! Reading delimited export files into record tables.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{MenucleanError, Result};
use crate::table::RecordTable;

use super::source::{SourceFormat, SourceMetadata};

/// Lines inspected when guessing the separator.
const SNIFF_LINES: usize = 10;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// How export files are read.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Fixed separator convention; guessed per file when absent.
    pub format: Option<SourceFormat>,
    /// Stop after this many data rows.
    pub max_rows: Option<usize>,
    pub quote: u8,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            format: None,
            max_rows: None,
            quote: b'"',
        }
    }
}

/// Reads menu export files into [`RecordTable`]s.
#[derive(Debug, Clone, Default)]
pub struct Parser {
    config: ParserConfig,
}

impl Parser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ParserConfig) -> Self {
        Self { config }
    }

    /// Read `path` into a table named after the file stem.
    ///
    /// A leading UTF-8 byte order mark is skipped; the digest in the
    /// returned metadata still covers the raw bytes.
    pub fn parse_file(&self, path: impl AsRef<Path>) -> Result<(RecordTable, SourceMetadata)> {
        let path = path.as_ref();
        let raw = fs::read(path).map_err(|e| MenucleanError::io(path, e))?;
        let body = raw.strip_prefix(UTF8_BOM).unwrap_or(&raw);

        let format = match self.config.format {
            Some(format) => format,
            None => sniff_format(body)?,
        };
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        debug!(file = %path.display(), %format, "Reading export");

        let table = self.parse_bytes(&name, body, format.separator())?;
        let source = SourceMetadata::describe(path, &raw, format, &table);
        Ok((table, source))
    }

    /// Read `bytes` split on `separator`.
    ///
    /// Short rows are padded with empty cells; a row wider than the header
    /// is an error. A header without data rows gives an empty table; no
    /// header at all is an error.
    pub fn parse_bytes(&self, name: &str, bytes: &[u8], separator: u8) -> Result<RecordTable> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(separator)
            .quote(self.config.quote)
            .flexible(true)
            .from_reader(bytes);

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_owned).collect();
        if headers.iter().all(|h| h.is_empty()) {
            return Err(MenucleanError::EmptyData(format!("{}: no header row", name)));
        }

        let width = headers.len();
        let limit = self.config.max_rows.unwrap_or(usize::MAX);
        let rows = reader
            .records()
            .take(limit)
            .map(|record| -> Result<Vec<String>> {
                let record = record?;
                if record.len() > width {
                    return Err(MenucleanError::RaggedRow {
                        table: name.to_string(),
                        line: record.position().map_or(0, |p| p.line()),
                        expected: width,
                        found: record.len(),
                    });
                }
                let mut cells: Vec<String> = record.iter().map(str::to_owned).collect();
                cells.resize(width, String::new());
                Ok(cells)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(RecordTable::from_strings(name, headers, rows))
    }
}

/// Guess the separator from the first non-blank lines.
///
/// A separator that splits every sampled line into the same number of
/// fields beats one that does not; then more fields win, then tabs, then
/// commas.
/// Falls back to comma when nothing splits the header.
fn sniff_format(bytes: &[u8]) -> Result<SourceFormat> {
    let text = String::from_utf8_lossy(bytes);
    let sample: Vec<&str> = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(SNIFF_LINES)
        .collect();
    let Some(header) = sample.first() else {
        return Err(MenucleanError::EmptyData("nothing to read".to_string()));
    };

    let best = SourceFormat::ALL
        .into_iter()
        .filter_map(|format| {
            let sep = format.separator() as char;
            let in_header = unquoted_count(header, sep);
            if in_header == 0 {
                return None;
            }
            let steady = sample.iter().all(|line| unquoted_count(line, sep) == in_header);
            let rank = (steady, in_header, format == SourceFormat::Tsv, format == SourceFormat::Csv);
            Some((rank, format))
        })
        .max_by_key(|(rank, _)| *rank)
        .map(|(_, format)| format);

    Ok(best.unwrap_or(SourceFormat::Csv))
}

/// Occurrences of `sep` in `line` outside double quotes.
fn unquoted_count(line: &str, sep: char) -> usize {
    line.chars()
        .scan(false, |quoted, c| {
            if c == '"' {
                *quoted = !*quoted;
            }
            Some(!*quoted && c == sep)
        })
        .filter(|&hit| hit)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Value;
    use tempfile::TempDir;

    #[test]
    fn test_sniff_quoted_commas() {
        let data = b"id,name,price\n1,\"Soup, clear\",0.5\n2,Tea,0.1";
        assert_eq!(sniff_format(data).unwrap(), SourceFormat::Csv);
    }

    #[test]
    fn test_sniff_tab_and_semicolon() {
        assert_eq!(sniff_format(b"id\tname\n1\tSoup\n2\tTea").unwrap(), SourceFormat::Tsv);
        assert_eq!(
            sniff_format(b"id;name;note\n1;Soup;a,b\n2;Tea;").unwrap(),
            SourceFormat::Semicolon
        );
        assert_eq!(sniff_format(b"id\n1\n").unwrap(), SourceFormat::Csv);
        assert_eq!(sniff_format(b"a,b;c\n1,2;3\n").unwrap(), SourceFormat::Csv);
    }

    #[test]
    fn test_parse_infers_values() {
        let data = b"id,name,price,date\n1,\"Soup, clear\",0.5,1900-04-15\n2,Tea,,";
        let table = Parser::new().parse_bytes("Dish", data, b',').unwrap();

        assert_eq!(table.name, "Dish");
        assert_eq!(table.headers, vec!["id", "name", "price", "date"]);
        assert_eq!(table.value(0, "name"), Some(&Value::from("Soup, clear")));
        assert_eq!(table.value(0, "price"), Some(&Value::Float(0.5)));
        assert_eq!(table.value(1, "price"), Some(&Value::Null));
    }

    #[test]
    fn test_header_only_and_short_rows() {
        let table = Parser::new().parse_bytes("Menu", b"id,date\n", b',').unwrap();
        assert!(table.is_empty());
        assert_eq!(table.column_count(), 2);

        let table = Parser::new().parse_bytes("Menu", b"id,date,notes\n1,1900\n", b',').unwrap();
        assert_eq!(table.value(0, "notes"), Some(&Value::Null));
    }

    #[test]
    fn test_wide_row_rejected() {
        let err = Parser::new()
            .parse_bytes("Dish", b"id,price\n1,0.5\n2,0.5,EXTRA,MORE\n", b',')
            .unwrap_err();
        match err {
            MenucleanError::RaggedRow { table, line, expected, found } => {
                assert_eq!(table, "Dish");
                assert_eq!(line, 3);
                assert_eq!(expected, 2);
                assert_eq!(found, 4);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_max_rows() {
        let parser = Parser::with_config(ParserConfig {
            max_rows: Some(1),
            ..ParserConfig::default()
        });
        let table = parser.parse_bytes("Dish", b"id\n1\n2\n3\n", b',').unwrap();
        assert_eq!(table.row_count(), 1);
    }

    #[test]
    fn test_empty_input() {
        assert!(sniff_format(b"\n  \n").is_err());
        assert!(Parser::new().parse_bytes("x", b"", b',').is_err());
    }

    #[test]
    fn test_parse_file_skips_bom() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("MenuPage.csv");
        fs::write(&path, b"\xEF\xBB\xBFid\tpage_number\n7\t2\n").unwrap();

        let (table, source) = Parser::new().parse_file(&path).unwrap();
        assert_eq!(table.name, "MenuPage");
        assert_eq!(table.headers, vec!["id", "page_number"]);
        assert_eq!(source.format, SourceFormat::Tsv);
        assert_eq!(source.size_bytes, 22);
    }

    #[test]
    fn test_fixed_format_overrides_sniffing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Dish.csv");
        fs::write(&path, "id;name\n1;Soup\n").unwrap();

        let parser = Parser::with_config(ParserConfig {
            format: Some(SourceFormat::Csv),
            ..ParserConfig::default()
        });
        let (table, _) = parser.parse_file(&path).unwrap();
        assert_eq!(table.headers, vec!["id;name"]);
    }
}

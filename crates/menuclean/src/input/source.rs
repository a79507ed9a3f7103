//! What was read, and from where.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{MenucleanError, Result};
use crate::table::RecordTable;

/// Field separator convention of an export file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Csv,
    Tsv,
    Semicolon,
    Pipe,
}

impl SourceFormat {
    pub const ALL: [SourceFormat; 4] = [
        SourceFormat::Csv,
        SourceFormat::Tsv,
        SourceFormat::Semicolon,
        SourceFormat::Pipe,
    ];

    pub fn separator(self) -> u8 {
        match self {
            SourceFormat::Csv => b',',
            SourceFormat::Tsv => b'\t',
            SourceFormat::Semicolon => b';',
            SourceFormat::Pipe => b'|',
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SourceFormat::Csv => "csv",
            SourceFormat::Tsv => "tsv",
            SourceFormat::Semicolon => "semicolon",
            SourceFormat::Pipe => "pipe",
        };
        f.write_str(label)
    }
}

/// Provenance of one parsed export file.
///
/// Written next to load reports so a failed run can be traced back to the
/// exact bytes it read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceMetadata {
    pub file: String,
    pub path: PathBuf,
    /// `sha256:` followed by the hex digest of the raw bytes.
    pub hash: String,
    pub size_bytes: u64,
    pub format: SourceFormat,
    /// Data rows, header excluded.
    pub row_count: usize,
    pub column_count: usize,
    pub read_at: DateTime<Utc>,
}

impl SourceMetadata {
    /// Describe `table`, parsed from `raw` as read from `path`.
    pub fn describe(path: &Path, raw: &[u8], format: SourceFormat, table: &RecordTable) -> Self {
        Self {
            file: path
                .file_name()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
            path: path.to_path_buf(),
            hash: content_digest(raw),
            size_bytes: raw.len() as u64,
            format,
            row_count: table.row_count(),
            column_count: table.column_count(),
            read_at: Utc::now(),
        }
    }
}

fn content_digest(raw: &[u8]) -> String {
    let digest = Sha256::digest(raw);
    format!("sha256:{}", digest.iter().map(|b| format!("{:02x}", b)).collect::<String>())
}

/// Every `*.csv` file directly inside `dir`, sorted by name.
pub fn csv_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| MenucleanError::io(dir, e))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| MenucleanError::io(dir, e))?.path();
        let is_csv = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if is_csv && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

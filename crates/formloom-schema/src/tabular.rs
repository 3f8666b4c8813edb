//! The tabular reader/writer boundary.
//!
//! The reader yields an ordered list of column headers plus one header-keyed
//! record per data row. On-disk encoding is selected by file extension,
//! case-insensitively, and fails closed for anything unrecognised. Output is
//! always written with CSV conventions regardless of the input delimiter.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Tabular I/O errors.
#[derive(Debug, Error)]
pub enum TabularError {
    #[error("unrecognised file type: {}", path.display())]
    UnrecognizedFileType { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed tabular data: {0}")]
    Malformed(#[from] csv::Error),
}

/// A supported on-disk encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Csv,
    Tsv,
}

impl TableFormat {
    /// Select the encoding from a file extension, case-insensitively.
    pub fn from_path(path: &Path) -> Result<TableFormat, TabularError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "csv" => Ok(TableFormat::Csv),
            "tsv" | "tab" => Ok(TableFormat::Tsv),
            _ => Err(TabularError::UnrecognizedFileType {
                path: path.to_path_buf(),
            }),
        }
    }

    fn delimiter(&self) -> u8 {
        match self {
            TableFormat::Csv => b',',
            TableFormat::Tsv => b'\t',
        }
    }
}

/// A fully read table: ordered headers plus header-keyed records.
#[derive(Debug, Clone, Default)]
pub struct TableData {
    pub columns: Vec<String>,
    pub rows: Vec<HashMap<String, String>>,
}

/// Read a table from disk, selecting the encoding from the extension.
pub fn read_table(path: &Path) -> Result<TableData, TabularError> {
    let format = TableFormat::from_path(path)?;
    let data = fs::read_to_string(path).map_err(|source| TabularError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_table(&data, format)
}

/// Parse CSV text (used on rendered output before post-validation).
pub fn read_table_str(data: &str) -> Result<TableData, TabularError> {
    parse_table(data, TableFormat::Csv)
}

fn parse_table(data: &str, format: TableFormat) -> Result<TableData, TabularError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(format.delimiter())
        .flexible(true)
        .from_reader(data.as_bytes());

    let columns: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let mut row = HashMap::new();
        for (i, column) in columns.iter().enumerate() {
            // short records pad with empty strings
            let cell = record.get(i).unwrap_or("").to_string();
            row.insert(column.clone(), cell);
        }
        rows.push(row);
    }

    Ok(TableData { columns, rows })
}

/// Encode one record as a CSV line, trailing newline included.
pub fn encode_record(cells: &[&str]) -> Result<String, TabularError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(cells)?;
    let bytes = writer
        .into_inner()
        .map_err(|e| TabularError::Malformed(e.into_error().into()))?;
    // the csv writer only ever emits UTF-8 here
    Ok(String::from_utf8(bytes).unwrap_or_default())
}

//! Whitespace-separated numeric tables.
//!
//! Used for the K2GAP light curves and the exoplanet transmission / emission spectra.
//! Blank lines and `#` comments are skipped, then every remaining line is normalized to a
//! comma-separated record and handed to the `csv` reader, which also enforces that all
//! rows have the same number of fields.
use camino::Utf8Path;
use itertools::Itertools;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TextTableError {
    #[error("Unable to perform file operation: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Malformed table: {0}")]
    Csv(#[from] csv::Error),

    #[error("Value {value:?} on data row {row} is not a number")]
    NotNumeric { row: usize, value: String },

    #[error("Expected {expected} columns, found {found}")]
    ColumnCount { expected: usize, found: usize },
}

/// Read a table file and return it column by column.
///
/// Arguments
/// -----------------
/// * `path`: the text file.
/// * `expected_columns`: when set, the table must have exactly this many columns.
///
/// Return
/// ----------
/// * One `Vec<f64>` per column, each as long as the number of data rows.
pub fn read_columns(
    path: &Utf8Path,
    expected_columns: Option<usize>,
) -> Result<Vec<Vec<f64>>, TextTableError> {
    let text = std::fs::read_to_string(path)?;
    parse_columns(&text, expected_columns)
}

pub fn parse_columns(
    text: &str,
    expected_columns: Option<usize>,
) -> Result<Vec<Vec<f64>>, TextTableError> {
    let normalized = text
        .lines()
        .map(|line| line.split('#').next().unwrap_or("").trim())
        .filter(|line| !line.is_empty())
        .map(|line| line.split_whitespace().join(","))
        .join("\n");

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(false)
        .from_reader(normalized.as_bytes());

    let mut columns: Vec<Vec<f64>> = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        if columns.is_empty() {
            if let Some(expected) = expected_columns {
                if record.len() != expected {
                    return Err(TextTableError::ColumnCount {
                        expected,
                        found: record.len(),
                    });
                }
            }
            columns = vec![Vec::new(); record.len()];
        }
        for (column, field) in columns.iter_mut().zip(record.iter()) {
            let value = field.parse::<f64>().map_err(|_| TextTableError::NotNumeric {
                row,
                value: field.to_string(),
            })?;
            column.push(value);
        }
    }

    if let (Some(expected), true) = (expected_columns, columns.is_empty()) {
        return Err(TextTableError::ColumnCount { expected, found: 0 });
    }
    Ok(columns)
}

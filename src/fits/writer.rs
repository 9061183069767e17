//! Small FITS writer.
//!
//! Produces files with a data-less primary HDU followed by binary table extensions,
//! which is all the archive products read by this crate contain. Used to build archive
//! fixtures and benchmark inputs.
use std::io::Write;

use camino::Utf8Path;
use flate2::{write::GzEncoder, Compression};

use super::header::{format_card, HeaderValue, BLOCK_SIZE};

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    F64(Vec<Vec<f64>>),
    F32(Vec<Vec<f32>>),
    I32(Vec<Vec<i32>>),
    I16(Vec<Vec<i16>>),
    Text(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableColumn {
    pub name: String,
    pub data: ColumnData,
}

impl TableColumn {
    pub fn f64(name: &str, values: Vec<f64>) -> Self {
        TableColumn::f64_rows(name, values.into_iter().map(|v| vec![v]).collect())
    }

    pub fn f64_rows(name: &str, rows: Vec<Vec<f64>>) -> Self {
        TableColumn {
            name: name.to_string(),
            data: ColumnData::F64(rows),
        }
    }

    pub fn f32(name: &str, values: Vec<f32>) -> Self {
        TableColumn::f32_rows(name, values.into_iter().map(|v| vec![v]).collect())
    }

    pub fn f32_rows(name: &str, rows: Vec<Vec<f32>>) -> Self {
        TableColumn {
            name: name.to_string(),
            data: ColumnData::F32(rows),
        }
    }

    pub fn i32(name: &str, values: Vec<i32>) -> Self {
        TableColumn {
            name: name.to_string(),
            data: ColumnData::I32(values.into_iter().map(|v| vec![v]).collect()),
        }
    }

    pub fn i16_rows(name: &str, rows: Vec<Vec<i16>>) -> Self {
        TableColumn {
            name: name.to_string(),
            data: ColumnData::I16(rows),
        }
    }

    pub fn text(name: &str, values: Vec<String>) -> Self {
        TableColumn {
            name: name.to_string(),
            data: ColumnData::Text(values),
        }
    }

    fn n_rows(&self) -> usize {
        match &self.data {
            ColumnData::F64(rows) => rows.len(),
            ColumnData::F32(rows) => rows.len(),
            ColumnData::I32(rows) => rows.len(),
            ColumnData::I16(rows) => rows.len(),
            ColumnData::Text(values) => values.len(),
        }
    }

    /// Repeat count: the longest row, at least one.
    fn repeat(&self) -> usize {
        let longest = match &self.data {
            ColumnData::F64(rows) => rows.iter().map(Vec::len).max(),
            ColumnData::F32(rows) => rows.iter().map(Vec::len).max(),
            ColumnData::I32(rows) => rows.iter().map(Vec::len).max(),
            ColumnData::I16(rows) => rows.iter().map(Vec::len).max(),
            ColumnData::Text(values) => values.iter().map(String::len).max(),
        };
        longest.unwrap_or(0).max(1)
    }

    fn tform(&self) -> String {
        let code = match self.data {
            ColumnData::F64(_) => 'D',
            ColumnData::F32(_) => 'E',
            ColumnData::I32(_) => 'J',
            ColumnData::I16(_) => 'I',
            ColumnData::Text(_) => 'A',
        };
        format!("{}{code}", self.repeat())
    }

    fn element_width(&self) -> usize {
        match self.data {
            ColumnData::F64(_) => 8,
            ColumnData::F32(_) | ColumnData::I32(_) => 4,
            ColumnData::I16(_) => 2,
            ColumnData::Text(_) => 1,
        }
    }

    /// Big-endian cell of `row`, zero padded to the column width.
    fn encode_cell(&self, row: usize, out: &mut Vec<u8>) {
        let start = out.len();
        match &self.data {
            ColumnData::F64(rows) => encode_values(rows.get(row), out, |v| v.to_be_bytes()),
            ColumnData::F32(rows) => encode_values(rows.get(row), out, |v| v.to_be_bytes()),
            ColumnData::I32(rows) => encode_values(rows.get(row), out, |v| v.to_be_bytes()),
            ColumnData::I16(rows) => encode_values(rows.get(row), out, |v| v.to_be_bytes()),
            ColumnData::Text(values) => {
                if let Some(value) = values.get(row) {
                    out.extend(value.as_bytes());
                }
            }
        }
        let fill = if matches!(self.data, ColumnData::Text(_)) { b' ' } else { 0 };
        out.resize(start + self.repeat() * self.element_width(), fill);
    }
}

fn encode_values<T: Copy, const N: usize>(
    row: Option<&Vec<T>>,
    out: &mut Vec<u8>,
    to_bytes: impl Fn(T) -> [u8; N],
) {
    for value in row.into_iter().flatten() {
        out.extend(to_bytes(*value));
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
struct TableHdu {
    keywords: Vec<(String, HeaderValue)>,
    columns: Vec<TableColumn>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FitsBuilder {
    primary: Vec<(String, HeaderValue)>,
    tables: Vec<TableHdu>,
}

impl FitsBuilder {
    pub fn new() -> Self {
        FitsBuilder::default()
    }

    pub fn primary_keyword(mut self, keyword: &str, value: HeaderValue) -> Self {
        self.primary.push((keyword.to_string(), value));
        self
    }

    /// Append a binary table extension.
    pub fn table(mut self, keywords: Vec<(String, HeaderValue)>, columns: Vec<TableColumn>) -> Self {
        self.tables.push(TableHdu { keywords, columns });
        self
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut cards = vec![
            ("SIMPLE".to_string(), HeaderValue::Logical(true)),
            ("BITPIX".to_string(), HeaderValue::Int(8)),
            ("NAXIS".to_string(), HeaderValue::Int(0)),
            ("EXTEND".to_string(), HeaderValue::Logical(true)),
        ];
        cards.extend(self.primary.iter().cloned());
        let mut out = header_bytes(&cards);
        for table in &self.tables {
            out.extend(table_bytes(table));
        }
        out
    }

    pub fn write(&self, path: &Utf8Path) -> std::io::Result<()> {
        std::fs::write(path, self.to_bytes())
    }

    pub fn write_gz(&self, path: &Utf8Path) -> std::io::Result<()> {
        let mut encoder = GzEncoder::new(std::fs::File::create(path)?, Compression::fast());
        encoder.write_all(&self.to_bytes())?;
        encoder.finish()?;
        Ok(())
    }
}

fn header_bytes(cards: &[(String, HeaderValue)]) -> Vec<u8> {
    let mut text: String = cards
        .iter()
        .map(|(keyword, value)| format_card(keyword, Some(value)))
        .collect();
    text.push_str(&format_card("END", None));
    pad_block(text.into_bytes(), b' ')
}

fn table_bytes(table: &TableHdu) -> Vec<u8> {
    let n_rows = table.columns.iter().map(TableColumn::n_rows).max().unwrap_or(0);
    let row_len: usize = table
        .columns
        .iter()
        .map(|c| c.repeat() * c.element_width())
        .sum();

    let mut cards = vec![
        ("XTENSION".to_string(), HeaderValue::Str("BINTABLE".into())),
        ("BITPIX".to_string(), HeaderValue::Int(8)),
        ("NAXIS".to_string(), HeaderValue::Int(2)),
        ("NAXIS1".to_string(), HeaderValue::Int(row_len as i64)),
        ("NAXIS2".to_string(), HeaderValue::Int(n_rows as i64)),
        ("PCOUNT".to_string(), HeaderValue::Int(0)),
        ("GCOUNT".to_string(), HeaderValue::Int(1)),
        (
            "TFIELDS".to_string(),
            HeaderValue::Int(table.columns.len() as i64),
        ),
    ];
    for (i, column) in table.columns.iter().enumerate() {
        cards.push((format!("TTYPE{}", i + 1), HeaderValue::Str(column.name.clone())));
        cards.push((format!("TFORM{}", i + 1), HeaderValue::Str(column.tform())));
    }
    cards.extend(table.keywords.iter().cloned());

    let mut out = header_bytes(&cards);
    let mut data = Vec::with_capacity(row_len * n_rows);
    for row in 0..n_rows {
        for column in &table.columns {
            column.encode_cell(row, &mut data);
        }
    }
    out.extend(pad_block(data, 0));
    out
}

fn pad_block(mut bytes: Vec<u8>, fill: u8) -> Vec<u8> {
    bytes.resize(bytes.len().div_ceil(BLOCK_SIZE) * BLOCK_SIZE, fill);
    bytes
}

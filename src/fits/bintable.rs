//! Binary table (`XTENSION = 'BINTABLE'`) decoding.
//!
//! Column layout comes from the `TFIELDS`, `TTYPEn`, `TFORMn`, `TSCALn` and `TZEROn`
//! keywords. Each row is `NAXIS1` bytes wide and the table holds `NAXIS2` rows. All
//! numeric data is big-endian.
//!
//! Supported `TFORM` codes:
//!
//! | code | type              | bytes |
//! |------|-------------------|-------|
//! | `L`  | logical           | 1     |
//! | `B`  | unsigned byte     | 1     |
//! | `I`  | 16-bit integer    | 2     |
//! | `J`  | 32-bit integer    | 4     |
//! | `K`  | 64-bit integer    | 8     |
//! | `A`  | character         | 1     |
//! | `E`  | single precision  | 4     |
//! | `D`  | double precision  | 8     |
//!
//! Bit (`X`), complex (`C`, `M`) and heap descriptor (`P`, `Q`) columns are laid out
//! correctly so later columns still decode, but cannot be read themselves.

use nom::{
    character::complete::{digit0, one_of},
    combinator::map,
    multi::count,
    number::complete::{be_f32, be_f64, be_i16, be_i32, be_i64, u8 as be_u8},
    IResult,
};

use super::header::Header;
use super::FitsError;

/// Upper bound on `TFIELDS` set by the FITS standard.
const MAX_FIELDS: usize = 999;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Logical,
    Bit,
    Byte,
    Short,
    Int,
    Long,
    Char,
    Float,
    Double,
    Complex,
    DoubleComplex,
    Descriptor32,
    Descriptor64,
}

impl ColumnKind {
    fn from_code(code: char) -> Option<Self> {
        Some(match code {
            'L' => ColumnKind::Logical,
            'X' => ColumnKind::Bit,
            'B' => ColumnKind::Byte,
            'I' => ColumnKind::Short,
            'J' => ColumnKind::Int,
            'K' => ColumnKind::Long,
            'A' => ColumnKind::Char,
            'E' => ColumnKind::Float,
            'D' => ColumnKind::Double,
            'C' => ColumnKind::Complex,
            'M' => ColumnKind::DoubleComplex,
            'P' => ColumnKind::Descriptor32,
            'Q' => ColumnKind::Descriptor64,
            _ => return None,
        })
    }

    /// Bytes occupied by `repeat` elements of this kind inside a row, `None` on overflow.
    fn width(self, repeat: usize) -> Option<usize> {
        match self {
            ColumnKind::Bit => Some(repeat.div_ceil(8)),
            ColumnKind::Logical | ColumnKind::Byte | ColumnKind::Char => Some(repeat),
            ColumnKind::Short => repeat.checked_mul(2),
            ColumnKind::Int | ColumnKind::Float => repeat.checked_mul(4),
            ColumnKind::Long | ColumnKind::Double | ColumnKind::Complex => repeat.checked_mul(8),
            ColumnKind::DoubleComplex | ColumnKind::Descriptor64 => repeat.checked_mul(16),
            ColumnKind::Descriptor32 => repeat.checked_mul(8),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
    pub repeat: usize,
    pub offset: usize,
    /// Bytes of one cell.
    pub width: usize,
    pub scale: f64,
    pub zero: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinTable {
    columns: Vec<Column>,
    row_len: usize,
    n_rows: usize,
    data: Vec<u8>,
}

impl BinTable {
    /// Build a table from its extension header and the raw data unit.
    ///
    /// Arguments
    /// -----------------
    /// * `header`: the extension header carrying the column keywords.
    /// * `data`: the data unit, at least `NAXIS1 * NAXIS2` bytes long.
    pub fn from_header(header: &Header, data: &[u8]) -> Result<Self, FitsError> {
        let row_len = usize_keyword(header, "NAXIS1")?;
        let n_rows = usize_keyword(header, "NAXIS2")?;
        let n_fields = usize_keyword(header, "TFIELDS")?;
        if n_fields > MAX_FIELDS {
            return Err(FitsError::Parse(format!(
                "TFIELDS {n_fields} exceeds the {MAX_FIELDS} columns a table may hold"
            )));
        }

        let mut columns = Vec::with_capacity(n_fields);
        let mut offset: usize = 0;
        for i in 1..=n_fields {
            let tform = header.get_str(&format!("TFORM{i}"))?;
            let (repeat, kind) = parse_tform(&tform)?;
            let width = kind
                .width(repeat)
                .ok_or_else(|| FitsError::Parse(format!("TFORM{i} = {tform} is too wide")))?;
            let name = header
                .get_str(&format!("TTYPE{i}"))
                .unwrap_or_else(|_| format!("COL{i}"));
            let scale = header.get_f64(&format!("TSCAL{i}")).unwrap_or(1.0);
            let zero = header.get_f64(&format!("TZERO{i}")).unwrap_or(0.0);
            columns.push(Column {
                name,
                kind,
                repeat,
                offset,
                width,
                scale,
                zero,
            });
            offset = offset
                .checked_add(width)
                .ok_or_else(|| FitsError::Parse("row layout overflows".into()))?;
        }

        if offset > row_len {
            return Err(FitsError::Parse(format!(
                "columns need {offset} bytes but rows are {row_len} bytes wide"
            )));
        }
        let table_len = row_len.checked_mul(n_rows).ok_or_else(|| {
            FitsError::Parse(format!("{n_rows} rows of {row_len} bytes overflow"))
        })?;
        if data.len() < table_len {
            return Err(FitsError::Truncated(format!(
                "table needs {table_len} bytes, data unit holds {}",
                data.len()
            )));
        }

        Ok(BinTable {
            columns,
            row_len,
            n_rows,
            data: data[..table_len].to_vec(),
        })
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Result<&Column, FitsError> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| FitsError::MissingColumn(name.to_string()))
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_ok()
    }

    /// One numeric cell vector per row, scaled by `TSCAL` / `TZERO`.
    pub fn column_rows(&self, name: &str) -> Result<Vec<Vec<f64>>, FitsError> {
        let column = self.column(name)?;
        (0..self.n_rows)
            .map(|row| {
                let start = row * self.row_len + column.offset;
                let cell = &self.data[start..start + column.width];
                let (_, values) = decode_numeric(cell, column)
                    .map_err(|e| FitsError::Parse(format!("column {name}: {e}")))?;
                Ok(values
                    .into_iter()
                    .map(|v| v * column.scale + column.zero)
                    .collect::<Vec<f64>>())
            })
            .collect()
    }

    /// Every value of a numeric column, rows concatenated.
    pub fn column_f64(&self, name: &str) -> Result<Vec<f64>, FitsError> {
        Ok(self.column_rows(name)?.into_iter().flatten().collect())
    }

    /// A character column, one trimmed string per row.
    pub fn column_str(&self, name: &str) -> Result<Vec<String>, FitsError> {
        let column = self.column(name)?;
        if column.kind != ColumnKind::Char {
            return Err(FitsError::ColumnType(name.to_string()));
        }
        Ok((0..self.n_rows)
            .map(|row| {
                let start = row * self.row_len + column.offset;
                let raw = &self.data[start..start + column.repeat];
                String::from_utf8_lossy(raw)
                    .trim_end_matches(['\0', ' '])
                    .to_string()
            })
            .collect())
    }
}

fn usize_keyword(header: &Header, keyword: &str) -> Result<usize, FitsError> {
    let value = header.get_i64(keyword)?;
    usize::try_from(value)
        .map_err(|_| FitsError::Parse(format!("{keyword} must be non-negative, got {value}")))
}

fn tform(input: &str) -> IResult<&str, (&str, char)> {
    let (input, repeat) = digit0(input)?;
    let (input, code) = one_of("LXBIJKAEDCMPQ")(input)?;
    Ok((input, (repeat, code)))
}

/// Decode a `TFORMn` value such as `1D`, `E` or `20A`.
pub fn parse_tform(value: &str) -> Result<(usize, ColumnKind), FitsError> {
    let (_, (repeat, code)) = tform(value.trim())
        .map_err(|_| FitsError::UnsupportedFormat(value.to_string()))?;
    let repeat = if repeat.is_empty() {
        1
    } else {
        repeat
            .parse()
            .map_err(|_| FitsError::UnsupportedFormat(value.to_string()))?
    };
    let kind =
        ColumnKind::from_code(code).ok_or_else(|| FitsError::UnsupportedFormat(value.to_string()))?;
    Ok((repeat, kind))
}

fn decode_numeric<'a>(cell: &'a [u8], column: &Column) -> IResult<&'a [u8], Vec<f64>> {
    let n = column.repeat;
    match column.kind {
        ColumnKind::Double => count(be_f64, n)(cell),
        ColumnKind::Float => map(count(be_f32, n), |v| widen(v, f64::from))(cell),
        ColumnKind::Long => map(count(be_i64, n), |v| widen(v, |x| x as f64))(cell),
        ColumnKind::Int => map(count(be_i32, n), |v| widen(v, f64::from))(cell),
        ColumnKind::Short => map(count(be_i16, n), |v| widen(v, f64::from))(cell),
        ColumnKind::Byte => map(count(be_u8, n), |v| widen(v, f64::from))(cell),
        ColumnKind::Logical => map(count(be_u8, n), |v| {
            widen(v, |b| if b == b'T' { 1.0 } else { 0.0 })
        })(cell),
        _ => Err(nom::Err::Failure(nom::error::Error::new(
            cell,
            nom::error::ErrorKind::Verify,
        ))),
    }
}

fn widen<T>(values: Vec<T>, convert: impl Fn(T) -> f64) -> Vec<f64> {
    values.into_iter().map(convert).collect()
}

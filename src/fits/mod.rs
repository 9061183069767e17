//! # FITS container reader
//!
//! Minimal reader for the FITS files shipped by the archive: a primary HDU followed by
//! any number of extensions, of which only binary tables carry data the pipelines use.
//! Gzip-compressed files (`.fits.gz`, IUE `.mxlo.gz` / `.mxhi.gz`) are detected by their
//! magic bytes and inflated in memory.
//!
//! ## Layout
//!
//! ```text
//! FitsFile
//! └── hdus: Vec<Hdu>
//!     ├── header  (keyword cards, see header)
//!     └── table   (Some for XTENSION = 'BINTABLE', see bintable)
//! ```
//!
//! Image data units are skipped over, never decoded.
//!
//! ## Example
//!
//! ```rust, no_run
//! use camino::Utf8Path;
//! use datadelivery::fits::FitsFile;
//!
//! let fits = FitsFile::open(Utf8Path::new("kplr012644769-2009131105131_llc.fits"))?;
//! let lightcurve = fits.hdu(1)?;
//! let time = lightcurve.column_f64("TIME")?;
//! let bjdrefi = lightcurve.header().get_f64("BJDREFI")?;
//! # Ok::<(), datadelivery::fits::FitsError>(())
//! ```
pub mod bintable;
pub mod header;
pub mod writer;

use std::io::Read;

use camino::{Utf8Path, Utf8PathBuf};
use flate2::read::GzDecoder;
use thiserror::Error;

use bintable::BinTable;
use header::{Header, BLOCK_SIZE};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Error, Debug)]
pub enum FitsError {
    #[error("Unable to read FITS file {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Not a FITS stream: {0}")]
    NotFits(String),

    #[error("Truncated FITS stream: {0}")]
    Truncated(String),

    #[error("Error during the nom parsing: {0}")]
    Parse(String),

    #[error("Missing header keyword: {0}")]
    MissingKeyword(String),

    #[error("Header keyword {0} has an unexpected value: {1}")]
    KeywordType(String, String),

    #[error("Missing table column: {0}")]
    MissingColumn(String),

    #[error("Column {0} is not a character column")]
    ColumnType(String),

    #[error("Unsupported TFORM value: {0}")]
    UnsupportedFormat(String),

    #[error("HDU {index} requested but the file holds {count}")]
    MissingHdu { index: usize, count: usize },

    #[error("HDU {0} is not a binary table")]
    NotATable(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Hdu {
    index: usize,
    header: Header,
    table: Option<BinTable>,
}

impl Hdu {
    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn table(&self) -> Result<&BinTable, FitsError> {
        self.table.as_ref().ok_or(FitsError::NotATable(self.index))
    }

    pub fn column_f64(&self, name: &str) -> Result<Vec<f64>, FitsError> {
        self.table()?.column_f64(name)
    }

    pub fn column_rows(&self, name: &str) -> Result<Vec<Vec<f64>>, FitsError> {
        self.table()?.column_rows(name)
    }

    pub fn column_str(&self, name: &str) -> Result<Vec<String>, FitsError> {
        self.table()?.column_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FitsFile {
    hdus: Vec<Hdu>,
}

impl FitsFile {
    /// Read and decode a FITS file, inflating it first if it is gzip-compressed.
    pub fn open(path: &Utf8Path) -> Result<Self, FitsError> {
        let io_error = |source| FitsError::Io {
            path: path.to_path_buf(),
            source,
        };
        let raw = std::fs::read(path).map_err(io_error)?;
        if raw.starts_with(&GZIP_MAGIC) {
            let mut inflated = Vec::with_capacity(raw.len() * 4);
            GzDecoder::new(raw.as_slice())
                .read_to_end(&mut inflated)
                .map_err(io_error)?;
            FitsFile::from_bytes(&inflated)
        } else {
            FitsFile::from_bytes(&raw)
        }
    }

    /// Decode an uncompressed FITS byte stream.
    ///
    /// Arguments
    /// -----------------
    /// * `bytes`: the whole file; its first card must be `SIMPLE`.
    ///
    /// Return
    /// ----------
    /// * Every HDU found, in file order. Trailing bytes shorter than one block are ignored.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FitsError> {
        if !bytes.starts_with(b"SIMPLE  ") {
            return Err(FitsError::NotFits("first card is not SIMPLE".into()));
        }
        let mut hdus = Vec::new();
        let mut rest = bytes;
        while rest.len() >= BLOCK_SIZE {
            let (after_header, header) = Header::parse(rest)?;
            let data_len = data_unit_len(&header)?;
            if after_header.len() < data_len {
                return Err(FitsError::Truncated(format!(
                    "HDU {} announces {data_len} data bytes, {} remain",
                    hdus.len(),
                    after_header.len()
                )));
            }
            let data = &after_header[..data_len];
            let table = match header.get_str("XTENSION") {
                Ok(kind) if kind == "BINTABLE" => Some(BinTable::from_header(&header, data)?),
                _ => None,
            };
            hdus.push(Hdu {
                index: hdus.len(),
                header,
                table,
            });
            let padded = data_len.div_ceil(BLOCK_SIZE) * BLOCK_SIZE;
            rest = &after_header[padded.min(after_header.len())..];
        }
        Ok(FitsFile { hdus })
    }

    /// Number of HDUs, primary included.
    pub fn len(&self) -> usize {
        self.hdus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hdus.is_empty()
    }

    pub fn hdu(&self, index: usize) -> Result<&Hdu, FitsError> {
        self.hdus.get(index).ok_or(FitsError::MissingHdu {
            index,
            count: self.hdus.len(),
        })
    }

    pub fn primary_header(&self) -> Result<&Header, FitsError> {
        Ok(self.hdu(0)?.header())
    }
}

/// Size in bytes of the data unit described by `header`, padding excluded.
fn data_unit_len(header: &Header) -> Result<usize, FitsError> {
    let naxis = header.get_i64_or("NAXIS", 0)?;
    if naxis == 0 {
        return Ok(0);
    }
    let overflow = || FitsError::Parse("data unit size overflows".into());
    let bitpix = header.get_i64("BITPIX")?;
    let mut elements: i64 = 1;
    for axis in 1..=naxis {
        elements = elements
            .checked_mul(header.get_i64(&format!("NAXIS{axis}"))?)
            .ok_or_else(overflow)?;
    }
    let pcount = header.get_i64_or("PCOUNT", 0)?;
    let gcount = header.get_i64_or("GCOUNT", 1)?;
    let bytes = pcount
        .checked_add(elements)
        .and_then(|n| n.checked_mul(gcount))
        .and_then(|n| n.checked_mul(bitpix.checked_abs()? / 8))
        .ok_or_else(overflow)?;
    usize::try_from(bytes).map_err(|_| FitsError::Parse(format!("negative data size {bytes}")))
}

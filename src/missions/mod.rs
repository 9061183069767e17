//! # Mission pipelines
//!
//! One pipeline per archive. A pipeline turns a [`Request`] into output series in two
//! steps:
//!
//! 1. **resolve** – validate the obsid grammar and map it onto concrete files under the
//!    configured [`DataRoots`], producing a [`ResolvedFileSet`] or a [`ResolveError`]
//!    that carries the mission-specific error code;
//! 2. **extract** – read those files and emit [`DataSeries`] with labels and units.
//!
//! Every failure is reported in-band: [`MissionPipeline::run`] never returns an error,
//! it returns a single failed series instead.
//!
//! ## Pipelines
//!
//! | mission(s)                  | module        |
//! |-----------------------------|---------------|
//! | `kepler`                    | [`kepler`]    |
//! | `k2`                        | [`k2`]        |
//! | `tess`                      | [`tess`]      |
//! | `galex`                     | [`galex`]     |
//! | `iue`                       | [`iue`]       |
//! | `hsla`                      | [`hsla`]      |
//! | `hsc_grism`                 | [`hsc_grism`] |
//! | `states`                    | [`states`]    |
//! | `hlsp_*` (K2 community LCs) | [`k2_hlsp`]   |
//!
//! The legacy plot-service missions are not file based and live in
//! [`crate::plot_service`].
pub mod galex;
pub mod hsc_grism;
pub mod hsla;
pub mod iue;
pub mod k2;
pub mod k2_hlsp;
pub mod kepler;
pub mod kepler_epochs;
pub mod states;
pub mod tess;

use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::DataRoots;
use crate::data_series::{finite_points, DataSeries, Point, Precision};
use crate::fits::{FitsError, FitsFile};
use crate::mission::Mission;
use crate::request::Request;
use crate::text_table::TextTableError;

/// Why a request was rejected before any data was read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectKind {
    /// The obsid does not follow the mission grammar.
    Syntax,
    /// A component parsed but holds a value the mission does not accept.
    InvalidValue,
    /// An expected file is not on disk.
    MissingFile,
    /// The number of files found does not match what the obsid announces.
    FileCount,
    /// The request asks for a product the pipeline cannot serve.
    Unsupported,
}

impl fmt::Display for RejectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RejectKind::Syntax => "malformed obsid",
            RejectKind::InvalidValue => "invalid value",
            RejectKind::MissingFile => "missing file",
            RejectKind::FileCount => "unexpected file count",
            RejectKind::Unsupported => "unsupported product",
        };
        f.write_str(text)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} (errcode {errcode}): {detail}")]
pub struct ResolveError {
    pub errcode: i32,
    pub kind: RejectKind,
    pub detail: String,
}

impl ResolveError {
    pub fn new(errcode: i32, kind: RejectKind, detail: impl Into<String>) -> Self {
        ResolveError {
            errcode,
            kind,
            detail: detail.into(),
        }
    }

    pub fn syntax(errcode: i32, detail: impl Into<String>) -> Self {
        ResolveError::new(errcode, RejectKind::Syntax, detail)
    }

    pub fn invalid(errcode: i32, detail: impl Into<String>) -> Self {
        ResolveError::new(errcode, RejectKind::InvalidValue, detail)
    }

    pub fn missing(errcode: i32, path: &Utf8Path) -> Self {
        ResolveError::new(errcode, RejectKind::MissingFile, path.as_str())
    }
}

/// Files a request resolved to, plus the identifiers parsed from its obsid.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResolvedFileSet {
    pub files: Vec<Utf8PathBuf>,
    pub target_id: String,
    pub campaign: String,
    pub cadence: String,
    /// One tag per file (quarter labels for Kepler, product kind for IUE).
    pub file_tags: Vec<String>,
}

impl ResolvedFileSet {
    pub fn single(file: Utf8PathBuf) -> Self {
        ResolvedFileSet {
            files: vec![file],
            ..ResolvedFileSet::default()
        }
    }
}

/// Errors raised while reading resolved files.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("FITS error: {0}")]
    Fits(#[from] FitsError),

    #[error("Text table error: {0}")]
    Text(#[from] TextTableError),

    #[error("Unexpected file structure: {0}")]
    Structure(String),

    #[error("No finite values left after filtering")]
    NonFinite,
}

/// Error codes a pipeline reports for each class of [`ExtractError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractCodes {
    pub read: i32,
    pub structure: i32,
    pub non_finite: i32,
}

impl ExtractCodes {
    /// Every extraction failure reported with the same code.
    pub const fn uniform(code: i32) -> Self {
        ExtractCodes {
            read: code,
            structure: code,
            non_finite: code,
        }
    }

    pub fn code(&self, err: &ExtractError) -> i32 {
        match err {
            ExtractError::Fits(_) | ExtractError::Text(_) => self.read,
            ExtractError::Structure(_) => self.structure,
            ExtractError::NonFinite => self.non_finite,
        }
    }
}

/// A per-mission resolver and extractor.
pub trait MissionPipeline: Send + Sync + fmt::Debug {
    fn mission(&self) -> Mission;

    /// Map a request onto files, validating the obsid on the way.
    fn resolve(&self, request: &Request, roots: &DataRoots)
        -> Result<ResolvedFileSet, ResolveError>;

    /// Read the resolved files into series.
    fn extract(
        &self,
        request: &Request,
        resolved: &ResolvedFileSet,
    ) -> Result<Vec<DataSeries>, ExtractError>;

    /// Error codes reported for extraction failures.
    fn extract_codes(&self) -> ExtractCodes;

    /// Whether a cached response may stand in for this obsid.
    fn uses_cache(&self, _obsid: &str) -> bool {
        false
    }

    /// Resolve then extract, turning any failure into a single failed series.
    fn run(&self, request: &Request, roots: &DataRoots) -> Vec<DataSeries> {
        let mission = self.mission();
        let resolved = match self.resolve(request, roots) {
            Ok(resolved) => resolved,
            Err(err) => {
                debug!(%mission, obsid = %request.obsid, "rejected: {err}");
                return vec![DataSeries::failure(mission.as_str(), &request.obsid, err.errcode)];
            }
        };
        match self.extract(request, &resolved) {
            Ok(series) => series,
            Err(err) => {
                let errcode = self.extract_codes().code(&err);
                warn!(%mission, obsid = %request.obsid, errcode, "extraction failed: {err}");
                vec![DataSeries::failure(mission.as_str(), &request.obsid, errcode)]
            }
        }
    }
}

/// Light-curve cadence encoded in Kepler / K2 / HLSP obsids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    Long,
    Short,
}

impl Cadence {
    pub fn parse(code: &str) -> Option<Self> {
        match code {
            "lc" => Some(Cadence::Long),
            "sc" => Some(Cadence::Short),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Cadence::Long => "lc",
            Cadence::Short => "sc",
        }
    }

    /// Suffix of the archive light-curve file name.
    pub fn file_suffix(self) -> &'static str {
        match self {
            Cadence::Long => "_llc.fits",
            Cadence::Short => "_slc.fits",
        }
    }
}

/// Split `obsid` on `separators`, drop empty pieces, and require exactly `N` of them.
pub(crate) fn split_obsid<'a, const N: usize>(
    obsid: &'a str,
    separators: &Regex,
) -> Option<[&'a str; N]> {
    let parts: Vec<&str> = separators
        .split(obsid)
        .filter(|part| !part.is_empty())
        .collect();
    parts.try_into().ok()
}

/// `path` if it is an existing file, else a [`RejectKind::MissingFile`] error.
pub(crate) fn require_file(path: Utf8PathBuf, errcode: i32) -> Result<Utf8PathBuf, ResolveError> {
    if path.is_file() {
        Ok(path)
    } else {
        Err(ResolveError::missing(errcode, &path))
    }
}

/// Add a constant offset to every time stamp.
pub(crate) fn shift(times: Vec<f64>, offset: f64) -> Vec<f64> {
    times.into_iter().map(|t| t + offset).collect()
}

/// Keep `values[i]` where `mask[i]` holds.
pub(crate) fn select(values: &[f64], mask: &[bool]) -> Vec<f64> {
    values
        .iter()
        .zip(mask)
        .filter(|&(_, &keep)| keep)
        .map(|(&v, _)| v)
        .collect()
}

/// SAP and PDCSAP light curves of a mission pipeline file, times moved to BJD.
///
/// Reads extension 1 of a Kepler, K2 or TESS light-curve file: `TIME` plus the
/// `BJDREFI` / `BJDREFF` reference, `SAP_FLUX` and `PDCSAP_FLUX`.
pub(crate) fn read_sap_pdcsap(path: &Utf8Path) -> Result<(Vec<Point>, Vec<Point>), ExtractError> {
    let fits = FitsFile::open(path)?;
    let lightcurve = fits.hdu(1)?;
    let header = lightcurve.header();
    let offset = header.get_f64("BJDREFI")? + header.get_f64("BJDREFF")?;
    let bjd = shift(lightcurve.column_f64("TIME")?, offset);
    let sap = lightcurve.column_f64("SAP_FLUX")?;
    let pdcsap = lightcurve.column_f64("PDCSAP_FLUX")?;
    Ok((
        finite_points(&bjd, &sap, Precision::LIGHT_CURVE),
        finite_points(&bjd, &pdcsap, Precision::LIGHT_CURVE),
    ))
}

/// Element-wise: every column is finite at this row.
pub(crate) fn finite_mask(columns: &[&[f64]]) -> Vec<bool> {
    let rows = columns.iter().map(|c| c.len()).min().unwrap_or(0);
    (0..rows)
        .map(|i| columns.iter().all(|c| c[i].is_finite()))
        .collect()
}

#[cfg(test)]
mod missions_test {
    use super::*;

    #[test]
    fn test_split_obsid() {
        let re = Regex::new("_|-").unwrap();
        assert_eq!(split_obsid::<3>("a_b-c", &re), Some(["a", "b", "c"]));
        assert_eq!(split_obsid::<3>("__a_b-c_", &re), Some(["a", "b", "c"]));
        assert_eq!(split_obsid::<3>("a_b", &re), None);
    }

    #[test]
    fn test_cadence() {
        assert_eq!(Cadence::parse("lc"), Some(Cadence::Long));
        assert_eq!(Cadence::parse("sc").map(Cadence::file_suffix), Some("_slc.fits"));
        assert_eq!(Cadence::parse("LC"), None);
    }

    #[test]
    fn test_masks() {
        let a = [1.0, f64::NAN, 3.0];
        let b = [1.0, 2.0, f64::INFINITY];
        let mask = finite_mask(&[&a[..], &b[..]]);
        assert_eq!(mask, vec![true, false, false]);
        assert_eq!(select(&a, &mask), vec![1.0]);
        assert_eq!(shift(vec![1.0, 2.0], 10.0), vec![11.0, 12.0]);
    }

    #[test]
    fn test_extract_codes() {
        let codes = ExtractCodes {
            read: 4,
            structure: 5,
            non_finite: 6,
        };
        assert_eq!(codes.code(&ExtractError::NonFinite), 6);
        assert_eq!(codes.code(&ExtractError::Structure("x".into())), 5);
        assert_eq!(codes.code(&ExtractError::Fits(FitsError::NotATable(1))), 4);
        assert_eq!(ExtractCodes::uniform(3).code(&ExtractError::NonFinite), 3);
    }
}

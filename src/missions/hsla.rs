//! # Hubble Spectroscopic Legacy Archive
//!
//! Spectra are filed per target under `<missions>/hst/spectral_legacy/datapile/<target>/`,
//! so the request's target field is required.
//!
//! * obsid `hsla_coadd`: every `*coadd*.fits.gz` in the target directory, sorted by name.
//!   Each coadd yields its weighted flux (ancillary unless the file is the `_all`
//!   coadd) and the flux error (always ancillary).
//! * any other obsid: the exposure file `<obsid>_x1d.fits.gz`, one flux and one error
//!   curve per detector segment.
//!
//! Every curve is returned as its own [`DataSeries`]. A file that cannot be read adds
//! one errcode-3 series in its place; the other files are still delivered.
//!
//! Error codes: 1 no target directory, 2 no spectrum file, 3 read failure.
use camino::{Utf8Path, Utf8PathBuf};
use tracing::warn;
use walkdir::WalkDir;

use super::{ExtractCodes, ExtractError, MissionPipeline, ResolveError, ResolvedFileSet};
use crate::config::DataRoots;
use crate::constants::{UNIT_ANGSTROM, UNIT_FLUX_DENSITY};
use crate::data_series::{finite_points, DataSeries, Point, Precision};
use crate::fits::FitsFile;
use crate::mission::Mission;
use crate::request::Request;

pub const COADD_OBSID: &str = "hsla_coadd";

const GZ_FITS: &str = ".fits.gz";

#[derive(Debug, Clone, Copy, Default)]
pub struct HslaPipeline;

fn is_coadd_request(obsid: &str) -> bool {
    obsid.trim().eq_ignore_ascii_case(COADD_OBSID)
}

/// Sorted `*coadd*.fits.gz` files directly inside `dir`.
fn coadd_files(dir: &Utf8Path) -> Vec<Utf8PathBuf> {
    let mut files: Vec<Utf8PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!("skipping unreadable entry in {dir}: {err}");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| Utf8PathBuf::from_path_buf(entry.into_path()).ok())
        .filter(|path| {
            path.file_name()
                .is_some_and(|name| name.contains("coadd") && name.ends_with(GZ_FITS))
        })
        .collect();
    files.sort();
    files
}

/// Single-curve series carrying its ancillary flag.
fn curve(obsid: &str, label: String, points: Vec<Point>, ancillary: bool) -> DataSeries {
    let mut series = DataSeries::new(Mission::Hsla.as_str(), obsid);
    series.push_flagged(label, points, UNIT_ANGSTROM, UNIT_FLUX_DENSITY, ancillary);
    series
}

fn read_exposure(obsid: &str, path: &Utf8Path) -> Result<Vec<DataSeries>, ExtractError> {
    let fits = FitsFile::open(path)?;
    let spectra = fits.hdu(1)?;
    let segments = spectra.column_str("SEGMENT")?;
    let wavelengths = spectra.column_rows("WAVELENGTH")?;
    let fluxes = spectra.column_rows("FLUX")?;
    let errors = spectra.column_rows("ERROR")?;

    let mut out = Vec::with_capacity(2 * segments.len());
    for (((segment, wl), fl), err) in segments.iter().zip(&wavelengths).zip(&fluxes).zip(&errors) {
        let label = format!("{obsid}_{}", segment.trim());
        out.push(curve(
            obsid,
            label.clone(),
            finite_points(wl, fl, Precision::SPECTRUM),
            false,
        ));
        out.push(curve(
            obsid,
            format!("{label}_ERR"),
            finite_points(wl, err, Precision::SPECTRUM),
            true,
        ));
    }
    Ok(out)
}

fn read_coadd(obsid: &str, path: &Utf8Path) -> Result<Vec<DataSeries>, ExtractError> {
    let fits = FitsFile::open(path)?;
    let spectrum = fits.hdu(1)?;
    let wave = spectrum.column_f64("WAVE")?;
    let flux = spectrum.column_f64("FLUXWGT")?;
    let error = spectrum.column_f64("FLUXWGT_ERR")?;

    let name = path.file_name().unwrap_or_default();
    let stem = name.strip_suffix(GZ_FITS).unwrap_or(name);
    let is_all = name.ends_with("_all.fits.gz");
    Ok(vec![
        curve(
            obsid,
            stem.to_string(),
            finite_points(&wave, &flux, Precision::SPECTRUM),
            !is_all,
        ),
        curve(
            obsid,
            format!("{stem}_ERR"),
            finite_points(&wave, &error, Precision::SPECTRUM),
            true,
        ),
    ])
}

impl MissionPipeline for HslaPipeline {
    fn mission(&self) -> Mission {
        Mission::Hsla
    }

    fn resolve(&self, request: &Request, roots: &DataRoots) -> Result<ResolvedFileSet, ResolveError> {
        let target = request.target.trim();
        let dir = roots
            .missions
            .join("hst")
            .join("spectral_legacy")
            .join("datapile")
            .join(target);
        if target.is_empty() || !dir.is_dir() {
            return Err(ResolveError::missing(1, &dir));
        }

        let files = if is_coadd_request(&request.obsid) {
            coadd_files(&dir)
        } else {
            let exposure = dir.join(format!("{}_x1d{GZ_FITS}", request.obsid.trim()));
            if exposure.is_file() {
                vec![exposure]
            } else {
                Vec::new()
            }
        };
        if files.is_empty() {
            return Err(ResolveError::missing(2, &dir));
        }
        Ok(ResolvedFileSet {
            files,
            target_id: target.to_string(),
            ..ResolvedFileSet::default()
        })
    }

    fn extract(
        &self,
        request: &Request,
        resolved: &ResolvedFileSet,
    ) -> Result<Vec<DataSeries>, ExtractError> {
        let coadd = is_coadd_request(&request.obsid);
        let mut out = Vec::new();
        let mut first_error = None;
        for path in &resolved.files {
            let read = if coadd {
                read_coadd(&request.obsid, path)
            } else {
                read_exposure(&request.obsid, path)
            };
            match read {
                Ok(series) => out.extend(series),
                Err(err) => {
                    warn!(obsid = %request.obsid, "skipping {path}: {err}");
                    out.push(DataSeries::failure(
                        Mission::Hsla.as_str(),
                        &request.obsid,
                        self.extract_codes().code(&err),
                    ));
                    first_error.get_or_insert(err);
                }
            }
        }
        // nothing readable: report the request as one failure
        match first_error {
            Some(err) if out.iter().all(|s| !s.is_success()) => Err(err),
            _ => Ok(out),
        }
    }

    fn extract_codes(&self) -> ExtractCodes {
        ExtractCodes::uniform(3)
    }
}

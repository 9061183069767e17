//! EVEREST: raw (`FRAW`) and decorrelated (`FCOR`) flux. A product file has six HDUs.
//!
//! Error codes: 4 unexpected HDU count, 5 read failure, 6 no finite rows.
use camino::Utf8Path;

use super::Curve;
use crate::constants::UNIT_ELECTRONS_PER_SECOND;
use crate::data_series::{finite_points, Precision};
use crate::fits::FitsFile;
use crate::missions::{finite_mask, select, shift, ExtractError};

const EVEREST_HDUS: usize = 6;

pub(super) fn read(path: &Utf8Path) -> Result<Vec<Curve>, ExtractError> {
    let fits = FitsFile::open(path)?;
    if fits.len() != EVEREST_HDUS {
        return Err(ExtractError::Structure(format!(
            "expected {EVEREST_HDUS} HDUs, found {}",
            fits.len()
        )));
    }
    let lightcurve = fits.hdu(1)?;
    let header = lightcurve.header();
    let bjd = shift(
        lightcurve.column_f64("TIME")?,
        header.get_f64("BJDREFF")? + header.get_f64("BJDREFI")?,
    );
    let raw = lightcurve.column_f64("FRAW")?;
    let corrected = lightcurve.column_f64("FCOR")?;

    // rows are kept only where all three columns are finite
    let mask = finite_mask(&[bjd.as_slice(), raw.as_slice(), corrected.as_slice()]);
    let bjd = select(&bjd, &mask);
    if bjd.is_empty() {
        return Err(ExtractError::NonFinite);
    }
    Ok(vec![
        Curve::new(
            "Raw",
            finite_points(&bjd, &select(&raw, &mask), Precision::LIGHT_CURVE),
            UNIT_ELECTRONS_PER_SECOND,
        ),
        Curve::new(
            "Corrected",
            finite_points(&bjd, &select(&corrected, &mask), Precision::LIGHT_CURVE),
            UNIT_ELECTRONS_PER_SECOND,
        ),
    ])
}

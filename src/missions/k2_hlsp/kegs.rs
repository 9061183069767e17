//! KEGS: five corrected fluxes (`FCOR1`..`FCOR5`) and the raw flux, each filtered on
//! its own.
//!
//! Error codes: 4 read failure, 5 every curve empty after filtering.
use camino::Utf8Path;

use super::Curve;
use crate::constants::{BKJD_OFFSET, UNIT_COUNTS_PER_SECOND};
use crate::data_series::{finite_points, Precision};
use crate::fits::FitsFile;
use crate::missions::{shift, ExtractError};

const KEGS_FLUX_COLUMNS: [&str; 6] = ["FCOR1", "FCOR2", "FCOR3", "FCOR4", "FCOR5", "FRAW"];

pub(super) fn read(path: &Utf8Path) -> Result<Vec<Curve>, ExtractError> {
    let fits = FitsFile::open(path)?;
    let lightcurve = fits.hdu(1)?;
    let bjd = shift(lightcurve.column_f64("TIME")?, BKJD_OFFSET);

    let curves = KEGS_FLUX_COLUMNS
        .iter()
        .map(|&column| -> Result<Curve, ExtractError> {
            let flux = lightcurve.column_f64(column)?;
            Ok(Curve::new(
                column,
                finite_points(&bjd, &flux, Precision::LIGHT_CURVE),
                UNIT_COUNTS_PER_SECOND,
            ))
        })
        .collect::<Result<Vec<Curve>, ExtractError>>()?;

    if curves.iter().all(|curve| curve.points.is_empty()) {
        return Err(ExtractError::NonFinite);
    }
    Ok(curves)
}

//! K2SC: two corrected light curves (HDUs 1 and 2), labelled by their `EXTNAME`.
//!
//! Error codes: 4 unexpected HDU count, 5 read failure, 6 a curve with no finite rows.
use camino::Utf8Path;

use super::Curve;
use crate::constants::{BKJD_OFFSET, UNIT_ELECTRONS_PER_SECOND};
use crate::data_series::{finite_points, Precision};
use crate::fits::FitsFile;
use crate::missions::{shift, ExtractError};

const K2SC_HDUS: usize = 3;

pub(super) fn read(path: &Utf8Path) -> Result<Vec<Curve>, ExtractError> {
    let fits = FitsFile::open(path)?;
    if fits.len() != K2SC_HDUS {
        return Err(ExtractError::Structure(format!(
            "expected {K2SC_HDUS} HDUs, found {}",
            fits.len()
        )));
    }
    (1..K2SC_HDUS)
        .map(|index| -> Result<Curve, ExtractError> {
            let hdu = fits.hdu(index)?;
            let extname = hdu.header().get_str("EXTNAME")?;
            let bjd = shift(hdu.column_f64("time")?, BKJD_OFFSET);
            let points = finite_points(&bjd, &hdu.column_f64("flux")?, Precision::LIGHT_CURVE);
            if points.is_empty() {
                return Err(ExtractError::NonFinite);
            }
            Ok(Curve::new(extname.trim(), points, UNIT_ELECTRONS_PER_SECOND))
        })
        .collect()
}

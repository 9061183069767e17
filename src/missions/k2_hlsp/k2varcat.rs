//! K2VARCAT: extracted aperture flux and detrended flux. Times are Kepler BJD; the file
//! states its reference in `TUNIT1` (`BJD - 2454833`), which must match.
//!
//! Error codes: 4 unexpected time reference, 5 read failure, 6 no finite rows.
use camino::Utf8Path;

use super::Curve;
use crate::constants::{BKJD_OFFSET, UNIT_ELECTRONS_PER_SECOND, UNIT_NORMALIZED};
use crate::data_series::{finite_points, Precision};
use crate::fits::FitsFile;
use crate::missions::{shift, ExtractError};

/// Reference date stated by a `TUNIT` value such as `BJD - 2454833`.
fn time_reference(tunit: &str) -> Option<f64> {
    tunit.split('-').nth(1)?.trim().parse().ok()
}

pub(super) fn read(path: &Utf8Path) -> Result<Vec<Curve>, ExtractError> {
    let fits = FitsFile::open(path)?;
    let lightcurve = fits.hdu(1)?;
    let tunit = lightcurve.header().get_str("TUNIT1")?;
    if time_reference(&tunit) != Some(BKJD_OFFSET) {
        return Err(ExtractError::Structure(format!("unexpected time unit {tunit:?}")));
    }

    let bjd = shift(lightcurve.column_f64("TIME")?, BKJD_OFFSET);
    let extracted = finite_points(&bjd, &lightcurve.column_f64("APTFLUX")?, Precision::LIGHT_CURVE);
    let detrended = finite_points(&bjd, &lightcurve.column_f64("DETFLUX")?, Precision::LIGHT_CURVE);
    if extracted.is_empty() && detrended.is_empty() {
        return Err(ExtractError::NonFinite);
    }
    Ok(vec![
        Curve::new("Extracted", extracted, UNIT_ELECTRONS_PER_SECOND),
        Curve::new("Detrended", detrended, UNIT_NORMALIZED),
    ])
}

#[cfg(test)]
mod k2varcat_test {
    use super::*;

    #[test]
    fn test_time_reference() {
        assert_eq!(time_reference("BJD - 2454833"), Some(2454833.0));
        assert_eq!(time_reference("BJD - 2400000"), Some(2400000.0));
        assert_eq!(time_reference("d"), None);
    }
}

//! K2GAP: two-column text table of Kepler BJD (`BJD - 2454833`) and normalized flux.
//!
//! Error codes: 4 unreadable or malformed table, 5 no finite rows.
use camino::Utf8Path;

use super::Curve;
use crate::constants::{BKJD_OFFSET, UNIT_NORMALIZED};
use crate::data_series::{finite_points, Precision};
use crate::missions::{shift, ExtractError};
use crate::text_table::read_columns;

pub(super) fn read(path: &Utf8Path) -> Result<Vec<Curve>, ExtractError> {
    let mut columns = read_columns(path, Some(2))?.into_iter();
    let (Some(bkjd), Some(flux)) = (columns.next(), columns.next()) else {
        return Err(ExtractError::Structure("expected two columns".into()));
    };
    let points = finite_points(&shift(bkjd, BKJD_OFFSET), &flux, Precision::LIGHT_CURVE);
    if points.is_empty() {
        return Err(ExtractError::NonFinite);
    }
    Ok(vec![Curve::new("", points, UNIT_NORMALIZED)])
}

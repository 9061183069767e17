//! # STATES exoplanet spectra
//!
//! Transmission and emission spectra as plain text tables with four columns:
//! wavelength, wavelength half-width, `(R_p/R_s)^2` and its uncertainty.
//! Obsids containing `_transmission_` live in `<states>/transmission_spectra/`,
//! all others in `<states>/emission_spectra/`, as `<obsid>.txt`.
//!
//! Error codes: 1 missing file, 2 unreadable file, 3 not a four-column numeric table.
use super::{require_file, ExtractCodes, ExtractError, MissionPipeline, ResolveError, ResolvedFileSet};
use crate::config::DataRoots;
use crate::constants::{UNIT_MICRONS, UNIT_RADIUS_RATIO_SQ};
use crate::data_series::{finite_points_with_errors, DataSeries, Point, Precision};
use crate::mission::Mission;
use crate::request::Request;
use crate::text_table::{read_columns, TextTableError};

const STATES_COLUMNS: usize = 4;

#[derive(Debug, Clone, Copy, Default)]
pub struct StatesPipeline;

impl MissionPipeline for StatesPipeline {
    fn mission(&self) -> Mission {
        Mission::States
    }

    fn resolve(&self, request: &Request, roots: &DataRoots) -> Result<ResolvedFileSet, ResolveError> {
        let obsid = request.obsid.trim();
        let kind = if obsid.contains("_transmission_") {
            "transmission_spectra"
        } else {
            "emission_spectra"
        };
        let path = roots.states.join(kind).join(format!("{obsid}.txt"));
        Ok(ResolvedFileSet::single(require_file(path, 1)?))
    }

    fn extract(
        &self,
        request: &Request,
        resolved: &ResolvedFileSet,
    ) -> Result<Vec<DataSeries>, ExtractError> {
        let mut series = DataSeries::new(Mission::States.as_str(), &request.obsid);
        for path in &resolved.files {
            let columns = read_columns(path, Some(STATES_COLUMNS)).map_err(|err| match err {
                TextTableError::IoError(_) => ExtractError::Text(err),
                other => ExtractError::Structure(other.to_string()),
            })?;
            let [wl, dwl, depth, depth_err] = columns.as_slice() else {
                return Err(ExtractError::Structure("expected four columns".into()));
            };
            let points = wl
                .iter()
                .zip(dwl)
                .zip(depth)
                .zip(depth_err)
                .map(|(((&x, &xerr), &y), &yerr)| Point::with_errors(x, xerr, y, yerr))
                .collect();
            series.push(
                format!("STATES_{}", request.obsid),
                finite_points_with_errors(points, Precision::Exact),
                UNIT_MICRONS,
                UNIT_RADIUS_RATIO_SQ,
            );
        }
        Ok(vec![series])
    }

    fn extract_codes(&self) -> ExtractCodes {
        ExtractCodes {
            read: 2,
            structure: 3,
            non_finite: 3,
        }
    }
}

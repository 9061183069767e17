//! # Hubble Source Catalog grism spectra
//!
//! Obsids are HLA product file names, e.g. `hag_j8ff01kmq_g800l_...spec1d.fits`. The
//! instrument prefix picks the archive branch (`hag` ACS grism, `hng` NICMOS grism) and
//! the dataset name shards the path:
//! `<missions>/hst/hla/data24/<branch>/<dataset[0:4]>/<dataset[0:6]>/<obsid lower>`.
//!
//! Error codes: 1 two-dimensional product, 2 unknown instrument prefix, 3 missing file,
//! 4 read failure, 5 no finite flux.
use super::galex::read_first_row_spectrum;
use super::{ExtractCodes, ExtractError, MissionPipeline, RejectKind, ResolveError, ResolvedFileSet};
use crate::config::DataRoots;
use crate::constants::{UNIT_ANGSTROM, UNIT_FLUX_DENSITY};
use crate::data_series::DataSeries;
use crate::mission::Mission;
use crate::request::Request;

#[derive(Debug, Clone, Copy, Default)]
pub struct HscGrismPipeline;

impl MissionPipeline for HscGrismPipeline {
    fn mission(&self) -> Mission {
        Mission::HscGrism
    }

    fn resolve(&self, request: &Request, roots: &DataRoots) -> Result<ResolvedFileSet, ResolveError> {
        let obsid = request.obsid.as_str();
        if obsid.ends_with(".spec2d.fits") {
            return Err(ResolveError::new(1, RejectKind::Unsupported, "2D spectral image"));
        }
        let lower = obsid.to_lowercase();
        let mut parts = lower.split('_');
        let branch = match parts.next() {
            Some("hag") => "acsgrism",
            Some("hng") => "nicgrism",
            other => {
                return Err(ResolveError::syntax(
                    2,
                    format!("unknown instrument prefix {:?}", other.unwrap_or_default()),
                ))
            }
        };
        let dataset = parts
            .next()
            .and_then(|_| parts.next())
            .filter(|dataset| dataset.len() >= 6 && dataset.is_ascii())
            .ok_or_else(|| ResolveError::syntax(2, "no dataset name in obsid"))?;

        let path = roots
            .missions
            .join("hst")
            .join("hla")
            .join("data24")
            .join(branch)
            .join(&dataset[0..4])
            .join(&dataset[0..6])
            .join(&lower);
        if !path.is_file() {
            return Err(ResolveError::missing(3, &path));
        }
        Ok(ResolvedFileSet::single(path))
    }

    fn extract(
        &self,
        request: &Request,
        resolved: &ResolvedFileSet,
    ) -> Result<Vec<DataSeries>, ExtractError> {
        let mut series = DataSeries::new(Mission::HscGrism.as_str(), &request.obsid);
        for path in &resolved.files {
            let points = read_first_row_spectrum(path)?;
            if points.is_empty() {
                return Err(ExtractError::NonFinite);
            }
            series.push(&request.obsid, points, UNIT_ANGSTROM, UNIT_FLUX_DENSITY);
        }
        Ok(vec![series])
    }

    fn extract_codes(&self) -> ExtractCodes {
        ExtractCodes {
            read: 4,
            structure: 4,
            non_finite: 5,
        }
    }
}

#[cfg(test)]
mod hsc_grism_test {
    use super::*;
    use camino::Utf8Path;

    fn resolve(obsid: &str) -> ResolveError {
        let roots = DataRoots::under(Utf8Path::new("/nonexistent"));
        HscGrismPipeline
            .resolve(&Request::new(Mission::HscGrism, obsid), &roots)
            .unwrap_err()
    }

    #[test]
    fn test_resolve_errors() {
        assert_eq!(resolve("hag_x_j8ff01kmq_g800l.spec2d.fits").errcode, 1);
        assert_eq!(resolve("hxx_x_j8ff01kmq_g800l.spec1d.fits").errcode, 2);
        assert_eq!(resolve("hag_x").errcode, 2);
        let missing = resolve("HAG_X_J8FF01KMQ_g800l.spec1d.fits");
        assert_eq!(missing.errcode, 3);
        assert_eq!(
            missing.detail,
            "/nonexistent/missions/hst/hla/data24/acsgrism/j8ff/j8ff01/hag_x_j8ff01kmq_g800l.spec1d.fits"
        );
    }
}

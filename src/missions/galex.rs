//! # GALEX grism spectra
//!
//! A GALEX request names the spectrum by obsid, band (`FUV` / `NUV` in the filter
//! field) and the URL of its preview image. The extracted spectrum sits next to the
//! preview tree: `<missions>/galex/<url path components [2:-3]>/SSAP/<obsid>.fits`.
//!
//! Error codes: 44 no preview URL, 4 band not FUV/NUV, 1 the preview is a 2D image,
//! 2 missing file, 3 read failure, 5 no finite flux.
use camino::Utf8Path;

use super::{ExtractCodes, ExtractError, MissionPipeline, RejectKind, ResolveError, ResolvedFileSet};
use crate::config::DataRoots;
use crate::constants::{UNIT_ANGSTROM, UNIT_FLUX_DENSITY};
use crate::data_series::{finite_points, DataSeries, Point, Precision};
use crate::fits::FitsFile;
use crate::mission::Mission;
use crate::request::Request;

const TWO_D_PREVIEW_SUFFIX: &str = "int_2color.jpg";

#[derive(Debug, Clone, Copy, Default)]
pub struct GalexPipeline;

/// First row of the `wave` and `flux` array columns of extension 1.
pub(crate) fn read_first_row_spectrum(path: &Utf8Path) -> Result<Vec<Point>, ExtractError> {
    let fits = FitsFile::open(path)?;
    let spectrum = fits.hdu(1)?;
    let first_row = |column: &str| -> Result<Vec<f64>, ExtractError> {
        spectrum
            .column_rows(column)?
            .into_iter()
            .next()
            .ok_or_else(|| ExtractError::Structure(format!("{column} column has no rows")))
    };
    let wave = first_row("wave")?;
    let flux = first_row("flux")?;
    Ok(finite_points(&wave, &flux, Precision::SPECTRUM))
}

impl MissionPipeline for GalexPipeline {
    fn mission(&self) -> Mission {
        Mission::Galex
    }

    fn resolve(&self, request: &Request, roots: &DataRoots) -> Result<ResolvedFileSet, ResolveError> {
        let url = request.url.trim();
        if url.is_empty() {
            return Err(ResolveError::new(44, RejectKind::Syntax, "no preview URL supplied"));
        }
        let band = request.filter.trim().to_uppercase();
        if band != "FUV" && band != "NUV" {
            return Err(ResolveError::invalid(4, format!("band {band:?} is not FUV or NUV")));
        }
        if url.ends_with(TWO_D_PREVIEW_SUFFIX) {
            return Err(ResolveError::new(1, RejectKind::Unsupported, "2D spectral image"));
        }

        let parts: Vec<&str> = url.split('/').collect();
        let inner = parts.get(2..parts.len().saturating_sub(3)).unwrap_or(&[]);
        let path = inner
            .iter()
            .fold(roots.missions.join("galex"), |dir, part| dir.join(part))
            .join("SSAP")
            .join(format!("{}.fits", request.obsid));
        if !path.is_file() {
            return Err(ResolveError::missing(2, &path));
        }
        Ok(ResolvedFileSet {
            file_tags: vec![band],
            ..ResolvedFileSet::single(path)
        })
    }

    fn extract(
        &self,
        request: &Request,
        resolved: &ResolvedFileSet,
    ) -> Result<Vec<DataSeries>, ExtractError> {
        let mut series = DataSeries::new(Mission::Galex.as_str(), &request.obsid);
        for path in &resolved.files {
            let points = read_first_row_spectrum(path)?;
            if points.is_empty() {
                return Err(ExtractError::NonFinite);
            }
            series.push(
                format!("GALEX_{} BAND:{}", request.obsid, request.filter.trim()),
                points,
                UNIT_ANGSTROM,
                UNIT_FLUX_DENSITY,
            );
        }
        Ok(vec![series])
    }

    fn extract_codes(&self) -> ExtractCodes {
        ExtractCodes {
            read: 3,
            structure: 3,
            non_finite: 5,
        }
    }
}

#[cfg(test)]
mod galex_test {
    use super::*;
    use crate::fits::writer::{FitsBuilder, TableColumn};
    use camino::Utf8PathBuf;

    const URL: &str = "http://galex.stsci.edu/data/GR6/pipe/02-vsn/50270-AIS_270/d/01-main/qa/AIS_270_sg35-xd-int_1d.jpg";

    #[test]
    fn test_rejections_need_no_io() {
        let roots = DataRoots::under(Utf8Path::new("/nonexistent"));
        let code = |filter: &str, url: &str| {
            let request = Request::new(Mission::Galex, "6381787619277195264")
                .with_filter(filter)
                .with_url(url);
            GalexPipeline.resolve(&request, &roots).unwrap_err().errcode
        };
        assert_eq!(code("FUV", " "), 44);
        assert_eq!(code("XUV", URL), 4);
        assert_eq!(code("nuv", "http://x/y/z/a/b/AIS_270_sg35-xd-int_2color.jpg"), 1);
        assert_eq!(code("FUV", URL), 2);
    }

    #[test]
    fn test_resolve_and_extract() {
        let tmp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).unwrap();
        let roots = DataRoots::under(&root);
        let dir = root.join("missions/galex/galex.stsci.edu/data/GR6/pipe/02-vsn/50270-AIS_270/d/SSAP");
        std::fs::create_dir_all(&dir).unwrap();
        FitsBuilder::new()
            .table(
                vec![],
                vec![
                    TableColumn::f64_rows("wave", vec![vec![1400.0, 1401.0, 1402.0]]),
                    TableColumn::f64_rows("flux", vec![vec![1.0e-15, f64::NAN, 3.0e-15]]),
                ],
            )
            .write(&dir.join("6381787619277195264.fits"))
            .unwrap();

        let request = Request::new(Mission::Galex, "6381787619277195264")
            .with_filter("FUV")
            .with_url(URL);
        let series = GalexPipeline.run(&request, &roots);
        assert_eq!(series[0].errcode, 0);
        assert_eq!(series[0].plot_labels, vec!["GALEX_6381787619277195264 BAND:FUV".to_string()]);
        assert_eq!(series[0].plot_series[0].len(), 2);
        assert_eq!(series[0].yunits, vec![UNIT_FLUX_DENSITY.to_string()]);
    }
}

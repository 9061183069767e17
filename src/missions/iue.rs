//! # IUE spectra
//!
//! Obsids are camera + image number (`swp12345`, `lwp01234`, `lwr05678`), matched
//! case-insensitively. The filter field picks the dispersion:
//!
//! | filter      | file read                                   |
//! |-------------|---------------------------------------------|
//! | `LOW_DISP`  | `.mxlo.gz`                                  |
//! | `HIGH_DISP` | `.mxhi.gz`                                  |
//! | `UNKNOWN`   | `.mxhi.gz` when archived, else `.mxlo.gz`   |
//!
//! A blank filter is read as `UNKNOWN`.
//!
//! Path: `<missions>/iue/data/<camera>/<obsid[3:5]>000/<obsid>.<mxlo|mxhi>.gz`
//!
//! Low-dispersion files hold one spectrum per aperture, each emitted as its own
//! curve. High-dispersion files hold echelle orders that are merged with
//! [`crate::echelle::combine_orders`].
//!
//! Error codes: 1 unknown camera prefix, 2 missing file, 3 read failure,
//! 4 unknown filter, 5 no usable flux.
use camino::Utf8Path;

use super::{ExtractCodes, ExtractError, MissionPipeline, ResolveError, ResolvedFileSet};
use crate::config::DataRoots;
use crate::constants::{UNIT_ANGSTROM_VACUUM_HELIO, UNIT_FLUX_DENSITY};
use crate::data_series::{DataSeries, Point, Precision};
use crate::echelle::{combine_orders, Camera, EchelleOrder};
use crate::fits::{FitsFile, Hdu};
use crate::mission::Mission;
use crate::request::Request;

const LOW_DISPERSION: &str = "mxlo";
const HIGH_DISPERSION: &str = "mxhi";

#[derive(Debug, Clone, Copy, Default)]
pub struct IuePipeline;

/// Evenly spaced wavelength grid `start + i * step`.
fn wavelength_grid(start: f64, step: f64, n_points: usize) -> Vec<f64> {
    (0..n_points).map(|i| start + i as f64 * step).collect()
}

/// Sort by wavelength and drop zero or non-finite fluxes.
fn usable_points(samples: impl IntoIterator<Item = (f64, f64)>) -> Vec<Point> {
    let mut points: Vec<Point> = samples
        .into_iter()
        .filter(|&(wl, fl)| wl.is_finite() && fl.is_finite() && fl != 0.0)
        .map(|(wl, fl)| Point::new(wl, fl).rounded(Precision::SPECTRUM))
        .collect();
    points.sort_by(|a, b| a.x.total_cmp(&b.x));
    points
}

fn count(value: f64, what: &str) -> Result<usize, ExtractError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value as usize)
    } else {
        Err(ExtractError::Structure(format!("{what} {value} is not a count")))
    }
}

/// One `(label suffix, points)` pair per aperture of an `.mxlo` file.
fn read_low_dispersion(path: &Utf8Path) -> Result<Vec<(String, Vec<Point>)>, ExtractError> {
    let fits = FitsFile::open(path)?;
    let dispersion = fits.primary_header()?.get_str("DISPTYPE")?;
    let spectra = fits.hdu(1)?;
    let apertures = spectra.column_str("APERTURE")?;
    let n_points = spectra.column_f64("NPOINTS")?;
    let starts = spectra.column_f64("WAVELENGTH")?;
    let steps = spectra.column_f64("DELTAW")?;
    let fluxes = spectra.column_rows("FLUX")?;

    let mut curves = Vec::new();
    for (row, aperture) in apertures.iter().enumerate() {
        let field = |values: &[f64], name: &str| {
            values
                .get(row)
                .copied()
                .ok_or_else(|| ExtractError::Structure(format!("{name} missing for row {row}")))
        };
        let wavelengths = wavelength_grid(
            field(&starts, "WAVELENGTH")?,
            field(&steps, "DELTAW")?,
            count(field(&n_points, "NPOINTS")?, "NPOINTS")?,
        );
        let flux = fluxes
            .get(row)
            .ok_or_else(|| ExtractError::Structure(format!("FLUX missing for row {row}")))?;
        let points = usable_points(wavelengths.into_iter().zip(flux.iter().copied()));
        if !points.is_empty() {
            curves.push((format!("DISP:{} APER:{}", dispersion.trim(), aperture.trim()), points));
        }
    }
    Ok(curves)
}

/// Echelle orders of an `.mxhi` file, fluxes cut out of the 768-pixel `ABS_CAL` rows.
fn read_echelle_orders(spectra: &Hdu) -> Result<Vec<EchelleOrder>, ExtractError> {
    let order_numbers = spectra.column_f64("ORDER")?;
    let n_points = spectra.column_f64("NPOINTS")?;
    let start_pixels = spectra.column_f64("STARTPIX")?;
    let starts = spectra.column_f64("WAVELENGTH")?;
    let steps = spectra.column_f64("DELTAW")?;
    let fluxes = spectra.column_rows("ABS_CAL")?;
    let quality = if spectra.table()?.has_column("QUALITY") {
        Some(spectra.column_rows("QUALITY")?)
    } else {
        None
    };

    let rows = [
        n_points.len(),
        start_pixels.len(),
        starts.len(),
        steps.len(),
        fluxes.len(),
    ];
    if rows.iter().any(|&n| n != order_numbers.len()) {
        return Err(ExtractError::Structure("echelle table columns differ in length".into()));
    }

    (0..order_numbers.len())
        .map(|row| -> Result<EchelleOrder, ExtractError> {
            let n = count(n_points[row], "NPOINTS")?;
            let first = count(start_pixels[row], "STARTPIX")?.saturating_sub(1);
            let window = first..first + n;
            let cut = |values: &[f64]| {
                values.get(window.clone()).map(<[f64]>::to_vec).ok_or_else(|| {
                    ExtractError::Structure(format!("order row {row} exceeds its pixel range"))
                })
            };
            let order = EchelleOrder::new(
                order_numbers[row] as i32,
                wavelength_grid(starts[row], steps[row], n),
                cut(&fluxes[row])?,
            );
            match quality.as_ref().and_then(|q| q.get(row)) {
                Some(flags) => Ok(order.with_quality(cut(flags)?)),
                None => Ok(order),
            }
        })
        .collect()
}

fn read_high_dispersion(path: &Utf8Path, camera: Camera) -> Result<(String, Vec<Point>), ExtractError> {
    let fits = FitsFile::open(path)?;
    let primary = fits.primary_header()?;
    let aperture = primary.get_str("APERTURE")?;
    let dispersion = primary.get_str("DISPTYPE")?;
    let orders = read_echelle_orders(fits.hdu(1)?)?;
    let points = usable_points(combine_orders(&orders, camera));
    Ok((format!("DISP:{} APER:{}", dispersion.trim(), aperture.trim()), points))
}

impl MissionPipeline for IuePipeline {
    fn mission(&self) -> Mission {
        Mission::Iue
    }

    fn resolve(&self, request: &Request, roots: &DataRoots) -> Result<ResolvedFileSet, ResolveError> {
        let obsid = request.obsid.trim().to_lowercase();
        let camera_dir = obsid
            .get(..3)
            .filter(|_| Camera::from_obsid(&obsid).is_some())
            .ok_or_else(|| ResolveError::syntax(1, "obsid must start with lwp, lwr or swp"))?;
        let shard = obsid
            .get(3..5)
            .ok_or_else(|| ResolveError::syntax(1, "obsid too short for an image number"))?;

        let dir = roots
            .missions
            .join("iue")
            .join("data")
            .join(camera_dir)
            .join(format!("{shard}000"));
        let product_path = |product: &str| dir.join(format!("{obsid}.{product}.gz"));

        let filter = request.filter.trim().to_uppercase();
        let product = match filter.as_str() {
            "LOW_DISP" => LOW_DISPERSION,
            "HIGH_DISP" => HIGH_DISPERSION,
            "UNKNOWN" | "" if product_path(HIGH_DISPERSION).is_file() => HIGH_DISPERSION,
            "UNKNOWN" | "" => LOW_DISPERSION,
            other => return Err(ResolveError::invalid(4, format!("unknown IUE filter {other}"))),
        };

        let path = product_path(product);
        if !path.is_file() {
            return Err(ResolveError::missing(2, &path));
        }
        Ok(ResolvedFileSet {
            target_id: obsid,
            file_tags: vec![product.to_string()],
            ..ResolvedFileSet::single(path)
        })
    }

    fn extract(
        &self,
        request: &Request,
        resolved: &ResolvedFileSet,
    ) -> Result<Vec<DataSeries>, ExtractError> {
        let mut series = DataSeries::new(Mission::Iue.as_str(), &request.obsid);
        let camera = Camera::from_obsid(&resolved.target_id)
            .ok_or_else(|| ExtractError::Structure("obsid names no IUE camera".into()))?;

        for (path, product) in resolved.files.iter().zip(&resolved.file_tags) {
            let curves = if product == HIGH_DISPERSION {
                vec![read_high_dispersion(path, camera)?]
            } else {
                read_low_dispersion(path)?
            };
            for (suffix, points) in curves.into_iter().filter(|(_, p)| !p.is_empty()) {
                series.push(
                    format!("IUE_{} {suffix}", request.obsid),
                    points,
                    UNIT_ANGSTROM_VACUUM_HELIO,
                    UNIT_FLUX_DENSITY,
                );
            }
        }
        if series.point_count() == 0 {
            return Err(ExtractError::NonFinite);
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
mod iue_test {
    use super::*;
    use crate::fits::header::HeaderValue;
    use crate::fits::writer::{FitsBuilder, TableColumn};
    use camino::Utf8PathBuf;

    fn scratch() -> (tempfile::TempDir, DataRoots, Utf8PathBuf) {
        let tmp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).unwrap();
        let dir = root.join("missions/iue/data/swp/12000");
        std::fs::create_dir_all(&dir).unwrap();
        (tmp, DataRoots::under(&root), dir)
    }

    fn write_mxlo(dir: &Utf8Path) {
        FitsBuilder::new()
            .primary_keyword("DISPTYPE", HeaderValue::Str("LOW".into()))
            .table(
                vec![],
                vec![
                    TableColumn::text("APERTURE", vec!["LARGE".into(), "SMALL".into()]),
                    TableColumn::i32("NPOINTS", vec![3, 3]),
                    TableColumn::f64("WAVELENGTH", vec![1150.0, 1150.0]),
                    TableColumn::f64("DELTAW", vec![1.5, 1.5]),
                    TableColumn::f32_rows(
                        "FLUX",
                        vec![vec![1.0e-13, 0.0, 3.0e-13], vec![0.0, 0.0, 0.0]],
                    ),
                ],
            )
            .write_gz(&dir.join("swp12345.mxlo.gz"))
            .unwrap();
    }

    fn write_mxhi(dir: &Utf8Path) {
        let order = |start: f64| -> Vec<f32> {
            let mut row = vec![0.0_f32; 768];
            for (i, v) in row.iter_mut().enumerate().skip(10).take(200) {
                *v = (start as f32) * 1.0e-16 + i as f32 * 1.0e-18;
            }
            row
        };
        FitsBuilder::new()
            .primary_keyword("DISPTYPE", HeaderValue::Str("HIGH".into()))
            .primary_keyword("APERTURE", HeaderValue::Str("LARGE".into()))
            .table(
                vec![],
                vec![
                    TableColumn::i32("ORDER", vec![100, 99]),
                    TableColumn::i32("NPOINTS", vec![200, 200]),
                    TableColumn::i32("STARTPIX", vec![11, 11]),
                    TableColumn::f64("WAVELENGTH", vec![1200.0, 1208.0]),
                    TableColumn::f64("DELTAW", vec![0.05, 0.05]),
                    TableColumn::f32_rows("ABS_CAL", vec![order(1200.0), order(1208.0)]),
                    TableColumn::i16_rows("QUALITY", vec![vec![0; 768], vec![0; 768]]),
                ],
            )
            .write_gz(&dir.join("swp12345.mxhi.gz"))
            .unwrap();
    }

    fn request(filter: &str) -> Request {
        Request::new(Mission::Iue, "SWP12345").with_filter(filter)
    }

    #[test]
    fn test_resolve_errors() {
        let (_tmp, roots, _) = scratch();
        let code = |obsid: &str, filter: &str| {
            IuePipeline
                .resolve(&Request::new(Mission::Iue, obsid).with_filter(filter), &roots)
                .unwrap_err()
                .errcode
        };
        assert_eq!(code("xyz12345", "LOW_DISP"), 1);
        assert_eq!(code("swp1", "LOW_DISP"), 1);
        assert_eq!(code("swp12345", "LOW_DISP"), 2);
        assert_eq!(code("swp12345", "MEDIUM"), 4);
    }

    #[test]
    fn test_unknown_filter_prefers_high_dispersion() {
        let (_tmp, roots, dir) = scratch();
        write_mxlo(&dir);
        let resolved = IuePipeline.resolve(&request("UNKNOWN"), &roots).unwrap();
        assert_eq!(resolved.file_tags, vec!["mxlo".to_string()]);

        write_mxhi(&dir);
        let resolved = IuePipeline.resolve(&request(" "), &roots).unwrap();
        assert_eq!(resolved.file_tags, vec!["mxhi".to_string()]);
    }

    #[test]
    fn test_low_dispersion_per_aperture() {
        let (_tmp, roots, dir) = scratch();
        write_mxlo(&dir);
        let series = IuePipeline.run(&request("LOW_DISP"), &roots);
        assert_eq!(series.len(), 1);
        let series = &series[0];
        assert_eq!(series.errcode, 0);
        // the SMALL aperture is all zero flux
        assert_eq!(series.plot_labels, vec!["IUE_SWP12345 DISP:LOW APER:LARGE".to_string()]);
        assert_eq!(series.plot_series[0].len(), 2);
        assert_eq!(series.plot_series[0][1].x, 1153.0);
        assert_eq!(series.xunits, vec![UNIT_ANGSTROM_VACUUM_HELIO.to_string()]);
    }

    #[test]
    fn test_high_dispersion_is_combined() {
        let (_tmp, roots, dir) = scratch();
        write_mxhi(&dir);
        let series = IuePipeline.run(&request("HIGH_DISP"), &roots);
        let series = &series[0];
        assert_eq!(series.errcode, 0);
        assert_eq!(series.plot_labels, vec!["IUE_SWP12345 DISP:HIGH APER:LARGE".to_string()]);
        let points = &series.plot_series[0];
        assert!(points.windows(2).all(|w| w[0].x <= w[1].x));
        assert!(points.first().unwrap().x >= 1200.0);
        assert!(points.last().unwrap().x <= 1208.0 + 199.0 * 0.05 + 1e-9);
    }

    #[test]
    fn test_corrupt_file_is_read_failure() {
        let (_tmp, roots, dir) = scratch();
        std::fs::write(dir.join("swp12345.mxlo.gz"), b"not a fits file").unwrap();
        let series = IuePipeline.run(&request("LOW_DISP"), &roots);
        assert_eq!(series[0].errcode, 3);
        assert!(series[0].plot_series.is_empty());
    }
}

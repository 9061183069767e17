//! POLAR: detrended curve in HDU 2 and detrended + filtered curve in HDU 1, both with
//! reduced Julian dates (`JD - 2400000`).
//!
//! Error codes: 4 unexpected HDU count, 5 read failure, 6 a curve with no finite rows.
use camino::Utf8Path;

use super::Curve;
use crate::constants::{REDUCED_JD_OFFSET, UNIT_NORMALIZED};
use crate::data_series::{finite_points, Point, Precision};
use crate::fits::FitsFile;
use crate::missions::{shift, ExtractError};

const POLAR_HDUS: usize = 3;

pub(super) fn read(path: &Utf8Path) -> Result<Vec<Curve>, ExtractError> {
    let fits = FitsFile::open(path)?;
    if fits.len() != POLAR_HDUS {
        return Err(ExtractError::Structure(format!(
            "expected {POLAR_HDUS} HDUs, found {}",
            fits.len()
        )));
    }
    let curve = |index: usize, time: &str, flux: &str| -> Result<Vec<Point>, ExtractError> {
        let hdu = fits.hdu(index)?;
        let jd = shift(hdu.column_f64(time)?, REDUCED_JD_OFFSET);
        let points = finite_points(&jd, &hdu.column_f64(flux)?, Precision::LIGHT_CURVE);
        if points.is_empty() {
            Err(ExtractError::NonFinite)
        } else {
            Ok(points)
        }
    };
    let detrended = curve(2, "DETTIME", "DETFLUX")?;
    let filtered = curve(1, "FILTIME", "FILFLUX")?;
    Ok(vec![
        Curve::new("Detrended", detrended, UNIT_NORMALIZED),
        Curve::new("Det.+Filtered", filtered, UNIT_NORMALIZED),
    ])
}

#[cfg(test)]
mod polar_test {
    use super::*;
    use crate::fits::writer::{FitsBuilder, TableColumn};
    use camino::Utf8PathBuf;

    fn write(path: &Utf8Path, detflux: Vec<f64>) {
        FitsBuilder::new()
            .table(
                vec![],
                vec![
                    TableColumn::f64("FILTIME", vec![57000.5]),
                    TableColumn::f64("FILFLUX", vec![1.0]),
                ],
            )
            .table(
                vec![],
                vec![
                    TableColumn::f64("DETTIME", vec![57000.5, 57000.52]),
                    TableColumn::f64("DETFLUX", detflux),
                ],
            )
            .write(path)
            .unwrap();
    }

    #[test]
    fn test_order_and_offset() {
        let tmp = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(tmp.path().join("polar.fits")).unwrap();
        write(&path, vec![0.99, 1.01]);
        let curves = read(&path).unwrap();
        assert_eq!(curves[0].suffix, "Detrended");
        assert_eq!(curves[0].points.len(), 2);
        assert_eq!(curves[1].suffix, "Det.+Filtered");
        assert_eq!(curves[1].points[0].x, 2457000.5);
    }

    #[test]
    fn test_empty_curve() {
        let tmp = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(tmp.path().join("polar.fits")).unwrap();
        write(&path, vec![f64::NAN, f64::NAN]);
        assert!(matches!(read(&path), Err(ExtractError::NonFinite)));
    }
}

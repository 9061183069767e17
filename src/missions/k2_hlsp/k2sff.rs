//! K2SFF: the best aperture plus twenty alternatives (HDUs 1 to 21), each with a raw
//! (`FRAW`) and a corrected (`FCOR`) curve. A product file has 25 HDUs.
//!
//! Error codes: 4 unexpected HDU count, 5 read failure, 6 no finite rows in any curve.
use camino::Utf8Path;

use super::Curve;
use crate::constants::UNIT_NORMALIZED;
use crate::data_series::{finite_points, Precision};
use crate::fits::FitsFile;
use crate::missions::{shift, ExtractError};

const K2SFF_HDUS: usize = 25;
const K2SFF_APERTURES: usize = 21;

pub(super) fn read(path: &Utf8Path) -> Result<Vec<Curve>, ExtractError> {
    let fits = FitsFile::open(path)?;
    if fits.len() != K2SFF_HDUS {
        return Err(ExtractError::Structure(format!(
            "expected {K2SFF_HDUS} HDUs, found {}",
            fits.len()
        )));
    }

    let mut curves = Vec::with_capacity(2 * K2SFF_APERTURES);
    for index in 1..=K2SFF_APERTURES {
        let hdu = fits.hdu(index)?;
        let header = hdu.header();
        let extname = header.get_str("EXTNAME")?;
        let bjd = shift(
            hdu.column_f64("T")?,
            header.get_f64("BJDREFF")? + header.get_f64("BJDREFI")?,
        );
        let raw = hdu.column_f64("FRAW")?;
        let corrected = hdu.column_f64("FCOR")?;
        let name = extname.trim();
        curves.push(Curve::new(
            format!("{name} Raw"),
            finite_points(&bjd, &raw, Precision::LIGHT_CURVE),
            UNIT_NORMALIZED,
        ));
        curves.push(Curve::new(
            format!("{name} Corrected"),
            finite_points(&bjd, &corrected, Precision::LIGHT_CURVE),
            UNIT_NORMALIZED,
        ));
    }

    if curves.iter().all(|curve| curve.points.is_empty()) {
        return Err(ExtractError::NonFinite);
    }
    Ok(curves)
}

#[cfg(test)]
mod k2sff_test {
    use super::*;
    use crate::fits::header::HeaderValue;
    use crate::fits::writer::{FitsBuilder, TableColumn};
    use camino::Utf8PathBuf;

    fn aperture(name: &str) -> (Vec<(String, HeaderValue)>, Vec<TableColumn>) {
        (
            vec![
                ("EXTNAME".to_string(), HeaderValue::Str(name.to_string())),
                ("BJDREFI".to_string(), HeaderValue::Int(2454833)),
                ("BJDREFF".to_string(), HeaderValue::Float(0.0)),
            ],
            vec![
                TableColumn::f64("T", vec![2000.0]),
                TableColumn::f64("FRAW", vec![0.999]),
                TableColumn::f64("FCOR", vec![1.0]),
            ],
        )
    }

    #[test]
    fn test_hdu_count() {
        let tmp = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(tmp.path().join("k2sff.fits")).unwrap();

        let (keywords, columns) = aperture("BESTAPER");
        FitsBuilder::new().table(keywords, columns).write(&path).unwrap();
        assert!(matches!(read(&path), Err(ExtractError::Structure(_))));

        let mut builder = FitsBuilder::new();
        for index in 0..K2SFF_HDUS - 1 {
            let (keywords, columns) = aperture(&format!("CIRC_APER{index}"));
            builder = builder.table(keywords, columns);
        }
        builder.write(&path).unwrap();
        let curves = read(&path).unwrap();
        assert_eq!(curves.len(), 2 * K2SFF_APERTURES);
        assert_eq!(curves[0].suffix, "CIRC_APER0 Raw");
        assert_eq!(curves[41].suffix, "CIRC_APER20 Corrected");
    }
}

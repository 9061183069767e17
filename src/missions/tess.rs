//! # TESS light curves
//!
//! Obsid grammar: `tess<stamp>-s<NNNN>-<tic>-<nnnn>-s`, e.g.
//! `tess2018206045859-s0001-0000000025155310-0120-s`, with a 16-digit zero-padded TIC id.
//!
//! Path: `<missions>/tess/tid/<sector>/<tic[0:4]>/<tic[4:8]>/<tic[8:12]>/<tic[12:16]>/<obsid>_lc.fits`
//!
//! Error codes: 1 malformed obsid, 2 missing file, 3 only a target pixel file exists,
//! 4 read failure, 5 no finite flux.
use once_cell::sync::Lazy;
use regex::Regex;

use super::{
    read_sap_pdcsap, split_obsid, ExtractCodes, ExtractError, MissionPipeline, RejectKind,
    ResolveError, ResolvedFileSet,
};
use crate::config::DataRoots;
use crate::constants::{UNIT_BJD, UNIT_ELECTRONS_PER_SECOND};
use crate::data_series::DataSeries;
use crate::mission::Mission;
use crate::request::Request;

static TESS_OBSID_SEPARATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new("_|-").expect("valid TESS obsid pattern"));

const TIC_DIGITS: usize = 16;

#[derive(Debug, Clone, Copy, Default)]
pub struct TessPipeline;

impl MissionPipeline for TessPipeline {
    fn mission(&self) -> Mission {
        Mission::Tess
    }

    fn resolve(&self, request: &Request, roots: &DataRoots) -> Result<ResolvedFileSet, ResolveError> {
        let obsid = request.obsid.as_str();
        let [_, sector, tic, _, _] = split_obsid::<5>(obsid, &TESS_OBSID_SEPARATORS)
            .ok_or_else(|| ResolveError::syntax(1, "expected tess<stamp>-s<NNNN>-<tic>-<nnnn>-s"))?;
        if tic.len() != TIC_DIGITS || !tic.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ResolveError::syntax(1, format!("TIC id {tic} is not 16 digits")));
        }
        let sector_number: u32 = sector
            .strip_prefix('s')
            .and_then(|n| n.parse().ok())
            .ok_or_else(|| ResolveError::syntax(1, format!("sector {sector} is malformed")))?;

        let target_dir = roots
            .missions
            .join("tess")
            .join("tid")
            .join(sector)
            .join(&tic[0..4])
            .join(&tic[4..8])
            .join(&tic[8..12])
            .join(&tic[12..16]);
        let lightcurve = target_dir.join(format!("{obsid}_lc.fits"));
        if !lightcurve.is_file() {
            let pixels = target_dir.join(format!("{obsid}_tp.fits"));
            return Err(if pixels.is_file() {
                ResolveError::new(3, RejectKind::Unsupported, "only a target pixel file is archived")
            } else {
                ResolveError::missing(2, &lightcurve)
            });
        }

        Ok(ResolvedFileSet {
            target_id: tic.trim_start_matches('0').to_string(),
            campaign: sector_number.to_string(),
            ..ResolvedFileSet::single(lightcurve)
        })
    }

    fn extract(
        &self,
        request: &Request,
        resolved: &ResolvedFileSet,
    ) -> Result<Vec<DataSeries>, ExtractError> {
        let mut series = DataSeries::new(Mission::Tess.as_str(), &request.obsid);
        let label = format!("TESS TIC {} Sector {}", resolved.target_id, resolved.campaign);
        for path in &resolved.files {
            let (sap, pdcsap) = read_sap_pdcsap(path)?;
            series.push(format!("{label} SAP"), sap, UNIT_BJD, UNIT_ELECTRONS_PER_SECOND);
            series.push(format!("{label} PDCSAP"), pdcsap, UNIT_BJD, UNIT_ELECTRONS_PER_SECOND);
        }
        if series.point_count() == 0 {
            return Err(ExtractError::NonFinite);
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
mod tess_test {
    use super::*;
    use crate::fits::header::HeaderValue;
    use crate::fits::writer::{FitsBuilder, TableColumn};
    use camino::Utf8PathBuf;

    const OBSID: &str = "tess2018206045859-s0001-0000000025155310-0120-s";

    fn target_dir(root: &Utf8PathBuf) -> Utf8PathBuf {
        root.join("missions/tess/tid/s0001/0000/0000/2515/5310")
    }

    #[test]
    fn test_resolve_and_extract() {
        let tmp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).unwrap();
        let roots = DataRoots::under(&root);
        let request = Request::new(Mission::Tess, OBSID);

        assert_eq!(TessPipeline.resolve(&request, &roots).unwrap_err().errcode, 2);

        let dir = target_dir(&root);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(format!("{OBSID}_tp.fits")), b"").unwrap();
        assert_eq!(TessPipeline.resolve(&request, &roots).unwrap_err().errcode, 3);

        FitsBuilder::new()
            .table(
                vec![
                    ("BJDREFI".into(), HeaderValue::Int(2457000)),
                    ("BJDREFF".into(), HeaderValue::Float(0.0)),
                ],
                vec![
                    TableColumn::f64("TIME", vec![1325.5, 1325.6, f64::NAN]),
                    TableColumn::f32("SAP_FLUX", vec![100.0, 101.0, 102.0]),
                    TableColumn::f32("PDCSAP_FLUX", vec![99.0, f32::NAN, 98.0]),
                ],
            )
            .write(&dir.join(format!("{OBSID}_lc.fits")))
            .unwrap();

        let series = TessPipeline.run(&request, &roots);
        assert_eq!(series.len(), 1);
        let series = &series[0];
        assert_eq!(series.errcode, 0);
        assert_eq!(
            series.plot_labels,
            vec![
                "TESS TIC 25155310 Sector 1 SAP".to_string(),
                "TESS TIC 25155310 Sector 1 PDCSAP".to_string()
            ]
        );
        assert_eq!(series.plot_series[0].len(), 2);
        assert_eq!(series.plot_series[1].len(), 1);
        assert_eq!(series.plot_series[0][0].x, 2458325.5);
    }

    #[test]
    fn test_malformed_obsid() {
        let roots = DataRoots::under(camino::Utf8Path::new("/nonexistent"));
        let request = Request::new(Mission::Tess, "tess2018206045859-s0001-123-0120");
        assert_eq!(TessPipeline.resolve(&request, &roots).unwrap_err().errcode, 1);
    }
}

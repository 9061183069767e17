//! # Kepler light curves
//!
//! Obsid grammar: `kplr<kepid>_<lc|sc>_Q<qcode>`, e.g. `kplr012644769_lc_Q111111111111111111`.
//!
//! * `kepid` must lie in `[757076, 100004300]`.
//! * `qcode` holds one digit per quarter (Q0 to Q17): the number of files expected
//!   for that quarter. The files present on disk for each quarter must match it exactly.
//!
//! Files live under `<missions>/kepler/lightcurves/<kepid[0:4]>/<kepid>/`.
//!
//! ## Error codes
//!
//! | code | meaning                                          |
//! |------|--------------------------------------------------|
//! | 1    | obsid does not split into three components       |
//! | 2    | Kepler ID out of bounds                          |
//! | 3    | cadence not `lc` / `sc`                          |
//! | 4    | qcode is not 18 digits                           |
//! | 5    | files on disk do not match the qcode             |
//! | 6    | a light-curve file could not be read             |
//! | 7    | no finite flux in any file                       |
//!
//! Short-cadence obsids are eligible for the precomputed response cache.
use camino::Utf8PathBuf;
use once_cell::sync::Lazy;
use regex::Regex;

use super::kepler_epochs::{LONG_CADENCE_EPOCHS, MONTH_LETTERS, N_QUARTERS, SHORT_CADENCE_EPOCHS};
use super::{
    read_sap_pdcsap, split_obsid, Cadence, ExtractCodes, ExtractError, MissionPipeline,
    RejectKind, ResolveError, ResolvedFileSet,
};
use crate::config::DataRoots;
use crate::constants::{UNIT_BJD, UNIT_ELECTRONS_PER_SECOND};
use crate::data_series::DataSeries;
use crate::mission::Mission;
use crate::request::Request;

pub const KEPLER_ID_MIN: u64 = 757_076;
pub const KEPLER_ID_MAX: u64 = 100_004_300;

static KEPLER_OBSID_SEPARATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new("_|kplr|q|Q").expect("valid Kepler obsid pattern"));

#[derive(Debug, Clone, Copy, Default)]
pub struct KeplerPipeline;

impl KeplerPipeline {
    fn star_dir(roots: &DataRoots, kepid: &str) -> Utf8PathBuf {
        roots
            .missions
            .join("kepler")
            .join("lightcurves")
            .join(&kepid[..4])
            .join(kepid)
    }
}

impl MissionPipeline for KeplerPipeline {
    fn mission(&self) -> Mission {
        Mission::Kepler
    }

    fn resolve(&self, request: &Request, roots: &DataRoots) -> Result<ResolvedFileSet, ResolveError> {
        let [kepid, cadence, qcode] = split_obsid::<3>(&request.obsid, &KEPLER_OBSID_SEPARATORS)
            .ok_or_else(|| ResolveError::syntax(1, "expected kplr<id>_<cadence>_Q<qcode>"))?;

        if !kepid.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ResolveError::syntax(1, format!("Kepler ID {kepid} is not numeric")));
        }
        let id: u64 = kepid
            .parse()
            .map_err(|_| ResolveError::syntax(1, format!("Kepler ID {kepid} is not numeric")))?;
        if !(KEPLER_ID_MIN..=KEPLER_ID_MAX).contains(&id) {
            return Err(ResolveError::invalid(2, format!("Kepler ID {id} out of bounds")));
        }

        let cadence = Cadence::parse(cadence)
            .ok_or_else(|| ResolveError::invalid(3, format!("unknown cadence {cadence}")))?;

        let expected: Vec<usize> = qcode
            .chars()
            .map(|c| c.to_digit(10).map(|d| d as usize))
            .collect::<Option<_>>()
            .filter(|digits: &Vec<usize>| digits.len() == N_QUARTERS)
            .ok_or_else(|| ResolveError::invalid(4, format!("qcode {qcode} is not 18 digits")))?;

        let star_dir = KeplerPipeline::star_dir(roots, kepid);
        let epochs = match cadence {
            Cadence::Long => &LONG_CADENCE_EPOCHS,
            Cadence::Short => &SHORT_CADENCE_EPOCHS,
        };

        let mut files = Vec::new();
        let mut file_tags = Vec::new();
        for (quarter, (&wanted, prefixes)) in expected.iter().zip(epochs.iter()).enumerate() {
            let found: Vec<Utf8PathBuf> = prefixes
                .iter()
                .map(|epoch| star_dir.join(format!("kplr{kepid}-{epoch}{}", cadence.file_suffix())))
                .filter(|path| path.is_file())
                .collect();
            if found.len() != wanted {
                return Err(ResolveError::new(
                    5,
                    RejectKind::FileCount,
                    format!("Q{quarter}: expected {wanted} files, found {}", found.len()),
                ));
            }
            for (month, _) in found.iter().enumerate() {
                file_tags.push(match cadence {
                    Cadence::Long => format!("{quarter:02}"),
                    Cadence::Short => format!("{quarter:02}{}", MONTH_LETTERS[month]),
                });
            }
            files.extend(found);
        }

        Ok(ResolvedFileSet {
            files,
            target_id: kepid.to_string(),
            campaign: String::new(),
            cadence: cadence.code().to_string(),
            file_tags,
        })
    }

    fn extract(
        &self,
        request: &Request,
        resolved: &ResolvedFileSet,
    ) -> Result<Vec<DataSeries>, ExtractError> {
        let mut series = DataSeries::new(Mission::Kepler.as_str(), &request.obsid);
        for (path, quarter) in resolved.files.iter().zip(&resolved.file_tags) {
            let (sap, pdcsap) = read_sap_pdcsap(path)?;
            let label = format!(
                "KPLR_{} {} Q{quarter}",
                resolved.target_id,
                resolved.cadence.to_uppercase()
            );
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
            read: 6,
            structure: 6,
            non_finite: 7,
        }
    }

    fn uses_cache(&self, obsid: &str) -> bool {
        obsid.contains("_sc_")
    }
}

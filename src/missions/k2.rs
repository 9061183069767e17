//! # K2 light curves
//!
//! Obsid grammar: `ktwo<epic>-c<NN>_<lc|sc>`, e.g. `ktwo201234567-c01_lc`.
//!
//! Campaign 10 was delivered in a single reprocessed file, so `c10` is read from
//! `c102`. The campaign directory drops the zero padding (`c01` lives in `c1/`).
//!
//! Path: `<missions>/k2/lightcurves/c<N>/<epic[0:4]>00000/<epic[4:6]>000/ktwo<epic>-<campaign>_<llc|slc>.fits`
//!
//! Error codes: 1 malformed obsid, 2 unknown cadence, 3 missing file, 4 read failure,
//! 5 no finite flux.
use once_cell::sync::Lazy;
use regex::Regex;

use super::{
    read_sap_pdcsap, require_file, split_obsid, Cadence, ExtractCodes, ExtractError,
    MissionPipeline, ResolveError, ResolvedFileSet,
};
use crate::config::DataRoots;
use crate::constants::{UNIT_BJD, UNIT_ELECTRONS_PER_SECOND};
use crate::data_series::DataSeries;
use crate::mission::Mission;
use crate::request::Request;

static K2_OBSID_SEPARATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new("ktwo|_|-").expect("valid K2 obsid pattern"));

#[derive(Debug, Clone, Copy, Default)]
pub struct K2Pipeline;

/// Campaign number of `cNN`, or `None` if the tag is not of that form.
pub(crate) fn campaign_number(campaign: &str) -> Option<u32> {
    campaign.strip_prefix('c')?.parse().ok()
}

/// `true` for an EPIC id long enough to be sharded into archive directories.
pub(crate) fn is_epic_id(id: &str) -> bool {
    id.len() >= 6 && id.bytes().all(|b| b.is_ascii_digit())
}

impl MissionPipeline for K2Pipeline {
    fn mission(&self) -> Mission {
        Mission::K2
    }

    fn resolve(&self, request: &Request, roots: &DataRoots) -> Result<ResolvedFileSet, ResolveError> {
        let [epic, campaign, cadence] = split_obsid::<3>(&request.obsid, &K2_OBSID_SEPARATORS)
            .ok_or_else(|| ResolveError::syntax(1, "expected ktwo<epic>-c<NN>_<cadence>"))?;
        if !is_epic_id(epic) {
            return Err(ResolveError::syntax(1, format!("EPIC id {epic} is malformed")));
        }
        let campaign = if campaign == "c10" { "c102" } else { campaign };
        let number = campaign_number(campaign)
            .ok_or_else(|| ResolveError::syntax(1, format!("campaign {campaign} is malformed")))?;
        let cadence = Cadence::parse(cadence)
            .ok_or_else(|| ResolveError::invalid(2, format!("unknown cadence {cadence}")))?;

        let path = roots
            .missions
            .join("k2")
            .join("lightcurves")
            .join(format!("c{number}"))
            .join(format!("{}00000", &epic[..4]))
            .join(format!("{}000", &epic[4..6]))
            .join(format!("ktwo{epic}-{campaign}{}", cadence.file_suffix()));

        Ok(ResolvedFileSet {
            target_id: epic.to_string(),
            campaign: campaign.to_string(),
            cadence: cadence.code().to_string(),
            ..ResolvedFileSet::single(require_file(path, 3)?)
        })
    }

    fn extract(
        &self,
        request: &Request,
        resolved: &ResolvedFileSet,
    ) -> Result<Vec<DataSeries>, ExtractError> {
        let mut series = DataSeries::new(Mission::K2.as_str(), &request.obsid);
        let label = format!("KTWO_{} {}", resolved.target_id, resolved.campaign.to_uppercase());
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

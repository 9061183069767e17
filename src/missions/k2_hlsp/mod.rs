//! # K2 community light curves (HLSPs)
//!
//! High-level science products re-reduce the K2 photometry. They share one obsid
//! grammar, `<prefix><epic>-c<NN>_lc`, and one resolver; only the file layout under the
//! HLSP root and the extraction differ per product.
//!
//! | mission         | product                                  | module        |
//! |-----------------|------------------------------------------|---------------|
//! | `hlsp_everest`  | EVEREST pixel-level decorrelation        | [`everest`]   |
//! | `hlsp_k2gap`    | K2 Galactic Archaeology (text table)     | [`k2gap`]     |
//! | `hlsp_kegs`     | Kepler Extragalactic Survey              | [`kegs`]      |
//! | `hlsp_polar`    | POLAR detrended / filtered               | [`polar`]     |
//! | `hlsp_k2sc`     | K2 systematics correction                | [`k2sc`]      |
//! | `hlsp_k2sff`    | self-flat-fielding, one curve per aperture | [`k2sff`]   |
//! | `hlsp_k2varcat` | K2 variable catalogue                    | [`k2varcat`]  |
//!
//! Resolver error codes are common to all products: 1 malformed obsid, 2 cadence other
//! than `lc`, 3 missing file. Extraction codes are listed in each module.
pub mod everest;
pub mod k2gap;
pub mod k2sc;
pub mod k2sff;
pub mod k2varcat;
pub mod kegs;
pub mod polar;

use camino::{Utf8Path, Utf8PathBuf};
use once_cell::sync::Lazy;
use regex::Regex;

use super::k2::is_epic_id;
use super::{
    require_file, split_obsid, ExtractCodes, ExtractError, MissionPipeline, ResolveError,
    ResolvedFileSet,
};
use crate::config::DataRoots;
use crate::constants::UNIT_BJD;
use crate::data_series::{DataSeries, Point};
use crate::mission::Mission;
use crate::request::Request;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HlspProduct {
    Everest,
    K2gap,
    Kegs,
    Polar,
    K2sc,
    K2sff,
    K2varcat,
}

/// One labelled light curve read from a product file.
#[derive(Debug, Clone, PartialEq)]
pub struct Curve {
    /// Appended to the `<TAG>_<epic> <CAMPAIGN>` prefix.
    pub suffix: String,
    pub points: Vec<Point>,
    pub yunit: &'static str,
}

impl Curve {
    pub fn new(suffix: impl Into<String>, points: Vec<Point>, yunit: &'static str) -> Self {
        Curve {
            suffix: suffix.into(),
            points,
            yunit,
        }
    }
}

impl HlspProduct {
    pub const ALL: [HlspProduct; 7] = [
        HlspProduct::Everest,
        HlspProduct::K2gap,
        HlspProduct::Kegs,
        HlspProduct::Polar,
        HlspProduct::K2sc,
        HlspProduct::K2sff,
        HlspProduct::K2varcat,
    ];

    pub fn mission(self) -> Mission {
        match self {
            HlspProduct::Everest => Mission::HlspEverest,
            HlspProduct::K2gap => Mission::HlspK2gap,
            HlspProduct::Kegs => Mission::HlspKegs,
            HlspProduct::Polar => Mission::HlspPolar,
            HlspProduct::K2sc => Mission::HlspK2sc,
            HlspProduct::K2sff => Mission::HlspK2sff,
            HlspProduct::K2varcat => Mission::HlspK2varcat,
        }
    }

    /// Obsid prefix, also the directory name under the HLSP root.
    pub fn prefix(self) -> &'static str {
        match self {
            HlspProduct::Everest => "everest",
            HlspProduct::K2gap => "k2gap",
            HlspProduct::Kegs => "kegs",
            HlspProduct::Polar => "polar",
            HlspProduct::K2sc => "k2sc",
            HlspProduct::K2sff => "k2sff",
            HlspProduct::K2varcat => "k2varcat",
        }
    }

    fn separators(self) -> &'static Regex {
        static SEPARATORS: Lazy<Vec<Regex>> = Lazy::new(|| {
            HlspProduct::ALL
                .iter()
                .map(|product| {
                    Regex::new(&format!("{}|_|-", product.prefix()))
                        .expect("valid HLSP obsid pattern")
                })
                .collect()
        });
        &SEPARATORS[self as usize]
    }

    /// Location of the product file relative to the HLSP root.
    pub fn relative_path(self, epic: &str, campaign: &str) -> Utf8PathBuf {
        let prefix = self.prefix();
        let base = Utf8Path::new(prefix);
        let (versioned, file_name) = match self {
            HlspProduct::Everest => (
                base.join("v2").join(campaign),
                format!("hlsp_everest_k2_llc_{epic}-{campaign}_kepler_v2.0_lc.fits"),
            ),
            HlspProduct::K2gap => (
                base.join(campaign),
                format!("hlsp_k2gap_k2_lightcurve_{epic}-{campaign}_kepler_v1_ts.txt"),
            ),
            HlspProduct::Kegs => (
                base.join("v2").join(campaign),
                format!("hlsp_kegs_k2_lightcurve_{epic}-{campaign}_kepler_v2_llc.fits"),
            ),
            HlspProduct::Polar => (
                base.join(campaign),
                format!("hlsp_polar_k2_lightcurve_{epic}-{campaign}_kepler_v1_llc.fits"),
            ),
            HlspProduct::K2sc => (
                base.join("v2").join(campaign),
                format!("hlsp_k2sc_k2_llc_{epic}-{campaign}_kepler_v2_lc.fits"),
            ),
            HlspProduct::K2sff => (
                base.join(campaign),
                format!("hlsp_k2sff_k2_lightcurve_{epic}-{campaign}_kepler_v1_llc.fits"),
            ),
            HlspProduct::K2varcat => (
                base.join(campaign),
                format!("hlsp_k2varcat_k2_lightcurve_{epic}-{campaign}_kepler_v2_llc.fits"),
            ),
        };
        let star_dir = versioned.join(format!("{}00000", &epic[..4]));
        let star_dir = match self {
            HlspProduct::K2sc => star_dir,
            HlspProduct::K2varcat => star_dir.join(format!("{}000", &epic[4..6])),
            _ => star_dir.join(&epic[4..]),
        };
        star_dir.join(file_name)
    }

    fn read(self, path: &Utf8Path) -> Result<Vec<Curve>, ExtractError> {
        match self {
            HlspProduct::Everest => everest::read(path),
            HlspProduct::K2gap => k2gap::read(path),
            HlspProduct::Kegs => kegs::read(path),
            HlspProduct::Polar => polar::read(path),
            HlspProduct::K2sc => k2sc::read(path),
            HlspProduct::K2sff => k2sff::read(path),
            HlspProduct::K2varcat => k2varcat::read(path),
        }
    }

    pub fn extract_codes(self) -> ExtractCodes {
        match self {
            HlspProduct::K2gap | HlspProduct::Kegs => ExtractCodes {
                read: 4,
                structure: 4,
                non_finite: 5,
            },
            HlspProduct::Everest
            | HlspProduct::Polar
            | HlspProduct::K2sc
            | HlspProduct::K2sff
            | HlspProduct::K2varcat => ExtractCodes {
                read: 5,
                structure: 4,
                non_finite: 6,
            },
        }
    }
}

/// Pipeline serving one HLSP product.
#[derive(Debug, Clone, Copy)]
pub struct HlspPipeline {
    product: HlspProduct,
}

impl HlspPipeline {
    pub fn new(product: HlspProduct) -> Self {
        HlspPipeline { product }
    }

    pub fn product(&self) -> HlspProduct {
        self.product
    }
}

impl MissionPipeline for HlspPipeline {
    fn mission(&self) -> Mission {
        self.product.mission()
    }

    fn resolve(&self, request: &Request, roots: &DataRoots) -> Result<ResolvedFileSet, ResolveError> {
        let prefix = self.product.prefix();
        let [epic, campaign, cadence] = split_obsid::<3>(&request.obsid, self.product.separators())
            .ok_or_else(|| ResolveError::syntax(1, format!("expected {prefix}<epic>-c<NN>_lc")))?;
        if !is_epic_id(epic) {
            return Err(ResolveError::syntax(1, format!("EPIC id {epic} is malformed")));
        }
        if cadence != "lc" {
            return Err(ResolveError::invalid(2, format!("cadence {cadence} is not lc")));
        }

        let path = roots.hlsps.join(self.product.relative_path(epic, campaign));
        Ok(ResolvedFileSet {
            target_id: epic.to_string(),
            campaign: campaign.to_string(),
            cadence: cadence.to_string(),
            ..ResolvedFileSet::single(require_file(path, 3)?)
        })
    }

    fn extract(
        &self,
        request: &Request,
        resolved: &ResolvedFileSet,
    ) -> Result<Vec<DataSeries>, ExtractError> {
        let mut series = DataSeries::new(self.mission().as_str(), &request.obsid);
        let label = format!(
            "{}_{} {}",
            self.product.prefix().to_uppercase(),
            resolved.target_id,
            resolved.campaign.to_uppercase()
        );
        for path in &resolved.files {
            for curve in self.product.read(path)? {
                let curve_label = if curve.suffix.is_empty() {
                    label.clone()
                } else {
                    format!("{label} {}", curve.suffix)
                };
                series.push(curve_label, curve.points, UNIT_BJD, curve.yunit);
            }
        }
        Ok(vec![series])
    }

    fn extract_codes(&self) -> ExtractCodes {
        self.product.extract_codes()
    }
}

//! # Mission tags
//!
//! Closed set of archive identifiers accepted by the delivery service. Every tag maps to
//! exactly one handler in the [`crate::registry::Registry`].
//!
//! Tags are parsed case-insensitively and always rendered in lower case, which is also the
//! form written to the `mission` field of each output series.

use std::fmt;
use std::str::FromStr;

use clap::builder::PossibleValue;
use clap::ValueEnum;

use crate::delivery_errors::DeliveryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Mission {
    Befs,
    Euve,
    Fuse,
    Galex,
    HlspEverest,
    HlspK2gap,
    HlspKegs,
    HlspPolar,
    HlspK2sc,
    HlspK2sff,
    HlspK2varcat,
    HscGrism,
    Hsla,
    Hst,
    Hut,
    Iue,
    K2,
    Kepler,
    States,
    Tess,
    Tues,
    Wuppe,
}

impl Mission {
    pub const ALL: [Mission; 22] = [
        Mission::Befs,
        Mission::Euve,
        Mission::Fuse,
        Mission::Galex,
        Mission::HlspEverest,
        Mission::HlspK2gap,
        Mission::HlspKegs,
        Mission::HlspPolar,
        Mission::HlspK2sc,
        Mission::HlspK2sff,
        Mission::HlspK2varcat,
        Mission::HscGrism,
        Mission::Hsla,
        Mission::Hst,
        Mission::Hut,
        Mission::Iue,
        Mission::K2,
        Mission::Kepler,
        Mission::States,
        Mission::Tess,
        Mission::Tues,
        Mission::Wuppe,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Mission::Befs => "befs",
            Mission::Euve => "euve",
            Mission::Fuse => "fuse",
            Mission::Galex => "galex",
            Mission::HlspEverest => "hlsp_everest",
            Mission::HlspK2gap => "hlsp_k2gap",
            Mission::HlspKegs => "hlsp_kegs",
            Mission::HlspPolar => "hlsp_polar",
            Mission::HlspK2sc => "hlsp_k2sc",
            Mission::HlspK2sff => "hlsp_k2sff",
            Mission::HlspK2varcat => "hlsp_k2varcat",
            Mission::HscGrism => "hsc_grism",
            Mission::Hsla => "hsla",
            Mission::Hst => "hst",
            Mission::Hut => "hut",
            Mission::Iue => "iue",
            Mission::K2 => "k2",
            Mission::Kepler => "kepler",
            Mission::States => "states",
            Mission::Tess => "tess",
            Mission::Tues => "tues",
            Mission::Wuppe => "wuppe",
        }
    }
}

impl fmt::Display for Mission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mission {
    type Err = DeliveryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim().to_ascii_lowercase();
        Mission::ALL
            .into_iter()
            .find(|mission| mission.as_str() == tag)
            .ok_or_else(|| DeliveryError::UnknownMission(s.to_string()))
    }
}

impl ValueEnum for Mission {
    fn value_variants<'a>() -> &'a [Self] {
        &Mission::ALL
    }

    fn to_possible_value(&self) -> Option<PossibleValue> {
        Some(PossibleValue::new(self.as_str()))
    }
}

#[cfg(test)]
mod mission_test {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("KEPLER".parse::<Mission>().unwrap(), Mission::Kepler);
        assert_eq!(" hlsp_K2SFF ".parse::<Mission>().unwrap(), Mission::HlspK2sff);
        assert_eq!("hsc_grism".parse::<Mission>().unwrap(), Mission::HscGrism);
    }

    #[test]
    fn test_unknown_tag() {
        let err = "spitzer".parse::<Mission>().unwrap_err();
        assert!(matches!(err, DeliveryError::UnknownMission(tag) if tag == "spitzer"));
    }

    #[test]
    fn test_tags_are_unique_and_roundtrip() {
        let mut tags: Vec<&str> = Mission::ALL.iter().map(|m| m.as_str()).collect();
        for mission in Mission::ALL {
            assert_eq!(mission.to_string().parse::<Mission>().unwrap(), mission);
        }
        tags.sort();
        tags.dedup();
        assert_eq!(tags.len(), Mission::ALL.len());
    }
}

use thiserror::Error;

use crate::mission::Mission;

/// Errors that abort a whole delivery.
///
/// Per-request problems (bad obsid, missing file, unreadable file, HTTP failure) never
/// show up here: they are reported in-band as a series with a non-zero `errcode`.
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("Both missions and obsids must be provided")]
    EmptyBatch,

    #[error("Number of {field} ({found}) does not match number of missions ({expected})")]
    LengthMismatch {
        field: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Unknown mission tag: {0}")]
    UnknownMission(String),

    #[error("No pipeline registered for mission: {0}")]
    UnregisteredMission(Mission),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unable to parse configuration file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Unable to perform file operation: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP reqwest error: {0}")]
    ReqwestError(#[from] reqwest::Error),
}

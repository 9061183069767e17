//! # Delivery configuration
//!
//! [`DeliveryConfig`] gathers every tunable of the service: where the archive trees live,
//! where cached Kepler short-cadence responses are stored, the response size cap, and the
//! HTTP settings of the legacy plot-data service.
//!
//! A configuration can be built in code, read from a TOML file, or assembled by the
//! command line (flags override file values).
//!
//! ```toml
//! data_dir = "/data"
//! hlsps_dir = "/data/hlsps"
//! max_response_chars = 64000000
//! request_timeout_secs = 30
//! max_concurrent_requests = 8
//! ```
//!
//! ## Directory defaults
//!
//! Unset roots are derived from `data_dir`:
//!
//! | root     | default                                        |
//! |----------|------------------------------------------------|
//! | missions | `<data_dir>/missions`                          |
//! | hlsps    | `<data_dir>/hlsps`                             |
//! | states   | `<data_dir>/states`                            |
//! | cache    | `<missions>/kepler/datadelivery_cache`         |

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;

use crate::constants::{DEFAULT_PLOT_SERVICE_URL, MAX_RESPONSE_CHARS};
use crate::delivery_errors::DeliveryError;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeliveryConfig {
    pub data_dir: Utf8PathBuf,
    pub missions_dir: Option<Utf8PathBuf>,
    pub hlsps_dir: Option<Utf8PathBuf>,
    pub states_dir: Option<Utf8PathBuf>,
    pub cache_dir: Option<Utf8PathBuf>,
    pub max_response_chars: usize,
    pub plot_service_url: String,
    pub request_timeout_secs: u64,
    pub max_concurrent_requests: usize,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        DeliveryConfig {
            data_dir: Utf8PathBuf::from("."),
            missions_dir: None,
            hlsps_dir: None,
            states_dir: None,
            cache_dir: None,
            max_response_chars: MAX_RESPONSE_CHARS,
            plot_service_url: DEFAULT_PLOT_SERVICE_URL.to_string(),
            request_timeout_secs: 30,
            max_concurrent_requests: 8,
        }
    }
}

/// Resolved directory roots handed to the mission pipelines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataRoots {
    pub missions: Utf8PathBuf,
    pub hlsps: Utf8PathBuf,
    pub states: Utf8PathBuf,
    pub cache: Utf8PathBuf,
}

impl DataRoots {
    /// All roots derived from a single data directory.
    pub fn under(data_dir: &Utf8Path) -> Self {
        DeliveryConfig {
            data_dir: data_dir.to_path_buf(),
            ..DeliveryConfig::default()
        }
        .roots()
    }
}

impl DeliveryConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, DeliveryError> {
        let config: DeliveryConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: &Utf8Path) -> Result<Self, DeliveryError> {
        let text = std::fs::read_to_string(path)?;
        DeliveryConfig::from_toml_str(&text)
    }

    /// Reject settings the orchestrator cannot run with.
    pub fn validate(&self) -> Result<(), DeliveryError> {
        if self.max_concurrent_requests == 0 {
            return Err(DeliveryError::InvalidConfig(
                "max_concurrent_requests must be at least 1".into(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(DeliveryError::InvalidConfig(
                "request_timeout_secs must be positive".into(),
            ));
        }
        if self.max_response_chars == 0 {
            return Err(DeliveryError::InvalidConfig(
                "max_response_chars must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn roots(&self) -> DataRoots {
        let missions = self
            .missions_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("missions"));
        let cache = self
            .cache_dir
            .clone()
            .unwrap_or_else(|| missions.join("kepler").join("datadelivery_cache"));
        DataRoots {
            hlsps: self
                .hlsps_dir
                .clone()
                .unwrap_or_else(|| self.data_dir.join("hlsps")),
            states: self
                .states_dir
                .clone()
                .unwrap_or_else(|| self.data_dir.join("states")),
            missions,
            cache,
        }
    }
}

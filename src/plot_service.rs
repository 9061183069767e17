//! # Legacy plot-data service
//!
//! Missions whose spectra are not stored locally are proxied to the archive's plot
//! service: `GET <plot_service_url>?<KEY>=<obsid>`. The service answers with a JSON
//! array of arrays, wavelengths first and fluxes second, each wrapped one level deep:
//!
//! ```text
//! [ [ [w0, w1, ...] ], [ [f0, f1, ...] ] ]
//! ```
//!
//! ## Missions
//!
//! | mission | key   | obsid sent   |
//! |---------|-------|--------------|
//! | befs    | BEFS  | upper case   |
//! | euve    | EUVE  | as given     |
//! | fuse    | FUSE  | upper case   |
//! | hst     | HST   | upper case   |
//! | hut     | HUT   | upper case   |
//! | tues    | TUES  | upper case   |
//! | wuppe   | WUPPE | lower case   |
//!
//! ## Error codes
//!
//! | code | meaning                                                  |
//! |------|----------------------------------------------------------|
//! | 1    | transport error, non-success status, timeout, bad JSON   |
//! | 2    | the service knows no such observation (empty answer)     |
//! | 3    | wavelength or flux list is empty                         |
//! | 4    | wavelength and flux lists differ in length               |
use reqwest::Url;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::constants::{UNIT_ANGSTROM, UNIT_FLUX_DENSITY};
use crate::data_series::{DataSeries, Point, Precision};
use crate::env_state::{DeliveryEnv, FetchError};
use crate::mission::Mission;
use crate::request::Request;

/// How the obsid is cased before it is sent to the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObsidCase {
    Upper,
    Lower,
    AsGiven,
}

impl ObsidCase {
    pub fn apply(self, obsid: &str) -> String {
        match self {
            ObsidCase::Upper => obsid.to_uppercase(),
            ObsidCase::Lower => obsid.to_lowercase(),
            ObsidCase::AsGiven => obsid.to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum PlotServiceError {
    #[error("plot service unreachable: {0}")]
    Fetch(#[from] FetchError),

    #[error("invalid plot service URL: {0}")]
    BadUrl(String),

    #[error("unexpected response layout: {0}")]
    Malformed(String),

    #[error("no data for this observation")]
    NotFound,

    #[error("empty wavelength or flux list")]
    EmptyArrays,

    #[error("{wavelengths} wavelengths for {fluxes} fluxes")]
    LengthMismatch { wavelengths: usize, fluxes: usize },
}

impl PlotServiceError {
    pub fn errcode(&self) -> i32 {
        match self {
            PlotServiceError::Fetch(_)
            | PlotServiceError::BadUrl(_)
            | PlotServiceError::Malformed(_) => 1,
            PlotServiceError::NotFound => 2,
            PlotServiceError::EmptyArrays => 3,
            PlotServiceError::LengthMismatch { .. } => 4,
        }
    }
}

/// How one mission is queried and how its answer is labelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlotServiceQuery {
    pub mission: Mission,
    pub key: &'static str,
    pub case: ObsidCase,
    pub flux_precision: Precision,
}

impl PlotServiceQuery {
    pub const fn new(mission: Mission, key: &'static str, case: ObsidCase) -> Self {
        PlotServiceQuery {
            mission,
            key,
            case,
            flux_precision: Precision::Exact,
        }
    }

    pub fn with_flux_precision(mut self, precision: Precision) -> Self {
        self.flux_precision = precision;
        self
    }

    /// The seven legacy missions served through the plot service.
    pub fn standard() -> [PlotServiceQuery; 7] {
        [
            PlotServiceQuery::new(Mission::Befs, "BEFS", ObsidCase::Upper),
            PlotServiceQuery::new(Mission::Euve, "EUVE", ObsidCase::AsGiven)
                .with_flux_precision(Precision::SPECTRUM),
            PlotServiceQuery::new(Mission::Fuse, "FUSE", ObsidCase::Upper),
            PlotServiceQuery::new(Mission::Hst, "HST", ObsidCase::Upper),
            PlotServiceQuery::new(Mission::Hut, "HUT", ObsidCase::Upper),
            PlotServiceQuery::new(Mission::Tues, "TUES", ObsidCase::Upper),
            PlotServiceQuery::new(Mission::Wuppe, "WUPPE", ObsidCase::Lower),
        ]
    }

    pub fn url(&self, base_url: &str, obsid: &str) -> Result<Url, PlotServiceError> {
        Url::parse_with_params(base_url, &[(self.key, self.case.apply(obsid))])
            .map_err(|err| PlotServiceError::BadUrl(err.to_string()))
    }

    /// Turn a decoded service answer into a series.
    ///
    /// Arguments
    /// -----------------
    /// * `obsid`: the obsid as requested, used for the label.
    /// * `body`: the decoded JSON answer.
    ///
    /// Return
    /// ----------
    /// * One series with a single curve sorted by wavelength, or the [`PlotServiceError`]
    ///   that selects the errcode.
    pub fn parse_response(&self, obsid: &str, body: &Value) -> Result<DataSeries, PlotServiceError> {
        let arrays = body
            .as_array()
            .ok_or_else(|| PlotServiceError::Malformed("answer is not an array".into()))?;
        let wavelength_block = arrays
            .first()
            .and_then(Value::as_array)
            .ok_or_else(|| PlotServiceError::Malformed("no wavelength block".into()))?;
        if wavelength_block.is_empty() {
            return Err(PlotServiceError::NotFound);
        }
        let wavelengths = numbers(wavelength_block.first())?;
        let fluxes = numbers(
            arrays
                .get(1)
                .and_then(Value::as_array)
                .and_then(|block| block.first()),
        )?;

        if wavelengths.is_empty() || fluxes.is_empty() {
            return Err(PlotServiceError::EmptyArrays);
        }
        if wavelengths.len() != fluxes.len() {
            return Err(PlotServiceError::LengthMismatch {
                wavelengths: wavelengths.len(),
                fluxes: fluxes.len(),
            });
        }

        let mut points: Vec<Point> = wavelengths
            .into_iter()
            .zip(fluxes)
            .map(|(x, y)| Point::new(x, self.flux_precision.apply(y)))
            .collect();
        points.sort_by(|a, b| a.x.total_cmp(&b.x));

        let mut series = DataSeries::new(self.mission.as_str(), obsid);
        series.push(
            format!("{}_{obsid}", self.key),
            points,
            UNIT_ANGSTROM,
            UNIT_FLUX_DENSITY,
        );
        Ok(series)
    }

    /// Query the service for one request; failures come back as a failed series.
    pub async fn fetch(&self, env: &DeliveryEnv, base_url: &str, request: &Request) -> DataSeries {
        self.try_fetch(env, base_url, &request.obsid)
            .await
            .unwrap_or_else(|err| {
                warn!(mission = %self.mission, obsid = %request.obsid, "plot service: {err}");
                DataSeries::failure(self.mission.as_str(), &request.obsid, err.errcode())
            })
    }

    async fn try_fetch(
        &self,
        env: &DeliveryEnv,
        base_url: &str,
        obsid: &str,
    ) -> Result<DataSeries, PlotServiceError> {
        let url = self.url(base_url, obsid)?;
        debug!(mission = %self.mission, %url, "querying plot service");
        let body = env.get_json(url).await?;
        self.parse_response(obsid, &body)
    }
}

/// Numbers of a JSON list, numeric strings included.
fn numbers(list: Option<&Value>) -> Result<Vec<f64>, PlotServiceError> {
    let Some(list) = list else {
        return Ok(Vec::new());
    };
    let values = list
        .as_array()
        .ok_or_else(|| PlotServiceError::Malformed("data block is not a list".into()))?;
    values
        .iter()
        .map(|value| match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
        .map(|value| value.ok_or_else(|| PlotServiceError::Malformed("non-numeric entry".into())))
        .collect()
}

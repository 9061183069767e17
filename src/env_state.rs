//! # Delivery environment state
//!
//! [`DeliveryEnv`] is the **shared environment object** handed to every network-bound
//! handler. It owns the HTTP client used to query the legacy plot-data service and the
//! time budget allotted to one query.
//!
//! The object is cheap to clone: [`reqwest::Client`] keeps its connection pool behind
//! an `Arc`, so clones share sockets.
//!
//! ## Structure
//!
//! ```text
//! DeliveryEnv
//! ├── http_client      (reqwest::Client)
//! └── request_timeout  (Duration)
//! ```
//!
//! ## See also
//!
//! - [`crate::plot_service`] – The only consumer of the HTTP client.
use std::time::Duration;

use reqwest::{Client, Url};

use crate::delivery_errors::DeliveryError;

/// Shared HTTP state.
///
/// # Fields
///
/// * `http_client` - A reqwest client used to make HTTP requests
/// * `request_timeout` - Upper bound on one request, connection and body included
#[derive(Debug, Clone)]
pub struct DeliveryEnv {
    pub http_client: Client,
    pub request_timeout: Duration,
}

impl DeliveryEnv {
    pub fn new(request_timeout: Duration) -> Result<Self, DeliveryError> {
        let http_client = Client::builder()
            .timeout(request_timeout)
            .user_agent(concat!("datadelivery/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(DeliveryEnv {
            http_client,
            request_timeout,
        })
    }

    /// GET a URL and decode its body as JSON, bounded by `request_timeout`.
    ///
    /// Arguments
    /// -----------------
    /// * `url`: the fully built request URL.
    ///
    /// Return
    /// ----------
    /// * The decoded body, or a [`FetchError`] telling apart timeouts, transport errors
    ///   and non-success HTTP status codes.
    pub async fn get_json(&self, url: Url) -> Result<serde_json::Value, FetchError> {
        let fetch = async {
            let response = self
                .http_client
                .get(url)
                .send()
                .await?
                .error_for_status()?;
            response.json::<serde_json::Value>().await
        };
        match tokio::time::timeout(self.request_timeout, fetch).await {
            Ok(result) => result.map_err(FetchError::from),
            Err(_) => Err(FetchError::Timeout(self.request_timeout)),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP reqwest error: {0}")]
    Http(#[from] reqwest::Error),
}

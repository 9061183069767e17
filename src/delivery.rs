//! # Batch delivery
//!
//! [`Delivery`] is the orchestrator: it takes a canonically ordered [`Batch`], serves
//! every request through the [`Registry`], and assembles one JSON document.
//!
//! ## Pipeline
//!
//! 1. Every mission of the batch must have a handler, otherwise the call fails with
//!    [`DeliveryError::UnregisteredMission`] before any I/O.
//! 2. **Cache fast path.** The first request (in canonical order) that its pipeline
//!    marks as cacheable and that has a cache entry short-circuits the whole batch:
//!    the cached text is returned verbatim, or replaced by the errcode-99 object of that
//!    request when it is larger than the response cap.
//! 3. Requests are served concurrently, at most `max_concurrent_requests` at a time.
//!    File-based pipelines run on tokio's blocking pool, plot-service queries are
//!    plain async I/O. Results are gathered back in canonical order.
//! 4. The flattened list of series is serialized. When the text is longer than
//!    `max_response_chars` characters it is replaced by a single errcode-99 series
//!    naming every mission and obsid of the batch.
//!
//! A panicking pipeline only fails its own request, reported with the mission's
//! read-failure errcode.
//!
//! ## Example
//!
//! ```no_run
//! use datadelivery::config::DeliveryConfig;
//! use datadelivery::delivery::Delivery;
//! use datadelivery::mission::Mission;
//! use datadelivery::request::Batch;
//!
//! let batch = Batch::new(
//!     vec![Mission::Tess],
//!     vec!["tess2018206045859-s0001-0000000025155310-0120-s".to_string()],
//!     None,
//!     None,
//!     None,
//! )?;
//! let delivery = Delivery::new(DeliveryConfig::default())?;
//! let json = delivery.deliver_blocking(&batch)?;
//! println!("{json}");
//! # Ok::<(), datadelivery::delivery_errors::DeliveryError>(())
//! ```
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::cache::CacheLayer;
use crate::config::{DataRoots, DeliveryConfig};
use crate::data_series::DataSeries;
use crate::delivery_errors::DeliveryError;
use crate::env_state::DeliveryEnv;
use crate::registry::{Handler, Registry};
use crate::request::{Batch, Request};

#[derive(Debug, Clone)]
pub struct Delivery {
    config: DeliveryConfig,
    roots: Arc<DataRoots>,
    registry: Arc<Registry>,
    cache: CacheLayer,
    env: DeliveryEnv,
}

impl Delivery {
    /// Orchestrator serving every mission with its standard handler.
    pub fn new(config: DeliveryConfig) -> Result<Self, DeliveryError> {
        Delivery::with_registry(config, Registry::standard())
    }

    pub fn with_registry(config: DeliveryConfig, registry: Registry) -> Result<Self, DeliveryError> {
        config.validate()?;
        let roots = config.roots();
        let cache = CacheLayer::new(roots.cache.clone());
        let env = DeliveryEnv::new(config.request_timeout())?;
        Ok(Delivery {
            config,
            roots: Arc::new(roots),
            registry: Arc::new(registry),
            cache,
            env,
        })
    }

    pub fn config(&self) -> &DeliveryConfig {
        &self.config
    }

    pub fn roots(&self) -> &DataRoots {
        &self.roots
    }

    pub fn cache(&self) -> &CacheLayer {
        &self.cache
    }

    /// Serve a batch and return the serialized response.
    ///
    /// Arguments
    /// -----------------
    /// * `batch`: the requests, already in canonical order.
    ///
    /// Return
    /// ----------
    /// * The JSON document (a list of series, or a cached response verbatim), or a
    ///   [`DeliveryError`] when the batch names a mission without handler.
    pub async fn deliver(&self, batch: &Batch) -> Result<String, DeliveryError> {
        let handlers = self.handlers(batch)?;
        info!(requests = batch.len(), "delivering batch");

        if let Some(cached) = self.cached_response(&handlers)? {
            return Ok(cached);
        }

        let series = self.serve(handlers).await;
        let response = serde_json::to_string(&series)?;
        if exceeds(&response, self.config.max_response_chars) {
            warn!(
                chars = response.chars().count(),
                cap = self.config.max_response_chars,
                "response too large, replacing it by the size-cap error"
            );
            return Ok(serde_json::to_string(&[DataSeries::too_big(
                batch.joined_missions(),
                batch.joined_obsids(),
            )])?);
        }
        Ok(response)
    }

    /// Serve a batch and return the series without serializing them.
    ///
    /// The cache and the size cap are not consulted.
    pub async fn collect(&self, batch: &Batch) -> Result<Vec<DataSeries>, DeliveryError> {
        let handlers = self.handlers(batch)?;
        Ok(self.serve(handlers).await)
    }

    /// [`Self::deliver`] on a runtime of its own, for synchronous callers.
    pub fn deliver_blocking(&self, batch: &Batch) -> Result<String, DeliveryError> {
        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(self.deliver(batch))
    }

    fn handlers<'a>(&self, batch: &'a Batch) -> Result<Vec<(&'a Request, Handler)>, DeliveryError> {
        batch
            .requests()
            .iter()
            .map(|request| {
                self.registry
                    .get(request.mission)
                    .map(|handler| (request, handler.clone()))
            })
            .collect()
    }

    fn cached_response(&self, handlers: &[(&Request, Handler)]) -> Result<Option<String>, DeliveryError> {
        for (request, handler) in handlers {
            let Handler::Archive(pipeline) = handler else {
                continue;
            };
            if !pipeline.uses_cache(&request.obsid) {
                continue;
            }
            let Some(cached) = self.cache.lookup(&request.obsid) else {
                continue;
            };
            info!(mission = %request.mission, obsid = %request.obsid, "serving cached response");
            if exceeds(&cached, self.config.max_response_chars) {
                let too_big = DataSeries::too_big(request.mission.as_str(), &request.obsid);
                return Ok(Some(serde_json::to_string(&[too_big])?));
            }
            return Ok(Some(cached));
        }
        Ok(None)
    }

    async fn serve(&self, handlers: Vec<(&Request, Handler)>) -> Vec<DataSeries> {
        let per_request: Vec<Vec<DataSeries>> = stream::iter(handlers)
            .map(|(request, handler)| self.dispatch(request.clone(), handler))
            .buffered(self.config.max_concurrent_requests)
            .collect()
            .await;
        per_request.into_iter().flatten().collect()
    }

    async fn dispatch(&self, request: Request, handler: Handler) -> Vec<DataSeries> {
        debug!(mission = %request.mission, obsid = %request.obsid, "dispatching");
        match handler {
            Handler::Archive(pipeline) => {
                let roots = Arc::clone(&self.roots);
                let mission = request.mission;
                let obsid = request.obsid.clone();
                let read_failure = pipeline.extract_codes().read;
                let job = tokio::task::spawn_blocking(move || pipeline.run(&request, &roots));
                match job.await {
                    Ok(series) => series,
                    Err(err) => {
                        warn!(%mission, %obsid, "pipeline aborted: {err}");
                        vec![DataSeries::failure(mission.as_str(), obsid, read_failure)]
                    }
                }
            }
            Handler::PlotService(query) => {
                vec![query.fetch(&self.env, &self.config.plot_service_url, &request).await]
            }
        }
    }
}

/// `true` when `text` holds more than `cap` characters.
fn exceeds(text: &str, cap: usize) -> bool {
    // byte length bounds the character count from above
    text.len() > cap && text.chars().count() > cap
}

/// Serve one batch with the standard handlers, blocking until the response is ready.
pub fn deliver_data(batch: &Batch, config: DeliveryConfig) -> Result<String, DeliveryError> {
    Delivery::new(config)?.deliver_blocking(batch)
}

#[cfg(test)]
mod delivery_test {
    use super::*;
    use crate::mission::Mission;
    use crate::missions::{ExtractCodes, ExtractError, MissionPipeline, ResolveError, ResolvedFileSet};
    use crate::data_series::Point;
    use camino::Utf8PathBuf;

    /// Pipeline answering from memory, or panicking on obsid "boom".
    #[derive(Debug)]
    struct EchoPipeline(Mission);

    impl MissionPipeline for EchoPipeline {
        fn mission(&self) -> Mission {
            self.0
        }

        fn resolve(&self, request: &Request, _roots: &DataRoots) -> Result<ResolvedFileSet, ResolveError> {
            match request.obsid.as_str() {
                "boom" => panic!("pipeline crashed"),
                "bad" => Err(ResolveError::syntax(1, "bad obsid")),
                _ => Ok(ResolvedFileSet::default()),
            }
        }

        fn extract(
            &self,
            request: &Request,
            _resolved: &ResolvedFileSet,
        ) -> Result<Vec<DataSeries>, ExtractError> {
            let mut series = DataSeries::new(self.0.as_str(), &request.obsid);
            series.push(
                format!("ECHO_{}", request.obsid),
                vec![Point::new(1.0, 2.0)],
                "x",
                "y",
            );
            Ok(vec![series])
        }

        fn extract_codes(&self) -> ExtractCodes {
            ExtractCodes::uniform(7)
        }

        fn uses_cache(&self, obsid: &str) -> bool {
            obsid.contains("_sc_")
        }
    }

    fn delivery(root: &Utf8PathBuf, max_response_chars: usize) -> Delivery {
        let mut registry = Registry::empty();
        registry
            .register_archive(EchoPipeline(Mission::Kepler))
            .register_archive(EchoPipeline(Mission::K2));
        let config = DeliveryConfig {
            data_dir: root.clone(),
            max_response_chars,
            ..DeliveryConfig::default()
        };
        Delivery::with_registry(config, registry).unwrap()
    }

    fn batch(missions: &[Mission], obsids: &[&str]) -> Batch {
        Batch::new(
            missions.to_vec(),
            obsids.iter().map(|s| s.to_string()).collect(),
            None,
            None,
            None,
        )
        .unwrap()
    }

    fn scratch() -> (tempfile::TempDir, Utf8PathBuf) {
        let tmp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).unwrap();
        (tmp, root)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_canonical_order_and_failures() {
        let (_tmp, root) = scratch();
        let delivery = delivery(&root, 1_000_000);
        let series = delivery
            .collect(&batch(&[Mission::Kepler, Mission::K2, Mission::Kepler], &["b", "bad", "a"]))
            .await
            .unwrap();
        let order: Vec<(&str, &str, i32)> = series
            .iter()
            .map(|s| (s.mission.as_str(), s.obsid.as_str(), s.errcode))
            .collect();
        assert_eq!(order, vec![("k2", "bad", 1), ("kepler", "a", 0), ("kepler", "b", 0)]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_panic_is_contained() {
        let (_tmp, root) = scratch();
        let delivery = delivery(&root, 1_000_000);
        let series = delivery
            .collect(&batch(&[Mission::Kepler, Mission::K2], &["boom", "fine"]))
            .await
            .unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].errcode, 0);
        assert_eq!((series[1].obsid.as_str(), series[1].errcode), ("boom", 7));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_unregistered_mission_fails_batch() {
        let (_tmp, root) = scratch();
        let delivery = delivery(&root, 1_000_000);
        let err = delivery
            .deliver(&batch(&[Mission::Kepler, Mission::Tess], &["a", "b"]))
            .await
            .unwrap_err();
        assert!(matches!(err, DeliveryError::UnregisteredMission(Mission::Tess)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_cache_short_circuit() {
        let (_tmp, root) = scratch();
        let delivery = delivery(&root, 1_000_000);
        let cached = r#"[{"errcode":0,"mission":"kepler","obsid":"cached"}]"#;
        delivery.cache().store("x_sc_2", cached).unwrap();

        let json = delivery
            .deliver(&batch(&[Mission::Kepler, Mission::Kepler], &["x_sc_2", "a"]))
            .await
            .unwrap();
        assert_eq!(json, cached);

        // cache entries of non-cacheable obsids are ignored
        delivery.cache().store("a", "stale").unwrap();
        let json = delivery
            .deliver(&batch(&[Mission::Kepler], &["a"]))
            .await
            .unwrap();
        assert_ne!(json, "stale");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_size_cap() {
        let (_tmp, root) = scratch();
        let delivery = delivery(&root, 40);
        let json = delivery
            .deliver(&batch(&[Mission::Kepler, Mission::K2], &["b", "a"]))
            .await
            .unwrap();
        let series: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(series.as_array().unwrap().len(), 1);
        assert_eq!(series[0]["errcode"], 99);
        assert_eq!(series[0]["mission"], "k2, kepler");
        assert_eq!(series[0]["obsid"], "a, b");
    }

    #[test]
    fn test_exceeds_counts_chars() {
        assert!(!exceeds("ééé", 3));
        assert!(exceeds("éééé", 3));
        assert!(!exceeds("abc", 3));
    }
}

//! # Delivery requests
//!
//! A [`Request`] names one observation to fetch; a [`Batch`] is the validated, canonically
//! ordered list of requests handed to the orchestrator.
//!
//! ## Canonical order
//!
//! Requests are processed in ascending lexicographic order of the key
//! `"<mission>-<obsid>-<filter>-<url>"`. Two requests with equal keys are ordered by
//! their target, so the output of a batch is fully determined by its contents and not
//! by the order in which the caller listed them.

use itertools::Itertools;

use crate::constants::BLANK_FIELD;
use crate::delivery_errors::DeliveryError;
use crate::mission::Mission;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub mission: Mission,
    pub obsid: String,
    pub filter: String,
    pub url: String,
    pub target: String,
}

impl Request {
    /// Request with blank filter, url and target.
    pub fn new(mission: Mission, obsid: impl Into<String>) -> Self {
        Request {
            mission,
            obsid: obsid.into(),
            filter: BLANK_FIELD.to_string(),
            url: BLANK_FIELD.to_string(),
            target: BLANK_FIELD.to_string(),
        }
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    /// Key used to order a batch, `"<mission>-<obsid>-<filter>-<url>"`.
    pub fn sort_key(&self) -> String {
        format!(
            "{}-{}-{}-{}",
            self.mission, self.obsid, self.filter, self.url
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    requests: Vec<Request>,
}

impl Batch {
    /// Build a batch from parallel lists, the way the command line hands them over.
    ///
    /// Arguments
    /// -----------------
    /// * `missions`: one mission tag per request.
    /// * `obsids`: one observation identifier per request.
    /// * `filters`, `urls`, `targets`: optional lists; an absent list is replaced by
    ///   blank placeholders.
    ///
    /// Return
    /// ----------
    /// * The batch in canonical order, or [`DeliveryError::EmptyBatch`] /
    ///   [`DeliveryError::LengthMismatch`] when the lists cannot be zipped together.
    pub fn new(
        missions: Vec<Mission>,
        obsids: Vec<String>,
        filters: Option<Vec<String>>,
        urls: Option<Vec<String>>,
        targets: Option<Vec<String>>,
    ) -> Result<Self, DeliveryError> {
        if missions.is_empty() || obsids.is_empty() {
            return Err(DeliveryError::EmptyBatch);
        }
        let expected = missions.len();
        let filters = fill_or_check("filters", filters, expected)?;
        let urls = fill_or_check("urls", urls, expected)?;
        let targets = fill_or_check("targets", targets, expected)?;
        let obsids = fill_or_check("obsids", Some(obsids), expected)?;

        let requests = missions
            .into_iter()
            .zip(obsids)
            .zip(filters)
            .zip(urls)
            .zip(targets)
            .map(|((((mission, obsid), filter), url), target)| Request {
                mission,
                obsid,
                filter,
                url,
                target,
            })
            .collect();
        Ok(Batch::from_requests(requests))
    }

    /// Put already-built requests into canonical order.
    pub fn from_requests(requests: Vec<Request>) -> Self {
        let requests = requests
            .into_iter()
            .sorted_by(|a, b| {
                a.sort_key()
                    .cmp(&b.sort_key())
                    .then_with(|| a.target.cmp(&b.target))
            })
            .collect();
        Batch { requests }
    }

    pub fn requests(&self) -> &[Request] {
        &self.requests
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// All mission tags in canonical order, joined by `", "`.
    pub fn joined_missions(&self) -> String {
        self.requests.iter().map(|r| r.mission.as_str()).join(", ")
    }

    /// All obsids in canonical order, joined by `", "`.
    pub fn joined_obsids(&self) -> String {
        self.requests.iter().map(|r| r.obsid.as_str()).join(", ")
    }
}

fn fill_or_check(
    field: &'static str,
    values: Option<Vec<String>>,
    expected: usize,
) -> Result<Vec<String>, DeliveryError> {
    match values {
        None => Ok(vec![BLANK_FIELD.to_string(); expected]),
        Some(values) if values.len() == expected => Ok(values),
        Some(values) => Err(DeliveryError::LengthMismatch {
            field,
            expected,
            found: values.len(),
        }),
    }
}

#[cfg(test)]
mod request_test {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_missing_lists_are_blank_filled() {
        let batch = Batch::new(
            vec![Mission::Kepler],
            strings(&["kplr012644769_lc_Q111111111111111111"]),
            None,
            None,
            None,
        )
        .unwrap();
        let request = &batch.requests()[0];
        assert_eq!(request.filter, " ");
        assert_eq!(request.url, " ");
        assert_eq!(request.target, " ");
    }

    #[test]
    fn test_length_mismatch_is_rejected() {
        let err = Batch::new(
            vec![Mission::Galex, Mission::Galex],
            strings(&["a", "b"]),
            Some(strings(&["FUV"])),
            None,
            None,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            DeliveryError::LengthMismatch {
                field: "filters",
                expected: 2,
                found: 1
            }
        ));

        let err = Batch::new(vec![Mission::Iue], strings(&["a", "b"]), None, None, None)
            .unwrap_err();
        assert!(matches!(err, DeliveryError::LengthMismatch { field: "obsids", .. }));
    }

    #[test]
    fn test_empty_batch_is_rejected() {
        assert!(matches!(
            Batch::new(vec![], vec![], None, None, None),
            Err(DeliveryError::EmptyBatch)
        ));
    }

    #[test]
    fn test_canonical_order_ignores_input_order() {
        let forward = Batch::new(
            vec![Mission::Tess, Mission::Iue, Mission::Iue],
            strings(&["tess-s0001", "swp05678", "lwp01234"]),
            None,
            None,
            Some(strings(&["t1", "t2", "t3"])),
        )
        .unwrap();
        let backward = Batch::new(
            vec![Mission::Iue, Mission::Iue, Mission::Tess],
            strings(&["lwp01234", "swp05678", "tess-s0001"]),
            None,
            None,
            Some(strings(&["t3", "t2", "t1"])),
        )
        .unwrap();
        assert_eq!(forward, backward);
        assert_eq!(forward.joined_missions(), "iue, iue, tess");
        assert_eq!(forward.joined_obsids(), "lwp01234, swp05678, tess-s0001");
    }

    #[test]
    fn test_equal_keys_are_ordered_by_target() {
        let batch = Batch::from_requests(vec![
            Request::new(Mission::Hsla, "hsla_coadd").with_target("ZETA"),
            Request::new(Mission::Hsla, "hsla_coadd").with_target("ALPHA"),
        ]);
        assert_eq!(batch.requests()[0].target, "ALPHA");
        assert_eq!(batch.requests()[1].target, "ZETA");
    }

    #[test]
    fn test_sort_key_layout() {
        let request = Request::new(Mission::Galex, "6381787619277195264")
            .with_filter("FUV")
            .with_url("http://x/y");
        assert_eq!(
            request.sort_key(),
            "galex-6381787619277195264-FUV-http://x/y"
        );
    }
}

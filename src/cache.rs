//! # Precomputed response cache
//!
//! Kepler short-cadence requests read dozens of monthly files, so their full responses
//! are serialized ahead of time into `<cache_dir>/<obsid>.cache`. The first line of a
//! cache file is the complete JSON response, returned verbatim on a hit.
//!
//! A missing file is a miss. An existing file that cannot be read is logged and also
//! treated as a miss so the request falls back to extraction.
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind, Write};

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, warn};

use crate::delivery_errors::DeliveryError;

pub const CACHE_EXTENSION: &str = "cache";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheLayer {
    dir: Utf8PathBuf,
}

impl CacheLayer {
    pub fn new(dir: impl Into<Utf8PathBuf>) -> Self {
        CacheLayer { dir: dir.into() }
    }

    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }

    /// Cache file of `obsid`, or `None` when the obsid could escape the cache directory.
    pub fn cache_path(&self, obsid: &str) -> Option<Utf8PathBuf> {
        let obsid = obsid.trim();
        if obsid.is_empty() || obsid.contains(['/', '\\']) || obsid.contains("..") {
            return None;
        }
        Some(self.dir.join(format!("{obsid}.{CACHE_EXTENSION}")))
    }

    /// The cached response of `obsid`, without its line terminator.
    pub fn lookup(&self, obsid: &str) -> Option<String> {
        let path = self.cache_path(obsid)?;
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => return None,
            Err(err) => {
                warn!(%path, "cache file unreadable, extracting instead: {err}");
                return None;
            }
        };

        let mut line = String::new();
        match BufReader::new(file).read_line(&mut line) {
            Ok(_) => {
                let response = line.trim_end_matches(['\n', '\r']);
                debug!(%path, chars = response.chars().count(), "cache hit");
                Some(response.to_string())
            }
            Err(err) => {
                warn!(%path, "cache file unreadable, extracting instead: {err}");
                None
            }
        }
    }

    /// Write a serialized response as the cache entry of `obsid`.
    pub fn store(&self, obsid: &str, response: &str) -> Result<Utf8PathBuf, DeliveryError> {
        let path = self.cache_path(obsid).ok_or_else(|| {
            DeliveryError::InvalidConfig(format!("{obsid:?} cannot name a cache file"))
        })?;
        std::fs::create_dir_all(&self.dir)?;
        let mut file = File::create(&path)?;
        file.write_all(response.as_bytes())?;
        file.write_all(b"\n")?;
        Ok(path)
    }
}

//! # Output series
//!
//! Every request yields one or more [`DataSeries`]. A series bundles, for a single
//! observation, an error code and parallel lists of labels, point lists and axis units.
//! The JSON produced by the orchestrator is a list of these objects.
//!
//! ## Serialized form
//!
//! ```text
//! {"errcode":0,"is_ancillary":[0,1],"mission":"hsla","obsid":"...",
//!  "plot_labels":[...],"plot_series":[[{"x":..,"y":..},..],..],
//!  "xunits":[...],"yunits":[...]}
//! ```
//!
//! Fields are declared in alphabetical order so the serialized keys come out sorted.
//! `is_ancillary` is omitted entirely for missions that do not flag ancillary series;
//! `xerr` / `yerr` are omitted on points without uncertainties.
//!
//! ## Invariants
//!
//! * `plot_labels`, `plot_series`, `xunits` and `yunits` always have the same length.
//! * `errcode == 0` for a series that carries points; a failed series carries none.

use serde::Serialize;

use crate::constants::{LIGHT_CURVE_DECIMALS, SPECTRUM_SIGNIFICANT_DIGITS, TOO_BIG_ERRCODE};

/// One sample of a light curve or spectrum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xerr: Option<f64>,
    pub y: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yerr: Option<f64>,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point {
            x,
            xerr: None,
            y,
            yerr: None,
        }
    }

    pub fn with_errors(x: f64, xerr: f64, y: f64, yerr: f64) -> Self {
        Point {
            x,
            xerr: Some(xerr),
            y,
            yerr: Some(yerr),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.xerr.map_or(true, f64::is_finite)
            && self.yerr.map_or(true, f64::is_finite)
    }

    pub fn rounded(self, precision: Precision) -> Self {
        Point {
            x: precision.apply(self.x),
            xerr: self.xerr.map(|v| precision.apply(v)),
            y: precision.apply(self.y),
            yerr: self.yerr.map(|v| precision.apply(v)),
        }
    }
}

/// Rounding applied to emitted values to keep the JSON compact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    /// Fixed number of decimal places.
    Decimals(usize),
    /// Scientific notation with the given number of mantissa digits after the point.
    Scientific(usize),
    /// Values are emitted unchanged.
    Exact,
}

impl Precision {
    pub const LIGHT_CURVE: Precision = Precision::Decimals(LIGHT_CURVE_DECIMALS);
    pub const SPECTRUM: Precision = Precision::Scientific(SPECTRUM_SIGNIFICANT_DIGITS);

    pub fn apply(self, value: f64) -> f64 {
        if !value.is_finite() {
            return value;
        }
        let text = match self {
            Precision::Decimals(places) => format!("{value:.places$}"),
            Precision::Scientific(digits) => format!("{value:.digits$e}"),
            Precision::Exact => return value,
        };
        text.parse().unwrap_or(value)
    }
}

/// Zip two columns into points, dropping any pair with a non-finite member.
pub fn finite_points(xs: &[f64], ys: &[f64], precision: Precision) -> Vec<Point> {
    xs.iter()
        .zip(ys)
        .map(|(&x, &y)| Point::new(x, y))
        .filter(Point::is_finite)
        .map(|p| p.rounded(precision))
        .collect()
}

/// Same as [`finite_points`] but keeps the points' own uncertainties.
pub fn finite_points_with_errors(points: Vec<Point>, precision: Precision) -> Vec<Point> {
    points
        .into_iter()
        .filter(Point::is_finite)
        .map(|p| p.rounded(precision))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataSeries {
    pub errcode: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_ancillary: Option<Vec<u8>>,
    pub mission: String,
    pub obsid: String,
    pub plot_labels: Vec<String>,
    pub plot_series: Vec<Vec<Point>>,
    pub xunits: Vec<String>,
    pub yunits: Vec<String>,
}

impl DataSeries {
    /// Empty, successful series to be filled with [`Self::push`].
    pub fn new(mission: impl Into<String>, obsid: impl Into<String>) -> Self {
        DataSeries {
            errcode: 0,
            is_ancillary: None,
            mission: mission.into(),
            obsid: obsid.into(),
            plot_labels: Vec::new(),
            plot_series: Vec::new(),
            xunits: Vec::new(),
            yunits: Vec::new(),
        }
    }

    /// Series reporting a failed request: non-zero errcode and no points.
    pub fn failure(mission: impl Into<String>, obsid: impl Into<String>, errcode: i32) -> Self {
        DataSeries {
            errcode,
            ..DataSeries::new(mission, obsid)
        }
    }

    /// Series replacing a response that exceeded the size cap.
    pub fn too_big(mission: impl Into<String>, obsid: impl Into<String>) -> Self {
        DataSeries::failure(mission, obsid, TOO_BIG_ERRCODE)
    }

    /// Append one labelled point list with its axis units, keeping the lists parallel.
    pub fn push(&mut self, label: impl Into<String>, points: Vec<Point>, xunit: &str, yunit: &str) {
        self.plot_labels.push(label.into());
        self.plot_series.push(points);
        self.xunits.push(xunit.to_string());
        self.yunits.push(yunit.to_string());
    }

    /// Same as [`Self::push`] and records the ancillary flag of the new entry.
    pub fn push_flagged(
        &mut self,
        label: impl Into<String>,
        points: Vec<Point>,
        xunit: &str,
        yunit: &str,
        ancillary: bool,
    ) {
        self.push(label, points, xunit, yunit);
        self.is_ancillary
            .get_or_insert_with(Vec::new)
            .push(u8::from(ancillary));
    }

    pub fn is_success(&self) -> bool {
        self.errcode == 0
    }

    /// Total number of points across every entry.
    pub fn point_count(&self) -> usize {
        self.plot_series.iter().map(Vec::len).sum()
    }
}

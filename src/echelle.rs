//! # Echelle order combination and resampling
//!
//! High-dispersion IUE spectra come as a stack of overlapping echelle orders. This module
//! turns them into one continuous, evenly resampled spectrum.
//!
//! ## Algorithm
//!
//! 1. **Quality filter** – points whose quality flag is at or below
//!    [`BAD_QUALITY_THRESHOLD`] are dropped; orders left empty, or whose flux is zero
//!    everywhere, are discarded.
//! 2. **Overlap trim** – for each consecutive pair `(current, next)`, in the order the
//!    orders are listed, a cut wavelength is placed at
//!    `next.start + f * (current.end - next.start)`, where `f` depends on the camera
//!    (see [`Camera::cut_fraction`]). `current` keeps the points at or below the cut,
//!    `next` keeps the points above it.
//! 3. **Merge** – the surviving points of all orders are concatenated and sorted by
//!    wavelength.
//! 4. **Gap split** – the merged spectrum is cut wherever two neighbours are further
//!    apart than [`GAP_FACTOR`] times the mean spacing.
//! 5. **Resample** – every subsection is linearly interpolated onto a fine grid with
//!    [`OVERSAMPLING`] points per output bin, the grid size being picked so the fine
//!    step is as close as possible to `target_step / OVERSAMPLING`.
//! 6. **Decimate** – consecutive groups of [`OVERSAMPLING`] fine points are averaged
//!    into one output point.
//!
//! Subsections with fewer than two points, or spanning no wavelength range, are passed
//! through unchanged.
//!
//! ## Guarantees
//!
//! * Output wavelengths are non-decreasing.
//! * Every output wavelength lies inside the range of the input points that survived
//!   the quality filter.
//!
//! ## See also
//! ------------
//! * [`crate::missions::iue`] – Reads the `.mxhi` orders fed to [`combine_orders`].
use itertools::Itertools;

use crate::constants::Angstrom;

/// Points flagged at or below this quality are discarded.
pub const BAD_QUALITY_THRESHOLD: f64 = -1024.0;

/// Fine-grid points per output bin.
pub const OVERSAMPLING: usize = 10;

/// A spacing larger than this multiple of the mean spacing starts a new subsection.
pub const GAP_FACTOR: f64 = 3.0;

/// `(wavelength, flux)`
pub type Sample = (Angstrom, f64);

/// IUE camera family, read from the first three characters of the obsid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Camera {
    Swp,
    Lwp,
    Lwr,
}

impl Camera {
    pub fn from_obsid(obsid: &str) -> Option<Self> {
        match obsid.get(..3)?.to_ascii_lowercase().as_str() {
            "swp" => Some(Camera::Swp),
            "lwp" => Some(Camera::Lwp),
            "lwr" => Some(Camera::Lwr),
            _ => None,
        }
    }

    /// Position of the overlap cut between `next.start` (0) and `current.end` (1).
    pub fn cut_fraction(self) -> f64 {
        match self {
            Camera::Swp => 2.0 / 3.0,
            Camera::Lwp | Camera::Lwr => 1.0 / 3.0,
        }
    }

    /// Output bin width in Angstroms.
    pub fn target_step(self) -> Angstrom {
        match self {
            Camera::Swp => 0.05,
            Camera::Lwp | Camera::Lwr => 0.10,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EchelleOrder {
    pub order_number: i32,
    pub wavelengths: Vec<Angstrom>,
    pub fluxes: Vec<f64>,
    pub quality: Vec<f64>,
}

impl EchelleOrder {
    /// Order with every point flagged good.
    pub fn new(order_number: i32, wavelengths: Vec<Angstrom>, fluxes: Vec<f64>) -> Self {
        let quality = vec![0.0; wavelengths.len()];
        EchelleOrder {
            order_number,
            wavelengths,
            fluxes,
            quality,
        }
    }

    pub fn with_quality(mut self, quality: Vec<f64>) -> Self {
        self.quality = quality;
        self
    }

    /// Good points sorted by wavelength, or `None` if nothing usable is left.
    fn good_samples(&self) -> Option<Vec<Sample>> {
        let samples: Vec<Sample> = self
            .wavelengths
            .iter()
            .zip(&self.fluxes)
            .zip(self.quality.iter().chain(std::iter::repeat(&0.0)))
            .filter(|((wl, fl), q)| **q > BAD_QUALITY_THRESHOLD && wl.is_finite() && fl.is_finite())
            .map(|((&wl, &fl), _)| (wl, fl))
            .sorted_by(|a, b| a.0.total_cmp(&b.0))
            .collect();
        if samples.is_empty() || samples.iter().all(|&(_, fl)| fl == 0.0) {
            None
        } else {
            Some(samples)
        }
    }
}

/// Combine overlapping echelle orders into one resampled spectrum.
///
/// Arguments
/// -----------------
/// * `orders`: the orders in file order (usually by decreasing order number).
/// * `camera`: selects the overlap cut fraction and the output bin width.
///
/// Return
/// ----------
/// * The resampled `(wavelength, flux)` samples sorted by wavelength; empty when no
///   order survives the quality filter.
pub fn combine_orders(orders: &[EchelleOrder], camera: Camera) -> Vec<Sample> {
    let mut kept: Vec<Vec<Sample>> = orders.iter().filter_map(EchelleOrder::good_samples).collect();
    trim_overlaps(&mut kept, camera.cut_fraction());

    let merged: Vec<Sample> = kept
        .into_iter()
        .flatten()
        .sorted_by(|a, b| a.0.total_cmp(&b.0))
        .collect();

    split_at_gaps(&merged)
        .into_iter()
        .flat_map(|section| resample_section(section, camera.target_step()))
        .collect()
}

/// Drop the overlapping ends of consecutive orders.
pub fn trim_overlaps(orders: &mut [Vec<Sample>], fraction: f64) {
    for i in 1..orders.len() {
        let (head, tail) = orders.split_at_mut(i);
        let (current, next) = (&mut head[i - 1], &mut tail[0]);
        let (Some(&(current_end, _)), Some(&(next_start, _))) = (current.last(), next.first())
        else {
            continue;
        };
        let cut = next_start + fraction * (current_end - next_start);
        current.retain(|&(wl, _)| wl <= cut);
        next.retain(|&(wl, _)| wl > cut);
    }
}

/// Split sorted samples wherever the spacing exceeds [`GAP_FACTOR`] times the mean.
pub fn split_at_gaps(samples: &[Sample]) -> Vec<&[Sample]> {
    if samples.len() < 2 {
        return vec![samples];
    }
    let span = samples[samples.len() - 1].0 - samples[0].0;
    let mean_step = span / (samples.len() - 1) as f64;
    if mean_step <= 0.0 {
        return vec![samples];
    }

    let mut sections = Vec::new();
    let mut start = 0;
    for i in 1..samples.len() {
        if samples[i].0 - samples[i - 1].0 > GAP_FACTOR * mean_step {
            sections.push(&samples[start..i]);
            start = i;
        }
    }
    sections.push(&samples[start..]);
    sections
}

/// Resample one gap-free subsection to bins of about `target_step`.
pub fn resample_section(section: &[Sample], target_step: Angstrom) -> Vec<Sample> {
    let (Some(&(first, _)), Some(&(last, _))) = (section.first(), section.last()) else {
        return Vec::new();
    };
    let range = last - first;
    if section.len() < 2 || range <= 0.0 || target_step <= 0.0 {
        return section.to_vec();
    }

    let bins = grid_bins(range, target_step);
    let fine_len = bins * OVERSAMPLING;
    let fine_step = range / (fine_len - 1) as f64;
    let grid: Vec<Angstrom> = (0..fine_len)
        .map(|i| {
            if i + 1 == fine_len {
                last
            } else {
                first + fine_step * i as f64
            }
        })
        .collect();
    let fluxes = interpolate(section, &grid);

    grid.chunks(OVERSAMPLING)
        .zip(fluxes.chunks(OVERSAMPLING))
        .map(|(wl, fl)| (mean(wl), mean(fl)))
        .collect()
}

/// Number of output bins whose fine step best matches `target_step / OVERSAMPLING`.
fn grid_bins(range: Angstrom, target_step: Angstrom) -> usize {
    let n = (range / target_step).ceil().max(1.0) as usize;
    let ideal = target_step / OVERSAMPLING as f64;
    [n.saturating_sub(1), n, n + 1]
        .into_iter()
        .filter(|&m| m >= 1)
        .min_by(|&a, &b| {
            let step = |m: usize| range / (m * OVERSAMPLING - 1) as f64;
            (step(a) - ideal).abs().total_cmp(&(step(b) - ideal).abs())
        })
        .unwrap_or(1)
}

/// Linear interpolation of sorted `samples` at each (sorted) `grid` wavelength.
fn interpolate(samples: &[Sample], grid: &[Angstrom]) -> Vec<f64> {
    let mut j = 0;
    grid.iter()
        .map(|&x| {
            while j + 2 < samples.len() && samples[j + 1].0 < x {
                j += 1;
            }
            let (x0, y0) = samples[j];
            let (x1, y1) = samples[j + 1];
            if x1 > x0 {
                y0 + (y1 - y0) * (x - x0) / (x1 - x0)
            } else {
                y0
            }
        })
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

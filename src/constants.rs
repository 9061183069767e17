//! # Delivery constants
//!
//! Numeric limits, time-system offsets and axis units shared by the mission pipelines
//! and the orchestrator.
//!
//! ## Units
//!
//! The unit strings below are emitted verbatim in the `xunits` / `yunits` lists of
//! every [`crate::data_series::DataSeries`]; downstream plotting code matches on them,
//! so they must not change.

/// Wavelength in Angstroms
pub type Angstrom = f64;
/// Barycentric Julian Date
pub type Bjd = f64;

/// Largest serialized response, in characters, the orchestrator will hand back.
pub const MAX_RESPONSE_CHARS: usize = 64_000_000;

/// Error code carried by the single series that replaces an oversized response.
pub const TOO_BIG_ERRCODE: i32 = 99;

/// Placeholder used for absent filters, urls and targets.
pub const BLANK_FIELD: &str = " ";

/// Offset from Kepler/K2 mission time (BKJD) to BJD.
pub const BKJD_OFFSET: Bjd = 2_454_833.0;

/// Offset applied to the reduced Julian dates of the K2 POLAR light curves.
pub const REDUCED_JD_OFFSET: Bjd = 2_400_000.0;

/// Decimal places kept for light-curve values.
pub const LIGHT_CURVE_DECIMALS: usize = 8;

/// Mantissa digits kept for spectral values (scientific notation).
pub const SPECTRUM_SIGNIFICANT_DIGITS: usize = 8;

pub const UNIT_BJD: &str = "BJD";
pub const UNIT_ELECTRONS_PER_SECOND: &str = "electrons / second";
pub const UNIT_COUNTS_PER_SECOND: &str = "counts/sec";
pub const UNIT_NORMALIZED: &str = "normalized";
pub const UNIT_ANGSTROM: &str = "Angstroms";
pub const UNIT_ANGSTROM_VACUUM_HELIO: &str = "Angstroms (vacuum, heliocentric)";
pub const UNIT_FLUX_DENSITY: &str = "ergs/cm^2/s/Angstrom";
pub const UNIT_MICRONS: &str = "microns";
pub const UNIT_RADIUS_RATIO_SQ: &str = "(R_p/R_s)^2";

/// Default base URL of the legacy plot-data web service.
pub const DEFAULT_PLOT_SERVICE_URL: &str = "https://archive.stsci.edu/cgi-bin/mast_plot.pl";

//! Shared numeric constants for angular conversions.

/// Pi.
pub const PI: f64 = core::f64::consts::PI;

/// 2 * Pi, one full turn.
pub const TWO_PI: f64 = 2.0 * PI;

/// Pi / 2, a right angle.
pub const HALF_PI: f64 = PI / 2.0;

/// Degrees per hour of right ascension (24h = 360 deg).
pub const DEG_PER_HOUR: f64 = 15.0;

/// Arcseconds per degree.
pub const ARCSEC_PER_DEG: f64 = 3600.0;

/// Milliarcseconds per degree.
pub const MAS_PER_DEG: f64 = 3_600_000.0;

/// Days per Julian year.
pub const DAYS_PER_JULIAN_YEAR: f64 = 365.25;

//! Sky position value type.

use crate::angle::Angle;
use crate::errors::{CoordError, CoordResult};
use crate::separation::angular_separation;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How well a catalog position is known.
///
/// Printed star catalogs flag rows whose astrometry is suspect; the flag
/// survives into query results so callers can weigh matches accordingly.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Accuracy {
    /// Position is good to the catalog's nominal precision.
    #[default]
    Precise,
    /// Catalog marks the position as approximate or suspect.
    Uncertain,
}

/// A right ascension / declination pair on the celestial sphere.
///
/// Construction validates: declination must lie in [-90, +90] degrees,
/// right ascension is cyclic and normalizes to [0, 360).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Coor {
    ra: Angle,
    dec: Angle,
    accuracy: Accuracy,
}

impl Coor {
    pub fn new(ra: Angle, dec: Angle) -> CoordResult<Self> {
        if !ra.is_finite() {
            return Err(CoordError::not_finite("right ascension"));
        }
        if !dec.is_finite() {
            return Err(CoordError::not_finite("declination"));
        }
        if dec.degrees() < -90.0 || dec.degrees() > 90.0 {
            return Err(CoordError::out_of_range(
                "declination",
                dec.degrees(),
                -90.0,
                90.0,
            ));
        }

        Ok(Self {
            ra: ra.normalized(),
            dec,
            accuracy: Accuracy::Precise,
        })
    }

    pub fn from_degrees(ra_deg: f64, dec_deg: f64) -> CoordResult<Self> {
        Self::new(Angle::from_degrees(ra_deg), Angle::from_degrees(dec_deg))
    }

    pub fn from_hours_degrees(ra_hours: f64, dec_deg: f64) -> CoordResult<Self> {
        Self::new(Angle::from_hours(ra_hours), Angle::from_degrees(dec_deg))
    }

    /// Tags the position with an accuracy classification.
    pub fn with_accuracy(mut self, accuracy: Accuracy) -> Self {
        self.accuracy = accuracy;
        self
    }

    pub fn ra(&self) -> Angle {
        self.ra
    }

    pub fn dec(&self) -> Angle {
        self.dec
    }

    pub fn accuracy(&self) -> Accuracy {
        self.accuracy
    }

    pub fn is_uncertain(&self) -> bool {
        self.accuracy == Accuracy::Uncertain
    }

    /// Great-circle distance to another position.
    pub fn separation(&self, other: &Self) -> Angle {
        angular_separation(self, other)
    }

    /// True within one degree of either celestial pole.
    ///
    /// Near the poles an RA interval stops being a useful bound (all
    /// right ascensions converge), so spatial pruning falls back to
    /// declination-only tests there.
    pub fn is_near_pole(&self) -> bool {
        self.dec.abs().degrees() > 89.0
    }

    /// Direction cosines (x toward RA=0 on the equator, z toward the
    /// north celestial pole).
    pub fn unit_vector(&self) -> [f64; 3] {
        let (sin_dec, cos_dec) = self.dec.sin_cos();
        let (sin_ra, cos_ra) = self.ra.sin_cos();

        [cos_dec * cos_ra, cos_dec * sin_ra, sin_dec]
    }

    /// Rebuilds a position from direction cosines.
    pub fn from_unit_vector(v: [f64; 3]) -> CoordResult<Self> {
        let r = libm::sqrt(v[0] * v[0] + v[1] * v[1] + v[2] * v[2]);
        if r == 0.0 {
            return Err(CoordError::out_of_range("unit vector norm", 0.0, 0.0, 1.0));
        }

        let (x, y, z) = (v[0] / r, v[1] / r, v[2] / r);
        let d2 = x * x + y * y;
        let ra = if d2 == 0.0 { 0.0 } else { libm::atan2(y, x) };
        let dec = if z == 0.0 {
            0.0
        } else {
            libm::atan2(z, libm::sqrt(d2))
        };

        Self::new(Angle::from_radians(ra), Angle::from_radians(dec))
    }
}

impl std::fmt::Display for Coor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "RA={:.6}°, Dec={:.6}°",
            self.ra.degrees(),
            self.dec.degrees()
        )?;

        if self.accuracy == Accuracy::Uncertain {
            write!(f, " (uncertain)")?;
        }

        Ok(())
    }
}

//! Typed angular measurement.
//!
//! [`Angle`] stores radians internally (trig functions want radians; storing
//! them avoids repeated conversions) and constructs from the units catalog
//! data actually arrives in: degrees, hours of right ascension, arcminutes,
//! arcseconds, and milliarcseconds.
//!
//! ```
//! use starscan_coords::Angle;
//!
//! let fov = Angle::from_degrees(0.5);
//! let ra = Angle::from_hours(6.0);
//! assert!((ra.degrees() - 90.0).abs() < 1e-10);
//!
//! let (sin, cos) = fov.sin_cos();
//! assert!(sin > 0.0 && cos > 0.9);
//! ```

use crate::constants::{ARCSEC_PER_DEG, DEG_PER_HOUR, HALF_PI, MAS_PER_DEG, PI, TWO_PI};

/// An angular measurement stored as radians.
///
/// `Copy` because it is a single `f64`; `Eq`/`Ord` are not implemented because
/// the value may be NaN.
#[derive(Copy, Clone, Debug, Default, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Angle {
    rad: f64,
}

impl Angle {
    /// Zero angle (0 radians).
    pub const ZERO: Self = Self { rad: 0.0 };

    /// Pi radians (180 degrees).
    pub const PI: Self = Self { rad: PI };

    /// Pi/2 radians (90 degrees).
    pub const HALF_PI: Self = Self { rad: HALF_PI };

    /// Creates an angle from radians, the internal representation.
    #[inline]
    pub const fn from_radians(rad: f64) -> Self {
        Self { rad }
    }

    /// Creates an angle from degrees.
    #[inline]
    pub fn from_degrees(deg: f64) -> Self {
        Self {
            rad: deg.to_radians(),
        }
    }

    /// Creates an angle from hours of right ascension (24h = 360 degrees).
    #[inline]
    pub fn from_hours(h: f64) -> Self {
        Self {
            rad: (h * DEG_PER_HOUR).to_radians(),
        }
    }

    /// Creates an angle from arcminutes (1/60 degree).
    #[inline]
    pub fn from_arcminutes(arcmin: f64) -> Self {
        Self {
            rad: (arcmin / 60.0).to_radians(),
        }
    }

    /// Creates an angle from arcseconds (1/3600 degree).
    #[inline]
    pub fn from_arcseconds(arcsec: f64) -> Self {
        Self {
            rad: (arcsec / ARCSEC_PER_DEG).to_radians(),
        }
    }

    /// Creates an angle from milliarcseconds.
    ///
    /// Proper motions and the finest catalog position grids are expressed
    /// in milliarcseconds.
    #[inline]
    pub fn from_milliarcseconds(mas: f64) -> Self {
        Self {
            rad: (mas / MAS_PER_DEG).to_radians(),
        }
    }

    /// Returns the angle in radians.
    #[inline]
    pub fn radians(self) -> f64 {
        self.rad
    }

    /// Returns the angle in degrees.
    #[inline]
    pub fn degrees(self) -> f64 {
        self.rad.to_degrees()
    }

    /// Returns the angle in hours.
    #[inline]
    pub fn hours(self) -> f64 {
        self.degrees() / DEG_PER_HOUR
    }

    /// Returns the angle in arcminutes.
    #[inline]
    pub fn arcminutes(self) -> f64 {
        self.degrees() * 60.0
    }

    /// Returns the angle in arcseconds.
    #[inline]
    pub fn arcseconds(self) -> f64 {
        self.degrees() * ARCSEC_PER_DEG
    }

    /// Returns the sine of the angle.
    #[inline]
    pub fn sin(self) -> f64 {
        self.rad.sin()
    }

    /// Returns the cosine of the angle.
    #[inline]
    pub fn cos(self) -> f64 {
        self.rad.cos()
    }

    /// Returns both sine and cosine of the angle.
    #[inline]
    pub fn sin_cos(self) -> (f64, f64) {
        self.rad.sin_cos()
    }

    /// Returns the tangent of the angle.
    #[inline]
    pub fn tan(self) -> f64 {
        self.rad.tan()
    }

    /// Returns the absolute value of the angle.
    #[inline]
    pub fn abs(self) -> Self {
        Self {
            rad: self.rad.abs(),
        }
    }

    /// Returns true if the underlying value is finite.
    #[inline]
    pub fn is_finite(self) -> bool {
        self.rad.is_finite()
    }

    /// Wraps the angle to [-pi, +pi), the shortest-arc representation.
    ///
    /// Use for longitude differences that may straddle the 0/360 seam.
    #[inline]
    pub fn wrapped(self) -> Self {
        Self {
            rad: wrap_pm_pi(self.rad),
        }
    }

    /// Normalizes the angle to [0, 2*pi).
    ///
    /// Use for right ascension and anything else that should be
    /// non-negative and below a full turn.
    #[inline]
    pub fn normalized(self) -> Self {
        Self {
            rad: wrap_0_2pi(self.rad),
        }
    }
}

impl std::ops::Add for Angle {
    type Output = Angle;

    #[inline]
    fn add(self, rhs: Angle) -> Angle {
        Angle::from_radians(self.rad + rhs.rad)
    }
}

impl std::ops::Sub for Angle {
    type Output = Angle;

    #[inline]
    fn sub(self, rhs: Angle) -> Angle {
        Angle::from_radians(self.rad - rhs.rad)
    }
}

impl std::ops::Neg for Angle {
    type Output = Angle;

    #[inline]
    fn neg(self) -> Angle {
        Angle::from_radians(-self.rad)
    }
}

impl std::ops::Mul<f64> for Angle {
    type Output = Angle;

    #[inline]
    fn mul(self, rhs: f64) -> Angle {
        Angle::from_radians(self.rad * rhs)
    }
}

impl std::ops::Div<f64> for Angle {
    type Output = Angle;

    #[inline]
    fn div(self, rhs: f64) -> Angle {
        Angle::from_radians(self.rad / rhs)
    }
}

/// Wraps radians to [0, 2*pi).
#[inline]
pub fn wrap_0_2pi(rad: f64) -> f64 {
    let r = libm::fmod(rad, TWO_PI);
    if r < 0.0 {
        r + TWO_PI
    } else {
        r
    }
}

/// Wraps radians to [-pi, +pi).
#[inline]
pub fn wrap_pm_pi(rad: f64) -> f64 {
    wrap_0_2pi(rad + PI) - PI
}

/// Creates an angle from degrees. Shorthand for [`Angle::from_degrees`].
#[inline]
pub fn deg(v: f64) -> Angle {
    Angle::from_degrees(v)
}

/// Creates an angle from radians. Shorthand for [`Angle::from_radians`].
#[inline]
pub fn rad(v: f64) -> Angle {
    Angle::from_radians(v)
}

/// Creates an angle from arcseconds. Shorthand for [`Angle::from_arcseconds`].
#[inline]
pub fn arcsec(v: f64) -> Angle {
    Angle::from_arcseconds(v)
}

/// Creates an angle from milliarcseconds. Shorthand for [`Angle::from_milliarcseconds`].
#[inline]
pub fn mas(v: f64) -> Angle {
    Angle::from_milliarcseconds(v)
}

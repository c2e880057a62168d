//! Epoch and equinox handling for catalog positions.
//!
//! Star catalogs publish positions for a fixed equinox (the orientation of
//! the coordinate grid, usually B1950 or J2000) at a fixed epoch (the date
//! the star was actually there). Comparing a query position against catalog
//! rows needs both brought to common ground:
//!
//! - [`b1950_to_j2000`] / [`j2000_to_b1950`] rotate between the FK4 (B1950)
//!   and FK5 (J2000) equator and equinox using the standard 3x3 rotation.
//!   E-terms of aberration and fictitious FK4 proper motion are neglected;
//!   the residual is a few hundredths of an arcsecond, below the position
//!   grid of the catalogs scanned here.
//! - [`propagate`] moves a star linearly along its proper motion from the
//!   catalog epoch to an observation epoch.

use crate::angle::Angle;
use crate::constants::MAS_PER_DEG;
use crate::coor::Coor;
use crate::errors::CoordResult;

/// Coordinate equinox a catalog's grid is referred to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Equinox {
    /// FK4 system, Besselian epoch 1950.0. Older photographic catalogs.
    B1950,
    /// FK5/ICRS system, Julian epoch 2000.0.
    J2000,
}

impl Equinox {
    /// The equinox as a Julian year, for epoch arithmetic.
    pub fn julian_year(self) -> f64 {
        match self {
            Equinox::B1950 => 1950.0,
            Equinox::J2000 => 2000.0,
        }
    }
}

/// FK4 (B1950) to FK5 (J2000) rotation, Murray (1989) without E-terms.
const B1950_TO_J2000: [[f64; 3]; 3] = [
    [0.999_925_678_2, -0.011_182_061_1, -0.004_857_947_7],
    [0.011_182_061_0, 0.999_937_478_4, -0.000_027_176_5],
    [0.004_857_947_9, -0.000_027_147_4, 0.999_988_199_7],
];

#[inline]
fn rotate(m: &[[f64; 3]; 3], v: [f64; 3]) -> [f64; 3] {
    [
        m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
        m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
        m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
    ]
}

#[inline]
fn rotate_transpose(m: &[[f64; 3]; 3], v: [f64; 3]) -> [f64; 3] {
    [
        m[0][0] * v[0] + m[1][0] * v[1] + m[2][0] * v[2],
        m[0][1] * v[0] + m[1][1] * v[1] + m[2][1] * v[2],
        m[0][2] * v[0] + m[1][2] * v[1] + m[2][2] * v[2],
    ]
}

/// Rotates a B1950 position to the J2000 equator and equinox.
pub fn b1950_to_j2000(coor: &Coor) -> CoordResult<Coor> {
    let v = rotate(&B1950_TO_J2000, coor.unit_vector());
    Ok(Coor::from_unit_vector(v)?.with_accuracy(coor.accuracy()))
}

/// Rotates a J2000 position back to the B1950 equator and equinox.
///
/// The rotation matrix is orthogonal, so the inverse is its transpose.
pub fn j2000_to_b1950(coor: &Coor) -> CoordResult<Coor> {
    let v = rotate_transpose(&B1950_TO_J2000, coor.unit_vector());
    Ok(Coor::from_unit_vector(v)?.with_accuracy(coor.accuracy()))
}

/// Linearly propagates a position along its proper motion.
///
/// `pm_ra` is the sky rate (mu_alpha*, already scaled by cos dec) in
/// mas/yr, as modern catalogs tabulate it; `pm_dec` is mas/yr. Epochs are
/// Julian years.
pub fn propagate(
    coor: &Coor,
    pm_ra: f64,
    pm_dec: f64,
    from_epoch: f64,
    to_epoch: f64,
) -> CoordResult<Coor> {
    let dt_years = to_epoch - from_epoch;

    let dec_deg = coor.dec().degrees() + pm_dec * dt_years / MAS_PER_DEG;
    let cos_dec = coor.dec().cos();
    // RA motion is undefined at the exact pole; leave it unchanged there.
    let ra_deg = if cos_dec == 0.0 {
        coor.ra().degrees()
    } else {
        coor.ra().degrees() + pm_ra * dt_years / MAS_PER_DEG / cos_dec
    };

    Ok(Coor::new(Angle::from_degrees(ra_deg), Angle::from_degrees(dec_deg))?
        .with_accuracy(coor.accuracy()))
}

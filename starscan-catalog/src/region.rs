//! Query region geometry.
//!
//! [`SkyRegion`] is the circular cap a scan filters against. It offers two
//! predicates with different contracts:
//!
//! - [`contains`](SkyRegion::contains) is exact: the great-circle distance
//!   from the cap center, tested against the half-angle.
//! - [`overlaps`](SkyRegion::overlaps) is a conservative rectangle test
//!   used for block-level pruning. It may return `true` for a rectangle
//!   that only approaches the cap (a corner near-miss), but it never
//!   returns `false` for a rectangle that truly intersects it. Pruning
//!   correctness depends on this being a superset test.

use starscan_coords::separation::vincenty_angular_separation;
use starscan_coords::{Angle, Coor};

/// An RA/Dec-aligned rectangle on the sky, in degrees.
///
/// `ra_min > ra_max` means the rectangle crosses RA 0 (for example a
/// Guide Star region straddling the equinox). Declination never wraps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkyRect {
    pub ra_min: f64,
    pub ra_max: f64,
    pub dec_min: f64,
    pub dec_max: f64,
}

impl SkyRect {
    pub fn new(ra_min: f64, ra_max: f64, dec_min: f64, dec_max: f64) -> Self {
        Self {
            ra_min,
            ra_max,
            dec_min,
            dec_max,
        }
    }

    /// A declination band covering the full RA circle.
    pub fn full_ra_band(dec_min: f64, dec_max: f64) -> Self {
        Self::new(0.0, 360.0, dec_min, dec_max)
    }

    /// Widens the declination bounds on both sides, clamped to the poles.
    pub fn widened_dec(&self, margin_deg: f64) -> Self {
        Self {
            ra_min: self.ra_min,
            ra_max: self.ra_max,
            dec_min: (self.dec_min - margin_deg).max(-90.0),
            dec_max: (self.dec_max + margin_deg).min(90.0),
        }
    }

    pub fn crosses_ra_zero(&self) -> bool {
        self.ra_min > self.ra_max
    }

    pub fn covers_full_ra(&self) -> bool {
        !self.crosses_ra_zero() && self.ra_max - self.ra_min >= 360.0
    }

    /// The rectangle's RA extent as one or two non-wrapping segments.
    fn ra_segments(&self) -> ([(f64, f64); 2], usize) {
        if self.crosses_ra_zero() {
            ([(self.ra_min, 360.0), (0.0, self.ra_max)], 2)
        } else {
            ([(self.ra_min, self.ra_max), (0.0, 0.0)], 1)
        }
    }

    /// True if the RA extents of the two rectangles intersect (inclusive
    /// at the edges, so adjacent rectangles count as overlapping).
    pub fn ra_overlaps(&self, other: &SkyRect) -> bool {
        if self.covers_full_ra() || other.covers_full_ra() {
            return true;
        }
        let (a, na) = self.ra_segments();
        let (b, nb) = other.ra_segments();
        for &(a_lo, a_hi) in &a[..na] {
            for &(b_lo, b_hi) in &b[..nb] {
                if a_lo <= b_hi && b_lo <= a_hi {
                    return true;
                }
            }
        }
        false
    }

    /// True if the declination bands intersect (inclusive).
    pub fn dec_overlaps(&self, other: &SkyRect) -> bool {
        self.dec_min <= other.dec_max && other.dec_min <= self.dec_max
    }
}

/// A circular cap on the sky: the query filter of a scan.
///
/// Built once in `open`, immutable for the scan's duration.
#[derive(Debug, Clone, Copy)]
pub struct SkyRegion {
    center: Coor,
    radius: Angle,
    all_sky: bool,
    // Center declination trig, paid once per scan instead of per record.
    sin_dec: f64,
    cos_dec: f64,
    bounds: SkyRect,
}

impl SkyRegion {
    /// Builds the cap from a field-of-view width; the cap's half-angle is
    /// half the field of view. A zero field of view matches only the
    /// exact center position.
    pub fn new(center: Coor, field_of_view: Angle) -> Self {
        Self::with_radius(center, field_of_view * 0.5)
    }

    /// Builds the cap directly from its half-angle.
    pub fn with_radius(center: Coor, radius: Angle) -> Self {
        let radius = radius.abs();
        let all_sky = radius.degrees() >= 180.0;
        let (sin_dec, cos_dec) = center.dec().sin_cos();
        let bounds = cap_bounds(&center, radius, all_sky);

        Self {
            center,
            radius,
            all_sky,
            sin_dec,
            cos_dec,
            bounds,
        }
    }

    /// An unfiltered region: every position and rectangle matches.
    pub fn all_sky() -> Self {
        let center = Coor::from_degrees(0.0, 0.0)
            .expect("origin is a valid position");
        Self::with_radius(center, Angle::from_degrees(180.0))
    }

    pub fn center(&self) -> &Coor {
        &self.center
    }

    /// The cap's half-angle.
    pub fn radius(&self) -> Angle {
        self.radius
    }

    pub fn is_all_sky(&self) -> bool {
        self.all_sky
    }

    /// The RA/Dec rectangle bounding the cap.
    pub fn bounds(&self) -> &SkyRect {
        &self.bounds
    }

    /// Exact great-circle test: is the point inside the cap (boundary
    /// inclusive)?
    pub fn contains(&self, point: &Coor) -> bool {
        if self.all_sky {
            return true;
        }
        let (sin_d, cos_d) = point.dec().sin_cos();
        let delta_ra = (point.ra() - self.center.ra()).radians();
        let sep = vincenty_angular_separation(self.sin_dec, self.cos_dec, sin_d, cos_d, delta_ra);
        sep <= self.radius.radians()
    }

    /// Conservative cap/rectangle overlap: tests the rectangle against the
    /// cap's bounding rectangle. May report an overlap for a rectangle
    /// that only comes close (corner cases), but never misses a rectangle
    /// the cap truly intersects, so a `false` always justifies skipping
    /// the rectangle's records.
    pub fn overlaps(&self, rect: &SkyRect) -> bool {
        if self.all_sky {
            return true;
        }
        self.bounds.dec_overlaps(rect) && self.bounds.ra_overlaps(rect)
    }
}

/// The RA/Dec rectangle bounding a cap.
fn cap_bounds(center: &Coor, radius: Angle, all_sky: bool) -> SkyRect {
    if all_sky {
        return SkyRect::new(0.0, 360.0, -90.0, 90.0);
    }

    let r = radius.degrees();
    let dec = center.dec().degrees();
    let dec_min = (dec - r).max(-90.0);
    let dec_max = (dec + r).min(90.0);

    // A cap reaching a pole spans every right ascension. So does one whose
    // RA half-width formula would leave its domain.
    if dec.abs() + r >= 90.0 {
        return SkyRect::new(0.0, 360.0, dec_min, dec_max);
    }

    // Exact RA half-width of a cap clear of the poles.
    let half_width = libm::asin(radius.sin() / center.dec().cos()).to_degrees();
    let ra = center.ra().degrees();
    let mut ra_min = ra - half_width;
    let mut ra_max = ra + half_width;
    if ra_min < 0.0 {
        ra_min += 360.0;
    }
    if ra_max >= 360.0 {
        ra_max -= 360.0;
    }

    SkyRect::new(ra_min, ra_max, dec_min, dec_max)
}

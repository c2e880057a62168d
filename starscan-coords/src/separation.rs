//! Great-circle angular separation and offsets.

use crate::angle::Angle;
use crate::coor::Coor;
use crate::errors::CoordResult;

/// Vincenty form of the angular separation, numerically stable at all
/// separations including antipodal and coincident points.
///
/// Takes presplit sines/cosines so callers that test one center against
/// many candidates pay the center's trig once.
#[inline]
pub fn vincenty_angular_separation(
    sin_lat1: f64,
    cos_lat1: f64,
    sin_lat2: f64,
    cos_lat2: f64,
    delta_lon: f64,
) -> f64 {
    let (sin_delta_lon, cos_delta_lon) = libm::sincos(delta_lon);

    let num = libm::sqrt(
        (cos_lat2 * sin_delta_lon).powi(2)
            + (cos_lat1 * sin_lat2 - sin_lat1 * cos_lat2 * cos_delta_lon).powi(2),
    );
    let den = sin_lat1 * sin_lat2 + cos_lat1 * cos_lat2 * cos_delta_lon;

    libm::atan2(num, den)
}

/// Angular separation between two sky positions.
#[inline]
pub fn angular_separation(a: &Coor, b: &Coor) -> Angle {
    let (sin_dec1, cos_dec1) = a.dec().sin_cos();
    let (sin_dec2, cos_dec2) = b.dec().sin_cos();
    let delta_ra = (b.ra() - a.ra()).radians();

    Angle::from_radians(vincenty_angular_separation(
        sin_dec1, cos_dec1, sin_dec2, cos_dec2, delta_ra,
    ))
}

/// Point reached by travelling `distance` from `origin` along the great
/// circle leaving it at position angle `bearing` (north through east,
/// i.e. toward increasing RA).
pub fn offset_by(origin: &Coor, bearing: Angle, distance: Angle) -> CoordResult<Coor> {
    let (sin_d, cos_d) = distance.sin_cos();
    let (sin_dec1, cos_dec1) = origin.dec().sin_cos();
    let (sin_b, cos_b) = bearing.sin_cos();

    let sin_dec2 = (sin_dec1 * cos_d + cos_dec1 * sin_d * cos_b).clamp(-1.0, 1.0);
    let dec2 = libm::asin(sin_dec2);
    let delta_ra = libm::atan2(sin_b * sin_d * cos_dec1, cos_d - sin_dec1 * sin_dec2);

    // asin can spill past +/-90 degrees by a rounding ulp once converted.
    let dec2_deg = Angle::from_radians(dec2).degrees().clamp(-90.0, 90.0);
    Coor::new(
        origin.ra() + Angle::from_radians(delta_ra),
        Angle::from_degrees(dec2_deg),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sep_deg(ra1: f64, dec1: f64, ra2: f64, dec2: f64) -> f64 {
        let a = Coor::from_degrees(ra1, dec1).unwrap();
        let b = Coor::from_degrees(ra2, dec2).unwrap();
        angular_separation(&a, &b).degrees()
    }

    #[test]
    fn test_same_point() {
        assert!(sep_deg(10.0, 20.0, 10.0, 20.0).abs() < 1e-12);
    }

    #[test]
    fn test_quarter_turn() {
        assert!((sep_deg(0.0, 0.0, 90.0, 0.0) - 90.0).abs() < 1e-10);
        assert!((sep_deg(0.0, 90.0, 0.0, 0.0) - 90.0).abs() < 1e-10);
    }

    #[test]
    fn test_antipodes() {
        assert!((sep_deg(0.0, 0.0, 180.0, 0.0) - 180.0).abs() < 1e-10);
    }

    #[test]
    fn test_wraparound_seam() {
        // 2 degrees apart straddling RA = 0
        assert!((sep_deg(359.0, 0.0, 1.0, 0.0) - 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_symmetry() {
        let ab = sep_deg(10.0, 30.0, 40.0, -20.0);
        let ba = sep_deg(40.0, -20.0, 10.0, 30.0);
        assert!((ab - ba).abs() < 1e-12);
    }

    #[test]
    fn test_small_separation_precision() {
        // One arcsecond apart on the equator; haversine-class formulas
        // lose digits here, the Vincenty form does not.
        let one_arcsec_deg = 1.0 / 3600.0;
        let d = sep_deg(0.0, 0.0, one_arcsec_deg, 0.0);
        assert!((d - one_arcsec_deg).abs() < 1e-15);
    }

    #[test]
    fn test_offset_north_and_east() {
        let origin = Coor::from_degrees(10.0, 20.0).unwrap();

        let north = offset_by(&origin, Angle::from_degrees(0.0), Angle::from_degrees(5.0)).unwrap();
        assert!((north.ra().degrees() - 10.0).abs() < 1e-9);
        assert!((north.dec().degrees() - 25.0).abs() < 1e-9);

        // Due east from the equator stays on the equator.
        let eq = Coor::from_degrees(0.0, 0.0).unwrap();
        let east = offset_by(&eq, Angle::from_degrees(90.0), Angle::from_degrees(5.0)).unwrap();
        assert!((east.ra().degrees() - 5.0).abs() < 1e-9);
        assert!(east.dec().degrees().abs() < 1e-9);
    }

    #[test]
    fn test_offset_distance_is_preserved() {
        let origin = Coor::from_degrees(200.0, 75.0).unwrap();
        for bearing_deg in [0.0, 37.0, 90.0, 180.0, 271.5] {
            let p = offset_by(
                &origin,
                Angle::from_degrees(bearing_deg),
                Angle::from_degrees(3.0),
            )
            .unwrap();
            let d = angular_separation(&origin, &p).degrees();
            assert!((d - 3.0).abs() < 1e-9, "bearing {bearing_deg}: {d}");
        }
    }

    #[test]
    fn test_offset_through_pole() {
        // 2 degrees north from dec 89: lands at dec 89 on the far side.
        let origin = Coor::from_degrees(0.0, 89.0).unwrap();
        let p = offset_by(&origin, Angle::from_degrees(0.0), Angle::from_degrees(2.0)).unwrap();
        assert!((p.dec().degrees() - 89.0).abs() < 1e-9);
        assert!((p.ra().degrees() - 180.0).abs() < 1e-9);
    }
}

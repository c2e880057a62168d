//! Positions-and-proper-motions catalog: newline-terminated text records
//! with fixed character columns.
//!
//! | Cols   | Field               |
//! |--------|---------------------|
//! | 0..10  | designation         |
//! | 12..14 | RA hours            |
//! | 15..17 | RA minutes          |
//! | 18..23 | RA seconds          |
//! | 25..28 | Dec degrees, signed |
//! | 29..31 | Dec arcminutes      |
//! | 32..36 | Dec arcseconds      |
//! | 38..42 | visual magnitude    |
//! | 44..46 | spectral type       |
//! | 48..54 | pm RA, arcsec/yr    |
//! | 55..61 | pm Dec, arcsec/yr   |
//! | 63..69 | epoch, Julian year  |
//!
//! Two sentinel conventions carry meaning beyond the digits: a field
//! ending in `.` holds no value at all, and a field ending in `:` holds a
//! value the compilers did not fully trust. The first maps to `None`, the
//! second (on a positional field) to [`Accuracy::Uncertain`].

use starscan_coords::{Accuracy, Coor};

use crate::codec::{col, DecodeContext, RecordCodec};
use crate::star::CatalogStar;

/// One parsed text field: the value when present, and whether the
/// catalog flagged it uncertain.
struct Field {
    value: Option<f64>,
    uncertain: bool,
}

fn parse_field(text: &str) -> Field {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.ends_with('.') {
        return Field {
            value: None,
            uncertain: false,
        };
    }
    match trimmed.strip_suffix(':') {
        Some(body) => Field {
            value: body.trim_end().parse().ok(),
            uncertain: true,
        },
        None => Field {
            value: trimmed.parse().ok(),
            uncertain: false,
        },
    }
}

/// Decoder for the text records.
#[derive(Debug, Clone, Copy, Default)]
pub struct PpmCodec;

impl RecordCodec for PpmCodec {
    fn record_len(&self) -> Option<usize> {
        None
    }

    fn decode(&self, raw: &[u8], _ctx: &DecodeContext) -> Option<CatalogStar> {
        let name = col(raw, 0, 10)?.trim();
        if name.is_empty() {
            return None;
        }

        let ra_hours = col(raw, 12, 14)?.trim().parse::<f64>().ok()?;
        let ra_minutes = col(raw, 15, 17)?.trim().parse::<f64>().ok()?;
        let ra_seconds = parse_field(col(raw, 18, 23)?);
        let dec_degrees = col(raw, 25, 28)?.trim().parse::<f64>().ok()?;
        let dec_minutes = col(raw, 29, 31)?.trim().parse::<f64>().ok()?;
        let dec_seconds = parse_field(col(raw, 32, 36)?);

        let ra = ra_hours + ra_minutes / 60.0 + ra_seconds.value? / 3600.0;
        // -0 degrees carries its sign only in the text; keep it off the
        // absolute value until the components are summed.
        let dec_abs = dec_degrees.abs() + dec_minutes / 60.0 + dec_seconds.value? / 3600.0;
        let dec = if dec_degrees.is_sign_negative() {
            -dec_abs
        } else {
            dec_abs
        };

        let mut coor = Coor::from_hours_degrees(ra, dec).ok()?;
        if ra_seconds.uncertain || dec_seconds.uncertain {
            coor = coor.with_accuracy(Accuracy::Uncertain);
        }

        let mut star = CatalogStar::new(name, coor);
        star.mag = col(raw, 38, 42).map(parse_field).and_then(|f| f.value);
        star.class = col(raw, 44, 46).and_then(|s| s.trim().bytes().next());
        star.pm_ra = col(raw, 48, 54)
            .map(parse_field)
            .and_then(|f| f.value)
            .map(|v| v * 1000.0);
        star.pm_dec = col(raw, 55, 61)
            .map(parse_field)
            .and_then(|f| f.value)
            .map(|v| v * 1000.0);
        star.epoch = col(raw, 63, 69).map(parse_field).and_then(|f| f.value);
        Some(star)
    }

    fn mag_precheck(&self, raw: &[u8], ceiling: f64) -> bool {
        match col(raw, 38, 42).map(parse_field).and_then(|f| f.value) {
            Some(mag) => mag <= ceiling,
            None => true,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Formats one catalog line with every column in place.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn line(
        name: &str,
        rah: &str,
        ram: &str,
        ras: &str,
        decd: &str,
        decm: &str,
        decs: &str,
        mag: &str,
        sp: &str,
        pm_ra: &str,
        pm_dec: &str,
        epoch: &str,
    ) -> String {
        format!(
            "{:<10}  {:>2} {:>2} {:>5}  {:>3} {:>2} {:>4}  {:>4}  {:<2}  {:>6} {:>6}  {:>6}",
            name, rah, ram, ras, decd, decm, decs, mag, sp, pm_ra, pm_dec, epoch
        )
    }

    #[test]
    fn test_decode_full_line() {
        let text = line(
            "PPM 78900", "12", "30", "45.67", "-05", "20", "30.1", "8.75", "K0", "-0.012",
            "0.045", "1991.2",
        );
        let star = PpmCodec.decode(text.as_bytes(), &DecodeContext::default()).unwrap();
        assert_eq!(star.name, "PPM 78900");
        let ra_deg = (12.0 + 30.0 / 60.0 + 45.67 / 3600.0) * 15.0;
        let dec_deg = -(5.0 + 20.0 / 60.0 + 30.1 / 3600.0);
        assert!((star.coor.ra().degrees() - ra_deg).abs() < 1e-9);
        assert!((star.coor.dec().degrees() - dec_deg).abs() < 1e-9);
        assert_eq!(star.mag, Some(8.75));
        assert_eq!(star.class, Some(b'K'));
        assert_eq!(star.pm_ra, Some(-0.012 * 1000.0));
        assert_eq!(star.pm_dec, Some(0.045 * 1000.0));
        assert_eq!(star.epoch, Some(1991.2));
        assert!(!star.coor.is_uncertain());
    }

    #[test]
    fn test_negative_zero_degree_band() {
        // Dec between 0 and -1 degree: the degree column reads -00.
        let text = line(
            "PPM 11111", " 0", " 0", " 0.00", "-00", "30", " 0.0", "9.00", "A0", "0.001",
            "0.001", "1990.0",
        );
        let star = PpmCodec.decode(text.as_bytes(), &DecodeContext::default()).unwrap();
        assert!((star.coor.dec().degrees() + 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_omitted_and_uncertain_sentinels() {
        let text = line(
            "PPM 22222", "01", "02", "03.0:", "+10", "00", "0.0:", "  . ", "  ", "     .",
            "     .", "     .",
        );
        let star = PpmCodec.decode(text.as_bytes(), &DecodeContext::default()).unwrap();
        assert!(star.coor.is_uncertain());
        assert_eq!(star.mag, None);
        assert_eq!(star.class, None);
        assert_eq!(star.pm_ra, None);
        assert_eq!(star.pm_dec, None);
        assert_eq!(star.epoch, None);
        assert!(star.passes_ceiling(Some(0.0)));
    }

    #[test]
    fn test_malformed_lines_skip() {
        let ctx = DecodeContext::default();
        assert!(PpmCodec.decode(b"", &ctx).is_none());
        assert!(PpmCodec.decode(b"          ", &ctx).is_none());
        assert!(PpmCodec.decode(b"PPM 1      xx 30 45.00  +10 00 00.0", &ctx).is_none());
        // Omitted RA seconds sink the whole position.
        let text = line(
            "PPM 33333", "01", "02", "   .", "+10", "00", " 0.0", "9.00", "A0", "0.001",
            "0.001", "1990.0",
        );
        assert!(PpmCodec.decode(text.as_bytes(), &ctx).is_none());
    }

    #[test]
    fn test_mag_precheck() {
        let bright = line(
            "PPM 1", "01", "00", " 0.00", "+10", "00", " 0.0", "4.50", "A0", "0.001", "0.001",
            "1990.0",
        );
        let faint = line(
            "PPM 2", "01", "00", " 0.00", "+10", "00", " 0.0", "9.50", "A0", "0.001", "0.001",
            "1990.0",
        );
        assert!(PpmCodec.mag_precheck(bright.as_bytes(), 5.0));
        assert!(!PpmCodec.mag_precheck(faint.as_bytes(), 5.0));
    }
}

//! Photographic survey zone catalogs (USNO A-series repack).
//!
//! The survey is split into 24 declination zones of 7.5 degrees, one file
//! per zone, named by the south polar distance of the zone's south edge in
//! tenths of a degree: `zone0000.cat` starts at the south pole,
//! `zone1725.cat` ends at the north pole. The full catalog spans eleven
//! volumes with each zone file wholly on one volume; the sampled edition
//! fits a single volume. Chunking and file headers are the scanner's
//! business; this module decodes the 12-byte records and knows which file
//! and volume each zone lives on.
//!
//! Record layout (big-endian):
//!
//! | Bytes | Field    | Encoding                                 |
//! |-------|----------|------------------------------------------|
//! | 0..4  | RA       | 0.01 arcsec, absolute                    |
//! | 4..8  | SPD      | 0.01 arcsec north of the south pole      |
//! | 8..12 | packed   | flags and plate data, see below          |
//!
//! The packed word, MSB-first:
//!
//! | Field     | Byte | Bit | Width | Decoding                     |
//! |-----------|------|-----|-------|------------------------------|
//! | uncertain | 8    | 0   | 1     | correlation questionable     |
//! | field     | 8    | 1   | 11    | survey plate number (unused) |
//! | blue      | 9    | 4   | 10    | deci-mag, 1023 = none        |
//! | red       | 10   | 6   | 10    | deci-mag, 1023 = none        |
//!
//! Positions are epoch-of-plate without stored epoch or proper motion, so
//! only the two plate magnitudes accompany each position.

use byteorder::{BigEndian, ByteOrder};

use starscan_coords::{Accuracy, Coor};

use crate::codec::bitfield::PackedField;
use crate::codec::{DecodeContext, RecordCodec};
use crate::scan::chunked::ZoneSpec;
use crate::star::CatalogStar;

pub const USNO_RECORD_LEN: usize = 12;
pub const USNO_ZONE_COUNT: usize = 24;
/// Declination span of one zone file, degrees.
pub const USNO_ZONE_HEIGHT: f64 = 7.5;

const UNCERTAIN: PackedField = PackedField::new(8, 0, 1);
const BLUE: PackedField = PackedField::new(9, 4, 10);
const RED: PackedField = PackedField::new(10, 6, 10);

const MAG_NONE: u32 = 1023;
/// 0.01 arcsec steps per degree.
const STEPS_PER_DEG: f64 = 360_000.0;

/// Volume holding each zone of the full edition. Zones are packed south
/// to north; the sparse polar caps share volumes, the dense equatorial
/// zones get one volume per pair.
const A20_ZONE_DISC: [u8; USNO_ZONE_COUNT] = [
    1, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 8, 9, 9, 10, 10, 11, 11, 11,
];

/// Which edition of the survey is being read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsnoFlavor {
    /// Sampled edition, single volume.
    Sa20,
    /// Full edition, eleven volumes.
    A20,
}

impl UsnoFlavor {
    pub fn catalog_name(&self) -> &'static str {
        match self {
            UsnoFlavor::Sa20 => "USNO-SA2.0",
            UsnoFlavor::A20 => "USNO-A2.0",
        }
    }

    fn disc_for_zone(&self, zone: usize) -> Option<u8> {
        match self {
            UsnoFlavor::Sa20 => None,
            UsnoFlavor::A20 => Some(A20_ZONE_DISC[zone]),
        }
    }
}

/// Zone code of a zone: south-edge SPD in tenths of a degree.
pub fn zone_code(zone: usize) -> u32 {
    (zone * 75) as u32
}

/// The 24 zone files of one edition, south to north.
pub fn zone_specs(flavor: UsnoFlavor) -> Vec<ZoneSpec> {
    (0..USNO_ZONE_COUNT)
        .map(|zone| {
            let dec_min = -90.0 + zone as f64 * USNO_ZONE_HEIGHT;
            ZoneSpec {
                name: format!("zone{:04}.cat", zone_code(zone)),
                zone_code: zone_code(zone),
                dec_min,
                dec_max: dec_min + USNO_ZONE_HEIGHT,
                disc: flavor.disc_for_zone(zone),
            }
        })
        .collect()
}

/// Decoder for the 12-byte survey records.
#[derive(Debug, Clone, Copy, Default)]
pub struct UsnoCodec;

impl RecordCodec for UsnoCodec {
    fn record_len(&self) -> Option<usize> {
        Some(USNO_RECORD_LEN)
    }

    fn decode(&self, raw: &[u8], ctx: &DecodeContext) -> Option<CatalogStar> {
        if raw.len() < USNO_RECORD_LEN {
            return None;
        }
        let ra_deg = BigEndian::read_u32(&raw[0..4]) as f64 / STEPS_PER_DEG;
        let dec_deg = BigEndian::read_u32(&raw[4..8]) as f64 / STEPS_PER_DEG - 90.0;
        let mut coor = Coor::from_degrees(ra_deg, dec_deg).ok()?;
        if UNCERTAIN.extract(raw)? != 0 {
            coor = coor.with_accuracy(Accuracy::Uncertain);
        }

        let mut star = CatalogStar::new(
            format!("USNO {:04}-{:08}", ctx.block_id, ctx.record_ordinal),
            coor,
        );
        let blue = BLUE.extract(raw)?;
        if blue != MAG_NONE {
            star.blue_mag = Some(blue as f64 / 10.0);
        }
        let red = RED.extract(raw)?;
        if red != MAG_NONE {
            star.red_mag = Some(red as f64 / 10.0);
        }
        Some(star)
    }

    fn mag_precheck(&self, raw: &[u8], ceiling: f64) -> bool {
        // Red mirrors the filter fallback order: red first, blue only
        // when red is unmeasured.
        let red = match RED.extract(raw) {
            Some(r) => r,
            None => return true,
        };
        if red != MAG_NONE {
            return red as f64 / 10.0 <= ceiling;
        }
        match BLUE.extract(raw) {
            Some(b) if b != MAG_NONE => b as f64 / 10.0 <= ceiling,
            _ => true,
        }
    }
}

//! Compact zone proper-motion catalog: bit-packed fixed-width records in
//! 0.5 degree declination bands.
//!
//! One file covers the whole sky. A 20-byte header (big-endian) carries
//! magic `ZPMC`, a format version (currently 1), the total record count,
//! the band count (360), and a reserved word; it is followed by 360 u32
//! per-band record counts, then the records themselves, band 0 (south
//! pole) first, sorted by RA within each band.
//!
//! Each record is 96 bits, packed MSB-first with nothing byte-aligned
//! except the magnitude:
//!
//! | Field     | Byte | Bit | Width | Decoding                          |
//! |-----------|------|-----|-------|-----------------------------------|
//! | RA        | 0    | 0   | 27    | 0.01 arcsec, absolute             |
//! | Dec       | 3    | 3   | 21    | 0.001 arcsec north of band edge   |
//! | magnitude | 6    | 0   | 8     | 7.50 + value / 100, 255 = none    |
//! | epoch     | 7    | 0   | 7     | 1900 + value, Julian years        |
//! | pm RA ±   | 7    | 7   | 1     | sign of pm RA, set = negative     |
//! | pm RA     | 8    | 0   | 14    | mas/yr, 16383 = none              |
//! | pm Dec ±  | 9    | 6   | 1     | sign of pm Dec, set = negative    |
//! | pm Dec    | 9    | 7   | 14    | mas/yr, 16383 = none              |
//! | quality   | 11   | 5   | 3     | astrometric grade, 0 best         |
//!
//! A record whose RA field is all ones is deleted and skipped.

use byteorder::{BigEndian, ByteOrder};

use starscan_coords::Coor;

use crate::codec::bitfield::{FieldSpec, PackedField};
use crate::codec::{DecodeContext, RecordCodec};
use crate::error::{ScanError, ScanResult};
use crate::locate::ResourceLocator;
use crate::region::SkyRect;
use crate::scan::block::{BlockDescriptor, BlockLayout};
use crate::scan::ResourceHandle;
use crate::star::CatalogStar;

pub const ZONEPM_RECORD_LEN: usize = 12;
pub const ZONEPM_BAND_COUNT: usize = 360;
/// Declination span of one band, degrees.
pub const ZONEPM_BAND_HEIGHT: f64 = 0.5;

const MAGIC: &[u8; 4] = b"ZPMC";
const VERSION: u32 = 1;
const HEADER_LEN: usize = 20;

const RA: FieldSpec = FieldSpec::scaled(0, 0, 27, 360_000.0);
const DEC: FieldSpec = FieldSpec::scaled(3, 3, 21, 1000.0 * 3600.0);
const MAG: FieldSpec = FieldSpec::offset_scaled(6, 0, 8, 7.50, 100.0);
const EPOCH: FieldSpec = FieldSpec::offset_scaled(7, 0, 7, 1900.0, 1.0);
const PM_RA: FieldSpec = FieldSpec::signed(8, 0, 14, 1.0, 7, 7);
const PM_DEC: FieldSpec = FieldSpec::signed(9, 7, 14, 1.0, 9, 6);
const QUALITY: PackedField = PackedField::new(11, 5, 3);

const RA_DELETED: u32 = (1 << 27) - 1;
const MAG_NONE: u32 = 255;
const PM_NONE: u32 = (1 << 14) - 1;

/// South edge of a band, degrees.
pub fn band_south_edge(band: usize) -> f64 {
    -90.0 + band as f64 * ZONEPM_BAND_HEIGHT
}

/// Decoder for the 96-bit packed records.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZonePmCodec;

impl RecordCodec for ZonePmCodec {
    fn record_len(&self) -> Option<usize> {
        Some(ZONEPM_RECORD_LEN)
    }

    fn decode(&self, raw: &[u8], ctx: &DecodeContext) -> Option<CatalogStar> {
        if raw.len() < ZONEPM_RECORD_LEN {
            return None;
        }
        let ra_raw = RA.read_raw(raw)?;
        if ra_raw == RA_DELETED {
            return None;
        }

        let ra_deg = ra_raw as f64 / 360_000.0;
        let dec_deg = ctx.origin_dec_deg + DEC.read(raw)?;
        let coor = Coor::from_degrees(ra_deg, dec_deg).ok()?;

        let mut star = CatalogStar::new(
            format!("ZPM {:03}-{:06}", ctx.block_id, ctx.record_ordinal),
            coor,
        );
        if MAG.read_raw(raw)? != MAG_NONE {
            star.mag = MAG.read(raw);
        }
        star.epoch = EPOCH.read(raw);
        if PM_RA.read_raw(raw)? != PM_NONE {
            star.pm_ra = PM_RA.read(raw);
        }
        if PM_DEC.read_raw(raw)? != PM_NONE {
            star.pm_dec = PM_DEC.read(raw);
        }
        star.class = QUALITY.extract(raw).map(|q| q as u8);
        Some(star)
    }

    fn mag_precheck(&self, raw: &[u8], ceiling: f64) -> bool {
        // The magnitude is the one byte-aligned field; no extraction needed.
        match raw.get(6) {
            Some(&m) => m as u32 == MAG_NONE || 7.50 + m as f64 / 100.0 <= ceiling,
            None => true,
        }
    }
}

/// Band directory read from the in-band header.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZonePmLayout;

impl BlockLayout for ZonePmLayout {
    fn load_blocks(
        &self,
        _locator: &ResourceLocator,
        data: &mut ResourceHandle,
    ) -> ScanResult<Vec<BlockDescriptor>> {
        let table_len = HEADER_LEN + ZONEPM_BAND_COUNT * 4;
        let file_len = data.len()?;
        if file_len < table_len as u64 {
            return Err(ScanError::corrupt_catalog("ZPM", "file shorter than its header"));
        }

        let mut header = [0u8; HEADER_LEN];
        data.read_exact_buf(&mut header)?;
        if &header[0..4] != MAGIC {
            return Err(ScanError::corrupt_catalog("ZPM", "bad magic"));
        }
        let version = BigEndian::read_u32(&header[4..8]);
        if version != VERSION {
            return Err(ScanError::corrupt_catalog(
                "ZPM",
                format!("unsupported version {version}"),
            ));
        }
        let total_records = BigEndian::read_u32(&header[8..12]) as u64;
        let band_count = BigEndian::read_u32(&header[12..16]) as usize;
        if band_count != ZONEPM_BAND_COUNT {
            return Err(ScanError::corrupt_catalog(
                "ZPM",
                format!("expected {ZONEPM_BAND_COUNT} bands, header declares {band_count}"),
            ));
        }

        let mut counts = vec![0u8; band_count * 4];
        data.read_exact_buf(&mut counts)?;

        let mut blocks = Vec::with_capacity(band_count);
        let mut byte_offset = table_len as u64;
        let mut running_total = 0u64;
        for band in 0..band_count {
            let record_count = BigEndian::read_u32(&counts[band * 4..band * 4 + 4]) as u64;
            let south = band_south_edge(band);
            let byte_len = record_count * ZONEPM_RECORD_LEN as u64;
            blocks.push(BlockDescriptor {
                id: band as u32,
                bounds: SkyRect::full_ra_band(south, south + ZONEPM_BAND_HEIGHT),
                record_count,
                byte_offset,
                byte_len,
            });
            byte_offset += byte_len;
            running_total += record_count;
        }

        if running_total != total_records {
            return Err(ScanError::corrupt_catalog(
                "ZPM",
                format!("band counts sum to {running_total}, header declares {total_records}"),
            ));
        }
        if byte_offset != file_len {
            return Err(ScanError::corrupt_catalog(
                "ZPM",
                format!("bands account for {byte_offset} bytes, file holds {file_len}"),
            ));
        }
        Ok(blocks)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Assembles one packed record from raw field values.
    pub(crate) fn pack_record(
        ra_steps: u32,
        dec_steps: u32,
        mag: u32,
        epoch: u32,
        pm_ra: i32,
        pm_dec: i32,
        quality: u32,
    ) -> [u8; 12] {
        let mut bits = 0u128;
        let mut push = |value: u32, width: u32| {
            bits = (bits << width) | (value as u128 & ((1u128 << width) - 1));
        };
        push(ra_steps, 27);
        push(dec_steps, 21);
        push(mag, 8);
        push(epoch, 7);
        push(if pm_ra < 0 { 1 } else { 0 }, 1);
        push(pm_ra.unsigned_abs(), 14);
        push(if pm_dec < 0 { 1 } else { 0 }, 1);
        push(pm_dec.unsigned_abs(), 14);
        push(quality, 3);

        let mut raw = [0u8; 12];
        raw.copy_from_slice(&bits.to_be_bytes()[4..16]);
        raw
    }

    /// A full catalog image: header, band table, records.
    pub(crate) fn build_catalog(bands: &[(usize, Vec<[u8; 12]>)]) -> Vec<u8> {
        let mut counts = [0u32; ZONEPM_BAND_COUNT];
        for (band, records) in bands {
            counts[*band] = records.len() as u32;
        }
        let total: u32 = counts.iter().sum();

        let mut buf = Vec::new();
        buf.extend_from_slice(MAGIC);
        buf.extend_from_slice(&VERSION.to_be_bytes());
        buf.extend_from_slice(&total.to_be_bytes());
        buf.extend_from_slice(&(ZONEPM_BAND_COUNT as u32).to_be_bytes());
        buf.extend_from_slice(&0u32.to_be_bytes());
        for count in counts {
            buf.extend_from_slice(&count.to_be_bytes());
        }
        let mut sorted: Vec<_> = bands.iter().collect();
        sorted.sort_by_key(|(band, _)| *band);
        for (_, records) in sorted {
            for record in records {
                buf.extend_from_slice(record);
            }
        }
        buf
    }

    #[test]
    fn test_dec_field_boundaries() {
        // Band 240 spans +30.0 .. +30.5 degrees.
        let ctx = DecodeContext {
            block_id: 240,
            record_ordinal: 1,
            origin_ra_deg: 0.0,
            origin_dec_deg: band_south_edge(240),
        };

        let zero = pack_record(36_000_000, 0, 100, 91, 0, 0, 2);
        assert_eq!(DEC.read(&zero), Some(0.0));
        let star = ZonePmCodec.decode(&zero, &ctx).unwrap();
        assert!((star.coor.dec().degrees() - 30.0).abs() < 1e-9);
        assert!((star.coor.ra().degrees() - 100.0).abs() < 1e-9);

        let max = pack_record(36_000_000, 2_097_151, 100, 91, 0, 0, 2);
        assert_eq!(DEC.read(&max), Some(2_097_151.0 / (1000.0 * 3600.0)));
        let star = ZonePmCodec.decode(&max, &ctx).unwrap();
        let expected = 30.0 + 2_097_151.0 / (1000.0 * 3600.0);
        assert!((star.coor.dec().degrees() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_decode_full_record() {
        let ctx = DecodeContext {
            block_id: 180,
            record_ordinal: 12,
            origin_dec_deg: band_south_edge(180),
            ..DecodeContext::default()
        };
        let raw = pack_record(4_320_000, 720_000, 165, 50, -312, 1048, 1);
        let star = ZonePmCodec.decode(&raw, &ctx).unwrap();
        assert_eq!(star.name, "ZPM 180-000012");
        assert!((star.coor.ra().degrees() - 12.0).abs() < 1e-9);
        assert!((star.coor.dec().degrees() - 0.2).abs() < 1e-9);
        assert_eq!(star.mag, Some(7.50 + 165.0 / 100.0));
        assert_eq!(star.epoch, Some(1950.0));
        assert_eq!(star.pm_ra, Some(-312.0));
        assert_eq!(star.pm_dec, Some(1048.0));
        assert_eq!(star.class, Some(1));
    }

    #[test]
    fn test_sentinels() {
        let ctx = DecodeContext::default();
        let deleted = pack_record(RA_DELETED, 0, 100, 0, 0, 0, 0);
        assert!(ZonePmCodec.decode(&deleted, &ctx).is_none());

        let unmeasured = pack_record(100, 50, MAG_NONE, 0, 16_383, 16_383, 7);
        let star = ZonePmCodec.decode(&unmeasured, &ctx).unwrap();
        assert_eq!(star.mag, None);
        assert_eq!(star.pm_ra, None);
        assert_eq!(star.pm_dec, None);
    }

    #[test]
    fn test_mag_precheck_reads_byte_six() {
        let bright = pack_record(0, 0, 25, 0, 0, 0, 0);
        let faint = pack_record(0, 0, 200, 0, 0, 0, 0);
        assert!(ZonePmCodec.mag_precheck(&bright, 8.0));
        assert!(!ZonePmCodec.mag_precheck(&faint, 8.0));
        assert!(ZonePmCodec.mag_precheck(&pack_record(0, 0, MAG_NONE, 0, 0, 0, 0), 8.0));
    }

    #[test]
    fn test_layout_reads_band_table() {
        let dir = tempfile::TempDir::new().unwrap();
        let image = build_catalog(&[
            (0, vec![pack_record(1, 1, 1, 1, 0, 0, 0); 2]),
            (240, vec![pack_record(1, 1, 1, 1, 0, 0, 0); 3]),
        ]);
        std::fs::write(dir.path().join("zonepm.dat"), &image).unwrap();
        let locator = ResourceLocator::single(dir.path());
        let mut handle = ResourceHandle::open(locator.resolve("zonepm.dat").unwrap()).unwrap();

        let blocks = ZonePmLayout.load_blocks(&locator, &mut handle).unwrap();
        assert_eq!(blocks.len(), ZONEPM_BAND_COUNT);
        assert_eq!(blocks[0].record_count, 2);
        assert_eq!(blocks[240].record_count, 3);
        assert_eq!(blocks[240].bounds.dec_min, 30.0);
        assert_eq!(blocks[240].bounds.dec_max, 30.5);
        assert!(blocks[240].bounds.covers_full_ra());
        // Bands 1..240 are empty, so 240 starts right after band 0.
        let table_len = (HEADER_LEN + ZONEPM_BAND_COUNT * 4) as u64;
        assert_eq!(blocks[240].byte_offset, table_len + 24);
    }

    #[test]
    fn test_layout_rejects_count_mismatch() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut image = build_catalog(&[(10, vec![pack_record(1, 1, 1, 1, 0, 0, 0)])]);
        // Header says one record; remove its bytes.
        image.truncate(image.len() - ZONEPM_RECORD_LEN);
        std::fs::write(dir.path().join("zonepm.dat"), &image).unwrap();
        let locator = ResourceLocator::single(dir.path());
        let mut handle = ResourceHandle::open(locator.resolve("zonepm.dat").unwrap()).unwrap();

        let err = ZonePmLayout.load_blocks(&locator, &mut handle).unwrap_err();
        assert!(matches!(err, ScanError::CorruptCatalog { .. }));
    }
}

//! Guide-star catalog: block-indexed fixed-width records.
//!
//! The sky is divided into a few thousand small regions ("blocks"). The
//! data file is a headerless concatenation of 12-byte records grouped by
//! block; a side-car index file carries the block directory. Records store
//! coordinates as offsets from their block's south-west corner, so blocks
//! stay compact and the block id is needed to reconstruct a position.
//!
//! Index file layout (big-endian):
//!
//! | Bytes  | Field                      |
//! |--------|----------------------------|
//! | 0..4   | magic `GSCX`               |
//! | 4..8   | format version, currently 1|
//! | 8..12  | block count                |
//! | 12..16 | reserved                   |
//!
//! followed by one 22-byte entry per block, in data-file order: block id
//! (u16), RA min/max in milli-degrees (u32), Dec min/max in milli-degrees
//! (i32), record count (u32). Byte offsets are not stored; they accumulate
//! from zero because blocks are laid out back to back.
//!
//! Data records, 12 bytes each:
//!
//! | Bytes | Field       | Encoding                                  |
//! |-------|-------------|-------------------------------------------|
//! | 0..3  | RA offset   | 0.01 arcsec east of the block west edge   |
//! | 3..6  | Dec offset  | 0.01 arcsec north of the block south edge |
//! | 6..8  | magnitude   | centi-mag, 0xFFFF = not measured          |
//! | 8..11 | star number | ordinal within the block                  |
//! | 11    | class       | 0 star .. 3 non-stellar                   |
//!
//! Deleted records are overwritten with 0xFF and skipped on decode.

use byteorder::{BigEndian, ByteOrder};

use starscan_coords::Coor;

use crate::codec::{DecodeContext, RecordCodec};
use crate::error::{ScanError, ScanResult};
use crate::locate::ResourceLocator;
use crate::region::SkyRect;
use crate::scan::block::{BlockDescriptor, BlockLayout};
use crate::scan::ResourceHandle;
use crate::star::CatalogStar;

pub const GSC_RECORD_LEN: usize = 12;

const INDEX_MAGIC: &[u8; 4] = b"GSCX";
const INDEX_VERSION: u32 = 1;
const INDEX_HEADER_LEN: usize = 16;
const INDEX_ENTRY_LEN: usize = 22;

const MAG_UNDEFINED: u16 = 0xFFFF;
/// 0.01 arcsec steps per degree.
const STEPS_PER_DEG: f64 = 360_000.0;

/// Decoder for the 12-byte guide-star records.
#[derive(Debug, Clone, Copy, Default)]
pub struct GscCodec;

impl RecordCodec for GscCodec {
    fn record_len(&self) -> Option<usize> {
        Some(GSC_RECORD_LEN)
    }

    fn decode(&self, raw: &[u8], ctx: &DecodeContext) -> Option<CatalogStar> {
        if raw.len() < GSC_RECORD_LEN {
            return None;
        }
        let raw = &raw[..GSC_RECORD_LEN];
        if raw.iter().all(|&b| b == 0xFF) {
            return None;
        }

        let ra_deg = ctx.origin_ra_deg + BigEndian::read_u24(&raw[0..3]) as f64 / STEPS_PER_DEG;
        let dec_deg = ctx.origin_dec_deg + BigEndian::read_u24(&raw[3..6]) as f64 / STEPS_PER_DEG;
        let coor = Coor::from_degrees(ra_deg, dec_deg).ok()?;

        let star_no = BigEndian::read_u24(&raw[8..11]);
        let mut star = CatalogStar::new(format!("GSC {:05}-{:05}", ctx.block_id, star_no), coor);
        let centimag = BigEndian::read_u16(&raw[6..8]);
        if centimag != MAG_UNDEFINED {
            star.mag = Some(centimag as f64 / 100.0);
        }
        star.class = Some(raw[11]);
        Some(star)
    }

    fn mag_precheck(&self, raw: &[u8], ceiling: f64) -> bool {
        if raw.len() < 8 {
            return true;
        }
        let centimag = BigEndian::read_u16(&raw[6..8]);
        centimag == MAG_UNDEFINED || centimag as f64 / 100.0 <= ceiling
    }
}

/// Block directory loaded from the side-car index file.
#[derive(Debug, Clone)]
pub struct GscIndexLayout {
    index_file: String,
}

impl GscIndexLayout {
    pub fn new(index_file: impl Into<String>) -> Self {
        Self {
            index_file: index_file.into(),
        }
    }
}

impl BlockLayout for GscIndexLayout {
    fn load_blocks(
        &self,
        locator: &ResourceLocator,
        data: &mut ResourceHandle,
    ) -> ScanResult<Vec<BlockDescriptor>> {
        let path = locator.resolve(&self.index_file)?;
        let bytes = std::fs::read(&path)?;
        if bytes.len() < INDEX_HEADER_LEN {
            return Err(ScanError::corrupt_catalog("GSC", "index shorter than its header"));
        }
        if &bytes[0..4] != INDEX_MAGIC {
            return Err(ScanError::corrupt_catalog("GSC", "bad index magic"));
        }
        let version = BigEndian::read_u32(&bytes[4..8]);
        if version != INDEX_VERSION {
            return Err(ScanError::corrupt_catalog(
                "GSC",
                format!("unsupported index version {version}"),
            ));
        }
        let block_count = BigEndian::read_u32(&bytes[8..12]) as usize;
        let expected = INDEX_HEADER_LEN + block_count * INDEX_ENTRY_LEN;
        if bytes.len() < expected {
            return Err(ScanError::corrupt_catalog(
                "GSC",
                format!(
                    "index truncated: {block_count} blocks need {expected} bytes, found {}",
                    bytes.len()
                ),
            ));
        }

        let mut blocks = Vec::with_capacity(block_count);
        let mut byte_offset = 0u64;
        for i in 0..block_count {
            let entry = &bytes[INDEX_HEADER_LEN + i * INDEX_ENTRY_LEN..][..INDEX_ENTRY_LEN];
            let id = BigEndian::read_u16(&entry[0..2]) as u32;
            let ra_min = BigEndian::read_u32(&entry[2..6]) as f64 / 1000.0;
            let ra_max = BigEndian::read_u32(&entry[6..10]) as f64 / 1000.0;
            let dec_min = BigEndian::read_i32(&entry[10..14]) as f64 / 1000.0;
            let dec_max = BigEndian::read_i32(&entry[14..18]) as f64 / 1000.0;
            let record_count = BigEndian::read_u32(&entry[18..22]) as u64;
            let byte_len = record_count * GSC_RECORD_LEN as u64;
            blocks.push(BlockDescriptor {
                id,
                bounds: SkyRect::new(ra_min, ra_max, dec_min, dec_max),
                record_count,
                byte_offset,
                byte_len,
            });
            byte_offset += byte_len;
        }

        let data_len = data.len()?;
        if byte_offset != data_len {
            return Err(ScanError::corrupt_catalog(
                "GSC",
                format!("index accounts for {byte_offset} bytes, data file holds {data_len}"),
            ));
        }
        Ok(blocks)
    }
}

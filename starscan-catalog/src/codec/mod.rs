//! Per-catalog record decoders.
//!
//! A scanner owns the skip/seek machinery and stays catalog-agnostic; a
//! [`RecordCodec`] owns the byte layout of one catalog's records. Bit-packed
//! layouts are table-driven through [`bitfield`]: the codec declares where
//! each numeric field lives and the shared extraction routine does the
//! shift/mask work.

pub mod bitfield;
pub mod gsc;
pub mod ppm;
pub mod usno;
pub mod zonepm;

use crate::star::CatalogStar;

/// Positional context a codec needs beyond the raw record bytes.
///
/// Catalogs that store block-relative coordinate offsets get the block's
/// south-west corner here; catalogs that synthesize designations from the
/// storage position get the enclosing block id and the record's ordinal in
/// the catalog's native numbering.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecodeContext {
    /// Identifier of the enclosing block (region number, band ordinal,
    /// zone code).
    pub block_id: u32,
    /// Record ordinal in the catalog's native numbering.
    pub record_ordinal: u64,
    /// West edge coordinate offsets are measured from, degrees.
    pub origin_ra_deg: f64,
    /// South edge coordinate offsets are measured from, degrees.
    pub origin_dec_deg: f64,
}

/// Decoder for one catalog's record layout.
pub trait RecordCodec: Send + Sync {
    /// Encoded record width in bytes; `None` when rows are variable width
    /// (newline-terminated text lines).
    fn record_len(&self) -> Option<usize>;

    /// Decodes one raw record. `None` marks a deleted, sentinel, or
    /// malformed row; the scanner skips it silently and keeps scanning.
    fn decode(&self, raw: &[u8], ctx: &DecodeContext) -> Option<CatalogStar>;

    /// Cheap test on the raw bytes: could this record's magnitude pass the
    /// given ceiling? Lets the scanner drop faint records without paying
    /// for a full decode. Conservative: defaults to `true`.
    fn mag_precheck(&self, _raw: &[u8], _ceiling: f64) -> bool {
        true
    }
}

/// One fixed-width text column as a string slice, `None` if the line is
/// too short or the slice is not valid UTF-8.
pub(crate) fn col(bytes: &[u8], start: usize, end: usize) -> Option<&str> {
    if end > bytes.len() {
        return None;
    }
    std::str::from_utf8(&bytes[start..end]).ok()
}

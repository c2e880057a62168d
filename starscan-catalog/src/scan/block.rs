//! Block-indexed scan: prune whole blocks against the region before any
//! of their records are read.
//!
//! The catalog is a single data file organized as consecutive blocks,
//! each with known sky bounds and record count. A [`BlockLayout`] loads
//! the block directory (from a side-car index file or an in-band header);
//! the scanner walks blocks in file order and skips every block whose
//! bounds do not overlap the region:
//!
//! - fixed-width records: the skip is pure seek arithmetic, no byte of a
//!   pruned block is ever read;
//! - variable-width records: the skipped records still stream through the
//!   reader, but are discarded line-by-line without being decoded.
//!
//! Pruning leans on [`SkyRegion::overlaps`] being a superset test: a
//! skipped block is guaranteed to hold no matching record.

use starscan_coords::{Angle, Coor};

use crate::codec::{DecodeContext, RecordCodec};
use crate::error::{ScanError, ScanResult};
use crate::locate::ResourceLocator;
use crate::region::{SkyRect, SkyRegion};
use crate::scan::{ResourceHandle, ScanCursor, StarScan};
use crate::star::CatalogStar;

/// One block of the directory: where it sits on the sky and in the file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockDescriptor {
    /// Catalog-native block identifier (region number, band ordinal).
    pub id: u32,
    /// Sky bounds of every record in the block.
    pub bounds: SkyRect,
    pub record_count: u64,
    /// Start of the block's records in the data file. Only meaningful
    /// for fixed-width records.
    pub byte_offset: u64,
    /// `record_count * record_len` for fixed-width records, 0 otherwise.
    pub byte_len: u64,
}

/// Loads the block directory of one catalog.
///
/// Contract: on return the data handle is positioned at the first
/// record (layouts with in-band headers consume them here).
pub trait BlockLayout: Send + Sync {
    fn load_blocks(
        &self,
        locator: &ResourceLocator,
        data: &mut ResourceHandle,
    ) -> ScanResult<Vec<BlockDescriptor>>;
}

pub struct BlockIndexedScanner {
    catalog: &'static str,
    locator: ResourceLocator,
    data_file: String,
    layout: Box<dyn BlockLayout>,
    codec: Box<dyn RecordCodec>,
    ceiling: Option<f64>,
    region: Option<SkyRegion>,
    handle: Option<ResourceHandle>,
    blocks: Vec<BlockDescriptor>,
    cursor: ScanCursor,
    // Reader sits exactly where the cursor points. Cleared when a
    // fixed-width block is skipped without moving the reader.
    positioned: bool,
    buf: Vec<u8>,
}

impl BlockIndexedScanner {
    pub fn new(
        catalog: &'static str,
        locator: ResourceLocator,
        data_file: impl Into<String>,
        layout: Box<dyn BlockLayout>,
        codec: Box<dyn RecordCodec>,
    ) -> Self {
        Self {
            catalog,
            locator,
            data_file: data_file.into(),
            layout,
            codec,
            ceiling: None,
            region: None,
            handle: None,
            blocks: Vec::new(),
            cursor: ScanCursor::default(),
            positioned: false,
            buf: Vec::new(),
        }
    }

    pub fn set_magnitude_ceiling(&mut self, ceiling: Option<f64>) {
        self.ceiling = ceiling;
    }

    pub fn cursor(&self) -> ScanCursor {
        self.cursor
    }

    /// The loaded block directory; empty before `open`.
    pub fn blocks(&self) -> &[BlockDescriptor] {
        &self.blocks
    }
}

impl StarScan for BlockIndexedScanner {
    fn open(&mut self, center: Coor, field_of_view: Angle) -> ScanResult<()> {
        let path = self.locator.resolve(&self.data_file)?;
        let mut handle = ResourceHandle::open(path)?;
        self.blocks = self.layout.load_blocks(&self.locator, &mut handle)?;
        self.handle = Some(handle);
        self.region = Some(SkyRegion::new(center, field_of_view));
        self.cursor = ScanCursor::default();
        self.positioned = true;
        Ok(())
    }

    fn read_next(&mut self) -> ScanResult<Option<CatalogStar>> {
        let Some(region) = self.region else {
            return Err(ScanError::query_failed("scan is not open"));
        };
        let Some(handle) = self.handle.as_mut() else {
            return Err(ScanError::query_failed("scan is not open"));
        };
        if self.cursor.exhausted {
            return Ok(None);
        }

        loop {
            let Some(block) = self.blocks.get(self.cursor.block).copied() else {
                self.cursor.exhausted = true;
                return Ok(None);
            };
            if self.cursor.record >= block.record_count {
                // Blocks are contiguous, so finishing one leaves the
                // reader at the start of the next.
                self.cursor.next_block();
                continue;
            }

            if self.cursor.record == 0 && !region.overlaps(&block.bounds) {
                match self.codec.record_len() {
                    Some(_) => {
                        log::debug!(
                            "{}: skipping block {} ({} records, {} bytes)",
                            self.catalog,
                            block.id,
                            block.record_count,
                            block.byte_len
                        );
                        self.positioned = false;
                    }
                    None => {
                        for _ in 0..block.record_count {
                            if !handle.read_line_raw(&mut self.buf)? {
                                return Err(ScanError::corrupt_catalog(
                                    self.catalog,
                                    "block directory overruns the file",
                                ));
                            }
                        }
                    }
                }
                self.cursor.next_block();
                continue;
            }

            match self.codec.record_len() {
                Some(len) => {
                    if !self.positioned {
                        handle.seek_to(block.byte_offset + self.cursor.record * len as u64)?;
                        self.positioned = true;
                    }
                    if self.buf.len() != len {
                        self.buf.resize(len, 0);
                    }
                    handle.read_exact_buf(&mut self.buf)?;
                }
                None => {
                    if !handle.read_line_raw(&mut self.buf)? {
                        return Err(ScanError::corrupt_catalog(
                            self.catalog,
                            "block directory overruns the file",
                        ));
                    }
                }
            }
            let in_block = self.cursor.record;
            self.cursor.record += 1;
            self.cursor.ordinal += 1;

            if let Some(ceiling) = self.ceiling {
                if !self.codec.mag_precheck(&self.buf, ceiling) {
                    continue;
                }
            }
            let ctx = DecodeContext {
                block_id: block.id,
                record_ordinal: in_block,
                origin_ra_deg: block.bounds.ra_min,
                origin_dec_deg: block.bounds.dec_min,
            };
            let Some(star) = self.codec.decode(&self.buf, &ctx) else {
                log::debug!(
                    "{}: skipping malformed record {} of block {}",
                    self.catalog,
                    in_block,
                    block.id
                );
                continue;
            };
            if !region.contains(&star.coor) {
                continue;
            }
            if !star.passes_ceiling(self.ceiling) {
                continue;
            }
            return Ok(Some(star));
        }
    }

    fn close(&mut self) -> ScanResult<()> {
        self.handle = None;
        self.region = None;
        self.blocks.clear();
        self.cursor = ScanCursor::default();
        self.positioned = false;
        Ok(())
    }
}

//! Multi-file zone scan: one file per declination zone, each file carved
//! into RA chunks by in-band headers.
//!
//! Zone file layout (big-endian):
//!
//! | Bytes | Field                     |
//! |-------|---------------------------|
//! | 0..4  | magic `UZNE`              |
//! | 4..6  | format version, currently 1 |
//! | 6..8  | zone code                 |
//! | 8..12 | chunk count               |
//! | 12..16| reserved                  |
//!
//! Chunks follow back to back, each introduced by a 12-byte header:
//! starting record number (u32), record count (u32), flags (u16),
//! reserved (u16), then `count` fixed-width records. Chunk `k` of a file
//! with `n` chunks covers RA `[k*360/n, (k+1)*360/n]`; the flags word's
//! low bit marks chunks holding records that stray past the zone's
//! declination edges, which widens the chunk's pruning rectangle.
//!
//! The starting record number must equal the running record total of the
//! file. Every bulk skip is seek arithmetic, so a header that breaks the
//! sequence means the arithmetic (or the file) is wrong and the scan
//! aborts rather than serving records from misaligned offsets.
//!
//! At most one zone file is open at any moment. Moving on requires the
//! next file to be confirmed resolvable first, then the current handle
//! closes, then the next opens; a missing volume therefore leaves the
//! scan positioned to retry once the caller mounts the volume and calls
//! `read_next` again.

use byteorder::{BigEndian, ByteOrder};

use starscan_coords::{Angle, Coor};

use crate::codec::{DecodeContext, RecordCodec};
use crate::error::{ScanError, ScanResult};
use crate::locate::ResourceLocator;
use crate::region::{SkyRect, SkyRegion};
use crate::scan::{ResourceHandle, ScanCursor, StarScan};
use crate::star::CatalogStar;

const FILE_MAGIC: &[u8; 4] = b"UZNE";
const FILE_VERSION: u16 = 1;
const FILE_HEADER_LEN: usize = 16;
const CHUNK_HEADER_LEN: usize = 12;

/// Chunk flag: records stray past the zone's declination edges.
pub const FLAG_DEC_STRAYS: u16 = 0x0001;
/// How far strays may sit outside their zone, degrees.
pub const STRAY_MARGIN_DEG: f64 = 0.1;

/// One zone file of a multi-file catalog.
#[derive(Debug, Clone)]
pub struct ZoneSpec {
    /// File name, resolved through the locator's search bases.
    pub name: String,
    /// Catalog-native zone identifier; the file header must agree.
    pub zone_code: u32,
    pub dec_min: f64,
    pub dec_max: f64,
    /// Volume the file ships on, for catalogs spanning several discs.
    pub disc: Option<u8>,
}

struct ChunkState {
    record_count: u64,
    records_done: u64,
}

struct FileState {
    zone_idx: usize,
    chunk_count: u32,
    chunks_done: u32,
    chunk: Option<ChunkState>,
    /// Running record total, checked against every chunk header.
    records_seen: u64,
}

impl FileState {
    fn finished(&self) -> bool {
        self.chunk.is_none() && self.chunks_done == self.chunk_count
    }
}

pub struct ChunkedMultiFileScanner {
    catalog: &'static str,
    locator: ResourceLocator,
    zones: Vec<ZoneSpec>,
    codec: Box<dyn RecordCodec>,
    record_len: usize,
    ceiling: Option<f64>,
    region: Option<SkyRegion>,
    /// Zone indexes overlapping the region, in catalog order.
    selected: Vec<usize>,
    /// Position in `selected`: the file being scanned, or the one the
    /// scan is trying to open.
    file_pos: usize,
    handle: Option<ResourceHandle>,
    file: Option<FileState>,
    cursor: ScanCursor,
    buf: Vec<u8>,
}

impl ChunkedMultiFileScanner {
    pub fn new(
        catalog: &'static str,
        locator: ResourceLocator,
        zones: Vec<ZoneSpec>,
        codec: Box<dyn RecordCodec>,
    ) -> Self {
        Self {
            catalog,
            locator,
            zones,
            codec,
            record_len: 0,
            ceiling: None,
            region: None,
            selected: Vec::new(),
            file_pos: 0,
            handle: None,
            file: None,
            cursor: ScanCursor::default(),
            buf: Vec::new(),
        }
    }

    pub fn set_magnitude_ceiling(&mut self, ceiling: Option<f64>) {
        self.ceiling = ceiling;
    }

    pub fn cursor(&self) -> ScanCursor {
        self.cursor
    }

    /// Adds a search base, typically the mount point of a volume the
    /// caller inserted after a `VolumeNotPresent` error.
    pub fn add_search_base(&mut self, base: impl Into<std::path::PathBuf>) {
        self.locator.add_base(base);
    }

    /// Confirms the file at `file_pos` is resolvable, then swaps handles.
    /// On a resolve failure nothing is touched, so the caller can mount
    /// the missing volume and drive the scan again.
    fn advance_file(&mut self) -> ScanResult<()> {
        let zone_idx = self.selected[self.file_pos];
        let zone = &self.zones[zone_idx];
        let path = match zone.disc {
            Some(disc) => self
                .locator
                .resolve_volume(self.catalog, disc as u32, &zone.name)?,
            None => self.locator.resolve(&zone.name)?,
        };

        self.handle = None;
        self.file = None;
        let mut handle = ResourceHandle::open(path)?;
        let chunk_count = read_zone_header(&mut handle, self.catalog, zone)?;
        log::debug!(
            "{}: scanning {} ({} chunks)",
            self.catalog,
            zone.name,
            chunk_count
        );

        self.handle = Some(handle);
        self.file = Some(FileState {
            zone_idx,
            chunk_count,
            chunks_done: 0,
            chunk: None,
            records_seen: 0,
        });
        self.cursor.block = self.file_pos;
        self.cursor.record = 0;
        Ok(())
    }

    /// Advances by one unit: a chunk header, a bulk skip, or one record.
    fn step(&mut self, region: &SkyRegion) -> ScanResult<Option<CatalogStar>> {
        let record_len = self.record_len;
        let Some(handle) = self.handle.as_mut() else {
            return Err(ScanError::query_failed("scan is not open"));
        };
        let Some(file) = self.file.as_mut() else {
            return Err(ScanError::query_failed("scan is not open"));
        };
        let zone = &self.zones[file.zone_idx];

        let Some(chunk) = file.chunk.as_mut() else {
            let mut header = [0u8; CHUNK_HEADER_LEN];
            read_struct(handle, &mut header, self.catalog, "chunk header")?;
            let first_record = BigEndian::read_u32(&header[0..4]) as u64;
            let record_count = BigEndian::read_u32(&header[4..8]) as u64;
            let flags = BigEndian::read_u16(&header[8..10]);

            if first_record != file.records_seen {
                return Err(ScanError::corrupt_catalog(
                    self.catalog,
                    format!(
                        "chunk {} of {} starts at record {}, expected {}",
                        file.chunks_done, zone.name, first_record, file.records_seen
                    ),
                ));
            }

            let width = 360.0 / file.chunk_count as f64;
            let k = file.chunks_done as f64;
            let mut rect = SkyRect::new(k * width, (k + 1.0) * width, zone.dec_min, zone.dec_max);
            if flags & FLAG_DEC_STRAYS != 0 {
                rect = rect.widened_dec(STRAY_MARGIN_DEG);
            }

            if region.overlaps(&rect) {
                file.chunk = Some(ChunkState {
                    record_count,
                    records_done: 0,
                });
            } else {
                log::debug!(
                    "{}: skipping chunk {} of {} ({} records)",
                    self.catalog,
                    file.chunks_done,
                    zone.name,
                    record_count
                );
                handle.skip(record_count * record_len as u64)?;
                file.records_seen += record_count;
                file.chunks_done += 1;
            }
            return Ok(None);
        };

        if chunk.records_done == chunk.record_count {
            file.chunk = None;
            file.chunks_done += 1;
            return Ok(None);
        }

        if self.buf.len() != record_len {
            self.buf.resize(record_len, 0);
        }
        read_struct(handle, &mut self.buf, self.catalog, "record")?;
        let ordinal = file.records_seen;
        file.records_seen += 1;
        chunk.records_done += 1;
        self.cursor.record += 1;
        self.cursor.ordinal += 1;

        if let Some(ceiling) = self.ceiling {
            if !self.codec.mag_precheck(&self.buf, ceiling) {
                return Ok(None);
            }
        }
        let ctx = DecodeContext {
            block_id: zone.zone_code,
            record_ordinal: ordinal,
            ..DecodeContext::default()
        };
        let Some(star) = self.codec.decode(&self.buf, &ctx) else {
            log::debug!(
                "{}: skipping malformed record {} of {}",
                self.catalog,
                ordinal,
                zone.name
            );
            return Ok(None);
        };
        if !region.contains(&star.coor) {
            return Ok(None);
        }
        if !star.passes_ceiling(self.ceiling) {
            return Ok(None);
        }
        Ok(Some(star))
    }
}

impl StarScan for ChunkedMultiFileScanner {
    fn open(&mut self, center: Coor, field_of_view: Angle) -> ScanResult<()> {
        let Some(record_len) = self.codec.record_len() else {
            return Err(ScanError::query_failed(
                "chunked catalogs require fixed-width records",
            ));
        };
        self.record_len = record_len;

        let region = SkyRegion::new(center, field_of_view);
        // Coarse file-level prune on the zone's declination band. The
        // band is widened by the stray margin so flagged chunks cannot
        // be lost to a near-miss at the file level.
        self.selected = self
            .zones
            .iter()
            .enumerate()
            .filter(|(_, zone)| {
                let band = SkyRect::full_ra_band(zone.dec_min, zone.dec_max)
                    .widened_dec(STRAY_MARGIN_DEG);
                region.overlaps(&band)
            })
            .map(|(idx, _)| idx)
            .collect();
        log::debug!(
            "{}: {} of {} zone files selected",
            self.catalog,
            self.selected.len(),
            self.zones.len()
        );

        self.region = Some(region);
        self.file_pos = 0;
        self.handle = None;
        self.file = None;
        self.cursor = ScanCursor::default();
        Ok(())
    }

    fn read_next(&mut self) -> ScanResult<Option<CatalogStar>> {
        let Some(region) = self.region else {
            return Err(ScanError::query_failed("scan is not open"));
        };
        loop {
            if self.cursor.exhausted {
                return Ok(None);
            }
            // No file being scanned: open the one at file_pos. Covers the
            // first file, the file after a finished one, and the retry of
            // a file whose volume was missing.
            if self.handle.is_none() || self.file.is_none() {
                if self.file_pos >= self.selected.len() {
                    self.handle = None;
                    self.cursor.exhausted = true;
                    return Ok(None);
                }
                self.advance_file()?;
                continue;
            }
            if self.file.as_ref().is_some_and(FileState::finished) {
                // Drop only the per-file state; the handle stays open
                // until its successor is confirmed resolvable.
                self.file = None;
                self.file_pos += 1;
                continue;
            }
            if let Some(star) = self.step(&region)? {
                return Ok(Some(star));
            }
        }
    }

    fn close(&mut self) -> ScanResult<()> {
        self.handle = None;
        self.file = None;
        self.region = None;
        self.selected.clear();
        self.file_pos = 0;
        self.cursor = ScanCursor::default();
        Ok(())
    }
}

fn read_struct(
    handle: &mut ResourceHandle,
    buf: &mut [u8],
    catalog: &'static str,
    what: &str,
) -> ScanResult<()> {
    handle.read_exact_buf(buf).map_err(|err| match err {
        ScanError::Io(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            ScanError::corrupt_catalog(catalog, format!("{what} truncated"))
        }
        other => other,
    })
}

fn read_zone_header(
    handle: &mut ResourceHandle,
    catalog: &'static str,
    zone: &ZoneSpec,
) -> ScanResult<u32> {
    let mut header = [0u8; FILE_HEADER_LEN];
    read_struct(handle, &mut header, catalog, "zone file header")?;
    if &header[0..4] != FILE_MAGIC {
        return Err(ScanError::corrupt_catalog(
            catalog,
            format!("bad magic in {}", zone.name),
        ));
    }
    let version = BigEndian::read_u16(&header[4..6]);
    if version != FILE_VERSION {
        return Err(ScanError::corrupt_catalog(
            catalog,
            format!("unsupported version {version} in {}", zone.name),
        ));
    }
    let zone_code = BigEndian::read_u16(&header[6..8]) as u32;
    if zone_code != zone.zone_code {
        return Err(ScanError::corrupt_catalog(
            catalog,
            format!(
                "{} claims zone {zone_code}, expected {}",
                zone.name, zone.zone_code
            ),
        ));
    }
    Ok(BigEndian::read_u32(&header[8..12]))
}

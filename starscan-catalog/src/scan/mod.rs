//! Scanners: four storage strategies behind one scan contract.
//!
//! Every catalog reader is a session: [`StarScan::open`] positions the
//! scanner on the first candidate record for a region, [`StarScan::read_next`]
//! yields matching records until `None`, [`StarScan::close`] releases every
//! file handle the session opened. Which strategy applies is a property of
//! the catalog's storage, so [`CatalogScanner`] is a closed set of variants
//! rather than an open trait hierarchy:
//!
//! - [`sequential`]: one file, every record visited.
//! - [`block`]: one file in bounded blocks with a directory, pruned
//!   block-wise before any record is read.
//! - [`chunked`]: one file per declination zone, chunked by RA in-band,
//!   at most one file open at a time.
//! - [`remote`]: no files at all; a network service queried tile by tile.

pub mod block;
pub mod chunked;
pub mod remote;
pub mod sequential;

use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use starscan_coords::{Angle, Coor};

use crate::codec::gsc::{GscCodec, GscIndexLayout};
use crate::codec::ppm::PpmCodec;
use crate::codec::usno::{zone_specs, UsnoCodec, UsnoFlavor};
use crate::codec::zonepm::{ZonePmCodec, ZonePmLayout};
use crate::error::ScanResult;
use crate::locate::ResourceLocator;
use crate::star::CatalogStar;

use self::block::BlockIndexedScanner;
use self::chunked::ChunkedMultiFileScanner;
use self::remote::{RemoteTransport, TiledRemoteScanner};
use self::sequential::SequentialScanner;

/// The scan contract. Callers drive it directly or through
/// [`StarScan::read_all`]; decoders, display layers, and caches all
/// consume the same three calls.
pub trait StarScan {
    /// Starts a scan session over the cone centered at `center` with the
    /// given full field-of-view width.
    fn open(&mut self, center: Coor, field_of_view: Angle) -> ScanResult<()>;

    /// Next record inside the region, or `None` once the catalog is
    /// exhausted. Errors leave the scanner safe to `close`.
    fn read_next(&mut self) -> ScanResult<Option<CatalogStar>>;

    /// Releases every resource the session holds. Idempotent.
    fn close(&mut self) -> ScanResult<()>;

    /// Runs a whole session and collects the matches. The scanner is
    /// closed on both success and failure.
    fn read_all(&mut self, center: Coor, field_of_view: Angle) -> ScanResult<Vec<CatalogStar>> {
        self.open(center, field_of_view)?;
        let mut stars = Vec::new();
        loop {
            match self.read_next() {
                Ok(Some(star)) => stars.push(star),
                Ok(None) => break,
                Err(err) => {
                    let _ = self.close();
                    return Err(err);
                }
            }
        }
        self.close()?;
        Ok(stars)
    }
}

/// Position of a scan through its catalog. `open` resets it, every
/// `read_next` advances it; each scanner variant owns its own cursor
/// instead of inheriting shared mutable state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanCursor {
    /// Ordinal of the current scan unit: block, zone file, or tile.
    pub block: usize,
    /// Records consumed of the current unit.
    pub record: u64,
    /// Records consumed since `open`, across units.
    pub ordinal: u64,
    /// No further records will be produced.
    pub exhausted: bool,
}

impl ScanCursor {
    /// Moves to the start of the next scan unit.
    pub fn next_block(&mut self) {
        self.block += 1;
        self.record = 0;
    }
}

/// One open catalog file. Scanners drop these on `close`; the chunked
/// scanner holds at most one at any moment.
#[derive(Debug)]
pub struct ResourceHandle {
    path: PathBuf,
    reader: BufReader<File>,
}

impl ResourceHandle {
    pub fn open(path: impl Into<PathBuf>) -> ScanResult<Self> {
        let path = path.into();
        let file = File::open(&path)?;
        log::debug!("opened {}", path.display());
        Ok(Self {
            path,
            reader: BufReader::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> ScanResult<u64> {
        Ok(self.reader.get_ref().metadata()?.len())
    }

    pub fn seek_to(&mut self, offset: u64) -> ScanResult<()> {
        self.reader.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    /// Skips forward without reading. Stays inside the buffer when the
    /// target is already buffered.
    pub fn skip(&mut self, bytes: u64) -> ScanResult<()> {
        self.reader.seek_relative(bytes as i64)?;
        Ok(())
    }

    /// Fills `buf` exactly. `Ok(false)` on end of file.
    pub fn read_record(&mut self, buf: &mut [u8]) -> ScanResult<bool> {
        match self.reader.read_exact(buf) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Fills `buf` exactly; end of file is an error.
    pub fn read_exact_buf(&mut self, buf: &mut [u8]) -> ScanResult<()> {
        self.reader.read_exact(buf)?;
        Ok(())
    }

    /// Reads the next line into `buf` without its terminator.
    /// `Ok(false)` on end of file.
    pub fn read_line_raw(&mut self, buf: &mut Vec<u8>) -> ScanResult<bool> {
        buf.clear();
        if self.reader.read_until(b'\n', buf)? == 0 {
            return Ok(false);
        }
        while matches!(buf.last(), Some(b'\n' | b'\r')) {
            buf.pop();
        }
        Ok(true)
    }
}

/// A scanner wired to one supported catalog.
///
/// The closed set of storage strategies, dispatched by construction:
/// callers hold a `CatalogScanner` and drive it through [`StarScan`]
/// without caring which layout sits underneath.
pub enum CatalogScanner {
    Sequential(SequentialScanner),
    BlockIndexed(BlockIndexedScanner),
    ChunkedMultiFile(ChunkedMultiFileScanner),
    TiledRemote(TiledRemoteScanner),
}

impl CatalogScanner {
    /// Positions-and-proper-motions text catalog, `ppm.dat`.
    pub fn ppm(locator: ResourceLocator) -> Self {
        CatalogScanner::Sequential(SequentialScanner::new(
            "PPM",
            locator,
            "ppm.dat",
            Box::new(PpmCodec),
        ))
    }

    /// Guide-star catalog, `gsc11.dat` indexed by `gsc11.idx`.
    pub fn gsc11(locator: ResourceLocator) -> Self {
        CatalogScanner::BlockIndexed(BlockIndexedScanner::new(
            "GSC",
            locator,
            "gsc11.dat",
            Box::new(GscIndexLayout::new("gsc11.idx")),
            Box::new(GscCodec),
        ))
    }

    /// Compact zone proper-motion catalog, `zonepm.dat`.
    pub fn zone_compact(locator: ResourceLocator) -> Self {
        CatalogScanner::BlockIndexed(BlockIndexedScanner::new(
            "ZPM",
            locator,
            "zonepm.dat",
            Box::new(ZonePmLayout),
            Box::new(ZonePmCodec),
        ))
    }

    /// Sampled survey edition, all zone files on one volume.
    pub fn usno_sa20(locator: ResourceLocator) -> Self {
        CatalogScanner::ChunkedMultiFile(ChunkedMultiFileScanner::new(
            "USNO-SA2.0",
            locator,
            zone_specs(UsnoFlavor::Sa20),
            Box::new(UsnoCodec),
        ))
    }

    /// Full survey edition, zone files spread over eleven volumes.
    pub fn usno_a20(locator: ResourceLocator) -> Self {
        CatalogScanner::ChunkedMultiFile(ChunkedMultiFileScanner::new(
            "USNO-A2.0",
            locator,
            zone_specs(UsnoFlavor::A20),
            Box::new(UsnoCodec),
        ))
    }

    /// Remote catalog service queried in server-sized tiles.
    pub fn remote(
        name: &'static str,
        transport: Box<dyn RemoteTransport>,
        max_tile_radius: Angle,
        date: chrono::NaiveDate,
    ) -> Self {
        CatalogScanner::TiledRemote(TiledRemoteScanner::new(
            name,
            transport,
            max_tile_radius,
            date,
        ))
    }

    /// Drops records fainter than `ceiling`; records with no measured
    /// magnitude always pass.
    pub fn set_magnitude_ceiling(&mut self, ceiling: Option<f64>) {
        match self {
            CatalogScanner::Sequential(s) => s.set_magnitude_ceiling(ceiling),
            CatalogScanner::BlockIndexed(s) => s.set_magnitude_ceiling(ceiling),
            CatalogScanner::ChunkedMultiFile(s) => s.set_magnitude_ceiling(ceiling),
            CatalogScanner::TiledRemote(s) => s.set_magnitude_ceiling(ceiling),
        }
    }

    /// Current scan position.
    pub fn cursor(&self) -> ScanCursor {
        match self {
            CatalogScanner::Sequential(s) => s.cursor(),
            CatalogScanner::BlockIndexed(s) => s.cursor(),
            CatalogScanner::ChunkedMultiFile(s) => s.cursor(),
            CatalogScanner::TiledRemote(s) => s.cursor(),
        }
    }
}

impl StarScan for CatalogScanner {
    fn open(&mut self, center: Coor, field_of_view: Angle) -> ScanResult<()> {
        match self {
            CatalogScanner::Sequential(s) => s.open(center, field_of_view),
            CatalogScanner::BlockIndexed(s) => s.open(center, field_of_view),
            CatalogScanner::ChunkedMultiFile(s) => s.open(center, field_of_view),
            CatalogScanner::TiledRemote(s) => s.open(center, field_of_view),
        }
    }

    fn read_next(&mut self) -> ScanResult<Option<CatalogStar>> {
        match self {
            CatalogScanner::Sequential(s) => s.read_next(),
            CatalogScanner::BlockIndexed(s) => s.read_next(),
            CatalogScanner::ChunkedMultiFile(s) => s.read_next(),
            CatalogScanner::TiledRemote(s) => s.read_next(),
        }
    }

    fn close(&mut self) -> ScanResult<()> {
        match self {
            CatalogScanner::Sequential(s) => s.close(),
            CatalogScanner::BlockIndexed(s) => s.close(),
            CatalogScanner::ChunkedMultiFile(s) => s.close(),
            CatalogScanner::TiledRemote(s) => s.close(),
        }
    }
}

//! Whole-file scan with no pruning: every record is visited and filtered.
//!
//! Degenerate but load-bearing: text catalogs carry no block directory,
//! so the region filter is the only thing between the file and the
//! caller. Also the reference behavior the pruning scanners must match
//! (pruning may only remove records this scan would have filtered out
//! anyway).

use starscan_coords::{Angle, Coor};

use crate::codec::{DecodeContext, RecordCodec};
use crate::error::{ScanError, ScanResult};
use crate::locate::ResourceLocator;
use crate::region::SkyRegion;
use crate::scan::{ResourceHandle, ScanCursor, StarScan};
use crate::star::CatalogStar;

pub struct SequentialScanner {
    catalog: &'static str,
    locator: ResourceLocator,
    data_file: String,
    codec: Box<dyn RecordCodec>,
    ceiling: Option<f64>,
    region: Option<SkyRegion>,
    handle: Option<ResourceHandle>,
    cursor: ScanCursor,
    buf: Vec<u8>,
}

impl SequentialScanner {
    pub fn new(
        catalog: &'static str,
        locator: ResourceLocator,
        data_file: impl Into<String>,
        codec: Box<dyn RecordCodec>,
    ) -> Self {
        Self {
            catalog,
            locator,
            data_file: data_file.into(),
            codec,
            ceiling: None,
            region: None,
            handle: None,
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
}

impl StarScan for SequentialScanner {
    fn open(&mut self, center: Coor, field_of_view: Angle) -> ScanResult<()> {
        let path = self.locator.resolve(&self.data_file)?;
        self.handle = Some(ResourceHandle::open(path)?);
        self.region = Some(SkyRegion::new(center, field_of_view));
        self.cursor = ScanCursor::default();
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
            let more = match self.codec.record_len() {
                Some(len) => {
                    if self.buf.len() != len {
                        self.buf.resize(len, 0);
                    }
                    handle.read_record(&mut self.buf)?
                }
                None => handle.read_line_raw(&mut self.buf)?,
            };
            if !more {
                self.cursor.exhausted = true;
                return Ok(None);
            }

            let ordinal = self.cursor.ordinal;
            self.cursor.ordinal += 1;
            self.cursor.record += 1;

            if let Some(ceiling) = self.ceiling {
                if !self.codec.mag_precheck(&self.buf, ceiling) {
                    continue;
                }
            }

            let ctx = DecodeContext {
                record_ordinal: ordinal,
                ..DecodeContext::default()
            };
            let Some(star) = self.codec.decode(&self.buf, &ctx) else {
                log::debug!("{}: skipping malformed record {}", self.catalog, ordinal);
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
        self.cursor = ScanCursor::default();
        Ok(())
    }
}

//! Spatially-filtered scan engine for large fixed-format star catalogs.
//!
//! Extracts, from multi-gigabyte reference catalogs, only the records
//! whose position falls inside a circular sky region — without loading a
//! catalog into memory and without decoding bytes that provably cannot
//! match. Catalogs are flat files in several layouts: block-indexed
//! binary (GSC 1.1 regions, compact zone catalogs), chunked multi-file
//! (USNO SA2.0/A2.0 zone files, possibly across removable volumes),
//! plain sequential text (PPM), and a remote cone-search service queried
//! in tiles.
//!
//! # Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`region`] | [`SkyRegion`] cap filter: exact containment, conservative rectangle overlap |
//! | [`locate`] | [`ResourceLocator`]: search-path resolution, removable-volume misses |
//! | [`scan`] | The [`StarScan`] contract, [`CatalogScanner`] dispatch, the four engines |
//! | [`codec`] | Per-catalog record decoders, bit-field extraction tables |
//! | [`star`] | [`CatalogStar`], the one record shape every catalog decodes into |
//! | [`error`] | [`ScanError`], recoverable vs fatal taxonomy |
//!
//! # Quick Start
//!
//! ```ignore
//! use starscan_catalog::{CatalogScanner, ResourceLocator, StarScan};
//! use starscan_coords::{Angle, Coor};
//!
//! let locator = ResourceLocator::single("/data/gsc11");
//! let mut scanner = CatalogScanner::gsc11(locator);
//! scanner.set_magnitude_ceiling(Some(14.5));
//!
//! let center = Coor::from_degrees(83.633, -5.375)?;
//! for star in scanner.read_all(center, Angle::from_degrees(1.0))? {
//!     println!("{} {} {:?}", star.name, star.coor, star.mag);
//! }
//! ```
//!
//! Scans are sessions: `open` builds the region and resets the cursor,
//! `read_next` streams matches one at a time, `close` releases the file
//! handle. [`StarScan::read_all`] wraps the three for callers that want
//! the whole result set.
//!
//! # Features
//!
//! - **`cli`** — enables the `query` binary, a command-line cone search
//!   over any configured catalog.
//! - **`serde`** — derives `Serialize`/`Deserialize` for the result
//!   types (implied by `cli` for JSON output).

pub mod codec;
pub mod error;
pub mod locate;
pub mod region;
pub mod scan;
pub mod star;

pub use error::{ScanError, ScanResult};
pub use locate::ResourceLocator;
pub use region::{SkyRect, SkyRegion};
pub use scan::remote::{HttpTransport, RemoteTransport, TileRequest};
pub use scan::{CatalogScanner, ScanCursor, StarScan};
pub use star::CatalogStar;

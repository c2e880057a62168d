//! Error type for catalog scans.
//!
//! This module provides a unified error type [`ScanError`] covering the
//! failure modes of a catalog scan: missing files, absent removable volumes,
//! corrupt catalog structure, remote service failures, and raw I/O.
//!
//! # Error Categories
//!
//! | Variant | Use Case | Recoverable? |
//! |---------|----------|--------------|
//! | [`ResourceNotFound`](ScanError::ResourceNotFound) | No configured base holds the named file | Yes |
//! | [`VolumeNotPresent`](ScanError::VolumeNotPresent) | Catalog shard lives on a removable medium that is not mounted | Yes |
//! | [`CorruptCatalog`](ScanError::CorruptCatalog) | Header/index sanity check failed | No |
//! | [`QueryFailed`](ScanError::QueryFailed) | Remote service answered, but not in the expected shape | No |
//! | [`Io`](ScanError::Io) | Read or seek on an open stream failed | No |
//!
//! Malformed individual records are deliberately *not* an error: codecs
//! return `None` for rows that fail sanity checks and scanners skip them,
//! because large reference catalogs are known to contain occasional corrupt
//! rows and one bad row must not abort a multi-gigabyte scan.
//!
//! The two recoverable variants differ in remediation: `ResourceNotFound`
//! asks the caller for an alternate location, `VolumeNotPresent` names the
//! specific medium a human must insert. They are never collapsed.

use thiserror::Error;

/// Unified error type for catalog scans.
///
/// Use the constructor methods ([`resource_not_found`](Self::resource_not_found),
/// [`volume_not_present`](Self::volume_not_present), etc.) for consistent
/// error creation.
#[derive(Error, Debug)]
pub enum ScanError {
    /// A named logical file could not be located at any configured base.
    #[error("Resource not found: {name} (searched {searched} base locations)")]
    ResourceNotFound { name: String, searched: usize },

    /// The catalog shard exists in principle but its removable medium is
    /// not currently available. Carries the volume number so the caller
    /// can prompt for a media change.
    #[error("Volume not present: {catalog} volume {volume} is needed for {name}")]
    VolumeNotPresent {
        catalog: String,
        volume: u32,
        name: String,
    },

    /// A header or index failed a structural sanity check.
    #[error("Corrupt catalog ({catalog}): {reason}")]
    CorruptCatalog { catalog: String, reason: String },

    /// The remote service responded, but the response was not in the
    /// expected shape (missing terminator, explicit error marker, ...).
    #[error("Remote query failed: {reason}")]
    QueryFailed { reason: String },

    /// The underlying stream could not be read or sought. Fatal to the
    /// current scan; the caller must close and may re-open from scratch.
    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias for `Result<T, ScanError>`.
pub type ScanResult<T> = Result<T, ScanError>;

impl ScanError {
    /// Creates a [`ResourceNotFound`](Self::ResourceNotFound) error.
    pub fn resource_not_found(name: &str, searched: usize) -> Self {
        Self::ResourceNotFound {
            name: name.to_string(),
            searched,
        }
    }

    /// Creates a [`VolumeNotPresent`](Self::VolumeNotPresent) error.
    pub fn volume_not_present(catalog: &str, volume: u32, name: &str) -> Self {
        Self::VolumeNotPresent {
            catalog: catalog.to_string(),
            volume,
            name: name.to_string(),
        }
    }

    /// Creates a [`CorruptCatalog`](Self::CorruptCatalog) error.
    pub fn corrupt_catalog(catalog: &str, reason: impl Into<String>) -> Self {
        Self::CorruptCatalog {
            catalog: catalog.to_string(),
            reason: reason.into(),
        }
    }

    /// Creates a [`QueryFailed`](Self::QueryFailed) error.
    pub fn query_failed(reason: impl Into<String>) -> Self {
        Self::QueryFailed {
            reason: reason.into(),
        }
    }

    /// Returns `true` if caller action (an alternate location, inserting a
    /// volume) followed by a retry might succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ResourceNotFound { .. } | Self::VolumeNotPresent { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_not_found_display() {
        let err = ScanError::resource_not_found("gsc11.dat", 3);
        assert_eq!(
            err.to_string(),
            "Resource not found: gsc11.dat (searched 3 base locations)"
        );
    }

    #[test]
    fn test_volume_not_present_display() {
        let err = ScanError::volume_not_present("usno-a2.0", 7, "zone0600.cat");
        assert!(err.to_string().contains("volume 7"));
        assert!(err.to_string().contains("zone0600.cat"));
    }

    #[test]
    fn test_corrupt_catalog_display() {
        let err = ScanError::corrupt_catalog("zonepm", "band count 359, expected 360");
        assert!(err.to_string().contains("Corrupt catalog (zonepm)"));
    }

    #[test]
    fn test_recoverable() {
        assert!(ScanError::resource_not_found("x", 1).is_recoverable());
        assert!(ScanError::volume_not_present("c", 2, "x").is_recoverable());
        assert!(!ScanError::corrupt_catalog("c", "bad").is_recoverable());
        assert!(!ScanError::query_failed("truncated").is_recoverable());
        assert!(!ScanError::from(std::io::Error::other("boom")).is_recoverable());
    }

    #[test]
    fn test_send_sync() {
        fn _assert_send<T: Send>() {}
        fn _assert_sync<T: Sync>() {}
        _assert_send::<ScanError>();
        _assert_sync::<ScanError>();
    }
}

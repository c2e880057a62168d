//! Resolution of logical resource names against configured base locations.
//!
//! Catalog scans never hardcode paths: a scanner asks the locator for
//! `"zone0675.cat"` and gets back whichever configured base actually holds
//! it. Multi-volume catalogs route through [`resolve_volume`], which turns
//! "file missing" into the distinguishable "insert volume N" condition.
//!
//! [`resolve_volume`]: ResourceLocator::resolve_volume

use std::path::{Path, PathBuf};

use log::debug;

use crate::error::{ScanError, ScanResult};

/// Ordered list of directories searched for catalog files.
///
/// Pure path logic plus existence checks; nothing is opened or cached, so
/// a caller can mount a volume and retry the same resolution.
#[derive(Debug, Clone, Default)]
pub struct ResourceLocator {
    bases: Vec<PathBuf>,
}

impl ResourceLocator {
    pub fn new(bases: Vec<PathBuf>) -> Self {
        Self { bases }
    }

    /// A locator with a single search base.
    pub fn single(base: impl Into<PathBuf>) -> Self {
        Self {
            bases: vec![base.into()],
        }
    }

    pub fn bases(&self) -> &[PathBuf] {
        &self.bases
    }

    /// Appends a search base with lower priority than the existing ones.
    pub fn add_base(&mut self, base: impl Into<PathBuf>) {
        self.bases.push(base.into());
    }

    /// Returns the first base holding `name`, or [`ScanError::ResourceNotFound`].
    pub fn resolve(&self, name: &str) -> ScanResult<PathBuf> {
        for base in &self.bases {
            let candidate = base.join(name);
            if candidate.is_file() {
                debug!("resolved {} -> {}", name, candidate.display());
                return Ok(candidate);
            }
        }
        Err(ScanError::resource_not_found(name, self.bases.len()))
    }

    /// Like [`resolve`](Self::resolve) for a file that lives on a numbered
    /// removable volume. Each base is searched both directly and under a
    /// `discNN/` subdirectory. A miss is reported as
    /// [`ScanError::VolumeNotPresent`] naming the volume, so the caller can
    /// prompt for a media change instead of treating it as a dead path.
    pub fn resolve_volume(&self, catalog: &str, volume: u32, name: &str) -> ScanResult<PathBuf> {
        let disc_dir = format!("disc{:02}", volume);
        for base in &self.bases {
            for candidate in [base.join(name), base.join(&disc_dir).join(name)] {
                if candidate.is_file() {
                    debug!(
                        "resolved {} volume {} -> {}",
                        catalog,
                        volume,
                        candidate.display()
                    );
                    return Ok(candidate);
                }
            }
        }
        Err(ScanError::volume_not_present(catalog, volume, name))
    }
}

impl<P: AsRef<Path>> FromIterator<P> for ResourceLocator {
    fn from_iter<T: IntoIterator<Item = P>>(iter: T) -> Self {
        Self {
            bases: iter.into_iter().map(|p| p.as_ref().to_path_buf()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_searches_in_order() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        fs::write(second.path().join("cat.dat"), b"second").unwrap();

        let mut locator =
            ResourceLocator::new(vec![first.path().to_path_buf(), second.path().to_path_buf()]);
        let found = locator.resolve("cat.dat").unwrap();
        assert!(found.starts_with(second.path()));

        // Once the first base holds the file, it wins.
        fs::write(first.path().join("cat.dat"), b"first").unwrap();
        let found = locator.resolve("cat.dat").unwrap();
        assert!(found.starts_with(first.path()));

        locator.add_base("/nonexistent");
        assert!(locator.resolve("cat.dat").is_ok());
    }

    #[test]
    fn test_resolve_missing_is_not_found() {
        let dir = TempDir::new().unwrap();
        let locator = ResourceLocator::single(dir.path());
        let err = locator.resolve("absent.dat").unwrap_err();
        match err {
            ScanError::ResourceNotFound { name, searched } => {
                assert_eq!(name, "absent.dat");
                assert_eq!(searched, 1);
            }
            other => panic!("expected ResourceNotFound, got {other}"),
        }
    }

    #[test]
    fn test_resolve_volume_checks_disc_subdirectory() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("disc03")).unwrap();
        fs::write(dir.path().join("disc03").join("zone0150.cat"), b"z").unwrap();

        let locator = ResourceLocator::single(dir.path());
        let found = locator.resolve_volume("usno-a2.0", 3, "zone0150.cat").unwrap();
        assert!(found.ends_with("disc03/zone0150.cat"));
    }

    #[test]
    fn test_resolve_volume_missing_names_the_volume() {
        let dir = TempDir::new().unwrap();
        let locator = ResourceLocator::single(dir.path());
        let err = locator
            .resolve_volume("usno-a2.0", 7, "zone0600.cat")
            .unwrap_err();
        match err {
            ScanError::VolumeNotPresent { volume, ref name, .. } => {
                assert_eq!(volume, 7);
                assert_eq!(name, "zone0600.cat");
            }
            other => panic!("expected VolumeNotPresent, got {other}"),
        }
        assert!(err.is_recoverable());
    }
}

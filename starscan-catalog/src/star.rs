//! The decoded star record handed to callers.

use starscan_coords::Coor;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One decoded catalog record.
///
/// Codecs construct these; scanners hand them to the caller immutable.
/// Field availability varies per catalog: a photographic survey carries
/// blue/red plate magnitudes but no proper motion, an astrometric catalog
/// the reverse. Absent values stay `None` rather than being faked as 0.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CatalogStar {
    /// Catalog designation, unique within its catalog. Merged remote
    /// queries use it as the deduplication key.
    pub name: String,
    /// Position as stored by the catalog (catalog-native equinox/epoch).
    pub coor: Coor,
    /// Visual (or V-band) magnitude.
    pub mag: Option<f64>,
    /// Blue (photographic/B) magnitude.
    pub blue_mag: Option<f64>,
    /// Red (photographic/R) magnitude.
    pub red_mag: Option<f64>,
    /// Proper motion in RA (sky rate, includes the cos dec factor), mas/yr.
    pub pm_ra: Option<f64>,
    /// Proper motion in declination, mas/yr.
    pub pm_dec: Option<f64>,
    /// Position epoch as a Julian year.
    pub epoch: Option<f64>,
    /// Catalog-specific classification (object class, quality grade, or
    /// first letter of the spectral type, depending on the catalog).
    pub class: Option<u8>,
}

impl CatalogStar {
    /// A record with a name and position only; magnitudes and motion unset.
    pub fn new(name: impl Into<String>, coor: Coor) -> Self {
        Self {
            name: name.into(),
            coor,
            mag: None,
            blue_mag: None,
            red_mag: None,
            pm_ra: None,
            pm_dec: None,
            epoch: None,
            class: None,
        }
    }

    /// The magnitude used for ceiling filtering: visual when present,
    /// else red, else blue.
    pub fn filter_mag(&self) -> Option<f64> {
        self.mag.or(self.red_mag).or(self.blue_mag)
    }

    /// True if the record passes a magnitude ceiling. Records with no
    /// defined magnitude always pass.
    pub fn passes_ceiling(&self, ceiling: Option<f64>) -> bool {
        match (ceiling, self.filter_mag()) {
            (Some(c), Some(m)) => m <= c,
            _ => true,
        }
    }
}

impl std::fmt::Display for CatalogStar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.coor)?;
        if let Some(mag) = self.filter_mag() {
            write!(f, " mag {:.2}", mag)?;
        }
        Ok(())
    }
}

//! Sky position types and spherical math for catalog query engines.
//!
//! `starscan-coords` provides the value types a catalog scan passes around:
//! typed angles, validated right ascension / declination pairs, great-circle
//! separations and offsets, and equinox/epoch reduction. Pure Rust, no
//! runtime FFI.
//!
//! # Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`angle`] | [`Angle`] type, unit constructors, wrapping |
//! | [`coor`] | [`Coor`] position pair with validation and accuracy tag |
//! | [`separation`] | Great-circle distance and direct geodesic offset |
//! | [`precess`] | B1950↔J2000 rotation, proper-motion propagation |
//! | [`constants`] | Angular conversion factors |
//! | [`errors`] | [`CoordError`] and [`CoordResult`] |

pub mod angle;
pub mod constants;
pub mod coor;
pub mod errors;
pub mod precess;
pub mod separation;

pub use angle::Angle;
pub use coor::{Accuracy, Coor};
pub use errors::{CoordError, CoordResult};
pub use precess::Equinox;
pub use separation::{angular_separation, offset_by};

//! Error type for coordinate validation.

use thiserror::Error;

/// Validation failure for an angular coordinate.
#[derive(Error, Debug)]
pub enum CoordError {
    /// Value is NaN or infinite.
    #[error("{what} is not finite")]
    NotFinite { what: String },

    /// Value is outside its valid domain.
    #[error("{what} out of range: {value} not in [{min}, {max}]")]
    OutOfRange {
        what: String,
        value: f64,
        min: f64,
        max: f64,
    },
}

/// Convenience alias for `Result<T, CoordError>`.
pub type CoordResult<T> = Result<T, CoordError>;

impl CoordError {
    /// Creates a [`NotFinite`](Self::NotFinite) error.
    pub fn not_finite(what: &str) -> Self {
        Self::NotFinite {
            what: what.to_string(),
        }
    }

    /// Creates an [`OutOfRange`](Self::OutOfRange) error.
    pub fn out_of_range(what: &str, value: f64, min: f64, max: f64) -> Self {
        Self::OutOfRange {
            what: what.to_string(),
            value,
            min,
            max,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = CoordError::out_of_range("declination", 91.0, -90.0, 90.0);
        assert_eq!(
            err.to_string(),
            "declination out of range: 91 not in [-90, 90]"
        );

        let err = CoordError::not_finite("right ascension");
        assert_eq!(err.to_string(), "right ascension is not finite");
    }

    #[test]
    fn test_send_sync() {
        fn _assert_send<T: Send>() {}
        fn _assert_sync<T: Sync>() {}
        _assert_send::<CoordError>();
        _assert_sync::<CoordError>();
    }
}

//! Error types for sampling and sampling configuration

use detour::{PolyRef, Status};

/// Reasons a random point query can fail
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleError {
    #[error("navigation mesh has no valid tile")]
    NoValidTile,

    #[error("no polygon in tile slot {tile_index} passed the filter")]
    NoEligiblePolygon { tile_index: usize },

    #[error("height query failed for polygon {poly_ref}: {status}")]
    HeightQueryFailed { poly_ref: PolyRef, status: Status },
}

/// Errors raised while loading or validating a sampling configuration
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    pub fn invalid<T: ToString>(msg: T) -> Self {
        ConfigError::Invalid(msg.to_string())
    }
}

/// Result type for sampling operations
pub type Result<T> = std::result::Result<T, SampleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(SampleError::NoValidTile.to_string(), "navigation mesh has no valid tile");

        let err = SampleError::NoEligiblePolygon { tile_index: 3 };
        assert_eq!(err.to_string(), "no polygon in tile slot 3 passed the filter");

        let err = SampleError::HeightQueryFailed {
            poly_ref: PolyRef::new(0x10002),
            status: Status::OutOfBounds,
        };
        assert_eq!(
            err.to_string(),
            "height query failed for polygon 0x00010002: Position out of bounds"
        );
    }
}

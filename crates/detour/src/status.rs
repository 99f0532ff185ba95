//! Status codes reported by navigation mesh queries

/// Result type for per-polygon queries
pub type Result<T> = std::result::Result<T, Status>;

/// Why a navigation mesh operation did not succeed
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// Bad reference, non-finite position or malformed input
    #[error("Invalid parameter")]
    InvalidParam,
    /// Every tile slot is taken
    #[error("No free tile slot")]
    OutOfMemory,
    /// A tile already occupies the requested grid position
    #[error("Value already exists")]
    AlreadyExists,
    #[error("Value not found")]
    NotFound,
    /// Position lies outside the polygon
    #[error("Position out of bounds")]
    OutOfBounds,
    /// Inconsistent tile data or tile slot list
    #[error("Data corrupted")]
    DataCorrupted,
}

impl From<Status> for recast_common::Error {
    fn from(status: Status) -> Self {
        recast_common::Error::detour(status)
    }
}

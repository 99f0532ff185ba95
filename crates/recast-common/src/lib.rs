//! Shared error type and XZ-plane geometry for the Detour crates
//!
//! Geometry helpers take flat `[x, y, z, ...]` slices and ignore `y` unless
//! stated otherwise.

mod geometry;

pub use geometry::*;

/// Error types for the library
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid input mesh: {0}")]
    InvalidMesh(String),

    #[error("detour error: {0}")]
    Detour(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[cfg(feature = "std")]
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wraps a navigation mesh status or message
    pub fn detour<T: std::fmt::Display>(status: T) -> Self {
        Error::Detour(status.to_string())
    }
}

/// Result type for operations
pub type Result<T> = std::result::Result<T, Error>;

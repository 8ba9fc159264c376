//! Error types shared by both directories

use thiserror::Error;

/// Errors surfaced by directory construction and extendible insertion
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The directory reached its depth bound and the overflowing bucket still
    /// could not be split
    #[error("directory depth exhausted at {depth} bits, colliding keys cannot be separated")]
    DepthExhausted {
        /// Global depth at which splitting stopped
        depth: u32,
    },

    /// A configuration value is out of range
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

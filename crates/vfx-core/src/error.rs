//! Error types for vfx-core operations.
//!
//! The [`Error`] enum covers the ways a packed pixel buffer description can
//! be inconsistent with the data it points at.
//!
//! # Usage
//!
//! ```rust
//! use vfx_core::{Error, Result};
//!
//! fn check_channels(channels: usize) -> Result<()> {
//!     if channels != 3 && channels != 4 {
//!         return Err(Error::UnsupportedChannels { channels });
//!     }
//!     Ok(())
//! }
//! assert!(check_channels(2).is_err());
//! ```

use thiserror::Error;

use crate::format::BitDepth;

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while describing pixel buffers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// Slice length does not match `pixels * channels`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use vfx_core::Error;
    ///
    /// let err = Error::BufferSize { expected: 12, actual: 9 };
    /// assert!(err.to_string().contains("12"));
    /// ```
    #[error("buffer holds {actual} samples but {expected} were expected")]
    BufferSize {
        /// Samples required by the description
        expected: usize,
        /// Samples actually present
        actual: usize,
    },

    /// Only RGB and RGBA buffers are supported.
    #[error("unsupported channel count {channels}: expected 3 or 4")]
    UnsupportedChannels {
        /// Requested channel count
        channels: usize,
    },

    /// Storage type cannot hold the declared bit depth.
    #[error("{storage} storage cannot hold {depth} samples")]
    StorageMismatch {
        /// Name of the storage type
        storage: &'static str,
        /// Declared bit depth
        depth: BitDepth,
    },
}

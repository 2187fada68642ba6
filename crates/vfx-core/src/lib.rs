//! # vfx-core
//!
//! Core pixel-format types shared by the VFX-RS color crates.
//!
//! - [`BitDepth`] - Channel precision, with normalization scale and CLF names
//! - [`PackedImage`], [`PackedImageMut`] - Interleaved RGB/RGBA buffer descriptors
//!
//! ## Crate Structure
//!
//! ```text
//! vfx-core (this crate)
//!    ^
//!    |
//!    +-- vfx-lut (LUT containers and file decoders)
//!    +-- vfx-ocio (op pipeline, CPU and GPU backends)
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod buffer;
pub mod error;
pub mod format;

pub use buffer::{PackedImage, PackedImageMut, Samples, SamplesMut};
pub use error::{Error, Result};
pub use format::BitDepth;

/// Prelude module for convenient imports.
///
/// ```
/// use vfx_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::buffer::{PackedImage, PackedImageMut, Samples, SamplesMut};
    pub use crate::error::{Error, Result};
    pub use crate::format::BitDepth;
}

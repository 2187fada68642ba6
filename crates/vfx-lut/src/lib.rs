//! # vfx-lut
//!
//! Look-Up Table containers and file decoders for VFX color pipelines.
//!
//! # LUT Types
//!
//! - [`Lut1D`] - per-channel curves over normalized [0, 1] input
//! - [`Lut3D`] - full RGB cube, stored blue-fastest
//!
//! # Supported Formats
//!
//! - `.spi1d` - Sony Pictures Imageworks 1D ([`spi`] module)
//! - `.itx` - Iridas 3D ([`iridas_itx`] module)
//!
//! # Usage
//!
//! ```rust
//! use vfx_lut::{Interpolation, Lut1D, Lut3D};
//!
//! let curve = Lut1D::identity(1024);
//! let out = curve.apply([0.5, 0.5, 0.5]);
//!
//! let cube = Lut3D::identity(33).with_interpolation(Interpolation::Tetrahedral);
//! let rgb = cube.apply([0.5, 0.3, 0.2]);
//! ```
//!
//! # Used By
//!
//! - `vfx-ocio` - LUT ops and file transforms

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod error;
mod interp;
mod lut1d;
mod lut3d;
pub mod iridas_itx;
pub mod spi;

pub use error::{LutError, LutResult};
pub use interp::Interpolation;
pub use iridas_itx::{parse_itx, read_itx};
pub use lut1d::Lut1D;
pub use lut3d::Lut3D;
pub use spi::{Spi1d, parse_spi1d, read_spi1d};

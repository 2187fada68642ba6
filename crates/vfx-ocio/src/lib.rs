//! OpenColorIO-style color transform engine.
//!
//! This crate turns color transform descriptions into an optimized
//! pipeline of ops and runs it:
//! - Transform descriptions: matrix, range, exponent, log, fixed function,
//!   1D/3D LUTs, LUT files, groups
//! - An optimizer that drops identities, cancels inverse pairs and fuses
//!   adjacent ops
//! - A CPU engine over packed 8/10/12/16-bit integer, half and float buffers
//! - A GPU shader emitter for GLSL and HLSL
//!
//! # Quick Start
//!
//! ```
//! use vfx_ocio::{MatrixTransform, Processor, Transform, TransformDirection};
//!
//! let exposure = Transform::from(MatrixTransform::scale([2.0, 2.0, 2.0, 1.0]));
//! let processor = Processor::from_transform(&exposure, TransformDirection::Forward).unwrap();
//!
//! let cpu = processor.cpu_processor().unwrap();
//! let mut pixels = [[0.18_f32, 0.18, 0.18]];
//! cpu.apply_rgb(&mut pixels);
//! assert!((pixels[0][0] - 0.36).abs() < 1e-6);
//! ```
//!
//! # Packed Buffers
//!
//! ```
//! use vfx_ocio::{BitDepth, MatrixTransform, Processor, Transform, TransformDirection};
//! use vfx_core::{PackedImage, PackedImageMut};
//!
//! let half = Transform::from(MatrixTransform::scale([0.5, 0.5, 0.5, 1.0]));
//! let processor = Processor::from_transform(&half, TransformDirection::Forward).unwrap();
//! let cpu = processor.cpu_processor_with_bit_depths(BitDepth::U8, BitDepth::U16).unwrap();
//!
//! let src = [255_u8, 0, 128];
//! let mut dst = [0_u16; 3];
//! cpu.apply_to(
//!     &PackedImage::from_u8(&src, 3).unwrap(),
//!     &mut PackedImageMut::from_u16(&mut dst, BitDepth::U16, 3).unwrap(),
//! )
//! .unwrap();
//! assert_eq!(dst[0], 32768);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod processor;

pub mod config;
pub mod cpu;
pub mod gpu;
pub mod ops;
pub mod transform;

// Re-exports
pub use config::{OptimizationFlags, OptimizationLevel, ProcessorConfig};
pub use cpu::{CpuProcessor, OpCpu};
pub use error::{OcioError, OcioResult};
pub use gpu::{GpuLanguage, GpuShaderDesc, GpuShaderText, GpuTexture};
pub use processor::Processor;
pub use transform::{
    ExponentTransform, FileTransform, FixedFunctionTransform, GroupTransform, LogTransform,
    Lut1DTransform, Lut3DTransform, MatrixTransform, RangeStyle, RangeTransform, Transform,
    TransformDirection,
};
pub use vfx_core::BitDepth;

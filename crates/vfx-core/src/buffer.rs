//! Packed pixel buffer descriptors.
//!
//! A [`PackedImage`] (read-only) or [`PackedImageMut`] (writable) describes
//! interleaved RGB or RGBA samples: the typed slice, its [`BitDepth`], the
//! channel count and the pixel count. Descriptors never own pixel memory.
//!
//! 10 and 12-bit code values are stored in `u16` containers.
//!
//! ```rust
//! use vfx_core::{BitDepth, PackedImageMut};
//!
//! let mut pixels = [0u8, 128, 255, 64, 32, 16];
//! let image = PackedImageMut::from_u8(&mut pixels, 3).unwrap();
//! assert_eq!(image.pixels(), 2);
//! assert_eq!(image.bit_depth(), BitDepth::U8);
//! ```

use half::f16;

use crate::error::{Error, Result};
use crate::format::BitDepth;

/// Borrowed, typed sample storage.
#[derive(Debug, Clone, Copy)]
pub enum Samples<'a> {
    /// 8-bit integer samples.
    U8(&'a [u8]),
    /// 10, 12 or 16-bit integer samples.
    U16(&'a [u16]),
    /// Half float samples.
    F16(&'a [f16]),
    /// Float samples.
    F32(&'a [f32]),
}

/// Mutably borrowed, typed sample storage.
#[derive(Debug)]
pub enum SamplesMut<'a> {
    /// 8-bit integer samples.
    U8(&'a mut [u8]),
    /// 10, 12 or 16-bit integer samples.
    U16(&'a mut [u16]),
    /// Half float samples.
    F16(&'a mut [f16]),
    /// Float samples.
    F32(&'a mut [f32]),
}

impl Samples<'_> {
    fn len(&self) -> usize {
        match self {
            Self::U8(s) => s.len(),
            Self::U16(s) => s.len(),
            Self::F16(s) => s.len(),
            Self::F32(s) => s.len(),
        }
    }

    fn storage_name(&self) -> &'static str {
        match self {
            Self::U8(_) => "u8",
            Self::U16(_) => "u16",
            Self::F16(_) => "f16",
            Self::F32(_) => "f32",
        }
    }
}

impl SamplesMut<'_> {
    fn len(&self) -> usize {
        match self {
            Self::U8(s) => s.len(),
            Self::U16(s) => s.len(),
            Self::F16(s) => s.len(),
            Self::F32(s) => s.len(),
        }
    }

    fn storage_name(&self) -> &'static str {
        match self {
            Self::U8(_) => "u8",
            Self::U16(_) => "u16",
            Self::F16(_) => "f16",
            Self::F32(_) => "f32",
        }
    }
}

fn storage_holds(storage: &'static str, depth: BitDepth) -> bool {
    matches!(
        (storage, depth),
        ("u8", BitDepth::U8)
            | ("u16", BitDepth::U10 | BitDepth::U12 | BitDepth::U16)
            | ("f16", BitDepth::F16)
            | ("f32", BitDepth::F32)
    )
}

fn check_layout(
    storage: &'static str,
    len: usize,
    bit_depth: BitDepth,
    channels: usize,
    pixels: usize,
) -> Result<()> {
    if channels != 3 && channels != 4 {
        return Err(Error::UnsupportedChannels { channels });
    }
    if !storage_holds(storage, bit_depth) {
        return Err(Error::StorageMismatch {
            storage,
            depth: bit_depth,
        });
    }
    let expected = pixels * channels;
    if len != expected {
        return Err(Error::BufferSize {
            expected,
            actual: len,
        });
    }
    Ok(())
}

fn pixels_in(len: usize, channels: usize) -> Result<usize> {
    if channels != 3 && channels != 4 {
        return Err(Error::UnsupportedChannels { channels });
    }
    if len % channels != 0 {
        return Err(Error::BufferSize {
            expected: (len / channels + 1) * channels,
            actual: len,
        });
    }
    Ok(len / channels)
}

/// Read-only description of an interleaved pixel buffer.
#[derive(Debug, Clone, Copy)]
pub struct PackedImage<'a> {
    samples: Samples<'a>,
    bit_depth: BitDepth,
    channels: usize,
    pixels: usize,
}

impl<'a> PackedImage<'a> {
    /// Describes `pixels` pixels of `channels` samples each.
    pub fn new(
        samples: Samples<'a>,
        bit_depth: BitDepth,
        channels: usize,
        pixels: usize,
    ) -> Result<Self> {
        check_layout(samples.storage_name(), samples.len(), bit_depth, channels, pixels)?;
        Ok(Self {
            samples,
            bit_depth,
            channels,
            pixels,
        })
    }

    /// 8-bit buffer; pixel count derived from the slice length.
    pub fn from_u8(data: &'a [u8], channels: usize) -> Result<Self> {
        let pixels = pixels_in(data.len(), channels)?;
        Self::new(Samples::U8(data), BitDepth::U8, channels, pixels)
    }

    /// 10, 12 or 16-bit buffer.
    pub fn from_u16(data: &'a [u16], bit_depth: BitDepth, channels: usize) -> Result<Self> {
        let pixels = pixels_in(data.len(), channels)?;
        Self::new(Samples::U16(data), bit_depth, channels, pixels)
    }

    /// Half float buffer.
    pub fn from_f16(data: &'a [f16], channels: usize) -> Result<Self> {
        let pixels = pixels_in(data.len(), channels)?;
        Self::new(Samples::F16(data), BitDepth::F16, channels, pixels)
    }

    /// Float buffer.
    pub fn from_f32(data: &'a [f32], channels: usize) -> Result<Self> {
        let pixels = pixels_in(data.len(), channels)?;
        Self::new(Samples::F32(data), BitDepth::F32, channels, pixels)
    }

    /// Typed samples.
    #[inline]
    pub fn samples(&self) -> Samples<'a> {
        self.samples
    }

    /// Bit depth of every sample.
    #[inline]
    pub fn bit_depth(&self) -> BitDepth {
        self.bit_depth
    }

    /// Samples per pixel (3 or 4).
    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Number of pixels.
    #[inline]
    pub fn pixels(&self) -> usize {
        self.pixels
    }
}

/// Writable description of an interleaved pixel buffer.
#[derive(Debug)]
pub struct PackedImageMut<'a> {
    samples: SamplesMut<'a>,
    bit_depth: BitDepth,
    channels: usize,
    pixels: usize,
}

impl<'a> PackedImageMut<'a> {
    /// Describes `pixels` pixels of `channels` samples each.
    pub fn new(
        samples: SamplesMut<'a>,
        bit_depth: BitDepth,
        channels: usize,
        pixels: usize,
    ) -> Result<Self> {
        check_layout(samples.storage_name(), samples.len(), bit_depth, channels, pixels)?;
        Ok(Self {
            samples,
            bit_depth,
            channels,
            pixels,
        })
    }

    /// 8-bit buffer; pixel count derived from the slice length.
    pub fn from_u8(data: &'a mut [u8], channels: usize) -> Result<Self> {
        let pixels = pixels_in(data.len(), channels)?;
        Self::new(SamplesMut::U8(data), BitDepth::U8, channels, pixels)
    }

    /// 10, 12 or 16-bit buffer.
    pub fn from_u16(data: &'a mut [u16], bit_depth: BitDepth, channels: usize) -> Result<Self> {
        let pixels = pixels_in(data.len(), channels)?;
        Self::new(SamplesMut::U16(data), bit_depth, channels, pixels)
    }

    /// Half float buffer.
    pub fn from_f16(data: &'a mut [f16], channels: usize) -> Result<Self> {
        let pixels = pixels_in(data.len(), channels)?;
        Self::new(SamplesMut::F16(data), BitDepth::F16, channels, pixels)
    }

    /// Float buffer.
    pub fn from_f32(data: &'a mut [f32], channels: usize) -> Result<Self> {
        let pixels = pixels_in(data.len(), channels)?;
        Self::new(SamplesMut::F32(data), BitDepth::F32, channels, pixels)
    }

    /// Typed samples, mutable.
    #[inline]
    pub fn samples_mut(&mut self) -> &mut SamplesMut<'a> {
        &mut self.samples
    }

    /// Bit depth of every sample.
    #[inline]
    pub fn bit_depth(&self) -> BitDepth {
        self.bit_depth
    }

    /// Samples per pixel (3 or 4).
    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Number of pixels.
    #[inline]
    pub fn pixels(&self) -> usize {
        self.pixels
    }
}

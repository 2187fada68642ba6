//! CPU execution of a finalized op pipeline.
//!
//! Every op renders through [`OpCpu`], which works on interleaved RGBA
//! `f32` pixels. [`CpuProcessor`] chains the renderers and handles the
//! conversion from and to packed integer or half-float buffers: samples are
//! normalized by the bit depth's maximum code value on the way in and
//! rounded and clamped on the way out.
//!
//! Large buffers are processed in parallel chunks with rayon.

use std::fmt;
use std::sync::Arc;

use half::f16;
use rayon::prelude::*;
use vfx_core::{BitDepth, PackedImage, PackedImageMut, Samples, SamplesMut};

use crate::error::{OcioError, OcioResult};

/// Pixels converted per parallel work item.
const CHUNK_PIXELS: usize = 4096;

/// Per-op CPU renderer.
///
/// `apply` transforms interleaved RGBA pixels in place; the slice length is
/// always a multiple of four.
pub trait OpCpu: Send + Sync + fmt::Debug {
    /// Transforms `rgba` in place.
    fn apply(&self, rgba: &mut [f32]);
}

/// Packed sample type the processor can read and write.
trait Sample: Copy + Send + Sync {
    fn to_unit(self, scale: f32) -> f32;
    fn from_unit(v: f32, scale: f32) -> Self;
}

impl Sample for u8 {
    #[inline]
    fn to_unit(self, scale: f32) -> f32 {
        self as f32 / scale
    }

    #[inline]
    fn from_unit(v: f32, scale: f32) -> Self {
        (v * scale).round().clamp(0.0, scale) as u8
    }
}

impl Sample for u16 {
    #[inline]
    fn to_unit(self, scale: f32) -> f32 {
        self as f32 / scale
    }

    #[inline]
    fn from_unit(v: f32, scale: f32) -> Self {
        (v * scale).round().clamp(0.0, scale) as u16
    }
}

impl Sample for f16 {
    #[inline]
    fn to_unit(self, _scale: f32) -> f32 {
        self.to_f32()
    }

    #[inline]
    fn from_unit(v: f32, _scale: f32) -> Self {
        f16::from_f32(v)
    }
}

impl Sample for f32 {
    #[inline]
    fn to_unit(self, _scale: f32) -> f32 {
        self
    }

    #[inline]
    fn from_unit(v: f32, _scale: f32) -> Self {
        v
    }
}

fn unpack<T: Sample>(src: &[T], channels: usize, scale: f32, rgba: &mut [f32]) {
    for (px, out) in src.chunks_exact(channels).zip(rgba.chunks_exact_mut(4)) {
        out[0] = px[0].to_unit(scale);
        out[1] = px[1].to_unit(scale);
        out[2] = px[2].to_unit(scale);
        out[3] = if channels == 4 { px[3].to_unit(scale) } else { 1.0 };
    }
}

fn pack<T: Sample>(rgba: &[f32], channels: usize, scale: f32, dst: &mut [T]) {
    for (px, out) in rgba.chunks_exact(4).zip(dst.chunks_exact_mut(channels)) {
        for c in 0..channels {
            out[c] = T::from_unit(px[c], scale);
        }
    }
}

/// Chain of per-op renderers bound to input and output bit depths.
///
/// Cheap to clone and safe to share between threads.
///
/// # Example
///
/// ```
/// use vfx_ocio::{MatrixTransform, Processor, Transform, TransformDirection};
///
/// let t = Transform::Matrix(MatrixTransform::scale([2.0, 2.0, 2.0, 1.0]));
/// let cpu = Processor::from_transform(&t, TransformDirection::Forward)
///     .unwrap()
///     .cpu_processor()
///     .unwrap();
///
/// let mut px = [[0.1_f32, 0.2, 0.3]];
/// cpu.apply_rgb(&mut px);
/// assert!((px[0][2] - 0.6).abs() < 1e-6);
/// ```
#[derive(Debug, Clone)]
pub struct CpuProcessor {
    renderers: Vec<Arc<dyn OpCpu>>,
    input_bit_depth: BitDepth,
    output_bit_depth: BitDepth,
}

impl CpuProcessor {
    pub(crate) fn new(
        renderers: Vec<Arc<dyn OpCpu>>,
        input_bit_depth: BitDepth,
        output_bit_depth: BitDepth,
    ) -> OcioResult<Self> {
        for depth in [input_bit_depth, output_bit_depth] {
            if depth.is_unknown() {
                return Err(OcioError::InvalidBuffer(
                    "CPU processor bit depth must be known".into(),
                ));
            }
        }
        Ok(Self {
            renderers,
            input_bit_depth,
            output_bit_depth,
        })
    }

    /// Bit depth expected from source buffers.
    pub fn input_bit_depth(&self) -> BitDepth {
        self.input_bit_depth
    }

    /// Bit depth written to destination buffers.
    pub fn output_bit_depth(&self) -> BitDepth {
        self.output_bit_depth
    }

    /// True when no renderer is chained.
    pub fn is_noop(&self) -> bool {
        self.renderers.is_empty()
    }

    /// Runs every renderer over normalized RGBA pixels.
    pub fn apply_normalized(&self, rgba: &mut [f32]) {
        for r in &self.renderers {
            r.apply(rgba);
        }
    }

    /// Transforms RGB float pixels in place.
    pub fn apply_rgb(&self, pixels: &mut [[f32; 3]]) {
        pixels.par_chunks_mut(CHUNK_PIXELS).for_each(|chunk| {
            let mut rgba: Vec<f32> = chunk
                .iter()
                .flat_map(|p| [p[0], p[1], p[2], 1.0])
                .collect();
            self.apply_normalized(&mut rgba);
            for (p, out) in chunk.iter_mut().zip(rgba.chunks_exact(4)) {
                *p = [out[0], out[1], out[2]];
            }
        });
    }

    /// Transforms RGBA float pixels in place.
    pub fn apply_rgba(&self, pixels: &mut [[f32; 4]]) {
        pixels.par_chunks_mut(CHUNK_PIXELS).for_each(|chunk| {
            let flat = chunk.as_flattened_mut();
            self.apply_normalized(flat);
        });
    }

    /// Transforms a packed buffer in place.
    ///
    /// In-place processing needs the buffer's bit depth to equal both the
    /// input and the output bit depth of the processor.
    pub fn apply(&self, image: &mut PackedImageMut<'_>) -> OcioResult<()> {
        let depth = image.bit_depth();
        if depth != self.input_bit_depth || depth != self.output_bit_depth {
            return Err(OcioError::InvalidBuffer(format!(
                "in-place buffer is {depth} but the processor converts {} to {}",
                self.input_bit_depth, self.output_bit_depth
            )));
        }
        let channels = image.channels();
        let scale = depth.max_value();
        match image.samples_mut() {
            SamplesMut::U8(s) => self.run_in_place(&mut **s, channels, scale),
            SamplesMut::U16(s) => self.run_in_place(&mut **s, channels, scale),
            SamplesMut::F16(s) => self.run_in_place(&mut **s, channels, scale),
            SamplesMut::F32(s) => self.run_in_place(&mut **s, channels, scale),
        }
        Ok(())
    }

    /// Transforms `src` into `dst`.
    ///
    /// Buffers must hold the same number of pixels and match the processor's
    /// input and output bit depths; channel counts may differ.
    pub fn apply_to(&self, src: &PackedImage<'_>, dst: &mut PackedImageMut<'_>) -> OcioResult<()> {
        if src.bit_depth() != self.input_bit_depth {
            return Err(OcioError::InvalidBuffer(format!(
                "source buffer is {} but the processor expects {}",
                src.bit_depth(),
                self.input_bit_depth
            )));
        }
        if dst.bit_depth() != self.output_bit_depth {
            return Err(OcioError::InvalidBuffer(format!(
                "destination buffer is {} but the processor writes {}",
                dst.bit_depth(),
                self.output_bit_depth
            )));
        }
        if src.pixels() != dst.pixels() {
            return Err(OcioError::InvalidBuffer(format!(
                "source has {} pixels, destination has {}",
                src.pixels(),
                dst.pixels()
            )));
        }

        let in_ch = src.channels();
        let out_ch = dst.channels();
        let in_scale = self.input_bit_depth.max_value();
        let out_scale = self.output_bit_depth.max_value();
        match src.samples() {
            Samples::U8(s) => self.run_into(s, in_ch, in_scale, dst.samples_mut(), out_ch, out_scale),
            Samples::U16(s) => self.run_into(s, in_ch, in_scale, dst.samples_mut(), out_ch, out_scale),
            Samples::F16(s) => self.run_into(s, in_ch, in_scale, dst.samples_mut(), out_ch, out_scale),
            Samples::F32(s) => self.run_into(s, in_ch, in_scale, dst.samples_mut(), out_ch, out_scale),
        }
        Ok(())
    }

    fn run_in_place<T: Sample>(&self, samples: &mut [T], channels: usize, scale: f32) {
        samples
            .par_chunks_mut(CHUNK_PIXELS * channels)
            .for_each(|chunk| {
                let mut rgba = vec![0.0f32; chunk.len() / channels * 4];
                unpack(chunk, channels, scale, &mut rgba);
                self.apply_normalized(&mut rgba);
                pack(&rgba, channels, scale, chunk);
            });
    }

    fn run_into<S: Sample>(
        &self,
        src: &[S],
        in_ch: usize,
        in_scale: f32,
        dst: &mut SamplesMut<'_>,
        out_ch: usize,
        out_scale: f32,
    ) {
        match dst {
            SamplesMut::U8(d) => self.run_pair(src, in_ch, in_scale, &mut **d, out_ch, out_scale),
            SamplesMut::U16(d) => self.run_pair(src, in_ch, in_scale, &mut **d, out_ch, out_scale),
            SamplesMut::F16(d) => self.run_pair(src, in_ch, in_scale, &mut **d, out_ch, out_scale),
            SamplesMut::F32(d) => self.run_pair(src, in_ch, in_scale, &mut **d, out_ch, out_scale),
        }
    }

    fn run_pair<S: Sample, D: Sample>(
        &self,
        src: &[S],
        in_ch: usize,
        in_scale: f32,
        dst: &mut [D],
        out_ch: usize,
        out_scale: f32,
    ) {
        dst.par_chunks_mut(CHUNK_PIXELS * out_ch)
            .zip(src.par_chunks(CHUNK_PIXELS * in_ch))
            .for_each(|(out, inp)| {
                let mut rgba = vec![0.0f32; inp.len() / in_ch * 4];
                unpack(inp, in_ch, in_scale, &mut rgba);
                self.apply_normalized(&mut rgba);
                pack(&rgba, out_ch, out_scale, out);
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Scale(f32);

    impl OpCpu for Scale {
        fn apply(&self, rgba: &mut [f32]) {
            for px in rgba.chunks_exact_mut(4) {
                px[0] *= self.0;
                px[1] *= self.0;
                px[2] *= self.0;
            }
        }
    }

    fn scaler(depth_in: BitDepth, depth_out: BitDepth, k: f32) -> CpuProcessor {
        CpuProcessor::new(vec![Arc::new(Scale(k))], depth_in, depth_out).unwrap()
    }

    #[test]
    fn u8_round_trip_is_exact() {
        let cpu = CpuProcessor::new(vec![], BitDepth::U8, BitDepth::U8).unwrap();
        let mut data: Vec<u8> = (0..=255).flat_map(|v| [v, v, v]).collect();
        let expected = data.clone();
        let mut image = PackedImageMut::from_u8(&mut data, 3).unwrap();
        cpu.apply(&mut image).unwrap();
        assert_eq!(data, expected);
    }

    #[test]
    fn u16_output_rounds_and_clamps() {
        let cpu = scaler(BitDepth::U16, BitDepth::U16, 2.0);
        let mut data = vec![100u16, 40000, 65535, 65535];
        let mut image = PackedImageMut::from_u16(&mut data, BitDepth::U16, 4).unwrap();
        cpu.apply(&mut image).unwrap();
        assert_eq!(data, vec![200, 65535, 65535, 65535]);
    }

    #[test]
    fn depth_mismatch_rejected_in_place() {
        let cpu = scaler(BitDepth::U8, BitDepth::F32, 1.0);
        let mut data = vec![0u8; 6];
        let mut image = PackedImageMut::from_u8(&mut data, 3).unwrap();
        assert!(matches!(
            cpu.apply(&mut image),
            Err(OcioError::InvalidBuffer(_))
        ));
    }

    #[test]
    fn converts_between_depths_and_layouts() {
        let cpu = CpuProcessor::new(vec![], BitDepth::U8, BitDepth::F32).unwrap();
        let src_data = [0u8, 255, 51];
        let src = PackedImage::from_u8(&src_data, 3).unwrap();
        let mut out = [0.0f32; 4];
        let mut dst = PackedImageMut::from_f32(&mut out, 4).unwrap();
        cpu.apply_to(&src, &mut dst).unwrap();
        assert_eq!(out, [0.0, 1.0, 0.2, 1.0]);
    }

    #[test]
    fn pixel_count_must_match() {
        let cpu = CpuProcessor::new(vec![], BitDepth::F32, BitDepth::F32).unwrap();
        let src_data = [0.0f32; 6];
        let src = PackedImage::from_f32(&src_data, 3).unwrap();
        let mut out = [0.0f32; 3];
        let mut dst = PackedImageMut::from_f32(&mut out, 3).unwrap();
        assert!(cpu.apply_to(&src, &mut dst).is_err());
    }

    #[test]
    fn half_float_passes_through() {
        let cpu = scaler(BitDepth::F16, BitDepth::F16, 0.5);
        let mut data = vec![f16::from_f32(1.0), f16::from_f32(-2.0), f16::from_f32(4.0)];
        let mut image = PackedImageMut::from_f16(&mut data, 3).unwrap();
        cpu.apply(&mut image).unwrap();
        assert_eq!(data[0].to_f32(), 0.5);
        assert_eq!(data[1].to_f32(), -1.0);
        assert_eq!(data[2].to_f32(), 2.0);
    }

    #[test]
    fn large_rgb_buffer_processed_in_chunks() {
        let cpu = scaler(BitDepth::F32, BitDepth::F32, 3.0);
        let mut px = vec![[1.0f32, 2.0, 3.0]; CHUNK_PIXELS * 2 + 17];
        cpu.apply_rgb(&mut px);
        assert!(px.iter().all(|p| *p == [3.0, 6.0, 9.0]));
    }

    #[test]
    fn unknown_depth_rejected() {
        assert!(CpuProcessor::new(vec![], BitDepth::Unknown, BitDepth::F32).is_err());
    }
}

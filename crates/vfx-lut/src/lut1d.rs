//! 1-dimensional lookup table.
//!
//! A 1D LUT applies an independent curve to each of R, G and B. Samples are
//! spread evenly over the normalized [0, 1] input domain; inputs outside it
//! clamp to the end samples. Scaling an arbitrary input range into [0, 1] is
//! the job of a separate op in front of the LUT.

use vfx_core::BitDepth;

use crate::{Interpolation, LutError, LutResult};

/// A 1-dimensional RGB lookup table.
///
/// # Example
///
/// ```rust
/// use vfx_lut::Lut1D;
///
/// let lut = Lut1D::from_fn(256, |x| [x * x, x * x, x * x]).unwrap();
/// let out = lut.apply([0.5, 0.5, 0.5]);
/// assert!((out[0] - 0.25).abs() < 1e-3);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Lut1D {
    /// One RGB triple per sample.
    pub data: Vec<[f32; 3]>,
    /// Evaluation method.
    pub interpolation: Interpolation,
    /// Bit depth the values were stored at in their source file.
    pub file_output_bit_depth: BitDepth,
}

impl Lut1D {
    /// Creates an identity (pass-through) 1D LUT.
    ///
    /// `size` is clamped to at least 2.
    ///
    /// ```rust
    /// use vfx_lut::Lut1D;
    ///
    /// let lut = Lut1D::identity(1024);
    /// assert!(lut.is_identity(1e-6));
    /// ```
    pub fn identity(size: usize) -> Self {
        let size = size.max(2);
        let scale = 1.0 / (size - 1) as f32;
        let data = (0..size)
            .map(|i| {
                let v = i as f32 * scale;
                [v, v, v]
            })
            .collect();
        Self {
            data,
            interpolation: Interpolation::Linear,
            file_output_bit_depth: BitDepth::F32,
        }
    }

    /// Creates a LUT from RGB samples.
    pub fn from_rgb(data: Vec<[f32; 3]>) -> LutResult<Self> {
        if data.len() < 2 {
            return Err(LutError::InvalidSize(format!(
                "1D LUT needs at least 2 entries, got {}",
                data.len()
            )));
        }
        Ok(Self {
            data,
            interpolation: Interpolation::Linear,
            file_output_bit_depth: BitDepth::F32,
        })
    }

    /// Creates a LUT whose three channels share one curve.
    pub fn from_mono(data: &[f32]) -> LutResult<Self> {
        Self::from_rgb(data.iter().map(|&v| [v, v, v]).collect())
    }

    /// Samples `f` at `size` evenly spaced points of [0, 1].
    pub fn from_fn<F: Fn(f32) -> [f32; 3]>(size: usize, f: F) -> LutResult<Self> {
        if size < 2 {
            return Err(LutError::InvalidSize(format!(
                "1D LUT needs at least 2 entries, got {size}"
            )));
        }
        let scale = 1.0 / (size - 1) as f32;
        Self::from_rgb((0..size).map(|i| f(i as f32 * scale)).collect())
    }

    /// Sets the interpolation method.
    pub fn with_interpolation(mut self, interp: Interpolation) -> Self {
        self.interpolation = interp;
        self
    }

    /// Sets the file output bit depth.
    pub fn with_file_output_bit_depth(mut self, depth: BitDepth) -> Self {
        self.file_output_bit_depth = depth;
        self
    }

    /// Number of samples per channel.
    #[inline]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// True when every sample sits on the identity line within `tolerance`.
    pub fn is_identity(&self, tolerance: f32) -> bool {
        let n = self.size();
        if n < 2 {
            return false;
        }
        let scale = 1.0 / (n - 1) as f32;
        self.data.iter().enumerate().all(|(i, rgb)| {
            let expected = i as f32 * scale;
            rgb.iter().all(|v| (v - expected).abs() <= tolerance)
        })
    }

    /// True when every channel is non-decreasing, so it can be inverted.
    pub fn is_non_decreasing(&self) -> bool {
        self.data
            .windows(2)
            .all(|w| (0..3).all(|c| w[1][c] >= w[0][c]))
    }

    /// Evaluates the curves for one RGB triple.
    ///
    /// A LUT built by hand with a single entry returns that entry; an empty
    /// one passes values through.
    pub fn apply(&self, rgb: [f32; 3]) -> [f32; 3] {
        [
            self.eval_channel(0, rgb[0]),
            self.eval_channel(1, rgb[1]),
            self.eval_channel(2, rgb[2]),
        ]
    }

    fn eval_channel(&self, channel: usize, value: f32) -> f32 {
        let n = self.size();
        match n {
            0 => return value,
            1 => return self.data[0][channel],
            _ => {}
        }
        let last = (n - 1) as f32;
        let t = value.clamp(0.0, 1.0) * last;
        match self.interpolation.for_1d() {
            Interpolation::Nearest => {
                let idx = (t.round() as usize).min(n - 1);
                self.data[idx][channel]
            }
            _ => {
                let idx0 = (t.floor() as usize).min(n - 2);
                let frac = t - idx0 as f32;
                let a = self.data[idx0][channel];
                let b = self.data[idx0 + 1][channel];
                a + (b - a) * frac
            }
        }
    }

    /// Evaluates the inverse curves for one RGB triple.
    ///
    /// Each channel must be non-decreasing. Values outside the sample range
    /// clamp to its ends; on flat stretches the lowest input wins.
    pub fn apply_inverse(&self, rgb: [f32; 3]) -> [f32; 3] {
        [
            self.invert_channel(0, rgb[0]),
            self.invert_channel(1, rgb[1]),
            self.invert_channel(2, rgb[2]),
        ]
    }

    fn invert_channel(&self, channel: usize, value: f32) -> f32 {
        let n = self.size();
        if n < 2 {
            return value.clamp(0.0, 1.0);
        }
        let first = self.data[0][channel];
        let last = self.data[n - 1][channel];
        // max/min instead of clamp: a decreasing channel must not panic
        let y = value.max(first).min(last);

        // first index whose sample is >= y
        let (mut lo, mut hi) = (0usize, n);
        while lo < hi {
            let mid = (lo + hi) / 2;
            if self.data[mid][channel] < y {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        if lo == 0 {
            return 0.0;
        }
        if lo >= n {
            return 1.0;
        }
        let v0 = self.data[lo - 1][channel];
        let v1 = self.data[lo][channel];
        let frac = (y - v0) / (v1 - v0);
        ((lo - 1) as f32 + frac) / (n - 1) as f32
    }

    /// Resamples `self` followed by `next` into one LUT of `size` samples.
    ///
    /// Exact at the new sample positions only.
    pub fn compose(&self, next: &Lut1D, size: usize) -> LutResult<Self> {
        Ok(Self::from_fn(size, |x| next.apply(self.apply([x, x, x])))?
            .with_interpolation(self.interpolation)
            .with_file_output_bit_depth(next.file_output_bit_depth))
    }

    /// Bakes the inverse curves into a forward LUT of `size` samples.
    pub fn bake_inverse(&self, size: usize) -> LutResult<Self> {
        Self::from_fn(size, |x| self.apply_inverse([x, x, x]))
    }
}

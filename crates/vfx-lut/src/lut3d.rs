//! 3-dimensional lookup table.
//!
//! Grid samples are stored blue-fastest: the entry for grid point
//! `(r, g, b)` lives at `(r * size + g) * size + b`. Files that list red
//! fastest (Iridas, Resolve) go through [`Lut3D::from_red_fastest`].
//! Inputs are normalized [0, 1] RGB and clamp to the cube.

use vfx_core::BitDepth;

use crate::{Interpolation, LutError, LutResult};

/// A 3D RGB lookup table.
#[derive(Debug, Clone, PartialEq)]
pub struct Lut3D {
    /// Grid entries, blue-fastest.
    pub data: Vec<[f32; 3]>,
    /// Grid points per axis.
    pub size: usize,
    /// Evaluation method.
    pub interpolation: Interpolation,
    /// Bit depth the values were stored at in their source file.
    pub file_output_bit_depth: BitDepth,
}

impl Lut3D {
    /// Creates an identity 3D LUT.
    ///
    /// # Example
    ///
    /// ```rust
    /// use vfx_lut::Lut3D;
    ///
    /// let lut = Lut3D::identity(17);
    /// let result = lut.apply([0.5, 0.3, 0.8]);
    /// assert!((result[0] - 0.5).abs() < 1e-5);
    /// ```
    pub fn identity(size: usize) -> Self {
        let size = size.max(2);
        let scale = 1.0 / (size - 1) as f32;
        let mut data = Vec::with_capacity(size * size * size);
        for r in 0..size {
            for g in 0..size {
                for b in 0..size {
                    data.push([r as f32 * scale, g as f32 * scale, b as f32 * scale]);
                }
            }
        }
        Self {
            data,
            size,
            interpolation: Interpolation::Linear,
            file_output_bit_depth: BitDepth::F32,
        }
    }

    /// Creates a 3D LUT from blue-fastest data.
    pub fn from_data(data: Vec<[f32; 3]>, size: usize) -> LutResult<Self> {
        check_entries(data.len(), size)?;
        Ok(Self {
            data,
            size,
            interpolation: Interpolation::Linear,
            file_output_bit_depth: BitDepth::F32,
        })
    }

    /// Creates a 3D LUT from red-fastest data, reordering to blue-fastest.
    pub fn from_red_fastest(data: &[[f32; 3]], size: usize) -> LutResult<Self> {
        check_entries(data.len(), size)?;
        let mut reordered = vec![[0.0f32; 3]; data.len()];
        for b in 0..size {
            for g in 0..size {
                for r in 0..size {
                    reordered[(r * size + g) * size + b] = data[(b * size + g) * size + r];
                }
            }
        }
        Self::from_data(reordered, size)
    }

    /// Samples `f` on a `size`^3 grid over the unit cube.
    pub fn from_fn<F: Fn([f32; 3]) -> [f32; 3]>(size: usize, f: F) -> LutResult<Self> {
        if size < 2 {
            return Err(LutError::InvalidSize(format!(
                "3D LUT needs at least 2 points per axis, got {size}"
            )));
        }
        let identity = Self::identity(size);
        Self::from_data(identity.data.iter().map(|&p| f(p)).collect(), size)
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

    /// Returns the total number of entries in the LUT.
    #[inline]
    pub fn entry_count(&self) -> usize {
        self.size * self.size * self.size
    }

    /// Returns the index for a given (r, g, b) grid position.
    #[inline]
    pub fn index(&self, r: usize, g: usize, b: usize) -> usize {
        (r * self.size + g) * self.size + b
    }

    /// Gets the value at grid position (r, g, b).
    #[inline]
    pub fn get(&self, r: usize, g: usize, b: usize) -> [f32; 3] {
        self.data[self.index(r, g, b)]
    }

    /// True when every grid point maps to its own coordinate within `tolerance`.
    pub fn is_identity(&self, tolerance: f32) -> bool {
        let scale = 1.0 / (self.size - 1) as f32;
        (0..self.size).all(|r| {
            (0..self.size).all(|g| {
                (0..self.size).all(|b| {
                    let v = self.get(r, g, b);
                    (v[0] - r as f32 * scale).abs() <= tolerance
                        && (v[1] - g as f32 * scale).abs() <= tolerance
                        && (v[2] - b as f32 * scale).abs() <= tolerance
                })
            })
        })
    }

    /// Applies the LUT to an RGB value.
    pub fn apply(&self, rgb: [f32; 3]) -> [f32; 3] {
        match self.interpolation.for_3d() {
            Interpolation::Nearest => self.apply_nearest(rgb),
            Interpolation::Tetrahedral => self.apply_tetrahedral(rgb),
            _ => self.apply_trilinear(rgb),
        }
    }

    /// Nearest-neighbor lookup.
    pub fn apply_nearest(&self, rgb: [f32; 3]) -> [f32; 3] {
        let (r, g, b) = normalize(rgb);
        let n = (self.size - 1) as f32;
        let last = self.size - 1;
        self.get(
            ((r * n).round() as usize).min(last),
            ((g * n).round() as usize).min(last),
            ((b * n).round() as usize).min(last),
        )
    }

    /// Trilinear interpolation.
    pub fn apply_trilinear(&self, rgb: [f32; 3]) -> [f32; 3] {
        let (r, g, b) = normalize(rgb);
        let n = (self.size - 1) as f32;

        let ri = ((r * n).floor() as usize).min(self.size - 2);
        let gi = ((g * n).floor() as usize).min(self.size - 2);
        let bi = ((b * n).floor() as usize).min(self.size - 2);

        let rf = r * n - ri as f32;
        let gf = g * n - gi as f32;
        let bf = b * n - bi as f32;

        let c000 = self.get(ri, gi, bi);
        let c100 = self.get(ri + 1, gi, bi);
        let c010 = self.get(ri, gi + 1, bi);
        let c110 = self.get(ri + 1, gi + 1, bi);
        let c001 = self.get(ri, gi, bi + 1);
        let c101 = self.get(ri + 1, gi, bi + 1);
        let c011 = self.get(ri, gi + 1, bi + 1);
        let c111 = self.get(ri + 1, gi + 1, bi + 1);

        let mut result = [0.0f32; 3];
        for i in 0..3 {
            let c00 = c000[i] * (1.0 - rf) + c100[i] * rf;
            let c10 = c010[i] * (1.0 - rf) + c110[i] * rf;
            let c01 = c001[i] * (1.0 - rf) + c101[i] * rf;
            let c11 = c011[i] * (1.0 - rf) + c111[i] * rf;
            let c0 = c00 * (1.0 - gf) + c10 * gf;
            let c1 = c01 * (1.0 - gf) + c11 * gf;
            result[i] = c0 * (1.0 - bf) + c1 * bf;
        }
        result
    }

    /// Tetrahedral interpolation.
    pub fn apply_tetrahedral(&self, rgb: [f32; 3]) -> [f32; 3] {
        let (r, g, b) = normalize(rgb);
        let n = (self.size - 1) as f32;

        let ri = ((r * n).floor() as usize).min(self.size - 2);
        let gi = ((g * n).floor() as usize).min(self.size - 2);
        let bi = ((b * n).floor() as usize).min(self.size - 2);

        let rf = r * n - ri as f32;
        let gf = g * n - gi as f32;
        let bf = b * n - bi as f32;

        let c000 = self.get(ri, gi, bi);
        let c100 = self.get(ri + 1, gi, bi);
        let c010 = self.get(ri, gi + 1, bi);
        let c110 = self.get(ri + 1, gi + 1, bi);
        let c001 = self.get(ri, gi, bi + 1);
        let c101 = self.get(ri + 1, gi, bi + 1);
        let c011 = self.get(ri, gi + 1, bi + 1);
        let c111 = self.get(ri + 1, gi + 1, bi + 1);

        let mut result = [0.0f32; 3];
        for i in 0..3 {
            result[i] = if rf > gf {
                if gf > bf {
                    c000[i] + rf * (c100[i] - c000[i]) + gf * (c110[i] - c100[i]) + bf * (c111[i] - c110[i])
                } else if rf > bf {
                    c000[i] + rf * (c100[i] - c000[i]) + bf * (c101[i] - c100[i]) + gf * (c111[i] - c101[i])
                } else {
                    c000[i] + bf * (c001[i] - c000[i]) + rf * (c101[i] - c001[i]) + gf * (c111[i] - c101[i])
                }
            } else if gf > bf {
                if rf > bf {
                    c000[i] + gf * (c010[i] - c000[i]) + rf * (c110[i] - c010[i]) + bf * (c111[i] - c110[i])
                } else {
                    c000[i] + gf * (c010[i] - c000[i]) + bf * (c011[i] - c010[i]) + rf * (c111[i] - c011[i])
                }
            } else {
                c000[i] + bf * (c001[i] - c000[i]) + gf * (c011[i] - c001[i]) + rf * (c111[i] - c011[i])
            };
        }
        result
    }

    /// Inverts the LUT with damped Newton-Raphson iteration on the
    /// tetrahedral evaluation.
    ///
    /// The result samples the inverse on a grid of the same size. Works for
    /// LUTs that are monotonic along each axis; folded regions converge to
    /// one of their preimages.
    pub fn invert(&self) -> LutResult<Self> {
        const MAX_ITERS: usize = 30;
        const TOLERANCE: f32 = 1e-6;
        const DAMPING: f32 = 0.8;
        const DELTA: f32 = 1e-4;

        let size = self.size;
        let scale = 1.0 / (size - 1) as f32;
        let mut inverted = Vec::with_capacity(self.entry_count());

        for ri in 0..size {
            for gi in 0..size {
                for bi in 0..size {
                    let target = [ri as f32 * scale, gi as f32 * scale, bi as f32 * scale];
                    let mut guess = target;

                    for _ in 0..MAX_ITERS {
                        let eval = self.apply_tetrahedral(guess);
                        let err = [eval[0] - target[0], eval[1] - target[1], eval[2] - target[2]];
                        let err_mag = (err[0] * err[0] + err[1] * err[1] + err[2] * err[2]).sqrt();
                        if err_mag < TOLERANCE {
                            break;
                        }

                        let mut jacobian = [[0.0f32; 3]; 3];
                        for j in 0..3 {
                            let mut probe = guess;
                            // step backwards at the upper face so the probe stays inside
                            let step = if probe[j] + DELTA > 1.0 { -DELTA } else { DELTA };
                            probe[j] += step;
                            let eval_probe = self.apply_tetrahedral(probe);
                            for i in 0..3 {
                                jacobian[i][j] = (eval_probe[i] - eval[i]) / step;
                            }
                        }

                        let dx = solve_3x3(&jacobian, &[-err[0], -err[1], -err[2]]);
                        for k in 0..3 {
                            guess[k] = (guess[k] + DAMPING * dx[k]).clamp(0.0, 1.0);
                        }
                    }
                    inverted.push(guess);
                }
            }
        }

        Ok(Self {
            data: inverted,
            size,
            interpolation: self.interpolation,
            file_output_bit_depth: self.file_output_bit_depth,
        })
    }
}

fn check_entries(len: usize, size: usize) -> LutResult<()> {
    if size < 2 {
        return Err(LutError::InvalidSize(format!(
            "3D LUT needs at least 2 points per axis, got {size}"
        )));
    }
    let expected = size * size * size;
    if len != expected {
        return Err(LutError::InvalidSize(format!(
            "expected {expected} entries for size {size}, got {len}"
        )));
    }
    Ok(())
}

#[inline]
fn normalize(rgb: [f32; 3]) -> (f32, f32, f32) {
    (
        rgb[0].clamp(0.0, 1.0),
        rgb[1].clamp(0.0, 1.0),
        rgb[2].clamp(0.0, 1.0),
    )
}

fn det3(m: &[[f32; 3]; 3]) -> f32 {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

/// Newton step for [`Lut3D::invert`]: solves `jacobian * dx = rhs` by
/// Cramer's rule.
///
/// A near-singular Jacobian (a flat stretch of the grid) gives a zero step,
/// which leaves the guess where it is instead of jumping out of the cube.
fn solve_3x3(jacobian: &[[f32; 3]; 3], rhs: &[f32; 3]) -> [f32; 3] {
    let det = det3(jacobian);
    if det.abs() < 1e-10 {
        return [0.0; 3];
    }
    std::array::from_fn(|col| {
        let mut m = *jacobian;
        for (row, value) in rhs.iter().enumerate() {
            m[row][col] = *value;
        }
        det3(&m) / det
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn warm() -> Lut3D {
        Lut3D::from_fn(17, |[r, g, b]| [r.powf(0.8), g, b * 0.9 + 0.05]).unwrap()
    }

    #[test]
    fn blue_is_fastest() {
        let lut = Lut3D::identity(3);
        assert_eq!(lut.data[1], [0.0, 0.0, 0.5]);
        assert_eq!(lut.data[3], [0.0, 0.5, 0.0]);
        assert_eq!(lut.data[9], [0.5, 0.0, 0.0]);
    }

    #[test]
    fn red_fastest_reorder() {
        let size = 2;
        // red-fastest listing of the identity cube
        let mut raw = Vec::new();
        for b in 0..size {
            for g in 0..size {
                for r in 0..size {
                    raw.push([r as f32, g as f32, b as f32]);
                }
            }
        }
        let lut = Lut3D::from_red_fastest(&raw, size).unwrap();
        assert_eq!(lut, Lut3D::identity(2));
    }

    #[test]
    fn identity_interpolations() {
        for interp in [Interpolation::Linear, Interpolation::Tetrahedral, Interpolation::Best] {
            let lut = Lut3D::identity(9).with_interpolation(interp);
            let out = lut.apply([0.21, 0.57, 0.93]);
            assert_abs_diff_eq!(out[0], 0.21, epsilon = 1e-5);
            assert_abs_diff_eq!(out[1], 0.57, epsilon = 1e-5);
            assert_abs_diff_eq!(out[2], 0.93, epsilon = 1e-5);
        }
    }

    #[test]
    fn invert_roundtrip() {
        let lut = warm().with_interpolation(Interpolation::Tetrahedral);
        let inv = lut.invert().unwrap().with_interpolation(Interpolation::Tetrahedral);
        let rgb = [0.4, 0.6, 0.5];
        let back = inv.apply(lut.apply(rgb));
        assert_abs_diff_eq!(back[0], rgb[0], epsilon = 5e-3);
        assert_abs_diff_eq!(back[1], rgb[1], epsilon = 5e-3);
        assert_abs_diff_eq!(back[2], rgb[2], epsilon = 5e-3);
    }

    #[test]
    fn newton_step_solves_linear_system() {
        let j = [[2.0, 0.0, 1.0], [0.0, 1.0, 0.0], [1.0, 0.0, 3.0]];
        let x = solve_3x3(&j, &[4.0, -2.0, 7.0]);
        assert_abs_diff_eq!(x[0], 1.0, epsilon = 1e-5);
        assert_abs_diff_eq!(x[1], -2.0, epsilon = 1e-5);
        assert_abs_diff_eq!(x[2], 2.0, epsilon = 1e-5);
        assert_eq!(solve_3x3(&[[1.0; 3]; 3], &[1.0, 2.0, 3.0]), [0.0; 3]);
    }

    #[test]
    fn wrong_entry_count() {
        assert!(Lut3D::from_data(vec![[0.0; 3]; 7], 2).is_err());
        assert!(!warm().is_identity(1e-5));
        assert!(Lut3D::identity(5).is_identity(1e-6));
    }
}

//! Affine 4x4 matrix with offset.
//!
//! `out = M * in + offset` on RGBA, with `M` stored row-major.

use std::sync::Arc;

use glam::{DMat4, DVec4};

use super::{OpData, OpKind, ParamData, digest_f64s};
use crate::cpu::OpCpu;
use crate::error::{OcioError, OcioResult};
use crate::gpu::{GpuShaderDesc, GpuShaderText};

const IDENTITY_TOLERANCE: f64 = 1e-9;

#[rustfmt::skip]
const IDENTITY: [f64; 16] = [
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 1.0, 0.0,
    0.0, 0.0, 0.0, 1.0,
];

/// Matrix parameters.
///
/// # Example
///
/// ```
/// use vfx_ocio::ops::{MatrixOpData, ParamData};
///
/// let m = MatrixOpData::scale([2.0, 2.0, 2.0, 1.0]);
/// let inv = m.inverse().unwrap();
/// assert!(m.is_inverse(&inv));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixOpData {
    matrix: [f64; 16],
    offset: [f64; 4],
}

impl Default for MatrixOpData {
    fn default() -> Self {
        Self::identity()
    }
}

impl MatrixOpData {
    /// Row-major matrix plus RGBA offset.
    pub fn new(matrix: [f64; 16], offset: [f64; 4]) -> Self {
        Self { matrix, offset }
    }

    /// Identity matrix, zero offset.
    pub fn identity() -> Self {
        Self::new(IDENTITY, [0.0; 4])
    }

    /// Diagonal scale per channel.
    pub fn scale(s: [f64; 4]) -> Self {
        let mut m = [0.0; 16];
        for (i, v) in s.into_iter().enumerate() {
            m[i * 5] = v;
        }
        Self::new(m, [0.0; 4])
    }

    /// Pure translation.
    pub fn offset(o: [f64; 4]) -> Self {
        Self::new(IDENTITY, o)
    }

    /// Linear remap of `[old_min, old_max]` onto `[new_min, new_max]` on RGB.
    ///
    /// Alpha passes through. Fails when the old range is empty.
    pub fn fit(old_min: f64, old_max: f64, new_min: f64, new_max: f64) -> OcioResult<Self> {
        let span = old_max - old_min;
        if span.abs() < f64::EPSILON {
            return Err(OcioError::validation(
                OpKind::Matrix,
                format!("cannot fit the empty range [{old_min}, {old_max}]"),
            ));
        }
        let s = (new_max - new_min) / span;
        let o = new_min - s * old_min;
        let mut data = Self::scale([s, s, s, 1.0]);
        data.offset = [o, o, o, 0.0];
        Ok(data)
    }

    /// Row-major coefficients.
    pub fn matrix(&self) -> &[f64; 16] {
        &self.matrix
    }

    /// RGBA offset.
    pub fn offset_values(&self) -> &[f64; 4] {
        &self.offset
    }

    fn to_glam(&self) -> DMat4 {
        // glam is column-major
        DMat4::from_cols_array(&self.matrix).transpose()
    }

    fn from_glam(m: DMat4, offset: DVec4) -> Self {
        Self::new(m.transpose().to_cols_array(), offset.to_array())
    }

    /// `next` applied after `self`.
    fn compose(&self, next: &Self) -> Self {
        let ms = self.to_glam();
        let mn = next.to_glam();
        let os = DVec4::from_array(self.offset);
        let on = DVec4::from_array(next.offset);
        Self::from_glam(mn * ms, mn * os + on)
    }

    fn is_matrix_identity(&self) -> bool {
        self.matrix
            .iter()
            .zip(IDENTITY.iter())
            .all(|(a, b)| (a - b).abs() <= IDENTITY_TOLERANCE)
    }
}

impl ParamData for MatrixOpData {
    const KIND: OpKind = OpKind::Matrix;

    fn validate(&self) -> OcioResult<()> {
        if self.matrix.iter().chain(self.offset.iter()).any(|v| !v.is_finite()) {
            return Err(OcioError::validation(
                Self::KIND,
                "matrix and offset values must be finite",
            ));
        }
        Ok(())
    }

    fn is_identity(&self) -> bool {
        self.is_matrix_identity() && self.offset.iter().all(|v| v.abs() <= IDENTITY_TOLERANCE)
    }

    fn is_inverse(&self, other: &Self) -> bool {
        self.compose(other).is_identity()
    }

    fn inverse(&self) -> OcioResult<Self> {
        let m = self.to_glam();
        let det = m.determinant();
        if det.abs() < 1e-10 {
            return Err(OcioError::Unsupported(format!(
                "{}: singular matrix cannot be inverted (determinant {det})",
                Self::KIND
            )));
        }
        let inv = m.inverse();
        let offset = -(inv * DVec4::from_array(self.offset));
        Ok(Self::from_glam(inv, offset))
    }

    fn cache_id(&self) -> String {
        digest_f64s(self.matrix.iter().chain(self.offset.iter()).copied())
    }

    fn can_combine_with(&self, _next: &Self) -> bool {
        true
    }

    fn combine_with(&self, next: &Self) -> OcioResult<Vec<OpData>> {
        Ok(vec![self.compose(next).into()])
    }

    fn cpu_renderer(&self) -> OcioResult<Arc<dyn OpCpu>> {
        Ok(Arc::new(MatrixCpu {
            m: self.matrix.map(|v| v as f32),
            o: self.offset.map(|v| v as f32),
        }))
    }

    fn emit_gpu(
        &self,
        ss: &mut GpuShaderText,
        desc: &mut GpuShaderDesc,
        _source_id: &str,
    ) -> OcioResult<()> {
        let px = desc.pixel_name();
        ss.line("");
        ss.line("// Add Matrix processing");
        ss.line("");
        if !self.is_matrix_identity() {
            let rows: Vec<String> = (0..4)
                .map(|r| {
                    let row = [
                        self.matrix[r * 4],
                        self.matrix[r * 4 + 1],
                        self.matrix[r * 4 + 2],
                        self.matrix[r * 4 + 3],
                    ];
                    format!("dot({px}, {})", ss.float4_const(row))
                })
                .collect();
            ss.line(format!("{px} = {}({});", ss.float4(), rows.join(", ")));
        }
        if self.offset.iter().any(|v| *v != 0.0) {
            ss.line(format!("{px} = {px} + {};", ss.float4_const(self.offset)));
        }
        Ok(())
    }
}

#[derive(Debug)]
struct MatrixCpu {
    m: [f32; 16],
    o: [f32; 4],
}

impl OpCpu for MatrixCpu {
    fn apply(&self, rgba: &mut [f32]) {
        let m = &self.m;
        for px in rgba.chunks_exact_mut(4) {
            let [r, g, b, a] = [px[0], px[1], px[2], px[3]];
            px[0] = m[0] * r + m[1] * g + m[2] * b + m[3] * a + self.o[0];
            px[1] = m[4] * r + m[5] * g + m[6] * b + m[7] * a + self.o[1];
            px[2] = m[8] * r + m[9] * g + m[10] * b + m[11] * a + self.o[2];
            px[3] = m[12] * r + m[13] * g + m[14] * b + m[15] * a + self.o[3];
        }
    }
}

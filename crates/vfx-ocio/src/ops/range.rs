//! Scale/offset with optional clamping on RGB.
//!
//! A bound pair (`min_in`/`min_out` or `max_in`/`max_out`) is either fully
//! set or fully missing. With both pairs the op maps `[min_in, max_in]` onto
//! `[min_out, max_out]` and clamps to the output range. With one pair it
//! offsets and clamps on that side only. With none it does nothing.

use std::sync::Arc;

use super::{MatrixOpData, OpData, OpKind, ParamData, Replacement, id_float};
use crate::cpu::OpCpu;
use crate::error::{OcioError, OcioResult};
use crate::gpu::{GpuShaderDesc, GpuShaderText};

const SCALE_TOLERANCE: f64 = 1e-9;

/// Range parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RangeOpData {
    min_in: Option<f64>,
    max_in: Option<f64>,
    min_out: Option<f64>,
    max_out: Option<f64>,
}

/// `clamp(x * scale + offset, lo, hi)` with open sides.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ClampedAffine {
    scale: f64,
    offset: f64,
    lo: Option<f64>,
    hi: Option<f64>,
}

impl ClampedAffine {
    /// `next` applied after `self`. Valid for positive scales only.
    fn then(&self, next: &ClampedAffine) -> ClampedAffine {
        let moved = |v: f64| v * next.scale + next.offset;
        let lo = match (self.lo.map(moved), next.lo) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        let hi = match (self.hi.map(moved), next.hi) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        ClampedAffine {
            scale: self.scale * next.scale,
            offset: self.offset * next.scale + next.offset,
            lo,
            hi,
        }
    }

    /// Single op equivalent, `Ok(None)` when it does nothing, `Err(())` when
    /// neither a range nor a matrix can express it.
    fn to_op_data(self) -> Result<Option<OpData>, ()> {
        let unit_scale = (self.scale - 1.0).abs() < SCALE_TOLERANCE;
        match (self.lo, self.hi) {
            (Some(lo), Some(hi)) if hi > lo => Ok(Some(
                RangeOpData::new(
                    Some((lo - self.offset) / self.scale),
                    Some((hi - self.offset) / self.scale),
                    Some(lo),
                    Some(hi),
                )
                .into(),
            )),
            (Some(lo), None) if unit_scale => {
                Ok(Some(RangeOpData::new(Some(lo - self.offset), None, Some(lo), None).into()))
            }
            (None, Some(hi)) if unit_scale => {
                Ok(Some(RangeOpData::new(None, Some(hi - self.offset), None, Some(hi)).into()))
            }
            (None, None) if unit_scale && self.offset.abs() < SCALE_TOLERANCE => Ok(None),
            (None, None) => {
                let (s, o) = (self.scale, self.offset);
                let scale = MatrixOpData::scale([s, s, s, 1.0]);
                Ok(Some(MatrixOpData::new(*scale.matrix(), [o, o, o, 0.0]).into()))
            }
            _ => Err(()),
        }
    }
}

impl RangeOpData {
    /// Range from its four optional bounds.
    pub fn new(
        min_in: Option<f64>,
        max_in: Option<f64>,
        min_out: Option<f64>,
        max_out: Option<f64>,
    ) -> Self {
        Self {
            min_in,
            max_in,
            min_out,
            max_out,
        }
    }

    /// Pure clamp to `[min, max]`.
    pub fn clamp(min: f64, max: f64) -> Self {
        Self::new(Some(min), Some(max), Some(min), Some(max))
    }

    /// Lower input bound.
    pub fn min_in(&self) -> Option<f64> {
        self.min_in
    }

    /// Upper input bound.
    pub fn max_in(&self) -> Option<f64> {
        self.max_in
    }

    /// Lower output bound.
    pub fn min_out(&self) -> Option<f64> {
        self.min_out
    }

    /// Upper output bound.
    pub fn max_out(&self) -> Option<f64> {
        self.max_out
    }

    fn affine(&self) -> ClampedAffine {
        match (self.min_in, self.max_in, self.min_out, self.max_out) {
            (Some(min_in), Some(max_in), Some(min_out), Some(max_out)) => {
                let scale = (max_out - min_out) / (max_in - min_in);
                ClampedAffine {
                    scale,
                    offset: min_out - min_in * scale,
                    lo: Some(min_out),
                    hi: Some(max_out),
                }
            }
            (Some(min_in), _, Some(min_out), _) => ClampedAffine {
                scale: 1.0,
                offset: min_out - min_in,
                lo: Some(min_out),
                hi: None,
            },
            (_, Some(max_in), _, Some(max_out)) => ClampedAffine {
                scale: 1.0,
                offset: max_out - max_in,
                lo: None,
                hi: Some(max_out),
            },
            _ => ClampedAffine {
                scale: 1.0,
                offset: 0.0,
                lo: None,
                hi: None,
            },
        }
    }

    fn has_bounds(&self) -> bool {
        self.min_in.is_some() || self.max_in.is_some()
    }

    fn fail(reason: impl Into<String>) -> OcioError {
        OcioError::validation(OpKind::Range, reason)
    }
}

impl ParamData for RangeOpData {
    const KIND: OpKind = OpKind::Range;

    fn validate(&self) -> OcioResult<()> {
        if self.min_in.is_some() != self.min_out.is_some() {
            return Err(Self::fail(
                "In and out minimum limits must be both set or both missing.",
            ));
        }
        if self.max_in.is_some() != self.max_out.is_some() {
            return Err(Self::fail(
                "In and out maximum limits must be both set or both missing.",
            ));
        }
        let bounds = [self.min_in, self.max_in, self.min_out, self.max_out];
        if bounds.iter().flatten().any(|v| !v.is_finite()) {
            return Err(Self::fail("Range bounds must be finite."));
        }
        for (side, lo, hi) in [
            ("input", self.min_in, self.max_in),
            ("output", self.min_out, self.max_out),
        ] {
            if let (Some(lo), Some(hi)) = (lo, hi) {
                if hi <= lo {
                    return Err(Self::fail(format!(
                        "Maximum {side} value {} must be greater than minimum {side} value {}.",
                        id_float(hi),
                        id_float(lo)
                    )));
                }
            }
        }
        Ok(())
    }

    fn is_identity(&self) -> bool {
        !self.has_bounds() && self.min_out.is_none() && self.max_out.is_none()
    }

    fn is_inverse(&self, other: &Self) -> bool {
        self.has_bounds() && self.inverse().is_ok_and(|inv| inv == *other)
    }

    fn inverse(&self) -> OcioResult<Self> {
        Ok(Self::new(self.min_out, self.max_out, self.min_in, self.max_in))
    }

    fn cache_id(&self) -> String {
        let f = |v: Option<f64>| v.map_or_else(|| "-".to_string(), id_float);
        format!(
            "{} {} {} {}",
            f(self.min_in),
            f(self.max_in),
            f(self.min_out),
            f(self.max_out)
        )
    }

    fn can_combine_with(&self, next: &Self) -> bool {
        self.validate().is_ok()
            && next.validate().is_ok()
            && self.affine().then(&next.affine()).to_op_data().is_ok()
    }

    fn combine_with(&self, next: &Self) -> OcioResult<Vec<OpData>> {
        match self.affine().then(&next.affine()).to_op_data() {
            Ok(op) => Ok(op.into_iter().collect()),
            Err(()) => Err(OcioError::Unsupported(format!(
                "{}: ranges {} and {} do not fuse into one op",
                Self::KIND,
                self.cache_id(),
                next.cache_id()
            ))),
        }
    }

    fn identity_replacement(&self) -> Replacement {
        if self.has_bounds() {
            Replacement::Clamp(
                RangeOpData::new(self.min_in, self.max_in, self.min_in, self.max_in).into(),
            )
        } else {
            Replacement::Remove
        }
    }

    fn cpu_renderer(&self) -> OcioResult<Arc<dyn OpCpu>> {
        let a = self.affine();
        Ok(Arc::new(RangeCpu {
            scale: a.scale as f32,
            offset: a.offset as f32,
            lo: a.lo.map_or(f32::NEG_INFINITY, |v| v as f32),
            hi: a.hi.map_or(f32::INFINITY, |v| v as f32),
        }))
    }

    fn emit_gpu(
        &self,
        ss: &mut GpuShaderText,
        desc: &mut GpuShaderDesc,
        _source_id: &str,
    ) -> OcioResult<()> {
        let px = desc.pixel_name();
        let a = self.affine();
        ss.line("");
        ss.line("// Add Range processing");
        ss.line("");
        if a.scale != 1.0 || a.offset != 0.0 {
            ss.line(format!(
                "{px}.rgb = {px}.rgb * {} + {};",
                ss.float3_const([a.scale; 3]),
                ss.float3_const([a.offset; 3])
            ));
        }
        if let Some(lo) = a.lo {
            ss.line(format!("{px}.rgb = max({}, {px}.rgb);", ss.float3_const([lo; 3])));
        }
        if let Some(hi) = a.hi {
            ss.line(format!("{px}.rgb = min({}, {px}.rgb);", ss.float3_const([hi; 3])));
        }
        Ok(())
    }
}

#[derive(Debug)]
struct RangeCpu {
    scale: f32,
    offset: f32,
    lo: f32,
    hi: f32,
}

impl OpCpu for RangeCpu {
    fn apply(&self, rgba: &mut [f32]) {
        for px in rgba.chunks_exact_mut(4) {
            for v in &mut px[..3] {
                *v = (*v * self.scale + self.offset).max(self.lo).min(self.hi);
            }
        }
    }
}

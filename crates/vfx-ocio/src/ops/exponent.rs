//! Per-channel power function on RGBA.

use std::fmt;
use std::sync::Arc;

use super::{OpData, OpKind, ParamData, id_float};
use crate::cpu::OpCpu;
use crate::error::{OcioError, OcioResult};
use crate::gpu::{GpuShaderDesc, GpuShaderText};

const MIN_EXPONENT: f64 = 0.01;
const MAX_EXPONENT: f64 = 100.0;
const INVERSE_TOLERANCE: f64 = 1e-9;

/// Treatment of negative inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NegativeStyle {
    /// Negatives clamp to zero before the power.
    #[default]
    Clamp,
    /// `sign(x) * |x|^e`.
    Mirror,
    /// Negatives pass through unchanged.
    PassThru,
}

impl NegativeStyle {
    /// Name used in cache IDs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Clamp => "clamp",
            Self::Mirror => "mirror",
            Self::PassThru => "pass_thru",
        }
    }
}

impl fmt::Display for NegativeStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Exponent parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ExponentOpData {
    value: [f64; 4],
    style: NegativeStyle,
}

impl ExponentOpData {
    /// Per-channel exponents with a negative-value style.
    pub fn new(value: [f64; 4], style: NegativeStyle) -> Self {
        Self { value, style }
    }

    /// RGBA exponents.
    pub fn value(&self) -> [f64; 4] {
        self.value
    }

    /// Negative-value style.
    pub fn style(&self) -> NegativeStyle {
        self.style
    }

    fn product_with(&self, other: &Self) -> [f64; 4] {
        [
            self.value[0] * other.value[0],
            self.value[1] * other.value[1],
            self.value[2] * other.value[2],
            self.value[3] * other.value[3],
        ]
    }
}

impl ParamData for ExponentOpData {
    const KIND: OpKind = OpKind::Exponent;

    fn validate(&self) -> OcioResult<()> {
        for v in self.value {
            if !v.is_finite() {
                return Err(OcioError::validation(Self::KIND, "Exponent must be finite"));
            }
            if v < MIN_EXPONENT {
                return Err(OcioError::validation(
                    Self::KIND,
                    format!("Exponent {} is less than lower bound {}", id_float(v), MIN_EXPONENT),
                ));
            }
            if v > MAX_EXPONENT {
                return Err(OcioError::validation(
                    Self::KIND,
                    format!("Exponent {} is greater than upper bound {}", id_float(v), MAX_EXPONENT),
                ));
            }
        }
        Ok(())
    }

    fn is_identity(&self) -> bool {
        self.style != NegativeStyle::Clamp && self.value.iter().all(|v| *v == 1.0)
    }

    /// Only the non-clamping styles have a true inverse; a clamping pair
    /// still zeroes negatives and is fused instead.
    fn is_inverse(&self, other: &Self) -> bool {
        self.style != NegativeStyle::Clamp
            && self.style == other.style
            && self
                .product_with(other)
                .iter()
                .all(|p| (p - 1.0).abs() <= INVERSE_TOLERANCE)
    }

    fn inverse(&self) -> OcioResult<Self> {
        if self.value.iter().any(|v| *v <= 0.0) {
            return Err(OcioError::Unsupported(format!(
                "{}: exponent {:?} has no inverse",
                Self::KIND,
                self.value
            )));
        }
        Ok(Self::new(self.value.map(|v| 1.0 / v), self.style))
    }

    fn cache_id(&self) -> String {
        let v = self.value.map(id_float);
        format!("{} {} {} {} {}", v[0], v[1], v[2], v[3], self.style)
    }

    fn can_combine_with(&self, next: &Self) -> bool {
        self.style == next.style
            && self
                .product_with(next)
                .iter()
                .all(|p| (MIN_EXPONENT..=MAX_EXPONENT).contains(p))
    }

    fn combine_with(&self, next: &Self) -> OcioResult<Vec<OpData>> {
        Ok(vec![Self::new(self.product_with(next), self.style).into()])
    }

    fn cpu_renderer(&self) -> OcioResult<Arc<dyn OpCpu>> {
        Ok(Arc::new(ExponentCpu {
            e: self.value.map(|v| v as f32),
            style: self.style,
        }))
    }

    fn emit_gpu(
        &self,
        ss: &mut GpuShaderText,
        desc: &mut GpuShaderDesc,
        _source_id: &str,
    ) -> OcioResult<()> {
        let px = desc.pixel_name();
        let e = ss.float4_const(self.value);
        let zero = ss.float4_const([0.0; 4]);
        ss.line("");
        ss.line("// Add Exponent processing");
        ss.line("");
        match self.style {
            NegativeStyle::Clamp => {
                ss.line(format!("{px} = pow(max({px}, {zero}), {e});"));
            }
            NegativeStyle::Mirror => {
                ss.line(format!("{px} = sign({px}) * pow(abs({px}), {e});"));
            }
            NegativeStyle::PassThru => {
                let powered = format!("pow(max({px}, {zero}), {e})");
                let negative = format!("step({px}, {zero})");
                let blended = ss.lerp(&powered, px, &negative);
                ss.line(format!("{px} = {blended};"));
            }
        }
        Ok(())
    }
}

#[derive(Debug)]
struct ExponentCpu {
    e: [f32; 4],
    style: NegativeStyle,
}

impl OpCpu for ExponentCpu {
    fn apply(&self, rgba: &mut [f32]) {
        for px in rgba.chunks_exact_mut(4) {
            for (v, e) in px.iter_mut().zip(self.e) {
                *v = match self.style {
                    NegativeStyle::Clamp => v.max(0.0).powf(e),
                    NegativeStyle::Mirror => v.signum() * v.abs().powf(e),
                    NegativeStyle::PassThru if *v < 0.0 => *v,
                    NegativeStyle::PassThru => v.powf(e),
                };
            }
        }
    }
}

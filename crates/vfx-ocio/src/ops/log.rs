//! Logarithm and anti-logarithm on RGB.

use std::sync::Arc;

use super::{OpKind, ParamData, id_float};
use crate::cpu::OpCpu;
use crate::error::{OcioError, OcioResult};
use crate::gpu::{GpuShaderDesc, GpuShaderText, float_lit};
use crate::transform::TransformDirection;

/// Log parameters. Forward is lin-to-log.
#[derive(Debug, Clone, PartialEq)]
pub struct LogOpData {
    base: f64,
    direction: TransformDirection,
}

impl Default for LogOpData {
    fn default() -> Self {
        Self::new(2.0, TransformDirection::Forward)
    }
}

impl LogOpData {
    /// Logarithm of `base`; the inverse direction raises `base` to the input.
    pub fn new(base: f64, direction: TransformDirection) -> Self {
        Self { base, direction }
    }

    /// Logarithm base.
    pub fn base(&self) -> f64 {
        self.base
    }

    /// Lin-to-log (forward) or log-to-lin (inverse).
    pub fn direction(&self) -> TransformDirection {
        self.direction
    }
}

impl ParamData for LogOpData {
    const KIND: OpKind = OpKind::Log;

    fn validate(&self) -> OcioResult<()> {
        if !self.base.is_finite() || self.base <= 0.0 {
            return Err(OcioError::validation(
                Self::KIND,
                format!("Log base {} must be positive", id_float(self.base)),
            ));
        }
        if self.base == 1.0 {
            return Err(OcioError::validation(Self::KIND, "Log base must not be 1"));
        }
        Ok(())
    }

    fn is_identity(&self) -> bool {
        false
    }

    fn is_inverse(&self, other: &Self) -> bool {
        self.base == other.base && self.direction != other.direction
    }

    fn inverse(&self) -> OcioResult<Self> {
        Ok(Self::new(self.base, self.direction.inverse()))
    }

    fn cache_id(&self) -> String {
        format!("{} {}", id_float(self.base), self.direction)
    }

    fn cpu_renderer(&self) -> OcioResult<Arc<dyn OpCpu>> {
        let base = self.base as f32;
        Ok(match self.direction {
            TransformDirection::Forward => Arc::new(LinToLogCpu {
                inv_ln_base: 1.0 / base.ln(),
            }),
            TransformDirection::Inverse => Arc::new(LogToLinCpu { base }),
        })
    }

    fn emit_gpu(
        &self,
        ss: &mut GpuShaderText,
        desc: &mut GpuShaderDesc,
        _source_id: &str,
    ) -> OcioResult<()> {
        let px = desc.pixel_name();
        let log2_base = self.base.log2();
        ss.line("");
        ss.line(format!("// Add Log processing ({})", self.direction));
        ss.line("");
        match self.direction {
            TransformDirection::Forward => {
                let floor = ss.float3_const([f32::MIN_POSITIVE as f64; 3]);
                ss.line(format!("{px}.rgb = max({floor}, {px}.rgb);"));
                ss.line(format!(
                    "{px}.rgb = log2({px}.rgb) * {};",
                    float_lit(1.0 / log2_base)
                ));
            }
            TransformDirection::Inverse => {
                ss.line(format!("{px}.rgb = exp2({px}.rgb * {});", float_lit(log2_base)));
            }
        }
        Ok(())
    }
}

#[derive(Debug)]
struct LinToLogCpu {
    inv_ln_base: f32,
}

impl OpCpu for LinToLogCpu {
    fn apply(&self, rgba: &mut [f32]) {
        for px in rgba.chunks_exact_mut(4) {
            for v in &mut px[..3] {
                *v = v.max(f32::MIN_POSITIVE).ln() * self.inv_ln_base;
            }
        }
    }
}

#[derive(Debug)]
struct LogToLinCpu {
    base: f32,
}

impl OpCpu for LogToLinCpu {
    fn apply(&self, rgba: &mut [f32]) {
        for px in rgba.chunks_exact_mut(4) {
            for v in &mut px[..3] {
                *v = self.base.powf(*v);
            }
        }
    }
}

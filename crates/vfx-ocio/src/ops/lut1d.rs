//! 1D LUT op.
//!
//! The forward direction evaluates the curves; the inverse direction
//! searches the (non-decreasing) samples at render time. On the GPU the
//! samples live in a 2D texture wrapped into rows of at most
//! [`GpuShaderDesc::texture_max_width`] texels, and a generated helper maps
//! a channel value to texture coordinates.

use std::sync::Arc;

use vfx_lut::{Interpolation, Lut1D};

use super::{OpData, OpKind, ParamData, RangeOpData, Replacement, digest_f64s};
use crate::cpu::OpCpu;
use crate::error::{OcioError, OcioResult};
use crate::gpu::{GpuInterpolation, GpuShaderDesc, GpuShaderText, GpuTextureType, float_lit};
use crate::transform::TransformDirection;

/// Per-sample distance from the identity line still treated as identity.
pub(crate) const LUT_IDENTITY_TOLERANCE: f32 = 1e-5;

/// Samples baked for GPU evaluation of the inverse direction.
const INVERSE_BAKE_SIZE: usize = 4096;

/// 1D LUT parameters.
///
/// # Example
///
/// ```
/// use vfx_lut::Lut1D;
/// use vfx_ocio::TransformDirection;
/// use vfx_ocio::ops::{Lut1DOpData, ParamData};
///
/// let lut = Lut1D::from_fn(1024, |x| [x * x, x * x, x * x]).unwrap();
/// let fwd = Lut1DOpData::new(lut, TransformDirection::Forward);
/// let inv = fwd.inverse().unwrap();
/// assert!(fwd.is_inverse(&inv));
/// assert_eq!(inv.direction(), TransformDirection::Inverse);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Lut1DOpData {
    lut: Lut1D,
    direction: TransformDirection,
}

impl Lut1DOpData {
    /// Wraps decoded LUT samples.
    pub fn new(lut: Lut1D, direction: TransformDirection) -> Self {
        Self { lut, direction }
    }

    /// LUT samples.
    pub fn lut(&self) -> &Lut1D {
        &self.lut
    }

    /// Evaluation direction.
    pub fn direction(&self) -> TransformDirection {
        self.direction
    }

    /// Samples actually evaluated by the GPU, always forward.
    fn forward_samples(&self) -> OcioResult<Lut1D> {
        match self.direction {
            TransformDirection::Forward => Ok(self.lut.clone()),
            TransformDirection::Inverse => Ok(self.lut.bake_inverse(INVERSE_BAKE_SIZE)?),
        }
    }
}

/// What stands in for a 1D LUT followed by its inverse.
///
/// The forward direction clamps every channel to [0, 1]. The inverse
/// direction clamps each channel to its own sample range, which one range op
/// reproduces only when the three channels span the same non-empty range.
fn lut1d_domain_clamp(data: &[[f32; 3]], direction: TransformDirection) -> Replacement {
    if direction == TransformDirection::Forward {
        return Replacement::Clamp(RangeOpData::clamp(0.0, 1.0).into());
    }
    let ranges: [(f32, f32); 3] = std::array::from_fn(|c| {
        data.iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| (lo.min(v[c]), hi.max(v[c])))
    });
    let (lo, hi) = ranges[0];
    if hi > lo && ranges.iter().all(|r| *r == (lo, hi)) {
        Replacement::Clamp(RangeOpData::clamp(lo as f64, hi as f64).into())
    } else {
        Replacement::Keep
    }
}

pub(crate) fn lut_digest(data: &[[f32; 3]]) -> String {
    digest_f64s(data.iter().flatten().map(|v| *v as f64))
}

impl ParamData for Lut1DOpData {
    const KIND: OpKind = OpKind::Lut1D;

    fn validate(&self) -> OcioResult<()> {
        if self.lut.size() < 2 {
            return Err(OcioError::validation(
                Self::KIND,
                format!("LUT needs at least 2 entries, found {}", self.lut.size()),
            ));
        }
        if self.lut.data.iter().flatten().any(|v| !v.is_finite()) {
            return Err(OcioError::validation(Self::KIND, "LUT values must be finite"));
        }
        if self.direction == TransformDirection::Inverse && !self.lut.is_non_decreasing() {
            return Err(OcioError::validation(
                Self::KIND,
                "inverse evaluation needs non-decreasing LUT samples",
            ));
        }
        Ok(())
    }

    fn is_identity(&self) -> bool {
        self.lut.is_identity(LUT_IDENTITY_TOLERANCE)
    }

    fn is_inverse(&self, other: &Self) -> bool {
        self.direction != other.direction && self.lut.data == other.lut.data
    }

    fn inverse(&self) -> OcioResult<Self> {
        Ok(Self::new(self.lut.clone(), self.direction.inverse()))
    }

    fn cache_id(&self) -> String {
        format!(
            "{} {} {}",
            lut_digest(&self.lut.data),
            self.lut.interpolation.name(),
            self.direction
        )
    }

    fn can_combine_with(&self, next: &Self) -> bool {
        self.direction == TransformDirection::Forward
            && next.direction == TransformDirection::Forward
    }

    fn combination_is_lossy(&self, _next: &Self) -> bool {
        true
    }

    fn combine_with(&self, next: &Self) -> OcioResult<Vec<OpData>> {
        let size = self.lut.size().max(next.lut.size());
        let lut = self.lut.compose(&next.lut, size)?;
        Ok(vec![Self::new(lut, TransformDirection::Forward).into()])
    }

    fn identity_replacement(&self) -> Replacement {
        lut1d_domain_clamp(&self.lut.data, self.direction)
    }

    fn cpu_renderer(&self) -> OcioResult<Arc<dyn OpCpu>> {
        self.validate()?;
        Ok(Arc::new(Lut1DCpu {
            lut: self.lut.clone(),
            inverse: self.direction == TransformDirection::Inverse,
        }))
    }

    fn emit_gpu(
        &self,
        ss: &mut GpuShaderText,
        desc: &mut GpuShaderDesc,
        source_id: &str,
    ) -> OcioResult<()> {
        self.validate()?;
        let lut = self.forward_samples()?;
        let len = lut.size();
        let width = len.min(desc.texture_max_width() as usize);
        let height = (len - 1).div_ceil(width - 1);

        let already_registered = desc.find_texture(source_id).is_some();
        let mut texels = Vec::with_capacity(width * height * 3);
        for row in 0..height {
            for col in 0..width {
                let idx = (row * (width - 1) + col).min(len - 1);
                texels.extend_from_slice(&lut.data[idx]);
            }
        }
        let nearest = lut.interpolation.for_1d() == Interpolation::Nearest;
        let filter = if nearest {
            GpuInterpolation::Nearest
        } else {
            GpuInterpolation::Linear
        };
        let name = desc.add_texture(
            "lut1d",
            source_id,
            GpuTextureType::Texture2D,
            [width as u32, height as u32, 1],
            texels,
            filter,
        );

        if !already_registered {
            let mut helper = desc.new_text();
            let float2 = helper.float2();
            helper.line("");
            helper.line(format!("{float2} {name}_computePos(float f)"));
            {
                let mut body = helper.scope();
                body.line(format!(
                    "float dep = clamp(f, 0.0, 1.0) * {};",
                    float_lit((len - 1) as f64)
                ));
                if nearest {
                    body.line("dep = floor(dep + 0.5);");
                }
                body.line(format!("{float2} retVal;"));
                body.line(format!(
                    "retVal.y = min(floor(dep / {}), {});",
                    float_lit((width - 1) as f64),
                    float_lit((height - 1) as f64)
                ));
                body.line(format!(
                    "retVal.x = dep - retVal.y * {};",
                    float_lit((width - 1) as f64)
                ));
                body.line(format!(
                    "retVal.x = (retVal.x + 0.5) / {};",
                    float_lit(width as f64)
                ));
                body.line(format!(
                    "retVal.y = (retVal.y + 0.5) / {};",
                    float_lit(height as f64)
                ));
                body.line("return retVal;");
            }
            desc.add_to_helper_shader_code(helper.as_str());
        }

        let px = desc.pixel_name();
        ss.line("");
        ss.line(format!("// Add LUT 1D processing for {name}"));
        ss.line("");
        for c in ["r", "g", "b"] {
            let sample = ss.sample_tex2d(&name, &format!("{name}_computePos({px}.{c})"));
            ss.line(format!("{px}.{c} = {sample}.{c};"));
        }
        Ok(())
    }
}

#[derive(Debug)]
struct Lut1DCpu {
    lut: Lut1D,
    inverse: bool,
}

impl OpCpu for Lut1DCpu {
    fn apply(&self, rgba: &mut [f32]) {
        for px in rgba.chunks_exact_mut(4) {
            let rgb = [px[0], px[1], px[2]];
            let out = if self.inverse {
                self.lut.apply_inverse(rgb)
            } else {
                self.lut.apply(rgb)
            };
            px[..3].copy_from_slice(&out);
        }
    }
}

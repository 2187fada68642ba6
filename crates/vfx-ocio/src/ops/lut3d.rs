//! 3D LUT op.
//!
//! Samples are stored blue-fastest, which makes blue the texture's x axis:
//! shader lookups swizzle the color with `.zyx`.

use std::sync::Arc;

use vfx_lut::{Interpolation, Lut3D};

use super::lut1d::{LUT_IDENTITY_TOLERANCE, lut_digest};
use super::{OpKind, ParamData, RangeOpData, Replacement};
use crate::cpu::OpCpu;
use crate::error::{OcioError, OcioResult};
use crate::gpu::{GpuInterpolation, GpuShaderDesc, GpuShaderText, GpuTextureType, float_lit};
use crate::transform::TransformDirection;

/// 3D LUT parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Lut3DOpData {
    lut: Lut3D,
    direction: TransformDirection,
}

impl Lut3DOpData {
    /// Wraps a decoded grid.
    pub fn new(lut: Lut3D, direction: TransformDirection) -> Self {
        Self { lut, direction }
    }

    /// Grid samples.
    pub fn lut(&self) -> &Lut3D {
        &self.lut
    }

    /// Evaluation direction.
    pub fn direction(&self) -> TransformDirection {
        self.direction
    }

    /// Grid evaluated by the renderers: the inverse direction bakes a
    /// numerically inverted grid.
    fn evaluated_grid(&self) -> OcioResult<Lut3D> {
        match self.direction {
            TransformDirection::Forward => Ok(self.lut.clone()),
            TransformDirection::Inverse => Ok(self.lut.invert()?),
        }
    }
}

impl ParamData for Lut3DOpData {
    const KIND: OpKind = OpKind::Lut3D;

    fn validate(&self) -> OcioResult<()> {
        let size = self.lut.size;
        if size < 2 {
            return Err(OcioError::validation(
                Self::KIND,
                format!("grid size must be at least 2, found {size}"),
            ));
        }
        let expected = size * size * size;
        if self.lut.data.len() != expected {
            return Err(OcioError::validation(
                Self::KIND,
                format!(
                    "grid of size {size} needs {expected} entries, found {}",
                    self.lut.data.len()
                ),
            ));
        }
        if self.lut.data.iter().flatten().any(|v| !v.is_finite()) {
            return Err(OcioError::validation(Self::KIND, "LUT values must be finite"));
        }
        Ok(())
    }

    fn is_identity(&self) -> bool {
        self.lut.is_identity(LUT_IDENTITY_TOLERANCE)
    }

    fn is_inverse(&self, other: &Self) -> bool {
        self.direction != other.direction
            && self.lut.size == other.lut.size
            && self.lut.data == other.lut.data
    }

    fn inverse(&self) -> OcioResult<Self> {
        Ok(Self::new(self.lut.clone(), self.direction.inverse()))
    }

    fn cache_id(&self) -> String {
        format!(
            "{} {} {} {}",
            lut_digest(&self.lut.data),
            self.lut.size,
            self.lut.interpolation.name(),
            self.direction
        )
    }

    /// A forward grid clamps its input to [0, 1]. The inverse grid also
    /// clamps to [0, 1], but the forward grid after it only lands back on
    /// that input inside the forward gamut, so only an identity inverse
    /// grid reduces to a clamp.
    fn identity_replacement(&self) -> Replacement {
        if self.direction == TransformDirection::Inverse && !self.is_identity() {
            return Replacement::Keep;
        }
        Replacement::Clamp(RangeOpData::clamp(0.0, 1.0).into())
    }

    fn cpu_renderer(&self) -> OcioResult<Arc<dyn OpCpu>> {
        self.validate()?;
        Ok(Arc::new(Lut3DCpu {
            lut: self.evaluated_grid()?,
        }))
    }

    fn emit_gpu(
        &self,
        ss: &mut GpuShaderText,
        desc: &mut GpuShaderDesc,
        source_id: &str,
    ) -> OcioResult<()> {
        self.validate()?;
        let lut = self.evaluated_grid()?;
        let dim = lut.size;
        let interp = lut.interpolation.for_3d();
        let filter = if interp == Interpolation::Linear {
            GpuInterpolation::Linear
        } else {
            GpuInterpolation::Nearest
        };
        let texels: Vec<f32> = lut.data.iter().flatten().copied().collect();
        let name = desc.add_texture(
            "lut3d",
            source_id,
            GpuTextureType::Texture3D,
            [dim as u32; 3],
            texels,
            filter,
        );

        let px = desc.pixel_name();
        let float3 = ss.float3();
        let dim_f = dim as f64;
        ss.line("");
        ss.line(format!("// Add LUT 3D processing for {name}"));
        ss.line("");

        if interp != Interpolation::Tetrahedral {
            let sample = ss.sample_tex3d(&name, "coords.zyx");
            let mut block = ss.scope();
            block.line(format!(
                "{float3} coords = (clamp({px}.rgb, 0.0, 1.0) * {} + 0.5) / {};",
                float_lit(dim_f - 1.0),
                float_lit(dim_f)
            ));
            block.line(format!("{px}.rgb = {sample}.rgb;"));
            return Ok(());
        }

        let incr = 1.0 / dim_f;
        let last_base = ss.float3_const([dim_f - 2.0; 3]);
        let mut block = ss.scope();
        block.line(format!(
            "{float3} coords = clamp({px}.rgb, 0.0, 1.0) * {};",
            float_lit(dim_f - 1.0)
        ));
        block.line(format!("{float3} baseInd = min(floor(coords), {last_base});"));
        block.line(format!("{float3} fr = coords - baseInd;"));
        block.line(format!(
            "{float3} startPos = (baseInd + 0.5) * {};",
            float_lit(incr)
        ));

        let at = |ss: &GpuShaderText, offset: [f64; 3]| -> String {
            let pos = if offset == [0.0; 3] {
                "startPos".to_string()
            } else {
                format!("(startPos + {})", ss.float3_const(offset))
            };
            format!("{}.rgb", ss.sample_tex3d(&name, &format!("{pos}.zyx")))
        };
        let red = [incr, 0.0, 0.0];
        let green = [0.0, incr, 0.0];
        let blue = [0.0, 0.0, incr];
        let add = |a: [f64; 3], b: [f64; 3]| [a[0] + b[0], a[1] + b[1], a[2] + b[2]];

        let v1 = at(&block, [0.0; 3]);
        let v4 = at(&block, [incr; 3]);
        block.line(format!("{float3} v1 = {v1};"));
        block.line(format!("{float3} v4 = {v4};"));
        block.line(format!("{float3} v2;"));
        block.line(format!("{float3} v3;"));
        block.line(format!("{float3} f;"));

        // (condition, second corner, third corner, weight order)
        let cases = [
            ("fr.r > fr.g && fr.g > fr.b", red, add(red, green), ["r", "g", "b"]),
            ("fr.r > fr.g && fr.r > fr.b", red, add(red, blue), ["r", "b", "g"]),
            ("fr.r > fr.g", blue, add(red, blue), ["b", "r", "g"]),
            ("fr.g > fr.b && fr.r > fr.b", green, add(red, green), ["g", "r", "b"]),
            ("fr.g > fr.b", green, add(green, blue), ["g", "b", "r"]),
            ("true", blue, add(green, blue), ["b", "g", "r"]),
        ];
        for (i, (cond, second, third, order)) in cases.into_iter().enumerate() {
            let head = match i {
                0 => format!("if ({cond})"),
                5 => "else".to_string(),
                _ => format!("else if ({cond})"),
            };
            block.line(head);
            let v2 = at(&block, second);
            let v3 = at(&block, third);
            let mut branch = block.scope();
            branch.line(format!("v2 = {v2};"));
            branch.line(format!("v3 = {v3};"));
            let [a, b, c] = order;
            branch.line(format!("f = {float3}(fr.{a}, fr.{b}, fr.{c});"));
        }
        block.line(format!(
            "{px}.rgb = v1 + f.x * (v2 - v1) + f.y * (v3 - v2) + f.z * (v4 - v3);"
        ));
        Ok(())
    }
}

#[derive(Debug)]
struct Lut3DCpu {
    lut: Lut3D,
}

impl OpCpu for Lut3DCpu {
    fn apply(&self, rgba: &mut [f32]) {
        for px in rgba.chunks_exact_mut(4) {
            let out = self.lut.apply([px[0], px[1], px[2]]);
            px[..3].copy_from_slice(&out);
        }
    }
}

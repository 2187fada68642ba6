//! Fixed-function op: named, closed-form color adjustments.
//!
//! Each [`FixedFunctionStyle`] comes as a forward/inverse pair. All styles
//! except `REC2100_Surround` take no parameters; `REC2100_Surround` takes a
//! single gamma in [0.01, 100].
//!
//! # Example
//!
//! ```
//! use vfx_ocio::ops::{FixedFunctionOpData, FixedFunctionStyle, ParamData};
//!
//! let surround = FixedFunctionOpData::new(FixedFunctionStyle::Rec2100SurroundFwd, vec![0.78]);
//! surround.validate().unwrap();
//! let inv = surround.inverse().unwrap();
//! assert_eq!(inv.style(), FixedFunctionStyle::Rec2100SurroundInv);
//! assert!(surround.is_inverse(&inv));
//! ```

mod cpu;
mod gpu;

use std::fmt;
use std::sync::Arc;

use super::{OpKind, ParamData, id_float, message_float};
use crate::cpu::OpCpu;
use crate::error::{OcioError, OcioResult};
use crate::gpu::{GpuShaderDesc, GpuShaderText};

const REC2100_LOWER_BOUND: f64 = 0.01;
const REC2100_UPPER_BOUND: f64 = 100.0;
const RECIPROCAL_TOLERANCE: f64 = 1e-9;

/// Fixed-function style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FixedFunctionStyle {
    /// ACES 0.3/0.7 red modifier.
    #[default]
    AcesRedMod03Fwd,
    /// Inverse of [`FixedFunctionStyle::AcesRedMod03Fwd`].
    AcesRedMod03Inv,
    /// ACES 1.0 red modifier.
    AcesRedMod10Fwd,
    /// Inverse of [`FixedFunctionStyle::AcesRedMod10Fwd`].
    AcesRedMod10Inv,
    /// ACES 0.3/0.7 glow.
    AcesGlow03Fwd,
    /// Inverse of [`FixedFunctionStyle::AcesGlow03Fwd`].
    AcesGlow03Inv,
    /// ACES 1.0 glow.
    AcesGlow10Fwd,
    /// Inverse of [`FixedFunctionStyle::AcesGlow10Fwd`].
    AcesGlow10Inv,
    /// ACES 1.0 dark to dim surround.
    AcesDarkToDim10Fwd,
    /// Inverse of [`FixedFunctionStyle::AcesDarkToDim10Fwd`].
    AcesDarkToDim10Inv,
    /// Rec.2100 surround correction, one gamma parameter.
    Rec2100SurroundFwd,
    /// Inverse of [`FixedFunctionStyle::Rec2100SurroundFwd`].
    Rec2100SurroundInv,
    /// RGB to hue/saturation/value.
    RgbToHsv,
    /// Hue/saturation/value to RGB.
    HsvToRgb,
    /// CIE XYZ to xyY.
    XyzToXyy,
    /// CIE xyY to XYZ.
    XyyToXyz,
    /// CIE XYZ to u'v'Y.
    XyzToUvy,
    /// CIE u'v'Y to XYZ.
    UvyToXyz,
    /// CIE XYZ to L*u*v*.
    XyzToLuv,
    /// CIE L*u*v* to XYZ.
    LuvToXyz,
}

impl FixedFunctionStyle {
    /// Every style, forward before inverse.
    pub const ALL: [FixedFunctionStyle; 20] = [
        Self::AcesRedMod03Fwd,
        Self::AcesRedMod03Inv,
        Self::AcesRedMod10Fwd,
        Self::AcesRedMod10Inv,
        Self::AcesGlow03Fwd,
        Self::AcesGlow03Inv,
        Self::AcesGlow10Fwd,
        Self::AcesGlow10Inv,
        Self::AcesDarkToDim10Fwd,
        Self::AcesDarkToDim10Inv,
        Self::Rec2100SurroundFwd,
        Self::Rec2100SurroundInv,
        Self::RgbToHsv,
        Self::HsvToRgb,
        Self::XyzToXyy,
        Self::XyyToXyz,
        Self::XyzToUvy,
        Self::UvyToXyz,
        Self::XyzToLuv,
        Self::LuvToXyz,
    ];

    /// Name used in cache IDs and messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::AcesRedMod03Fwd => "ACES_RedMod03 (Forward)",
            Self::AcesRedMod03Inv => "ACES_RedMod03 (Inverse)",
            Self::AcesRedMod10Fwd => "ACES_RedMod10 (Forward)",
            Self::AcesRedMod10Inv => "ACES_RedMod10 (Inverse)",
            Self::AcesGlow03Fwd => "ACES_Glow03 (Forward)",
            Self::AcesGlow03Inv => "ACES_Glow03 (Inverse)",
            Self::AcesGlow10Fwd => "ACES_Glow10 (Forward)",
            Self::AcesGlow10Inv => "ACES_Glow10 (Inverse)",
            Self::AcesDarkToDim10Fwd => "ACES_DarkToDim10 (Forward)",
            Self::AcesDarkToDim10Inv => "ACES_DarkToDim10 (Inverse)",
            Self::Rec2100SurroundFwd => "REC2100_Surround (Forward)",
            Self::Rec2100SurroundInv => "REC2100_Surround (Inverse)",
            Self::RgbToHsv => "RGB_TO_HSV",
            Self::HsvToRgb => "HSV_TO_RGB",
            Self::XyzToXyy => "XYZ_TO_xyY",
            Self::XyyToXyz => "xyY_TO_XYZ",
            Self::XyzToUvy => "XYZ_TO_uvY",
            Self::UvyToXyz => "uvY_TO_XYZ",
            Self::XyzToLuv => "XYZ_TO_LUV",
            Self::LuvToXyz => "LUV_TO_XYZ",
        }
    }

    /// Style undoing this one.
    pub fn inverse(&self) -> Self {
        match self {
            Self::AcesRedMod03Fwd => Self::AcesRedMod03Inv,
            Self::AcesRedMod03Inv => Self::AcesRedMod03Fwd,
            Self::AcesRedMod10Fwd => Self::AcesRedMod10Inv,
            Self::AcesRedMod10Inv => Self::AcesRedMod10Fwd,
            Self::AcesGlow03Fwd => Self::AcesGlow03Inv,
            Self::AcesGlow03Inv => Self::AcesGlow03Fwd,
            Self::AcesGlow10Fwd => Self::AcesGlow10Inv,
            Self::AcesGlow10Inv => Self::AcesGlow10Fwd,
            Self::AcesDarkToDim10Fwd => Self::AcesDarkToDim10Inv,
            Self::AcesDarkToDim10Inv => Self::AcesDarkToDim10Fwd,
            Self::Rec2100SurroundFwd => Self::Rec2100SurroundInv,
            Self::Rec2100SurroundInv => Self::Rec2100SurroundFwd,
            Self::RgbToHsv => Self::HsvToRgb,
            Self::HsvToRgb => Self::RgbToHsv,
            Self::XyzToXyy => Self::XyyToXyz,
            Self::XyyToXyz => Self::XyzToXyy,
            Self::XyzToUvy => Self::UvyToXyz,
            Self::UvyToXyz => Self::XyzToUvy,
            Self::XyzToLuv => Self::LuvToXyz,
            Self::LuvToXyz => Self::XyzToLuv,
        }
    }

    fn is_rec2100(&self) -> bool {
        matches!(self, Self::Rec2100SurroundFwd | Self::Rec2100SurroundInv)
    }
}

impl fmt::Display for FixedFunctionStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Fixed-function parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FixedFunctionOpData {
    style: FixedFunctionStyle,
    params: Vec<f64>,
}

impl FixedFunctionOpData {
    /// Style with its parameter list.
    pub fn new(style: FixedFunctionStyle, params: Vec<f64>) -> Self {
        Self { style, params }
    }

    /// Style.
    pub fn style(&self) -> FixedFunctionStyle {
        self.style
    }

    /// Replaces the style; parameters are checked at validation.
    pub fn set_style(&mut self, style: FixedFunctionStyle) {
        self.style = style;
    }

    /// Parameters.
    pub fn params(&self) -> &[f64] {
        &self.params
    }

    /// Replaces the parameters; they are checked at validation.
    pub fn set_params(&mut self, params: Vec<f64>) {
        self.params = params;
    }

    fn gamma(&self) -> f64 {
        self.params.first().copied().unwrap_or(1.0)
    }
}

impl ParamData for FixedFunctionOpData {
    const KIND: OpKind = OpKind::FixedFunction;

    fn validate(&self) -> OcioResult<()> {
        if self.style.is_rec2100() {
            if self.params.len() != 1 {
                return Err(OcioError::validation(
                    Self::KIND,
                    format!(
                        "The style 'REC2100_Surround' must have one parameter but {} found.",
                        self.params.len()
                    ),
                ));
            }
            let p = self.params[0];
            if p.is_nan() || p < REC2100_LOWER_BOUND {
                return Err(OcioError::validation(
                    Self::KIND,
                    format!(
                        "Parameter {} is less than lower bound {}",
                        message_float(p),
                        REC2100_LOWER_BOUND
                    ),
                ));
            }
            if p > REC2100_UPPER_BOUND {
                return Err(OcioError::validation(
                    Self::KIND,
                    format!(
                        "Parameter {} is greater than upper bound {}",
                        message_float(p),
                        REC2100_UPPER_BOUND
                    ),
                ));
            }
        } else if !self.params.is_empty() {
            return Err(OcioError::validation(
                Self::KIND,
                format!(
                    "The style '{}' must have zero parameters but {} found.",
                    self.style,
                    self.params.len()
                ),
            ));
        }
        Ok(())
    }

    fn is_identity(&self) -> bool {
        self.style.is_rec2100() && self.params.as_slice() == [1.0]
    }

    fn is_inverse(&self, other: &Self) -> bool {
        if self.inverse().is_ok_and(|inv| inv == *other) {
            return true;
        }
        match (self.style, other.style, self.params.as_slice(), other.params.as_slice()) {
            (
                FixedFunctionStyle::Rec2100SurroundFwd,
                FixedFunctionStyle::Rec2100SurroundFwd,
                [a],
                [b],
            ) => (a * b - 1.0).abs() <= RECIPROCAL_TOLERANCE,
            _ => false,
        }
    }

    fn inverse(&self) -> OcioResult<Self> {
        Ok(Self::new(self.style.inverse(), self.params.clone()))
    }

    fn cache_id(&self) -> String {
        let mut id = self.style.name().to_string();
        for p in &self.params {
            id.push(' ');
            id.push_str(&id_float(*p));
        }
        id
    }

    fn cpu_renderer(&self) -> OcioResult<Arc<dyn OpCpu>> {
        Ok(Arc::new(cpu::FixedFunctionCpu::new(self.style, self.gamma() as f32)))
    }

    fn emit_gpu(
        &self,
        ss: &mut GpuShaderText,
        desc: &mut GpuShaderDesc,
        _source_id: &str,
    ) -> OcioResult<()> {
        gpu::emit(ss, desc.pixel_name(), self.style, self.gamma());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::{Op, OpData};

    fn ff(style: FixedFunctionStyle, params: &[f64]) -> FixedFunctionOpData {
        FixedFunctionOpData::new(style, params.to_vec())
    }

    #[test]
    fn red_mod_defaults_and_params() {
        let mut func = FixedFunctionOpData::default();
        assert_eq!(func.style(), FixedFunctionStyle::AcesRedMod03Fwd);
        assert!(func.params().is_empty());
        func.validate().unwrap();
        let id03 = func.cache_id();

        func.set_style(FixedFunctionStyle::AcesRedMod10Fwd);
        func.validate().unwrap();
        assert_ne!(id03, func.cache_id());

        let inv = func.inverse().unwrap();
        assert_eq!(inv.style(), FixedFunctionStyle::AcesRedMod10Inv);
        assert!(inv.params().is_empty());
        assert_ne!(id03, inv.cache_id());

        func.set_params(vec![1.0]);
        let err = func.validate().unwrap_err().to_string();
        assert!(
            err.contains("The style 'ACES_RedMod10 (Forward)' must have zero parameters but 1 found."),
            "{err}"
        );
    }

    #[test]
    fn dark_to_dim_rejects_params() {
        let mut func = ff(FixedFunctionStyle::AcesDarkToDim10Fwd, &[]);
        func.validate().unwrap();
        let inv = func.inverse().unwrap();
        assert_eq!(inv.style(), FixedFunctionStyle::AcesDarkToDim10Inv);
        assert_ne!(func.cache_id(), inv.cache_id());

        func.set_params(vec![1.0]);
        let err = func.validate().unwrap_err().to_string();
        assert!(err.contains("The style 'ACES_DarkToDim10 (Forward)' must have zero parameters but 1 found."));
    }

    #[test]
    fn rec2100_parameter_checks() {
        let mut func = ff(FixedFunctionStyle::Rec2100SurroundFwd, &[2.0]);
        func.validate().unwrap();
        let inv = func.inverse().unwrap();
        assert_eq!(inv.params(), func.params());
        assert_eq!(inv.style(), FixedFunctionStyle::Rec2100SurroundInv);
        assert_ne!(func.cache_id(), inv.cache_id());
        assert_eq!(func, func.clone());
        assert_ne!(func, inv);

        let message = |f: &FixedFunctionOpData| f.validate().unwrap_err().to_string();

        func.set_params(vec![120.0]);
        assert!(message(&func).contains("Parameter 120 is greater than upper bound 100"));

        func.set_params(vec![0.00001]);
        assert!(message(&func).contains("Parameter 1e-05 is less than lower bound 0.01"));

        func.set_params(vec![0.00001, 12.0]);
        assert!(message(&func).contains("The style 'REC2100_Surround' must have one parameter but 2 found."));

        func.set_params(vec![]);
        assert!(message(&func).contains("The style 'REC2100_Surround' must have one parameter but 0 found."));
    }

    #[test]
    fn inverse_pairs() {
        let f_s = ff(FixedFunctionStyle::Rec2100SurroundFwd, &[2.0]);
        let f_s_inv1 = ff(FixedFunctionStyle::Rec2100SurroundFwd, &[0.5]);
        let f_s_inv2 = ff(FixedFunctionStyle::Rec2100SurroundInv, &[2.0]);
        assert!(f_s.is_inverse(&f_s_inv1));
        assert!(f_s.is_inverse(&f_s_inv2));
        assert!(!f_s.is_inverse(&f_s));
        assert!(!f_s_inv1.is_inverse(&f_s_inv1));
        assert!(!f_s_inv2.is_inverse(&f_s_inv2));
        assert!(!f_s_inv1.is_inverse(&f_s_inv2));

        let f_g = ff(FixedFunctionStyle::AcesGlow03Fwd, &[]);
        let f_g_inv = ff(FixedFunctionStyle::AcesGlow03Inv, &[]);
        assert!(f_g.is_inverse(&f_g_inv));
        assert!(f_g_inv.is_inverse(&f_g));
        assert!(!f_g.is_inverse(&f_g));
        assert!(!f_g_inv.is_inverse(&f_g_inv));
        assert!(!Op::new(f_g.clone()).is_inverse(&Op::new(f_s.clone())));

        let f_r = ff(FixedFunctionStyle::AcesRedMod03Fwd, &[]);
        let f_r_inv = ff(FixedFunctionStyle::AcesRedMod03Inv, &[]);
        assert!(f_r.is_inverse(&f_r_inv));
        assert!(f_r_inv.is_inverse(&f_r));
        assert!(!f_r.is_inverse(&f_r));
        assert!(!f_r.is_inverse(&f_g));
    }

    #[test]
    fn identity_only_for_unit_surround() {
        assert!(ff(FixedFunctionStyle::Rec2100SurroundFwd, &[1.0]).is_identity());
        assert!(!ff(FixedFunctionStyle::Rec2100SurroundFwd, &[0.9]).is_identity());
        for style in FixedFunctionStyle::ALL {
            if !style.is_rec2100() {
                assert!(!ff(style, &[]).is_identity(), "{style}");
            }
        }
    }

    #[test]
    fn never_combines() {
        let a = Op::new(FixedFunctionOpData::default());
        let b = Op::new(ff(FixedFunctionStyle::AcesGlow10Fwd, &[]));
        assert!(!a.can_combine_with(&b));
        let err = a.combine_with(&b).unwrap_err();
        assert!(matches!(err, OcioError::ContractViolation(_)));
        assert!(err.to_string().contains("FixedFunctionOp: can_combine_with must be checked before calling combine_with."));
    }

    #[test]
    fn style_inverse_is_involution() {
        for style in FixedFunctionStyle::ALL {
            assert_eq!(style.inverse().inverse(), style);
            assert_ne!(style.inverse(), style);
        }
    }

    #[test]
    fn cache_id_lists_params() {
        assert_eq!(ff(FixedFunctionStyle::Rec2100SurroundInv, &[0.78]).cache_id(), "REC2100_Surround (Inverse) 0.78");
        let data: OpData = ff(FixedFunctionStyle::XyzToLuv, &[]).into();
        assert_eq!(data.cache_id(), "XYZ_TO_LUV");
    }
}

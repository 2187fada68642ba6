//! Ops: the nodes of a color transform pipeline.
//!
//! Every transform kind provides a parameter-data type implementing
//! [`ParamData`]. [`OpData`] closes the set of kinds into one enum and
//! [`Op`] wraps exactly one `OpData`, adding the finalize step and the
//! cache ID.
//!
//! # Lifecycle
//!
//! ```text
//! Op::new / Op::create  -->  Constructed  --finalize()-->  Finalized
//! ```
//!
//! Identity, inverse and combination queries only read the parameter
//! data and may be asked at any time. Renderers and shader code are only
//! available once the op is finalized.

mod exponent;
pub mod fixed_function;
mod list;
mod log;
mod lut1d;
mod lut3d;
mod matrix;
mod range;

pub use exponent::{ExponentOpData, NegativeStyle};
pub use fixed_function::{FixedFunctionOpData, FixedFunctionStyle};
pub use list::OpList;
pub use log::LogOpData;
pub use lut1d::Lut1DOpData;
pub use lut3d::Lut3DOpData;
pub use matrix::MatrixOpData;
pub use range::RangeOpData;

use std::fmt;
use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::cpu::OpCpu;
use crate::error::{OcioError, OcioResult};
use crate::gpu::{GpuShaderDesc, GpuShaderText};
use crate::transform::TransformDirection;

/// Closed set of transform kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    /// Affine 4x4 matrix plus offset.
    Matrix,
    /// Scale/offset with optional clamping.
    Range,
    /// Per-channel power function.
    Exponent,
    /// Logarithm and its inverse.
    Log,
    /// Per-channel 1D lookup table.
    Lut1D,
    /// 3D lookup table.
    Lut3D,
    /// Named fixed function.
    FixedFunction,
}

impl OpKind {
    /// Op name as embedded in cache IDs and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            OpKind::Matrix => "MatrixOp",
            OpKind::Range => "RangeOp",
            OpKind::Exponent => "ExponentOp",
            OpKind::Log => "LogOp",
            OpKind::Lut1D => "Lut1DOp",
            OpKind::Lut3D => "Lut3DOp",
            OpKind::FixedFunction => "FixedFunctionOp",
        }
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Contract every kind's parameter data implements.
///
/// Inversion capability per kind:
/// - `Matrix`, `Range`, `Exponent`, `Log`, `FixedFunction` invert
///   analytically; `inverse` fails with [`OcioError::Unsupported`] when no
///   inverse exists (a singular matrix, a zero exponent).
/// - `Lut1D` and `Lut3D` flip a direction flag; the renderer inverts
///   numerically.
pub trait ParamData: Clone + fmt::Debug + Send + Sync + Sized {
    /// Kind tag.
    const KIND: OpKind;

    /// Fails with [`OcioError::Validation`] on malformed state.
    fn validate(&self) -> OcioResult<()>;

    /// True iff the transform leaves every input of its domain unchanged.
    fn is_identity(&self) -> bool;

    /// True iff `other` undoes `self`.
    fn is_inverse(&self, other: &Self) -> bool;

    /// Data of the inverse transform.
    fn inverse(&self) -> OcioResult<Self>;

    /// Deterministic fingerprint of the numeric state.
    fn cache_id(&self) -> String;

    /// True when `self` followed by `next` fuses into fewer ops.
    fn can_combine_with(&self, _next: &Self) -> bool {
        false
    }

    /// True when the fusion with `next` only approximates the pair.
    fn combination_is_lossy(&self, _next: &Self) -> bool {
        false
    }

    /// Ops equivalent to `self` followed by `next`.
    ///
    /// Only called after [`ParamData::can_combine_with`] returned true.
    fn combine_with(&self, _next: &Self) -> OcioResult<Vec<OpData>> {
        Err(OcioError::ContractViolation(format!(
            "{}: can_combine_with must be checked before calling combine_with.",
            Self::KIND
        )))
    }

    /// What stands in for `self` followed by its inverse.
    ///
    /// The same answer applies when `self` is an identity op. Kinds that
    /// clamp outside their domain return the clamp. Kinds whose pair no
    /// single op reproduces return [`Replacement::Keep`].
    fn identity_replacement(&self) -> Replacement {
        Replacement::Remove
    }

    /// CPU renderer bound to a copy of this data.
    fn cpu_renderer(&self) -> OcioResult<Arc<dyn OpCpu>>;

    /// Appends shader code reproducing the CPU renderer.
    ///
    /// `source_id` is the finalized op's cache ID, used to name resources.
    fn emit_gpu(
        &self,
        ss: &mut GpuShaderText,
        desc: &mut GpuShaderDesc,
        source_id: &str,
    ) -> OcioResult<()>;
}

/// Result of [`ParamData::identity_replacement`].
#[derive(Debug, Clone)]
pub enum Replacement {
    /// The pair is a true no-op and can be dropped.
    Remove,
    /// The pair reduces to this domain clamp.
    Clamp(OpData),
    /// The pair must stay as it is.
    Keep,
}

/// Parameter data of one op, tagged by kind.
#[derive(Debug, Clone)]
pub enum OpData {
    /// Matrix parameters.
    Matrix(MatrixOpData),
    /// Range parameters.
    Range(RangeOpData),
    /// Exponent parameters.
    Exponent(ExponentOpData),
    /// Log parameters.
    Log(LogOpData),
    /// 1D LUT parameters.
    Lut1D(Lut1DOpData),
    /// 3D LUT parameters.
    Lut3D(Lut3DOpData),
    /// Fixed function parameters.
    FixedFunction(FixedFunctionOpData),
}

macro_rules! with_data {
    ($data:expr, $d:ident => $body:expr) => {
        match $data {
            OpData::Matrix($d) => $body,
            OpData::Range($d) => $body,
            OpData::Exponent($d) => $body,
            OpData::Log($d) => $body,
            OpData::Lut1D($d) => $body,
            OpData::Lut3D($d) => $body,
            OpData::FixedFunction($d) => $body,
        }
    };
}

macro_rules! with_pair {
    ($a:expr, $b:expr, ($x:ident, $y:ident) => $body:expr, _ => $other:expr) => {
        match ($a, $b) {
            (OpData::Matrix($x), OpData::Matrix($y)) => $body,
            (OpData::Range($x), OpData::Range($y)) => $body,
            (OpData::Exponent($x), OpData::Exponent($y)) => $body,
            (OpData::Log($x), OpData::Log($y)) => $body,
            (OpData::Lut1D($x), OpData::Lut1D($y)) => $body,
            (OpData::Lut3D($x), OpData::Lut3D($y)) => $body,
            (OpData::FixedFunction($x), OpData::FixedFunction($y)) => $body,
            _ => $other,
        }
    };
}

impl OpData {
    /// Kind tag.
    pub fn kind(&self) -> OpKind {
        match self {
            OpData::Matrix(_) => OpKind::Matrix,
            OpData::Range(_) => OpKind::Range,
            OpData::Exponent(_) => OpKind::Exponent,
            OpData::Log(_) => OpKind::Log,
            OpData::Lut1D(_) => OpKind::Lut1D,
            OpData::Lut3D(_) => OpKind::Lut3D,
            OpData::FixedFunction(_) => OpKind::FixedFunction,
        }
    }

    /// See [`ParamData::validate`].
    pub fn validate(&self) -> OcioResult<()> {
        with_data!(self, d => d.validate())
    }

    /// See [`ParamData::is_identity`].
    pub fn is_identity(&self) -> bool {
        with_data!(self, d => d.is_identity())
    }

    /// See [`ParamData::cache_id`].
    pub fn cache_id(&self) -> String {
        with_data!(self, d => d.cache_id())
    }

    /// See [`ParamData::inverse`].
    pub fn inverse(&self) -> OcioResult<OpData> {
        Ok(with_data!(self, d => d.inverse()?.into()))
    }

    /// See [`ParamData::is_inverse`]. False across kinds.
    pub fn is_inverse(&self, other: &OpData) -> bool {
        with_pair!(self, other, (a, b) => a.is_inverse(b), _ => false)
    }

    fn can_combine_with(&self, next: &OpData) -> bool {
        with_pair!(self, next, (a, b) => a.can_combine_with(b), _ => false)
    }

    fn combination_is_lossy(&self, next: &OpData) -> bool {
        with_pair!(self, next, (a, b) => a.combination_is_lossy(b), _ => false)
    }

    fn combine_with(&self, next: &OpData) -> OcioResult<Vec<OpData>> {
        with_pair!(
            self,
            next,
            (a, b) => a.combine_with(b),
            _ => Err(OcioError::Unsupported(format!(
                "{} cannot combine with {}",
                self.kind(),
                next.kind()
            )))
        )
    }

    fn identity_replacement(&self) -> Replacement {
        with_data!(self, d => d.identity_replacement())
    }

    fn cpu_renderer(&self) -> OcioResult<Arc<dyn OpCpu>> {
        with_data!(self, d => d.cpu_renderer())
    }

    fn emit_gpu(
        &self,
        ss: &mut GpuShaderText,
        desc: &mut GpuShaderDesc,
        source_id: &str,
    ) -> OcioResult<()> {
        with_data!(self, d => d.emit_gpu(ss, desc, source_id))
    }
}

macro_rules! impl_from_data {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for OpData {
                fn from(data: $ty) -> Self {
                    OpData::$variant(data)
                }
            }
        )*
    };
}

impl_from_data! {
    Matrix => MatrixOpData,
    Range => RangeOpData,
    Exponent => ExponentOpData,
    Log => LogOpData,
    Lut1D => Lut1DOpData,
    Lut3D => Lut3DOpData,
    FixedFunction => FixedFunctionOpData,
}

/// One node of a pipeline, owning its parameter data.
#[derive(Debug, Clone)]
pub struct Op {
    data: OpData,
    cache_id: String,
    finalized: bool,
}

impl Op {
    /// Wraps `data` as a forward op.
    pub fn new(data: impl Into<OpData>) -> Self {
        Self {
            data: data.into(),
            cache_id: String::new(),
            finalized: false,
        }
    }

    /// Wraps `data`, substituting its inverse for [`TransformDirection::Inverse`].
    pub fn create(data: impl Into<OpData>, direction: TransformDirection) -> OcioResult<Self> {
        let data = data.into();
        match direction {
            TransformDirection::Forward => Ok(Self::new(data)),
            TransformDirection::Inverse => Ok(Self::new(data.inverse()?)),
        }
    }

    /// Kind tag.
    pub fn kind(&self) -> OpKind {
        self.data.kind()
    }

    /// Wrapped parameter data.
    pub fn data(&self) -> &OpData {
        &self.data
    }

    /// True once [`Op::finalize`] succeeded.
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// `<KindOp data-cache-id >` after finalize, empty before.
    pub fn cache_id(&self) -> &str {
        &self.cache_id
    }

    /// True iff the op leaves its input unchanged.
    pub fn is_identity(&self) -> bool {
        self.data.is_identity()
    }

    /// True iff `other` wraps the same kind.
    pub fn is_same_type(&self, other: &Op) -> bool {
        self.kind() == other.kind()
    }

    /// True iff `other` is the same kind and undoes this op.
    pub fn is_inverse(&self, other: &Op) -> bool {
        self.is_same_type(other) && self.data.is_inverse(&other.data)
    }

    /// True iff this op followed by `other` fuses into fewer ops.
    pub fn can_combine_with(&self, other: &Op) -> bool {
        self.is_same_type(other) && self.data.can_combine_with(&other.data)
    }

    /// True iff fusing with `other` is only approximate.
    pub fn combination_is_lossy(&self, other: &Op) -> bool {
        self.can_combine_with(other) && self.data.combination_is_lossy(&other.data)
    }

    /// Ops equivalent to this op followed by `other`.
    ///
    /// Fails with [`OcioError::ContractViolation`] when
    /// [`Op::can_combine_with`] is false for the pair.
    pub fn combine_with(&self, other: &Op) -> OcioResult<Vec<Op>> {
        if !self.can_combine_with(other) {
            return Err(OcioError::ContractViolation(format!(
                "{}: can_combine_with must be checked before calling combine_with.",
                self.kind()
            )));
        }
        Ok(self
            .data
            .combine_with(&other.data)?
            .into_iter()
            .map(Op::new)
            .collect())
    }

    /// What to put in place of this op and its inverse.
    pub(crate) fn identity_replacement(&self) -> Replacement {
        self.data.identity_replacement()
    }

    /// Validates the data and computes the cache ID. Idempotent.
    pub fn finalize(&mut self) -> OcioResult<()> {
        if self.finalized {
            return Ok(());
        }
        self.data.validate()?;
        self.cache_id = format!("<{} {} >", self.kind(), self.data.cache_id());
        self.finalized = true;
        Ok(())
    }

    /// CPU renderer for this op.
    pub fn cpu_op(&self) -> OcioResult<Arc<dyn OpCpu>> {
        self.require_finalized("cpu_op")?;
        self.data.cpu_renderer()
    }

    /// Appends this op's shader code to `desc`, one indented block.
    pub fn extract_gpu_shader_info(&self, desc: &mut GpuShaderDesc) -> OcioResult<()> {
        self.require_finalized("extract_gpu_shader_info")?;
        let mut ss = desc.new_text();
        {
            let mut block = ss.indent();
            self.data.emit_gpu(&mut block, desc, &self.cache_id)?;
        }
        desc.add_to_function_shader_code(ss.as_str());
        Ok(())
    }

    fn require_finalized(&self, call: &str) -> OcioResult<()> {
        if self.finalized {
            Ok(())
        } else {
            Err(OcioError::ContractViolation(format!(
                "{}: finalize must be called before {call}.",
                self.kind()
            )))
        }
    }
}

/// SHA-256 hex digest of a float sequence. `-0.0` hashes like `0.0`.
pub(crate) fn digest_f64s(values: impl IntoIterator<Item = f64>) -> String {
    let mut hasher = Sha256::new();
    for v in values {
        hasher.update((v + 0.0).to_le_bytes());
    }
    format!("{:x}", hasher.finalize())
}

/// Text form of a float for textual cache IDs.
pub(crate) fn id_float(v: f64) -> String {
    format!("{}", v + 0.0)
}

/// Six significant digits, switching to an exponent outside
/// `[1e-4, 1e6)`: `120`, `0.78`, `1e-05`.
pub(crate) fn message_float(v: f64) -> String {
    const DIGITS: usize = 6;
    if v == 0.0 || !v.is_finite() {
        return format!("{}", v + 0.0);
    }
    let sci = format!("{:.*e}", DIGITS - 1, v);
    let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or(0);
    if exp < -4 || exp >= DIGITS as i32 {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{sign}{:02}", trim_fraction(mantissa), exp.abs())
    } else {
        let decimals = (DIGITS as i32 - 1 - exp).max(0) as usize;
        trim_fraction(&format!("{v:.decimals$}")).to_string()
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_float_matches_stream_output() {
        assert_eq!(message_float(120.0), "120");
        assert_eq!(message_float(0.00001), "1e-05");
        assert_eq!(message_float(0.01), "0.01");
        assert_eq!(message_float(2.5e7), "2.5e+07");
        assert_eq!(message_float(1.0 / 3.0), "0.333333");
        assert_eq!(message_float(-0.0), "0");
    }

    #[test]
    fn cache_id_empty_until_finalized() {
        let mut op = Op::new(MatrixOpData::scale([2.0, 2.0, 2.0, 1.0]));
        assert_eq!(op.cache_id(), "");
        assert!(op.cpu_op().is_err());
        op.finalize().unwrap();
        assert!(op.cache_id().starts_with("<MatrixOp "));
        assert!(op.cache_id().ends_with(" >"));
    }

    #[test]
    fn finalize_is_idempotent() {
        let mut op = Op::new(FixedFunctionOpData::default());
        op.finalize().unwrap();
        let first = op.cache_id().to_string();
        op.finalize().unwrap();
        assert_eq!(op.cache_id(), first);
        assert_eq!(first, "<FixedFunctionOp ACES_RedMod03 (Forward) >");
    }

    #[test]
    fn combine_without_check_is_contract_violation() {
        let ff = Op::new(FixedFunctionOpData::default());
        let err = ff.combine_with(&ff).unwrap_err();
        assert!(matches!(err, OcioError::ContractViolation(_)));
        assert!(err.to_string().contains("can_combine_with must be checked"));

        let m = Op::new(MatrixOpData::identity());
        let err = m.combine_with(&ff).unwrap_err();
        assert!(matches!(err, OcioError::ContractViolation(_)));
    }

    #[test]
    fn different_kinds_never_inverse() {
        let m = Op::new(MatrixOpData::identity());
        let r = Op::new(RangeOpData::default());
        assert!(!m.is_same_type(&r));
        assert!(!m.is_inverse(&r));
        assert!(!m.can_combine_with(&r));
    }

    #[test]
    fn create_inverse_substitutes_data() {
        let op = Op::create(
            FixedFunctionOpData::new(FixedFunctionStyle::AcesGlow10Fwd, vec![]),
            TransformDirection::Inverse,
        )
        .unwrap();
        match op.data() {
            OpData::FixedFunction(d) => assert_eq!(d.style(), FixedFunctionStyle::AcesGlow10Inv),
            other => panic!("unexpected data {other:?}"),
        }
    }

    #[test]
    fn digest_ignores_zero_sign() {
        assert_eq!(digest_f64s([0.0, 1.0]), digest_f64s([-0.0, 1.0]));
        assert_ne!(digest_f64s([0.0, 1.0]), digest_f64s([0.0, 1.5]));
    }

    #[test]
    fn finalized_op_shares_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Op>();
        assert_send_sync::<Arc<dyn OpCpu>>();
    }
}

//! Transform descriptions and their expansion into ops.
//!
//! A [`Transform`] is the user-facing description of one step of a color
//! pipeline. [`Transform::build_ops`] expands it into [`Op`](crate::ops::Op)s
//! appended to an [`OpList`] in application order:
//! - Matrix, range, exponent and log transforms map to one op each
//! - LUT transforms wrap in-memory LUTs
//! - File transforms decode `.spi1d` / `.itx` files
//! - Group transforms chain other transforms
//!
//! Directions compose: a transform marked inverse, built in the inverse
//! direction, runs forward.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::debug;
use vfx_lut::{Interpolation, Lut1D, Lut3D};

use crate::error::{OcioError, OcioResult};
use crate::ops::{
    ExponentOpData, FixedFunctionOpData, FixedFunctionStyle, LogOpData, Lut1DOpData, Lut3DOpData,
    MatrixOpData, NegativeStyle, OpData, OpList, ParamData, RangeOpData,
};

/// Transform application direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TransformDirection {
    /// Forward transform.
    #[default]
    Forward,
    /// Inverse transform.
    Inverse,
}

impl TransformDirection {
    /// Returns the opposite direction.
    #[inline]
    pub fn inverse(self) -> Self {
        match self {
            Self::Forward => Self::Inverse,
            Self::Inverse => Self::Forward,
        }
    }

    /// Direction of a step marked `self` run inside a pass in direction `outer`.
    #[inline]
    pub fn combine(self, outer: Self) -> Self {
        if self == outer {
            Self::Forward
        } else {
            Self::Inverse
        }
    }
}

impl fmt::Display for TransformDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Forward => "forward",
            Self::Inverse => "inverse",
        })
    }
}

/// Color transform description.
#[derive(Debug, Clone)]
pub enum Transform {
    /// 4x4 matrix plus offset.
    Matrix(MatrixTransform),
    /// Range remapping with optional clamp.
    Range(RangeTransform),
    /// Per-channel exponent.
    Exponent(ExponentTransform),
    /// Logarithm.
    Log(LogTransform),
    /// Fixed function (ACES, surround, color models).
    FixedFunction(FixedFunctionTransform),
    /// In-memory 1D LUT.
    Lut1D(Lut1DTransform),
    /// In-memory 3D LUT.
    Lut3D(Lut3DTransform),
    /// LUT read from a file.
    File(FileTransform),
    /// Ordered list of transforms.
    Group(GroupTransform),
}

/// Matrix transform.
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixTransform {
    /// 4x4 matrix (row-major).
    pub matrix: [f64; 16],
    /// RGBA offset added after the matrix.
    pub offset: [f64; 4],
    /// Direction.
    pub direction: TransformDirection,
}

impl MatrixTransform {
    /// Identity matrix.
    pub const IDENTITY: [f64; 16] = [
        1.0, 0.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    ];

    /// Forward matrix transform.
    pub fn new(matrix: [f64; 16], offset: [f64; 4]) -> Self {
        Self {
            matrix,
            offset,
            direction: TransformDirection::Forward,
        }
    }

    /// Per-channel scale.
    pub fn scale(s: [f64; 4]) -> Self {
        let mut matrix = Self::IDENTITY;
        for (i, v) in s.iter().enumerate() {
            matrix[i * 5] = *v;
        }
        Self::new(matrix, [0.0; 4])
    }

    /// Per-channel offset.
    pub fn offset(o: [f64; 4]) -> Self {
        Self::new(Self::IDENTITY, o)
    }
}

impl Default for MatrixTransform {
    fn default() -> Self {
        Self::new(Self::IDENTITY, [0.0; 4])
    }
}

/// Range transform style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RangeStyle {
    /// Clamp values to the output range.
    #[default]
    Clamp,
    /// Scale and offset only.
    NoClamp,
}

/// Range transform.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RangeTransform {
    /// Input min (None = open).
    pub min_in: Option<f64>,
    /// Input max.
    pub max_in: Option<f64>,
    /// Output min.
    pub min_out: Option<f64>,
    /// Output max.
    pub max_out: Option<f64>,
    /// Style.
    pub style: RangeStyle,
    /// Direction.
    pub direction: TransformDirection,
}

impl RangeTransform {
    /// Clamp to `[min, max]`.
    pub fn clamp(min: f64, max: f64) -> Self {
        Self {
            min_in: Some(min),
            max_in: Some(max),
            min_out: Some(min),
            max_out: Some(max),
            ..Default::default()
        }
    }

    fn data(&self) -> RangeOpData {
        RangeOpData::new(self.min_in, self.max_in, self.min_out, self.max_out)
    }

    /// Unclamped equivalent: a fit or offset matrix, `None` without bounds.
    fn no_clamp_matrix(&self) -> OcioResult<Option<MatrixOpData>> {
        self.data().validate()?;
        let rgb = |v: f64| [v, v, v, 0.0];
        match (self.min_in, self.max_in, self.min_out, self.max_out) {
            (Some(lo_in), Some(hi_in), Some(lo_out), Some(hi_out)) => {
                MatrixOpData::fit(lo_in, hi_in, lo_out, hi_out).map(Some)
            }
            (Some(lo_in), None, Some(lo_out), None) => {
                Ok(Some(MatrixOpData::offset(rgb(lo_out - lo_in))))
            }
            (None, Some(hi_in), None, Some(hi_out)) => {
                Ok(Some(MatrixOpData::offset(rgb(hi_out - hi_in))))
            }
            _ => Ok(None),
        }
    }
}

/// Exponent (gamma) transform.
#[derive(Debug, Clone, PartialEq)]
pub struct ExponentTransform {
    /// RGBA exponents.
    pub value: [f64; 4],
    /// Handling of negative inputs.
    pub negative_style: NegativeStyle,
    /// Direction.
    pub direction: TransformDirection,
}

impl ExponentTransform {
    /// Same exponent on RGB, alpha untouched.
    pub fn uniform(gamma: f64) -> Self {
        Self {
            value: [gamma, gamma, gamma, 1.0],
            negative_style: NegativeStyle::default(),
            direction: TransformDirection::Forward,
        }
    }
}

/// Log transform.
#[derive(Debug, Clone, PartialEq)]
pub struct LogTransform {
    /// Log base.
    pub base: f64,
    /// Direction: forward is lin-to-log.
    pub direction: TransformDirection,
}

impl Default for LogTransform {
    fn default() -> Self {
        Self {
            base: 2.0,
            direction: TransformDirection::Forward,
        }
    }
}

/// Fixed function transform.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FixedFunctionTransform {
    /// Function style.
    pub style: FixedFunctionStyle,
    /// Parameters.
    pub params: Vec<f64>,
    /// Direction.
    pub direction: TransformDirection,
}

impl FixedFunctionTransform {
    /// Forward transform of `style` without parameters.
    pub fn new(style: FixedFunctionStyle) -> Self {
        Self {
            style,
            ..Default::default()
        }
    }
}

/// In-memory 1D LUT transform.
#[derive(Debug, Clone, PartialEq)]
pub struct Lut1DTransform {
    /// LUT samples.
    pub lut: Lut1D,
    /// Direction.
    pub direction: TransformDirection,
}

/// In-memory 3D LUT transform.
#[derive(Debug, Clone, PartialEq)]
pub struct Lut3DTransform {
    /// LUT grid.
    pub lut: Lut3D,
    /// Direction.
    pub direction: TransformDirection,
}

/// LUT file transform.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileTransform {
    /// LUT file path.
    pub src: PathBuf,
    /// Interpolation overriding the file's.
    pub interpolation: Option<Interpolation>,
    /// Direction.
    pub direction: TransformDirection,
}

/// Group of transforms applied in order.
#[derive(Debug, Clone, Default)]
pub struct GroupTransform {
    /// Child transforms.
    pub transforms: Vec<Transform>,
    /// Direction.
    pub direction: TransformDirection,
}

impl Transform {
    /// Matrix transform.
    pub fn matrix(matrix: [f64; 16]) -> Self {
        Self::Matrix(MatrixTransform::new(matrix, [0.0; 4]))
    }

    /// Group transform.
    pub fn group(transforms: Vec<Transform>) -> Self {
        Self::Group(GroupTransform {
            transforms,
            direction: TransformDirection::Forward,
        })
    }

    /// File transform.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(FileTransform {
            src: path.into(),
            ..Default::default()
        })
    }

    /// Direction of this transform.
    pub fn direction(&self) -> TransformDirection {
        match self {
            Self::Matrix(t) => t.direction,
            Self::Range(t) => t.direction,
            Self::Exponent(t) => t.direction,
            Self::Log(t) => t.direction,
            Self::FixedFunction(t) => t.direction,
            Self::Lut1D(t) => t.direction,
            Self::Lut3D(t) => t.direction,
            Self::File(t) => t.direction,
            Self::Group(t) => t.direction,
        }
    }

    fn direction_mut(&mut self) -> &mut TransformDirection {
        match self {
            Self::Matrix(t) => &mut t.direction,
            Self::Range(t) => &mut t.direction,
            Self::Exponent(t) => &mut t.direction,
            Self::Log(t) => &mut t.direction,
            Self::FixedFunction(t) => &mut t.direction,
            Self::Lut1D(t) => &mut t.direction,
            Self::Lut3D(t) => &mut t.direction,
            Self::File(t) => &mut t.direction,
            Self::Group(t) => &mut t.direction,
        }
    }

    /// Returns the inverse of this transform.
    pub fn inverse(mut self) -> Self {
        let dir = self.direction_mut();
        *dir = dir.inverse();
        self
    }

    /// Appends the ops of this transform, run in direction `dir`, to `ops`.
    pub fn build_ops(&self, ops: &mut OpList, dir: TransformDirection) -> OcioResult<()> {
        let dir = self.direction().combine(dir);
        match self {
            Self::Matrix(t) => ops.push_data(MatrixOpData::new(t.matrix, t.offset), dir),
            Self::Range(t) => match t.style {
                RangeStyle::Clamp => ops.push_data(t.data(), dir),
                RangeStyle::NoClamp => match t.no_clamp_matrix()? {
                    Some(m) => ops.push_data(m, dir),
                    None => Ok(()),
                },
            },
            Self::Exponent(t) => ops.push_data(ExponentOpData::new(t.value, t.negative_style), dir),
            Self::Log(t) => ops.push_data(LogOpData::new(t.base, TransformDirection::Forward), dir),
            Self::FixedFunction(t) => {
                ops.push_data(FixedFunctionOpData::new(t.style, t.params.clone()), dir)
            }
            Self::Lut1D(t) => ops.push_data(
                Lut1DOpData::new(t.lut.clone(), dir),
                TransformDirection::Forward,
            ),
            Self::Lut3D(t) => ops.push_data(
                Lut3DOpData::new(t.lut.clone(), dir),
                TransformDirection::Forward,
            ),
            Self::File(t) => build_file_ops(t, ops, dir),
            Self::Group(t) => {
                match dir {
                    TransformDirection::Forward => {
                        for child in &t.transforms {
                            child.build_ops(ops, TransformDirection::Forward)?;
                        }
                    }
                    TransformDirection::Inverse => {
                        for child in t.transforms.iter().rev() {
                            child.build_ops(ops, TransformDirection::Inverse)?;
                        }
                    }
                }
                Ok(())
            }
        }
    }
}

impl From<MatrixTransform> for Transform {
    fn from(t: MatrixTransform) -> Self {
        Self::Matrix(t)
    }
}

impl From<RangeTransform> for Transform {
    fn from(t: RangeTransform) -> Self {
        Self::Range(t)
    }
}

impl From<ExponentTransform> for Transform {
    fn from(t: ExponentTransform) -> Self {
        Self::Exponent(t)
    }
}

impl From<LogTransform> for Transform {
    fn from(t: LogTransform) -> Self {
        Self::Log(t)
    }
}

impl From<FixedFunctionTransform> for Transform {
    fn from(t: FixedFunctionTransform) -> Self {
        Self::FixedFunction(t)
    }
}

impl From<Lut1DTransform> for Transform {
    fn from(t: Lut1DTransform) -> Self {
        Self::Lut1D(t)
    }
}

impl From<Lut3DTransform> for Transform {
    fn from(t: Lut3DTransform) -> Self {
        Self::Lut3D(t)
    }
}

impl From<FileTransform> for Transform {
    fn from(t: FileTransform) -> Self {
        Self::File(t)
    }
}

impl From<GroupTransform> for Transform {
    fn from(t: GroupTransform) -> Self {
        Self::Group(t)
    }
}

fn build_file_ops(t: &FileTransform, ops: &mut OpList, dir: TransformDirection) -> OcioResult<()> {
    let path = t.src.as_path();
    if !path.exists() {
        return Err(OcioError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let steps = read_lut_file(path, t.interpolation)?;
    debug!(path = %path.display(), ops = steps.len(), %dir, "Loaded LUT file");
    match dir {
        TransformDirection::Forward => {
            for data in steps {
                ops.push_data(data, TransformDirection::Forward)?;
            }
        }
        TransformDirection::Inverse => {
            for data in steps.into_iter().rev() {
                ops.push_data(data, TransformDirection::Inverse)?;
            }
        }
    }
    Ok(())
}

/// Forward op sequence stored in a LUT file.
fn read_lut_file(path: &Path, interpolation: Option<Interpolation>) -> OcioResult<Vec<OpData>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "spi1d" => {
            let spi = vfx_lut::read_spi1d(path)?;
            let mut lut = spi.lut;
            if let Some(interp) = interpolation {
                lut = lut.with_interpolation(interp);
            }
            let fit = MatrixOpData::fit(spi.from_min as f64, spi.from_max as f64, 0.0, 1.0)?;
            Ok(vec![
                fit.into(),
                Lut1DOpData::new(lut, TransformDirection::Forward).into(),
            ])
        }
        "itx" => {
            let mut lut = vfx_lut::read_itx(path)?;
            if let Some(interp) = interpolation {
                lut = lut.with_interpolation(interp);
            }
            Ok(vec![Lut3DOpData::new(lut, TransformDirection::Forward).into()])
        }
        _ => Err(OcioError::Unsupported(format!(
            "unsupported LUT file format '{}'",
            path.display()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::OpKind;

    fn kinds(ops: &OpList) -> Vec<OpKind> {
        ops.iter().map(|op| op.kind()).collect()
    }

    #[test]
    fn directions_compose() {
        use TransformDirection::*;
        assert_eq!(Forward.combine(Forward), Forward);
        assert_eq!(Inverse.combine(Inverse), Forward);
        assert_eq!(Inverse.combine(Forward), Inverse);
        assert_eq!(Forward.combine(Inverse), Inverse);
        assert_eq!(Inverse.to_string(), "inverse");
    }

    #[test]
    fn inverse_matrix_substitutes_data() {
        let t = Transform::from(MatrixTransform::scale([2.0, 4.0, 8.0, 1.0]));
        let mut ops = OpList::new();
        t.build_ops(&mut ops, TransformDirection::Inverse).unwrap();
        let OpData::Matrix(m) = ops.as_slice()[0].data() else {
            panic!("expected a matrix");
        };
        assert_eq!(m.matrix()[0], 0.5);
        assert_eq!(m.matrix()[5], 0.25);
    }

    #[test]
    fn double_inverse_is_forward() {
        let t = Transform::from(FixedFunctionTransform::new(FixedFunctionStyle::RgbToHsv)).inverse();
        let mut ops = OpList::new();
        t.build_ops(&mut ops, TransformDirection::Inverse).unwrap();
        let OpData::FixedFunction(ff) = ops.as_slice()[0].data() else {
            panic!("expected a fixed function");
        };
        assert_eq!(ff.style(), FixedFunctionStyle::RgbToHsv);
    }

    #[test]
    fn inverse_group_reverses_children() {
        let group = Transform::group(vec![
            MatrixTransform::scale([2.0, 2.0, 2.0, 1.0]).into(),
            LogTransform::default().into(),
            FixedFunctionTransform::new(FixedFunctionStyle::XyzToXyy).into(),
        ]);
        let mut ops = OpList::new();
        group.build_ops(&mut ops, TransformDirection::Forward).unwrap();
        assert_eq!(kinds(&ops), [OpKind::Matrix, OpKind::Log, OpKind::FixedFunction]);

        let mut ops = OpList::new();
        group.inverse().build_ops(&mut ops, TransformDirection::Forward).unwrap();
        assert_eq!(kinds(&ops), [OpKind::FixedFunction, OpKind::Log, OpKind::Matrix]);
        let OpData::FixedFunction(ff) = ops.as_slice()[0].data() else {
            panic!("expected a fixed function");
        };
        assert_eq!(ff.style(), FixedFunctionStyle::XyyToXyz);
    }

    #[test]
    fn no_clamp_range_is_a_matrix() {
        let t = RangeTransform {
            min_in: Some(0.0),
            max_in: Some(1.0),
            min_out: Some(0.5),
            max_out: Some(1.5),
            style: RangeStyle::NoClamp,
            ..Default::default()
        };
        let mut ops = OpList::new();
        Transform::from(t).build_ops(&mut ops, TransformDirection::Forward).unwrap();
        assert_eq!(kinds(&ops), [OpKind::Matrix]);

        let mut ops = OpList::new();
        Transform::from(RangeTransform {
            style: RangeStyle::NoClamp,
            ..Default::default()
        })
        .build_ops(&mut ops, TransformDirection::Forward)
        .unwrap();
        assert!(ops.is_empty());
    }

    #[test]
    fn missing_file_and_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let mut ops = OpList::new();
        let err = Transform::file(dir.path().join("absent.spi1d"))
            .build_ops(&mut ops, TransformDirection::Forward)
            .unwrap_err();
        assert!(matches!(err, OcioError::FileNotFound { .. }));

        let path = dir.path().join("grade.cube");
        std::fs::write(&path, "LUT_1D_SIZE 2\n0 0 0\n1 1 1\n").unwrap();
        let err = Transform::file(&path)
            .build_ops(&mut ops, TransformDirection::Forward)
            .unwrap_err();
        assert!(matches!(err, OcioError::Unsupported(_)));
    }

    #[test]
    fn spi1d_inverse_reverses_steps() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("curve.spi1d");
        std::fs::write(
            &path,
            "Version 1\nFrom -0.5 1.5\nLength 3\nComponents 1\n{\n0.0\n0.25\n1.0\n}\n",
        )
        .unwrap();
        let mut ops = OpList::new();
        Transform::file(&path).build_ops(&mut ops, TransformDirection::Forward).unwrap();
        assert_eq!(kinds(&ops), [OpKind::Matrix, OpKind::Lut1D]);

        let mut ops = OpList::new();
        Transform::file(&path).build_ops(&mut ops, TransformDirection::Inverse).unwrap();
        assert_eq!(kinds(&ops), [OpKind::Lut1D, OpKind::Matrix]);
        let OpData::Lut1D(lut) = ops.as_slice()[0].data() else {
            panic!("expected a 1D LUT");
        };
        assert_eq!(lut.direction(), TransformDirection::Inverse);
    }
}

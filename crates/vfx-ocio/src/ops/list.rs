//! Ordered op pipeline and its optimizer.
//!
//! The list is always in application order: inverse directions are
//! resolved when an op is appended, never by iterating backwards.
//!
//! # Optimization
//!
//! [`OpList::optimize`] rewrites only adjacent ops:
//!
//! 1. identity ops are dropped (or replaced by the clamp they still apply);
//! 2. adjacent inverse pairs cancel, unless no single clamp reproduces them;
//! 3. adjacent combinable pairs fuse;
//!
//! repeating 2 and 3 until the length stops changing. Each pass either
//! shrinks the list or ends the loop, and the pass count is bounded by
//! the initial length.

use std::slice;

use tracing::{debug, trace};

use super::{Op, OpData, Replacement};
use crate::config::OptimizationFlags;
use crate::error::OcioResult;
use crate::transform::TransformDirection;

/// Ordered sequence of ops.
#[derive(Debug, Clone, Default)]
pub struct OpList {
    ops: Vec<Op>,
}

impl OpList {
    /// Empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an op.
    pub fn push(&mut self, op: Op) {
        self.ops.push(op);
    }

    /// Appends `data` in `direction`, substituting its inverse when needed.
    pub fn push_data(
        &mut self,
        data: impl Into<OpData>,
        direction: TransformDirection,
    ) -> OcioResult<()> {
        self.ops.push(Op::create(data, direction)?);
        Ok(())
    }

    /// Appends every op of `other`, keeping its order.
    pub fn append(&mut self, other: &mut OpList) {
        self.ops.append(&mut other.ops);
    }

    /// Number of ops.
    #[inline]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// True when there are no ops.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Ops in application order.
    #[inline]
    pub fn as_slice(&self) -> &[Op] {
        &self.ops
    }

    /// Iterator over the ops in application order.
    pub fn iter(&self) -> slice::Iter<'_, Op> {
        self.ops.iter()
    }

    /// True when every op has been finalized.
    pub fn is_finalized(&self) -> bool {
        self.ops.iter().all(Op::is_finalized)
    }

    /// Rewrites the list into an equivalent, shorter one.
    ///
    /// Fails only if a kind's combination fails after reporting that it
    /// can combine.
    pub fn optimize(&mut self, flags: OptimizationFlags) -> OcioResult<()> {
        if flags.is_empty() || self.ops.is_empty() {
            return Ok(());
        }
        let before = self.ops.len();

        if flags.contains(OptimizationFlags::REMOVE_IDENTITY) {
            self.remove_identities();
        }

        let max_passes = self.ops.len() + 1;
        let mut passes = 0;
        while passes < max_passes {
            passes += 1;
            let len = self.ops.len();
            if flags.contains(OptimizationFlags::REMOVE_INVERSE_PAIRS) {
                self.remove_inverse_pairs();
            }
            if flags.contains(OptimizationFlags::COMBINE) {
                self.combine_pairs(flags.contains(OptimizationFlags::COMPOSE_LUTS))?;
            }
            if flags.contains(OptimizationFlags::REMOVE_IDENTITY) {
                self.remove_identities();
            }
            if self.ops.len() == len {
                break;
            }
        }

        debug!(
            before,
            after = self.ops.len(),
            passes,
            flags = flags.bits(),
            "Optimized op list"
        );
        Ok(())
    }

    /// Finalizes every op in order.
    pub fn finalize(&mut self) -> OcioResult<()> {
        for op in &mut self.ops {
            op.finalize()?;
        }
        debug!(ops = self.ops.len(), "Finalized op list");
        Ok(())
    }

    /// Op cache IDs in order, space separated, in brackets.
    ///
    /// Ops that are not finalized contribute an empty ID.
    pub fn cache_id(&self) -> String {
        let ids: Vec<&str> = self.ops.iter().map(Op::cache_id).collect();
        format!("[{}]", ids.join(" "))
    }

    fn remove_identities(&mut self) -> usize {
        let mut removed = 0;
        let ops = std::mem::take(&mut self.ops);
        self.ops.reserve(ops.len());
        for op in ops {
            if !op.is_identity() {
                self.ops.push(op);
                continue;
            }
            match op.identity_replacement() {
                Replacement::Remove => trace!(kind = %op.kind(), "Removed identity op"),
                Replacement::Clamp(clamp) => {
                    trace!(kind = %op.kind(), "Replaced identity op by its domain clamp");
                    self.ops.push(Op::new(clamp));
                }
                Replacement::Keep => {
                    self.ops.push(op);
                    continue;
                }
            }
            removed += 1;
        }
        removed
    }

    fn remove_inverse_pairs(&mut self) -> usize {
        let mut removed = 0;
        let mut i = 0;
        while i + 1 < self.ops.len() {
            if !self.ops[i].is_inverse(&self.ops[i + 1]) {
                i += 1;
                continue;
            }
            let kind = self.ops[i].kind();
            match self.ops[i].identity_replacement() {
                Replacement::Remove => {
                    trace!(%kind, index = i, "Removed inverse pair");
                    self.ops.drain(i..i + 2);
                }
                Replacement::Clamp(clamp) => {
                    trace!(%kind, index = i, "Replaced inverse pair by its domain clamp");
                    self.ops.splice(i..i + 2, [Op::new(clamp)]);
                }
                Replacement::Keep => {
                    trace!(%kind, index = i, "Kept inverse pair without an equivalent clamp");
                    i += 1;
                    continue;
                }
            }
            removed += 1;
            // the op before the pair now has a new neighbor
            i = i.saturating_sub(1);
        }
        removed
    }

    fn combine_pairs(&mut self, allow_lossy: bool) -> OcioResult<usize> {
        let mut combined = 0;
        let mut i = 0;
        while i + 1 < self.ops.len() {
            let (a, b) = (&self.ops[i], &self.ops[i + 1]);
            if !a.can_combine_with(b) || (!allow_lossy && a.combination_is_lossy(b)) {
                i += 1;
                continue;
            }
            let kind = a.kind();
            let fused = a.combine_with(b)?;
            if fused.len() >= 2 {
                i += 1;
                continue;
            }
            trace!(%kind, index = i, into = fused.len(), "Combined adjacent ops");
            self.ops.splice(i..i + 2, fused);
            combined += 1;
            i = i.saturating_sub(1);
        }
        Ok(combined)
    }
}

impl From<Vec<Op>> for OpList {
    fn from(ops: Vec<Op>) -> Self {
        Self { ops }
    }
}

impl FromIterator<Op> for OpList {
    fn from_iter<I: IntoIterator<Item = Op>>(iter: I) -> Self {
        Self {
            ops: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for OpList {
    type Item = Op;
    type IntoIter = std::vec::IntoIter<Op>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.into_iter()
    }
}

impl<'a> IntoIterator for &'a OpList {
    type Item = &'a Op;
    type IntoIter = slice::Iter<'a, Op>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::{
        ExponentOpData, FixedFunctionOpData, FixedFunctionStyle, Lut1DOpData, MatrixOpData,
        NegativeStyle, OpKind, RangeOpData,
    };
    use vfx_lut::Lut1D;

    const ALL: OptimizationFlags = OptimizationFlags::ALL;

    fn kinds(list: &OpList) -> Vec<OpKind> {
        list.iter().map(Op::kind).collect()
    }

    fn gamma_lut() -> Lut1D {
        Lut1D::from_fn(64, |x| [x.powf(2.2); 3]).unwrap()
    }

    #[test]
    fn scale_pair_collapses_to_nothing() {
        let mut list = OpList::new();
        list.push(Op::new(MatrixOpData::scale([2.0, 2.0, 2.0, 1.0])));
        list.push(Op::new(MatrixOpData::scale([0.5, 0.5, 0.5, 1.0])));
        list.optimize(OptimizationFlags::LOSSLESS).unwrap();
        assert!(list.is_empty());
        list.finalize().unwrap();
        assert_eq!(list.cache_id(), "[]");
    }

    #[test]
    fn fixed_function_and_inverse_cancel() {
        let ff = FixedFunctionOpData::new(FixedFunctionStyle::AcesGlow03Fwd, vec![]);
        let mut list = OpList::new();
        list.push_data(ff.clone(), TransformDirection::Forward).unwrap();
        list.push_data(ff, TransformDirection::Inverse).unwrap();
        assert!(list.as_slice()[0].is_inverse(&list.as_slice()[1]));
        list.optimize(OptimizationFlags::LOSSLESS).unwrap();
        assert!(list.is_empty());
    }

    #[test]
    fn no_flags_leaves_list_untouched() {
        let mut list = OpList::new();
        list.push(Op::new(MatrixOpData::identity()));
        list.push(Op::new(MatrixOpData::identity()));
        list.optimize(OptimizationFlags::NONE).unwrap();
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn unrelated_ops_keep_their_order() {
        let mut list = OpList::new();
        list.push_data(Lut1DOpData::new(gamma_lut(), TransformDirection::Forward), TransformDirection::Forward)
            .unwrap();
        list.push(Op::new(MatrixOpData::scale([0.5, 0.5, 0.5, 1.0])));
        list.push(Op::new(FixedFunctionOpData::default()));
        list.optimize(ALL).unwrap();
        assert_eq!(kinds(&list), [OpKind::Lut1D, OpKind::Matrix, OpKind::FixedFunction]);
    }

    #[test]
    fn matrices_separated_by_other_op_do_not_fuse() {
        let mut list = OpList::new();
        list.push(Op::new(MatrixOpData::scale([2.0; 4])));
        list.push(Op::new(FixedFunctionOpData::default()));
        list.push(Op::new(MatrixOpData::scale([0.5; 4])));
        list.optimize(ALL).unwrap();
        assert_eq!(kinds(&list), [OpKind::Matrix, OpKind::FixedFunction, OpKind::Matrix]);
    }

    #[test]
    fn nested_inverse_pairs_unwind() {
        let a = MatrixOpData::scale([2.0, 3.0, 4.0, 1.0]);
        let ff = FixedFunctionOpData::new(FixedFunctionStyle::RgbToHsv, vec![]);
        let mut list = OpList::new();
        list.push_data(a.clone(), TransformDirection::Forward).unwrap();
        list.push_data(ff.clone(), TransformDirection::Forward).unwrap();
        list.push_data(ff, TransformDirection::Inverse).unwrap();
        list.push_data(a, TransformDirection::Inverse).unwrap();
        list.optimize(OptimizationFlags::LOSSLESS).unwrap();
        assert!(list.is_empty());
    }

    #[test]
    fn lut_pair_leaves_its_clamp() {
        let lut = Lut1DOpData::new(gamma_lut(), TransformDirection::Forward);
        let mut list = OpList::new();
        list.push_data(lut.clone(), TransformDirection::Forward).unwrap();
        list.push_data(lut, TransformDirection::Inverse).unwrap();
        list.optimize(OptimizationFlags::LOSSLESS).unwrap();
        assert_eq!(kinds(&list), [OpKind::Range]);
        match list.as_slice()[0].data() {
            OpData::Range(r) => {
                assert_eq!((r.min_in(), r.max_in()), (Some(0.0), Some(1.0)));
                assert_eq!((r.min_out(), r.max_out()), (Some(0.0), Some(1.0)));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn identity_lut_becomes_clamp() {
        let mut list = OpList::new();
        list.push(Op::new(Lut1DOpData::new(Lut1D::identity(32), TransformDirection::Forward)));
        list.optimize(OptimizationFlags::REMOVE_IDENTITY).unwrap();
        assert_eq!(kinds(&list), [OpKind::Range]);
    }

    #[test]
    fn lossy_lut_composition_needs_flag() {
        let lut = Lut1DOpData::new(gamma_lut(), TransformDirection::Forward);
        let mut list = OpList::new();
        list.push(Op::new(lut.clone()));
        list.push(Op::new(lut));
        let mut lossless = list.clone();
        lossless.optimize(OptimizationFlags::LOSSLESS).unwrap();
        assert_eq!(lossless.len(), 2);
        list.optimize(ALL).unwrap();
        assert_eq!(kinds(&list), [OpKind::Lut1D]);
    }

    #[test]
    fn clamp_exponents_fuse_but_keep_clamp() {
        let e = ExponentOpData::new([2.0; 4], NegativeStyle::Clamp);
        let mut list = OpList::new();
        list.push_data(e.clone(), TransformDirection::Forward).unwrap();
        list.push_data(e, TransformDirection::Inverse).unwrap();
        list.optimize(ALL).unwrap();
        assert_eq!(kinds(&list), [OpKind::Exponent]);
    }

    #[test]
    fn range_chain_reduces() {
        let mut list = OpList::new();
        list.push(Op::new(RangeOpData::new(Some(0.0), Some(1.0), Some(0.0), Some(2.0))));
        list.push(Op::new(RangeOpData::new(Some(0.0), Some(2.0), Some(0.0), Some(1.0))));
        list.optimize(ALL).unwrap();
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn optimization_is_idempotent() {
        let mut list = OpList::new();
        list.push(Op::new(MatrixOpData::scale([2.0, 1.0, 1.0, 1.0])));
        list.push(Op::new(MatrixOpData::offset([0.1, 0.0, 0.0, 0.0])));
        list.push(Op::new(FixedFunctionOpData::new(FixedFunctionStyle::XyzToXyy, vec![])));
        list.push(Op::new(ExponentOpData::new([2.0; 4], NegativeStyle::Mirror)));
        list.push(Op::new(ExponentOpData::new([1.5; 4], NegativeStyle::Mirror)));
        list.optimize(ALL).unwrap();
        let mut once = list.clone();
        once.finalize().unwrap();
        list.optimize(ALL).unwrap();
        list.finalize().unwrap();
        assert_eq!(once.cache_id(), list.cache_id());
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn cache_id_joins_op_ids() {
        let mut list = OpList::new();
        list.push(Op::new(FixedFunctionOpData::default()));
        list.push(Op::new(FixedFunctionOpData::new(FixedFunctionStyle::RgbToHsv, vec![])));
        list.finalize().unwrap();
        assert!(list.is_finalized());
        assert_eq!(
            list.cache_id(),
            "[<FixedFunctionOp ACES_RedMod03 (Forward) > <FixedFunctionOp RGB_TO_HSV >]"
        );
    }

    #[test]
    fn finalize_reports_invalid_op() {
        let mut list = OpList::new();
        list.push(Op::new(FixedFunctionOpData::new(FixedFunctionStyle::Rec2100SurroundFwd, vec![])));
        let err = list.finalize().unwrap_err();
        assert!(err.to_string().contains("FixedFunctionOp"));
    }
}

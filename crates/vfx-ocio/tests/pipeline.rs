//! Pipeline laws and end-to-end scenarios through the public API.

use std::sync::Arc;
use std::thread;

use approx::assert_abs_diff_eq;
use vfx_core::{PackedImage, PackedImageMut};
use vfx_lut::{Lut1D, Lut3D};
use vfx_ocio::ops::{
    ExponentOpData, FixedFunctionOpData, FixedFunctionStyle, MatrixOpData, NegativeStyle, Op,
    OpKind, OpList,
};
use vfx_ocio::{
    BitDepth, ExponentTransform, FixedFunctionTransform, LogTransform, Lut1DTransform,
    Lut3DTransform, MatrixTransform, OcioError, OptimizationFlags, Processor, RangeTransform, Transform,
    TransformDirection,
};

const FORWARD: TransformDirection = TransformDirection::Forward;

fn scale(s: f64) -> Transform {
    MatrixTransform::scale([s, s, s, 1.0]).into()
}

fn run(p: &Processor, px: [f32; 3]) -> [f32; 3] {
    let mut buf = [px];
    p.cpu_processor().unwrap().apply_rgb(&mut buf);
    buf[0]
}

fn assert_rgb_eq(a: [f32; 3], b: [f32; 3], eps: f32) {
    for c in 0..3 {
        assert_abs_diff_eq!(a[c], b[c], epsilon = eps);
    }
}

fn ff_params(style: FixedFunctionStyle) -> Vec<f64> {
    match style {
        FixedFunctionStyle::Rec2100SurroundFwd | FixedFunctionStyle::Rec2100SurroundInv => vec![0.8],
        _ => Vec::new(),
    }
}

#[test]
fn scale_pair_collapses_to_empty_pipeline() {
    let mut ops = OpList::new();
    ops.push(Op::new(MatrixOpData::scale([2.0, 2.0, 2.0, 1.0])));
    ops.push(Op::new(MatrixOpData::scale([0.5, 0.5, 0.5, 1.0])));

    let p = Processor::from_ops(ops, OptimizationFlags::LOSSLESS).unwrap();
    assert!(p.is_noop());
    assert_eq!(p.cache_id(), "[]");

    let mut px = [[0.2_f32, 0.4, 0.6]];
    p.cpu_processor().unwrap().apply_rgb(&mut px);
    assert_eq!(px, [[0.2, 0.4, 0.6]]);
}

#[test]
fn fixed_function_and_its_inverse_cancel() {
    for style in FixedFunctionStyle::ALL {
        let data = FixedFunctionOpData::new(style, ff_params(style));
        let fwd = Op::new(data.clone());
        let inv = Op::create(data, TransformDirection::Inverse).unwrap();
        assert!(fwd.is_inverse(&inv), "{style}");
        assert!(inv.is_inverse(&fwd), "{style}");

        let p = Processor::from_ops(OpList::from(vec![fwd, inv]), OptimizationFlags::LOSSLESS).unwrap();
        assert!(p.is_noop(), "{style} did not cancel");
    }
}

#[test]
fn identity_ops_leave_pixels_unchanged() {
    let identities = [
        Op::new(MatrixOpData::identity()),
        Op::new(ExponentOpData::new([1.0; 4], NegativeStyle::Mirror)),
        Op::new(FixedFunctionOpData::new(FixedFunctionStyle::Rec2100SurroundFwd, vec![1.0])),
    ];
    let samples = [[0.0_f32, 0.5, 1.0], [-0.25, 0.18, 2.5]];
    for op in identities {
        assert!(op.is_identity(), "{}", op.kind());
        let p = Processor::from_ops(OpList::from(vec![op]), OptimizationFlags::NONE).unwrap();
        assert_eq!(p.num_ops(), 1);
        for px in samples {
            assert_rgb_eq(run(&p, px), px, 1e-6);
        }
    }
}

#[test]
fn inverse_law_on_cpu() {
    let transforms: Vec<Transform> = vec![
        MatrixTransform::new(
            [
                0.8, 0.1, 0.1, 0.0, //
                0.05, 0.9, 0.05, 0.0, //
                0.0, 0.2, 0.8, 0.0, //
                0.0, 0.0, 0.0, 1.0,
            ],
            [0.01, -0.02, 0.03, 0.0],
        )
        .into(),
        ExponentTransform {
            value: [2.2, 2.4, 2.6, 1.0],
            negative_style: NegativeStyle::Mirror,
            direction: FORWARD,
        }
        .into(),
        LogTransform { base: 10.0, direction: FORWARD }.into(),
        FixedFunctionTransform::new(FixedFunctionStyle::RgbToHsv).into(),
        FixedFunctionTransform::new(FixedFunctionStyle::XyzToLuv).into(),
        FixedFunctionTransform::new(FixedFunctionStyle::AcesGlow10Fwd).into(),
    ];
    let samples = [[0.18_f32, 0.18, 0.18], [0.6, 0.3, 0.1], [0.05, 0.4, 0.9]];
    for t in transforms {
        let list = [t.clone(), t.inverse()];
        let p = Processor::from_transforms(&list, FORWARD, OptimizationFlags::NONE).unwrap();
        assert_eq!(p.num_ops(), 2);
        for px in samples {
            assert_rgb_eq(run(&p, px), px, 2e-4);
        }
    }
}

#[test]
fn combination_matches_sequential_application() {
    let pairs: Vec<[Transform; 2]> = vec![
        [scale(2.0), MatrixTransform::offset([0.1, -0.1, 0.0, 0.0]).into()],
        [ExponentTransform::uniform(2.0).into(), ExponentTransform::uniform(1.5).into()],
        [
            RangeTransform::clamp(0.0, 1.0).into(),
            RangeTransform {
                min_in: Some(0.0),
                max_in: Some(1.0),
                min_out: Some(0.2),
                max_out: Some(0.8),
                ..Default::default()
            }
            .into(),
        ],
    ];
    let samples = [
        [0.0_f32, 0.0, 0.0],
        [1.0, 1.0, 1.0],
        [0.25, 0.5, 0.75],
        [-0.5, 1.5, 2.0],
    ];
    for pair in pairs {
        let seq = Processor::from_transforms(&pair, FORWARD, OptimizationFlags::NONE).unwrap();
        let fused = Processor::from_transforms(&pair, FORWARD, OptimizationFlags::LOSSLESS).unwrap();
        assert_eq!(seq.num_ops(), 2);
        assert_eq!(fused.num_ops(), 1);
        for px in samples {
            assert_rgb_eq(run(&fused, px), run(&seq, px), 1e-5);
        }
    }
}

#[test]
fn clamping_inverse_pairs_match_sequential_application() {
    let cases: [(&str, Transform, f32); 6] = [
        (
            "range",
            RangeTransform {
                max_out: Some(2.0),
                ..RangeTransform::clamp(0.0, 1.0)
            }
            .into(),
            1e-6,
        ),
        (
            "lower bound only",
            RangeTransform {
                min_in: Some(0.1),
                max_in: None,
                min_out: Some(0.3),
                max_out: None,
                ..Default::default()
            }
            .into(),
            1e-6,
        ),
        (
            "shared 1D curve",
            Lut1DTransform {
                lut: Lut1D::from_fn(65, |x| [x * x; 3]).unwrap(),
                direction: FORWARD,
            }
            .into(),
            1e-5,
        ),
        (
            "1D channels with different ranges",
            Lut1DTransform {
                lut: Lut1D::from_fn(33, |x| [0.5 * x, x, x]).unwrap(),
                direction: FORWARD,
            }
            .into(),
            1e-5,
        ),
        (
            "1D channels with offset ranges",
            Lut1DTransform {
                lut: Lut1D::from_fn(33, |x| [0.2 + 0.6 * x, x, 0.1 + 0.9 * x]).unwrap(),
                direction: FORWARD,
            }
            .into(),
            1e-5,
        ),
        (
            "3D grid",
            Lut3DTransform {
                lut: Lut3D::from_fn(17, |[r, g, b]| [0.5 * r + 0.25, g, 0.75 * b]).unwrap(),
                direction: FORWARD,
            }
            .into(),
            1e-4,
        ),
    ];
    let pixels = [
        [0.2_f32, 0.5, 0.8],
        [0.0, 1.0, 0.45],
        [-0.4, 1.3, 0.95],
        [1.7, -0.2, 2.5],
    ];

    for (name, x, eps) in cases {
        let pairs = [
            [x.clone(), x.clone().inverse()],
            [x.clone().inverse(), x.clone()],
        ];
        for (order, pair) in pairs.iter().enumerate() {
            let plain = Processor::from_transforms(pair, FORWARD, OptimizationFlags::NONE).unwrap();
            let optimized = Processor::from_transforms(pair, FORWARD, OptimizationFlags::ALL).unwrap();
            assert!(optimized.num_ops() <= 2, "{name} #{order}");
            for px in pixels {
                let (a, b) = (run(&plain, px), run(&optimized, px));
                for c in 0..3 {
                    assert!(
                        (a[c] - b[c]).abs() <= eps,
                        "{name} #{order} {px:?}: {a:?} vs {} {b:?}",
                        optimized.cache_id()
                    );
                }
            }
        }
    }
}

#[test]
fn inverse_lut_with_uneven_channels_keeps_its_pair() {
    let lut = Lut1D::from_fn(33, |x| [0.5 * x, x, x]).unwrap();
    let x: Transform = Lut1DTransform { lut, direction: FORWARD }.into();
    let pair = [x.clone().inverse(), x];
    let p = Processor::from_transforms(&pair, FORWARD, OptimizationFlags::ALL).unwrap();

    let kinds: Vec<OpKind> = p.ops().iter().map(Op::kind).collect();
    assert_eq!(kinds, [OpKind::Lut1D, OpKind::Lut1D]);
    assert_rgb_eq(run(&p, [0.8, 0.8, 0.8]), [0.5, 0.8, 0.8], 1e-5);
}

#[test]
fn optimization_is_idempotent() {
    let transforms: [Transform; 6] = [
        scale(2.0),
        FixedFunctionTransform::new(FixedFunctionStyle::AcesRedMod03Fwd).into(),
        FixedFunctionTransform::new(FixedFunctionStyle::AcesRedMod03Inv).into(),
        scale(0.25),
        ExponentTransform::uniform(1.0).into(),
        LogTransform::default().into(),
    ];
    let mut ops = OpList::new();
    for t in &transforms {
        t.build_ops(&mut ops, FORWARD).unwrap();
    }
    ops.optimize(OptimizationFlags::ALL).unwrap();
    ops.finalize().unwrap();
    let once = ops.cache_id();

    ops.optimize(OptimizationFlags::ALL).unwrap();
    ops.finalize().unwrap();
    assert_eq!(ops.cache_id(), once);
    assert_eq!(ops.len(), 3);
}

#[test]
fn cache_id_is_deterministic_and_sensitive() {
    let build = |gamma: f64| {
        let t = Transform::group(vec![
            scale(1.5),
            ExponentTransform::uniform(gamma).into(),
            FixedFunctionTransform::new(FixedFunctionStyle::AcesGlow03Fwd).into(),
        ]);
        Processor::from_transform(&t, FORWARD).unwrap()
    };
    let a = build(2.2);
    let b = build(2.2);
    let c = build(2.4);
    assert_eq!(a.cache_id(), b.cache_id());
    assert_ne!(a.cache_id(), c.cache_id());
    assert!(a.cache_id().starts_with("[<MatrixOp "));
    assert!(a.cache_id().ends_with("<FixedFunctionOp ACES_Glow03 (Forward) >]"));
}

#[test]
fn unrelated_ops_keep_application_order() {
    let square = Lut1D::from_fn(1024, |x| [x * x; 3]).unwrap();
    let list: [Transform; 2] = [
        Lut1DTransform { lut: square, direction: FORWARD }.into(),
        MatrixTransform::offset([0.1, 0.1, 0.1, 0.0]).into(),
    ];
    let p = Processor::from_transforms(&list, FORWARD, OptimizationFlags::ALL).unwrap();
    let kinds: Vec<OpKind> = p.ops().iter().map(Op::kind).collect();
    assert_eq!(kinds, [OpKind::Lut1D, OpKind::Matrix]);

    // LUT first: 0.5^2 + 0.1, not (0.5 + 0.1)^2
    assert_rgb_eq(run(&p, [0.5, 0.5, 0.5]), [0.35, 0.35, 0.35], 1e-4);
}

#[test]
fn fixed_function_errors_name_the_problem() {
    let message = |style, params: Vec<f64>| {
        let t = FixedFunctionTransform {
            style,
            params,
            direction: FORWARD,
        };
        Processor::from_transform(&Transform::from(t), FORWARD).unwrap_err().to_string()
    };
    use FixedFunctionStyle::*;
    assert!(message(AcesRedMod10Fwd, vec![1.0])
        .contains("The style 'ACES_RedMod10 (Forward)' must have zero parameters but 1 found."));
    assert!(message(Rec2100SurroundFwd, vec![1.0, 2.0])
        .contains("The style 'REC2100_Surround' must have one parameter but 2 found."));
    assert!(message(Rec2100SurroundFwd, vec![120.0]).contains("Parameter 120 is greater than upper bound 100"));
    assert!(message(Rec2100SurroundInv, vec![0.00001]).contains("Parameter 1e-05 is less than lower bound 0.01"));
    assert!(message(RgbToHsv, vec![0.5]).starts_with("FixedFunction"));
}

#[test]
fn combine_without_check_is_a_contract_violation() {
    let a = Op::new(FixedFunctionOpData::new(FixedFunctionStyle::RgbToHsv, Vec::new()));
    let b = Op::new(FixedFunctionOpData::new(FixedFunctionStyle::HsvToRgb, Vec::new()));
    assert!(!a.can_combine_with(&b));
    assert!(matches!(a.combine_with(&b), Err(OcioError::ContractViolation(_))));

    let m = Op::new(MatrixOpData::scale([2.0; 4]));
    assert!(!m.can_combine_with(&a));
    assert!(matches!(m.combine_with(&a), Err(OcioError::ContractViolation(_))));
}

#[test]
fn renderers_need_finalize() {
    let op = Op::new(MatrixOpData::identity());
    assert!(matches!(op.cpu_op(), Err(OcioError::ContractViolation(_))));
}

#[test]
fn eight_bit_round_trip_is_exact() {
    let list = [scale(2.0), scale(0.5)];
    let p = Processor::from_transforms(&list, FORWARD, OptimizationFlags::NONE).unwrap();
    assert_eq!(p.num_ops(), 2);
    let cpu = p.cpu_processor_with_bit_depths(BitDepth::U8, BitDepth::U8).unwrap();

    let src: Vec<u8> = (0..=255).flat_map(|v| [v, v, 255 - v]).collect();
    let mut buf = src.clone();
    cpu.apply(&mut PackedImageMut::from_u8(&mut buf, 3).unwrap()).unwrap();
    assert_eq!(buf, src);
}

#[test]
fn sixteen_bit_round_trip_is_exact() {
    let list = [scale(4.0), scale(0.25)];
    let p = Processor::from_transforms(&list, FORWARD, OptimizationFlags::NONE).unwrap();
    let cpu = p.cpu_processor_with_bit_depths(BitDepth::U16, BitDepth::U16).unwrap();

    let src: Vec<u16> = [0_u16, 1, 257, 32767, 32768, 65534, 65535, 12345]
        .iter()
        .flat_map(|&v| [v, 65535 - v, v / 2, 65535])
        .collect();
    let mut dst = vec![0_u16; src.len()];
    cpu.apply_to(
        &PackedImage::from_u16(&src, BitDepth::U16, 4).unwrap(),
        &mut PackedImageMut::from_u16(&mut dst, BitDepth::U16, 4).unwrap(),
    )
    .unwrap();
    assert_eq!(dst, src);
}

#[test]
fn integer_input_is_normalized_for_float_output() {
    let p = Processor::from_transform(&scale(1.0), FORWARD).unwrap();
    let cpu = p.cpu_processor_with_bit_depths(BitDepth::U8, BitDepth::F32).unwrap();
    let src = [0_u8, 51, 255];
    let mut dst = [0.0_f32; 4];
    cpu.apply_to(
        &PackedImage::from_u8(&src, 3).unwrap(),
        &mut PackedImageMut::from_f32(&mut dst, 4).unwrap(),
    )
    .unwrap();
    assert_eq!(dst, [0.0, 0.2, 1.0, 1.0]);
}

#[test]
fn mismatched_buffers_are_rejected() {
    let p = Processor::from_transform(&scale(2.0), FORWARD).unwrap();
    let cpu = p.cpu_processor_with_bit_depths(BitDepth::U8, BitDepth::U16).unwrap();

    let mut in_place = [0_u8; 6];
    let err = cpu
        .apply(&mut PackedImageMut::from_u8(&mut in_place, 3).unwrap())
        .unwrap_err();
    assert!(matches!(err, OcioError::InvalidBuffer(_)));

    let src = [0_u8; 6];
    let mut dst = [0_u16; 3];
    let err = cpu
        .apply_to(
            &PackedImage::from_u8(&src, 3).unwrap(),
            &mut PackedImageMut::from_u16(&mut dst, BitDepth::U16, 3).unwrap(),
        )
        .unwrap_err();
    assert!(matches!(err, OcioError::InvalidBuffer(_)));
}

#[test]
fn processor_is_shared_across_threads() {
    let t = Transform::group(vec![
        FixedFunctionTransform::new(FixedFunctionStyle::AcesRedMod10Fwd).into(),
        ExponentTransform::uniform(1.8).into(),
    ]);
    let processor = Arc::new(Processor::from_transform(&t, FORWARD).unwrap());
    let cpu = Arc::new(processor.cpu_processor().unwrap());

    let input: Vec<[f32; 4]> = (0..20_000)
        .map(|i| {
            let x = (i % 1000) as f32 / 1000.0;
            [x, 1.0 - x, x * 0.5, 1.0]
        })
        .collect();
    let mut expected = input.clone();
    cpu.apply_rgba(&mut expected);

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let processor = Arc::clone(&processor);
            let shared = Arc::clone(&cpu);
            let mut buf = input.clone();
            thread::spawn(move || {
                if i % 2 == 0 {
                    shared.apply_rgba(&mut buf);
                } else {
                    processor.cpu_processor().unwrap().apply_rgba(&mut buf);
                }
                buf
            })
        })
        .collect();
    for h in handles {
        assert_eq!(h.join().unwrap(), expected);
    }
}

#[test]
fn spi1d_file_applies_fit_then_lut() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("double.spi1d");
    std::fs::write(
        &path,
        "Version 1\nFrom 0.0 2.0\nLength 3\nComponents 1\n{\n  0.0\n  1.0\n  2.0\n}\n",
    )
    .unwrap();

    let fwd = Processor::from_transform(&Transform::file(&path), FORWARD).unwrap();
    assert_rgb_eq(run(&fwd, [0.5, 1.0, 1.5]), [0.5, 1.0, 1.5], 1e-5);

    let t = Transform::group(vec![Transform::file(&path), Transform::file(&path).inverse()]);
    let p = Processor::from_transforms(&[t], FORWARD, OptimizationFlags::NONE).unwrap();
    assert_eq!(p.num_ops(), 4);
    assert_rgb_eq(run(&p, [0.3, 0.6, 1.2]), [0.3, 0.6, 1.2], 1e-3);
}

#[test]
fn itx_file_loads_red_fastest_grid() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("swap.itx");
    // Swaps red and blue.
    let mut text = String::from("# test cube\nLUT_3D_SIZE 2\n");
    for b in 0..2 {
        for g in 0..2 {
            for r in 0..2 {
                text.push_str(&format!("{b}.0 {g}.0 {r}.0\n"));
            }
        }
    }
    std::fs::write(&path, text).unwrap();

    let p = Processor::from_transform(&Transform::file(&path), FORWARD).unwrap();
    assert_eq!(p.ops()[0].kind(), OpKind::Lut3D);
    assert_rgb_eq(run(&p, [1.0, 0.0, 0.0]), [0.0, 0.0, 1.0], 1e-5);
    assert_rgb_eq(run(&p, [0.2, 0.5, 0.7]), [0.7, 0.5, 0.2], 1e-5);
}

#[test]
fn broken_lut_file_reports_decoder_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.spi1d");
    std::fs::write(&path, "Version 2\n").unwrap();
    let err = Processor::from_transform(&Transform::file(&path), FORWARD).unwrap_err();
    assert!(matches!(err, OcioError::Lut(_)));
    assert!(err.to_string().contains("Only format version 1 supported."));
}

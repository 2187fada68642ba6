//! Shader code for the fixed-function styles, mirroring `cpu.rs`.

use super::FixedFunctionStyle;
use super::cpu::{
    AP1_Y, DARK_TO_DIM_GAMMA, DARK_TO_DIM_MIN_LUM, GLOW_03, GLOW_10, GlowParams, HUE_BSPLINE_M,
    RED_MOD_03, RED_MOD_10, REC2100_Y, RedModParams, SURROUND_MIN_LUM, YC_RADIUS_WEIGHT, luv,
};
use crate::gpu::{GpuShaderText, float_lit};

/// Shortest literal that round-trips the kernel's `f32` constant.
fn lit(v: f32) -> String {
    format!("{:?}", v + 0.0)
}

/// Appends the block for `style` operating in place on `px`.
pub(super) fn emit(ss: &mut GpuShaderText, px: &str, style: FixedFunctionStyle, gamma: f64) {
    use FixedFunctionStyle::*;

    ss.line("");
    ss.line(format!("// Add FixedFunction {} processing", style.name()));
    ss.line("");
    match style {
        AcesRedMod03Fwd => red_mod(ss, px, &RED_MOD_03, false),
        AcesRedMod03Inv => red_mod(ss, px, &RED_MOD_03, true),
        AcesRedMod10Fwd => red_mod(ss, px, &RED_MOD_10, false),
        AcesRedMod10Inv => red_mod(ss, px, &RED_MOD_10, true),
        AcesGlow03Fwd => glow(ss, px, &GLOW_03, false),
        AcesGlow03Inv => glow(ss, px, &GLOW_03, true),
        AcesGlow10Fwd => glow(ss, px, &GLOW_10, false),
        AcesGlow10Inv => glow(ss, px, &GLOW_10, true),
        AcesDarkToDim10Fwd => luminance_gain(
            ss,
            px,
            AP1_Y,
            false,
            lit(DARK_TO_DIM_MIN_LUM),
            lit(DARK_TO_DIM_GAMMA - 1.0),
        ),
        AcesDarkToDim10Inv => luminance_gain(
            ss,
            px,
            AP1_Y,
            false,
            lit(DARK_TO_DIM_MIN_LUM),
            lit(1.0 / DARK_TO_DIM_GAMMA - 1.0),
        ),
        Rec2100SurroundFwd => luminance_gain(
            ss,
            px,
            REC2100_Y,
            true,
            lit(SURROUND_MIN_LUM),
            float_lit(gamma - 1.0),
        ),
        Rec2100SurroundInv => luminance_gain(
            ss,
            px,
            REC2100_Y,
            true,
            float_lit(f64::from(SURROUND_MIN_LUM).powf(gamma)),
            float_lit(1.0 / gamma - 1.0),
        ),
        RgbToHsv => rgb_to_hsv(ss, px),
        HsvToRgb => hsv_to_rgb(ss, px),
        XyzToXyy => {
            let f3 = ss.float3();
            let mut b = ss.scope();
            b.line(format!("float d = {px}.r + {px}.g + {px}.b;"));
            b.line("d = (d == 0.0) ? 0.0 : 1.0 / d;");
            b.line(format!("{px}.rgb = {f3}({px}.r * d, {px}.g * d, {px}.g);"));
        }
        XyyToXyz => {
            let f3 = ss.float3();
            let mut b = ss.scope();
            b.line(format!("float d = ({px}.g == 0.0) ? 0.0 : 1.0 / {px}.g;"));
            b.line(format!("float Y = {px}.b;"));
            b.line(format!(
                "{px}.rgb = {f3}(Y * {px}.r * d, Y, Y * (1.0 - {px}.r - {px}.g) * d);"
            ));
        }
        XyzToUvy => {
            let f3 = ss.float3();
            let mut b = ss.scope();
            b.line(format!("float d = {px}.r + 15.0 * {px}.g + 3.0 * {px}.b;"));
            b.line("d = (d == 0.0) ? 0.0 : 1.0 / d;");
            b.line(format!(
                "{px}.rgb = {f3}(4.0 * {px}.r * d, 9.0 * {px}.g * d, {px}.g);"
            ));
        }
        UvyToXyz => {
            let f3 = ss.float3();
            let mut b = ss.scope();
            b.line(format!("float d = ({px}.g == 0.0) ? 0.0 : 1.0 / {px}.g;"));
            b.line(format!("float Y = {px}.b;"));
            b.line(format!(
                "{px}.rgb = {f3}(2.25 * Y * {px}.r * d, Y, 0.75 * Y * (4.0 - {px}.r - {} * {px}.g) * d);",
                lit(20.0 / 3.0)
            ));
        }
        XyzToLuv => xyz_to_luv(ss, px),
        LuvToXyz => luv_to_xyz(ss, px),
    }
}

fn red_mod(ss: &mut GpuShaderText, px: &str, p: &RedModParams, inverse: bool) {
    let f4 = ss.float4();
    let hue = ss.atan2("yb", "ya");
    let k = lit(1.0 - p.scale);
    let pivot = lit(p.pivot);
    let rows = HUE_BSPLINE_M.map(|m| format!("{f4}({}, {}, {}, {})", lit(m[0]), lit(m[1]), lit(m[2]), lit(m[3])));

    let mut b = ss.scope();
    b.line(format!("float red = {px}.r;"));
    b.line(format!("float grn = {px}.g;"));
    b.line(format!("float blu = {px}.b;"));
    b.line("float ya = 2.0 * red - (grn + blu);");
    b.line(format!("float yb = {} * (grn - blu);", lit(3.0_f32.sqrt())));
    b.line(format!("float knot = {hue} * {} + 2.0;", lit(p.inv_width)));
    b.line("float f_H = 0.0;");
    b.line("if (knot >= 0.0 && knot < 4.0)");
    {
        let mut w = b.scope();
        w.line("float j = floor(knot);");
        w.line("float t = knot - j;");
        w.line(format!("{f4} coefs = {};", rows[3]));
        w.line(format!("if (j < 1.0) coefs = {};", rows[0]));
        w.line(format!("else if (j < 2.0) coefs = {};", rows[1]));
        w.line(format!("else if (j < 3.0) coefs = {};", rows[2]));
        w.line("f_H = coefs.w + t * (coefs.z + t * (coefs.y + t * coefs.x));");
    }
    b.line("if (f_H > 0.0)");
    let mut m = b.scope();
    if inverse {
        m.line("float minChan = min(grn, blu);");
        m.line(format!("float qa = f_H * {k} - 1.0;"));
        m.line(format!("float qb = red - f_H * ({pivot} + minChan) * {k};"));
        m.line(format!("float qc = f_H * {pivot} * minChan * {k};"));
        m.line("float newRed = (-qb - sqrt(max(qb * qb - 4.0 * qa * qc, 0.0))) / (2.0 * qa);");
    } else {
        m.line("float minChan = min(red, min(grn, blu));");
        m.line("float maxChan = max(red, max(grn, blu));");
        m.line(format!(
            "float f_S = (max(maxChan, 1e-10) - max(minChan, 1e-10)) / max(maxChan, {});",
            lit(p.noise_limit)
        ));
        m.line(format!("float newRed = red + f_H * f_S * ({pivot} - red) * {k};"));
    }
    if p.restore_hue {
        m.line("if (grn >= blu)");
        {
            let mut g = m.scope();
            g.line("float hueFac = (grn - blu) / max(red - blu, 1e-10);");
            g.line(format!("{px}.g = hueFac * (newRed - blu) + blu;"));
        }
        m.line("else");
        {
            let mut g = m.scope();
            g.line("float hueFac = (blu - grn) / max(red - grn, 1e-10);");
            g.line(format!("{px}.b = hueFac * (newRed - grn) + grn;"));
        }
    }
    m.line(format!("{px}.r = newRed;"));
}

fn glow(ss: &mut GpuShaderText, px: &str, p: &GlowParams, inverse: bool) {
    let mid = lit(p.mid);
    let upper = lit(p.mid * 2.0);

    let mut b = ss.scope();
    b.line(format!("float red = {px}.r;"));
    b.line(format!("float grn = {px}.g;"));
    b.line(format!("float blu = {px}.b;"));
    b.line("float chroma = sqrt(max(blu * (blu - grn) + grn * (grn - red) + red * (red - blu), 0.0));");
    b.line(format!(
        "float YC = (blu + grn + red + {} * chroma) / 3.0;",
        lit(YC_RADIUS_WEIGHT)
    ));
    b.line("float minChan = min(red, min(grn, blu));");
    b.line("float maxChan = max(red, max(grn, blu));");
    b.line(format!(
        "float sat = (max(maxChan, 1e-10) - max(minChan, 1e-10)) / max(maxChan, {});",
        lit(p.noise_limit)
    ));
    b.line("float x = (sat - 0.4) * 5.0;");
    b.line("float sgn = (x < 0.0) ? -1.0 : 1.0;");
    b.line("float t = max(1.0 - 0.5 * sgn * x, 0.0);");
    b.line(format!(
        "float GlowGain = {} * (1.0 + sgn * (1.0 - t * t)) * 0.5;",
        lit(p.gain)
    ));
    b.line("float GlowGainOut = 0.0;");
    if inverse {
        b.line(format!("if (YC >= {upper}) GlowGainOut = 0.0;"));
        b.line(format!(
            "else if (YC <= (1.0 + GlowGain) * {}) GlowGainOut = -GlowGain / (1.0 + GlowGain);",
            lit(p.mid * 2.0 / 3.0)
        ));
        b.line(format!(
            "else GlowGainOut = GlowGain * ({mid} / YC - 0.5) / (GlowGain * 0.5 - 1.0);"
        ));
    } else {
        b.line(format!("if (YC >= {upper}) GlowGainOut = 0.0;"));
        b.line(format!(
            "else if (YC <= {}) GlowGainOut = GlowGain;",
            lit(p.mid * 2.0 / 3.0)
        ));
        b.line(format!("else GlowGainOut = GlowGain * ({mid} / YC - 0.5);"));
    }
    b.line(format!("{px}.rgb *= 1.0 + GlowGainOut;"));
}

/// `rgb *= max(Y, floor)^exponent` with `Y` the weighted luminance.
fn luminance_gain(
    ss: &mut GpuShaderText,
    px: &str,
    weights: [f32; 3],
    mirror: bool,
    floor: String,
    exponent: String,
) {
    let w = format!(
        "{}({}, {}, {})",
        ss.float3(),
        lit(weights[0]),
        lit(weights[1]),
        lit(weights[2])
    );
    let lum = if mirror {
        format!("abs(dot({px}.rgb, {w}))")
    } else {
        format!("dot({px}.rgb, {w})")
    };
    let mut b = ss.scope();
    b.line(format!("float Y = max({lum}, {floor});"));
    b.line(format!("{px}.rgb *= pow(Y, {exponent});"));
}

fn rgb_to_hsv(ss: &mut GpuShaderText, px: &str) {
    let f3 = ss.float3();
    let mut b = ss.scope();
    b.line(format!("float maxV = max({px}.r, max({px}.g, {px}.b));"));
    b.line(format!("float minV = min({px}.r, min({px}.g, {px}.b));"));
    b.line("float delta = maxV - minV;");
    b.line("float sat = (maxV != 0.0) ? delta / maxV : 0.0;");
    b.line("float hue = 0.0;");
    b.line("if (delta != 0.0)");
    {
        let mut h = b.scope();
        h.line(format!("if (maxV == {px}.r) hue = ({px}.g - {px}.b) / delta;"));
        h.line(format!("else if (maxV == {px}.g) hue = 2.0 + ({px}.b - {px}.r) / delta;"));
        h.line(format!("else hue = 4.0 + ({px}.r - {px}.g) / delta;"));
        h.line("hue = hue / 6.0;");
        h.line("if (hue < 0.0) hue += 1.0;");
    }
    b.line(format!("{px}.rgb = {f3}(hue, sat, maxV);"));
}

fn hsv_to_rgb(ss: &mut GpuShaderText, px: &str) {
    let f3 = ss.float3();
    let mut b = ss.scope();
    b.line(format!("float h6 = ({px}.r - floor({px}.r)) * 6.0;"));
    b.line(format!(
        "{f3} hue = clamp({f3}(abs(h6 - 3.0) - 1.0, 2.0 - abs(h6 - 2.0), 2.0 - abs(h6 - 4.0)), 0.0, 1.0);"
    ));
    b.line(format!("{px}.rgb = ((hue - 1.0) * {px}.g + 1.0) * {px}.b;"));
}

fn xyz_to_luv(ss: &mut GpuShaderText, px: &str) {
    let f3 = ss.float3();
    let mut b = ss.scope();
    b.line(format!("float d = {px}.r + 15.0 * {px}.g + 3.0 * {px}.b;"));
    b.line("d = (d == 0.0) ? 0.0 : 1.0 / d;");
    b.line(format!("float u = 4.0 * {px}.r * d;"));
    b.line(format!("float v = 9.0 * {px}.g * d;"));
    b.line(format!(
        "float Lstar = ({px}.g <= {}) ? {} * {px}.g : {} * pow(max({px}.g, 0.0), 1.0 / 3.0) - {};",
        lit(luv::Y_BREAK),
        lit(luv::KAPPA),
        lit(luv::L_SCALE),
        lit(luv::L_OFFSET)
    ));
    b.line(format!(
        "{px}.rgb = {f3}(Lstar, 13.0 * Lstar * (u - {}), 13.0 * Lstar * (v - {}));",
        lit(luv::U_N),
        lit(luv::V_N)
    ));
}

fn luv_to_xyz(ss: &mut GpuShaderText, px: &str) {
    let f3 = ss.float3();
    let mut b = ss.scope();
    b.line(format!("float Lstar = {px}.r;"));
    b.line("float d = (Lstar == 0.0) ? 0.0 : 1.0 / (13.0 * Lstar);");
    b.line(format!("float u = {px}.g * d + {};", lit(luv::U_N)));
    b.line(format!("float v = {px}.b * d + {};", lit(luv::V_N)));
    b.line(format!(
        "float tmp = (Lstar + {}) / {};",
        lit(luv::L_OFFSET),
        lit(luv::L_SCALE)
    ));
    b.line(format!(
        "float Y = (Lstar <= {}) ? Lstar / {} : tmp * tmp * tmp;",
        lit(luv::L_BREAK),
        lit(luv::KAPPA)
    ));
    b.line("float dd = (v == 0.0) ? 0.0 : 0.25 / v;");
    b.line(format!(
        "{px}.rgb = {f3}(9.0 * Y * u * dd, Y, Y * (12.0 - 3.0 * u - 20.0 * v) * dd);"
    ));
}

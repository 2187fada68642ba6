//! CPU kernels for the fixed-function styles. Alpha is never touched.

use super::FixedFunctionStyle;
use crate::cpu::OpCpu;

const SQRT3: f32 = 1.732_050_8;

/// Renderer for one style; `gamma` is only read by the surround styles.
#[derive(Debug)]
pub(super) struct FixedFunctionCpu {
    style: FixedFunctionStyle,
    gamma: f32,
}

impl FixedFunctionCpu {
    pub(super) fn new(style: FixedFunctionStyle, gamma: f32) -> Self {
        Self { style, gamma }
    }
}

impl OpCpu for FixedFunctionCpu {
    fn apply(&self, rgba: &mut [f32]) {
        use FixedFunctionStyle::*;
        let gamma = self.gamma;
        match self.style {
            AcesRedMod03Fwd => for_each_rgb(rgba, |p| red_mod_fwd(p, &RED_MOD_03)),
            AcesRedMod03Inv => for_each_rgb(rgba, |p| red_mod_inv(p, &RED_MOD_03)),
            AcesRedMod10Fwd => for_each_rgb(rgba, |p| red_mod_fwd(p, &RED_MOD_10)),
            AcesRedMod10Inv => for_each_rgb(rgba, |p| red_mod_inv(p, &RED_MOD_10)),
            AcesGlow03Fwd => for_each_rgb(rgba, |p| glow_fwd(p, &GLOW_03)),
            AcesGlow03Inv => for_each_rgb(rgba, |p| glow_inv(p, &GLOW_03)),
            AcesGlow10Fwd => for_each_rgb(rgba, |p| glow_fwd(p, &GLOW_10)),
            AcesGlow10Inv => for_each_rgb(rgba, |p| glow_inv(p, &GLOW_10)),
            AcesDarkToDim10Fwd => for_each_rgb(rgba, |p| dark_to_dim(p, DARK_TO_DIM_GAMMA)),
            AcesDarkToDim10Inv => for_each_rgb(rgba, |p| dark_to_dim(p, 1.0 / DARK_TO_DIM_GAMMA)),
            Rec2100SurroundFwd => for_each_rgb(rgba, |p| surround(p, gamma, SURROUND_MIN_LUM)),
            Rec2100SurroundInv => {
                // the forward output floor, so a round trip lands on the same clamp
                let min_lum = SURROUND_MIN_LUM.powf(gamma);
                for_each_rgb(rgba, |p| surround(p, 1.0 / gamma, min_lum))
            }
            RgbToHsv => for_each_rgb(rgba, |p| *p = rgb_to_hsv(*p)),
            HsvToRgb => for_each_rgb(rgba, |p| *p = hsv_to_rgb(*p)),
            XyzToXyy => for_each_rgb(rgba, |p| *p = xyz_to_xyy(*p)),
            XyyToXyz => for_each_rgb(rgba, |p| *p = xyy_to_xyz(*p)),
            XyzToUvy => for_each_rgb(rgba, |p| *p = xyz_to_uvy(*p)),
            UvyToXyz => for_each_rgb(rgba, |p| *p = uvy_to_xyz(*p)),
            XyzToLuv => for_each_rgb(rgba, |p| *p = xyz_to_luv(*p)),
            LuvToXyz => for_each_rgb(rgba, |p| *p = luv_to_xyz(*p)),
        }
    }
}

#[inline]
fn for_each_rgb(rgba: &mut [f32], f: impl Fn(&mut [f32; 3])) {
    for px in rgba.chunks_exact_mut(4) {
        let mut rgb = [px[0], px[1], px[2]];
        f(&mut rgb);
        px[..3].copy_from_slice(&rgb);
    }
}

// ============================================================================
// ACES red modifier
// ============================================================================

pub(super) struct RedModParams {
    pub scale: f32,
    pub pivot: f32,
    pub inv_width: f32,
    pub noise_limit: f32,
    /// Rescales the smaller of green/blue so hue survives the red change.
    pub restore_hue: bool,
}

pub(super) const RED_MOD_03: RedModParams = RedModParams {
    scale: 0.85,
    pivot: 0.03,
    inv_width: 1.909_859_3,
    noise_limit: 1e-2,
    restore_hue: true,
};

pub(super) const RED_MOD_10: RedModParams = RedModParams {
    scale: 0.82,
    pivot: 0.03,
    inv_width: 1.697_652_7,
    noise_limit: 1e-2,
    restore_hue: false,
};

/// Quadratic B-spline basis, one row per knot interval.
pub(super) const HUE_BSPLINE_M: [[f32; 4]; 4] = [
    [0.25, 0.00, 0.00, 0.00],
    [-0.75, 0.75, 0.75, 0.25],
    [0.75, -1.50, 0.00, 1.00],
    [-0.25, 0.75, -0.75, 0.25],
];

#[inline]
fn sat_weight(rgb: &[f32; 3], noise_limit: f32) -> f32 {
    let min = rgb[0].min(rgb[1]).min(rgb[2]);
    let max = rgb[0].max(rgb[1]).max(rgb[2]);
    (max.max(1e-10) - min.max(1e-10)) / max.max(noise_limit)
}

#[inline]
fn hue_weight(rgb: &[f32; 3], inv_width: f32) -> f32 {
    let a = 2.0 * rgb[0] - (rgb[1] + rgb[2]);
    let b = SQRT3 * (rgb[1] - rgb[2]);
    let knot = b.atan2(a) * inv_width + 2.0;
    let j = knot.floor();
    if !(0.0..4.0).contains(&j) {
        return 0.0;
    }
    let t = knot - j;
    let m = &HUE_BSPLINE_M[j as usize];
    m[3] + t * (m[2] + t * (m[1] + t * m[0]))
}

#[inline]
fn restore_hue(rgb: &mut [f32; 3], old_red: f32, new_red: f32) {
    if rgb[1] >= rgb[2] {
        let fac = (rgb[1] - rgb[2]) / (old_red - rgb[2]).max(1e-10);
        rgb[1] = fac * (new_red - rgb[2]) + rgb[2];
    } else {
        let fac = (rgb[2] - rgb[1]) / (old_red - rgb[1]).max(1e-10);
        rgb[2] = fac * (new_red - rgb[1]) + rgb[1];
    }
}

fn red_mod_fwd(rgb: &mut [f32; 3], p: &RedModParams) {
    let f_h = hue_weight(rgb, p.inv_width);
    if f_h <= 0.0 {
        return;
    }
    let f_s = sat_weight(rgb, p.noise_limit);
    let red = rgb[0];
    let new_red = red + f_h * f_s * (p.pivot - red) * (1.0 - p.scale);
    if p.restore_hue {
        restore_hue(rgb, red, new_red);
    }
    rgb[0] = new_red;
}

fn red_mod_inv(rgb: &mut [f32; 3], p: &RedModParams) {
    let f_h = hue_weight(rgb, p.inv_width);
    if f_h <= 0.0 {
        return;
    }
    let k = 1.0 - p.scale;
    let min_chan = rgb[1].min(rgb[2]);
    let red = rgb[0];
    let a = f_h * k - 1.0;
    let b = red - f_h * (p.pivot + min_chan) * k;
    let c = f_h * p.pivot * min_chan * k;
    let new_red = (-b - (b * b - 4.0 * a * c).max(0.0).sqrt()) / (2.0 * a);
    if p.restore_hue {
        restore_hue(rgb, red, new_red);
    }
    rgb[0] = new_red;
}

// ============================================================================
// ACES glow
// ============================================================================

pub(super) struct GlowParams {
    pub gain: f32,
    pub mid: f32,
    pub noise_limit: f32,
}

pub(super) const GLOW_03: GlowParams = GlowParams {
    gain: 0.075,
    mid: 0.1,
    noise_limit: 1e-2,
};

pub(super) const GLOW_10: GlowParams = GlowParams {
    gain: 0.05,
    mid: 0.08,
    noise_limit: 1e-2,
};

pub(super) const YC_RADIUS_WEIGHT: f32 = 1.75;

#[inline]
fn rgb_to_yc(rgb: &[f32; 3]) -> f32 {
    let [r, g, b] = *rgb;
    let chroma = (b * (b - g) + g * (g - r) + r * (r - b)).max(0.0).sqrt();
    (b + g + r + YC_RADIUS_WEIGHT * chroma) / 3.0
}

#[inline]
fn sigmoid_shaper(sat: f32) -> f32 {
    let x = (sat - 0.4) * 5.0;
    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let t = (1.0 - 0.5 * sign * x).max(0.0);
    (1.0 + sign * (1.0 - t * t)) * 0.5
}

fn glow_gain(rgb: &[f32; 3], p: &GlowParams) -> (f32, f32) {
    let s = sigmoid_shaper(sat_weight(rgb, p.noise_limit));
    (rgb_to_yc(rgb), p.gain * s)
}

fn glow_fwd(rgb: &mut [f32; 3], p: &GlowParams) {
    let (yc, gain) = glow_gain(rgb, p);
    let out = if yc >= p.mid * 2.0 {
        0.0
    } else if yc <= p.mid * 2.0 / 3.0 {
        gain
    } else {
        gain * (p.mid / yc - 0.5)
    };
    rgb.iter_mut().for_each(|v| *v *= 1.0 + out);
}

fn glow_inv(rgb: &mut [f32; 3], p: &GlowParams) {
    let (yc, gain) = glow_gain(rgb, p);
    let out = if yc >= p.mid * 2.0 {
        0.0
    } else if yc <= (1.0 + gain) * p.mid * 2.0 / 3.0 {
        -gain / (1.0 + gain)
    } else {
        gain * (p.mid / yc - 0.5) / (gain * 0.5 - 1.0)
    };
    rgb.iter_mut().for_each(|v| *v *= 1.0 + out);
}

// ============================================================================
// Surround corrections
// ============================================================================

/// AP1 luminance weights.
pub(super) const AP1_Y: [f32; 3] = [0.272_228_72, 0.674_081_77, 0.053_689_52];
pub(super) const DARK_TO_DIM_GAMMA: f32 = 0.9811;
pub(super) const DARK_TO_DIM_MIN_LUM: f32 = 1e-10;

/// Rec.2100 luminance weights.
pub(super) const REC2100_Y: [f32; 3] = [0.2627, 0.6780, 0.0593];
pub(super) const SURROUND_MIN_LUM: f32 = 1e-4;

fn dark_to_dim(rgb: &mut [f32; 3], gamma: f32) {
    let y = (AP1_Y[0] * rgb[0] + AP1_Y[1] * rgb[1] + AP1_Y[2] * rgb[2]).max(DARK_TO_DIM_MIN_LUM);
    let gain = y.powf(gamma - 1.0);
    rgb.iter_mut().for_each(|v| *v *= gain);
}

fn surround(rgb: &mut [f32; 3], gamma: f32, min_lum: f32) {
    let y = REC2100_Y[0] * rgb[0] + REC2100_Y[1] * rgb[1] + REC2100_Y[2] * rgb[2];
    let gain = y.abs().max(min_lum).powf(gamma - 1.0);
    rgb.iter_mut().for_each(|v| *v *= gain);
}

// ============================================================================
// HSV
// ============================================================================

fn rgb_to_hsv(rgb: [f32; 3]) -> [f32; 3] {
    let [r, g, b] = rgb;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;
    let sat = if max != 0.0 { delta / max } else { 0.0 };
    if delta == 0.0 {
        return [0.0, sat, max];
    }
    let hue = if max == r {
        (g - b) / delta
    } else if max == g {
        2.0 + (b - r) / delta
    } else {
        4.0 + (r - g) / delta
    };
    let hue = hue / 6.0;
    [if hue < 0.0 { hue + 1.0 } else { hue }, sat, max]
}

fn hsv_to_rgb(hsv: [f32; 3]) -> [f32; 3] {
    let [h, s, v] = hsv;
    let h6 = (h - h.floor()) * 6.0;
    let hue = [
        ((h6 - 3.0).abs() - 1.0).clamp(0.0, 1.0),
        (2.0 - (h6 - 2.0).abs()).clamp(0.0, 1.0),
        (2.0 - (h6 - 4.0).abs()).clamp(0.0, 1.0),
    ];
    hue.map(|c| ((c - 1.0) * s + 1.0) * v)
}

// ============================================================================
// CIE chromaticity
// ============================================================================

#[inline]
fn recip_or_zero(d: f32) -> f32 {
    if d == 0.0 { 0.0 } else { 1.0 / d }
}

fn xyz_to_xyy(xyz: [f32; 3]) -> [f32; 3] {
    let [x, y, z] = xyz;
    let d = recip_or_zero(x + y + z);
    [x * d, y * d, y]
}

fn xyy_to_xyz(xyy: [f32; 3]) -> [f32; 3] {
    let [x, y, lum] = xyy;
    let d = recip_or_zero(y);
    [lum * x * d, lum, lum * (1.0 - x - y) * d]
}

fn xyz_to_uvy(xyz: [f32; 3]) -> [f32; 3] {
    let [x, y, z] = xyz;
    let d = recip_or_zero(x + 15.0 * y + 3.0 * z);
    [4.0 * x * d, 9.0 * y * d, y]
}

fn uvy_to_xyz(uvy: [f32; 3]) -> [f32; 3] {
    let [u, v, lum] = uvy;
    let d = recip_or_zero(v);
    [
        2.25 * lum * u * d,
        lum,
        0.75 * lum * (4.0 - u - 6.666_667 * v) * d,
    ]
}

/// D65 white and the L* curve, with L* scaled to [0, 1].
pub(super) mod luv {
    pub const U_N: f32 = 0.197_830_01;
    pub const V_N: f32 = 0.468_319_99;
    pub const Y_BREAK: f32 = 0.008_856_452;
    pub const L_BREAK: f32 = 0.08;
    pub const KAPPA: f32 = 9.032_963;
    pub const L_SCALE: f32 = 1.16;
    pub const L_OFFSET: f32 = 0.16;
}

fn xyz_to_luv(xyz: [f32; 3]) -> [f32; 3] {
    use luv::*;
    let [x, y, z] = xyz;
    let d = recip_or_zero(x + 15.0 * y + 3.0 * z);
    let (u, v) = (4.0 * x * d, 9.0 * y * d);
    let l = if y <= Y_BREAK {
        KAPPA * y
    } else {
        L_SCALE * y.cbrt() - L_OFFSET
    };
    [l, 13.0 * l * (u - U_N), 13.0 * l * (v - V_N)]
}

fn luv_to_xyz(luv: [f32; 3]) -> [f32; 3] {
    use luv::*;
    let [l, us, vs] = luv;
    let d = if l == 0.0 { 0.0 } else { 1.0 / (13.0 * l) };
    let u = us * d + U_N;
    let v = vs * d + V_N;
    let y = if l <= L_BREAK {
        l / KAPPA
    } else {
        let t = (l + L_OFFSET) / L_SCALE;
        t * t * t
    };
    let dd = if v == 0.0 { 0.0 } else { 0.25 / v };
    [9.0 * y * u * dd, y, y * (12.0 - 3.0 * u - 20.0 * v) * dd]
}

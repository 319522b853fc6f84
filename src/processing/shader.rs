//! WGSL text for the GPU path, derived from the scalar stages.
//!
//! The uniform block layout comes from [`uniform_values`], the same table
//! [`pack_uniforms`] fills for upload, so field names and buffer offsets
//! cannot drift apart. Every numeric constant in the program is printed from
//! the Rust constant the scalar stage uses.

use std::f32::consts::PI;

use crate::params::{InversionMode, RenderParams};

use super::base::{BaseStage, LEVELS_TARGET_DENSITY, MIN_LEVELS_SPAN};
use super::curves::FINE_SIZE;
use super::film_curve::{
    FilmCurveParams, MIN_DENSITY_SPAN, MIN_GAMMA, MIN_TRANSMITTANCE, SHOULDER_GAMMA_SCALE,
    SHOULDER_ZONE_SCALE, TOE_GAMMA_SCALE, TOE_ZONE_SCALE, TRANSITION_WIDTH,
};
use super::hsl::{ACHROMATIC_EPSILON, HUE_CHANNELS, LUMINANCE_DAMPING};
use super::inversion::LOG_CODE_DENOM;
use super::lut3d::SNAP_EPSILON;
use super::pipeline::{PipelineConfig, PixelPipeline, Prepared};
use super::split_tone::{HIGHLIGHT_EDGE, SHADOW_EDGE, TINT_STRENGTH, TRANSITION};
use super::tone::{MID_GRAY, MIN_WINDOW, ROLLOFF_KNEE};
use super::REC709;

pub const WORKGROUP_SIZE: u32 = 16;
const RGB_SUFFIXES: [&str; 3] = ["r", "g", "b"];

/// Formats an `f32` as a WGSL float literal. WGSL accepts exponents, but
/// fixed notation keeps the emitted text greppable against Rust's `{:?}`.
pub fn lit(v: f32) -> String {
    let debug = format!("{:?}", v);
    if debug.contains('e') {
        format!("{:.12}", v)
    } else {
        debug
    }
}

#[derive(Default)]
struct UniformWriter {
    entries: Vec<(String, f32)>,
}

impl UniformWriter {
    fn push(&mut self, name: impl Into<String>, value: f32) {
        self.entries.push((name.into(), value));
    }

    fn flag(&mut self, name: &str, on: bool) {
        self.push(name, if on { 1.0 } else { 0.0 });
    }

    fn rgb(&mut self, prefix: &str, values: [f32; 3]) {
        for (suffix, value) in RGB_SUFFIXES.iter().zip(values) {
            self.push(format!("{}_{}", prefix, suffix), value);
        }
    }

    /// Pads to a whole number of `vec4`s for uniform buffer layout.
    fn finish(mut self) -> Vec<(String, f32)> {
        let mut pad = 0;
        while self.entries.len() % 4 != 0 {
            self.push(format!("_pad{}", pad), 0.0);
            pad += 1;
        }
        self.entries
    }
}

/// Ordered `(binding name, value)` pairs of the uniform block.
///
/// Tone entries carry the resolved constants of the tone curve (gain,
/// contrast factor, black/white point, zone factors), not raw sliders.
pub fn uniform_values(prepared: &Prepared, width: u32, height: u32) -> Vec<(String, f32)> {
    let params = &prepared.params;
    let mut u = UniformWriter::default();

    let film = prepared
        .film
        .unwrap_or_else(|| FilmCurveParams::per_channel(&params.film_curve));
    u.flag("film_enabled", prepared.film.is_some());
    u.push("film_gamma", params.film_curve.gamma);
    u.rgb("film_gamma", film.map(|f| f.gamma));
    u.push("film_d_min", film[0].d_min);
    u.push("film_d_max", film[0].d_max);
    u.push("film_toe", film[0].toe);
    u.push("film_shoulder", film[0].shoulder);

    u.flag("inversion_enabled", prepared.inversion.enabled);
    u.flag("inversion_mode", prepared.inversion.mode == InversionMode::Log);

    // An identity base stage uploads as unit linear gains, which is exact.
    let (log_mode, gains, densities) = match prepared.base {
        _ if prepared.base.is_identity() => (false, [1.0; 3], [0.0; 3]),
        BaseStage::Linear { gains } => (false, gains, [0.0; 3]),
        BaseStage::Log { densities } => (true, [1.0; 3], densities),
    };
    u.flag("base_mode", log_mode);
    u.rgb("base_gain", gains);
    u.rgb("base_density", densities);

    let levels = params.density_levels.channels();
    u.flag("levels_enabled", prepared.levels.is_some());
    u.rgb("levels_min", levels.map(|l| l.min));
    u.rgb("levels_max", levels.map(|l| l.max));

    u.rgb("wb_gain", prepared.wb_gains);

    let tone = &prepared.tone;
    u.push("tone_exposure", tone.exposure_gain);
    u.push("tone_contrast", tone.contrast_factor);
    u.push("tone_highlights", tone.highlight_factor);
    u.push("tone_shadows", tone.shadow_factor);
    u.push("tone_whites", tone.white_point);
    u.push("tone_blacks", tone.black_point);
    u.flag("highlight_rolloff", prepared.highlight_rolloff);
    u.push("curves_enabled", prepared.curves.active_mask() as f32);

    let channels = prepared.hsl.channels();
    u.flag("hsl_enabled", !prepared.hsl.is_identity());
    for (i, ch) in channels.iter().enumerate() {
        u.push(format!("hsl_hue_{}", i), ch.hue);
    }
    for (i, ch) in channels.iter().enumerate() {
        u.push(format!("hsl_sat_{}", i), ch.saturation);
    }
    for (i, ch) in channels.iter().enumerate() {
        u.push(format!("hsl_lum_{}", i), ch.luminance);
    }

    let split = &params.split_tone;
    u.flag("split_enabled", !prepared.split_tone.is_identity());
    u.push("split_shadow_hue", split.shadow_hue);
    u.push("split_shadow_sat", split.shadow_saturation);
    u.push("split_midtone_hue", split.midtone_hue);
    u.push("split_midtone_sat", split.midtone_saturation);
    u.push("split_highlight_hue", split.highlight_hue);
    u.push("split_highlight_sat", split.highlight_saturation);
    u.push("split_balance", split.balance);

    u.push("lut_size", prepared.lut.as_ref().map_or(0.0, |l| l.size as f32));
    u.push("lut_intensity", prepared.lut.as_ref().map_or(0.0, |l| l.intensity));

    u.push("width", width as f32);
    u.push("height", height as f32);
    u.finish()
}

/// Uniform values in binding order, ready for upload.
pub fn pack_uniforms(prepared: &Prepared, width: u32, height: u32) -> Vec<f32> {
    uniform_values(prepared, width, height)
        .into_iter()
        .map(|(_, v)| v)
        .collect()
}

pub fn uniform_names() -> Vec<String> {
    let prepared = PixelPipeline::new(PipelineConfig::default()).prepare(&RenderParams::default());
    uniform_values(&prepared, 0, 0)
        .into_iter()
        .map(|(name, _)| name)
        .collect()
}

fn params_struct() -> String {
    let mut out = String::from("struct Params {\n");
    for name in uniform_names() {
        out.push_str(&format!("    {}: f32,\n", name));
    }
    out.push('}');
    out
}

fn float_list(values: impl IntoIterator<Item = f32>) -> String {
    values.into_iter().map(lit).collect::<Vec<_>>().join(", ")
}

fn field_list(prefix: &str) -> String {
    (0..HUE_CHANNELS.len())
        .map(|i| format!("params.{}_{}", prefix, i))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Full WGSL compute program for one pass over an `Rgba32Float` texture.
///
/// Bindings: 0 source texture, 1 destination storage texture, 2 uniform
/// block, 3 curve tables (`4 × FINE_SIZE` floats), 4 combined LUT data.
pub fn emit_program() -> String {
    let mut replacements: Vec<(&str, String)> = vec![
        ("$PARAMS_STRUCT", params_struct()),
        ("$WORKGROUP_SIZE", WORKGROUP_SIZE.to_string()),
        ("$REC709", float_list(REC709)),
        ("$MIN_TRANSMITTANCE", lit(MIN_TRANSMITTANCE)),
        ("$MIN_DENSITY_SPAN", lit(MIN_DENSITY_SPAN)),
        ("$MIN_GAMMA", lit(MIN_GAMMA)),
        ("$TOE_ZONE_SCALE", lit(TOE_ZONE_SCALE)),
        ("$SHOULDER_ZONE_SCALE", lit(SHOULDER_ZONE_SCALE)),
        ("$TOE_GAMMA_SCALE", lit(TOE_GAMMA_SCALE)),
        ("$SHOULDER_GAMMA_SCALE", lit(SHOULDER_GAMMA_SCALE)),
        ("$TRANSITION_WIDTH", lit(TRANSITION_WIDTH)),
        ("$MIN_LEVELS_SPAN", lit(MIN_LEVELS_SPAN)),
        ("$LEVELS_TARGET_DENSITY", lit(LEVELS_TARGET_DENSITY)),
        ("$LOG_CODE_DENOM", lit(LOG_CODE_DENOM)),
        ("$SNAP_EPSILON", lit(SNAP_EPSILON)),
        ("$MID_GRAY", lit(MID_GRAY)),
        ("$MIN_WINDOW", lit(MIN_WINDOW)),
        ("$ROLLOFF_KNEE", lit(ROLLOFF_KNEE)),
        ("$FINE_SIZE", format!("{}u", FINE_SIZE)),
        ("$HUE_COUNT", format!("{}u", HUE_CHANNELS.len())),
        ("$HUE_CENTERS", float_list(HUE_CHANNELS.map(|b| b.center))),
        ("$HUE_RANGES", float_list(HUE_CHANNELS.map(|b| b.range))),
        ("$HSL_HUES", field_list("hsl_hue")),
        ("$HSL_SATS", field_list("hsl_sat")),
        ("$HSL_LUMS", field_list("hsl_lum")),
        ("$ACHROMATIC_EPSILON", lit(ACHROMATIC_EPSILON)),
        ("$LUMINANCE_DAMPING", lit(LUMINANCE_DAMPING)),
        ("$PI", lit(PI)),
        ("$SHADOW_EDGE", lit(SHADOW_EDGE)),
        ("$HIGHLIGHT_EDGE", lit(HIGHLIGHT_EDGE)),
        ("$SPLIT_TRANSITION", lit(TRANSITION)),
        ("$TINT_STRENGTH", lit(TINT_STRENGTH)),
    ];
    // Longest token first so no token is a prefix match of a longer one.
    replacements.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

    let mut program = PROGRAM_TEMPLATE.to_string();
    for (token, value) in &replacements {
        program = program.replace(token, value);
    }
    program
}

const PROGRAM_TEMPLATE: &str = r#"
$PARAMS_STRUCT

@group(0) @binding(0)
var src_tex: texture_2d<f32>;
@group(0) @binding(1)
var dst_tex: texture_storage_2d<rgba32float, write>;
@group(0) @binding(2)
var<uniform> params: Params;
@group(0) @binding(3)
var<storage, read> curve_tables: array<f32>;
@group(0) @binding(4)
var<storage, read> lut_data: array<f32>;

fn finite_or_zero(v: f32) -> f32 {
    if (v != v || abs(v) > 3.4e38) {
        return 0.0;
    }
    return v;
}

fn sanitize(v: vec3<f32>) -> vec3<f32> {
    return vec3<f32>(finite_or_zero(v.x), finite_or_zero(v.y), finite_or_zero(v.z));
}

fn hermite(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = clamp((x - edge0) / (edge1 - edge0), 0.0, 1.0);
    return t * t * (3.0 - 2.0 * t);
}

fn safe_pow(x: f32, y: f32) -> f32 {
    if (x <= 0.0) {
        return 0.0;
    }
    return pow(x, y);
}

fn log10(x: f32) -> f32 {
    return log(x) / log(10.0);
}

// Film response (H&D curve)

fn film_curve(transmittance: f32, gamma_in: f32) -> f32 {
    let t = clamp(transmittance, $MIN_TRANSMITTANCE, 1.0);
    let density = -log10(t);
    let span = max(params.film_d_max - params.film_d_min, $MIN_DENSITY_SPAN);
    let dn = clamp((density - params.film_d_min) / span, 0.0, 1.0);
    let gamma = max(gamma_in, $MIN_GAMMA);
    var shaped = safe_pow(dn, gamma);
    if (params.film_toe > 0.0) {
        let boundary = $TOE_ZONE_SCALE * params.film_toe;
        let w = 1.0 - hermite(boundary - $TRANSITION_WIDTH, boundary, dn);
        let toe = safe_pow(dn, gamma * $TOE_GAMMA_SCALE);
        shaped = shaped + (toe - shaped) * w;
    }
    if (params.film_shoulder > 0.0) {
        let boundary = 1.0 - $SHOULDER_ZONE_SCALE * params.film_shoulder;
        let w = hermite(boundary, boundary + $TRANSITION_WIDTH, dn);
        let shoulder = safe_pow(dn, gamma * $SHOULDER_GAMMA_SCALE);
        shaped = shaped + (shoulder - shaped) * w;
    }
    let out_density = params.film_d_min + shaped * span;
    return clamp(pow(10.0, -out_density), 0.0, 1.0);
}

// Base correction and density levels

fn log_base(transmittance: f32, base_density: f32) -> f32 {
    let density = -log10(max(transmittance, $MIN_TRANSMITTANCE));
    return pow(10.0, -(density - base_density));
}

fn base_correct(v: vec3<f32>) -> vec3<f32> {
    if (params.base_mode > 0.5) {
        return vec3<f32>(
            log_base(v.x, params.base_density_r),
            log_base(v.y, params.base_density_g),
            log_base(v.z, params.base_density_b)
        );
    }
    return v * vec3<f32>(params.base_gain_r, params.base_gain_g, params.base_gain_b);
}

fn density_level(transmittance: f32, lo: f32, hi: f32) -> f32 {
    let density = -log10(max(transmittance, $MIN_TRANSMITTANCE));
    let span = max(hi - lo, $MIN_LEVELS_SPAN);
    let t = clamp((density - lo) / span, 0.0, 1.0);
    return pow(10.0, -t * $LEVELS_TARGET_DENSITY);
}

// Inversion

fn invert(v: f32) -> f32 {
    if (params.inversion_mode > 0.5) {
        let code = max(v * 255.0, 0.0);
        return clamp(1.0 - log(code + 1.0) / $LOG_CODE_DENOM, 0.0, 1.0);
    }
    return clamp(1.0 - v, 0.0, 1.0);
}

// 3D LUT

fn lut_grid(r: u32, g: u32, b: u32, n: u32) -> vec3<f32> {
    let i = (r + g * n + b * n * n) * 3u;
    return vec3<f32>(lut_data[i], lut_data[i + 1u], lut_data[i + 2u]);
}

fn lut_axis(v: f32, n: u32) -> vec2<f32> {
    let max_index = f32(n - 1u);
    var pos = clamp(finite_or_zero(v), 0.0, 1.0) * max_index;
    let nearest = round(pos);
    if (abs(pos - nearest) < $SNAP_EPSILON) {
        pos = nearest;
    }
    let i0 = min(floor(pos), max_index - 1.0);
    return vec2<f32>(i0, pos - i0);
}

fn lerp3(a: vec3<f32>, b: vec3<f32>, t: f32) -> vec3<f32> {
    return a * (1.0 - t) + b * t;
}

fn lut_sample(v: vec3<f32>) -> vec3<f32> {
    let n = u32(params.lut_size + 0.5);
    let ar = lut_axis(v.x, n);
    let ag = lut_axis(v.y, n);
    let ab = lut_axis(v.z, n);
    let r0 = u32(ar.x);
    let g0 = u32(ag.x);
    let b0 = u32(ab.x);
    let c00 = lerp3(lut_grid(r0, g0, b0, n), lut_grid(r0 + 1u, g0, b0, n), ar.y);
    let c10 = lerp3(lut_grid(r0, g0 + 1u, b0, n), lut_grid(r0 + 1u, g0 + 1u, b0, n), ar.y);
    let c01 = lerp3(lut_grid(r0, g0, b0 + 1u, n), lut_grid(r0 + 1u, g0, b0 + 1u, n), ar.y);
    let c11 = lerp3(lut_grid(r0, g0 + 1u, b0 + 1u, n), lut_grid(r0 + 1u, g0 + 1u, b0 + 1u, n), ar.y);
    return lerp3(lerp3(c00, c10, ag.y), lerp3(c01, c11, ag.y), ab.y);
}

fn lut_apply(v: vec3<f32>) -> vec3<f32> {
    let raw = lut_sample(v);
    if (params.lut_intensity == 1.0) {
        return raw;
    }
    return v * (1.0 - params.lut_intensity) + raw * params.lut_intensity;
}

// Tone

fn tone(v_in: f32) -> f32 {
    var v = v_in;
    if (params.tone_exposure != 1.0) {
        v = v * params.tone_exposure;
    }
    if (params.tone_contrast != 1.0) {
        v = (v - $MID_GRAY) * params.tone_contrast + $MID_GRAY;
    }
    if (params.tone_blacks != 0.0 || params.tone_whites != 1.0) {
        let window = max(params.tone_whites - params.tone_blacks, $MIN_WINDOW);
        v = (v - params.tone_blacks) / window;
    }
    if (params.tone_shadows != 0.0) {
        let b = clamp(v, 0.0, 1.0);
        v = v + params.tone_shadows * (1.0 - b) * (1.0 - b) * b * 4.0;
    }
    if (params.tone_highlights != 0.0) {
        let b = clamp(v, 0.0, 1.0);
        v = v + params.tone_highlights * b * b * (1.0 - b) * 4.0;
    }
    return finite_or_zero(v);
}

fn rolloff(v: vec3<f32>) -> vec3<f32> {
    let m = max(v.x, max(v.y, v.z));
    if (!(m > $ROLLOFF_KNEE)) {
        return v;
    }
    let span = 1.0 - $ROLLOFF_KNEE;
    let level = $ROLLOFF_KNEE + span * (1.0 - exp(-(m - $ROLLOFF_KNEE) / span));
    return v * (level / m);
}

// Curves

fn curve_lookup(slot: u32, v: f32) -> f32 {
    let last = f32($FINE_SIZE - 1u);
    let pos = clamp(finite_or_zero(v), 0.0, 1.0) * last;
    let i0 = min(floor(pos), last);
    let i1 = min(i0 + 1.0, last);
    let frac = pos - i0;
    let offset = slot * $FINE_SIZE;
    let a = curve_tables[offset + u32(i0)];
    let b = curve_tables[offset + u32(i1)];
    return a + (b - a) * frac;
}

fn apply_curves(v: vec3<f32>) -> vec3<f32> {
    let mask = u32(params.curves_enabled + 0.5);
    var result = v;
    if ((mask & 1u) != 0u) {
        result = vec3<f32>(
            curve_lookup(0u, result.x),
            curve_lookup(0u, result.y),
            curve_lookup(0u, result.z)
        );
    }
    if ((mask & 2u) != 0u) {
        result.x = curve_lookup(1u, result.x);
    }
    if ((mask & 4u) != 0u) {
        result.y = curve_lookup(2u, result.y);
    }
    if ((mask & 8u) != 0u) {
        result.z = curve_lookup(3u, result.z);
    }
    return result;
}

// HSL

fn wrap_hue(h: f32) -> f32 {
    return h - 360.0 * floor(h / 360.0);
}

fn hue_distance(a: f32, b: f32) -> f32 {
    let diff = abs(a - b) % 360.0;
    return min(diff, 360.0 - diff);
}

fn band_weight(hue: f32, center: f32, range: f32) -> f32 {
    let dist = hue_distance(hue, center);
    if (dist < range) {
        return 0.5 * (1.0 + cos($PI * dist / range));
    }
    return 0.0;
}

fn asymmetric(v: f32, delta: f32) -> f32 {
    if (delta >= 0.0) {
        return v + (1.0 - v) * delta;
    }
    return v * (1.0 + delta);
}

fn rgb_to_hsl(c_in: vec3<f32>) -> vec3<f32> {
    let c = clamp(c_in, vec3<f32>(0.0), vec3<f32>(1.0));
    let max_c = max(c.x, max(c.y, c.z));
    let min_c = min(c.x, min(c.y, c.z));
    let delta = max_c - min_c;
    let l = (max_c + min_c) / 2.0;
    if (delta < $ACHROMATIC_EPSILON) {
        return vec3<f32>(0.0, 0.0, l);
    }
    var s: f32;
    if (l < 0.5) {
        s = delta / (max_c + min_c);
    } else {
        s = delta / (2.0 - max_c - min_c);
    }
    var h: f32;
    if (max_c == c.x) {
        h = (c.y - c.z) / delta;
        if (c.y < c.z) {
            h = h + 6.0;
        }
        h = h * 60.0;
    } else if (max_c == c.y) {
        h = ((c.z - c.x) / delta + 2.0) * 60.0;
    } else {
        h = ((c.x - c.y) / delta + 4.0) * 60.0;
    }
    return vec3<f32>(h, s, l);
}

fn hue_to_channel(p: f32, q: f32, t_in: f32) -> f32 {
    var t = t_in;
    if (t < 0.0) {
        t = t + 1.0;
    }
    if (t > 1.0) {
        t = t - 1.0;
    }
    if (t < 1.0 / 6.0) {
        return p + (q - p) * 6.0 * t;
    }
    if (t < 0.5) {
        return q;
    }
    if (t < 2.0 / 3.0) {
        return p + (q - p) * (2.0 / 3.0 - t) * 6.0;
    }
    return p;
}

fn hsl_to_rgb(hsl: vec3<f32>) -> vec3<f32> {
    let s = clamp(hsl.y, 0.0, 1.0);
    let l = clamp(hsl.z, 0.0, 1.0);
    if (s < $ACHROMATIC_EPSILON) {
        return vec3<f32>(l, l, l);
    }
    var q: f32;
    if (l < 0.5) {
        q = l * (1.0 + s);
    } else {
        q = l + s - l * s;
    }
    let p = 2.0 * l - q;
    let h = wrap_hue(hsl.x) / 360.0;
    return vec3<f32>(
        hue_to_channel(p, q, h + 1.0 / 3.0),
        hue_to_channel(p, q, h),
        hue_to_channel(p, q, h - 1.0 / 3.0)
    );
}

fn apply_hsl(v: vec3<f32>) -> vec3<f32> {
    let max_c = max(v.x, max(v.y, v.z));
    let min_c = min(v.x, min(v.y, v.z));
    if (!(max_c - min_c >= $ACHROMATIC_EPSILON)) {
        return v;
    }
    let hsl = rgb_to_hsl(v);
    let centers = array<f32, $HUE_COUNT>($HUE_CENTERS);
    let ranges = array<f32, $HUE_COUNT>($HUE_RANGES);
    let hues = array<f32, $HUE_COUNT>($HSL_HUES);
    let sats = array<f32, $HUE_COUNT>($HSL_SATS);
    let lums = array<f32, $HUE_COUNT>($HSL_LUMS);

    var weight_sum = 0.0;
    var hue_shift = 0.0;
    var sat = 0.0;
    var lum = 0.0;
    for (var i = 0u; i < $HUE_COUNT; i = i + 1u) {
        let w = band_weight(hsl.x, centers[i], ranges[i]);
        if (w <= 0.0) {
            continue;
        }
        weight_sum = weight_sum + w;
        hue_shift = hue_shift + w * hues[i];
        sat = sat + w * sats[i] / 100.0;
        lum = lum + w * lums[i] / 100.0;
    }
    if (weight_sum > 1.0) {
        hue_shift = hue_shift / weight_sum;
        sat = sat / weight_sum;
        lum = lum / weight_sum;
    }
    if (hue_shift == 0.0 && sat == 0.0 && lum == 0.0) {
        return v;
    }
    return hsl_to_rgb(vec3<f32>(
        wrap_hue(hsl.x + hue_shift),
        asymmetric(hsl.y, sat),
        asymmetric(hsl.z, lum * $LUMINANCE_DAMPING)
    ));
}

// Split tone

fn tint_toward(v: vec3<f32>, hue: f32, strength: f32, weight: f32) -> vec3<f32> {
    let amount = strength * weight * $TINT_STRENGTH;
    if (amount == 0.0) {
        return v;
    }
    let tint = hsl_to_rgb(vec3<f32>(hue, 1.0, 0.5));
    return v + (tint - v) * amount;
}

fn apply_split_tone(v: vec3<f32>) -> vec3<f32> {
    let rec709 = vec3<f32>($REC709);
    let lum = rec709.x * v.x + rec709.y * v.y + rec709.z * v.z;
    let shift = (params.split_balance / 100.0) / 2.0 * $SHADOW_EDGE;
    let shadow_edge = $SHADOW_EDGE - shift;
    let highlight_edge = $HIGHLIGHT_EDGE - shift;
    let w_shadow = 1.0 - hermite(shadow_edge - $SPLIT_TRANSITION, shadow_edge + $SPLIT_TRANSITION, lum);
    let w_highlight = hermite(highlight_edge - $SPLIT_TRANSITION, highlight_edge + $SPLIT_TRANSITION, lum);
    let w_midtone = max(1.0 - w_shadow - w_highlight, 0.0);

    var result = v;
    result = tint_toward(result, params.split_shadow_hue, params.split_shadow_sat / 100.0, w_shadow);
    result = tint_toward(result, params.split_midtone_hue, params.split_midtone_sat / 100.0, w_midtone);
    result = tint_toward(result, params.split_highlight_hue, params.split_highlight_sat / 100.0, w_highlight);
    return result;
}

@compute @workgroup_size($WORKGROUP_SIZE, $WORKGROUP_SIZE, 1)
fn main(@builtin(global_invocation_id) gid: vec3<u32>) {
    let width = u32(params.width + 0.5);
    let height = u32(params.height + 0.5);
    if (gid.x >= width || gid.y >= height) {
        return;
    }

    let coord = vec2<i32>(i32(gid.x), i32(gid.y));
    let px = textureLoad(src_tex, coord, 0);
    var v = sanitize(px.rgb);

    if (params.film_enabled > 0.5) {
        v = sanitize(vec3<f32>(
            film_curve(v.x, params.film_gamma_r),
            film_curve(v.y, params.film_gamma_g),
            film_curve(v.z, params.film_gamma_b)
        ));
    }
    v = sanitize(base_correct(v));
    if (params.levels_enabled > 0.5) {
        v = sanitize(vec3<f32>(
            density_level(v.x, params.levels_min_r, params.levels_max_r),
            density_level(v.y, params.levels_min_g, params.levels_max_g),
            density_level(v.z, params.levels_min_b, params.levels_max_b)
        ));
    }
    if (params.inversion_enabled > 0.5) {
        v = sanitize(vec3<f32>(invert(v.x), invert(v.y), invert(v.z)));
    }
    if (params.lut_size > 1.5) {
        v = sanitize(lut_apply(clamp(v, vec3<f32>(0.0), vec3<f32>(1.0))));
    }
    v = sanitize(v * vec3<f32>(params.wb_gain_r, params.wb_gain_g, params.wb_gain_b));
    v = sanitize(vec3<f32>(tone(v.x), tone(v.y), tone(v.z)));
    if (params.highlight_rolloff > 0.5) {
        v = sanitize(rolloff(v));
    }
    if (params.curves_enabled > 0.5) {
        v = sanitize(apply_curves(v));
    }
    if (params.hsl_enabled > 0.5) {
        v = sanitize(apply_hsl(v));
    }
    if (params.split_enabled > 0.5) {
        v = sanitize(apply_split_tone(v));
    }

    textureStore(dst_tex, coord, vec4<f32>(clamp(v, vec3<f32>(0.0), vec3<f32>(1.0)), px.a));
}
"#;

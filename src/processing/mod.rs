pub mod base;
pub mod curves;
pub mod film_curve;
pub mod gpu_pipeline;
pub mod hsl;
pub mod inversion;
pub mod lut3d;
pub mod pipeline;
pub mod render;
pub mod shader;
pub mod spline;
pub mod split_tone;
pub mod tone;
pub mod white_balance;

/// Rec.709 luma weights.
pub const REC709: [f32; 3] = [0.2126, 0.7152, 0.0722];

/// Hermite smoothstep `t²(3−2t)` of `x` across `[edge0, edge1]`.
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Replaces NaN and infinities with 0.
pub fn finite_or_zero(v: f32) -> f32 {
    if v.is_finite() { v } else { 0.0 }
}

pub fn sanitize(rgb: [f32; 3]) -> [f32; 3] {
    rgb.map(finite_or_zero)
}

pub fn luminance(rgb: [f32; 3]) -> f32 {
    REC709[0] * rgb[0] + REC709[1] * rgb[1] + REC709[2] * rgb[2]
}

/// Float `[0,1]` to 8-bit code value, rounding to nearest.
pub fn to_code(v: f32) -> u8 {
    (finite_or_zero(v).clamp(0.0, 1.0) * 255.0).round() as u8
}

pub fn from_code(v: u8) -> f32 {
    v as f32 / 255.0
}

use crate::params::WhiteBalance;

pub const GAIN_MIN: f32 = 0.05;
pub const GAIN_MAX: f32 = 50.0;
pub const TEMP_WEIGHT: f32 = 0.5;
pub const TINT_RB_WEIGHT: f32 = 0.3;
pub const TINT_G_WEIGHT: f32 = 0.5;

/// Converts base gains plus temp/tint sliders into per-channel multipliers.
pub fn compute_gains(wb: &WhiteBalance) -> [f32; 3] {
    let t = wb.temp / 100.0;
    let n = wb.tint / 100.0;
    let r = wb.red * (1.0 + TEMP_WEIGHT * t + TINT_RB_WEIGHT * n);
    let g = wb.green * (1.0 - TINT_G_WEIGHT * n);
    let b = wb.blue * (1.0 - TEMP_WEIGHT * t + TINT_RB_WEIGHT * n);
    [r, g, b].map(|gain| {
        if gain.is_finite() {
            gain.clamp(GAIN_MIN, GAIN_MAX)
        } else {
            1.0
        }
    })
}

pub fn apply(rgb: [f32; 3], gains: [f32; 3]) -> [f32; 3] {
    [rgb[0] * gains[0], rgb[1] * gains[1], rgb[2] * gains[2]]
}

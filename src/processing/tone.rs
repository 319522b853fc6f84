//! Exposure, contrast, black/white point, shadows and highlights.
//!
//! The integer path bakes all five steps into a 256-entry table; the float
//! path calls [`ToneCurve::apply`] directly. Both evaluate the same function.

use crate::params::Tone;

use super::finite_or_zero;

pub const TABLE_SIZE: usize = 256;
pub const MID_GRAY: f32 = 0.5;
/// Exposure slider units per stop.
pub const EXPOSURE_PER_STOP: f32 = 50.0;
/// Black/white point shift per slider unit.
pub const POINT_SCALE: f32 = 0.002;
/// Shadow/highlight factor per slider unit.
pub const ZONE_FACTOR_SCALE: f32 = 0.005;
pub const ROLLOFF_KNEE: f32 = 0.8;
pub const MIN_WINDOW: f32 = 1e-6;
/// Keeps the contrast denominator `259 − c` away from zero.
const CONTRAST_LIMIT: f32 = 258.0;

#[derive(Clone, Copy, Debug, PartialEq)]
/// Tone sliders resolved into the constants the per-value math needs.
pub struct ToneCurve {
    pub exposure_gain: f32,
    pub contrast_factor: f32,
    pub black_point: f32,
    pub white_point: f32,
    pub shadow_factor: f32,
    pub highlight_factor: f32,
}

impl ToneCurve {
    pub fn from_params(tone: &Tone) -> Self {
        let c = tone.contrast.clamp(-255.0, CONTRAST_LIMIT);
        Self {
            exposure_gain: 2.0_f32.powf(tone.exposure / EXPOSURE_PER_STOP),
            contrast_factor: contrast_factor(c),
            black_point: -tone.blacks * POINT_SCALE,
            white_point: 1.0 - tone.whites * POINT_SCALE,
            shadow_factor: tone.shadows * ZONE_FACTOR_SCALE,
            highlight_factor: tone.highlights * ZONE_FACTOR_SCALE,
        }
    }

    pub fn is_identity(&self) -> bool {
        self.exposure_gain == 1.0
            && self.contrast_factor == 1.0
            && self.black_point == 0.0
            && self.white_point == 1.0
            && self.shadow_factor == 0.0
            && self.highlight_factor == 0.0
    }

    /// Maps one normalized value. The result is not clamped above 1.0.
    pub fn apply(&self, v: f32) -> f32 {
        let mut v = v;
        if self.exposure_gain != 1.0 {
            v *= self.exposure_gain;
        }
        if self.contrast_factor != 1.0 {
            v = (v - MID_GRAY) * self.contrast_factor + MID_GRAY;
        }
        if self.black_point != 0.0 || self.white_point != 1.0 {
            let window = (self.white_point - self.black_point).max(MIN_WINDOW);
            v = (v - self.black_point) / window;
        }
        if self.shadow_factor != 0.0 {
            let b = v.clamp(0.0, 1.0);
            v += self.shadow_factor * (1.0 - b) * (1.0 - b) * b * 4.0;
        }
        if self.highlight_factor != 0.0 {
            let b = v.clamp(0.0, 1.0);
            v += self.highlight_factor * b * b * (1.0 - b) * 4.0;
        }
        finite_or_zero(v)
    }

    /// Samples [`Self::apply`] at every 8-bit code value.
    pub fn build_table(&self) -> [f32; TABLE_SIZE] {
        std::array::from_fn(|i| self.apply(i as f32 / 255.0))
    }

    /// Integer-path evaluation: the baked table inside `[0,1]`, the inline
    /// math outside it. White balance gains can push values past 1.0, and
    /// the table ends meet [`Self::apply`] exactly at 0 and 1.
    pub fn apply_tabled(&self, table: &[f32; TABLE_SIZE], v: f32) -> f32 {
        if (0.0..=1.0).contains(&v) {
            lookup(table, v)
        } else {
            self.apply(v)
        }
    }
}

/// `259(c+255) / (255(259−c))`.
pub fn contrast_factor(c: f32) -> f32 {
    259.0 * (c + 255.0) / (255.0 * (259.0 - c))
}

/// Looks a normalized value up in a 256-entry table, interpolating between
/// neighbouring entries. Inputs outside `[0,1]` clamp to the end entries.
pub fn lookup(table: &[f32; TABLE_SIZE], v: f32) -> f32 {
    let pos = finite_or_zero(v).clamp(0.0, 1.0) * (TABLE_SIZE - 1) as f32;
    let i0 = pos.floor() as usize;
    let i1 = (i0 + 1).min(TABLE_SIZE - 1);
    let frac = pos - i0 as f32;
    table[i0] + (table[i1] - table[i0]) * frac
}

/// Compresses channels above the knee toward 1.0, scaling all three by the
/// same factor so hue survives blown highlights.
pub fn highlight_rolloff(rgb: [f32; 3]) -> [f32; 3] {
    let max = rgb[0].max(rgb[1]).max(rgb[2]);
    if !(max > ROLLOFF_KNEE) {
        return rgb;
    }
    let span = 1.0 - ROLLOFF_KNEE;
    let target = ROLLOFF_KNEE + span * (1.0 - (-(max - ROLLOFF_KNEE) / span).exp());
    let scale = target / max;
    rgb.map(|v| v * scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve(tone: Tone) -> ToneCurve {
        ToneCurve::from_params(&tone)
    }

    #[test]
    fn neutral_sliders_are_identity() {
        let t = curve(Tone::default());
        assert!(t.is_identity());
        for i in 0..=255 {
            let v = i as f32 / 255.0;
            assert_eq!(t.apply(v), v);
        }
    }

    #[test]
    fn exposure_of_fifty_is_one_stop() {
        let t = curve(Tone {
            exposure: 50.0,
            ..Tone::default()
        });
        assert!((t.apply(0.2) - 0.4).abs() < 1e-6);
    }

    #[test]
    fn contrast_pivots_on_mid_gray() {
        let t = curve(Tone {
            contrast: 60.0,
            ..Tone::default()
        });
        assert!((t.apply(MID_GRAY) - MID_GRAY).abs() < 1e-6);
        assert!(t.apply(0.7) > 0.7);
        assert!(t.apply(0.3) < 0.3);
    }

    #[test]
    fn blacks_and_whites_move_the_window() {
        let t = curve(Tone {
            whites: 50.0,
            ..Tone::default()
        });
        assert!((t.apply(0.9) - 1.0).abs() < 1e-6);
        let t = curve(Tone {
            blacks: -50.0,
            ..Tone::default()
        });
        assert!(t.apply(0.1).abs() < 1e-6);
    }

    #[test]
    fn shadows_peak_below_highlights_peak() {
        let shadows = curve(Tone {
            shadows: 100.0,
            ..Tone::default()
        });
        let highlights = curve(Tone {
            highlights: 100.0,
            ..Tone::default()
        });
        let lift = |t: &ToneCurve, v: f32| t.apply(v) - v;
        assert!(lift(&shadows, 1.0 / 3.0) > lift(&shadows, 2.0 / 3.0));
        assert!(lift(&highlights, 2.0 / 3.0) > lift(&highlights, 1.0 / 3.0));
        assert_eq!(lift(&shadows, 0.0), 0.0);
        assert_eq!(lift(&highlights, 1.0), 0.0);
    }

    #[test]
    fn table_lookup_matches_inline_math_between_entries() {
        let t = curve(Tone {
            exposure: 20.0,
            contrast: 25.0,
            shadows: 30.0,
            highlights: -20.0,
            whites: 10.0,
            blacks: 5.0,
            highlight_rolloff: false,
        });
        let table = t.build_table();
        for i in 0..=1000 {
            let v = i as f32 / 1000.0;
            let diff = (lookup(&table, v) - t.apply(v)).abs();
            assert!(diff < 0.5 / 255.0, "v={} diff={}", v, diff);
        }
    }

    #[test]
    fn tabled_evaluation_follows_the_curve_past_one() {
        let t = curve(Tone {
            exposure: -30.0,
            contrast: 10.0,
            ..Tone::default()
        });
        let table = t.build_table();
        for v in [1.0, 1.2, 1.4, 2.0, -0.1] {
            assert_eq!(t.apply_tabled(&table, v), t.apply(v), "v={}", v);
        }
        assert!(t.apply_tabled(&table, 1.4) > t.apply_tabled(&table, 1.0));
    }

    #[test]
    fn rolloff_leaves_values_below_knee_alone() {
        assert_eq!(highlight_rolloff([0.1, 0.5, 0.8]), [0.1, 0.5, 0.8]);
    }

    #[test]
    fn rolloff_compresses_and_preserves_ratios() {
        let out = highlight_rolloff([1.6, 0.8, 0.4]);
        assert!(out[0] < 1.0);
        assert!((out[1] / out[0] - 0.5).abs() < 1e-5);
        assert!((out[2] / out[0] - 0.25).abs() < 1e-5);
    }
}

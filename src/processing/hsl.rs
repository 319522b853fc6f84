//! HSL color space conversions and the 8-band hue/saturation/luminance stage.

use crate::params::{HslChannel, HslParams};

/// HSL color: hue in degrees 0..360, saturation and lightness 0..1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsl {
    pub h: f32,
    pub s: f32,
    pub l: f32,
}

/// Chroma below this is treated as gray and left untouched.
pub const ACHROMATIC_EPSILON: f32 = 1e-6;
/// Luminance deltas are damped by this factor on both branches.
pub const LUMINANCE_DAMPING: f32 = 0.5;

/// Hue band a channel responds to: center and half-width in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HueBand {
    pub center: f32,
    pub range: f32,
}

/// Bands in the same order as [`HslParams::channels`].
pub const HUE_CHANNELS: [HueBand; 8] = [
    HueBand {
        center: 0.0,
        range: 25.0,
    },
    HueBand {
        center: 30.0,
        range: 20.0,
    },
    HueBand {
        center: 60.0,
        range: 25.0,
    },
    HueBand {
        center: 120.0,
        range: 45.0,
    },
    HueBand {
        center: 180.0,
        range: 30.0,
    },
    HueBand {
        center: 240.0,
        range: 40.0,
    },
    HueBand {
        center: 280.0,
        range: 30.0,
    },
    HueBand {
        center: 320.0,
        range: 30.0,
    },
];

/// Input is clamped to `[0,1]` per channel.
pub fn rgb_to_hsl(rgb: [f32; 3]) -> Hsl {
    let [r, g, b] = rgb.map(|v| v.clamp(0.0, 1.0));
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;
    let l = (max + min) / 2.0;

    if delta < ACHROMATIC_EPSILON {
        return Hsl { h: 0.0, s: 0.0, l };
    }

    let s = if l < 0.5 {
        delta / (max + min)
    } else {
        delta / (2.0 - max - min)
    };

    let h = if max == r {
        let mut h = (g - b) / delta;
        if g < b {
            h += 6.0;
        }
        h * 60.0
    } else if max == g {
        ((b - r) / delta + 2.0) * 60.0
    } else {
        ((r - g) / delta + 4.0) * 60.0
    };

    Hsl { h, s, l }
}

pub fn hsl_to_rgb(hsl: Hsl) -> [f32; 3] {
    let s = hsl.s.clamp(0.0, 1.0);
    let l = hsl.l.clamp(0.0, 1.0);
    if s < ACHROMATIC_EPSILON {
        return [l, l, l];
    }

    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    let h = wrap_hue(hsl.h) / 360.0;

    [
        hue_to_channel(p, q, h + 1.0 / 3.0),
        hue_to_channel(p, q, h),
        hue_to_channel(p, q, h - 1.0 / 3.0),
    ]
}

fn hue_to_channel(p: f32, q: f32, mut t: f32) -> f32 {
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

pub fn wrap_hue(h: f32) -> f32 {
    h.rem_euclid(360.0)
}

/// Angular distance on the hue wheel, 0..=180.
pub fn hue_distance(a: f32, b: f32) -> f32 {
    let diff = (a - b).abs() % 360.0;
    diff.min(360.0 - diff)
}

/// Raised-cosine weight of `hue` inside `band`; 0 outside it.
pub fn band_weight(hue: f32, band: HueBand) -> f32 {
    let dist = hue_distance(hue, band.center);
    if dist < band.range {
        0.5 * (1.0 + (std::f32::consts::PI * dist / band.range).cos())
    } else {
        0.0
    }
}

/// Weighted `(hue shift, saturation delta, luminance delta)` for `hue`.
///
/// Deltas are fractions (slider / 100). When the bands overlap enough that
/// the weights sum past 1, all three are divided by that sum.
pub fn blend_adjustments(hue: f32, bands: &[HueBand], channels: &[HslChannel]) -> (f32, f32, f32) {
    let mut weight_sum = 0.0;
    let mut hue_shift = 0.0;
    let mut sat = 0.0;
    let mut lum = 0.0;
    for (band, channel) in bands.iter().zip(channels) {
        let w = band_weight(hue, *band);
        if w <= 0.0 {
            continue;
        }
        weight_sum += w;
        hue_shift += w * channel.hue;
        sat += w * channel.saturation / 100.0;
        lum += w * channel.luminance / 100.0;
    }
    if weight_sum > 1.0 {
        hue_shift /= weight_sum;
        sat /= weight_sum;
        lum /= weight_sum;
    }
    (hue_shift, sat, lum)
}

/// Positive deltas move toward 1, negative ones scale toward 0.
pub fn asymmetric(v: f32, delta: f32) -> f32 {
    if delta >= 0.0 {
        v + (1.0 - v) * delta
    } else {
        v * (1.0 + delta)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HslStage {
    channels: [HslChannel; 8],
}

impl HslStage {
    pub fn from_params(hsl: &HslParams) -> Self {
        Self {
            channels: hsl.channels(),
        }
    }

    pub fn is_identity(&self) -> bool {
        self.channels.iter().all(HslChannel::is_neutral)
    }

    pub fn channels(&self) -> &[HslChannel; 8] {
        &self.channels
    }

    pub fn apply(&self, rgb: [f32; 3]) -> [f32; 3] {
        apply_with_bands(rgb, &HUE_CHANNELS, &self.channels)
    }
}

pub fn apply_with_bands(rgb: [f32; 3], bands: &[HueBand], channels: &[HslChannel]) -> [f32; 3] {
    let max = rgb[0].max(rgb[1]).max(rgb[2]);
    let min = rgb[0].min(rgb[1]).min(rgb[2]);
    if !(max - min >= ACHROMATIC_EPSILON) {
        return rgb;
    }

    let hsl = rgb_to_hsl(rgb);
    let (hue_shift, sat, lum) = blend_adjustments(hsl.h, bands, channels);
    if hue_shift == 0.0 && sat == 0.0 && lum == 0.0 {
        return rgb;
    }

    hsl_to_rgb(Hsl {
        h: wrap_hue(hsl.h + hue_shift),
        s: asymmetric(hsl.s, sat),
        l: asymmetric(hsl.l, lum * LUMINANCE_DAMPING),
    })
}

//! Luminance-zoned tinting toward three fully saturated hues.

use crate::params::SplitTone;

use super::hsl::{Hsl, hsl_to_rgb};
use super::{luminance, smoothstep};

pub const SHADOW_EDGE: f32 = 0.25;
pub const HIGHLIGHT_EDGE: f32 = 0.75;
/// Half-width of the smoothstep band around each zone edge.
pub const TRANSITION: f32 = 0.1;
/// Blend strength at full zone weight and 100% saturation.
pub const TINT_STRENGTH: f32 = 0.3;

/// Tint color for a hue: HSL with S=1, L=0.5.
pub fn tint_color(hue: f32) -> [f32; 3] {
    hsl_to_rgb(Hsl {
        h: hue,
        s: 1.0,
        l: 0.5,
    })
}

/// Zone edges after balance. Positive balance lowers both edges, widening
/// the highlight zone.
pub fn zone_edges(balance: f32) -> (f32, f32) {
    let shift = (balance / 100.0) / 2.0 * SHADOW_EDGE;
    (SHADOW_EDGE - shift, HIGHLIGHT_EDGE - shift)
}

/// `[shadow, midtone, highlight]` weights for a luminance.
pub fn zone_weights(lum: f32, shadow_edge: f32, highlight_edge: f32) -> [f32; 3] {
    let shadow = 1.0 - smoothstep(shadow_edge - TRANSITION, shadow_edge + TRANSITION, lum);
    let highlight = smoothstep(highlight_edge - TRANSITION, highlight_edge + TRANSITION, lum);
    let midtone = (1.0 - shadow - highlight).max(0.0);
    [shadow, midtone, highlight]
}

#[derive(Debug, Clone, Copy, PartialEq)]
/// Tints and zone constants resolved once per image.
pub struct SplitToneStage {
    /// Shadow, midtone, highlight.
    pub tints: [[f32; 3]; 3],
    /// Zone saturations as fractions.
    pub strengths: [f32; 3],
    pub shadow_edge: f32,
    pub highlight_edge: f32,
}

impl SplitToneStage {
    pub fn from_params(split: &SplitTone) -> Self {
        let (shadow_edge, highlight_edge) = zone_edges(split.balance);
        Self {
            tints: [
                tint_color(split.shadow_hue),
                tint_color(split.midtone_hue),
                tint_color(split.highlight_hue),
            ],
            strengths: [
                split.shadow_saturation / 100.0,
                split.midtone_saturation / 100.0,
                split.highlight_saturation / 100.0,
            ],
            shadow_edge,
            highlight_edge,
        }
    }

    pub fn is_identity(&self) -> bool {
        self.strengths.iter().all(|s| *s == 0.0)
    }

    /// Zone weights come from the input luminance; each zone then blends
    /// the running result toward its tint.
    pub fn apply(&self, rgb: [f32; 3]) -> [f32; 3] {
        let weights = zone_weights(luminance(rgb), self.shadow_edge, self.highlight_edge);
        let mut result = rgb;
        for zone in 0..3 {
            let amount = self.strengths[zone] * weights[zone] * TINT_STRENGTH;
            if amount == 0.0 {
                continue;
            }
            let tint = self.tints[zone];
            for c in 0..3 {
                result[c] += (tint[c] - result[c]) * amount;
            }
        }
        result
    }
}

//! Film-base cast removal and density-domain auto-levels.

use crate::params::{BaseCorrection, BaseCorrectionMode, DensityLevels, DensityRange};

use super::film_curve::MIN_TRANSMITTANCE;

/// Output density span that auto-levels stretches every channel onto.
pub const LEVELS_TARGET_DENSITY: f32 = 2.2;
pub const MIN_LEVELS_SPAN: f32 = 1e-6;

#[derive(Clone, Copy, Debug, PartialEq)]
/// Base correction resolved for per-pixel use.
pub enum BaseStage {
    Linear { gains: [f32; 3] },
    Log { densities: [f32; 3] },
}

impl BaseStage {
    pub fn from_params(base: &BaseCorrection) -> Self {
        match base.mode {
            BaseCorrectionMode::Linear => Self::Linear { gains: base.gains },
            BaseCorrectionMode::Log => Self::Log {
                densities: base.densities,
            },
        }
    }

    pub fn is_identity(&self) -> bool {
        match self {
            Self::Linear { gains } => gains.iter().all(|g| *g == 1.0),
            Self::Log { densities } => densities.iter().all(|d| *d == 0.0),
        }
    }

    pub fn apply(&self, rgb: [f32; 3]) -> [f32; 3] {
        match self {
            Self::Linear { gains } => [0, 1, 2].map(|c| apply_linear_gain(rgb[c], gains[c])),
            Self::Log { densities } => {
                [0, 1, 2].map(|c| apply_log_base(rgb[c], densities[c]))
            }
        }
    }
}

pub fn apply_linear_gain(v: f32, gain: f32) -> f32 {
    v * gain
}

/// Subtracts the base density; the result may exceed 1.0 when the scan is
/// brighter than the sampled base.
pub fn apply_log_base(transmittance: f32, base_density: f32) -> f32 {
    let density = -transmittance.max(MIN_TRANSMITTANCE).log10();
    10.0_f32.powf(-(density - base_density))
}

/// Stretches a channel's density window onto `[0, LEVELS_TARGET_DENSITY]`.
pub fn apply_density_levels(transmittance: f32, range: DensityRange) -> f32 {
    let density = -transmittance.max(MIN_TRANSMITTANCE).log10();
    let span = (range.max - range.min).max(MIN_LEVELS_SPAN);
    let t = ((density - range.min) / span).clamp(0.0, 1.0);
    10.0_f32.powf(-t * LEVELS_TARGET_DENSITY)
}

/// Density levels apply only in log base-correction mode.
pub fn levels_active(levels: &DensityLevels, base: &BaseCorrection) -> bool {
    levels.enabled && base.mode == BaseCorrectionMode::Log
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_gain_is_a_no_op() {
        let stage = BaseStage::from_params(&BaseCorrection::default());
        assert!(stage.is_identity());
        assert_eq!(stage.apply([0.1, 0.5, 0.9]), [0.1, 0.5, 0.9]);
    }

    #[test]
    fn log_mode_subtracts_density() {
        // Scan density 1.0, base density 0.3 -> corrected density 0.7.
        let out = apply_log_base(0.1, 0.3);
        assert!((out - 10.0_f32.powf(-0.7)).abs() < 1e-5);
    }

    #[test]
    fn log_mode_may_exceed_unity_when_scan_is_brighter_than_base() {
        assert!(apply_log_base(0.9, 0.3) > 1.0);
    }

    #[test]
    fn density_levels_stretch_window_to_target() {
        let range = DensityRange { min: 0.2, max: 1.2 };
        let at_min = apply_density_levels(10.0_f32.powf(-0.2), range);
        let at_max = apply_density_levels(10.0_f32.powf(-1.2), range);
        assert!((at_min - 1.0).abs() < 1e-5);
        assert!((at_max - 10.0_f32.powf(-LEVELS_TARGET_DENSITY)).abs() < 1e-5);
    }

    #[test]
    fn levels_require_log_mode() {
        let mut levels = DensityLevels::default();
        levels.enabled = true;
        let mut base = BaseCorrection::default();
        assert!(!levels_active(&levels, &base));
        base.mode = BaseCorrectionMode::Log;
        assert!(levels_active(&levels, &base));
    }
}

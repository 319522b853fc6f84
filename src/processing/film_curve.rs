//! Hurter-Driffield density response of negative film.
//!
//! Transmittance is converted to density, normalized against
//! `[d_min, d_max]`, shaped by the characteristic curve and converted back.
//! The curve is a plain power law unless toe or shoulder are set, in which
//! case the low and high density zones use steeper/flatter exponents and are
//! blended into the straight section over a fixed transition band.

use crate::params::FilmCurve;

use super::smoothstep;

/// Transmittance floor; keeps `log10` finite.
pub const MIN_TRANSMITTANCE: f32 = 0.001;
/// Toe zone spans `[0, TOE_ZONE_SCALE · toe)` of normalized density.
pub const TOE_ZONE_SCALE: f32 = 0.25;
/// Shoulder zone spans `(1 − SHOULDER_ZONE_SCALE · shoulder, 1]`.
pub const SHOULDER_ZONE_SCALE: f32 = 0.25;
pub const TOE_GAMMA_SCALE: f32 = 1.5;
pub const SHOULDER_GAMMA_SCALE: f32 = 0.6;
pub const TRANSITION_WIDTH: f32 = 0.08;
pub const MIN_GAMMA: f32 = 0.01;
pub const MIN_DENSITY_SPAN: f32 = 1e-6;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FilmCurveParams {
    pub gamma: f32,
    pub d_min: f32,
    pub d_max: f32,
    pub toe: f32,
    pub shoulder: f32,
}

impl FilmCurveParams {
    /// One parameter set per channel, honoring per-channel gamma overrides.
    pub fn per_channel(curve: &FilmCurve) -> [Self; 3] {
        let gammas = curve.channel_gamma.unwrap_or([curve.gamma; 3]);
        gammas.map(|gamma| Self {
            gamma,
            d_min: curve.d_min,
            d_max: curve.d_max,
            toe: curve.toe,
            shoulder: curve.shoulder,
        })
    }

    pub fn has_toe_or_shoulder(&self) -> bool {
        self.toe > 0.0 || self.shoulder > 0.0
    }

    /// Upper edge of the toe zone in normalized density.
    pub fn toe_boundary(&self) -> f32 {
        TOE_ZONE_SCALE * self.toe.max(0.0)
    }

    /// Lower edge of the shoulder zone in normalized density.
    pub fn shoulder_boundary(&self) -> f32 {
        1.0 - SHOULDER_ZONE_SCALE * self.shoulder.max(0.0)
    }
}

/// Normalized density of a transmittance value against the params' range.
pub fn normalized_density(transmittance: f32, params: &FilmCurveParams) -> f32 {
    let t = transmittance.clamp(MIN_TRANSMITTANCE, 1.0);
    let density = -t.log10();
    let span = (params.d_max - params.d_min).max(MIN_DENSITY_SPAN);
    ((density - params.d_min) / span).clamp(0.0, 1.0)
}

/// Applies the characteristic curve to normalized density.
pub fn shape_density(density_norm: f32, params: &FilmCurveParams) -> f32 {
    let gamma = params.gamma.max(MIN_GAMMA);
    let straight = density_norm.powf(gamma);
    if !params.has_toe_or_shoulder() {
        return straight;
    }

    let mut shaped = straight;
    if params.toe > 0.0 {
        let boundary = params.toe_boundary();
        let weight = 1.0 - smoothstep(boundary - TRANSITION_WIDTH, boundary, density_norm);
        let toe = density_norm.powf(gamma * TOE_GAMMA_SCALE);
        shaped += (toe - shaped) * weight;
    }
    if params.shoulder > 0.0 {
        let boundary = params.shoulder_boundary();
        let weight = smoothstep(boundary, boundary + TRANSITION_WIDTH, density_norm);
        let shoulder = density_norm.powf(gamma * SHOULDER_GAMMA_SCALE);
        shaped += (shoulder - shaped) * weight;
    }
    shaped
}

/// Film response on a `[0,1]` transmittance value.
pub fn apply_film_curve_float(transmittance: f32, params: &FilmCurveParams) -> f32 {
    let density_norm = normalized_density(transmittance, params);
    let shaped = shape_density(density_norm, params);
    let span = (params.d_max - params.d_min).max(MIN_DENSITY_SPAN);
    let density = params.d_min + shaped * span;
    10.0_f32.powf(-density).clamp(0.0, 1.0)
}

/// Film response on an 8-bit code value; result stays in `[0,255]`.
pub fn apply_film_curve(code: f32, params: &FilmCurveParams) -> f32 {
    apply_film_curve_float(code / 255.0, params) * 255.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(toe: f32, shoulder: f32) -> FilmCurveParams {
        FilmCurveParams {
            gamma: 0.6,
            d_min: 0.1,
            d_max: 3.0,
            toe,
            shoulder,
        }
    }

    fn closed_form_power_curve(code: f32, p: &FilmCurveParams) -> f32 {
        let t = (code / 255.0).clamp(MIN_TRANSMITTANCE, 1.0);
        let density_norm = ((-t.log10() - p.d_min) / (p.d_max - p.d_min)).clamp(0.0, 1.0);
        let density = p.d_min + density_norm.powf(p.gamma) * (p.d_max - p.d_min);
        10.0_f32.powf(-density).clamp(0.0, 1.0) * 255.0
    }

    #[test]
    fn no_toe_or_shoulder_matches_power_curve() {
        let p = params(0.0, 0.0);
        let out = apply_film_curve(128.0, &p);
        assert!((out - closed_form_power_curve(128.0, &p)).abs() < 1e-4);
    }

    #[test]
    fn toe_only_alters_values_below_toe_boundary() {
        let plain = params(0.0, 0.0);
        let toed = params(0.5, 0.0);
        let boundary = toed.toe_boundary();
        let mut changed_below = 0;
        for code in 0..=255 {
            let code = code as f32;
            let a = apply_film_curve(code, &plain);
            let b = apply_film_curve(code, &toed);
            if normalized_density(code / 255.0, &toed) >= boundary {
                assert_eq!(a, b, "code {} above toe boundary changed", code);
            } else if (a - b).abs() > 1e-6 {
                changed_below += 1;
            }
        }
        assert!(changed_below > 0);
    }

    #[test]
    fn output_stays_in_code_range() {
        let p = params(0.8, 0.8);
        for code in 0..=255 {
            let out = apply_film_curve(code as f32, &p);
            assert!((0.0..=255.0).contains(&out), "code {} -> {}", code, out);
        }
        assert!(apply_film_curve(-20.0, &p) <= 255.0);
        assert!(apply_film_curve(900.0, &p) >= 0.0);
    }

    #[test]
    fn shaped_density_is_continuous_across_zone_boundaries() {
        let p = params(0.6, 0.6);
        let mut prev = shape_density(0.0, &p);
        for i in 1..=2000 {
            let d = i as f32 / 2000.0;
            let v = shape_density(d, &p);
            assert!((v - prev).abs() < 0.02, "jump at {}: {} -> {}", d, prev, v);
            prev = v;
        }
    }

    #[test]
    fn per_channel_gamma_overrides_shared_gamma() {
        let curve = FilmCurve {
            channel_gamma: Some([0.5, 0.6, 0.7]),
            ..FilmCurve::default()
        };
        let channels = FilmCurveParams::per_channel(&curve);
        assert_eq!(channels.map(|c| c.gamma), [0.5, 0.6, 0.7]);
        assert!(channels.iter().all(|c| c.d_max == curve.d_max));
    }
}

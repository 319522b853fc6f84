//! Per-pixel orchestration of every stage in fixed order.
//!
//! [`PixelPipeline::prepare`] resolves a [`RenderParams`] into a read-only
//! [`Prepared`] value once per image. [`process_pixel`] and
//! [`process_pixel_float`] are then pure functions of a pixel and that value,
//! so rows can be fanned out across threads without locking.

use tracing::{debug, trace};

use crate::params::{DensityRange, Inversion, InversionMode, RenderParams};

use super::base::{self, BaseStage};
use super::curves::CurveTables;
use super::film_curve::{FilmCurveParams, apply_film_curve, apply_film_curve_float};
use super::hsl::HslStage;
use super::inversion;
use super::lut3d::{self, Lut3d};
use super::split_tone::SplitToneStage;
use super::tone::{self, TABLE_SIZE, ToneCurve};
use super::{from_code, sanitize, to_code, white_balance};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Emit a `trace!` event with the running value after every stage.
    pub trace_pixels: bool,
}

#[derive(Debug, Clone, Default)]
pub struct PixelPipeline {
    config: PipelineConfig,
}

#[derive(Debug, Clone)]
/// Everything the per-pixel paths read, resolved from one [`RenderParams`].
///
/// Built by [`PixelPipeline::prepare`]; never mutated afterwards. A new
/// parameter set needs a new `Prepared`.
pub struct Prepared {
    pub params: RenderParams,
    /// Present when inversion and the film curve are both enabled.
    pub film: Option<[FilmCurveParams; 3]>,
    pub base: BaseStage,
    /// Present when density levels are enabled in log base mode.
    pub levels: Option<[DensityRange; 3]>,
    pub inversion: Inversion,
    /// Both LUT slots baked into one table at intensity 1.0.
    pub lut: Option<Lut3d>,
    pub wb_gains: [f32; 3],
    pub tone: ToneCurve,
    pub tone_table: [f32; TABLE_SIZE],
    pub highlight_rolloff: bool,
    pub curves: CurveTables,
    pub hsl: HslStage,
    pub split_tone: SplitToneStage,
    pub trace_pixels: bool,
}

impl PixelPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn prepare(&self, params: &RenderParams) -> Prepared {
        let film = (params.inversion.enabled && params.film_curve.enabled)
            .then(|| FilmCurveParams::per_channel(&params.film_curve));
        let levels = base::levels_active(&params.density_levels, &params.base_correction)
            .then(|| params.density_levels.channels());
        let lut = lut3d::build_combined_lut(
            lut3d::validated("lut1", params.lut3d.lut1.as_ref()),
            lut3d::validated("lut2", params.lut3d.lut2.as_ref()),
        );
        let tone = ToneCurve::from_params(&params.tone);

        let prepared = Prepared {
            params: params.clone(),
            film,
            base: BaseStage::from_params(&params.base_correction),
            levels,
            inversion: params.inversion.clone(),
            lut,
            wb_gains: white_balance::compute_gains(&params.white_balance),
            tone,
            tone_table: tone.build_table(),
            highlight_rolloff: params.tone.highlight_rolloff,
            curves: CurveTables::from_params(&params.curves),
            hsl: HslStage::from_params(&params.hsl),
            split_tone: SplitToneStage::from_params(&params.split_tone),
            trace_pixels: self.config.trace_pixels,
        };
        debug!(
            film = prepared.film.is_some(),
            levels = prepared.levels.is_some(),
            inversion = prepared.inversion.enabled,
            lut = prepared.lut.as_ref().map(|l| l.size),
            tone = !prepared.tone.is_identity(),
            curves = !prepared.curves.is_identity(),
            hsl = !prepared.hsl.is_identity(),
            split_tone = !prepared.split_tone.is_identity(),
            "prepared pixel pipeline"
        );
        prepared
    }
}

impl Prepared {
    /// True when no stage before inversion can move a value off its code.
    fn pre_inversion_identity(&self) -> bool {
        self.film.is_none() && self.base.is_identity() && self.levels.is_none()
    }

    fn trace_stage(&self, stage: &str, rgb: [f32; 3]) {
        if self.trace_pixels {
            trace!(stage = %stage, r = rgb[0], g = rgb[1], b = rgb[2], "pixel stage");
        }
    }
}

/// Which table resolution the tone and curve stages read.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Precision {
    Code,
    Float,
}

/// Integer path: 8-bit in, 8-bit out.
pub fn process_pixel(rgb: [u8; 3], prepared: &Prepared) -> [u8; 3] {
    let mut v = rgb.map(from_code);

    if prepared.pre_inversion_identity() && prepared.inversion.enabled {
        // Still exactly on the code grid: invert the codes directly.
        let inverted = match prepared.inversion.mode {
            InversionMode::Linear => rgb.map(inversion::invert_linear),
            InversionMode::Log => rgb.map(inversion::invert_log),
        };
        v = inverted.map(from_code);
        prepared.trace_stage("inversion", v);
    } else {
        if let Some(film) = &prepared.film {
            v = [0, 1, 2].map(|c| apply_film_curve(v[c] * 255.0, &film[c]) / 255.0);
            v = sanitize(v);
            prepared.trace_stage("film_curve", v);
        }
        v = pre_inversion(v, prepared);
        v = invert(v, prepared);
    }

    let out = post_inversion(v, prepared, Precision::Code);
    out.map(to_code)
}

/// Float path: no 8-bit quantization between stages.
pub fn process_pixel_float(rgb: [f32; 3], prepared: &Prepared) -> [f32; 3] {
    let mut v = sanitize(rgb);
    if let Some(film) = &prepared.film {
        v = [0, 1, 2].map(|c| apply_film_curve_float(v[c], &film[c]));
        v = sanitize(v);
        prepared.trace_stage("film_curve", v);
    }
    v = pre_inversion(v, prepared);
    v = invert(v, prepared);
    post_inversion(v, prepared, Precision::Float)
}

fn pre_inversion(mut v: [f32; 3], prepared: &Prepared) -> [f32; 3] {
    if !prepared.base.is_identity() {
        v = sanitize(prepared.base.apply(v));
        prepared.trace_stage("base_correction", v);
    }
    if let Some(levels) = &prepared.levels {
        v = sanitize([0, 1, 2].map(|c| base::apply_density_levels(v[c], levels[c])));
        prepared.trace_stage("density_levels", v);
    }
    v
}

fn invert(v: [f32; 3], prepared: &Prepared) -> [f32; 3] {
    if !prepared.inversion.enabled {
        return v;
    }
    let out = sanitize(v.map(|c| inversion::apply(c, &prepared.inversion)));
    prepared.trace_stage("inversion", out);
    out
}

fn post_inversion(mut v: [f32; 3], prepared: &Prepared, precision: Precision) -> [f32; 3] {
    if let Some(lut) = &prepared.lut {
        v = sanitize(lut.apply(v.map(|c| c.clamp(0.0, 1.0))));
        prepared.trace_stage("lut3d", v);
    }

    v = sanitize(white_balance::apply(v, prepared.wb_gains));
    prepared.trace_stage("white_balance", v);

    if !prepared.tone.is_identity() {
        v = match precision {
            Precision::Code => v.map(|c| prepared.tone.apply_tabled(&prepared.tone_table, c)),
            Precision::Float => v.map(|c| prepared.tone.apply(c)),
        };
        v = sanitize(v);
        prepared.trace_stage("tone", v);
    }

    if prepared.highlight_rolloff {
        v = sanitize(tone::highlight_rolloff(v));
        prepared.trace_stage("highlight_rolloff", v);
    }

    if !prepared.curves.is_identity() {
        v = match precision {
            Precision::Code => prepared.curves.apply_coarse(v),
            Precision::Float => prepared.curves.apply_fine(v),
        };
        v = sanitize(v);
        prepared.trace_stage("curves", v);
    }

    if !prepared.hsl.is_identity() {
        v = sanitize(prepared.hsl.apply(v));
        prepared.trace_stage("hsl", v);
    }

    if !prepared.split_tone.is_identity() {
        v = sanitize(prepared.split_tone.apply(v));
        prepared.trace_stage("split_tone", v);
    }

    v.map(|c| c.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{BaseCorrectionMode, ControlPoint, HslChannel};

    fn prepare(params: &RenderParams) -> Prepared {
        PixelPipeline::new(PipelineConfig::default()).prepare(params)
    }

    fn sample_pixels() -> Vec<[u8; 3]> {
        let steps = [0_u8, 1, 17, 64, 100, 128, 180, 222, 254, 255];
        let mut pixels = Vec::new();
        for r in steps {
            for g in steps {
                for b in steps {
                    pixels.push([r, g, b]);
                }
            }
        }
        pixels
    }

    fn assert_int_float_agree(params: &RenderParams, max_steps: i16) {
        let prepared = prepare(params);
        for px in sample_pixels() {
            let int = process_pixel(px, &prepared);
            let float = process_pixel_float(px.map(from_code), &prepared).map(to_code);
            for c in 0..3 {
                let diff = (int[c] as i16 - float[c] as i16).abs();
                assert!(
                    diff <= max_steps,
                    "pixel {:?}: int={:?} float={:?}",
                    px,
                    int,
                    float
                );
            }
        }
    }

    #[test]
    fn default_params_are_identity_on_both_paths() {
        let prepared = prepare(&RenderParams::default());
        for px in sample_pixels() {
            assert_eq!(process_pixel(px, &prepared), px);
            let f = px.map(from_code);
            assert_eq!(process_pixel_float(f, &prepared), f);
        }
    }

    #[test]
    fn linear_inversion_flips_codes() {
        let mut params = RenderParams::default();
        params.inversion.enabled = true;
        let prepared = prepare(&params);
        assert_eq!(process_pixel([0, 100, 255], &prepared), [255, 155, 0]);
        let out = process_pixel_float([0.0, 0.25, 1.0], &prepared);
        assert_eq!(out, [1.0, 0.75, 0.0]);
    }

    #[test]
    fn log_inversion_matches_between_paths() {
        let mut params = RenderParams::default();
        params.inversion.enabled = true;
        params.inversion.mode = InversionMode::Log;
        assert_int_float_agree(&params, 0);
    }

    #[test]
    fn film_and_base_paths_agree() {
        let mut params = RenderParams::default();
        params.inversion.enabled = true;
        params.film_curve.enabled = true;
        params.film_curve.toe = 0.5;
        params.film_curve.shoulder = 0.4;
        params.base_correction.mode = BaseCorrectionMode::Log;
        params.base_correction.densities = [0.2, 0.35, 0.5];
        params.density_levels.enabled = true;
        assert_int_float_agree(&params, 1);
    }

    #[test]
    fn graded_params_agree_within_one_code() {
        let mut params = RenderParams::default();
        params.white_balance.temp = 15.0;
        params.tone.exposure = 10.0;
        params.tone.contrast = 15.0;
        params.tone.shadows = 20.0;
        params.tone.highlights = -15.0;
        params.curves.rgb = vec![
            ControlPoint::new(0.0, 0.0),
            ControlPoint::new(90.0, 80.0),
            ControlPoint::new(180.0, 195.0),
            ControlPoint::new(255.0, 255.0),
        ];
        params.hsl.orange = HslChannel {
            hue: 5.0,
            saturation: 20.0,
            luminance: 10.0,
        };
        params.split_tone.shadow_saturation = 20.0;
        params.split_tone.highlight_saturation = 15.0;
        assert_int_float_agree(&params, 1);
    }

    #[test]
    fn gains_above_one_keep_paths_together_through_tone() {
        let dense: Vec<u8> = (0..=255).step_by(5).collect();
        let mut params = RenderParams::default();
        params.inversion.enabled = true;
        params.white_balance.red = 1.4;
        params.white_balance.temp = 60.0;
        params.tone.exposure = -30.0;
        params.tone.contrast = 10.0;
        let prepared = prepare(&params);
        assert!(prepared.wb_gains[0] > 1.0);
        for r in dense.iter().copied() {
            for g in dense.iter().copied() {
                for b in [0_u8, 64, 128, 230, 255] {
                    let px = [r, g, b];
                    let int = process_pixel(px, &prepared);
                    let float = process_pixel_float(px.map(from_code), &prepared).map(to_code);
                    for c in 0..3 {
                        let diff = (int[c] as i16 - float[c] as i16).abs();
                        assert!(diff <= 1, "pixel {:?}: int={:?} float={:?}", px, int, float);
                    }
                }
            }
        }
        // Inverted black with a red gain stays red-tinted on the integer path.
        let out = process_pixel([0, 0, 0], &prepared);
        assert!(out[0] > out[1]);
    }

    #[test]
    fn non_finite_float_input_yields_finite_output() {
        let mut params = RenderParams::default();
        params.inversion.enabled = true;
        params.inversion.mode = InversionMode::Log;
        params.film_curve.enabled = true;
        params.tone.contrast = 40.0;
        params.hsl.red.saturation = 50.0;
        let prepared = prepare(&params);
        for input in [
            [f32::NAN, 0.5, 0.5],
            [f32::INFINITY, f32::NEG_INFINITY, 0.2],
            [-3.0, 7.0, 0.5],
        ] {
            let out = process_pixel_float(input, &prepared);
            assert!(out.iter().all(|v| v.is_finite() && (0.0..=1.0).contains(v)));
        }
    }

    #[test]
    fn film_curve_needs_inversion() {
        let mut params = RenderParams::default();
        params.film_curve.enabled = true;
        assert!(prepare(&params).film.is_none());
        params.inversion.enabled = true;
        assert!(prepare(&params).film.is_some());
    }

    #[test]
    fn invalid_lut_is_treated_as_absent() {
        let mut params = RenderParams::default();
        params.lut3d.lut1 = Some(Lut3d {
            size: 4,
            data: vec![0.5; 10],
            intensity: 1.0,
        });
        let prepared = prepare(&params);
        assert!(prepared.lut.is_none());
        assert_eq!(process_pixel([12, 34, 56], &prepared), [12, 34, 56]);
    }

    #[test]
    fn full_strength_lut_runs_after_inversion() {
        let mut params = RenderParams::default();
        params.inversion.enabled = true;
        let mut lut = Lut3d::identity(3);
        for px in lut.data.chunks_exact_mut(3) {
            px.swap(0, 2);
        }
        params.lut3d.lut1 = Some(lut);
        let prepared = prepare(&params);
        // Inverted [255, 128, 0] is [0, 127, 255]; the LUT swaps red and blue.
        assert_eq!(process_pixel([255, 128, 0], &prepared), [255, 127, 0]);
    }

    #[test]
    fn prepared_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Prepared>();
    }
}

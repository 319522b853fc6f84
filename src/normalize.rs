//! Turns arbitrary, possibly partial configuration into a complete
//! [`RenderParams`].
//!
//! Never fails: unknown fields are ignored, wrong types and non-finite
//! numbers fall back to the field default, out-of-range values are clamped,
//! and unknown enum strings resolve to the first (linear) variant. Keys are
//! accepted in both camelCase and snake_case.

use serde_json::Value;

use crate::params::{
    BaseCorrection, BaseCorrectionMode, ControlPoint, Curves, DensityLevels, DensityRange,
    FilmCurve, HslChannel, HslParams, Inversion, InversionMode, LutSlots, RenderParams, SplitTone,
    Tone, WhiteBalance,
};
use crate::processing::lut3d::Lut3d;
use crate::processing::spline::sanitize_points;
use crate::profiles::{DEFAULT_PROFILE_KEY, FilmProfiles};

const GAMMA_RANGE: (f32, f32) = (0.05, 5.0);
const DENSITY_RANGE: (f32, f32) = (0.0, 6.0);
const MIN_DENSITY_SPAN: f32 = 0.01;
const BASE_GAIN_RANGE: (f32, f32) = (0.05, 20.0);
const WB_BASE_RANGE: (f32, f32) = (0.05, 50.0);
const SLIDER_RANGE: (f32, f32) = (-100.0, 100.0);
const EXPOSURE_RANGE: (f32, f32) = (-250.0, 250.0);
const HUE_SHIFT_RANGE: (f32, f32) = (-180.0, 180.0);

const HSL_KEYS: [&str; 8] = [
    "red", "orange", "yellow", "green", "cyan", "blue", "purple", "magenta",
];

/// Normalizes against the builtin film profile table.
pub fn normalize(input: &Value) -> RenderParams {
    normalize_with(input, &FilmProfiles::builtin())
}

/// Normalizes, resolving `filmCurve.profileKey` against `profiles`.
pub fn normalize_with(input: &Value, profiles: &FilmProfiles) -> RenderParams {
    RenderParams {
        inversion: inversion(input),
        film_curve: film_curve(section(input, &["filmCurve", "film_curve"]), profiles),
        base_correction: base_correction(section(input, &["baseCorrection", "base_correction"])),
        density_levels: density_levels(section(input, &["densityLevels", "density_levels"])),
        white_balance: white_balance(section(input, &["whiteBalance", "white_balance"])),
        tone: tone(section(input, &["tone"])),
        curves: curves(section(input, &["curves"])),
        hsl: hsl(section(input, &["hsl"])),
        split_tone: split_tone(section(input, &["splitTone", "split_tone"])),
        lut3d: luts(section(input, &["lut3d", "luts"])),
    }
}

fn inversion(input: &Value) -> Inversion {
    let block = section(input, &["inversion"]);
    let defaults = Inversion::default();
    // A bare top-level `inverted` flag is accepted as shorthand.
    let shorthand = flag(Some(input), &["inverted"]);
    Inversion {
        enabled: flag(block, &["enabled"])
            .or(shorthand)
            .unwrap_or(defaults.enabled),
        mode: match text(block, &["mode"]) {
            Some(mode) if mode.eq_ignore_ascii_case("log") => InversionMode::Log,
            _ => InversionMode::Linear,
        },
    }
}

fn film_curve(block: Option<&Value>, profiles: &FilmProfiles) -> FilmCurve {
    let defaults = FilmCurve::default();
    let key = text(block, &["profileKey", "profile_key", "profile"])
        .filter(|key| profiles.get(key).is_some())
        .unwrap_or(DEFAULT_PROFILE_KEY);
    let profile = profiles.resolve(key);

    let d_min = clamp_pair(
        number(block, &["dMin", "d_min"]).unwrap_or(profile.d_min),
        DENSITY_RANGE,
    );
    let d_max = number(block, &["dMax", "d_max"])
        .unwrap_or(profile.d_max)
        .clamp(d_min + MIN_DENSITY_SPAN, DENSITY_RANGE.1 + MIN_DENSITY_SPAN);

    let explicit_gamma = lookup(block, &["channelGamma", "channel_gamma", "gammaRGB"]);
    let channel_gamma = number_triple(explicit_gamma)
        .or_else(|| rgb_object(explicit_gamma))
        .map(|g| g.map(|v| clamp_pair(v, GAMMA_RANGE)))
        .or(profile.channel_gamma);

    FilmCurve {
        enabled: flag(block, &["enabled"]).unwrap_or(defaults.enabled),
        profile_key: key.to_string(),
        gamma: clamp_pair(number(block, &["gamma"]).unwrap_or(profile.gamma), GAMMA_RANGE),
        d_min,
        d_max,
        toe: number(block, &["toe"]).unwrap_or(profile.toe).clamp(0.0, 1.0),
        shoulder: number(block, &["shoulder"])
            .unwrap_or(profile.shoulder)
            .clamp(0.0, 1.0),
        channel_gamma,
    }
}

fn base_correction(block: Option<&Value>) -> BaseCorrection {
    let defaults = BaseCorrection::default();
    let mode = match text(block, &["mode"]) {
        Some(mode) if mode.eq_ignore_ascii_case("log") => BaseCorrectionMode::Log,
        _ => BaseCorrectionMode::Linear,
    };
    let gains = channel_values(block, &["gains"], &["red", "green", "blue"], defaults.gains)
        .map(|g| clamp_pair(g, BASE_GAIN_RANGE));
    let densities = channel_values(
        block,
        &["densities"],
        &["densityR", "densityG", "densityB"],
        defaults.densities,
    )
    .map(|d| clamp_pair(d, DENSITY_RANGE));
    BaseCorrection {
        mode,
        gains,
        densities,
    }
}

fn density_levels(block: Option<&Value>) -> DensityLevels {
    let defaults = DensityLevels::default();
    let range = |keys: &[&str], fallback: DensityRange| -> DensityRange {
        let channel = lookup(block, keys);
        let min = clamp_pair(
            number(channel, &["min"]).unwrap_or(fallback.min),
            DENSITY_RANGE,
        );
        let max = number(channel, &["max"])
            .unwrap_or(fallback.max)
            .clamp(min + MIN_DENSITY_SPAN, DENSITY_RANGE.1 + MIN_DENSITY_SPAN);
        DensityRange { min, max }
    };
    DensityLevels {
        enabled: flag(block, &["enabled"]).unwrap_or(defaults.enabled),
        red: range(&["red", "r"], defaults.red),
        green: range(&["green", "g"], defaults.green),
        blue: range(&["blue", "b"], defaults.blue),
    }
}

fn white_balance(block: Option<&Value>) -> WhiteBalance {
    let defaults = WhiteBalance::default();
    WhiteBalance {
        red: clamp_pair(number(block, &["red"]).unwrap_or(defaults.red), WB_BASE_RANGE),
        green: clamp_pair(
            number(block, &["green"]).unwrap_or(defaults.green),
            WB_BASE_RANGE,
        ),
        blue: clamp_pair(
            number(block, &["blue"]).unwrap_or(defaults.blue),
            WB_BASE_RANGE,
        ),
        temp: slider(block, &["temp", "temperature"], defaults.temp),
        tint: slider(block, &["tint"], defaults.tint),
    }
}

fn tone(block: Option<&Value>) -> Tone {
    let defaults = Tone::default();
    Tone {
        exposure: clamp_pair(
            number(block, &["exposure"]).unwrap_or(defaults.exposure),
            EXPOSURE_RANGE,
        ),
        contrast: slider(block, &["contrast"], defaults.contrast),
        highlights: slider(block, &["highlights"], defaults.highlights),
        shadows: slider(block, &["shadows"], defaults.shadows),
        whites: slider(block, &["whites"], defaults.whites),
        blacks: slider(block, &["blacks"], defaults.blacks),
        highlight_rolloff: flag(block, &["highlightRolloff", "highlight_rolloff"])
            .unwrap_or(defaults.highlight_rolloff),
    }
}

fn curves(block: Option<&Value>) -> Curves {
    let defaults = Curves::default();
    Curves {
        rgb: points(lookup(block, &["rgb"])),
        red: points(lookup(block, &["red", "r"])),
        green: points(lookup(block, &["green", "g"])),
        blue: points(lookup(block, &["blue", "b"])),
        monotone: flag(block, &["monotone"]).unwrap_or(defaults.monotone),
    }
}

fn points(list: Option<&Value>) -> Vec<ControlPoint> {
    let Some(Value::Array(items)) = list else {
        return Vec::new();
    };
    let raw: Vec<ControlPoint> = items
        .iter()
        .filter_map(|item| match item {
            Value::Array(pair) if pair.len() == 2 => Some(ControlPoint::new(
                as_number(&pair[0])?,
                as_number(&pair[1])?,
            )),
            Value::Object(_) => Some(ControlPoint::new(
                number(Some(item), &["x"])?,
                number(Some(item), &["y"])?,
            )),
            _ => None,
        })
        .collect();
    sanitize_points(&raw)
        .into_iter()
        .map(|(x, y)| ControlPoint::new(x as f32, y as f32))
        .collect()
}

fn hsl(block: Option<&Value>) -> HslParams {
    let mut params = HslParams::default();
    for (index, key) in HSL_KEYS.iter().enumerate() {
        let channel = lookup(block, &[key]);
        if let Some(slot) = params.channel_mut(index) {
            *slot = HslChannel {
                hue: clamp_pair(
                    number(channel, &["hue", "h"]).unwrap_or(0.0),
                    HUE_SHIFT_RANGE,
                ),
                saturation: slider(channel, &["saturation", "sat", "s"], 0.0),
                luminance: slider(channel, &["luminance", "lightness", "lum", "l"], 0.0),
            };
        }
    }
    params
}

fn split_tone(block: Option<&Value>) -> SplitTone {
    let defaults = SplitTone::default();
    let hue = |keys: &[&str], fallback: f32| {
        number(block, keys).unwrap_or(fallback).rem_euclid(360.0)
    };
    let saturation = |keys: &[&str]| number(block, keys).unwrap_or(0.0).clamp(0.0, 100.0);
    SplitTone {
        shadow_hue: hue(&["shadowHue", "shadow_hue"], defaults.shadow_hue),
        shadow_saturation: saturation(&["shadowSaturation", "shadow_saturation"]),
        midtone_hue: hue(&["midtoneHue", "midtone_hue"], defaults.midtone_hue),
        midtone_saturation: saturation(&["midtoneSaturation", "midtone_saturation"]),
        highlight_hue: hue(&["highlightHue", "highlight_hue"], defaults.highlight_hue),
        highlight_saturation: saturation(&["highlightSaturation", "highlight_saturation"]),
        balance: slider(block, &["balance"], defaults.balance),
    }
}

fn luts(block: Option<&Value>) -> LutSlots {
    LutSlots {
        lut1: lut(lookup(block, &["lut1", "primary"])),
        lut2: lut(lookup(block, &["lut2", "secondary"])),
    }
}

/// Copies the LUT payload as-is; size/length consistency is checked at prepare time.
fn lut(block: Option<&Value>) -> Option<Lut3d> {
    let block = block.filter(|v| v.is_object())?;
    let size = lookup(Some(block), &["size"])
        .and_then(Value::as_u64)
        .and_then(|s| usize::try_from(s).ok())?;
    let data = match lookup(Some(block), &["data"]) {
        Some(Value::Array(items)) => items.iter().filter_map(as_number).collect(),
        _ => Vec::new(),
    };
    Some(Lut3d {
        size,
        data,
        intensity: number(Some(block), &["intensity"])
            .unwrap_or(1.0)
            .clamp(0.0, 1.0),
    })
}

fn section<'a>(input: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    lookup(Some(input), keys).filter(|v| v.is_object())
}

fn lookup<'a>(block: Option<&'a Value>, keys: &[&str]) -> Option<&'a Value> {
    let object = block?.as_object()?;
    keys.iter()
        .find_map(|key| object.get(*key))
        .filter(|v| !v.is_null())
}

fn as_number(value: &Value) -> Option<f32> {
    let v = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    let v = v as f32;
    v.is_finite().then_some(v)
}

fn number(block: Option<&Value>, keys: &[&str]) -> Option<f32> {
    lookup(block, keys).and_then(as_number)
}

fn flag(block: Option<&Value>, keys: &[&str]) -> Option<bool> {
    match lookup(block, keys)? {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|v| v != 0.0),
        _ => None,
    }
}

fn text<'a>(block: Option<&'a Value>, keys: &[&str]) -> Option<&'a str> {
    lookup(block, keys).and_then(Value::as_str)
}

fn slider(block: Option<&Value>, keys: &[&str], fallback: f32) -> f32 {
    clamp_pair(number(block, keys).unwrap_or(fallback), SLIDER_RANGE)
}

fn clamp_pair(value: f32, (lo, hi): (f32, f32)) -> f32 {
    value.clamp(lo, hi)
}

fn number_triple(list: Option<&Value>) -> Option<[f32; 3]> {
    let Some(Value::Array(items)) = list else {
        return None;
    };
    if items.len() != 3 {
        return None;
    }
    Some([
        as_number(&items[0])?,
        as_number(&items[1])?,
        as_number(&items[2])?,
    ])
}

fn rgb_object(block: Option<&Value>) -> Option<[f32; 3]> {
    Some([
        number(block, &["red", "r"])?,
        number(block, &["green", "g"])?,
        number(block, &["blue", "b"])?,
    ])
}

/// Reads a per-channel triple either as an array under `array_keys` or as
/// three scalar fields; each channel falls back individually.
fn channel_values(
    block: Option<&Value>,
    array_keys: &[&str],
    scalar_keys: &[&str; 3],
    fallback: [f32; 3],
) -> [f32; 3] {
    if let Some(values) = number_triple(lookup(block, array_keys)) {
        return values;
    }
    if let Some(values) = rgb_object(lookup(block, array_keys)) {
        return values;
    }
    [0, 1, 2].map(|c| number(block, &[scalar_keys[c]]).unwrap_or(fallback[c]))
}

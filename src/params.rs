use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::processing::lut3d::Lut3d;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Negative-to-positive inversion curve.
pub enum InversionMode {
    #[default]
    Linear,
    Log,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Domain in which the film-base cast is removed.
pub enum BaseCorrectionMode {
    #[default]
    Linear,
    Log,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Inversion {
    pub enabled: bool,
    pub mode: InversionMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
/// H&D response parameters. `channel_gamma` overrides `gamma` per channel.
pub struct FilmCurve {
    pub enabled: bool,
    pub profile_key: String,
    pub gamma: f32,
    pub d_min: f32,
    pub d_max: f32,
    pub toe: f32,
    pub shoulder: f32,
    pub channel_gamma: Option<[f32; 3]>,
}

impl Default for FilmCurve {
    fn default() -> Self {
        Self {
            enabled: false,
            profile_key: "default".to_string(),
            gamma: 0.6,
            d_min: 0.1,
            d_max: 3.0,
            toe: 0.0,
            shoulder: 0.0,
            channel_gamma: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaseCorrection {
    pub mode: BaseCorrectionMode,
    /// Linear-mode per-channel multipliers.
    pub gains: [f32; 3],
    /// Log-mode per-channel film-base densities.
    pub densities: [f32; 3],
}

impl Default for BaseCorrection {
    fn default() -> Self {
        Self {
            mode: BaseCorrectionMode::Linear,
            gains: [1.0; 3],
            densities: [0.0; 3],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DensityRange {
    pub min: f32,
    pub max: f32,
}

impl Default for DensityRange {
    fn default() -> Self {
        Self { min: 0.0, max: 3.0 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
/// Per-channel density auto-stretch, only honored in log base-correction mode.
pub struct DensityLevels {
    pub enabled: bool,
    pub red: DensityRange,
    pub green: DensityRange,
    pub blue: DensityRange,
}

impl DensityLevels {
    pub fn channels(&self) -> [DensityRange; 3] {
        [self.red, self.green, self.blue]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WhiteBalance {
    pub red: f32,
    pub green: f32,
    pub blue: f32,
    pub temp: f32,
    pub tint: f32,
}

impl Default for WhiteBalance {
    fn default() -> Self {
        Self {
            red: 1.0,
            green: 1.0,
            blue: 1.0,
            temp: 0.0,
            tint: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Tone {
    pub exposure: f32,
    pub contrast: f32,
    pub highlights: f32,
    pub shadows: f32,
    pub whites: f32,
    pub blacks: f32,
    pub highlight_rolloff: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
/// Curve control point, both axes in 0..=255.
pub struct ControlPoint {
    pub x: f32,
    pub y: f32,
}

impl ControlPoint {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Curves {
    pub rgb: Vec<ControlPoint>,
    pub red: Vec<ControlPoint>,
    pub green: Vec<ControlPoint>,
    pub blue: Vec<ControlPoint>,
    /// Apply the Fritsch-Carlson clamp when solving each spline.
    pub monotone: bool,
}

impl Default for Curves {
    fn default() -> Self {
        Self {
            rgb: Vec::new(),
            red: Vec::new(),
            green: Vec::new(),
            blue: Vec::new(),
            monotone: true,
        }
    }
}

impl Curves {
    /// Channels in table order: rgb, red, green, blue.
    pub fn channels(&self) -> [&[ControlPoint]; 4] {
        [&self.rgb, &self.red, &self.green, &self.blue]
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
/// Per-hue adjustment: hue shift in degrees, saturation and luminance in -100..=100.
pub struct HslChannel {
    pub hue: f32,
    pub saturation: f32,
    pub luminance: f32,
}

impl HslChannel {
    pub fn is_neutral(&self) -> bool {
        self.hue == 0.0 && self.saturation == 0.0 && self.luminance == 0.0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HslParams {
    pub red: HslChannel,
    pub orange: HslChannel,
    pub yellow: HslChannel,
    pub green: HslChannel,
    pub cyan: HslChannel,
    pub blue: HslChannel,
    pub purple: HslChannel,
    pub magenta: HslChannel,
}

impl HslParams {
    /// Channels in hue-wheel order, matching `processing::hsl::HUE_CHANNELS`.
    pub fn channels(&self) -> [HslChannel; 8] {
        [
            self.red,
            self.orange,
            self.yellow,
            self.green,
            self.cyan,
            self.blue,
            self.purple,
            self.magenta,
        ]
    }

    pub fn channel_mut(&mut self, index: usize) -> Option<&mut HslChannel> {
        match index {
            0 => Some(&mut self.red),
            1 => Some(&mut self.orange),
            2 => Some(&mut self.yellow),
            3 => Some(&mut self.green),
            4 => Some(&mut self.cyan),
            5 => Some(&mut self.blue),
            6 => Some(&mut self.purple),
            7 => Some(&mut self.magenta),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
/// Hues in degrees, saturations in 0..=100, balance in -100..=100.
pub struct SplitTone {
    pub shadow_hue: f32,
    pub shadow_saturation: f32,
    pub midtone_hue: f32,
    pub midtone_saturation: f32,
    pub highlight_hue: f32,
    pub highlight_saturation: f32,
    pub balance: f32,
}

impl Default for SplitTone {
    fn default() -> Self {
        Self {
            shadow_hue: 220.0,
            shadow_saturation: 0.0,
            midtone_hue: 40.0,
            midtone_saturation: 0.0,
            highlight_hue: 45.0,
            highlight_saturation: 0.0,
            balance: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LutSlots {
    pub lut1: Option<Lut3d>,
    pub lut2: Option<Lut3d>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
/// Complete, strongly typed render configuration for one image.
///
/// Build it with [`crate::normalize`] from partial input; every stage reads
/// this record and nothing else.
pub struct RenderParams {
    pub inversion: Inversion,
    pub film_curve: FilmCurve,
    pub base_correction: BaseCorrection,
    pub density_levels: DensityLevels,
    pub white_balance: WhiteBalance,
    pub tone: Tone,
    pub curves: Curves,
    pub hsl: HslParams,
    pub split_tone: SplitTone,
    pub lut3d: LutSlots,
}

impl RenderParams {
    /// Loads params from the image sidecar JSON, if present and parseable.
    ///
    /// The sidecar goes through the normalizer, so partial or older sidecars
    /// still produce a complete record.
    pub fn load(image_path: &Path) -> Option<Self> {
        let sidecar = sidecar_path(image_path);
        let json = std::fs::read_to_string(sidecar).ok()?;
        let value: serde_json::Value = serde_json::from_str(&json).ok()?;
        Some(crate::normalize(&value))
    }

    /// Saves the params to the image sidecar JSON.
    pub fn save(&self, image_path: &Path) -> anyhow::Result<()> {
        let sidecar = sidecar_path(image_path);
        if let Some(parent) = sidecar.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(sidecar, json)?;
        Ok(())
    }
}

pub fn sidecar_path(image_path: &Path) -> std::path::PathBuf {
    let dir = image_path.parent().unwrap_or(Path::new("."));
    let filename = image_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    dir.join(".edits").join(format!("{}.json", filename))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};

    #[test]
    fn sidecar_uses_edits_folder() {
        let p = sidecar_path(Path::new("/scans/roll_12/frame_07.tif"));
        assert_eq!(p, PathBuf::from("/scans/roll_12/.edits/frame_07.tif.json"));
    }

    #[test]
    fn serialized_params_use_camel_case_keys() {
        let json = serde_json::to_value(RenderParams::default()).expect("params serialize");
        assert!(json.get("filmCurve").is_some());
        assert!(json["filmCurve"].get("dMin").is_some());
        assert!(json["tone"].get("highlightRolloff").is_some());
        assert_eq!(json["inversion"]["mode"], "linear");
    }

    #[test]
    fn save_then_load_round_trips_through_normalizer() {
        let dir = std::env::temp_dir().join(format!("filmrender-params-{}", std::process::id()));
        let image = dir.join("frame.tif");
        let mut params = RenderParams::default();
        params.inversion.enabled = true;
        params.inversion.mode = InversionMode::Log;
        params.tone.exposure = 25.0;
        params.curves.rgb = vec![ControlPoint::new(0.0, 10.0), ControlPoint::new(255.0, 240.0)];

        params.save(&image).expect("sidecar save");
        let loaded = RenderParams::load(&image).expect("sidecar load");
        let _ = std::fs::remove_dir_all(&dir);

        assert_eq!(loaded, params);
    }
}

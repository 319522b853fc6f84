use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const DEFAULT_PROFILE_KEY: &str = "default";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Named, read-only H&D curve preset.
pub struct FilmCurveProfile {
    pub gamma: f32,
    pub d_min: f32,
    pub d_max: f32,
    #[serde(default)]
    pub toe: f32,
    #[serde(default)]
    pub shoulder: f32,
    #[serde(default)]
    pub channel_gamma: Option<[f32; 3]>,
}

impl FilmCurveProfile {
    const fn new(gamma: f32, d_min: f32, d_max: f32, toe: f32, shoulder: f32) -> Self {
        Self {
            gamma,
            d_min,
            d_max,
            toe,
            shoulder,
            channel_gamma: None,
        }
    }

    const fn with_channel_gamma(mut self, gamma: [f32; 3]) -> Self {
        self.channel_gamma = Some(gamma);
        self
    }
}

const BUILTIN: &[(&str, FilmCurveProfile)] = &[
    (
        DEFAULT_PROFILE_KEY,
        FilmCurveProfile::new(0.6, 0.1, 3.0, 0.0, 0.0),
    ),
    (
        "portra_400",
        FilmCurveProfile::new(0.55, 0.15, 2.8, 0.35, 0.25).with_channel_gamma([0.56, 0.55, 0.52]),
    ),
    (
        "ektar_100",
        FilmCurveProfile::new(0.68, 0.12, 3.1, 0.2, 0.15).with_channel_gamma([0.70, 0.68, 0.64]),
    ),
    (
        "fuji_400h",
        FilmCurveProfile::new(0.58, 0.14, 2.9, 0.3, 0.3).with_channel_gamma([0.57, 0.59, 0.56]),
    ),
    (
        "gold_200",
        FilmCurveProfile::new(0.62, 0.16, 2.9, 0.25, 0.2).with_channel_gamma([0.64, 0.62, 0.58]),
    ),
    ("tri_x_400", FilmCurveProfile::new(0.7, 0.2, 2.6, 0.4, 0.2)),
    ("hp5_plus", FilmCurveProfile::new(0.65, 0.18, 2.7, 0.45, 0.25)),
];

#[derive(Debug, Clone, PartialEq)]
/// Film profile lookup table: builtin presets with user entries layered on top.
pub struct FilmProfiles {
    entries: BTreeMap<String, FilmCurveProfile>,
}

impl Default for FilmProfiles {
    fn default() -> Self {
        Self::builtin()
    }
}

impl FilmProfiles {
    pub fn builtin() -> Self {
        Self {
            entries: BUILTIN
                .iter()
                .map(|(key, profile)| (key.to_string(), *profile))
                .collect(),
        }
    }

    /// Merges custom profiles; a custom key replaces the builtin of the same name.
    pub fn with_custom(mut self, custom: &BTreeMap<String, FilmCurveProfile>) -> Self {
        for (key, profile) in custom {
            self.entries.insert(key.clone(), *profile);
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&FilmCurveProfile> {
        self.entries.get(key)
    }

    /// Returns the profile for `key`, or the default profile when unknown.
    pub fn resolve(&self, key: &str) -> FilmCurveProfile {
        self.get(key)
            .or_else(|| self.get(DEFAULT_PROFILE_KEY))
            .copied()
            .unwrap_or(BUILTIN[0].1)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_table_contains_default() {
        let profiles = FilmProfiles::builtin();
        let default = profiles.get(DEFAULT_PROFILE_KEY).expect("default profile");
        assert_eq!(default.gamma, 0.6);
        assert_eq!(default.d_min, 0.1);
        assert_eq!(default.d_max, 3.0);
        assert!(profiles.keys().any(|k| k == "portra_400"));
    }

    #[test]
    fn unknown_key_resolves_to_default() {
        let profiles = FilmProfiles::builtin();
        assert_eq!(
            profiles.resolve("no_such_stock"),
            profiles.resolve(DEFAULT_PROFILE_KEY)
        );
    }

    #[test]
    fn custom_entries_override_builtin_keys() {
        let mut custom = BTreeMap::new();
        custom.insert(
            "portra_400".to_string(),
            FilmCurveProfile::new(0.9, 0.2, 2.0, 0.0, 0.0),
        );
        custom.insert(
            "lab_special".to_string(),
            FilmCurveProfile::new(0.5, 0.1, 2.5, 0.1, 0.1),
        );
        let builtin = FilmProfiles::builtin();
        let merged = FilmProfiles::builtin().with_custom(&custom);

        assert_eq!(merged.resolve("portra_400").gamma, 0.9);
        assert_eq!(merged.resolve("lab_special").d_max, 2.5);
        assert_eq!(merged.resolve("ektar_100"), builtin.resolve("ektar_100"));
        assert!(builtin.get("lab_special").is_none());
    }
}

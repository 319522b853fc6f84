use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::processing::pipeline::PipelineConfig;
use crate::profiles::{FilmCurveProfile, FilmProfiles};

pub const BACKEND_ENV: &str = "FILMRENDER_BACKEND";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Which execution path renders whole images.
pub enum RenderBackend {
    Cpu,
    Gpu,
    /// GPU when an adapter is available, CPU float path otherwise.
    Auto,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
/// Per-user settings read from `config.toml`.
pub struct RenderConfig {
    pub backend: Option<String>,
    pub trace_pixels: Option<bool>,
    pub film_profiles: BTreeMap<String, FilmCurveProfile>,
}

impl RenderConfig {
    /// Returns the user config file path, if a config directory is available.
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("filmrender").join("config.toml"))
    }

    /// Loads config from disk, falling back to defaults on any error.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Self {
        let Ok(contents) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        match toml::from_str(&contents) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "ignoring unreadable config");
                Self::default()
            }
        }
    }

    /// Builtin film profiles merged with the user's custom entries.
    pub fn profiles(&self) -> FilmProfiles {
        FilmProfiles::builtin().with_custom(&self.film_profiles)
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            trace_pixels: self.trace_pixels.unwrap_or(false),
        }
    }

    /// Backend from the environment, then the config file, then `Auto`.
    pub fn backend(&self) -> RenderBackend {
        if let Ok(raw) = std::env::var(BACKEND_ENV) {
            return parse_backend(&raw);
        }
        if let Some(raw) = self.backend.as_deref() {
            return parse_backend(raw);
        }
        RenderBackend::Auto
    }
}

pub fn parse_backend(value: &str) -> RenderBackend {
    match value.trim().to_ascii_lowercase().as_str() {
        "cpu" | "float" | "scalar" => RenderBackend::Cpu,
        "gpu" | "wgpu" | "shader" => RenderBackend::Gpu,
        _ => RenderBackend::Auto,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_backend_handles_supported_values() {
        assert_eq!(parse_backend("cpu"), RenderBackend::Cpu);
        assert_eq!(parse_backend(" GPU "), RenderBackend::Gpu);
        assert_eq!(parse_backend("wgpu"), RenderBackend::Gpu);
        assert_eq!(parse_backend("auto"), RenderBackend::Auto);
    }

    #[test]
    fn parse_backend_defaults_to_auto_for_unknown_values() {
        assert_eq!(parse_backend("vulkan-please"), RenderBackend::Auto);
    }

    #[test]
    fn custom_profiles_parse_from_toml() {
        let config: RenderConfig = toml::from_str(
            r#"
            backend = "cpu"
            trace_pixels = true

            [film_profiles.house_c41]
            gamma = 0.58
            dMin = 0.2
            dMax = 2.7
            toe = 0.3
            "#,
        )
        .expect("config parses");

        assert_eq!(config.backend.as_deref(), Some("cpu"));
        assert!(config.pipeline_config().trace_pixels);
        let profile = config.profiles().resolve("house_c41");
        assert_eq!(profile.gamma, 0.58);
        assert_eq!(profile.shoulder, 0.0);
        assert!(config.profiles().get("portra_400").is_some());
    }

    #[test]
    fn unreadable_config_falls_back_to_default() {
        let path = std::env::temp_dir().join(format!("filmrender-bad-{}.toml", std::process::id()));
        std::fs::write(&path, "backend = [not toml").expect("write temp config");
        let config = RenderConfig::load_from(&path);
        let _ = std::fs::remove_file(&path);
        assert!(config.backend.is_none());
        assert!(config.film_profiles.is_empty());
    }
}

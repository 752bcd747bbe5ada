//! Viewer configuration (window, input, data). Loaded from config.ron at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Persistent viewer settings. Loaded from `config.ron` in the current
/// directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewerConfig {
    /// Window width in logical pixels.
    #[serde(default = "default_window_width")]
    pub window_width: u32,
    /// Window height in logical pixels.
    #[serde(default = "default_window_height")]
    pub window_height: u32,
    /// Mouse sensitivity multiplier (1.0 = default).
    #[serde(default = "default_sensitivity")]
    pub sensitivity: f32,
    /// Optional path to a city RON file; the demo city is used otherwise.
    #[serde(default)]
    pub city_file: Option<PathBuf>,
    /// World seed for every procedural derivation.
    #[serde(default)]
    pub seed: u64,
}

fn default_window_width() -> u32 {
    1280
}
fn default_window_height() -> u32 {
    720
}
fn default_sensitivity() -> f32 {
    1.0
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            window_width: default_window_width(),
            window_height: default_window_height(),
            sensitivity: default_sensitivity(),
            city_file: None,
            seed: 0,
        }
    }
}

impl ViewerConfig {
    /// Load config from `config.ron`. If the file is missing or invalid,
    /// returns the default config.
    pub fn load() -> Self {
        let path = config_path();
        if let Ok(data) = std::fs::read_to_string(&path) {
            match ron::from_str(&data) {
                Ok(c) => return c,
                Err(e) => log::warn!("Invalid config at {:?}: {}, using defaults", path, e),
            }
        }
        Self::default()
    }

    /// Save current config to `config.ron`. Logs on error.
    pub fn save(&self) {
        let path = config_path();
        if let Ok(s) = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default()) {
            if let Err(e) = std::fs::write(&path, s) {
                log::warn!("Could not write config to {:?}: {}", path, e);
            }
        }
    }

    pub fn city_path(&self) -> PathBuf {
        self.city_file
            .clone()
            .unwrap_or_else(|| Path::new("city.ron").to_path_buf())
    }
}

fn config_path() -> PathBuf {
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join("config.ron")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let config: ViewerConfig = ron::from_str("(window_width: 1920)").unwrap();
        assert_eq!(config.window_width, 1920);
        assert_eq!(config.window_height, 720);
        assert_eq!(config.sensitivity, 1.0);
        assert!(config.city_file.is_none());
        assert_eq!(config.seed, 0);
    }

    #[test]
    fn config_roundtrips() {
        let config = ViewerConfig {
            seed: 99,
            ..Default::default()
        };
        let text = ron::ser::to_string_pretty(&config, Default::default()).unwrap();
        let back: ViewerConfig = ron::from_str(&text).unwrap();
        assert_eq!(back.seed, 99);
    }
}

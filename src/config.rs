//! Configuration file support
//!
//! Thresholds and output switches can be kept in a TOML file:
//!
//! ```toml
//! [detection]
//! y_threshold = 25.0
//! min_aspect_ratio = 2.5
//!
//! [output]
//! visualize = false
//! font = "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf"
//! ```
//!
//! Lookup order: explicit `--config` path, then
//! `<config dir>/bellyband/config.toml`, then built-in defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::belly_band::BandDetectOptions;

/// Config file name under the platform config directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Application directory name under the platform config directory
pub const APP_DIR_NAME: &str = "bellyband";

/// Error type for configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: detection.{field} = {value} is not a finite number")]
    NonFinite { field: &'static str, value: f64 },
}

/// Report output switches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Write `<stem>_belly_band_viz.jpg` overlays
    pub visualize: bool,
    /// Write `<stem>_belly_band.txt` reports
    pub write_text_report: bool,
    /// TrueType/OpenType font for overlay labels; no label without one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            visualize: true,
            write_text_report: true,
            font: None,
        }
    }
}

/// Full application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub detection: BandDetectOptions,
    pub output: OutputConfig,
}

impl AppConfig {
    /// Default config file location, if the platform has a config directory
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load configuration
    ///
    /// An explicit path must exist. The default location is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound(path.to_path_buf()));
                }
                Self::from_file(path)
            }
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => Self::from_file(&path),
                None => Ok(Self::default()),
            },
        }
    }

    /// Read and parse a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::parse(&text)?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Parse TOML text; detection thresholds are clamped like the builder
    ///
    /// `nan` and `inf` thresholds are rejected rather than clamped.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(text)?;
        if let Some((field, value)) = config.detection.non_finite_field() {
            return Err(ConfigError::NonFinite { field, value });
        }
        config.detection = config.detection.clamped();
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_is_default() {
        let config = AppConfig::parse("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert!(config.output.visualize);
        assert!(config.output.write_text_report);
    }

    #[test]
    fn test_parse_partial() {
        let config = AppConfig::parse(
            r#"
            [detection]
            y_threshold = 25.0

            [output]
            visualize = false
            "#,
        )
        .unwrap();

        assert_eq!(config.detection.y_threshold, 25.0);
        assert_eq!(config.detection.min_aspect_ratio, 2.0);
        assert_eq!(config.detection.min_width_fraction, 0.3);
        assert!(!config.output.visualize);
        assert!(config.output.write_text_report);
    }

    #[test]
    fn test_parse_clamps_thresholds() {
        let config = AppConfig::parse(
            r#"
            [detection]
            min_width_fraction = 3.0
            "#,
        )
        .unwrap();
        assert_eq!(config.detection.min_width_fraction, 1.0);
    }

    #[test]
    fn test_parse_rejects_unknown_key() {
        let result = AppConfig::parse(
            r#"
            [detection]
            y_treshold = 25.0
            "#,
        );
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_parse_rejects_non_finite() {
        let nan = AppConfig::parse("[detection]\ny_threshold = nan\n");
        assert!(matches!(
            nan,
            Err(ConfigError::NonFinite {
                field: "y_threshold",
                ..
            })
        ));

        let inf = AppConfig::parse("[detection]\nmin_width_fraction = inf\n");
        assert!(matches!(
            inf,
            Err(ConfigError::NonFinite {
                field: "min_width_fraction",
                ..
            })
        ));
    }

    #[test]
    fn test_parse_font_path() {
        let config = AppConfig::parse("[output]\nfont = \"/fonts/label.ttf\"\n").unwrap();
        assert_eq!(config.output.font, Some(PathBuf::from("/fonts/label.ttf")));
        assert!(AppConfig::default().output.font.is_none());
    }

    #[test]
    fn test_load_explicit_missing() {
        let result = AppConfig::load(Some(Path::new("/nonexistent/bellyband.toml")));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bellyband.toml");
        std::fs::write(&path, "[detection]\nmin_aspect_ratio = 3.0\n").unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.detection.min_aspect_ratio, 3.0);
    }

    #[test]
    fn test_default_path_layout() {
        if let Some(path) = AppConfig::default_path() {
            assert!(path.ends_with("bellyband/config.toml"));
        }
    }
}

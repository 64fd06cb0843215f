//! Configuration management for the penguin predictor

use anyhow::{Context, Result};
use config::{Config, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Log output format
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub artifact: ArtifactConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Model artifact configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactConfig {
    /// Path to the serialized artifact bundle
    #[serde(default = "default_artifact_path")]
    pub path: PathBuf,
    /// Number of threads for ONNX inference (default: 1)
    #[serde(default = "default_onnx_threads")]
    pub onnx_threads: usize,
}

fn default_artifact_path() -> PathBuf {
    PathBuf::from("models/penguin_model.json")
}

fn default_onnx_threads() -> usize {
    1
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            path: default_artifact_path(),
            onnx_threads: default_onnx_threads(),
        }
    }
}

/// Terminal rendering configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DisplayConfig {
    /// Number of features shown in the importance chart
    #[serde(default = "default_top_features")]
    pub top_features: usize,
    /// Width of a full (100%) bar in characters
    #[serde(default = "default_bar_width")]
    pub bar_width: usize,
}

fn default_top_features() -> usize {
    5
}

fn default_bar_width() -> usize {
    40
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            top_features: default_top_features(),
            bar_width: default_bar_width(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (json, pretty)
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::Pretty,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default file, or defaults if it is absent
    pub fn load() -> Result<Self> {
        if Path::new(DEFAULT_CONFIG_PATH).exists() {
            Self::load_from_path(DEFAULT_CONFIG_PATH)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.artifact.path, PathBuf::from("models/penguin_model.json"));
        assert_eq!(config.artifact.onnx_threads, 1);
        assert_eq!(config.display.top_features, 5);
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[artifact]\npath = \"/srv/penguins/model.json\"\n\n[logging]\nformat = \"json\""
        )
        .unwrap();

        let config = AppConfig::load_from_path(file.path()).unwrap();
        assert_eq!(config.artifact.path, PathBuf::from("/srv/penguins/model.json"));
        assert_eq!(config.artifact.onnx_threads, 1);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.display.bar_width, 40);
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(AppConfig::load_from_path("/nonexistent/config.toml").is_err());
    }
}

//! Application configuration.
//!
//! `AppConfig` holds the operator's persistent defaults. The CLI layers its
//! flags on top and hands an immutable per-run value to the capture engine;
//! nothing here is mutated after startup.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Default capture settings.
    pub capture: CaptureDefaults,

    /// Encoder process settings.
    pub encoder: EncoderSettings,

    /// Renderer bridge process settings.
    pub bridge: BridgeSettings,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Default capture parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureDefaults {
    /// Frames per second.
    pub fps: u32,

    /// Output width in device pixels.
    pub width: u32,

    /// Output height in device pixels.
    pub height: u32,

    /// Page zoom (the device pixel ratio the scene should report).
    pub zoom: f64,

    /// Codec profile name.
    pub format: String,

    /// Prefix prepended to generated output file names.
    pub filename_prefix: String,

    /// Emit a progress report every N frames.
    pub progress_interval: u64,
}

/// External encoder settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderSettings {
    /// Encoder executable.
    pub program: String,

    /// Bytes the encoder input may buffer before writers are suspended.
    pub high_water_mark: usize,
}

/// Renderer bridge settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeSettings {
    /// Bridge executable.
    pub program: String,

    /// Arguments passed to the bridge executable.
    pub args: Vec<String>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "scenecast=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            capture: CaptureDefaults::default(),
            encoder: EncoderSettings::default(),
            bridge: BridgeSettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for CaptureDefaults {
    fn default() -> Self {
        Self {
            fps: 60,
            width: 3840,
            height: 2160,
            zoom: 1.0,
            format: "small".to_string(),
            filename_prefix: String::new(),
            progress_interval: 120,
        }
    }
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            program: "ffmpeg".to_string(),
            high_water_mark: 1024 * 1024,
        }
    }
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            program: "node".to_string(),
            args: vec!["bridge/puppeteer-bridge.mjs".to_string()],
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("scenecast").join("config.json")
}

//! Configuration loading
//!
//! Precedence follows CLI > environment > file > defaults. The CLI layer is
//! applied by the caller on top of what [`AppConfig::load`] returns.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::model::{OutputFormat, DEFAULT_WINDOW_SECONDS};
use crate::error::{VidTrimError, VidTrimResult};

/// Config file picked up from the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "vidtrim.toml";

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub trim: TrimConfig,
    pub output: OutputConfig,
    pub playback: PlaybackConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrimConfig {
    /// Upper bound of the window opened when a video loads
    pub default_window_secs: f64,
    /// Pause between playback start and recorder start
    pub record_start_delay_ms: u64,
}

impl Default for TrimConfig {
    fn default() -> Self {
        Self {
            default_window_secs: DEFAULT_WINDOW_SECONDS,
            record_start_delay_ms: 100,
        }
    }
}

impl TrimConfig {
    pub fn record_start_delay(&self) -> Duration {
        Duration::from_millis(self.record_start_delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub format: OutputFormat,
    /// Size of each recorder data chunk in bytes
    pub chunk_size: usize,
    /// Where downloads are written
    pub directory: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Webm,
            chunk_size: 64 * 1024,
            directory: PathBuf::from("."),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlaybackConfig {
    /// Playback speed multiplier
    pub rate: f64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self { rate: 1.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
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
    /// Defaults, then the config file, then `VIDTRIM_*` variables
    pub fn load(path: Option<&Path>) -> VidTrimResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => {
                debug!("No config file found, using defaults");
                Self::default()
            }
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> VidTrimResult<Self> {
        info!("Loading configuration from: {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> VidTrimResult<Self> {
        toml::from_str(content).map_err(|e| VidTrimError::ConfigError {
            message: format!("Failed to parse TOML config: {}", e),
        })
    }

    /// Override fields from environment-style lookups
    pub fn apply_env<F>(&mut self, lookup: F) -> VidTrimResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup("VIDTRIM_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("VIDTRIM_OUTPUT_FORMAT") {
            self.output.format = OutputFormat::parse(&format)?;
        }
        if let Some(delay) = lookup("VIDTRIM_RECORD_DELAY_MS") {
            self.trim.record_start_delay_ms = parse_env("VIDTRIM_RECORD_DELAY_MS", &delay)?;
        }
        if let Some(rate) = lookup("VIDTRIM_PLAYBACK_RATE") {
            self.playback.rate = parse_env("VIDTRIM_PLAYBACK_RATE", &rate)?;
        }
        if let Some(dir) = lookup("VIDTRIM_OUTPUT_DIR") {
            self.output.directory = PathBuf::from(dir);
        }
        Ok(())
    }

    pub fn validate(&self) -> VidTrimResult<()> {
        if !VALID_LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(config_error(format!(
                "Invalid log level: {}. Valid levels: {}",
                self.logging.level,
                VALID_LOG_LEVELS.join(", ")
            )));
        }
        if !(self.playback.rate.is_finite() && self.playback.rate > 0.0) {
            return Err(config_error(format!(
                "Playback rate must be positive, got {}",
                self.playback.rate
            )));
        }
        if self.output.chunk_size == 0 {
            return Err(config_error("Chunk size cannot be zero".to_string()));
        }
        if !(self.trim.default_window_secs.is_finite() && self.trim.default_window_secs >= 0.0) {
            return Err(config_error(format!(
                "Default window must be a non-negative number of seconds, got {}",
                self.trim.default_window_secs
            )));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> VidTrimResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| config_error(format!("Invalid value for {}: {}", key, value)))
}

fn config_error(message: String) -> VidTrimError {
    VidTrimError::ConfigError { message }
}

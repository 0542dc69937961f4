use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub erp: ErpConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Root of all locally persisted state: screenshots, credentials,
    /// and the control socket.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaptureConfig {
    /// How many of the newest captures the gallery shows.
    #[serde(default = "default_display_limit")]
    pub display_limit: usize,
    /// Target thumbnail width in pixels; height follows the aspect ratio.
    #[serde(default = "default_thumbnail_width")]
    pub thumbnail_width: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErpConfig {
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            display_limit: default_display_limit(),
            thumbnail_width: default_thumbnail_width(),
        }
    }
}

impl Default for ErpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            capture: CaptureConfig::default(),
            erp: ErpConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFile(path.display().to_string(), e))?;
        let config: Config =
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Ok(config)
    }

    /// Load the config file if present; a missing file means defaults.
    /// Every section is optional, so a partial file is also valid.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn screenshots_dir(&self) -> PathBuf {
        self.storage.data_dir.join("screenshots")
    }

    pub fn credentials_path(&self) -> PathBuf {
        self.storage.data_dir.join("credentials.json")
    }

    pub fn socket_path(&self) -> PathBuf {
        self.storage.data_dir.join("control.sock")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    ReadFile(String, std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(String),
}

// Default value functions
fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("shotclock")
}
fn default_display_limit() -> usize {
    3
}
fn default_thumbnail_width() -> u32 {
    600
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_request_timeout() -> u64 {
    30
}
fn default_log_level() -> String {
    "info".into()
}

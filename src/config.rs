//! Configuration system using TOML files.
//!
//! Config is stored in the OS-standard config directory:
//! - Windows: %APPDATA%\sora-fetch\config.toml
//! - macOS: ~/Library/Application Support/sora-fetch/config.toml
//! - Linux: ~/.config/sora-fetch/config.toml
//!
//! The config file is human-readable and editable. Every section has
//! defaults, so a file only needs the keys it wants to change.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::acquisition::size::MAX_ARTIFACT_BYTES;
use crate::acquisition::watermark::CropRegion;
use crate::error::{Error, ResultExt};

/// Browser-like agent; some upstreams reject unknown clients
const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 Chrome/131.0.0.0 Safari/537.36";

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// API credentials (keep separate for potential future encryption)
    pub credentials: CredentialsConfig,

    /// Upstream endpoints
    pub endpoints: EndpointsConfig,

    /// Network and subprocess timeouts
    pub timeouts: TimeoutsConfig,

    /// Overlay removal settings
    pub watermark: WatermarkConfig,

    /// Artifact limits
    pub limits: LimitsConfig,

    /// Retry policies
    pub retry: RetryConfig,

    /// Directory for temp files (default: system temp dir)
    pub temp_dir: Option<PathBuf>,
}

/// Credentials for the authenticated API source
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    /// Bearer token; without it the API source is skipped
    pub bearer_token: Option<String>,

    /// Raw `Cookie` header sent along with the token
    pub cookie_header: Option<String>,
}

/// Named base URLs of the upstream sources
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointsConfig {
    /// Relay prefix, the identifier is appended
    pub proxy_base: String,

    /// Post lookup prefix, the identifier is appended
    pub api_base: String,

    /// Web origin used for Referer/Origin headers
    pub web_origin: String,

    /// Static CDN prefix, `{id}.{cdn_extension}` is appended
    pub cdn_base: String,

    pub cdn_extension: String,

    pub user_agent: String,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            proxy_base: "https://api.soracdn.workers.dev/download-proxy?id=".to_string(),
            api_base: "https://sora.chatgpt.com/backend/project_y/post/".to_string(),
            web_origin: "https://sora.chatgpt.com".to_string(),
            cdn_base: "https://cdn.openai.com/MP4/".to_string(),
            cdn_extension: "mp4".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Timeouts in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutsConfig {
    pub proxy_secs: u64,
    pub api_secs: u64,
    /// Attachment download after a successful API lookup
    pub download_secs: u64,
    pub cdn_secs: u64,
    /// One ffmpeg run
    pub filter_secs: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            proxy_secs: 120,
            api_secs: 30,
            download_secs: 120,
            cdn_secs: 30,
            filter_secs: 120,
        }
    }
}

/// Overlay removal settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WatermarkConfig {
    /// Region to obscure
    #[serde(flatten)]
    pub region: CropRegion,

    /// Explicit ffmpeg binary (default: search PATH and common locations)
    pub ffmpeg_path: Option<PathBuf>,
}

/// Artifact limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Largest artifact we hand out, in bytes
    pub max_bytes: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_bytes: MAX_ARTIFACT_BYTES,
        }
    }
}

/// Retry settings for fetch and delivery
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub fetch_attempts: u32,
    pub fetch_delay_secs: u64,
    pub delivery_attempts: u32,
    pub delivery_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            fetch_attempts: 3,
            fetch_delay_secs: 2,
            delivery_attempts: 2,
            delivery_delay_secs: 3,
        }
    }
}

// ============================================================================
// Config File Operations
// ============================================================================

/// Get the config directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("sora-fetch"))
}

/// Get the full path to the config file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Load configuration from the default location
///
/// Returns default config if file doesn't exist or can't be parsed.
/// Logs warnings but doesn't fail - we always return a usable config.
pub fn load() -> Config {
    let Some(path) = config_path() else {
        tracing::warn!("Could not determine config directory, using defaults");
        return Config::default();
    };

    if !path.exists() {
        tracing::debug!("No config file found at {:?}, using defaults", path);
        return Config::default();
    }

    match load_from(&path) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e);
            tracing::warn!("Using default configuration");
            Config::default()
        }
    }
}

/// Load configuration from an explicit path, failing on any problem
pub fn load_from(path: &Path) -> crate::error::Result<Config> {
    let contents = std::fs::read_to_string(path)
        .with_context(format!("Failed to read config file {:?}", path))?;
    let config: Config = toml::from_str(&contents)
        .map_err(|e| Error::config(e.to_string()))
        .with_context(format!("Failed to parse config file {:?}", path))?;
    tracing::info!("Loaded config from {:?}", path);
    Ok(config)
}

/// Save configuration to `path`
///
/// Creates the parent directory if it doesn't exist.
pub fn save_to(config: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| ConfigError::CreateDir(dir.to_path_buf(), e))?;
    }

    // Serialize to pretty TOML
    let contents = toml::to_string_pretty(config).map_err(ConfigError::Serialize)?;

    // Write atomically (write to temp, then rename)
    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, &contents).map_err(|e| ConfigError::Write(temp_path.clone(), e))?;
    std::fs::rename(&temp_path, path)
        .map_err(|e| ConfigError::Rename(temp_path, path.to_path_buf(), e))?;

    tracing::info!("Saved config to {:?}", path);
    Ok(())
}

/// Save configuration to the default location
pub fn save(config: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path().ok_or(ConfigError::NoConfigDir)?;
    save_to(config, &path)?;
    Ok(path)
}

// ============================================================================
// Error Types
// ============================================================================

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to create config directory {0}: {1}")]
    CreateDir(PathBuf, std::io::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),

    #[error("Failed to write config to {0}: {1}")]
    Write(PathBuf, std::io::Error),

    #[error("Failed to rename temp file {0} to {1}: {2}")]
    Rename(PathBuf, PathBuf, std::io::Error),
}

// ============================================================================
// Tests
// ============================================================================

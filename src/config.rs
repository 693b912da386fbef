//! Pipeline configuration
//!
//! A single value object built once at startup and injected into the
//! gateway and facade. File-based (`~/.plantdoc/config.toml`) with an
//! environment override for the API key; no global state.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default OpenAI-compatible endpoint (Groq)
pub const DEFAULT_API_BASE: &str = "https://api.groq.com/openai/v1";
/// Default multimodal model for photo analysis
pub const DEFAULT_VISION_MODEL: &str = "llama-3.2-11b-vision-preview";
/// Default text model for moderation and care tips
pub const DEFAULT_TEXT_MODEL: &str = "llama-3.1-70b-versatile";
/// Environment variable that overrides the configured API key
pub const API_KEY_ENV: &str = "PLANTDOC_API_KEY";

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_QUALITY_THRESHOLD: f64 = 0.70;
const DEFAULT_MAX_RETRIES: u32 = 2;
const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 500;
const DEFAULT_MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub models: ModelsConfig,
    #[serde(default)]
    pub tuning: TuningConfig,
}

/// Remote endpoint and credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_base")]
    pub base_url: String,
    /// Bearer token; empty means unconfigured
    #[serde(default)]
    pub key: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    #[serde(default = "default_vision_model")]
    pub vision: String,
    #[serde(default = "default_text_model")]
    pub text: String,
}

/// Pipeline behavior knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TuningConfig {
    /// Quality gate acceptance threshold on the overall score
    #[serde(default = "default_quality_threshold")]
    pub quality_threshold: f64,
    /// Bounded retries around transient transport failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    /// Images larger than this are rejected before any remote call
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: usize,
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_vision_model() -> String {
    DEFAULT_VISION_MODEL.to_string()
}

fn default_text_model() -> String {
    DEFAULT_TEXT_MODEL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_quality_threshold() -> f64 {
    DEFAULT_QUALITY_THRESHOLD
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_retry_base_delay_ms() -> u64 {
    DEFAULT_RETRY_BASE_DELAY_MS
}

fn default_max_image_bytes() -> usize {
    DEFAULT_MAX_IMAGE_BYTES
}

impl PipelineConfig {
    /// Load configuration from file, creating default if it doesn't exist
    ///
    /// The `PLANTDOC_API_KEY` environment variable, when set, overrides
    /// the key stored in the file so the secret can stay out of disk.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        let mut config = if config_path.exists() {
            let contents = fs::read_to_string(&config_path)
                .context("Failed to read config file")?;

            toml::from_str(&contents)
                .context("Failed to parse config file")?
        } else {
            let config = PipelineConfig::default();
            config.save()?;
            config
        };

        config.apply_env_override();
        Ok(config)
    }

    /// Load configuration from an explicit path. Unlike [`load`], a
    /// missing file is an error here; the caller asked for that file.
    ///
    /// [`load`]: PipelineConfig::load
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let mut config: PipelineConfig = toml::from_str(&contents)
            .context("Failed to parse config file")?;

        config.apply_env_override();
        Ok(config)
    }

    fn apply_env_override(&mut self) {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.is_empty() {
                self.api.key = key;
            }
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        // Ensure parent directory exists
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .context("Failed to create config directory")?;
        }

        let toml_string = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        fs::write(&config_path, toml_string)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .context("Could not determine home directory")?;

        Ok(home.join(".plantdoc").join("config.toml"))
    }

    /// True when an API key is available from file or environment
    pub fn has_api_key(&self) -> bool {
        !self.api.key.is_empty()
    }

    /// Request timeout as a Duration
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.api.timeout_secs)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            api: ApiConfig::default(),
            models: ModelsConfig::default(),
            tuning: TuningConfig::default(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            base_url: default_api_base(),
            key: String::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Default for ModelsConfig {
    fn default() -> Self {
        ModelsConfig {
            vision: default_vision_model(),
            text: default_text_model(),
        }
    }
}

impl Default for TuningConfig {
    fn default() -> Self {
        TuningConfig {
            quality_threshold: DEFAULT_QUALITY_THRESHOLD,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_delay_ms: DEFAULT_RETRY_BASE_DELAY_MS,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
        }
    }
}

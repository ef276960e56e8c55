//! # Application Configuration
//!
//! This module defines the configuration structure for the `linkstash-server`
//! and provides the logic for loading it from a `config.yml` file and
//! environment variables. The file is optional; every field has a default or
//! can be supplied through the environment.

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use regex::Regex;
use serde::Deserialize;
use std::env;
use std::fs;
use tracing::info;

/// A custom error type for configuration issues.
#[derive(Debug)]
pub enum ConfigError {
    /// Indicates an error from the underlying `config` crate.
    General(String),
    /// Indicates a required configuration file was not found.
    NotFound(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::General(msg) => write!(f, "Configuration error: {msg}"),
            ConfigError::NotFound(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::General(err.to_string())
    }
}

/// The root configuration structure, mapping directly to `config.yml`.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// The port for the server to listen on. Loaded from `PORT` env var.
    #[serde(default = "default_port")]
    pub port: u16,
    /// The path to the SQLite database file. Loaded from `DB_URL` env var.
    #[serde(default = "default_db_url")]
    pub db_url: String,
    /// Telegram bot settings. Without a bot token the webhook still accepts
    /// updates but no replies are sent.
    #[serde(default)]
    pub telegram: TelegramSettings,
    /// Metadata extraction settings.
    #[serde(default)]
    pub metadata: MetadataSettings,
    /// The ordered AI provider chain used for tag generation.
    #[serde(default)]
    pub tagging: TaggingSettings,
}

fn default_port() -> u16 {
    9090
}
fn default_db_url() -> String {
    "db/linkstash.db".to_string()
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct TelegramSettings {
    pub bot_token: Option<String>,
    /// Overridable Telegram API base, mainly for tests.
    pub api_url: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct MetadataSettings {
    /// Facebook app credentials enabling the Instagram oEmbed API.
    pub facebook_app_id: Option<String>,
    pub facebook_app_secret: Option<String>,
    /// Overridable oEmbed endpoint, mainly for tests.
    pub instagram_oembed_url: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct TaggingSettings {
    /// Providers tried in order; the first to return enough tags wins.
    #[serde(default)]
    pub providers: Vec<TagProviderSettings>,
    pub min_tags: Option<usize>,
    pub max_tags: Option<usize>,
}

/// One AI provider entry in the tagging chain.
#[derive(Debug, Deserialize, Clone)]
pub struct TagProviderSettings {
    /// The type of provider ("openai" or "claude").
    pub provider: String,
    /// The API URL. Optional; each provider has a well-known default.
    pub api_url: Option<String>,
    /// The API key, which can be null for unauthenticated local endpoints.
    pub api_key: Option<String>,
    pub model_name: Option<String>,
}

// Helper to read a file, substitute env vars, and return its content.
// Returns Ok(None) if the file does not exist, or an error if it fails to read.
fn read_and_substitute(path: &str) -> Result<Option<String>, ConfigError> {
    if !std::path::Path::new(path).exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)
        .map_err(|e| ConfigError::General(format!("Failed to read config file '{path}': {e}")))?;

    let re = Regex::new(r"\$\{(?P<var>[A-Z0-9_]+)\}")
        .map_err(|e| ConfigError::General(e.to_string()))?;
    let expanded_content = re.replace_all(&content, |caps: &regex::Captures| {
        let var_name = &caps["var"];
        env::var(var_name).unwrap_or_else(|_| "".to_string())
    });

    Ok(Some(expanded_content.to_string()))
}

/// Loads the application configuration from a file and environment variables.
///
/// The file is resolved as `config.yml` next to the crate manifest unless an
/// override path is given; a missing file falls through to defaults.
/// Environment variables are merged on top, allowing overrides and
/// substitution in the YAML file:
/// - Top-level keys like `port` and `db_url` are overridden by `PORT` and `DB_URL`.
/// - Nested keys are overridden by `LINKSTASH_...` variables
///   (e.g., `LINKSTASH_TELEGRAM__BOT_TOKEN`).
pub fn get_config(config_path_override: Option<&str>) -> Result<AppConfig, ConfigError> {
    let base_path = env!("CARGO_MANIFEST_DIR");
    let mut builder = ConfigBuilder::builder();

    let config_path = config_path_override
        .map(str::to_string)
        .unwrap_or_else(|| format!("{base_path}/config.yml"));

    match read_and_substitute(&config_path)? {
        Some(content) => {
            info!("Loading configuration from '{config_path}'.");
            builder = builder.add_source(File::from_str(&content, FileFormat::Yaml));
        }
        None if config_path_override.is_some() => {
            return Err(ConfigError::NotFound(format!(
                "Config file not found at '{config_path}'."
            )));
        }
        None => {
            info!("'{config_path}' not found, using defaults and environment variables.");
        }
    }

    let settings = builder
        // Load environment variables for top-level keys like PORT.
        .add_source(Environment::default())
        // Load prefixed environment variables for deeper overrides.
        .add_source(
            Environment::with_prefix("LINKSTASH")
                .prefix_separator("_")
                .try_parsing(true)
                .separator("__"),
        )
        .build()?;

    let config: AppConfig = settings.try_deserialize()?;
    Ok(config)
}

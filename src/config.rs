//! Configuration for the Noun Project MCP server
//!
//! Settings come from an optional TOML file; API credentials are read from
//! environment variables named in that file. Only the binary resolves the
//! environment. The client itself is handed a ready [`Credentials`] value.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://api.thenounproject.com";
pub const DEFAULT_API_KEY_ENV: &str = "NOUN_PROJECT_API_KEY";
pub const DEFAULT_API_SECRET_ENV: &str = "NOUN_PROJECT_API_SECRET";

/// Top-level server configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub api: ApiSection,
}

/// How the server presents itself during the MCP handshake
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerSection {
    #[serde(default = "default_server_name")]
    pub name: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            name: default_server_name(),
        }
    }
}

fn default_server_name() -> String {
    "noun-project".to_string()
}

/// Upstream API settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiSection {
    /// Base URL of the Noun Project API
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout in seconds (default: 30)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Largest response body accepted from the upstream
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: usize,
    /// Environment variable containing the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Environment variable containing the API secret
    #[serde(default = "default_api_secret_env")]
    pub api_secret_env: String,
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            max_response_bytes: default_max_response_bytes(),
            api_key_env: default_api_key_env(),
            api_secret_env: default_api_secret_env(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_response_bytes() -> usize {
    5 * 1024 * 1024 // 5MB
}

fn default_api_key_env() -> String {
    DEFAULT_API_KEY_ENV.to_string()
}

fn default_api_secret_env() -> String {
    DEFAULT_API_SECRET_ENV.to_string()
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),
    #[error("Missing credential: {0}")]
    MissingCredential(&'static str),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// API key and secret used to sign every upstream request
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    api_key: String,
    api_secret: String,
}

impl Credentials {
    pub fn new<K: Into<String>, S: Into<String>>(api_key: K, api_secret: S) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    /// Build credentials from values that may be absent
    pub fn from_parts(
        api_key: Option<String>,
        api_secret: Option<String>,
    ) -> Result<Self, ConfigError> {
        let api_key = api_key.ok_or(ConfigError::MissingCredential("api_key"))?;
        let api_secret = api_secret.ok_or(ConfigError::MissingCredential("api_secret"))?;
        let credentials = Self::new(api_key, api_secret);
        credentials.validate()?;
        Ok(credentials)
    }

    /// Reject blank values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::MissingCredential("api_key"));
        }
        if self.api_secret.trim().is_empty() {
            return Err(ConfigError::MissingCredential("api_secret"));
        }
        Ok(())
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn api_secret(&self) -> &str {
        &self.api_secret
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"***")
            .field("api_secret", &"***")
            .finish()
    }
}

impl ServerConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ServerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check field constraints that serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        let base_url = url::Url::parse(&self.api.base_url).map_err(|e| {
            ConfigError::InvalidConfig(format!("api.base_url '{}': {e}", self.api.base_url))
        })?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidConfig(format!(
                "api.base_url must use http or https, got '{}'",
                base_url.scheme()
            )));
        }
        if self.api.timeout_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "api.timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.api.max_response_bytes == 0 {
            return Err(ConfigError::InvalidConfig(
                "api.max_response_bytes must be greater than zero".to_string(),
            ));
        }
        if self.api.api_key_env.trim().is_empty() || self.api.api_secret_env.trim().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "api.api_key_env and api.api_secret_env must name environment variables"
                    .to_string(),
            ));
        }
        if self.server.name.trim().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "server.name must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    /// Helper method to get environment variable with error propagation
    fn get_env_var_required(env_var_name: &str) -> Result<String, ConfigError> {
        std::env::var(env_var_name)
            .map_err(|_| ConfigError::EnvVarNotFound(env_var_name.to_string()))
    }

    /// Resolve API credentials from the configured environment variables
    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        let api_key = Self::get_env_var_required(&self.api.api_key_env)?;
        let api_secret = Self::get_env_var_required(&self.api.api_secret_env)?;
        Credentials::from_parts(Some(api_key), Some(api_secret))
    }
}

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::credentials::SecureString;
use crate::config::types::Config;

pub const ENV_USERNAME: &str = "OSB_USERNAME";
pub const ENV_PASSWORD: &str = "OSB_PASSWORD";
pub const ENV_LISTEN_ADDR: &str = "OSB_HTTP_LISTEN_ADDR";
pub const ENV_INVENTORY_PATH: &str = "OSB_INVENTORY_PATH";

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },
}

impl Config {
    /// Returns the path to the configuration file.
    ///
    /// Uses `~/.config/osb-custom-api/config.toml` on Unix,
    /// or the platform equivalent via `dirs::config_dir()`.
    /// Falls back to the current directory if config_dir is unavailable.
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        config_dir.join("osb-custom-api").join("config.toml")
    }

    /// Loads configuration from `path`, applies process environment
    /// overrides and validates the result.
    ///
    /// A missing file yields `Config::default()` (plus overrides).
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            return Self::load_existing(path);
        }
        Self::finish(Config::default())
    }

    /// Like [`Config::load_from`], but a missing file is a `ReadError`.
    pub fn load_existing(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::finish(Self::parse(&content, path)?)
    }

    fn finish(mut config: Config) -> Result<Self, ConfigError> {
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parses TOML content without touching the environment.
    pub fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Overrides file values with non-empty environment values.
    ///
    /// `lookup` abstracts `std::env::var` so tests can supply their own map.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(username) = get(ENV_USERNAME) {
            self.auth.username = Some(username);
        }
        if let Some(password) = get(ENV_PASSWORD) {
            self.auth.password = Some(SecureString::new(password));
        }
        if let Some(addr) = get(ENV_LISTEN_ADDR) {
            self.server.bind_addr = addr;
        }
        if let Some(path) = get(ENV_INVENTORY_PATH) {
            self.graph.inventory_path = Some(PathBuf::from(path));
        }
    }

    /// Validates the configuration.
    ///
    /// Checks:
    /// - The bind address is a valid socket address
    /// - The route prefix is empty or starts (but does not end) with '/'
    /// - Request timeout and header limit are non-zero
    /// - Username and password are either both set or both unset
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.bind_addr.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::ValidationError {
                message: format!("Invalid bind address '{}'", self.server.bind_addr),
            });
        }

        let prefix = &self.server.route_prefix;
        if !prefix.is_empty() && (!prefix.starts_with('/') || prefix.ends_with('/')) {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "Route prefix '{}' must start with '/' and must not end with '/'",
                    prefix
                ),
            });
        }

        if self.server.request_timeout_seconds == 0 {
            return Err(ConfigError::ValidationError {
                message: "request_timeout_seconds must be greater than zero".to_string(),
            });
        }
        if self.server.max_header_bytes == 0 {
            return Err(ConfigError::ValidationError {
                message: "max_header_bytes must be greater than zero".to_string(),
            });
        }

        let has_username = self.auth.username.as_deref().is_some_and(|u| !u.is_empty());
        let has_password = self.auth.password.as_ref().is_some_and(|p| !p.is_empty());
        if has_username != has_password {
            return Err(ConfigError::ValidationError {
                message: "Username and password must be set together".to_string(),
            });
        }

        Ok(())
    }
}

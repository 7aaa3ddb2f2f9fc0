use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::credentials::SecureString;

/// Root configuration container.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub graph: GraphConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address for the HTTP listener (host:port).
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Path prefix the custom routes are nested under (default: "/custom").
    #[serde(default = "default_route_prefix")]
    pub route_prefix: String,
    /// Seconds to wait for in-flight connections on shutdown (default: 10).
    #[serde(default = "default_shutdown_grace_seconds")]
    pub shutdown_grace_seconds: u64,
    /// Log filter used when RUST_LOG is unset (default: "info").
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Upper bound for handling one request, body included (default: 30).
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
    /// Largest accepted request header block in bytes (default: 65536).
    #[serde(default = "default_max_header_bytes")]
    pub max_header_bytes: usize,
}

/// Basic auth credentials shared with the broker API.
///
/// Both fields unset disables authentication.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<SecureString>,
}

/// Resource graph source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Inventory file describing instances and their connection secrets.
    /// An unset path starts the service with an empty graph.
    #[serde(default)]
    pub inventory_path: Option<PathBuf>,
}

fn default_bind_addr() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_route_prefix() -> String {
    "/custom".to_string()
}

fn default_shutdown_grace_seconds() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_request_timeout_seconds() -> u64 {
    30
}

fn default_max_header_bytes() -> usize {
    64 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            route_prefix: default_route_prefix(),
            shutdown_grace_seconds: default_shutdown_grace_seconds(),
            log_level: default_log_level(),
            request_timeout_seconds: default_request_timeout_seconds(),
            max_header_bytes: default_max_header_bytes(),
        }
    }
}

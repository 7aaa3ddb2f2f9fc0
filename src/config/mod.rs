//! Configuration loading, validation, and storage.

mod credentials;
mod loader;
mod store;
mod types;

pub use credentials::{BasicCredentials, SecureString};
pub use loader::{ConfigError, ENV_INVENTORY_PATH, ENV_LISTEN_ADDR, ENV_PASSWORD, ENV_USERNAME};
pub use store::ConfigStore;
pub use types::{AuthConfig, Config, GraphConfig, ServerConfig};

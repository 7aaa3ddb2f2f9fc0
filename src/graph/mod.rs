//! Resource graph boundary.
//!
//! The resource graph owns instance records and their connection secrets.
//! Everything above this module sees typed [`ServiceInstance`] and
//! [`ConnectionDetails`] values; raw secret maps never leave it.

mod inventory;
mod types;

use async_trait::async_trait;
use thiserror::Error;

pub use inventory::{Inventory, InventoryGraph};
pub use types::{
    ConnectionDetails, ServiceInstance, ServiceKind, ENDPOINT_KEY, METRICS_PORT_KEY,
    PASSWORD_KEY, PORT_KEY, SENTINEL_PORT_KEY, USERNAME_KEY,
};

/// Errors raised by a resource graph client.
#[derive(Debug, Error)]
pub enum GraphError {
    /// The composite has not published its connection secret yet.
    #[error("connection secret for composite '{composite}' not found")]
    SecretNotFound { composite: String },

    #[error("failed to read inventory '{path}': {source}")]
    Read {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse inventory '{path}': {source}")]
    Parse {
        path: std::path::PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Read access to the resource graph.
///
/// Implementations own connectivity and caching. Callers never retry.
#[async_trait]
pub trait ResourceGraph: Send + Sync + 'static {
    /// Look up an instance record. `Ok(None)` means it does not exist.
    async fn find_instance(&self, instance_id: &str)
        -> Result<Option<ServiceInstance>, GraphError>;

    /// Fetch the connection details published for an instance's composite.
    async fn connection_details(
        &self,
        instance: &ServiceInstance,
    ) -> Result<ConnectionDetails, GraphError>;
}

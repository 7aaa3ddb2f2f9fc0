//! HTTP surface of the custom broker API.
//!
//! Routes:
//! - GET    /service_instances/{id}/endpoint
//! - GET    /service_instances/{id}/usage
//! - POST   /admin/service-definition
//! - DELETE /admin/service-definition/{id}
//! - POST   /service_instances/{id}/backups
//! - GET    /service_instances/{id}/backups
//! - GET    /service_instances/{id}/backups/{backup_id}
//! - DELETE /service_instances/{id}/backups/{backup_id}
//! - POST   /service_instances/{id}/backups/{backup_id}/restores
//! - GET    /service_instances/{id}/backups/{backup_id}/restores/{restore_id}
//! - GET    /service_instances/{id}/api-docs
//!
//! all nested under the configured prefix (default `/custom`), plus an
//! unauthenticated `GET /health`.

mod error;
mod handlers;
mod middleware;
mod router;
mod shutdown;
mod state;

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use crate::config::ConfigStore;
use crate::graph::ResourceGraph;
use crate::lifecycle::BackupLifecycle;

pub use error::{ApiError, ErrorResponse};
pub use middleware::{CORRELATION_ID_HEADER, ORIGINATING_IDENTITY_HEADER};
pub use router::build_router;
pub use shutdown::ShutdownManager;
pub use state::AppState;

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` wins over `default_filter`.
pub fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid bind address '{addr}'")]
    InvalidAddr { addr: String },

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("bind() must be called before run()")]
    NotBound,

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

pub struct ApiServer {
    pub addr: SocketAddr,
    /// Populated by bind(), consumed by run().
    listener: Option<TcpListener>,
    config: ConfigStore,
    state: Arc<AppState>,
    shutdown: Arc<ShutdownManager>,
}

impl ApiServer {
    pub fn new(
        config: ConfigStore,
        graph: Arc<dyn ResourceGraph>,
        lifecycle: Arc<dyn BackupLifecycle>,
    ) -> Self {
        let state = Arc::new(AppState::new(config.clone(), graph, lifecycle));
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            listener: None,
            config,
            state,
            shutdown: Arc::new(ShutdownManager::new()),
        }
    }

    /// Binds the configured address and returns the actual bound address
    /// (useful with port 0).
    pub async fn bind(&mut self) -> Result<SocketAddr, ServerError> {
        let bind_addr = self.config.get().server.bind_addr;
        let addr: SocketAddr = bind_addr
            .parse()
            .map_err(|_| ServerError::InvalidAddr { addr: bind_addr.clone() })?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        let actual = listener
            .local_addr()
            .map_err(|source| ServerError::Bind { addr, source })?;

        self.addr = actual;
        self.listener = Some(listener);
        tracing::info!("API server bound to {}", actual);
        Ok(actual)
    }

    pub fn shutdown_handle(&self) -> Arc<ShutdownManager> {
        self.shutdown.clone()
    }

    pub fn handle(&self) -> ApiHandle {
        ApiHandle {
            shutdown: self.shutdown.clone(),
        }
    }

    /// Serves until shutdown is signaled, then waits up to the configured
    /// grace period for in-flight connections.
    pub async fn run(self) -> Result<(), ServerError> {
        let listener = self.listener.ok_or(ServerError::NotBound)?;
        let server_config = self.config.get().server;
        let grace = Duration::from_secs(server_config.shutdown_grace_seconds);

        let app = build_router(self.state.clone(), &server_config.route_prefix);

        tracing::info!(
            addr = %self.addr,
            prefix = %server_config.route_prefix,
            "Starting API server"
        );

        let shutdown = self.shutdown.clone();
        let serve = axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.signaled().await })
            .into_future();

        let shutdown = self.shutdown.clone();
        let grace_elapsed = async move {
            shutdown.signaled().await;
            tokio::time::sleep(grace).await;
        };

        tokio::select! {
            result = serve => result.map_err(ServerError::Serve)?,
            _ = grace_elapsed => {
                tracing::warn!(
                    grace_seconds = server_config.shutdown_grace_seconds,
                    "Grace period elapsed, dropping open connections"
                );
            }
        }

        tracing::info!("API server stopped");
        Ok(())
    }
}

#[derive(Clone)]
pub struct ApiHandle {
    shutdown: Arc<ShutdownManager>,
}

impl ApiHandle {
    pub fn shutdown(&self) {
        self.shutdown.signal_shutdown();
    }
}

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use osb_custom_api::api::{init_tracing, ApiServer, ShutdownManager};
use osb_custom_api::config::{Config, ConfigStore};
use osb_custom_api::graph::{Inventory, InventoryGraph};
use osb_custom_api::lifecycle::UnimplementedLifecycle;

/// Custom-API extension for an Open Service Broker.
#[derive(Debug, Parser)]
#[command(name = "osb-custom-api", version, about)]
struct Args {
    /// Path to the config file (defaults to the platform config dir).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listen address, overrides `server.bind_addr`.
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config_path = args.config.unwrap_or_else(Config::config_path);
    let mut config = Config::load_from(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    if let Some(bind) = args.bind {
        config.server.bind_addr = bind;
        config.validate()?;
    }

    init_tracing(&config.server.log_level);

    let graph = match &config.graph.inventory_path {
        Some(path) => InventoryGraph::load(path)?,
        None => {
            tracing::warn!("No inventory configured, every instance lookup will miss");
            InventoryGraph::new(Inventory::default())
        }
    };
    if config.auth.credentials().is_none() {
        tracing::warn!("No basic-auth credentials configured, custom routes are open");
    }

    let store = ConfigStore::new(config, config_path);
    let mut server = ApiServer::new(
        store.clone(),
        Arc::new(graph.clone()),
        Arc::new(UnimplementedLifecycle),
    );
    server.bind().await?;

    let shutdown = server.shutdown_handle();
    shutdown.listen_for_os_signals();
    spawn_reload_listener(store, graph, shutdown);

    server.run().await?;
    Ok(())
}

/// Reloads config and inventory on SIGHUP. Listener address changes need a
/// restart.
#[cfg(unix)]
fn spawn_reload_listener(
    store: ConfigStore,
    graph: InventoryGraph,
    shutdown: Arc<ShutdownManager>,
) {
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async move {
        let mut hangup = match signal(SignalKind::hangup()) {
            Ok(hangup) => hangup,
            Err(e) => {
                tracing::warn!("Failed to install SIGHUP handler: {}", e);
                return;
            }
        };

        loop {
            tokio::select! {
                received = hangup.recv() => {
                    if received.is_none() {
                        return;
                    }
                }
                _ = shutdown.signaled() => return,
            }

            match store.reload() {
                Ok(()) => tracing::info!(path = %store.path().display(), "Reloaded config"),
                Err(e) => tracing::error!("Config reload failed, keeping previous: {}", e),
            }
            if let Err(e) = graph.reload() {
                tracing::error!("Inventory reload failed, keeping previous: {}", e);
            }
        }
    });
}

#[cfg(not(unix))]
fn spawn_reload_listener(
    _store: ConfigStore,
    _graph: InventoryGraph,
    _shutdown: Arc<ShutdownManager>,
) {
}

//! Shared test utilities.

#![allow(dead_code, unused_imports)]

use osb_custom_api::api::{ApiHandle, ApiServer};
use osb_custom_api::config::{Config, ConfigStore, SecureString};
use osb_custom_api::graph::{Inventory, InventoryGraph};
use osb_custom_api::lifecycle::BackupLifecycle;
use std::net::{SocketAddr, TcpListener};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub const TEST_USERNAME: &str = "broker";
pub const TEST_PASSWORD: &str = "s3cret";

/// Inventory covering the topologies the endpoint tests exercise.
pub const SAMPLE_INVENTORY: &str = r#"
[[instances]]
id = "i0"
service = "mariadb-k8s"
composite = "i0"

[[instances]]
id = "i1"
service = "mariadb-k8s-database"
composite = "i1"
parent = "i0"

[[instances]]
id = "r1"
service = "redis-k8s"
composite = "r1"

[[instances]]
id = "p1"
service = "postgres-k8s"
composite = "p1"

[[instances]]
id = "orphan"
service = "mariadb-k8s-database"
composite = "orphan"

[[instances]]
id = "dangling"
service = "mariadb-k8s-database"
composite = "dangling"
parent = "i-gone"

[secrets.i0]
endpoint = "db.internal"
port = "3306"
username = "root"
password = "hunter2"

[secrets.r1]
endpoint = "r.internal"
port = "6379"
sentinelPort = "26379"

[secrets.p1]
endpoint = "pg.internal"
"#;

/// Find an available port for testing.
pub fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind to free port");
    listener.local_addr().unwrap().port()
}

/// Write `content` to a temporary inventory file.
pub fn temp_inventory(content: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("inventory.toml");
    std::fs::write(&path, content).expect("Failed to write inventory");
    (temp_dir, path)
}

pub fn sample_graph() -> InventoryGraph {
    let inventory: Inventory = toml::from_str(SAMPLE_INVENTORY).expect("sample inventory parses");
    InventoryGraph::new(inventory)
}

/// Config bound to an ephemeral port with the given prefix.
pub fn test_config(prefix: &str, with_auth: bool) -> Config {
    let mut config = Config::default();
    config.server.bind_addr = "127.0.0.1:0".to_string();
    config.server.route_prefix = prefix.to_string();
    config.server.shutdown_grace_seconds = 1;
    if with_auth {
        config.auth.username = Some(TEST_USERNAME.to_string());
        config.auth.password = Some(SecureString::new(TEST_PASSWORD));
    }
    config
}

/// A running server under test.
pub struct TestServer {
    pub addr: SocketAddr,
    pub handle: ApiHandle,
    task: tokio::task::JoinHandle<()>,
}

impl TestServer {
    pub async fn start(
        config: Config,
        graph: InventoryGraph,
        lifecycle: Arc<dyn BackupLifecycle>,
    ) -> Self {
        let store = ConfigStore::new(config, PathBuf::from("/tmp/osb-test.toml"));
        let mut server = ApiServer::new(store, Arc::new(graph), lifecycle);
        let addr = server.bind().await.expect("bind");
        let handle = server.handle();
        let task = tokio::spawn(async move {
            server.run().await.expect("server run");
        });
        assert!(wait_for_server(addr, Duration::from_secs(2)).await);
        Self { addr, handle, task }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Signal shutdown and wait for the server task to finish.
    pub async fn stop(self) {
        self.handle.shutdown();
        tokio::time::timeout(Duration::from_secs(5), self.task)
            .await
            .expect("server did not stop")
            .expect("server task panicked");
    }
}

/// Wait for a server to become available.
pub async fn wait_for_server(addr: SocketAddr, timeout: Duration) -> bool {
    let start = std::time::Instant::now();
    while start.elapsed() < timeout {
        if tokio::net::TcpStream::connect(addr).await.is_ok() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

//! Inventory file loading and hot reload.

mod common;

use common::{temp_inventory, SAMPLE_INVENTORY};
use osb_custom_api::endpoints::{Endpoint, EndpointError, EndpointService};
use osb_custom_api::graph::{GraphError, InventoryGraph};
use std::sync::Arc;

#[tokio::test]
async fn test_reload_picks_up_published_secret() {
    let pending = r#"
[[instances]]
id = "m0"
service = "mariadb-k8s"
composite = "m0"
"#;
    let (_dir, path) = temp_inventory(pending);
    let graph = InventoryGraph::load(&path).unwrap();
    let service = EndpointService::new(Arc::new(graph.clone()));

    let err = service.endpoints("m0").await.unwrap_err();
    assert!(matches!(err, EndpointError::NotReady { ref instance_id } if instance_id == "m0"));

    let published =
        format!("{pending}\n[secrets.m0]\nendpoint = \"m.internal\"\nport = \"3306\"\n");
    std::fs::write(&path, published).unwrap();
    graph.reload().unwrap();

    let endpoints = service.endpoints("m0").await.unwrap();
    assert_eq!(endpoints, vec![Endpoint::tcp("m.internal", "3306")]);
}

#[tokio::test]
async fn test_failed_reload_keeps_snapshot() {
    let (_dir, path) = temp_inventory(SAMPLE_INVENTORY);
    let graph = InventoryGraph::load(&path).unwrap();
    let before = graph.instance_count();
    assert!(before > 0);

    std::fs::write(&path, "[[instances]\n").unwrap();
    assert!(matches!(graph.reload(), Err(GraphError::Parse { .. })));
    assert_eq!(graph.instance_count(), before);
}

#[test]
fn test_missing_inventory_file_is_an_error() {
    let dir = tempfile::TempDir::new().unwrap();
    let result = InventoryGraph::load(dir.path().join("absent.toml"));
    assert!(matches!(result, Err(GraphError::Read { .. })));
}

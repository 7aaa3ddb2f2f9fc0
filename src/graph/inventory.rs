//! File-backed resource graph.
//!
//! Reads instance records and connection secrets from a TOML inventory:
//!
//! ```toml
//! [[instances]]
//! id = "i1"
//! service = "mariadb-k8s-database"
//! composite = "i1"
//! parent = "i0"
//!
//! [secrets.i0]
//! endpoint = "db.internal"
//! port = "3306"
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Deserialize;

use super::types::{ConnectionDetails, ServiceInstance};
use super::{GraphError, ResourceGraph};

/// Parsed inventory file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Inventory {
    #[serde(default)]
    pub instances: Vec<ServiceInstance>,
    /// Connection secrets keyed by composite name.
    #[serde(default)]
    pub secrets: HashMap<String, BTreeMap<String, String>>,
}

impl Inventory {
    pub fn from_path(path: &Path) -> Result<Self, GraphError> {
        let content = fs::read_to_string(path).map_err(|e| GraphError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| GraphError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

/// Resource graph served from an in-memory inventory snapshot.
///
/// The snapshot can be swapped at runtime with [`InventoryGraph::reload`];
/// readers always see either the old or the new snapshot, never a mix.
#[derive(Clone)]
pub struct InventoryGraph {
    inner: Arc<RwLock<Inventory>>,
    path: Option<PathBuf>,
}

impl InventoryGraph {
    pub fn new(inventory: Inventory) -> Self {
        Self {
            inner: Arc::new(RwLock::new(inventory)),
            path: None,
        }
    }

    /// Loads the inventory at `path` and remembers it for reloads.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, GraphError> {
        let path = path.into();
        let inventory = Inventory::from_path(&path)?;
        tracing::info!(
            path = %path.display(),
            instances = inventory.instances.len(),
            "Loaded resource graph inventory"
        );
        Ok(Self {
            inner: Arc::new(RwLock::new(inventory)),
            path: Some(path),
        })
    }

    /// Re-reads the inventory file. Keeps the current snapshot on error.
    ///
    /// A graph built with [`InventoryGraph::new`] has no file and reloads
    /// as a no-op.
    pub fn reload(&self) -> Result<(), GraphError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let inventory = Inventory::from_path(path)?;
        let count = inventory.instances.len();
        *self.inner.write() = inventory;
        tracing::info!(
            path = %path.display(),
            instances = count,
            "Reloaded resource graph inventory"
        );
        Ok(())
    }

    pub fn instance_count(&self) -> usize {
        self.inner.read().instances.len()
    }
}

#[async_trait]
impl ResourceGraph for InventoryGraph {
    async fn find_instance(
        &self,
        instance_id: &str,
    ) -> Result<Option<ServiceInstance>, GraphError> {
        let inventory = self.inner.read();
        Ok(inventory
            .instances
            .iter()
            .find(|i| i.id == instance_id)
            .cloned())
    }

    async fn connection_details(
        &self,
        instance: &ServiceInstance,
    ) -> Result<ConnectionDetails, GraphError> {
        let inventory = self.inner.read();
        inventory
            .secrets
            .get(&instance.composite)
            .map(|data| ConnectionDetails::from_secret(data.iter()))
            .ok_or_else(|| GraphError::SecretNotFound {
                composite: instance.composite.clone(),
            })
    }
}

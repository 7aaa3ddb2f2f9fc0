//! Topology resolution: which instance owns the reachable endpoint.
//!
//! Most service types are reachable through their own connection secret.
//! A database inside a Galera cluster is not: the cluster (its parent
//! instance) publishes the endpoint. Resolution follows at most one parent
//! hop, so topologies are never deeper than two levels.

use std::sync::Arc;

use thiserror::Error;

use crate::graph::{GraphError, ResourceGraph, ServiceInstance};

/// Errors raised while resolving the authoritative instance.
#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("instance '{instance_id}' does not exist")]
    InstanceNotFound { instance_id: String },

    #[error("instance '{instance_id}' has an invalid topology: {reason}")]
    InvalidTopology { instance_id: String, reason: String },

    #[error("resolving instance '{instance_id}': {source}")]
    Graph {
        instance_id: String,
        #[source]
        source: GraphError,
    },
}

/// Resolves instance ids to the instance whose connection details are
/// authoritative.
#[derive(Clone)]
pub struct TopologyResolver {
    graph: Arc<dyn ResourceGraph>,
}

impl TopologyResolver {
    pub fn new(graph: Arc<dyn ResourceGraph>) -> Self {
        Self { graph }
    }

    /// Returns the authoritative instance for `instance_id`.
    ///
    /// # Errors
    /// - `InstanceNotFound` if the instance or its parent does not exist.
    /// - `InvalidTopology` if a required parent reference is missing, points
    ///   at the instance itself, or points at another cluster member.
    /// - `Graph` if the resource graph read fails.
    pub async fn resolve(&self, instance_id: &str) -> Result<ServiceInstance, TopologyError> {
        let instance = self.instance(instance_id).await?;

        if !instance.service.requires_parent() {
            return Ok(instance);
        }

        let parent_id = instance
            .parent_reference()
            .ok_or_else(|| TopologyError::InvalidTopology {
                instance_id: instance.id.clone(),
                reason: format!("service '{}' requires a parent reference", instance.service),
            })?;

        if parent_id == instance.id {
            return Err(TopologyError::InvalidTopology {
                instance_id: instance.id.clone(),
                reason: "parent reference points at the instance itself".to_string(),
            });
        }

        let parent = self.instance(parent_id).await?;

        if parent.service.requires_parent() {
            return Err(TopologyError::InvalidTopology {
                instance_id: instance.id.clone(),
                reason: format!(
                    "parent '{}' is itself a '{}' member",
                    parent.id, parent.service
                ),
            });
        }

        tracing::debug!(
            instance_id = %instance.id,
            authoritative_id = %parent.id,
            "Resolved instance to parent"
        );

        Ok(parent)
    }

    /// Looks up one instance without following its parent.
    ///
    /// # Errors
    /// `InstanceNotFound` if the instance does not exist.
    pub async fn instance(&self, instance_id: &str) -> Result<ServiceInstance, TopologyError> {
        self.graph
            .find_instance(instance_id)
            .await
            .map_err(|source| TopologyError::Graph {
                instance_id: instance_id.to_string(),
                source,
            })?
            .ok_or_else(|| TopologyError::InstanceNotFound {
                instance_id: instance_id.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Inventory, InventoryGraph, ServiceKind};

    fn instance(id: &str, service: ServiceKind, parent: Option<&str>) -> ServiceInstance {
        ServiceInstance {
            id: id.to_string(),
            service,
            composite: id.to_string(),
            parent: parent.map(str::to_string),
            parameters: Default::default(),
        }
    }

    fn resolver(instances: Vec<ServiceInstance>) -> TopologyResolver {
        let graph = InventoryGraph::new(Inventory {
            instances,
            secrets: Default::default(),
        });
        TopologyResolver::new(Arc::new(graph))
    }

    #[tokio::test]
    async fn test_cluster_member_resolves_to_parent() {
        let resolver = resolver(vec![
            instance("i0", ServiceKind::MariaDb, None),
            instance("i1", ServiceKind::MariaDbDatabase, Some("i0")),
        ]);

        let resolved = resolver.resolve("i1").await.unwrap();
        assert_eq!(resolved.id, "i0");
        assert_eq!(resolved.service, ServiceKind::MariaDb);
    }

    #[tokio::test]
    async fn test_other_types_resolve_to_self() {
        let redis = instance("r1", ServiceKind::Redis, Some("ignored"));
        let resolver = resolver(vec![
            redis.clone(),
            instance("i0", ServiceKind::MariaDb, None),
        ]);

        assert_eq!(resolver.resolve("r1").await.unwrap(), redis);
        assert_eq!(resolver.resolve("i0").await.unwrap().id, "i0");
    }

    #[tokio::test]
    async fn test_unknown_instance() {
        let resolver = resolver(vec![]);
        assert!(matches!(
            resolver.resolve("nope").await,
            Err(TopologyError::InstanceNotFound { instance_id }) if instance_id == "nope"
        ));
    }

    #[tokio::test]
    async fn test_missing_parent_reference() {
        let resolver = resolver(vec![instance("i1", ServiceKind::MariaDbDatabase, None)]);
        assert!(matches!(
            resolver.resolve("i1").await,
            Err(TopologyError::InvalidTopology { .. })
        ));
    }

    #[tokio::test]
    async fn test_parent_does_not_exist() {
        let resolver = resolver(vec![instance(
            "i1",
            ServiceKind::MariaDbDatabase,
            Some("i0"),
        )]);
        assert!(matches!(
            resolver.resolve("i1").await,
            Err(TopologyError::InstanceNotFound { instance_id }) if instance_id == "i0"
        ));
    }

    #[tokio::test]
    async fn test_self_reference_is_invalid() {
        let resolver = resolver(vec![instance(
            "i1",
            ServiceKind::MariaDbDatabase,
            Some("i1"),
        )]);
        assert!(matches!(
            resolver.resolve("i1").await,
            Err(TopologyError::InvalidTopology { .. })
        ));
    }

    #[tokio::test]
    async fn test_depth_is_bounded() {
        let resolver = resolver(vec![
            instance("i0", ServiceKind::MariaDb, None),
            instance("i1", ServiceKind::MariaDbDatabase, Some("i2")),
            instance("i2", ServiceKind::MariaDbDatabase, Some("i0")),
        ]);
        assert!(matches!(
            resolver.resolve("i1").await,
            Err(TopologyError::InvalidTopology { instance_id, .. }) if instance_id == "i1"
        ));
    }
}

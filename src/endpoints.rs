//! Endpoint assembly.
//!
//! Turns the authoritative instance's connection details into the ordered
//! list of endpoints a consumer connects to: primary first, then the
//! service's discovery port (if it has one), then the metrics port.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::graph::{
    ConnectionDetails, GraphError, ResourceGraph, ServiceInstance, METRICS_PORT_KEY,
};
use crate::topology::{TopologyError, TopologyResolver};

pub const PROTOCOL_TCP: &str = "tcp";

/// A network endpoint exposed by a service instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub destination: String,
    /// Kept as a string to preserve the secret's formatting.
    pub ports: String,
    pub protocol: String,
}

impl Endpoint {
    pub fn tcp(destination: impl Into<String>, ports: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            ports: ports.into(),
            protocol: PROTOCOL_TCP.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum EndpointError {
    /// Host or port not published yet. Retryable by the caller.
    #[error("instance '{instance_id}' is not yet ready")]
    NotReady { instance_id: String },

    #[error(transparent)]
    Topology(#[from] TopologyError),

    #[error("reading connection details of '{instance_id}': {source}")]
    Graph {
        instance_id: String,
        #[source]
        source: GraphError,
    },
}

/// Builds the endpoint list for an authoritative instance.
///
/// # Errors
/// `NotReady` if the primary host or port is missing. No partial list is
/// ever returned.
pub fn assemble(
    instance: &ServiceInstance,
    details: &ConnectionDetails,
) -> Result<Vec<Endpoint>, EndpointError> {
    let (Some(destination), Some(port)) = (details.endpoint.as_deref(), details.port.as_deref())
    else {
        return Err(EndpointError::NotReady {
            instance_id: instance.id.clone(),
        });
    };

    let mut endpoints = vec![Endpoint::tcp(destination, port)];

    let discovery = instance
        .service
        .discovery_port_key()
        .and_then(|key| details.port_for_key(key));
    let metrics = details.port_for_key(METRICS_PORT_KEY);

    for aux in [discovery, metrics].into_iter().flatten() {
        if endpoints.iter().any(|e| e.ports == aux) {
            continue;
        }
        endpoints.push(Endpoint::tcp(destination, aux));
    }

    Ok(endpoints)
}

/// Resolves an instance id all the way to its endpoint list.
#[derive(Clone)]
pub struct EndpointService {
    resolver: TopologyResolver,
    graph: Arc<dyn ResourceGraph>,
}

impl EndpointService {
    pub fn new(graph: Arc<dyn ResourceGraph>) -> Self {
        Self {
            resolver: TopologyResolver::new(graph.clone()),
            graph,
        }
    }

    pub async fn endpoints(&self, instance_id: &str) -> Result<Vec<Endpoint>, EndpointError> {
        let authoritative = self.resolver.resolve(instance_id).await?;

        let details = match self.graph.connection_details(&authoritative).await {
            Ok(details) => details,
            Err(GraphError::SecretNotFound { composite }) => {
                tracing::debug!(
                    instance_id = %instance_id,
                    composite = %composite,
                    "Connection secret not published yet"
                );
                return Err(EndpointError::NotReady {
                    instance_id: instance_id.to_string(),
                });
            }
            Err(source) => {
                return Err(EndpointError::Graph {
                    instance_id: authoritative.id.clone(),
                    source,
                })
            }
        };

        assemble(&authoritative, &details).map_err(|err| match err {
            // Report readiness against the id the caller asked about.
            EndpointError::NotReady { .. } => EndpointError::NotReady {
                instance_id: instance_id.to_string(),
            },
            other => other,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Inventory, InventoryGraph, ServiceKind};
    use std::collections::BTreeMap;

    fn instance(id: &str, service: ServiceKind) -> ServiceInstance {
        ServiceInstance {
            id: id.to_string(),
            service,
            composite: id.to_string(),
            parent: None,
            parameters: Default::default(),
        }
    }

    fn details(pairs: &[(&str, &str)]) -> ConnectionDetails {
        ConnectionDetails::from_secret(pairs.iter().copied())
    }

    #[test]
    fn test_redis_with_sentinel() {
        let r1 = instance("r1", ServiceKind::Redis);
        let got = assemble(
            &r1,
            &details(&[
                ("endpoint", "cache.internal"),
                ("port", "6379"),
                ("sentinelPort", "26379"),
            ]),
        )
        .unwrap();

        assert_eq!(
            got,
            vec![
                Endpoint::tcp("cache.internal", "6379"),
                Endpoint::tcp("cache.internal", "26379"),
            ]
        );
    }

    #[test]
    fn test_order_is_primary_discovery_metrics() {
        let r1 = instance("r1", ServiceKind::Redis);
        let got = assemble(
            &r1,
            &details(&[
                ("metricsPort", "9121"),
                ("sentinelPort", "26379"),
                ("port", "6379"),
                ("endpoint", "cache.internal"),
            ]),
        )
        .unwrap();

        let ports: Vec<&str> = got.iter().map(|e| e.ports.as_str()).collect();
        assert_eq!(ports, vec!["6379", "26379", "9121"]);
        assert!(got.iter().all(|e| e.protocol == "tcp"));
    }

    #[test]
    fn test_sentinel_key_ignored_for_other_types() {
        let db = instance("i0", ServiceKind::MariaDb);
        let got = assemble(
            &db,
            &details(&[
                ("endpoint", "db.internal"),
                ("port", "3306"),
                ("sentinelPort", "26379"),
                ("metricsPort", "9104"),
            ]),
        )
        .unwrap();

        assert_eq!(
            got,
            vec![
                Endpoint::tcp("db.internal", "3306"),
                Endpoint::tcp("db.internal", "9104"),
            ]
        );
    }

    #[test]
    fn test_missing_port_is_not_ready() {
        let r1 = instance("r1", ServiceKind::Redis);
        let err = assemble(
            &r1,
            &details(&[("endpoint", "cache.internal"), ("sentinelPort", "26379")]),
        )
        .unwrap_err();
        assert!(matches!(err, EndpointError::NotReady { instance_id } if instance_id == "r1"));
    }

    #[test]
    fn test_missing_host_is_not_ready() {
        let r1 = instance("r1", ServiceKind::Redis);
        let err = assemble(&r1, &details(&[("endpoint", ""), ("port", "6379")])).unwrap_err();
        assert!(matches!(err, EndpointError::NotReady { .. }));
    }

    #[test]
    fn test_duplicate_ports_are_skipped() {
        let r1 = instance("r1", ServiceKind::Redis);
        let got = assemble(
            &r1,
            &details(&[
                ("endpoint", "cache.internal"),
                ("port", "6379"),
                ("sentinelPort", "6379"),
            ]),
        )
        .unwrap();
        assert_eq!(got.len(), 1);
    }

    fn service(
        instances: Vec<ServiceInstance>,
        secrets: Vec<(&str, Vec<(&str, &str)>)>,
    ) -> EndpointService {
        let secrets = secrets
            .into_iter()
            .map(|(composite, pairs)| {
                let data: BTreeMap<String, String> = pairs
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect();
                (composite.to_string(), data)
            })
            .collect();
        EndpointService::new(Arc::new(InventoryGraph::new(Inventory { instances, secrets })))
    }

    #[tokio::test]
    async fn test_cluster_member_uses_parent_details() {
        let mut i1 = instance("i1", ServiceKind::MariaDbDatabase);
        i1.parent = Some("i0".to_string());
        let svc = service(
            vec![instance("i0", ServiceKind::MariaDb), i1],
            vec![
                ("i0", vec![("endpoint", "db.internal"), ("port", "3306")]),
                ("i1", vec![("endpoint", "member.internal"), ("port", "1")]),
            ],
        );

        let got = svc.endpoints("i1").await.unwrap();
        assert_eq!(got, vec![Endpoint::tcp("db.internal", "3306")]);
    }

    #[tokio::test]
    async fn test_missing_secret_is_not_ready() {
        let svc = service(vec![instance("r1", ServiceKind::Redis)], vec![]);
        assert!(matches!(
            svc.endpoints("r1").await,
            Err(EndpointError::NotReady { instance_id }) if instance_id == "r1"
        ));
    }

    #[tokio::test]
    async fn test_unknown_instance_propagates() {
        let svc = service(vec![], vec![]);
        assert!(matches!(
            svc.endpoints("x").await,
            Err(EndpointError::Topology(TopologyError::InstanceNotFound { .. }))
        ));
    }
}

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::SecureString;

/// Secret key holding the primary host.
pub const ENDPOINT_KEY: &str = "endpoint";
/// Secret key holding the primary port.
pub const PORT_KEY: &str = "port";
pub const USERNAME_KEY: &str = "username";
pub const PASSWORD_KEY: &str = "password";
/// Redis sentinel discovery port.
pub const SENTINEL_PORT_KEY: &str = "sentinelPort";
/// Metrics exporter port, published by any service type.
pub const METRICS_PORT_KEY: &str = "metricsPort";

/// Service type label attached to every instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ServiceKind {
    /// Replicated Redis with sentinel discovery.
    Redis,
    /// Galera cluster.
    MariaDb,
    /// A database inside a Galera cluster. The cluster owns the endpoint.
    MariaDbDatabase,
    Other(String),
}

impl ServiceKind {
    pub fn as_str(&self) -> &str {
        match self {
            ServiceKind::Redis => "redis-k8s",
            ServiceKind::MariaDb => "mariadb-k8s",
            ServiceKind::MariaDbDatabase => "mariadb-k8s-database",
            ServiceKind::Other(name) => name,
        }
    }

    /// Whether the reachable endpoint belongs to the parent instance.
    pub fn requires_parent(&self) -> bool {
        matches!(self, ServiceKind::MariaDbDatabase)
    }

    /// Connection-details key of the auxiliary discovery port, if the
    /// service type exposes one.
    pub fn discovery_port_key(&self) -> Option<&'static str> {
        match self {
            ServiceKind::Redis => Some(SENTINEL_PORT_KEY),
            _ => None,
        }
    }
}

impl From<&str> for ServiceKind {
    fn from(value: &str) -> Self {
        match value {
            "redis-k8s" => ServiceKind::Redis,
            "mariadb-k8s" => ServiceKind::MariaDb,
            "mariadb-k8s-database" => ServiceKind::MariaDbDatabase,
            other => ServiceKind::Other(other.to_string()),
        }
    }
}

impl From<String> for ServiceKind {
    fn from(value: String) -> Self {
        ServiceKind::from(value.as_str())
    }
}

impl From<ServiceKind> for String {
    fn from(kind: ServiceKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A provisioned service instance as recorded in the resource graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceInstance {
    pub id: String,
    pub service: ServiceKind,
    /// Name of the composite resource that publishes the connection secret.
    pub composite: String,
    /// Instance that owns this instance's runtime topology.
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub parameters: serde_json::Map<String, serde_json::Value>,
}

impl ServiceInstance {
    /// The parent reference with surrounding whitespace removed.
    /// Blank references count as absent.
    pub fn parent_reference(&self) -> Option<&str> {
        self.parent
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }
}

/// Connection details published for one composite.
///
/// Built once from the raw secret map; empty values become `None` so use
/// sites never have to distinguish "missing" from "blank".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectionDetails {
    pub endpoint: Option<String>,
    pub port: Option<String>,
    pub username: Option<String>,
    pub password: Option<SecureString>,
    pub sentinel_port: Option<String>,
    pub metrics_port: Option<String>,
}

impl ConnectionDetails {
    /// Builds typed details from raw secret data.
    ///
    /// Values are decoded as UTF-8 (lossy) and kept as published.
    /// Whitespace-only values count as absent. Unknown keys are ignored.
    pub fn from_secret<K, V, I>(data: I) -> Self
    where
        K: AsRef<str>,
        V: AsRef<[u8]>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut details = ConnectionDetails::default();
        for (key, value) in data {
            let value = String::from_utf8_lossy(value.as_ref()).into_owned();
            if value.trim().is_empty() {
                continue;
            }
            match key.as_ref() {
                ENDPOINT_KEY => details.endpoint = Some(value),
                PORT_KEY => details.port = Some(value),
                USERNAME_KEY => details.username = Some(value),
                PASSWORD_KEY => details.password = Some(SecureString::new(value)),
                SENTINEL_PORT_KEY => details.sentinel_port = Some(value),
                METRICS_PORT_KEY => details.metrics_port = Some(value),
                _ => {}
            }
        }
        details
    }

    /// Looks up an auxiliary port by its secret key.
    pub fn port_for_key(&self, key: &str) -> Option<&str> {
        match key {
            PORT_KEY => self.port.as_deref(),
            SENTINEL_PORT_KEY => self.sentinel_port.as_deref(),
            METRICS_PORT_KEY => self.metrics_port.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_kind_labels_round_trip() {
        for label in ["redis-k8s", "mariadb-k8s", "mariadb-k8s-database", "postgres"] {
            assert_eq!(ServiceKind::from(label).as_str(), label);
        }
        assert_eq!(
            ServiceKind::from("postgres"),
            ServiceKind::Other("postgres".to_string())
        );
    }

    #[test]
    fn test_only_cluster_members_require_parent() {
        assert!(ServiceKind::MariaDbDatabase.requires_parent());
        assert!(!ServiceKind::MariaDb.requires_parent());
        assert!(!ServiceKind::Redis.requires_parent());
        assert!(!ServiceKind::Other("x".into()).requires_parent());
    }

    #[test]
    fn test_from_secret_normalizes_blank_values() {
        let details = ConnectionDetails::from_secret([
            ("endpoint", "cache.internal"),
            ("port", "  "),
            ("sentinelPort", "26379"),
            ("password", "hunter2"),
            ("unrelated", "value"),
        ]);

        assert_eq!(details.endpoint.as_deref(), Some("cache.internal"));
        assert!(details.port.is_none());
        assert_eq!(details.port_for_key(SENTINEL_PORT_KEY), Some("26379"));
        assert_eq!(details.password.unwrap().expose(), "hunter2");
        assert!(details.metrics_port.is_none());
    }

    #[test]
    fn test_from_secret_keeps_published_formatting() {
        let details =
            ConnectionDetails::from_secret([("endpoint", "db.internal"), ("port", " 6379")]);
        assert_eq!(details.port.as_deref(), Some(" 6379"));
    }

    #[test]
    fn test_blank_parent_reference_is_absent() {
        let instance = ServiceInstance {
            id: "db-1".to_string(),
            service: ServiceKind::MariaDbDatabase,
            composite: "db-1".to_string(),
            parent: Some("   ".to_string()),
            parameters: Default::default(),
        };
        assert!(instance.parent_reference().is_none());
    }
}

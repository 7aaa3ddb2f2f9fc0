//! Custom API surface for an Open Service Broker.
//!
//! Resolves provisioned service instances to the network endpoints a
//! consumer connects to, and defines the backup/restore lifecycle contract
//! served under the broker's `/custom` routes.

pub mod api;
pub mod config;
pub mod endpoints;
pub mod graph;
pub mod lifecycle;
pub mod topology;

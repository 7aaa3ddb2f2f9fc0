//! Shared application state for the HTTP handlers.

use std::sync::Arc;

use crate::config::ConfigStore;
use crate::endpoints::EndpointService;
use crate::graph::ResourceGraph;
use crate::lifecycle::BackupLifecycle;
use crate::topology::TopologyResolver;

pub struct AppState {
    pub(crate) config: ConfigStore,
    pub(crate) endpoints: EndpointService,
    pub(crate) resolver: TopologyResolver,
    pub(crate) lifecycle: Arc<dyn BackupLifecycle>,
}

impl AppState {
    pub fn new(
        config: ConfigStore,
        graph: Arc<dyn ResourceGraph>,
        lifecycle: Arc<dyn BackupLifecycle>,
    ) -> Self {
        Self {
            config,
            endpoints: EndpointService::new(graph.clone()),
            resolver: TopologyResolver::new(graph),
            lifecycle,
        }
    }
}

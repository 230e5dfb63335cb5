//! Axum handlers and the state they share.

pub mod artifacts;
pub mod error;
pub mod health;
pub mod routes;
pub mod services;

pub use artifacts::{upload_wsdl_handler, upload_xslt_handler};
pub use error::ApiError;
pub use health::{health_handler, liveness_handler, readiness_handler};
pub use routes::{
    add_route_handler, data_host_handler, delete_route_handler, get_variable_handler,
    list_routes_handler, modify_route_handler, set_variable_handler, soap_route_handler,
    start_route_handler, stop_route_handler,
};
pub use services::dispatch_handler;

use std::sync::Arc;
use std::time::Instant;

use super::{NetworkConfig, ShutdownController};
use crate::artifacts::ArtifactStore;
use crate::engine::LocalRoutingEngine;
use crate::lifecycle::RouteLifecycleManager;

/// State handed to every handler. Cloning only bumps reference counts.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<RouteLifecycleManager>,
    /// Engine used directly by the data plane.
    pub engine: Arc<LocalRoutingEngine>,
    pub artifacts: Arc<ArtifactStore>,
    pub shutdown: Arc<ShutdownController>,
    pub config: Arc<NetworkConfig>,
    pub start_time: Instant,
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use routegate_core::WsdlEndpointResolver;

    use super::AppState;
    use crate::artifacts::ArtifactStore;
    use crate::directory::NullDirectory;
    use crate::engine::{HttpBackendClient, LocalRoutingEngine, TransformGate, XsltProcEngine};
    use crate::lifecycle::{LifecycleConfig, RouteLifecycleManager};
    use crate::network::{NetworkConfig, ShutdownController};
    use crate::storage::MemoryStore;
    use crate::traits::{RouteConfigStore, RoutingEngine, VariableStore};

    /// Fully wired in-memory state rooted in a temporary directory.
    pub(crate) fn test_state() -> (AppState, tempfile::TempDir) {
        let root = tempfile::tempdir().unwrap();
        let wsdl_dir = root.path().join("wsdl");
        let xslt_dir = root.path().join("xslt");

        let gate = Arc::new(TransformGate::new());
        let backend = HttpBackendClient::new(Duration::from_secs(5)).unwrap();
        let engine = Arc::new(LocalRoutingEngine::new(
            Arc::clone(&gate),
            Arc::new(XsltProcEngine::new()),
            Arc::new(backend),
        ));
        let store = Arc::new(MemoryStore::new());
        let config = LifecycleConfig {
            xslt_dir: xslt_dir.clone(),
            ..LifecycleConfig::default()
        };
        let manager = RouteLifecycleManager::new(
            config,
            Arc::clone(&engine) as Arc<dyn RoutingEngine>,
            Arc::clone(&store) as Arc<dyn RouteConfigStore>,
            store as Arc<dyn VariableStore>,
            Arc::new(NullDirectory),
            WsdlEndpointResolver::new(&wsdl_dir),
            gate,
        );

        let state = AppState {
            manager: Arc::new(manager),
            engine,
            artifacts: Arc::new(ArtifactStore::new(wsdl_dir, xslt_dir)),
            shutdown: Arc::new(ShutdownController::new()),
            config: Arc::new(NetworkConfig::default()),
            start_time: Instant::now(),
        };
        (state, root)
    }
}

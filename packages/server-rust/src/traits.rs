use std::path::Path;

use async_trait::async_trait;
use routegate_core::RouteRecord;

use crate::directory::{DirectoryError, Registration};
use crate::engine::{EngineError, RouteDefinition, RouteStatus, RouteSummary};
use crate::peer::PeerError;

/// Installs and drives routes by id.
///
/// Implementations enforce the route state machine: a route must be stopped
/// before it can be removed, and an id can be installed only once until it
/// is removed.
#[async_trait]
pub trait RoutingEngine: Send + Sync {
    /// Install a route under `route_id` without starting it.
    async fn install(&self, route_id: &str, definition: RouteDefinition)
        -> Result<(), EngineError>;

    /// Start accepting traffic. Starting a running route is a no-op.
    async fn start(&self, route_id: &str) -> Result<(), EngineError>;

    /// Stop accepting new traffic. Stopping a stopped route is a no-op.
    async fn stop(&self, route_id: &str) -> Result<(), EngineError>;

    /// Remove a stopped or never-started route.
    async fn remove(&self, route_id: &str) -> Result<(), EngineError>;

    /// Current state and in-flight dispatch count, `None` if not installed.
    fn status(&self, route_id: &str) -> Option<RouteStatus>;

    /// Every installed route, ordered by id.
    fn list(&self) -> Vec<RouteSummary>;
}

/// Durable route configuration keyed by service name.
#[async_trait]
pub trait RouteConfigStore: Send + Sync {
    /// Insert or replace the record for `record.service_name`.
    async fn upsert(&self, record: &RouteRecord) -> anyhow::Result<()>;

    /// Load the record for a service.
    async fn find(&self, service_name: &str) -> anyhow::Result<Option<RouteRecord>>;

    /// Delete the record for a service. Deleting a missing record is a no-op.
    async fn delete(&self, service_name: &str) -> anyhow::Result<()>;

    /// All stored records, ordered by service name.
    async fn list(&self) -> anyhow::Result<Vec<RouteRecord>>;
}

/// Single-row variable store. The last write wins.
#[async_trait]
pub trait VariableStore: Send + Sync {
    async fn get_variable(&self) -> anyhow::Result<Option<String>>;

    async fn set_variable(&self, value: &str) -> anyhow::Result<()>;
}

/// External service directory that advertises gateway routes.
#[async_trait]
pub trait ServiceDirectory: Send + Sync {
    /// Register `registration`, replacing any entry with the same id.
    async fn register(&self, registration: &Registration) -> Result<(), DirectoryError>;

    /// Remove the entry with `id`. Removing a missing entry is a no-op.
    async fn deregister(&self, id: &str) -> Result<(), DirectoryError>;
}

/// Companion service told about deleted routes.
#[async_trait]
pub trait PeerNotifier: Send + Sync {
    async fn route_deleted(&self, service_name: &str) -> Result<(), PeerError>;
}

/// Applies an XSLT stylesheet to an XML document.
#[async_trait]
pub trait XsltEngine: Send + Sync {
    async fn transform(&self, stylesheet: &Path, document: &str) -> anyhow::Result<String>;
}

/// Delivers a translated message to a backend and returns its reply.
#[async_trait]
pub trait BackendClient: Send + Sync {
    async fn call(&self, url: &str, body: String) -> anyhow::Result<String>;
}

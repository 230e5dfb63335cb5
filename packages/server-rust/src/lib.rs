//! `routegate` server: route lifecycle management, the in-process routing
//! engine, route and artifact storage, service directory clients, and the
//! HTTP surface that drives them.

pub mod artifacts;
pub mod directory;
pub mod engine;
pub mod lifecycle;
pub mod network;
pub mod peer;
pub mod storage;
pub mod traits;

pub use lifecycle::{LifecycleConfig, RouteError, RouteLifecycleManager};
pub use traits::{
    BackendClient, PeerNotifier, RouteConfigStore, RoutingEngine, ServiceDirectory, VariableStore,
    XsltEngine,
};

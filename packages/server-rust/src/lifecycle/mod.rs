//! Route lifecycle orchestration: install, start, stop and delete routes
//! while keeping the engine, the route store and the service directory
//! consistent.

pub mod config;
pub mod error;
pub mod locks;
pub mod manager;

pub use config::LifecycleConfig;
pub use error::RouteError;
pub use locks::ServiceLocks;
pub use manager::{parse_transform_flag, RouteLifecycleManager};

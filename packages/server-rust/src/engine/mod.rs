//! In-process routing engine, transform gate, and the backend/XSLT adapters
//! it dispatches through.

pub mod backend;
pub mod gate;
pub mod local;
pub mod xslt;

use std::path::PathBuf;

use routegate_core::{BackendLocation, InvalidTransition, RouteState, SoapOperation};
use serde::Serialize;

pub use backend::HttpBackendClient;
pub use gate::TransformGate;
pub use local::{DispatchError, LocalRoutingEngine};
pub use xslt::XsltProcEngine;

/// What the engine runs under a route id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDefinition {
    /// SOAP pass-through: XML in, optionally transformed, forwarded as-is.
    Soap {
        local_uri: String,
        backend: BackendLocation,
        /// Id of the transform sub-route consulted when the gate is open.
        transform_route: String,
    },
    /// REST front: JSON in, translated to XML, optionally transformed and
    /// wrapped in a SOAP envelope before forwarding.
    Rest {
        local_uri: String,
        backend: BackendLocation,
        stylesheet: Option<PathBuf>,
        envelope: Option<SoapOperation>,
    },
    /// Transform sub-route. Has no inbound address of its own.
    Transform { stylesheet: PathBuf },
}

impl RouteDefinition {
    /// Inbound URI the route listens on, if any.
    #[must_use]
    pub fn local_uri(&self) -> Option<&str> {
        match self {
            Self::Soap { local_uri, .. } | Self::Rest { local_uri, .. } => Some(local_uri),
            Self::Transform { .. } => None,
        }
    }
}

/// Point-in-time view of one installed route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteStatus {
    pub state: RouteState,
    pub in_flight: u64,
}

impl RouteStatus {
    /// Stopped with nothing left in flight.
    #[must_use]
    pub fn is_drained(&self) -> bool {
        self.state == RouteState::Stopped && self.in_flight == 0
    }
}

/// Entry in a route listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteSummary {
    #[serde(rename = "routeId")]
    pub route_id: String,
    pub state: RouteState,
}

/// Errors reported by a [`RoutingEngine`](crate::traits::RoutingEngine).
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("route {0} not found")]
    NotFound(String),
    #[error("route {0} is already installed")]
    AlreadyInstalled(String),
    #[error("route {route_id} rejected: {reason}")]
    Rejected { route_id: String, reason: String },
    #[error("route {route_id}: {source}")]
    InvalidTransition {
        route_id: String,
        #[source]
        source: InvalidTransition,
    },
}

impl EngineError {
    /// Whether the error only says the route does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

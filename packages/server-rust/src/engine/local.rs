//! In-process [`RoutingEngine`] that tracks route state and dispatches
//! inbound messages to backends.
//!
//! Every installed route lives in a `DashMap` keyed by route id; routes with
//! an inbound URI are also indexed by that URI. A dispatch holds an
//! [`InFlightGuard`] for the route it runs on so callers can wait for a
//! stopped route to drain before removing it.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use routegate_core::{json_str_to_xml, soap_envelope, RouteAction, RouteState, TranslateError};
use tracing::{debug, info};

use super::gate::TransformGate;
use super::{EngineError, RouteDefinition, RouteStatus, RouteSummary};
use crate::traits::{BackendClient, RoutingEngine, XsltEngine};

/// Errors produced while dispatching a message.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("no route bound to {0}")]
    NoRoute(String),
    #[error("route {0} is not running")]
    NotRunning(String),
    #[error(transparent)]
    Translate(#[from] TranslateError),
    #[error("transform failed: {0:#}")]
    Transform(anyhow::Error),
    #[error("backend call failed: {0:#}")]
    Backend(anyhow::Error),
}

struct RouteEntry {
    definition: RouteDefinition,
    state: RouteState,
    in_flight: Arc<AtomicU64>,
}

/// Decrements a route's in-flight counter when dropped.
struct InFlightGuard {
    in_flight: Arc<AtomicU64>,
}

impl InFlightGuard {
    fn enter(counter: &Arc<AtomicU64>) -> Self {
        counter.fetch_add(1, Ordering::Relaxed);
        Self {
            in_flight: Arc::clone(counter),
        }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Inbound URIs are matched without leading or trailing slashes.
fn normalize_uri(uri: &str) -> String {
    uri.trim_matches('/').to_string()
}

pub struct LocalRoutingEngine {
    routes: DashMap<String, RouteEntry>,
    inbound: DashMap<String, String>,
    gate: Arc<TransformGate>,
    xslt: Arc<dyn XsltEngine>,
    backend: Arc<dyn BackendClient>,
}

impl LocalRoutingEngine {
    #[must_use]
    pub fn new(
        gate: Arc<TransformGate>,
        xslt: Arc<dyn XsltEngine>,
        backend: Arc<dyn BackendClient>,
    ) -> Self {
        Self {
            routes: DashMap::new(),
            inbound: DashMap::new(),
            gate,
            xslt,
            backend,
        }
    }

    /// Runs one inbound message through the route bound to `local_uri` and
    /// returns the backend's reply.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] if no running route is bound to the URI, the
    /// body cannot be translated, or the transform or backend call fails.
    pub async fn dispatch(&self, local_uri: &str, body: String) -> Result<String, DispatchError> {
        let uri = normalize_uri(local_uri);
        let route_id = self
            .inbound
            .get(&uri)
            .map(|r| r.value().clone())
            .ok_or_else(|| DispatchError::NoRoute(uri.clone()))?;
        let (definition, _guard) = self.enter(&route_id)?;
        metrics::counter!("routegate_dispatches_total", "route" => route_id.clone()).increment(1);

        match definition {
            RouteDefinition::Soap {
                backend,
                transform_route,
                ..
            } => {
                let payload = if self.gate.is_enabled(&route_id) {
                    debug!(route = %route_id, "transform gate open");
                    self.run_transform_route(&transform_route, body).await?
                } else {
                    body
                };
                self.forward(&backend.url(), payload).await
            }
            RouteDefinition::Rest {
                backend,
                stylesheet,
                envelope,
                ..
            } => {
                let mut xml = json_str_to_xml(&body)?;
                if let Some(stylesheet) = stylesheet {
                    xml = self.apply_stylesheet(&stylesheet, xml).await?;
                }
                if let Some(operation) = envelope {
                    xml = soap_envelope(&xml, &operation);
                }
                self.forward(&backend.url(), xml).await
            }
            RouteDefinition::Transform { .. } => Err(DispatchError::NoRoute(uri)),
        }
    }

    /// Clones the definition of a running route and marks a dispatch in flight.
    fn enter(&self, route_id: &str) -> Result<(RouteDefinition, InFlightGuard), DispatchError> {
        let entry = self
            .routes
            .get(route_id)
            .ok_or_else(|| DispatchError::NotRunning(route_id.to_string()))?;
        if !entry.state.is_running() {
            return Err(DispatchError::NotRunning(route_id.to_string()));
        }
        Ok((
            entry.definition.clone(),
            InFlightGuard::enter(&entry.in_flight),
        ))
    }

    async fn run_transform_route(
        &self,
        route_id: &str,
        payload: String,
    ) -> Result<String, DispatchError> {
        let (definition, _guard) = self.enter(route_id)?;
        match definition {
            RouteDefinition::Transform { stylesheet } => {
                self.apply_stylesheet(&stylesheet, payload).await
            }
            _ => Err(DispatchError::NoRoute(route_id.to_string())),
        }
    }

    /// Applies `stylesheet`, passing the payload through untouched when the
    /// stylesheet file does not exist.
    async fn apply_stylesheet(
        &self,
        stylesheet: &Path,
        payload: String,
    ) -> Result<String, DispatchError> {
        if !tokio::fs::try_exists(stylesheet).await.unwrap_or(false) {
            debug!(stylesheet = %stylesheet.display(), "no stylesheet, passing through");
            return Ok(payload);
        }
        self.xslt
            .transform(stylesheet, &payload)
            .await
            .map_err(DispatchError::Transform)
    }

    async fn forward(&self, url: &str, payload: String) -> Result<String, DispatchError> {
        self.backend
            .call(url, payload)
            .await
            .map_err(DispatchError::Backend)
    }

    fn transition(&self, route_id: &str, action: RouteAction) -> Result<RouteState, EngineError> {
        let mut entry = self
            .routes
            .get_mut(route_id)
            .ok_or_else(|| EngineError::NotFound(route_id.to_string()))?;
        let next = entry
            .state
            .apply(action)
            .map_err(|source| EngineError::InvalidTransition {
                route_id: route_id.to_string(),
                source,
            })?;
        entry.state = next;
        Ok(next)
    }
}

#[async_trait]
impl RoutingEngine for LocalRoutingEngine {
    async fn install(
        &self,
        route_id: &str,
        definition: RouteDefinition,
    ) -> Result<(), EngineError> {
        let state = RouteState::Defined
            .apply(RouteAction::Install)
            .map_err(|source| EngineError::InvalidTransition {
                route_id: route_id.to_string(),
                source,
            })?;

        let Entry::Vacant(slot) = self.routes.entry(route_id.to_string()) else {
            return Err(EngineError::AlreadyInstalled(route_id.to_string()));
        };
        if let Some(uri) = definition.local_uri() {
            match self.inbound.entry(normalize_uri(uri)) {
                Entry::Occupied(bound) => {
                    return Err(EngineError::Rejected {
                        route_id: route_id.to_string(),
                        reason: format!("inbound uri {} is bound to {}", bound.key(), bound.get()),
                    });
                }
                Entry::Vacant(free) => {
                    free.insert(route_id.to_string());
                }
            }
        }
        slot.insert(RouteEntry {
            definition,
            state,
            in_flight: Arc::new(AtomicU64::new(0)),
        });
        info!(route = route_id, "route installed");
        Ok(())
    }

    async fn start(&self, route_id: &str) -> Result<(), EngineError> {
        self.transition(route_id, RouteAction::Start)?;
        info!(route = route_id, "route started");
        Ok(())
    }

    async fn stop(&self, route_id: &str) -> Result<(), EngineError> {
        self.transition(route_id, RouteAction::Stop)?;
        info!(route = route_id, "route stopped");
        Ok(())
    }

    async fn remove(&self, route_id: &str) -> Result<(), EngineError> {
        self.transition(route_id, RouteAction::Remove)?;
        if let Some((_, entry)) = self.routes.remove(route_id) {
            if let Some(uri) = entry.definition.local_uri() {
                self.inbound
                    .remove_if(&normalize_uri(uri), |_, owner| owner == route_id);
            }
        }
        info!(route = route_id, "route removed");
        Ok(())
    }

    fn status(&self, route_id: &str) -> Option<RouteStatus> {
        self.routes.get(route_id).map(|entry| RouteStatus {
            state: entry.state,
            in_flight: entry.in_flight.load(Ordering::Relaxed),
        })
    }

    fn list(&self) -> Vec<RouteSummary> {
        let mut routes: Vec<RouteSummary> = self
            .routes
            .iter()
            .map(|entry| RouteSummary {
                route_id: entry.key().clone(),
                state: entry.state,
            })
            .collect();
        routes.sort_by(|a, b| a.route_id.cmp(&b.route_id));
        routes
    }
}

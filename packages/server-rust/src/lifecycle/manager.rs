//! Route lifecycle manager.
//!
//! Every public operation takes the per-service lock first, so operations
//! on one service are serialised while different services proceed in
//! parallel. Each engine, store and directory call is bounded by
//! `operation_timeout`; a stopped route is removed only once the engine
//! reports it drained.
//!
//! Upsert order for a service `S`:
//! 1. look up the stored record;
//! 2. if a record exists or the engine still knows `S` or `S-applyXslt`,
//!    stop and remove both (missing routes are skipped);
//! 3. fill unset fields from `S.wsdl`;
//! 4. install and start the transform sub-route and the main route,
//!    rolling back on failure;
//! 5. persist the merged record;
//! 6. register with the directory, logging failures; a directory id left
//!    behind by a changed backend port is deregistered first.

use std::fmt::Display;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use routegate_core::{
    service_name_of, transform_route_id, transport_tag, BackendLocation, HostData, RouteRecord,
    RouteSpec, SoapAddress, SpecError, WsdlEndpointResolver, SOAP_CATEGORY_TAG,
};
use tracing::{debug, info, warn};

use super::config::LifecycleConfig;
use super::error::RouteError;
use super::locks::ServiceLocks;
use crate::directory::Registration;
use crate::engine::{EngineError, RouteDefinition, RouteSummary, TransformGate};
use crate::peer::NullPeerNotifier;
use crate::traits::{
    PeerNotifier, RouteConfigStore, RoutingEngine, ServiceDirectory, VariableStore,
};

/// Parses the transform flag sent with a stop request.
///
/// An empty value means "leave the flag alone". Anything else is `true`
/// only if it equals `true` ignoring case.
#[must_use]
pub fn parse_transform_flag(value: &str) -> Option<bool> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.eq_ignore_ascii_case("true"))
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn install_error(route_id: &str, reason: impl Display) -> RouteError {
    RouteError::Install {
        route_id: route_id.to_string(),
        reason: reason.to_string(),
    }
}

fn stop_error(route_id: &str, reason: &EngineError) -> RouteError {
    RouteError::Stop {
        route_id: route_id.to_string(),
        reason: reason.to_string(),
    }
}

fn record_outcome<T>(operation: &'static str, result: &Result<T, RouteError>) {
    let outcome = match result {
        Ok(_) => "ok",
        Err(e) => e.kind(),
    };
    metrics::counter!(
        "routegate_lifecycle_operations_total",
        "operation" => operation,
        "outcome" => outcome
    )
    .increment(1);
}

/// Inbound URI of a REST route: `rest_path` and the local URI joined by `/`.
fn rest_inbound_uri(spec: &RouteSpec) -> String {
    [spec.rest_path.as_deref().unwrap_or_default(), spec.local_uri()]
        .iter()
        .map(|segment| segment.trim_matches('/'))
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

pub struct RouteLifecycleManager {
    config: LifecycleConfig,
    engine: Arc<dyn RoutingEngine>,
    store: Arc<dyn RouteConfigStore>,
    variables: Arc<dyn VariableStore>,
    directory: Arc<dyn ServiceDirectory>,
    peer: Arc<dyn PeerNotifier>,
    resolver: WsdlEndpointResolver,
    gate: Arc<TransformGate>,
    locks: ServiceLocks,
}

impl RouteLifecycleManager {
    #[must_use]
    pub fn new(
        config: LifecycleConfig,
        engine: Arc<dyn RoutingEngine>,
        store: Arc<dyn RouteConfigStore>,
        variables: Arc<dyn VariableStore>,
        directory: Arc<dyn ServiceDirectory>,
        resolver: WsdlEndpointResolver,
        gate: Arc<TransformGate>,
    ) -> Self {
        Self {
            config,
            engine,
            store,
            variables,
            directory,
            peer: Arc::new(NullPeerNotifier),
            resolver,
            gate,
            locks: ServiceLocks::new(),
        }
    }

    /// Tells `peer` about every deleted service. Without it deletions stay
    /// local.
    #[must_use]
    pub fn with_peer(mut self, peer: Arc<dyn PeerNotifier>) -> Self {
        self.peer = peer;
        self
    }

    #[must_use]
    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Installs and starts a REST route that translates JSON bodies to XML
    /// and forwards them to the backend. The route is not persisted.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::Install`] if a network field is missing or the
    /// engine rejects the route.
    pub async fn add_route(&self, spec: &RouteSpec) -> Result<(), RouteError> {
        let _guard = self.locks.acquire(&spec.service_name).await;
        let result = self.add_route_locked(spec).await;
        record_outcome("add", &result);
        result
    }

    /// Creates or replaces the SOAP route pair for `spec.service_name`.
    ///
    /// # Errors
    ///
    /// - [`RouteError::Stop`] if the previous installation cannot be torn
    ///   down; nothing has changed in that case.
    /// - [`RouteError::Install`] if fields are missing or installation
    ///   fails; routes installed by this call are removed again.
    /// - [`RouteError::Store`] if the record cannot be read or written.
    /// - [`RouteError::Timeout`] if a collaborator call does not finish in
    ///   time.
    pub async fn upsert_soap_route(&self, spec: &RouteSpec) -> Result<RouteRecord, RouteError> {
        let _guard = self.locks.acquire(&spec.service_name).await;
        let result = self.upsert_locked(spec).await;
        record_outcome("upsert", &result);
        result
    }

    /// Stops `route_id`, optionally sets its service's transform flag, and
    /// starts it again. A failed restart is only logged.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::Stop`] if the route cannot be stopped, and
    /// [`RouteError::Store`] if the new flag cannot be persisted.
    pub async fn stop_route(&self, route_id: &str, transform: Option<bool>) -> Result<(), RouteError> {
        let service = service_name_of(route_id).to_string();
        let _guard = self.locks.acquire(&service).await;
        let result = self.stop_route_locked(route_id, &service, transform).await;
        record_outcome("stop", &result);
        result
    }

    /// Starts `route_id`. Failures are logged, never returned.
    pub async fn start_route(&self, route_id: &str) {
        let _guard = self.locks.acquire(service_name_of(route_id)).await;
        self.start_locked(route_id).await;
    }

    /// Removes both routes of a service, its directory entry and its record.
    ///
    /// Returns `false` when no record exists for the service.
    ///
    /// # Errors
    ///
    /// Any failure other than an already-missing route aborts the remaining
    /// steps; earlier steps are not undone.
    pub async fn delete_route(&self, service_name: &str) -> Result<bool, RouteError> {
        let _guard = self.locks.acquire(service_name).await;
        let result = self.delete_locked(service_name).await;
        record_outcome("delete", &result);
        result
    }

    /// Every route installed in the engine.
    #[must_use]
    pub fn list_routes(&self) -> Vec<RouteSummary> {
        self.engine.list()
    }

    /// Stored backend fields of a service.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::Store`] or [`RouteError::Timeout`].
    pub async fn host_data(&self, service_name: &str) -> Result<Option<HostData>, RouteError> {
        let record = self
            .store_call("store.find", self.store.find(service_name))
            .await?;
        Ok(record.as_ref().map(HostData::from))
    }

    /// Every stored route record.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::Store`] or [`RouteError::Timeout`].
    pub async fn stored_routes(&self) -> Result<Vec<RouteRecord>, RouteError> {
        self.store_call("store.list", self.store.list()).await
    }

    /// # Errors
    ///
    /// Returns [`RouteError::Store`] or [`RouteError::Timeout`].
    pub async fn get_variable(&self) -> Result<Option<String>, RouteError> {
        self.store_call("variable.get", self.variables.get_variable())
            .await
    }

    /// # Errors
    ///
    /// Returns [`RouteError::Store`] or [`RouteError::Timeout`].
    pub async fn set_variable(&self, value: &str) -> Result<(), RouteError> {
        self.store_call("variable.set", self.variables.set_variable(value))
            .await
    }

    /// Stores a record built from the service's WSDL address if none exists
    /// yet. Never installs routes.
    ///
    /// Returns `true` when a record was created.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::Store`] or [`RouteError::Timeout`].
    pub async fn seed_from_wsdl(&self, service_name: &str) -> Result<bool, RouteError> {
        let _guard = self.locks.acquire(service_name).await;
        if self
            .store_call("store.find", self.store.find(service_name))
            .await?
            .is_some()
        {
            debug!(service = service_name, "record exists, not seeding");
            return Ok(false);
        }
        let Some(location) = self.resolve(service_name).await else {
            info!(service = service_name, "WSDL has no usable address, not seeding");
            return Ok(false);
        };
        let record = RouteSpec::new(service_name)
            .coalesce(Some(&location))
            .map_err(|e| install_error(service_name, e))?;
        self.store_call("store.upsert", self.store.upsert(&record))
            .await?;
        info!(service = service_name, backend = %location.url(), "record seeded from WSDL");
        Ok(true)
    }

    // -----------------------------------------------------------------------
    // Locked bodies
    // -----------------------------------------------------------------------

    async fn add_route_locked(&self, spec: &RouteSpec) -> Result<(), RouteError> {
        let record = spec
            .coalesce(None)
            .map_err(|e| install_error(&spec.service_name, e))?;
        let definition = RouteDefinition::Rest {
            local_uri: rest_inbound_uri(spec),
            backend: record.backend(),
            stylesheet: spec
                .xslt_path
                .as_deref()
                .filter(|path| !path.is_empty())
                .map(PathBuf::from),
            envelope: Some(self.config.rest_operation.clone()),
        };
        self.install_and_start(vec![(record.service_name.clone(), definition)])
            .await?;
        info!(route = %record.service_name, backend = %record.backend().url(), "REST route added");
        Ok(())
    }

    async fn upsert_locked(&self, spec: &RouteSpec) -> Result<RouteRecord, RouteError> {
        let name = spec.service_name.as_str();
        if name.trim().is_empty() {
            return Err(install_error(name, SpecError::EmptyServiceName));
        }
        let sub = transform_route_id(name);

        let existing = self.store_call("store.find", self.store.find(name)).await?;
        let installed = self.engine.status(name).is_some() || self.engine.status(&sub).is_some();
        if existing.is_some() || installed {
            info!(service = name, "tearing down previous installation");
            self.teardown(name).await?;
            self.teardown(&sub).await?;
        }

        let resolved = self.resolve(name).await;
        let mut record = spec
            .coalesce(resolved.as_ref())
            .map_err(|e| install_error(name, e))?;
        if let Some(previous) = &existing {
            record.apply_xslt = previous.apply_xslt;
            if record.local_endpoint_name.is_none() {
                record
                    .local_endpoint_name
                    .clone_from(&previous.local_endpoint_name);
            }
        }

        let stylesheet = self.config.xslt_dir.join(format!("{name}.xslt"));
        self.install_and_start(vec![
            (sub.clone(), RouteDefinition::Transform { stylesheet }),
            (
                name.to_string(),
                RouteDefinition::Soap {
                    local_uri: record.local_uri().to_string(),
                    backend: record.backend(),
                    transform_route: sub,
                },
            ),
        ])
        .await?;
        self.gate.set(name, record.apply_xslt);

        self.store_call("store.upsert", self.store.upsert(&record))
            .await?;
        if let Some(previous) = existing.filter(|p| p.directory_id() != record.directory_id()) {
            self.deregister(&previous.directory_id()).await;
        }
        self.register(&record).await;
        info!(service = name, backend = %record.backend().url(), "SOAP route installed");
        Ok(record)
    }

    async fn stop_route_locked(
        &self,
        route_id: &str,
        service: &str,
        transform: Option<bool>,
    ) -> Result<(), RouteError> {
        self.bounded("engine.stop", self.engine.stop(route_id))
            .await?
            .map_err(|e| stop_error(route_id, &e))?;
        if let Some(enabled) = transform {
            self.gate.set(service, enabled);
            info!(service, enabled, "transform flag set");
        }
        self.start_locked(route_id).await;

        if let Some(enabled) = transform {
            let stored = self.store_call("store.find", self.store.find(service)).await?;
            if let Some(mut record) = stored.filter(|r| r.apply_xslt != enabled) {
                record.apply_xslt = enabled;
                self.store_call("store.upsert", self.store.upsert(&record))
                    .await?;
            }
        }
        Ok(())
    }

    async fn start_locked(&self, route_id: &str) {
        match self.bounded("engine.start", self.engine.start(route_id)).await {
            Ok(Ok(())) => debug!(route = route_id, "route start issued"),
            Ok(Err(e)) => warn!(route = route_id, error = %e, "failed to start route"),
            Err(e) => warn!(route = route_id, error = %e, "failed to start route"),
        }
    }

    async fn delete_locked(&self, name: &str) -> Result<bool, RouteError> {
        let Some(record) = self.store_call("store.find", self.store.find(name)).await? else {
            info!(service = name, "no stored route, nothing to delete");
            return Ok(false);
        };

        let main_installed = self.engine.status(name).is_some();
        self.teardown(name).await?;
        if main_installed {
            self.notify_peer(name).await;
        }
        self.teardown(&transform_route_id(name)).await?;
        self.gate.clear(name);

        self.deregister(&record.directory_id()).await;

        self.store_call("store.delete", self.store.delete(name))
            .await?;
        info!(service = name, "route deleted");
        Ok(true)
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    async fn bounded<F: Future>(
        &self,
        operation: &'static str,
        fut: F,
    ) -> Result<F::Output, RouteError> {
        tokio::time::timeout(self.config.operation_timeout, fut)
            .await
            .map_err(|_elapsed| RouteError::Timeout {
                operation,
                timeout_ms: millis(self.config.operation_timeout),
            })
    }

    async fn store_call<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = anyhow::Result<T>>,
    ) -> Result<T, RouteError> {
        self.bounded(operation, fut).await?.map_err(RouteError::Store)
    }

    /// Stops and removes `route_id`. A route the engine does not know is
    /// skipped.
    async fn teardown(&self, route_id: &str) -> Result<(), RouteError> {
        match self.bounded("engine.stop", self.engine.stop(route_id)).await? {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                debug!(route = route_id, "not installed, skipping");
                return Ok(());
            }
            Err(e) => return Err(stop_error(route_id, &e)),
        }
        self.wait_for_drain(route_id).await?;
        match self.bounded("engine.remove", self.engine.remove(route_id)).await? {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(stop_error(route_id, &e)),
        }
    }

    /// Polls the engine until `route_id` is stopped with nothing in flight.
    async fn wait_for_drain(&self, route_id: &str) -> Result<(), RouteError> {
        let deadline = tokio::time::Instant::now() + self.config.drain_timeout;
        loop {
            match self.engine.status(route_id) {
                None => return Ok(()),
                Some(status) if status.is_drained() => return Ok(()),
                Some(_) => {}
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(RouteError::Timeout {
                    operation: "drain",
                    timeout_ms: millis(self.config.drain_timeout),
                });
            }
            tokio::time::sleep(self.config.drain_poll).await;
        }
    }

    /// Installs every route in order, then starts them in the same order.
    /// On failure, routes installed by this call are torn down again.
    async fn install_and_start(
        &self,
        routes: Vec<(String, RouteDefinition)>,
    ) -> Result<(), RouteError> {
        let mut installed = Vec::with_capacity(routes.len());
        let result = self.try_install_and_start(routes, &mut installed).await;
        if let Err(e) = &result {
            warn!(error = %e, "install failed, rolling back");
            for route_id in installed.iter().rev() {
                if let Err(rollback) = self.teardown(route_id).await {
                    warn!(route = %route_id, error = %rollback, "rollback failed");
                }
            }
        }
        result
    }

    async fn try_install_and_start(
        &self,
        routes: Vec<(String, RouteDefinition)>,
        installed: &mut Vec<String>,
    ) -> Result<(), RouteError> {
        for (route_id, definition) in routes {
            self.bounded("engine.install", self.engine.install(&route_id, definition))
                .await?
                .map_err(|e| install_error(&route_id, e))?;
            installed.push(route_id);
        }
        for route_id in &*installed {
            self.bounded("engine.start", self.engine.start(route_id))
                .await?
                .map_err(|e| install_error(route_id, e))?;
        }
        Ok(())
    }

    async fn resolve(&self, service_name: &str) -> Option<BackendLocation> {
        let resolver = self.resolver.clone();
        let name = service_name.to_string();
        tokio::task::spawn_blocking(move || resolver.backend_location(&name))
            .await
            .unwrap_or_else(|e| {
                warn!(service = service_name, error = %e, "WSDL resolution task failed");
                None
            })
    }

    async fn classify(&self, service_name: &str) -> Vec<SoapAddress> {
        let resolver = self.resolver.clone();
        let name = service_name.to_string();
        tokio::task::spawn_blocking(move || resolver.classify(&name))
            .await
            .unwrap_or_else(|e| {
                warn!(service = service_name, error = %e, "WSDL classification task failed");
                Vec::new()
            })
    }

    async fn deregister(&self, id: &str) {
        match self
            .bounded("directory.deregister", self.directory.deregister(id))
            .await
        {
            Ok(Ok(())) => debug!(id, "deregistered"),
            Ok(Err(e)) => warn!(id, error = %e, "directory deregistration failed"),
            Err(e) => warn!(id, error = %e, "directory deregistration failed"),
        }
    }

    async fn notify_peer(&self, service_name: &str) {
        match self
            .bounded("peer.notify", self.peer.route_deleted(service_name))
            .await
        {
            Ok(Ok(())) => debug!(service = service_name, "peer notified"),
            Ok(Err(e)) => warn!(service = service_name, error = %e, "peer notification failed"),
            Err(e) => warn!(service = service_name, error = %e, "peer notification failed"),
        }
    }

    async fn register(&self, record: &RouteRecord) {
        let classified = self.classify(&record.service_name).await;
        let registration = Registration {
            name: record.service_name.clone(),
            id: record.directory_id(),
            address: self.config.advertise_host.clone(),
            port: self.config.advertise_port,
            tags: vec![transport_tag(&classified), SOAP_CATEGORY_TAG.to_string()],
        };
        match self
            .bounded("directory.register", self.directory.register(&registration))
            .await
        {
            Ok(Ok(())) => info!(id = %registration.id, tags = ?registration.tags, "registered with directory"),
            Ok(Err(e)) => warn!(id = %registration.id, error = %e, "directory registration failed"),
            Err(e) => warn!(id = %registration.id, error = %e, "directory registration failed"),
        }
    }
}

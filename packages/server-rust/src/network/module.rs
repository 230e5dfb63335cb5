//! Server lifecycle with deferred startup.
//!
//! `new()` wires shared state, `start()` binds the listener, and `serve()`
//! accepts connections until the shutdown future resolves. The split lets
//! the binary report the bound port before traffic is accepted.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tracing::{info, warn};

use super::config::{NetworkConfig, TlsConfig};
use super::handlers::{
    add_route_handler, data_host_handler, delete_route_handler, dispatch_handler,
    get_variable_handler, health_handler, list_routes_handler, liveness_handler,
    modify_route_handler, readiness_handler, set_variable_handler, soap_route_handler,
    start_route_handler, stop_route_handler, upload_wsdl_handler, upload_xslt_handler, AppState,
};
use super::middleware::{build_http_layers, track_in_flight};
use super::shutdown::ShutdownController;
use crate::artifacts::ArtifactStore;
use crate::engine::LocalRoutingEngine;
use crate::lifecycle::RouteLifecycleManager;

/// Assembles every route and layer around `state`.
///
/// Admin and data-plane routes answer 503 unless the server is ready;
/// probes are always served.
pub fn build_router(state: AppState) -> Router {
    let layers = build_http_layers(&state.config);
    let body_limit = state.config.max_body_bytes;

    let gated = Router::new()
        .route("/dynamic/add", post(add_route_handler))
        .route("/dynamic/soap", post(soap_route_handler))
        .route("/dynamic/modify", post(modify_route_handler))
        .route("/dynamic/stopRoute", post(stop_route_handler))
        .route("/dynamic/startRoute", post(start_route_handler))
        .route("/dynamic/deleteRoute", post(delete_route_handler))
        .route("/dynamic/uploadwsdl", post(upload_wsdl_handler))
        .route("/dynamic/uploadxslt", post(upload_xslt_handler))
        .route("/dynamic/dataHost", post(data_host_handler))
        .route("/dynamic/variable", post(set_variable_handler))
        .route("/dynamic/getVariable", get(get_variable_handler))
        .route("/dynamic/routes", get(list_routes_handler))
        .route("/services/{*local_uri}", post(dispatch_handler))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            track_in_flight,
        ));

    gated
        .route("/health", get(health_handler))
        .route("/health/live", get(liveness_handler))
        .route("/health/ready", get(readiness_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(layers)
        .with_state(state)
}

pub struct NetworkModule {
    config: NetworkConfig,
    listener: Option<TcpListener>,
    manager: Arc<RouteLifecycleManager>,
    engine: Arc<LocalRoutingEngine>,
    artifacts: Arc<ArtifactStore>,
    shutdown: Arc<ShutdownController>,
}

impl NetworkModule {
    /// Creates the module without binding any port.
    #[must_use]
    pub fn new(
        config: NetworkConfig,
        manager: Arc<RouteLifecycleManager>,
        engine: Arc<LocalRoutingEngine>,
        artifacts: Arc<ArtifactStore>,
    ) -> Self {
        Self {
            config,
            listener: None,
            manager,
            engine,
            artifacts,
            shutdown: Arc::new(ShutdownController::new()),
        }
    }

    #[must_use]
    pub fn shutdown_controller(&self) -> Arc<ShutdownController> {
        Arc::clone(&self.shutdown)
    }

    fn app_state(&self) -> AppState {
        AppState {
            manager: Arc::clone(&self.manager),
            engine: Arc::clone(&self.engine),
            artifacts: Arc::clone(&self.artifacts),
            shutdown: Arc::clone(&self.shutdown),
            config: Arc::new(self.config.clone()),
            start_time: Instant::now(),
        }
    }

    /// Binds the listener and returns the bound port, which differs from
    /// the configured one when port 0 is used.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound.
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        let port = listener.local_addr()?.port();
        info!(host = %self.config.host, port, "listener bound");
        self.listener = Some(listener);
        Ok(port)
    }

    /// Serves until `shutdown` resolves, then waits for in-flight requests.
    ///
    /// # Errors
    ///
    /// Returns an error if `start()` was not called first, if TLS material
    /// cannot be loaded, or on a fatal I/O error.
    pub async fn serve(
        mut self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let listener = self
            .listener
            .take()
            .ok_or_else(|| anyhow::anyhow!("start() must be called before serve()"))?;
        let router = build_router(self.app_state());
        let controller = Arc::clone(&self.shutdown);

        controller.set_ready();

        match &self.config.tls {
            Some(tls) => serve_tls(listener, router, tls, Arc::clone(&controller), shutdown).await?,
            None => serve_plain(listener, router, Arc::clone(&controller), shutdown).await?,
        }

        if controller
            .wait_for_drain(self.config.shutdown_drain_timeout)
            .await
        {
            info!("all requests drained");
        } else {
            warn!(
                in_flight = controller.in_flight_count(),
                "drain timeout expired with requests in flight"
            );
        }
        Ok(())
    }
}

async fn serve_plain(
    listener: TcpListener,
    router: Router,
    controller: Arc<ShutdownController>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    info!("serving plain HTTP");
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            shutdown.await;
            controller.trigger_shutdown();
        })
        .await?;
    Ok(())
}

async fn serve_tls(
    listener: TcpListener,
    router: Router,
    tls: &TlsConfig,
    controller: Arc<ShutdownController>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    use axum_server::tls_rustls::RustlsConfig;

    let rustls_config = RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path)
        .await
        .map_err(|e| anyhow::anyhow!("failed to load TLS certificates: {e}"))?;

    let addr = listener.local_addr()?;
    let std_listener = listener.into_std()?;
    let handle = axum_server::Handle::new();
    let shutdown_handle = handle.clone();

    tokio::spawn(async move {
        shutdown.await;
        controller.trigger_shutdown();
        shutdown_handle.graceful_shutdown(None);
    });

    info!(%addr, "serving HTTPS");
    axum_server::from_tcp_rustls(std_listener, rustls_config)
        .handle(handle)
        .serve(router.into_make_service())
        .await?;
    Ok(())
}

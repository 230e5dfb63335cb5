//! `routegate` binary: wires storage, the routing engine, the lifecycle
//! manager and the HTTP server from command-line flags and environment.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use routegate_core::WsdlEndpointResolver;
use routegate_server::artifacts::ArtifactStore;
use routegate_server::directory::{ConsulDirectory, NullDirectory};
use routegate_server::engine::{HttpBackendClient, LocalRoutingEngine, TransformGate, XsltProcEngine};
use routegate_server::network::{NetworkConfig, NetworkModule, TlsConfig};
use routegate_server::peer::{HttpPeerNotifier, NullPeerNotifier};
use routegate_server::storage::MemoryStore;
use routegate_server::{
    LifecycleConfig, PeerNotifier, RouteConfigStore, RouteLifecycleManager, RoutingEngine,
    ServiceDirectory, VariableStore,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StoreKind {
    Memory,
    Redb,
}

/// Runtime-reconfigurable SOAP/REST integration gateway.
#[derive(Debug, Parser)]
#[command(name = "routegate", version)]
struct Cli {
    #[arg(long, env = "GATEWAY_HOST", default_value = "0.0.0.0")]
    host: String,
    #[arg(long, env = "GATEWAY_PORT", default_value_t = 8080)]
    port: u16,
    #[arg(long, env = "WSDL_DIR", default_value = "wsdl")]
    wsdl_dir: PathBuf,
    #[arg(long, env = "XSLT_DIR", default_value = "xslt")]
    xslt_dir: PathBuf,
    #[arg(long, value_enum, default_value_t = StoreKind::Redb)]
    store: StoreKind,
    #[arg(long, env = "STORE_PATH", default_value = "routegate.redb")]
    store_path: PathBuf,
    /// Consul agent host. Without it, directory registration is disabled.
    #[arg(long, env = "DIRECTORY_HOST")]
    directory_host: Option<String>,
    #[arg(long, env = "DIRECTORY_PORT", default_value_t = 8500)]
    directory_port: u16,
    /// Companion local-endpoint service told about deleted routes. Without
    /// it, deletions are not forwarded.
    #[arg(long, env = "PEER_HOST")]
    peer_host: Option<String>,
    #[arg(long, env = "PEER_PORT", default_value_t = 12504)]
    peer_port: u16,
    #[arg(long, env = "ADVERTISE_HOST", default_value = "localhost")]
    advertise_host: String,
    #[arg(long, env = "ADVERTISE_PORT", default_value_t = 12505)]
    advertise_port: u16,
    #[arg(long, env = "OPERATION_TIMEOUT_MS", default_value_t = 10_000)]
    operation_timeout_ms: u64,
    #[arg(long, env = "DRAIN_TIMEOUT_MS", default_value_t = 1_000)]
    drain_timeout_ms: u64,
    #[arg(long, env = "BACKEND_TIMEOUT_MS", default_value_t = 30_000)]
    backend_timeout_ms: u64,
    /// XSLT processor invoked as `<program> <stylesheet> -`.
    #[arg(long, env = "XSLT_PROGRAM", default_value = "xsltproc")]
    xslt_program: PathBuf,
    #[arg(long, env = "TLS_CERT", requires = "tls_key")]
    tls_cert: Option<PathBuf>,
    #[arg(long, env = "TLS_KEY", requires = "tls_cert")]
    tls_key: Option<PathBuf>,
    /// Serve Prometheus metrics on this port.
    #[arg(long, env = "METRICS_PORT")]
    metrics_port: Option<u16>,
    /// Emit logs as JSON lines.
    #[arg(long)]
    log_json: bool,
}

impl Cli {
    fn network_config(&self) -> NetworkConfig {
        let tls = match (&self.tls_cert, &self.tls_key) {
            (Some(cert_path), Some(key_path)) => Some(TlsConfig {
                cert_path: cert_path.clone(),
                key_path: key_path.clone(),
            }),
            _ => None,
        };
        NetworkConfig {
            host: self.host.clone(),
            port: self.port,
            tls,
            ..NetworkConfig::default()
        }
    }

    fn lifecycle_config(&self) -> LifecycleConfig {
        LifecycleConfig {
            operation_timeout: Duration::from_millis(self.operation_timeout_ms),
            drain_timeout: Duration::from_millis(self.drain_timeout_ms),
            xslt_dir: self.xslt_dir.clone(),
            advertise_host: self.advertise_host.clone(),
            advertise_port: self.advertise_port,
            ..LifecycleConfig::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

type Stores = (Arc<dyn RouteConfigStore>, Arc<dyn VariableStore>);

fn open_store(kind: StoreKind, path: &std::path::Path) -> anyhow::Result<Stores> {
    match kind {
        StoreKind::Memory => {
            let store = Arc::new(MemoryStore::new());
            let variables: Arc<dyn VariableStore> = store.clone();
            let routes: Arc<dyn RouteConfigStore> = store;
            Ok((routes, variables))
        }
        #[cfg(feature = "redb")]
        StoreKind::Redb => {
            let store = Arc::new(routegate_server::storage::RedbStore::open(path)?);
            info!(path = %path.display(), "route store opened");
            let variables: Arc<dyn VariableStore> = store.clone();
            let routes: Arc<dyn RouteConfigStore> = store;
            Ok((routes, variables))
        }
        #[cfg(not(feature = "redb"))]
        StoreKind::Redb => {
            anyhow::bail!("built without the redb feature; use --store memory ({})", path.display())
        }
    }
}

fn open_directory(cli: &Cli) -> anyhow::Result<Arc<dyn ServiceDirectory>> {
    match &cli.directory_host {
        Some(host) => {
            let directory = ConsulDirectory::new(host, cli.directory_port, Duration::from_secs(5))
                .context("failed to build directory client")?;
            info!(agent = %directory.base_url(), "service directory enabled");
            Ok(Arc::new(directory))
        }
        None => {
            info!("no directory host configured, registration disabled");
            Ok(Arc::new(NullDirectory))
        }
    }
}

fn open_peer(cli: &Cli) -> anyhow::Result<Arc<dyn PeerNotifier>> {
    match &cli.peer_host {
        Some(host) => {
            let peer = HttpPeerNotifier::new(host, cli.peer_port, Duration::from_secs(5))
                .context("failed to build peer client")?;
            info!(url = %peer.url(), "deletion notices enabled");
            Ok(Arc::new(peer))
        }
        None => Ok(Arc::new(NullPeerNotifier)),
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    if let Some(port) = cli.metrics_port {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("failed to start metrics listener")?;
        info!(%addr, "metrics listener started");
    }

    let (store, variables) = open_store(cli.store, &cli.store_path)?;
    let directory = open_directory(&cli)?;

    let gate = Arc::new(TransformGate::new());
    let backend = HttpBackendClient::new(Duration::from_millis(cli.backend_timeout_ms))?;
    let engine = Arc::new(LocalRoutingEngine::new(
        Arc::clone(&gate),
        Arc::new(XsltProcEngine::with_program(cli.xslt_program.clone())),
        Arc::new(backend),
    ));

    let manager = Arc::new(RouteLifecycleManager::new(
        cli.lifecycle_config(),
        Arc::clone(&engine) as Arc<dyn RoutingEngine>,
        store,
        variables,
        directory,
        WsdlEndpointResolver::new(&cli.wsdl_dir),
        gate,
    )
    .with_peer(open_peer(&cli)?));
    let artifacts = Arc::new(ArtifactStore::new(&cli.wsdl_dir, &cli.xslt_dir));

    let mut network = NetworkModule::new(cli.network_config(), manager, engine, artifacts);
    let port = network.start().await?;
    info!(port, "routegate listening");

    network.serve(shutdown_signal()).await?;
    info!("routegate stopped");
    Ok(())
}

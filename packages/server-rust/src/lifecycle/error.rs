/// Errors returned by [`RouteLifecycleManager`](super::RouteLifecycleManager)
/// operations.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("failed to install route {route_id}: {reason}")]
    Install { route_id: String, reason: String },
    #[error("failed to stop route {route_id}: {reason}")]
    Stop { route_id: String, reason: String },
    #[error("route store failure: {0:#}")]
    Store(anyhow::Error),
    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout {
        operation: &'static str,
        timeout_ms: u64,
    },
}

impl RouteError {
    /// Short label used for metrics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Install { .. } => "install",
            Self::Stop { .. } => "stop",
            Self::Store(_) => "store",
            Self::Timeout { .. } => "timeout",
        }
    }
}

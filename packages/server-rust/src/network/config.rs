//! Listener and HTTP settings for the admin and data-plane server.

use std::path::PathBuf;
use std::time::Duration;

/// Network settings for the gateway's HTTP server.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Bind address.
    pub host: String,
    /// Listen port. 0 means OS-assigned.
    pub port: u16,
    pub tls: Option<TlsConfig>,
    /// Allowed CORS origins; `"*"` allows any.
    pub cors_origins: Vec<String>,
    /// Upper bound for a single request, including the backend call.
    pub request_timeout: Duration,
    /// Largest accepted request body, artifact uploads included.
    pub max_body_bytes: usize,
    /// How long shutdown waits for in-flight requests.
    pub shutdown_drain_timeout: Duration,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 0,
            tls: None,
            cors_origins: vec!["*".to_string()],
            request_timeout: Duration::from_secs(30),
            max_body_bytes: 10 * 1024 * 1024,
            shutdown_drain_timeout: Duration::from_secs(30),
        }
    }
}

/// PEM certificate and key for serving HTTPS.
///
/// No `Default`: there is no sensible default path.
#[derive(Debug, Clone)]
pub struct TlsConfig {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_config_defaults() {
        let config = NetworkConfig::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 0);
        assert!(config.tls.is_none());
        assert_eq!(config.cors_origins, vec!["*"]);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.max_body_bytes, 10 * 1024 * 1024);
    }
}

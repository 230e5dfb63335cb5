use std::path::PathBuf;
use std::time::Duration;

use routegate_core::{SoapOperation, ROOT_ELEMENT};

/// Settings for the route lifecycle manager.
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// Upper bound for each engine, store, or directory call.
    pub operation_timeout: Duration,
    /// How long a stopped route may take to drain before removal fails.
    pub drain_timeout: Duration,
    /// Interval between drain checks.
    pub drain_poll: Duration,
    /// Directory holding `<service>.xslt` stylesheets.
    pub xslt_dir: PathBuf,
    /// Address advertised to the service directory.
    pub advertise_host: String,
    /// Port advertised to the service directory.
    pub advertise_port: u16,
    /// SOAP operation wrapped around translated REST payloads.
    pub rest_operation: SoapOperation,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            operation_timeout: Duration::from_secs(10),
            drain_timeout: Duration::from_secs(1),
            drain_poll: Duration::from_millis(10),
            xslt_dir: PathBuf::from("xslt"),
            advertise_host: "localhost".to_string(),
            advertise_port: 12505,
            rest_operation: SoapOperation {
                name: ROOT_ELEMENT.to_string(),
                namespace: "urn:routegate:gen".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_config_defaults() {
        let config = LifecycleConfig::default();
        assert_eq!(config.operation_timeout, Duration::from_secs(10));
        assert_eq!(config.drain_timeout, Duration::from_secs(1));
        assert_eq!(config.drain_poll, Duration::from_millis(10));
        assert_eq!(config.advertise_host, "localhost");
        assert_eq!(config.advertise_port, 12505);
        assert_eq!(config.rest_operation.name, "processCardXmlRequest");
    }
}

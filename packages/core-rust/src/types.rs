use serde::{Deserialize, Serialize};
use url::Url;

/// Suffix appended to a service name to form its transform sub-route id.
pub const TRANSFORM_ROUTE_SUFFIX: &str = "-applyXslt";

/// Fixed category tag attached to every directory registration.
pub const SOAP_CATEGORY_TAG: &str = "soap";

/// Returns the route id of the transform sub-route paired with `service_name`.
#[must_use]
pub fn transform_route_id(service_name: &str) -> String {
    format!("{service_name}{TRANSFORM_ROUTE_SUFFIX}")
}

/// Maps either route id of a pair back to the owning service name.
#[must_use]
pub fn service_name_of(route_id: &str) -> &str {
    route_id
        .strip_suffix(TRANSFORM_ROUTE_SUFFIX)
        .unwrap_or(route_id)
}

/// Treats empty strings the same as absent values.
fn explicit(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// BackendLocation
// ---------------------------------------------------------------------------

/// Network location of a backend service, split into its URL parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendLocation {
    pub protocol: String,
    pub host: String,
    pub port: u16,
    pub path: String,
}

impl BackendLocation {
    /// Parses an absolute URL such as `http://h:80/p`.
    ///
    /// When the URL carries no explicit port the scheme default is used.
    /// Returns `None` for relative or host-less URLs.
    #[must_use]
    pub fn parse(location: &str) -> Option<Self> {
        let url = Url::parse(location).ok()?;
        let host = url.host_str()?.to_string();
        let port = url.port_or_known_default()?;
        Some(Self {
            protocol: url.scheme().to_string(),
            host,
            port,
            path: url.path().to_string(),
        })
    }

    /// Renders the location back into a URL string.
    #[must_use]
    pub fn url(&self) -> String {
        format!("{}://{}:{}{}", self.protocol, self.host, self.port, self.path)
    }
}

// ---------------------------------------------------------------------------
// RouteSpec
// ---------------------------------------------------------------------------

/// Errors raised while turning a [`RouteSpec`] into an installable record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpecError {
    #[error("service name must not be empty")]
    EmptyServiceName,
    #[error("service {service}: no {field} given and none resolvable from its WSDL")]
    MissingField {
        service: String,
        field: &'static str,
    },
}

/// Route specification as submitted by an operator.
///
/// Every field except `service_name` may be left unset (or empty) to ask for
/// resolution from the service's WSDL artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteSpec {
    pub service_name: String,
    pub protocol: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub path: Option<String>,
    pub local_uri: Option<String>,
    pub xslt_path: Option<String>,
    pub rest_port: Option<u16>,
    pub rest_path: Option<String>,
}

impl RouteSpec {
    /// Creates a spec with only the service name set.
    #[must_use]
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            ..Self::default()
        }
    }

    /// Local inbound URI of the route; defaults to the service name.
    #[must_use]
    pub fn local_uri(&self) -> &str {
        explicit(self.local_uri.as_ref()).unwrap_or(&self.service_name)
    }

    /// Merges this route spec with a location resolved from the WSDL artifact.
    ///
    /// An explicit value given here always wins over the resolved default.
    /// A port left unset everywhere falls back to the protocol's well-known
    /// port.
    ///
    /// # Errors
    ///
    /// Returns [`SpecError`] when the service name is empty or a network
    /// field is neither given nor resolvable.
    pub fn coalesce(&self, resolved: Option<&BackendLocation>) -> Result<RouteRecord, SpecError> {
        if self.service_name.trim().is_empty() {
            return Err(SpecError::EmptyServiceName);
        }
        let missing = |field| SpecError::MissingField {
            service: self.service_name.clone(),
            field,
        };

        let protocol = explicit(self.protocol.as_ref())
            .or(resolved.map(|r| r.protocol.as_str()))
            .ok_or_else(|| missing("protocol"))?
            .to_string();
        let host = explicit(self.host.as_ref())
            .or(resolved.map(|r| r.host.as_str()))
            .ok_or_else(|| missing("host"))?
            .to_string();
        let port = self
            .port
            .or(resolved.map(|r| r.port))
            .or_else(|| default_port(&protocol))
            .ok_or_else(|| missing("port"))?;
        let path = explicit(self.path.as_ref())
            .or(resolved.map(|r| r.path.as_str()))
            .unwrap_or("/")
            .to_string();

        Ok(RouteRecord {
            service_name: self.service_name.clone(),
            protocol,
            host,
            port,
            path,
            local_endpoint_name: None,
            local_endpoint_port: self.rest_port,
            local_endpoint_uri: Some(self.local_uri().to_string()),
            apply_xslt: false,
        })
    }
}

fn default_port(protocol: &str) -> Option<u16> {
    match protocol {
        "http" => Some(80),
        "https" => Some(443),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// RouteRecord
// ---------------------------------------------------------------------------

/// Persisted route configuration; one record per service name.
///
/// Field names on the wire follow the `service` collection schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRecord {
    #[serde(rename = "nameService")]
    pub service_name: String,
    #[serde(rename = "protocolService")]
    pub protocol: String,
    #[serde(rename = "hostService")]
    pub host: String,
    #[serde(rename = "portService")]
    pub port: u16,
    #[serde(rename = "pathService")]
    pub path: String,
    #[serde(rename = "nameLocalEndpoint", default, skip_serializing_if = "Option::is_none")]
    pub local_endpoint_name: Option<String>,
    #[serde(rename = "portLocalEndpoint", default, skip_serializing_if = "Option::is_none")]
    pub local_endpoint_port: Option<u16>,
    #[serde(rename = "uriLocalEndpoint", default, skip_serializing_if = "Option::is_none")]
    pub local_endpoint_uri: Option<String>,
    /// Whether dispatches pass through the transform sub-route.
    #[serde(rename = "applyXslt", default)]
    pub apply_xslt: bool,
}

impl RouteRecord {
    /// Backend location this record forwards to.
    #[must_use]
    pub fn backend(&self) -> BackendLocation {
        BackendLocation {
            protocol: self.protocol.clone(),
            host: self.host.clone(),
            port: self.port,
            path: self.path.clone(),
        }
    }

    /// Inbound URI the main route listens on.
    #[must_use]
    pub fn local_uri(&self) -> &str {
        explicit(self.local_endpoint_uri.as_ref()).unwrap_or(&self.service_name)
    }

    /// Directory registration id: `<service>-<backend port>`.
    #[must_use]
    pub fn directory_id(&self) -> String {
        format!("{}-{}", self.service_name, self.port)
    }
}

/// Backend fields of a stored route, as reported by host-data lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostData {
    #[serde(rename = "hostService")]
    pub host: String,
    #[serde(rename = "portService")]
    pub port: u16,
    #[serde(rename = "protocolService")]
    pub protocol: String,
    #[serde(rename = "uriService")]
    pub path: String,
}

impl From<&RouteRecord> for HostData {
    fn from(record: &RouteRecord) -> Self {
        Self {
            host: record.host.clone(),
            port: record.port,
            protocol: record.protocol.clone(),
            path: record.path.clone(),
        }
    }
}

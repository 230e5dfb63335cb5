//! Convention-based backend address extraction from WSDL artifacts.
//!
//! A service named `billing` is described by `<wsdl_dir>/billing.wsdl`. The
//! extractor is a line scanner, not an XML parser: documents are read
//! top-to-bottom and the first matching line wins.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::types::BackendLocation;

static SOAP11_ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<soap:address\s+location="(.*?)"\s*/>"#).expect("valid SOAP 1.1 pattern")
});

static SOAP12_ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<soap12:address\s+location="(.*?)"\s*/>"#).expect("valid SOAP 1.2 pattern")
});

static UNPREFIXED_ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<address\s+location="([^"]*)""#).expect("valid unprefixed pattern")
});

const SOAP11_NAMESPACE: &str = r#"xmlns:soap="http://schemas.xmlsoap.org/wsdl/soap/""#;

/// How a candidate address was recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SoapVersion {
    /// `<soap:address location="..."/>`
    Soap11,
    /// `<soap12:address location="..."/>`
    Soap12,
    /// `<address location="..."/>` with no namespace prefix.
    Soap11Unprefixed,
    /// The SOAP 1.1 binding namespace is declared in the document.
    Soap11Namespace,
}

impl SoapVersion {
    /// Transport label used in directory tags.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Soap11 | Self::Soap11Unprefixed | Self::Soap11Namespace => "SOAP 1.1",
            Self::Soap12 => "SOAP 1.2",
        }
    }
}

impl fmt::Display for SoapVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A candidate address found while classifying a WSDL document.
///
/// For [`SoapVersion::Soap11Namespace`] entries `location` holds the artifact
/// file name, since the declaration carries no address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SoapAddress {
    pub version: SoapVersion,
    pub location: String,
}

/// Returns the first `soap:address` location in `content`, scanning by line.
#[must_use]
pub fn first_soap_address(content: &str) -> Option<&str> {
    content.lines().find_map(|line| {
        SOAP11_ADDRESS
            .captures(line)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    })
}

/// Classifies every candidate address in `content`, in document order.
#[must_use]
pub fn classify_document(content: &str, file_name: &str) -> Vec<SoapAddress> {
    let mut found = Vec::new();
    for line in content.lines() {
        let mut push = |version, location: &str| {
            found.push(SoapAddress {
                version,
                location: location.to_string(),
            });
        };
        if let Some(m) = SOAP11_ADDRESS.captures(line).and_then(|c| c.get(1)) {
            push(SoapVersion::Soap11, m.as_str());
        }
        if let Some(m) = SOAP12_ADDRESS.captures(line).and_then(|c| c.get(1)) {
            push(SoapVersion::Soap12, m.as_str());
        }
        if let Some(m) = UNPREFIXED_ADDRESS.captures(line).and_then(|c| c.get(1)) {
            push(SoapVersion::Soap11Unprefixed, m.as_str());
        }
        if line.contains(SOAP11_NAMESPACE) {
            push(SoapVersion::Soap11Namespace, file_name);
        }
    }
    found
}

/// Builds the directory transport tag from classified addresses.
///
/// Distinct labels in order of first appearance, joined by `,`. Returns
/// `"unknown"` when nothing was classified.
#[must_use]
pub fn transport_tag(addresses: &[SoapAddress]) -> String {
    let mut labels: Vec<&str> = Vec::new();
    for address in addresses {
        let label = address.version.label();
        if !labels.contains(&label) {
            labels.push(label);
        }
    }
    if labels.is_empty() {
        "unknown".to_string()
    } else {
        labels.join(",")
    }
}

// ---------------------------------------------------------------------------
// WsdlEndpointResolver
// ---------------------------------------------------------------------------

/// Looks up `<service>.wsdl` in a fixed directory and extracts addresses.
///
/// Absence is never an error: a missing file, an unreadable file, or a
/// document without a usable address all mean "no default available".
#[derive(Debug, Clone)]
pub struct WsdlEndpointResolver {
    dir: PathBuf,
}

impl WsdlEndpointResolver {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory scanned for WSDL artifacts.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the artifact for `service_name`.
    #[must_use]
    pub fn path_for(&self, service_name: &str) -> PathBuf {
        self.dir.join(format!("{service_name}.wsdl"))
    }

    /// Resolves the backend location advertised by the service's WSDL.
    #[must_use]
    pub fn backend_location(&self, service_name: &str) -> Option<BackendLocation> {
        let content = self.read(service_name)?;
        let Some(location) = first_soap_address(&content) else {
            debug!(service = service_name, "WSDL has no soap:address");
            return None;
        };
        let parsed = BackendLocation::parse(location);
        if parsed.is_none() {
            warn!(service = service_name, location, "unparseable soap:address location");
        }
        parsed
    }

    /// Classifies candidate addresses for directory tagging.
    #[must_use]
    pub fn classify(&self, service_name: &str) -> Vec<SoapAddress> {
        let Some(content) = self.read(service_name) else {
            return Vec::new();
        };
        classify_document(&content, &format!("{service_name}.wsdl"))
    }

    fn read(&self, service_name: &str) -> Option<String> {
        let path = self.path_for(service_name);
        match std::fs::read_to_string(&path) {
            Ok(content) => Some(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(service = service_name, path = %path.display(), "no WSDL artifact");
                None
            }
            Err(e) => {
                warn!(service = service_name, path = %path.display(), error = %e, "failed to read WSDL artifact");
                None
            }
        }
    }
}

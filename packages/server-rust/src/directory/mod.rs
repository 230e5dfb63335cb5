//! Service directory clients that advertise installed routes.

pub mod consul;
pub mod memory;
pub mod null;

use serde::Serialize;

pub use consul::ConsulDirectory;
pub use memory::MemoryDirectory;
pub use null::NullDirectory;

/// One advertised address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Registration {
    pub name: String,
    /// `<service>-<backend port>`.
    pub id: String,
    pub address: String,
    pub port: u16,
    /// `[transport tag, "soap"]`.
    pub tags: Vec<String>,
}

/// Directory failures. Callers log these; they never undo a route change.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("directory unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("directory rejected request with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

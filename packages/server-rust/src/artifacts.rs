//! Filesystem storage for uploaded WSDL and XSLT artifacts.
//!
//! A service named `billing` owns `<wsdl_dir>/billing.wsdl` and
//! `<xslt_dir>/billing.xslt`; uploads overwrite.

use std::path::{Path, PathBuf};

use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("invalid artifact name {0:?}")]
    InvalidName(String),
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    wsdl_dir: PathBuf,
    xslt_dir: PathBuf,
}

impl ArtifactStore {
    #[must_use]
    pub fn new(wsdl_dir: impl Into<PathBuf>, xslt_dir: impl Into<PathBuf>) -> Self {
        Self {
            wsdl_dir: wsdl_dir.into(),
            xslt_dir: xslt_dir.into(),
        }
    }

    #[must_use]
    pub fn wsdl_dir(&self) -> &Path {
        &self.wsdl_dir
    }

    #[must_use]
    pub fn xslt_dir(&self) -> &Path {
        &self.xslt_dir
    }

    /// Writes `<name>.wsdl` and returns the service name it was stored under.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError`] for an unusable name or a failed write.
    pub async fn save_wsdl(&self, name: &str, content: &[u8]) -> Result<String, ArtifactError> {
        save(&self.wsdl_dir, name, "wsdl", content).await
    }

    /// Writes `<name>.xslt` and returns the service name it was stored under.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError`] for an unusable name or a failed write.
    pub async fn save_xslt(&self, name: &str, content: &[u8]) -> Result<String, ArtifactError> {
        save(&self.xslt_dir, name, "xslt", content).await
    }
}

/// Reduces an uploaded file name to its service name: directory parts are
/// not allowed and any extension is dropped.
fn service_name(name: &str) -> Result<String, ArtifactError> {
    let trimmed = name.trim();
    if trimmed.contains(['/', '\\']) || trimmed == ".." {
        return Err(ArtifactError::InvalidName(name.to_string()));
    }
    let stem = match trimmed.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => trimmed,
    };
    if stem.is_empty() || stem.starts_with('.') {
        return Err(ArtifactError::InvalidName(name.to_string()));
    }
    Ok(stem.to_string())
}

async fn save(
    dir: &Path,
    name: &str,
    extension: &str,
    content: &[u8],
) -> Result<String, ArtifactError> {
    let service = service_name(name)?;
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| ArtifactError::Io { path, source }
    };
    tokio::fs::create_dir_all(dir).await.map_err(io_err(dir))?;
    let path = dir.join(format!("{service}.{extension}"));
    tokio::fs::write(&path, content)
        .await
        .map_err(io_err(&path))?;
    info!(service = %service, path = %path.display(), "artifact stored");
    Ok(service)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_name_strips_extension() {
        assert_eq!(service_name("billing.wsdl").unwrap(), "billing");
        assert_eq!(service_name("billing").unwrap(), "billing");
        assert_eq!(service_name("billing.v2.xslt").unwrap(), "billing.v2");
    }

    #[test]
    fn service_name_rejects_paths() {
        assert!(service_name("../etc/passwd").is_err());
        assert!(service_name("a/b.wsdl").is_err());
        assert!(service_name("a\\b.wsdl").is_err());
        assert!(service_name("").is_err());
        assert!(service_name("..").is_err());
        assert!(service_name(".hidden").is_err());
    }

    #[tokio::test]
    async fn saves_into_created_directories() {
        let root = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(root.path().join("wsdl"), root.path().join("xslt"));

        let name = store.save_wsdl("billing.wsdl", b"<definitions/>").await.unwrap();
        assert_eq!(name, "billing");
        let written = std::fs::read_to_string(root.path().join("wsdl/billing.wsdl")).unwrap();
        assert_eq!(written, "<definitions/>");

        store.save_xslt("billing", b"<xsl/>").await.unwrap();
        assert!(root.path().join("xslt/billing.xslt").exists());
    }

    #[tokio::test]
    async fn upload_overwrites() {
        let root = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(root.path(), root.path());
        store.save_wsdl("billing", b"one").await.unwrap();
        store.save_wsdl("billing", b"two").await.unwrap();
        let written = std::fs::read_to_string(root.path().join("billing.wsdl")).unwrap();
        assert_eq!(written, "two");
    }
}

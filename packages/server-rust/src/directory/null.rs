//! No-op [`ServiceDirectory`] used when no directory is configured.

use async_trait::async_trait;

use super::{DirectoryError, Registration};
use crate::traits::ServiceDirectory;

/// Accepts every registration and deregistration without side effects.
pub struct NullDirectory;

#[async_trait]
impl ServiceDirectory for NullDirectory {
    async fn register(&self, _registration: &Registration) -> Result<(), DirectoryError> {
        Ok(())
    }

    async fn deregister(&self, _id: &str) -> Result<(), DirectoryError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn accepts_everything() {
        let directory = NullDirectory;
        let registration = Registration {
            name: "billing".to_string(),
            id: "billing-80".to_string(),
            address: "localhost".to_string(),
            port: 12505,
            tags: vec!["SOAP 1.1".to_string(), "soap".to_string()],
        };
        assert!(directory.register(&registration).await.is_ok());
        assert!(directory.deregister("billing-80").await.is_ok());
        assert!(directory.deregister("never-registered").await.is_ok());
    }
}

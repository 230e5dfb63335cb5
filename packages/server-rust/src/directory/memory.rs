use async_trait::async_trait;
use dashmap::DashMap;

use super::{DirectoryError, Registration};
use crate::traits::ServiceDirectory;

/// In-process directory keyed by registration id.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    entries: DashMap<String, Registration>,
}

impl MemoryDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<Registration> {
        self.entries.get(id).map(|r| r.clone())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl ServiceDirectory for MemoryDirectory {
    async fn register(&self, registration: &Registration) -> Result<(), DirectoryError> {
        self.entries
            .insert(registration.id.clone(), registration.clone());
        Ok(())
    }

    async fn deregister(&self, id: &str) -> Result<(), DirectoryError> {
        self.entries.remove(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration(port: u16) -> Registration {
        Registration {
            name: "billing".to_string(),
            id: "billing-80".to_string(),
            address: "gw".to_string(),
            port,
            tags: vec!["SOAP 1.1".to_string(), "soap".to_string()],
        }
    }

    #[tokio::test]
    async fn register_overwrites_same_id() {
        let directory = MemoryDirectory::new();
        directory.register(&registration(1)).await.unwrap();
        directory.register(&registration(2)).await.unwrap();
        assert_eq!(directory.len(), 1);
        assert_eq!(directory.get("billing-80").unwrap().port, 2);
    }

    #[tokio::test]
    async fn deregister_missing_is_noop() {
        let directory = MemoryDirectory::new();
        directory.deregister("ghost").await.unwrap();
        directory.register(&registration(1)).await.unwrap();
        directory.deregister("billing-80").await.unwrap();
        assert!(directory.is_empty());
    }
}

//! In-memory stores backed by [`DashMap`].

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use routegate_core::RouteRecord;

use crate::traits::{RouteConfigStore, VariableStore};

/// Route records and the variable row held in process memory.
///
/// Nothing survives a restart. Used by tests and `--store memory`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: DashMap<String, RouteRecord>,
    variable: RwLock<Option<String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RouteConfigStore for MemoryStore {
    async fn upsert(&self, record: &RouteRecord) -> anyhow::Result<()> {
        self.records
            .insert(record.service_name.clone(), record.clone());
        Ok(())
    }

    async fn find(&self, service_name: &str) -> anyhow::Result<Option<RouteRecord>> {
        Ok(self.records.get(service_name).map(|r| r.clone()))
    }

    async fn delete(&self, service_name: &str) -> anyhow::Result<()> {
        self.records.remove(service_name);
        Ok(())
    }

    async fn list(&self) -> anyhow::Result<Vec<RouteRecord>> {
        let mut records: Vec<RouteRecord> =
            self.records.iter().map(|r| r.value().clone()).collect();
        records.sort_by(|a, b| a.service_name.cmp(&b.service_name));
        Ok(records)
    }
}

#[async_trait]
impl VariableStore for MemoryStore {
    async fn get_variable(&self) -> anyhow::Result<Option<String>> {
        Ok(self.variable.read().clone())
    }

    async fn set_variable(&self, value: &str) -> anyhow::Result<()> {
        *self.variable.write() = Some(value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use routegate_core::RouteSpec;

    use super::*;

    fn record(name: &str, port: u16) -> RouteRecord {
        RouteSpec {
            protocol: Some("http".to_string()),
            host: Some("h".to_string()),
            port: Some(port),
            ..RouteSpec::new(name)
        }
        .coalesce(None)
        .unwrap()
    }

    #[tokio::test]
    async fn upsert_replaces_by_service_name() {
        let store = MemoryStore::new();
        store.upsert(&record("billing", 80)).await.unwrap();
        store.upsert(&record("billing", 81)).await.unwrap();

        let found = store.find("billing").await.unwrap().unwrap();
        assert_eq!(found.port, 81);
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delete_missing_is_noop() {
        let store = MemoryStore::new();
        store.delete("ghost").await.unwrap();
        store.upsert(&record("billing", 80)).await.unwrap();
        store.delete("billing").await.unwrap();
        assert!(store.find("billing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_is_ordered() {
        let store = MemoryStore::new();
        store.upsert(&record("orders", 80)).await.unwrap();
        store.upsert(&record("billing", 80)).await.unwrap();
        let names: Vec<String> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.service_name)
            .collect();
        assert_eq!(names, vec!["billing", "orders"]);
    }

    #[tokio::test]
    async fn variable_is_last_write_wins() {
        let store = MemoryStore::new();
        assert!(store.get_variable().await.unwrap().is_none());
        store.set_variable("first").await.unwrap();
        store.set_variable("second").await.unwrap();
        assert_eq!(store.get_variable().await.unwrap().as_deref(), Some("second"));
    }
}

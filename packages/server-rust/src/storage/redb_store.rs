//! Embedded persistent store on `redb`.
//!
//! Two tables: `service` maps a service name to its [`RouteRecord`] as a JSON
//! document, `variable` holds the single variable row under one fixed key.
//! `redb` is synchronous, so every call runs on the blocking pool.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use redb::{Database, ReadableTable, TableDefinition};
use routegate_core::RouteRecord;

use crate::traits::{RouteConfigStore, VariableStore};

const SERVICE_TABLE: TableDefinition<&str, &str> = TableDefinition::new("service");
const VARIABLE_TABLE: TableDefinition<&str, &str> = TableDefinition::new("variable");
const VARIABLE_KEY: &str = "nameService";

pub struct RedbStore {
    db: Arc<Database>,
}

impl RedbStore {
    /// Opens (or creates) the database file and ensures both tables exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or initialised.
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let db = Database::create(path)
            .with_context(|| format!("failed to open store at {}", path.display()))?;
        let txn = db.begin_write()?;
        {
            txn.open_table(SERVICE_TABLE)?;
            txn.open_table(VARIABLE_TABLE)?;
        }
        txn.commit()?;
        Ok(Self { db: Arc::new(db) })
    }

    async fn blocking<T, F>(&self, f: F) -> anyhow::Result<T>
    where
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || f(&db)).await?
    }
}

#[async_trait]
impl RouteConfigStore for RedbStore {
    async fn upsert(&self, record: &RouteRecord) -> anyhow::Result<()> {
        let key = record.service_name.clone();
        let doc = serde_json::to_string(record)?;
        self.blocking(move |db| {
            let txn = db.begin_write()?;
            {
                let mut table = txn.open_table(SERVICE_TABLE)?;
                table.insert(key.as_str(), doc.as_str())?;
            }
            txn.commit()?;
            Ok(())
        })
        .await
    }

    async fn find(&self, service_name: &str) -> anyhow::Result<Option<RouteRecord>> {
        let key = service_name.to_string();
        self.blocking(move |db| {
            let txn = db.begin_read()?;
            let table = txn.open_table(SERVICE_TABLE)?;
            let doc = table.get(key.as_str())?.map(|v| v.value().to_string());
            let record = doc
                .map(|doc| serde_json::from_str::<RouteRecord>(&doc))
                .transpose()
                .with_context(|| format!("corrupt service document for {key}"))?;
            Ok(record)
        })
        .await
    }

    async fn delete(&self, service_name: &str) -> anyhow::Result<()> {
        let key = service_name.to_string();
        self.blocking(move |db| {
            let txn = db.begin_write()?;
            {
                let mut table = txn.open_table(SERVICE_TABLE)?;
                table.remove(key.as_str())?;
            }
            txn.commit()?;
            Ok(())
        })
        .await
    }

    async fn list(&self) -> anyhow::Result<Vec<RouteRecord>> {
        self.blocking(|db| {
            let txn = db.begin_read()?;
            let table = txn.open_table(SERVICE_TABLE)?;
            let mut records = Vec::new();
            for entry in table.iter()? {
                let (_, doc) = entry?;
                records.push(serde_json::from_str::<RouteRecord>(doc.value())?);
            }
            Ok(records)
        })
        .await
    }
}

#[async_trait]
impl VariableStore for RedbStore {
    async fn get_variable(&self) -> anyhow::Result<Option<String>> {
        self.blocking(|db| {
            let txn = db.begin_read()?;
            let table = txn.open_table(VARIABLE_TABLE)?;
            let value = table.get(VARIABLE_KEY)?.map(|v| v.value().to_string());
            Ok(value)
        })
        .await
    }

    async fn set_variable(&self, value: &str) -> anyhow::Result<()> {
        let value = value.to_string();
        self.blocking(move |db| {
            let txn = db.begin_write()?;
            {
                let mut table = txn.open_table(VARIABLE_TABLE)?;
                table.insert(VARIABLE_KEY, value.as_str())?;
            }
            txn.commit()?;
            Ok(())
        })
        .await
    }
}

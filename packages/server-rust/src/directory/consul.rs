//! Consul agent API client.
//!
//! Registers with `PUT /v1/agent/service/register` and removes with
//! `PUT /v1/agent/service/deregister/{id}`. Consul treats both as
//! idempotent, which matches the directory contract.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use super::{DirectoryError, Registration};
use crate::traits::ServiceDirectory;

#[derive(Debug, Serialize)]
struct AgentServiceRegistration<'a> {
    #[serde(rename = "ID")]
    id: &'a str,
    #[serde(rename = "Name")]
    name: &'a str,
    #[serde(rename = "Address")]
    address: &'a str,
    #[serde(rename = "Port")]
    port: u16,
    #[serde(rename = "Tags")]
    tags: &'a [String],
}

pub struct ConsulDirectory {
    client: reqwest::Client,
    base_url: String,
}

impl ConsulDirectory {
    /// Client for the agent at `http://<host>:<port>`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(host: &str, port: u16, timeout: Duration) -> Result<Self, DirectoryError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: format!("http://{host}:{port}"),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn check(response: reqwest::Response) -> Result<(), DirectoryError> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(DirectoryError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl ServiceDirectory for ConsulDirectory {
    async fn register(&self, registration: &Registration) -> Result<(), DirectoryError> {
        let payload = AgentServiceRegistration {
            id: &registration.id,
            name: &registration.name,
            address: &registration.address,
            port: registration.port,
            tags: &registration.tags,
        };
        let response = self
            .client
            .put(format!("{}/v1/agent/service/register", self.base_url))
            .json(&payload)
            .send()
            .await?;
        Self::check(response).await?;
        debug!(id = %registration.id, "registered with consul");
        Ok(())
    }

    async fn deregister(&self, id: &str) -> Result<(), DirectoryError> {
        let response = self
            .client
            .put(format!("{}/v1/agent/service/deregister/{id}", self.base_url))
            .send()
            .await?;
        Self::check(response).await?;
        debug!(id, "deregistered from consul");
        Ok(())
    }
}

//! Notifies a companion local-endpoint service when a route is deleted.
//!
//! The companion owns listeners created for a service outside this process.
//! It is told with `POST <base>/createLocal/deleteRoute` and a body of
//! `{"nameService": "<service>"}`. Callers log failures and carry on.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use crate::traits::PeerNotifier;

#[derive(Debug, thiserror::Error)]
pub enum PeerError {
    #[error("peer unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("peer rejected request with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Debug, Serialize)]
struct DeleteNotice<'a> {
    #[serde(rename = "nameService")]
    service_name: &'a str,
}

pub struct HttpPeerNotifier {
    client: reqwest::Client,
    url: String,
}

impl HttpPeerNotifier {
    /// Notifier for the companion at `http://<host>:<port>`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(host: &str, port: u16, timeout: Duration) -> Result<Self, PeerError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: format!("http://{host}:{port}/createLocal/deleteRoute"),
        })
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl PeerNotifier for HttpPeerNotifier {
    async fn route_deleted(&self, service_name: &str) -> Result<(), PeerError> {
        let response = self
            .client
            .post(&self.url)
            .json(&DeleteNotice { service_name })
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PeerError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        debug!(service = service_name, url = %self.url, "peer notified of deletion");
        Ok(())
    }
}

/// Used when no companion is configured.
pub struct NullPeerNotifier;

#[async_trait]
impl PeerNotifier for NullPeerNotifier {
    async fn route_deleted(&self, _service_name: &str) -> Result<(), PeerError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use parking_lot::Mutex;
    use tokio::net::TcpListener;

    use super::*;

    async fn fake_peer(status: StatusCode) -> (Arc<Mutex<Vec<serde_json::Value>>>, u16) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let handler_log = Arc::clone(&log);
        let app = Router::new().route(
            "/createLocal/deleteRoute",
            post(move |Json(body): Json<serde_json::Value>| {
                let log = Arc::clone(&handler_log);
                async move {
                    log.lock().push(body);
                    status
                }
            }),
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (log, port)
    }

    #[tokio::test]
    async fn posts_service_name() {
        let (log, port) = fake_peer(StatusCode::OK).await;
        let peer = HttpPeerNotifier::new("127.0.0.1", port, Duration::from_secs(5)).unwrap();
        assert_eq!(
            peer.url(),
            format!("http://127.0.0.1:{port}/createLocal/deleteRoute")
        );

        peer.route_deleted("billing").await.unwrap();

        assert_eq!(
            log.lock().as_slice(),
            &[serde_json::json!({"nameService": "billing"})]
        );
    }

    #[tokio::test]
    async fn error_status_is_rejected() {
        let (_log, port) = fake_peer(StatusCode::INTERNAL_SERVER_ERROR).await;
        let peer = HttpPeerNotifier::new("127.0.0.1", port, Duration::from_secs(5)).unwrap();

        let err = peer.route_deleted("billing").await.unwrap_err();
        assert!(matches!(err, PeerError::Rejected { status: 500, .. }));
    }

    #[tokio::test]
    async fn unreachable_peer_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        let peer = HttpPeerNotifier::new("127.0.0.1", port, Duration::from_secs(2)).unwrap();

        let err = peer.route_deleted("billing").await.unwrap_err();
        assert!(matches!(err, PeerError::Transport(_)));
    }

    #[tokio::test]
    async fn null_notifier_accepts_everything() {
        assert!(NullPeerNotifier.route_deleted("billing").await.is_ok());
    }
}

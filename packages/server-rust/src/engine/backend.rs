use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;

use crate::traits::BackendClient;

/// Forwards XML payloads to backends with an HTTP POST.
#[derive(Debug, Clone)]
pub struct HttpBackendClient {
    client: reqwest::Client,
}

impl HttpBackendClient {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build backend HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl BackendClient for HttpBackendClient {
    async fn call(&self, url: &str, body: String) -> anyhow::Result<String> {
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "text/xml; charset=utf-8")
            .body(body)
            .send()
            .await
            .with_context(|| format!("backend {url} unreachable"))?
            .error_for_status()
            .with_context(|| format!("backend {url} returned an error status"))?;
        response
            .text()
            .await
            .with_context(|| format!("failed to read reply from {url}"))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::HeaderMap;
    use axum::routing::post;
    use axum::Router;
    use parking_lot::Mutex;
    use tokio::net::TcpListener;

    use super::*;

    #[tokio::test]
    async fn posts_xml_and_returns_reply() {
        let seen: Arc<Mutex<Vec<(String, String)>>> = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        let app = Router::new().route(
            "/svc",
            post(move |headers: HeaderMap, body: String| {
                let log = Arc::clone(&log);
                async move {
                    let content_type = headers
                        .get(CONTENT_TYPE)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string();
                    log.lock().push((content_type, body));
                    "<ok/>"
                }
            }),
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = HttpBackendClient::new(Duration::from_secs(5)).unwrap();
        let reply = client
            .call(&format!("http://{addr}/svc"), "<req/>".to_string())
            .await
            .unwrap();

        assert_eq!(reply, "<ok/>");
        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].0.starts_with("text/xml"));
        assert_eq!(seen[0].1, "<req/>");
    }

    #[tokio::test]
    async fn error_status_is_reported() {
        let app = Router::new().route(
            "/svc",
            post(|| async { (axum::http::StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = HttpBackendClient::new(Duration::from_secs(5)).unwrap();
        let result = client
            .call(&format!("http://{addr}/svc"), "<req/>".to_string())
            .await;
        assert!(result.is_err());
    }
}

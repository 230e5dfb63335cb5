//! Data plane: inbound messages for installed routes.

use axum::extract::{Path, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::warn;

use super::AppState;
use crate::engine::DispatchError;

fn status_for(err: &DispatchError) -> StatusCode {
    match err {
        DispatchError::NoRoute(_) => StatusCode::NOT_FOUND,
        DispatchError::NotRunning(_) => StatusCode::SERVICE_UNAVAILABLE,
        DispatchError::Translate(_) => StatusCode::BAD_REQUEST,
        DispatchError::Transform(_) | DispatchError::Backend(_) => StatusCode::BAD_GATEWAY,
    }
}

/// `POST /services/{*local_uri}`: runs the route bound to `local_uri` and
/// returns the backend's reply.
pub async fn dispatch_handler(
    State(state): State<AppState>,
    Path(local_uri): Path<String>,
    body: String,
) -> Response {
    match state.engine.dispatch(&local_uri, body).await {
        Ok(reply) => ([(CONTENT_TYPE, "text/xml; charset=utf-8")], reply).into_response(),
        Err(e) => {
            let status = status_for(&e);
            warn!(uri = %local_uri, status = status.as_u16(), error = %e, "dispatch failed");
            (status, e.to_string()).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_errors_map_to_statuses() {
        assert_eq!(
            status_for(&DispatchError::NoRoute("x".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&DispatchError::NotRunning("x".to_string())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_for(&DispatchError::Backend(anyhow::anyhow!("refused"))),
            StatusCode::BAD_GATEWAY
        );
        let translate = routegate_core::json_str_to_xml("{").unwrap_err();
        assert_eq!(
            status_for(&DispatchError::Translate(translate)),
            StatusCode::BAD_REQUEST
        );
    }
}

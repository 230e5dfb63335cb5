//! Health, liveness and readiness probes.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::json;

use super::AppState;
use crate::network::HealthState;
use crate::traits::RoutingEngine;

/// Always 200; `state` in the body carries the actual health.
pub async fn health_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    let routes = state.engine.list();
    let running = routes.iter().filter(|r| r.state.is_running()).count();

    Json(json!({
        "state": state.shutdown.health_state().as_str(),
        "routes": routes.len(),
        "running_routes": running,
        "in_flight": state.shutdown.in_flight_count(),
        "uptime_secs": state.start_time.elapsed().as_secs(),
    }))
}

/// Always 200 while the process answers.
pub async fn liveness_handler() -> StatusCode {
    StatusCode::OK
}

/// 200 only in the `Ready` state.
pub async fn readiness_handler(State(state): State<AppState>) -> StatusCode {
    if state.shutdown.health_state() == HealthState::Ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

#[cfg(test)]
mod tests {
    use routegate_core::BackendLocation;

    use super::*;
    use crate::engine::RouteDefinition;
    use crate::network::handlers::test_support::test_state;
    use crate::traits::RoutingEngine;

    #[tokio::test]
    async fn health_reports_state_and_routes() {
        let (state, _root) = test_state();
        state.shutdown.set_ready();
        state
            .engine
            .install(
                "billing",
                RouteDefinition::Soap {
                    local_uri: "billing".to_string(),
                    backend: BackendLocation::parse("http://h:80/p").unwrap(),
                    transform_route: "billing-applyXslt".to_string(),
                },
            )
            .await
            .unwrap();

        let body = health_handler(State(state.clone())).await.0;
        assert_eq!(body["state"], "ready");
        assert_eq!(body["routes"], 1);
        assert_eq!(body["running_routes"], 0);
        assert_eq!(body["in_flight"], 0);
        assert!(body["uptime_secs"].is_number());

        state.engine.start("billing").await.unwrap();
        let body = health_handler(State(state)).await.0;
        assert_eq!(body["running_routes"], 1);
    }

    #[tokio::test]
    async fn health_reports_draining() {
        let (state, _root) = test_state();
        state.shutdown.set_ready();
        state.shutdown.trigger_shutdown();
        assert_eq!(health_handler(State(state)).await.0["state"], "draining");
    }

    #[tokio::test]
    async fn liveness_is_always_ok() {
        assert_eq!(liveness_handler().await, StatusCode::OK);
    }

    #[tokio::test]
    async fn readiness_follows_health_state() {
        let (state, _root) = test_state();
        assert_eq!(
            readiness_handler(State(state.clone())).await,
            StatusCode::SERVICE_UNAVAILABLE
        );
        state.shutdown.set_ready();
        assert_eq!(readiness_handler(State(state.clone())).await, StatusCode::OK);
        state.shutdown.trigger_shutdown();
        assert_eq!(
            readiness_handler(State(state)).await,
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}

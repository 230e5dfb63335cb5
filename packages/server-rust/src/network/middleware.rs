//! Tower middleware shared by the admin API and the data plane.
//!
//! Layers run outermost first:
//! 1. `SetRequestId`: assigns an `X-Request-Id` to every request
//! 2. `Trace`: one span per request
//! 3. `CORS`
//! 4. `Timeout`: answers 408 once `request_timeout` elapses
//! 5. `PropagateRequestId`: echoes `X-Request-Id` on the response

use axum::extract::{Request, State};
use axum::http::header::HeaderName;
use axum::http::{HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tower::layer::util::{Identity, Stack};
use tower::ServiceBuilder;
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::config::NetworkConfig;
use super::handlers::AppState;
use super::shutdown::HealthState;

type HttpLayers = Stack<
    PropagateRequestIdLayer,
    Stack<
        TimeoutLayer,
        Stack<
            CorsLayer,
            Stack<
                TraceLayer<SharedClassifier<ServerErrorsAsFailures>>,
                Stack<SetRequestIdLayer<MakeRequestUuid>, Identity>,
            >,
        >,
    >,
>;

#[must_use]
pub fn build_http_layers(config: &NetworkConfig) -> HttpLayers {
    let x_request_id = HeaderName::from_static("x-request-id");

    ServiceBuilder::new()
        .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(&config.cors_origins))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.request_timeout,
        ))
        .layer(PropagateRequestIdLayer::new(x_request_id))
        .into_inner()
}

fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(
            origins
                .iter()
                .filter_map(|o| o.parse::<HeaderValue>().ok()),
        )
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
}

/// Rejects requests with 503 unless the server is ready, and counts the
/// rest as in flight so shutdown can wait for them.
pub async fn track_in_flight(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if state.shutdown.health_state() != HealthState::Ready {
        return (StatusCode::SERVICE_UNAVAILABLE, "server is not accepting requests").into_response();
    }
    let _guard = state.shutdown.in_flight_guard();
    next.run(request).await
}

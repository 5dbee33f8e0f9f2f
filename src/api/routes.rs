use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::DecisionInput;
use crate::engine::DecisionClient;
use crate::observability::{MetricsRegistry, TimingGuard};

use super::enforce::enforce;
use super::response::{ErrorResponse, HealthResponse};

/// Shared application state.
pub struct AppState {
    /// Open policy engine session
    pub client: Arc<DecisionClient>,

    /// Request counters
    pub metrics: Arc<MetricsRegistry>,

    /// Policy path queried for every request
    pub policy_path: String,

    /// Apply allow/deny to decisions instead of echoing them
    pub enforce: bool,

    /// Application start time
    pub start_time: Instant,

    /// Application version
    pub version: String,

    /// Latency budget in milliseconds
    pub latency_budget_ms: u64,
}

/// Create the application router.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // The path segment is matched but not used.
        .route("/something/:allow", any(handle_decision))
        .route("/health", get(handle_health))
        .route("/metrics", get(handle_metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Forward the request metadata to the policy engine and return its decision.
async fn handle_decision(State(state): State<Arc<AppState>>, input: DecisionInput) -> Response {
    let request_id = Uuid::new_v4();
    let timing = TimingGuard::new(&state.metrics);

    let result = state.client.query(&state.policy_path, &input).await;

    let elapsed = timing.start().elapsed();
    if elapsed.as_millis() > state.latency_budget_ms as u128 {
        warn!(
            request_id = %request_id,
            latency_ms = elapsed.as_millis(),
            budget_ms = state.latency_budget_ms,
            "Decision latency exceeded budget"
        );
    }

    match result {
        Ok(decision) => {
            state.metrics.record_decision();
            info!(
                request_id = %request_id,
                path = %input.path,
                latency_ms = elapsed.as_millis(),
                "Decision completed"
            );

            if state.enforce {
                return enforce(decision, &state.metrics);
            }
            (StatusCode::OK, Json(decision)).into_response()
        }
        Err(e) => {
            state.metrics.record_error(&e);
            warn!(
                request_id = %request_id,
                path = %input.path,
                policy_path = %state.policy_path,
                error = %e,
                "Decision query failed"
            );

            let (status, body) = ErrorResponse::from_engine_error(&e);
            (status, Json(body)).into_response()
        }
    }
}

/// Health check endpoint.
async fn handle_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
        policy_path: state.policy_path.clone(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// Metrics endpoint (Prometheus format).
async fn handle_metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let metrics = state
        .metrics
        .to_prometheus(state.start_time.elapsed().as_secs());

    (
        StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; charset=utf-8",
        )],
        metrics,
    )
}

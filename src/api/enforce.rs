//! Optional enforcement of decisions.
//!
//! Off by default; the decision endpoint then echoes whatever the engine
//! returned. When on, only an explicit allow produces a 200.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::Value;
use tracing::info;

use crate::domain::Verdict;
use crate::observability::MetricsRegistry;

use super::response::ErrorResponse;

/// Turn a decision into an allow (200, decision echoed) or deny (403) response.
pub fn enforce(decision: Value, metrics: &MetricsRegistry) -> Response {
    let verdict = Verdict::from_decision(&decision);
    metrics.record_verdict(verdict);

    if verdict.is_allowed() {
        return (StatusCode::OK, Json(decision)).into_response();
    }

    info!(verdict = %verdict, "Request denied by policy");
    (StatusCode::FORBIDDEN, Json(ErrorResponse::denied(decision))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::Ordering;

    #[test]
    fn test_enforce_statuses() {
        let metrics = MetricsRegistry::new();

        assert_eq!(enforce(json!({"result": true}), &metrics).status(), StatusCode::OK);
        assert_eq!(
            enforce(json!({"result": {"allow": false}}), &metrics).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            enforce(json!({"result": 42}), &metrics).status(),
            StatusCode::FORBIDDEN
        );

        assert_eq!(metrics.enforced_allow.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.enforced_deny.load(Ordering::Relaxed), 2);
    }
}

use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

use super::AppState;
use crate::metrics::Metrics;

/// `GET /metrics` in the Prometheus text format.
pub(super) async fn prometheus_metrics(State(state): State<AppState>) -> Response {
    tracing::debug!("Serving Prometheus metrics");
    match state.metrics.render() {
        Ok(body) => (
            [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Counts every response by method and status, timeouts and panics included.
pub(super) async fn count_requests(
    State(metrics): State<Arc<Metrics>>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let response = next.run(request).await;
    metrics.record_request(method.as_str(), response.status().as_u16());
    response
}

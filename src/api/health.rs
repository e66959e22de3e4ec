use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;

use super::AppState;

/// `200 "."` when the store answers, `503` otherwise.
pub(super) async fn healthz(State(state): State<AppState>) -> impl IntoResponse {
    let text_plain = [(header::CONTENT_TYPE, "text/plain")];
    match state.service.healthcheck().await {
        Ok(()) => (StatusCode::OK, text_plain, "."),
        Err(e) => {
            tracing::error!(error = %e, "Healthcheck: store check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                text_plain,
                "Repository is unavailable",
            )
        }
    }
}

//! HTTP surface: routes, JSON error mapping and request middleware.

mod cache;
mod error;
mod health;
mod metrics;
mod publications;
mod publishers;

pub use cache::ResponseCache;
pub use error::{ApiError, ErrorBody};
pub use publications::PublicationRequest;

use axum::http::{header, HeaderName, Method, StatusCode};
use axum::middleware;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::metrics::Metrics;
use crate::service::PublicationService;

const REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Shared by every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub(crate) service: PublicationService,
    pub(crate) cache: Arc<ResponseCache>,
    pub(crate) metrics: Arc<Metrics>,
}

impl AppState {
    /// The service should record into the same `metrics` for `/metrics` to
    /// show workflow counters.
    pub fn new(service: PublicationService, cache: ResponseCache, metrics: Arc<Metrics>) -> Self {
        Self {
            service,
            cache: Arc::new(cache),
            metrics,
        }
    }
}

/// Builds the application router with its middleware stack.
pub fn router(state: AppState, config: &ServerConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::ACCEPT, header::AUTHORIZATION, header::CONTENT_TYPE])
        .expose_headers([header::LINK])
        .max_age(Duration::from_secs(300));

    // Layers run bottom-up on requests: the id is set before tracing sees the request.
    let request_metrics = Arc::clone(&state.metrics);
    Router::new()
        .route("/healthz", get(health::healthz))
        .route("/metrics", get(metrics::prometheus_metrics))
        .nest("/publishers", publishers::router())
        .nest("/publications", publications::router())
        .with_state(state)
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.request_timeout_secs),
        ))
        .layer(middleware::from_fn_with_state(
            request_metrics,
            metrics::count_requests,
        ))
        .layer(cors)
        .layer(PropagateRequestIdLayer::new(REQUEST_ID))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(REQUEST_ID, MakeRequestUuid))
}

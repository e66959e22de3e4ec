//! Prometheus metrics for the HTTP surface and the publication workflow.

use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

/// Counters exported on `GET /metrics`.
///
/// Each instance owns its registry, so tests can build as many as they like.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    http_requests: IntCounterVec,
    publications_created: IntCounter,
    creation_failures: IntCounterVec,
    compensations: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let http_requests = IntCounterVec::new(
            Opts::new("publications_http_requests_total", "HTTP requests handled"),
            &["method", "status"],
        )?;
        let publications_created = IntCounter::new(
            "publications_created_total",
            "Publications created and, where required, registered with the feed registrar",
        )?;
        let creation_failures = IntCounterVec::new(
            Opts::new(
                "publications_creation_failures_total",
                "Failed publication creations by failing step",
            ),
            &["step"],
        )?;
        let compensations = IntCounterVec::new(
            Opts::new(
                "publications_compensations_total",
                "Compensating store writes after a registrar failure or cancellation",
            ),
            &["action", "outcome"],
        )?;

        registry.register(Box::new(http_requests.clone()))?;
        registry.register(Box::new(publications_created.clone()))?;
        registry.register(Box::new(creation_failures.clone()))?;
        registry.register(Box::new(compensations.clone()))?;

        Ok(Self {
            registry,
            http_requests,
            publications_created,
            creation_failures,
            compensations,
        })
    }

    pub fn record_request(&self, method: &str, status: u16) {
        let status = status.to_string();
        self.http_requests
            .with_label_values(&[method, status.as_str()])
            .inc();
    }

    pub fn record_created(&self) {
        self.publications_created.inc();
    }

    /// `step` is `store` or `registration`.
    pub fn record_creation_failure(&self, step: &str) {
        self.creation_failures.with_label_values(&[step]).inc();
    }

    /// `action` is `delete` or `restore`; `outcome` is `succeeded` or `failed`.
    pub fn record_compensation(&self, action: &str, succeeded: bool) {
        let outcome = if succeeded { "succeeded" } else { "failed" };
        self.compensations
            .with_label_values(&[action, outcome])
            .inc();
    }

    /// Text exposition format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        TextEncoder::new().encode_to_string(&self.registry.gather())
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}

//! Feed registrar: the external service that ingests rss publications.
//!
//! [`FeedRegistrar`] is the contract the service layer depends on;
//! [`RssFeedsClient`] speaks it over HTTP.

mod client;

pub use client::RssFeedsClient;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

/// Failures of a registrar call. Every variant is a definitive failure.
#[derive(Debug, Error)]
pub enum RegistrarError {
    #[error("feed registrar request timed out")]
    Timeout,
    #[error("feed registrar request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("feed registrar rejected request (status {status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("invalid feed registrar url: {0}")]
    InvalidUrl(String),
}

/// Registers, updates and removes feeds for rss publications.
#[async_trait]
pub trait FeedRegistrar: Send + Sync {
    async fn create_feed(
        &self,
        publication_id: Uuid,
        feed_url: &str,
        language_code: &str,
    ) -> Result<(), RegistrarError>;

    async fn update_feed(
        &self,
        publication_id: Uuid,
        feed_url: &str,
        language_code: &str,
    ) -> Result<(), RegistrarError>;

    /// Removes the feed. A feed the registrar does not know counts as removed.
    async fn delete_feed(&self, publication_id: Uuid) -> Result<(), RegistrarError>;
}

//! HTTP client of this API, used by the bulk importer.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::api::{ErrorBody, PublicationRequest};
use crate::entity::{NewPublisher, Publication, Publisher};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Request timed out")]
    Timeout,
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// The API answered with an `{"error_text": ...}` body.
    #[error("{message}")]
    Api { status: u16, message: String },
    #[error("unknown error, status code: {status}, message: {reason}")]
    Unknown { status: u16, reason: String },
    #[error("Invalid response body: {0}")]
    Decode(String),
    #[error("Invalid API url: {0}")]
    InvalidUrl(String),
}

/// Operations the importer needs from the publications API.
#[async_trait]
pub trait PublicationsApi: Send + Sync {
    async fn create_publisher(&self, name: &str, url: &str) -> Result<Publisher, ClientError>;

    async fn create_publication(
        &self,
        request: &PublicationRequest,
    ) -> Result<Publication, ClientError>;
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    publishers_url: String,
    publications_url: String,
    timeout: Duration,
}

impl ApiClient {
    /// Builds a client for the API rooted at `base_url`, e.g. `http://publications:8080`.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let parsed = Url::parse(base_url).map_err(|e| ClientError::InvalidUrl(e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ClientError::InvalidUrl(format!(
                "unsupported scheme '{}'",
                parsed.scheme()
            )));
        }
        let base = base_url.trim_end_matches('/');
        Ok(Self {
            client: reqwest::Client::new(),
            publishers_url: format!("{base}/publishers"),
            publications_url: format!("{base}/publications"),
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// POSTs `body` and decodes a `201 Created` response.
    async fn post<B, T>(&self, url: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let response = tokio::time::timeout(self.timeout, self.client.post(url).json(body).send())
            .await
            .map_err(|_| ClientError::Timeout)??;

        let status = response.status();
        if status == StatusCode::CREATED {
            return response
                .json::<T>()
                .await
                .map_err(|e| ClientError::Decode(e.to_string()));
        }

        let text = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ErrorBody>(&text) {
            Ok(body) => Err(ClientError::Api {
                status: status.as_u16(),
                message: body.error_text,
            }),
            Err(_) => Err(ClientError::Unknown {
                status: status.as_u16(),
                reason: status.to_string(),
            }),
        }
    }
}

#[async_trait]
impl PublicationsApi for ApiClient {
    async fn create_publisher(&self, name: &str, url: &str) -> Result<Publisher, ClientError> {
        self.post(&self.publishers_url, &NewPublisher::new(name, url))
            .await
    }

    async fn create_publication(
        &self,
        request: &PublicationRequest,
    ) -> Result<Publication, ClientError> {
        self.post(&self.publications_url, request).await
    }
}

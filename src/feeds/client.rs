use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;
use uuid::Uuid;

use super::{FeedRegistrar, RegistrarError};

/// Longest error body echoed back in a [`RegistrarError::Rejected`] message.
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Serialize)]
struct FeedRequest<'a> {
    publication_uuid: Uuid,
    url: &'a str,
    language_code: &'a str,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error_text: String,
}

/// HTTP client of the rss feeds service.
///
/// Routes: `POST /feeds`, `PUT /feeds/{uuid}`, `DELETE /feeds/{uuid}`.
#[derive(Debug, Clone)]
pub struct RssFeedsClient {
    client: reqwest::Client,
    feeds_url: String,
    timeout: Duration,
}

impl RssFeedsClient {
    /// Builds a client for the service at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrarError::InvalidUrl`] when `base_url` is not an absolute
    /// http(s) URL.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RegistrarError> {
        Self::with_client(reqwest::Client::new(), base_url, timeout)
    }

    pub fn with_client(
        client: reqwest::Client,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, RegistrarError> {
        let parsed = Url::parse(base_url).map_err(|e| RegistrarError::InvalidUrl(e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(RegistrarError::InvalidUrl(format!(
                "unsupported scheme '{}'",
                parsed.scheme()
            )));
        }
        Ok(Self {
            client,
            feeds_url: format!("{}/feeds", base_url.trim_end_matches('/')),
            timeout,
        })
    }

    async fn send(
        &self,
        method: Method,
        url: String,
        body: Option<FeedRequest<'_>>,
    ) -> Result<reqwest::Response, RegistrarError> {
        let mut request = self.client.request(method, url);
        if let Some(body) = &body {
            request = request.json(body);
        }

        tokio::time::timeout(self.timeout, request.send())
            .await
            .map_err(|_| RegistrarError::Timeout)?
            .map_err(RegistrarError::Network)
    }
}

/// Turns a non-success response into [`RegistrarError::Rejected`], preferring
/// the service's `{"error_text": ...}` body when it sent one.
async fn rejection(response: reqwest::Response) -> RegistrarError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    let message = match serde_json::from_str::<ErrorBody>(&body) {
        Ok(parsed) => parsed.error_text,
        Err(_) if body.trim().is_empty() => status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_owned(),
        Err(_) => body.chars().take(MAX_ERROR_BODY).collect(),
    };

    RegistrarError::Rejected {
        status: status.as_u16(),
        message,
    }
}

#[async_trait]
impl FeedRegistrar for RssFeedsClient {
    async fn create_feed(
        &self,
        publication_id: Uuid,
        feed_url: &str,
        language_code: &str,
    ) -> Result<(), RegistrarError> {
        let body = FeedRequest {
            publication_uuid: publication_id,
            url: feed_url,
            language_code,
        };
        let response = self
            .send(Method::POST, self.feeds_url.clone(), Some(body))
            .await?;
        if !response.status().is_success() {
            return Err(rejection(response).await);
        }

        tracing::debug!(publication_id = %publication_id, feed_url = %feed_url, "Feed registered");
        Ok(())
    }

    async fn update_feed(
        &self,
        publication_id: Uuid,
        feed_url: &str,
        language_code: &str,
    ) -> Result<(), RegistrarError> {
        let body = FeedRequest {
            publication_uuid: publication_id,
            url: feed_url,
            language_code,
        };
        let url = format!("{}/{}", self.feeds_url, publication_id);
        let response = self.send(Method::PUT, url, Some(body)).await?;
        if !response.status().is_success() {
            return Err(rejection(response).await);
        }

        tracing::debug!(publication_id = %publication_id, "Feed updated");
        Ok(())
    }

    async fn delete_feed(&self, publication_id: Uuid) -> Result<(), RegistrarError> {
        let url = format!("{}/{}", self.feeds_url, publication_id);
        let response = self.send(Method::DELETE, url, None).await?;

        match response.status() {
            status if status.is_success() => {
                tracing::debug!(publication_id = %publication_id, "Feed removed");
                Ok(())
            }
            StatusCode::NOT_FOUND => {
                tracing::debug!(publication_id = %publication_id, "Feed already absent from registrar");
                Ok(())
            }
            _ => Err(rejection(response).await),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> RssFeedsClient {
        RssFeedsClient::new(&server.uri(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_create_feed_posts_registration() {
        let server = MockServer::start().await;
        let id = Uuid::new_v4();
        Mock::given(method("POST"))
            .and(path("/feeds"))
            .and(body_json(json!({
                "publication_uuid": id,
                "url": "https://acme.example/feed.xml",
                "language_code": "en",
            })))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        client(&server)
            .create_feed(id, "https://acme.example/feed.xml", "en")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_create_feed_error_text_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({"error_text": "feed exists"})),
            )
            .mount(&server)
            .await;

        let err = client(&server)
            .create_feed(Uuid::new_v4(), "https://acme.example/feed.xml", "en")
            .await
            .unwrap_err();
        match err {
            RegistrarError::Rejected { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "feed exists");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_feed_empty_error_body_uses_reason() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client(&server)
            .create_feed(Uuid::new_v4(), "https://acme.example/feed.xml", "en")
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "feed registrar rejected request (status 503): Service Unavailable"
        );
    }

    #[tokio::test]
    async fn test_create_feed_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let client = RssFeedsClient::new(&server.uri(), Duration::from_millis(100)).unwrap();
        let err = client
            .create_feed(Uuid::new_v4(), "https://acme.example/feed.xml", "en")
            .await
            .unwrap_err();
        assert!(matches!(err, RegistrarError::Timeout));
    }

    #[tokio::test]
    async fn test_update_feed_puts_by_id() {
        let server = MockServer::start().await;
        let id = Uuid::new_v4();
        Mock::given(method("PUT"))
            .and(path(format!("/feeds/{id}")))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        client(&server)
            .update_feed(id, "https://acme.example/new.xml", "uk")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_delete_feed_treats_404_as_removed() {
        let server = MockServer::start().await;
        let id = Uuid::new_v4();
        Mock::given(method("DELETE"))
            .and(path(format!("/feeds/{id}")))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        client(&server).delete_feed(id).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_feed_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = client(&server).delete_feed(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, RegistrarError::Rejected { status: 500, ref message } if message == "boom"));
    }

    #[test]
    fn test_base_url_validated() {
        assert!(RssFeedsClient::new("not a url", Duration::from_secs(1)).is_err());
        assert!(RssFeedsClient::new("ftp://feeds.example", Duration::from_secs(1)).is_err());

        let client = RssFeedsClient::new("http://feeds.example/api/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.feeds_url, "http://feeds.example/api/feeds");
    }
}

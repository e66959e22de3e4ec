use std::net::IpAddr;
use thiserror::Error;
use url::Url;

/// Reasons a publication's feed URL is refused.
///
/// The feed registrar fetches whatever URL we hand it, so internal addresses
/// are rejected here rather than at the registrar (SEC-001).
#[derive(Error, Debug)]
pub enum FeedUrlError {
    #[error("{0}")]
    Parse(#[from] url::ParseError),
    #[error("unsupported scheme '{0}' (only http/https allowed)")]
    UnsupportedScheme(String),
    #[error("host is missing")]
    MissingHost,
    #[error("private address {0} not allowed")]
    PrivateAddress(String),
    #[error("localhost not allowed")]
    Localhost,
}

/// Validates a URL handed to the feed registrar.
///
/// # Examples
///
/// ```
/// use publications::validation::validate_feed_url;
///
/// let url = validate_feed_url("https://acme.example/feed.xml").unwrap();
/// assert_eq!(url.host_str(), Some("acme.example"));
///
/// assert!(validate_feed_url("http://localhost/feed").is_err());
/// assert!(validate_feed_url("http://10.1.2.3/feed").is_err());
/// assert!(validate_feed_url("file:///etc/passwd").is_err());
/// ```
pub fn validate_feed_url(raw: &str) -> Result<Url, FeedUrlError> {
    let url = Url::parse(raw)?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(FeedUrlError::UnsupportedScheme(scheme.to_owned())),
    }

    let host = url.host_str().ok_or(FeedUrlError::MissingHost)?;
    if host.eq_ignore_ascii_case("localhost") {
        return Err(FeedUrlError::Localhost);
    }

    let bare = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    if let Ok(ip) = bare.parse::<IpAddr>() {
        if ip.is_loopback() {
            return Err(FeedUrlError::Localhost);
        }
        if is_internal(&ip) {
            return Err(FeedUrlError::PrivateAddress(ip.to_string()));
        }
    }

    Ok(url)
}

fn is_internal(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_private() || v4.is_link_local() || v4.is_unspecified(),
        IpAddr::V6(v6) => {
            let first = v6.segments()[0];
            // fc00::/7 unique local, fe80::/10 link local
            v6.is_unspecified() || (first & 0xfe00) == 0xfc00 || (first & 0xffc0) == 0xfe80
        }
    }
}

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::validation::{
    require_language_code, require_length, require_non_nil, validate_feed_url, ValidationError,
};

/// Errors raised while decoding a type tag and its raw config payload.
#[derive(Debug, Error)]
pub enum ConfigDecodeError {
    /// The type tag names no supported publication type.
    #[error("incorrect 'publication_type' specified: {0}")]
    UnknownType(String),

    /// The payload does not match the shape required by the declared type.
    #[error("invalid '{kind}' config: {reason}")]
    InvalidPayload { kind: PublicationType, reason: String },
}

/// Supported publication delivery mechanisms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublicationType {
    Rss,
}

impl PublicationType {
    pub const fn as_str(self) -> &'static str {
        match self {
            PublicationType::Rss => "rss",
        }
    }
}

impl std::fmt::Display for PublicationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PublicationType {
    type Err = ConfigDecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rss" => Ok(PublicationType::Rss),
            other => Err(ConfigDecodeError::UnknownType(other.to_owned())),
        }
    }
}

/// Config payload of an rss publication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RssConfig {
    pub url: String,
}

/// Type-specific configuration, keyed by [`PublicationType`].
///
/// On the wire the variant travels as two sibling fields:
/// `"publication_type": "rss"` and `"config": {"url": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "publication_type", content = "config", rename_all = "lowercase")]
pub enum PublicationConfig {
    Rss(RssConfig),
}

impl PublicationConfig {
    /// Decodes an untyped payload according to the declared type tag.
    ///
    /// Unknown tags fail before the payload is looked at.
    pub fn decode(kind: &str, raw: serde_json::Value) -> Result<Self, ConfigDecodeError> {
        let kind: PublicationType = kind.parse()?;
        match kind {
            PublicationType::Rss => serde_json::from_value::<RssConfig>(raw)
                .map(PublicationConfig::Rss)
                .map_err(|e| ConfigDecodeError::InvalidPayload {
                    kind,
                    reason: e.to_string(),
                }),
        }
    }

    /// Decodes the stored `(type, type_config)` column pair.
    pub fn from_columns(kind: &str, payload: &str) -> Result<Self, ConfigDecodeError> {
        let parsed: PublicationType = kind.parse()?;
        let raw: serde_json::Value =
            serde_json::from_str(payload).map_err(|e| ConfigDecodeError::InvalidPayload {
                kind: parsed,
                reason: e.to_string(),
            })?;
        Self::decode(kind, raw)
    }

    pub fn publication_type(&self) -> PublicationType {
        match self {
            PublicationConfig::Rss(_) => PublicationType::Rss,
        }
    }

    /// The payload alone, as persisted in the `type_config` column.
    pub fn payload(&self) -> serde_json::Value {
        match self {
            PublicationConfig::Rss(rss) => serde_json::json!({ "url": rss.url }),
        }
    }

    /// Feed URL to register externally, if this type is backed by the feed registrar.
    pub fn feed_url(&self) -> Option<&str> {
        match self {
            PublicationConfig::Rss(rss) => Some(&rss.url),
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        match self {
            PublicationConfig::Rss(rss) => {
                require_length("config.url", &rss.url, 5, 100)?;
                validate_feed_url(&rss.url)?;
                Ok(())
            }
        }
    }
}

/// Publication as stored and returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Publication {
    #[serde(rename = "uuid")]
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub language_code: String,
    #[serde(rename = "publisher_uuid")]
    pub publisher_id: Uuid,
    #[serde(flatten)]
    pub config: PublicationConfig,
}

/// Fields accepted when creating or updating a publication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPublication {
    pub name: String,
    pub description: String,
    pub language_code: String,
    pub publisher_id: Uuid,
    pub config: PublicationConfig,
}

impl NewPublication {
    /// Field rules: name 2-300 chars, description 1-300, two lowercase letters
    /// for the language, a non-nil publisher and a valid type payload.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_length("name", &self.name, 2, 300)?;
        require_length("description", &self.description, 1, 300)?;
        require_non_nil("publisher_uuid", self.publisher_id)?;
        require_language_code(&self.language_code)?;
        self.config.validate()
    }
}

impl Publication {
    /// Creates a publication with a freshly generated id.
    pub fn new(fields: NewPublication) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: fields.name,
            description: fields.description,
            language_code: fields.language_code,
            publisher_id: fields.publisher_id,
            config: fields.config,
        }
    }

    pub fn publication_type(&self) -> PublicationType {
        self.config.publication_type()
    }
}

impl std::fmt::Display for Publication {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{UUID: {}, Name: {}, LanguageCode: {}, PublisherUUID: {}, Type: {}}}",
            self.id,
            self.name,
            self.language_code,
            self.publisher_id,
            self.publication_type()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn rss(url: &str) -> PublicationConfig {
        PublicationConfig::Rss(RssConfig {
            url: url.to_string(),
        })
    }

    fn daily(publisher_id: Uuid) -> NewPublication {
        NewPublication {
            name: "Daily".to_string(),
            description: "desc of daily".to_string(),
            language_code: "en".to_string(),
            publisher_id,
            config: rss("https://acme.example/feed.xml"),
        }
    }

    #[test]
    fn test_decode_rss_payload() {
        let config =
            PublicationConfig::decode("rss", json!({"url": "https://acme.example/feed.xml"}))
                .unwrap();
        assert_eq!(config, rss("https://acme.example/feed.xml"));
        assert_eq!(config.feed_url(), Some("https://acme.example/feed.xml"));
    }

    #[test]
    fn test_decode_unknown_type_fails_fast() {
        let err = PublicationConfig::decode("podcast", json!({"url": 42})).unwrap_err();
        assert!(matches!(err, ConfigDecodeError::UnknownType(ref t) if t == "podcast"));
    }

    #[test]
    fn test_decode_wrong_shape() {
        let err = PublicationConfig::decode("rss", json!({"link": "x"})).unwrap_err();
        assert!(matches!(err, ConfigDecodeError::InvalidPayload { .. }));

        let err = PublicationConfig::decode("rss", serde_json::Value::Null).unwrap_err();
        assert!(err.to_string().starts_with("invalid 'rss' config"));
    }

    #[test]
    fn test_columns_round_trip() {
        let config = rss("https://acme.example/feed.xml");
        let stored = config.payload().to_string();
        let decoded = PublicationConfig::from_columns("rss", &stored).unwrap();
        assert_eq!(decoded, config);
    }

    #[test]
    fn test_wire_format_flattens_type_and_config() {
        let publication = Publication::new(daily(Uuid::new_v4()));
        let value = serde_json::to_value(&publication).unwrap();

        assert_eq!(value["publication_type"], "rss");
        assert_eq!(value["config"]["url"], "https://acme.example/feed.xml");
        assert_eq!(value["publisher_uuid"], publication.publisher_id.to_string());

        let back: Publication = serde_json::from_value(value).unwrap();
        assert_eq!(back, publication);
    }

    #[test]
    fn test_validate_accepts_example() {
        assert!(daily(Uuid::new_v4()).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_fields() {
        let mut input = daily(Uuid::new_v4());
        input.language_code = "EN".to_string();
        assert!(input.validate().is_err());

        let mut input = daily(Uuid::new_v4());
        input.publisher_id = Uuid::nil();
        assert!(input.validate().is_err());

        let mut input = daily(Uuid::new_v4());
        input.description = String::new();
        assert!(input.validate().is_err());

        let mut input = daily(Uuid::new_v4());
        input.config = rss("ftp://acme.example/feed.xml");
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_type_round_trips_through_str() {
        assert_eq!("rss".parse::<PublicationType>().unwrap(), PublicationType::Rss);
        assert_eq!(PublicationType::Rss.to_string(), "rss");
        assert!("RSS".parse::<PublicationType>().is_err());
    }
}

//! Input rules applied before any mutation reaches the store.
//!
//! Every failure is a [`ValidationError`], which the HTTP layer reports as a
//! 400 with the error text. Nothing in here touches the database or the network.

mod feed_url;

pub use feed_url::{validate_feed_url, FeedUrlError};

use thiserror::Error;
use uuid::Uuid;

use crate::entity::ConfigDecodeError;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("request body is empty")]
    EmptyBody,

    #[error("missing required '{0}' field")]
    Missing(&'static str),

    #[error("'{field}' must be between {min} and {max} characters long, got {actual}")]
    Length {
        field: &'static str,
        min: usize,
        max: usize,
        actual: usize,
    },

    #[error("'language_code' must be two lowercase letters, got '{0}'")]
    LanguageCode(String),

    #[error("'{0}' must not be a nil uuid")]
    NilUuid(&'static str),

    #[error("invalid uuid parameter {0}")]
    InvalidUuid(String),

    #[error("invalid feed url: {0}")]
    FeedUrl(#[from] FeedUrlError),

    #[error(transparent)]
    Config(#[from] ConfigDecodeError),
}

/// Rejects empty and whitespace-only values.
pub fn require_non_empty(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Missing(field));
    }
    Ok(())
}

/// Length is counted in chars, bounds inclusive. An empty value reports as missing.
pub fn require_length(
    field: &'static str,
    value: &str,
    min: usize,
    max: usize,
) -> Result<(), ValidationError> {
    require_non_empty(field, value)?;
    let actual = value.chars().count();
    if actual < min || actual > max {
        return Err(ValidationError::Length {
            field,
            min,
            max,
            actual,
        });
    }
    Ok(())
}

pub fn require_non_nil(field: &'static str, id: Uuid) -> Result<(), ValidationError> {
    if id.is_nil() {
        return Err(ValidationError::NilUuid(field));
    }
    Ok(())
}

/// ISO 639-1 shape: exactly two lowercase ASCII letters.
pub fn require_language_code(code: &str) -> Result<(), ValidationError> {
    if code.is_empty() {
        return Err(ValidationError::Missing("language_code"));
    }
    if code.len() == 2 && code.bytes().all(|b| b.is_ascii_lowercase()) {
        return Ok(());
    }
    Err(ValidationError::LanguageCode(code.to_owned()))
}

/// Parses a path parameter into a uuid.
pub fn parse_uuid(raw: &str) -> Result<Uuid, ValidationError> {
    if raw.is_empty() {
        return Err(ValidationError::Missing("uuid"));
    }
    Uuid::parse_str(raw).map_err(|_| ValidationError::InvalidUuid(raw.to_owned()))
}

use thiserror::Error;
use uuid::Uuid;

use crate::entity::{Publication, PublicationConfig, Publisher};

// ============================================================================
// Error Types
// ============================================================================

/// Store failures, classified so callers can map them to user-facing outcomes.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A row with the same id, or a publication with the same (publisher, name), exists.
    #[error("{entity} already exists")]
    AlreadyExists { entity: &'static str },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    /// A keyed write touched more than one row.
    #[error("unexpected number of {entity} rows affected for {id}: {affected}")]
    UnexpectedRowCount {
        entity: &'static str,
        id: Uuid,
        affected: u64,
    },

    #[error("publisher {0} does not exist")]
    PublisherNotFound(Uuid),

    #[error("publisher {id} still owns {count} publication(s)")]
    PublisherHasPublications { id: Uuid, count: i64 },

    /// A stored row could not be decoded back into an entity.
    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("database migration failed: {0}")]
    Migration(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// Classifies constraint violations into typed variants.
    ///
    /// Foreign-key violations stay [`StoreError::Database`]; use
    /// [`StoreError::classify`] where the broken reference is known.
    pub(crate) fn from_sqlx(err: sqlx::Error, entity: &'static str) -> Self {
        Self::classify(err, entity, None)
    }

    /// Unique violations become `AlreadyExists`, foreign-key violations
    /// become `broken_reference` when given.
    pub(crate) fn classify(
        err: sqlx::Error,
        entity: &'static str,
        broken_reference: Option<StoreError>,
    ) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return StoreError::AlreadyExists { entity };
            }
        }
        match broken_reference {
            Some(reference) if is_foreign_key_violation(&err) => reference,
            _ => StoreError::Database(err),
        }
    }

    /// Checks that a keyed write touched exactly one row.
    pub(crate) fn expect_one(entity: &'static str, id: Uuid, affected: u64) -> Result<(), Self> {
        match affected {
            1 => Ok(()),
            0 => Err(StoreError::NotFound { entity, id }),
            affected => Err(StoreError::UnexpectedRowCount {
                entity,
                id,
                affected,
            }),
        }
    }
}

pub(crate) fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation())
}

// ============================================================================
// Row Types
// ============================================================================

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct PublisherRow {
    pub uuid: Uuid,
    pub name: String,
    pub url: String,
}

impl From<PublisherRow> for Publisher {
    fn from(row: PublisherRow) -> Self {
        Publisher {
            id: row.uuid,
            name: row.name,
            url: row.url,
        }
    }
}

/// `type` and `type_config` hold the tag and JSON payload of [`PublicationConfig`].
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct PublicationRow {
    pub uuid: Uuid,
    pub name: String,
    pub description: String,
    pub language_code: String,
    pub publisher_uuid: Uuid,
    #[sqlx(rename = "type")]
    pub kind: String,
    pub type_config: String,
}

impl PublicationRow {
    pub(crate) fn into_publication(self) -> Result<Publication, StoreError> {
        let config = PublicationConfig::from_columns(&self.kind, &self.type_config)
            .map_err(|e| StoreError::Corrupt(format!("publication {}: {e}", self.uuid)))?;
        Ok(Publication {
            id: self.uuid,
            name: self.name,
            description: self.description,
            language_code: self.language_code,
            publisher_id: self.publisher_uuid,
            config,
        })
    }
}

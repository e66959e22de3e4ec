use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::feeds::RegistrarError;
use crate::storage::StoreError;
use crate::validation::ValidationError;

/// Why a compensating store write did not complete.
#[derive(Debug, Error)]
pub enum CompensationError {
    #[error("{0}")]
    Store(#[from] StoreError),
    #[error("not completed within {0:?}")]
    TimedOut(Duration),
    #[error("task aborted: {0}")]
    Aborted(String),
}

/// Failure of the publication creation workflow.
///
/// `RegistrationAndRollback` means a local row exists with no registered feed
/// and needs manual reconciliation.
#[derive(Debug, Error)]
pub enum CreationError {
    /// Nothing was persisted and the registrar was never called.
    #[error("failure creating publication: {0}")]
    Store(#[source] StoreError),

    /// The local row was removed again.
    #[error("failure creating publication: feed registration failed: {source}")]
    Registration {
        id: Uuid,
        #[source]
        source: RegistrarError,
    },

    #[error(
        "failure creating publication: feed registration failed: {registration}, \
         failure deleting created publication from repository: {rollback}"
    )]
    RegistrationAndRollback {
        id: Uuid,
        registration: RegistrarError,
        rollback: CompensationError,
    },
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Creation(#[from] CreationError),

    /// The feed update failed and the previous local values were restored.
    #[error("failure updating publication {id}: feed update failed: {source}")]
    FeedUpdate {
        id: Uuid,
        #[source]
        source: RegistrarError,
    },

    #[error(
        "failure updating publication {id}: feed update failed: {registration}, \
         failure restoring previous publication: {rollback}"
    )]
    FeedUpdateAndRestore {
        id: Uuid,
        registration: RegistrarError,
        rollback: CompensationError,
    },

    /// The feed could not be removed, so the local row was kept.
    #[error("failure deleting publication {id}: feed removal failed: {source}")]
    FeedRemoval {
        id: Uuid,
        #[source]
        source: RegistrarError,
    },
}

impl ServiceError {
    pub(crate) fn not_found(entity: &'static str, id: Uuid) -> Self {
        ServiceError::Store(StoreError::NotFound { entity, id })
    }
}

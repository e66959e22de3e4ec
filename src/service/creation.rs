use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use super::error::{CompensationError, CreationError};
use super::PublicationService;
use crate::entity::{NewPublication, Publication};
use crate::metrics::Metrics;
use crate::storage::StoreError;

// ============================================================================
// Creation State
// ============================================================================

/// Steps of the creation workflow.
///
/// `Pending -> LocalPersisted -> Registered` on success,
/// `LocalPersisted -> CompensationAttempted -> Failed` when registration fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreationState {
    Pending,
    LocalPersisted,
    Registered,
    CompensationAttempted,
    Failed,
}

impl CreationState {
    pub const fn as_str(self) -> &'static str {
        match self {
            CreationState::Pending => "pending",
            CreationState::LocalPersisted => "local_persisted",
            CreationState::Registered => "registered",
            CreationState::CompensationAttempted => "compensation_attempted",
            CreationState::Failed => "failed",
        }
    }
}

/// Current step of one workflow run, logged on every transition.
struct Creation {
    id: Uuid,
    state: CreationState,
}

impl Creation {
    fn start(id: Uuid) -> Self {
        Self {
            id,
            state: CreationState::Pending,
        }
    }

    fn advance(&mut self, to: CreationState) {
        tracing::debug!(
            publication_id = %self.id,
            from = self.state.as_str(),
            to = to.as_str(),
            "Publication creation state changed"
        );
        self.state = to;
    }
}

// ============================================================================
// Compensation Guard
// ============================================================================

type StoreWrite = Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send>>;

/// Runs a compensating store write if dropped while still armed.
///
/// Armed once the local row is written and disarmed once the registrar has
/// answered. A request dropped in between (client gone, request
/// timeout) leaves it armed, so the write is spawned on drop and bounded by
/// the compensation grace period.
pub(crate) struct CompensationGuard {
    action: Option<StoreWrite>,
    kind: &'static str,
    publication_id: Uuid,
    grace: Duration,
    metrics: Option<Arc<Metrics>>,
}

impl CompensationGuard {
    pub(crate) fn arm<F>(
        kind: &'static str,
        publication_id: Uuid,
        grace: Duration,
        metrics: Option<Arc<Metrics>>,
        action: F,
    ) -> Self
    where
        F: Future<Output = Result<(), StoreError>> + Send + 'static,
    {
        Self {
            action: Some(Box::pin(action)),
            kind,
            publication_id,
            grace,
            metrics,
        }
    }

    pub(crate) fn disarm(mut self) {
        self.action = None;
    }
}

impl Drop for CompensationGuard {
    fn drop(&mut self) {
        let Some(action) = self.action.take() else {
            return;
        };
        let (kind, id, grace) = (self.kind, self.publication_id, self.grace);
        let metrics = self.metrics.take();

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::error!(
                publication_id = %id,
                action = kind,
                "Request cancelled outside a runtime, compensation skipped, manual reconciliation required"
            );
            return;
        };

        tracing::warn!(publication_id = %id, action = kind, "Request cancelled mid-workflow, compensating");
        runtime.spawn(async move {
            match run_compensation(kind, grace, metrics, action).await {
                Ok(()) => tracing::info!(publication_id = %id, action = kind, "Compensated cancelled request"),
                Err(e) => tracing::error!(
                    publication_id = %id,
                    action = kind,
                    error = %e,
                    "Compensation after cancelled request failed, manual reconciliation required"
                ),
            }
        });
    }
}

/// Bounds `action` by `grace` and counts the outcome.
async fn run_compensation<F>(
    kind: &'static str,
    grace: Duration,
    metrics: Option<Arc<Metrics>>,
    action: F,
) -> Result<(), CompensationError>
where
    F: Future<Output = Result<(), StoreError>>,
{
    let result = match tokio::time::timeout(grace, action).await {
        Ok(result) => result.map_err(CompensationError::Store),
        Err(_) => Err(CompensationError::TimedOut(grace)),
    };
    if let Some(metrics) = &metrics {
        metrics.record_compensation(kind, result.is_ok());
    }
    result
}

// ============================================================================
// Workflow
// ============================================================================

impl PublicationService {
    /// Creates a publication and registers its feed.
    ///
    /// The row is persisted first. Types backed by the feed registrar are then
    /// registered; if that fails the row is deleted again and the returned error
    /// names the registration failure, plus the rollback failure if the delete
    /// failed too. Registration and rollback are each attempted once. If the
    /// caller is dropped after the row is written and before registration
    /// settles, the row is deleted in the background.
    pub(crate) async fn run_creation(
        &self,
        input: NewPublication,
    ) -> Result<Publication, CreationError> {
        let publication = Publication::new(input);
        let mut creation = Creation::start(publication.id);

        if let Err(e) = self.store.create_publication(&publication).await {
            creation.advance(CreationState::Failed);
            self.record(|m| m.record_creation_failure("store"));
            return Err(CreationError::Store(e));
        }
        creation.advance(CreationState::LocalPersisted);

        let Some(feed_url) = publication.config.feed_url() else {
            self.record(Metrics::record_created);
            return Ok(publication);
        };

        let id = publication.id;
        let store = Arc::clone(&self.store);
        let guard = CompensationGuard::arm(
            "delete",
            id,
            self.compensation_grace,
            self.metrics.clone(),
            async move { store.delete_publication(id).await },
        );

        let registration = match self
            .registrar
            .create_feed(id, feed_url, &publication.language_code)
            .await
        {
            Ok(()) => {
                guard.disarm();
                creation.advance(CreationState::Registered);
                self.record(Metrics::record_created);
                tracing::info!(publication_id = %id, feed_url = %feed_url, "Publication created");
                return Ok(publication);
            }
            Err(e) => e,
        };
        guard.disarm();
        self.record(|m| m.record_creation_failure("registration"));

        tracing::error!(
            publication_id = %id,
            error = %registration,
            "Feed registration failed, deleting created publication"
        );
        creation.advance(CreationState::CompensationAttempted);

        let store = Arc::clone(&self.store);
        let rollback = self
            .compensate("delete", async move { store.delete_publication(id).await })
            .await;
        creation.advance(CreationState::Failed);

        match rollback {
            Ok(()) => {
                tracing::debug!(publication_id = %id, "Deleted publication after failed registration");
                Err(CreationError::Registration {
                    id,
                    source: registration,
                })
            }
            Err(rollback) => {
                tracing::error!(
                    publication_id = %id,
                    error = %rollback,
                    "Failure deleting publication after failed registration, manual reconciliation required"
                );
                Err(CreationError::RegistrationAndRollback {
                    id,
                    registration,
                    rollback,
                })
            }
        }
    }

    /// Runs a compensating store write on its own task under the grace period.
    ///
    /// The write keeps running if the caller is dropped, so a cancelled
    /// request does not cut the rollback short.
    pub(crate) async fn compensate<F>(
        &self,
        kind: &'static str,
        action: F,
    ) -> Result<(), CompensationError>
    where
        F: Future<Output = Result<(), StoreError>> + Send + 'static,
    {
        let handle = tokio::spawn(run_compensation(
            kind,
            self.compensation_grace,
            self.metrics.clone(),
            action,
        ));

        match handle.await {
            Ok(result) => result,
            Err(e) => Err(CompensationError::Aborted(e.to_string())),
        }
    }
}

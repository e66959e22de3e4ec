//! Publisher and publication operations over a store and a feed registrar.
//!
//! Publication writes keep the store and the registrar in step: creation
//! registers the feed and rolls the row back when that fails, updates push the
//! new feed settings, deletes remove the feed before the row.

mod creation;
mod error;

pub use creation::CreationState;
pub use error::{CompensationError, CreationError, ServiceError};

use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::entity::{NewPublication, NewPublisher, Publication, Publisher};
use crate::feeds::FeedRegistrar;
use crate::metrics::Metrics;
use crate::storage::PublicationStore;

use creation::CompensationGuard;

/// Grace period for a compensating write that outlives its request.
pub const DEFAULT_COMPENSATION_GRACE: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct PublicationService {
    store: Arc<dyn PublicationStore>,
    registrar: Arc<dyn FeedRegistrar>,
    compensation_grace: Duration,
    metrics: Option<Arc<Metrics>>,
}

impl std::fmt::Debug for PublicationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublicationService")
            .field("compensation_grace", &self.compensation_grace)
            .finish_non_exhaustive()
    }
}

impl PublicationService {
    pub fn new(store: Arc<dyn PublicationStore>, registrar: Arc<dyn FeedRegistrar>) -> Self {
        Self {
            store,
            registrar,
            compensation_grace: DEFAULT_COMPENSATION_GRACE,
            metrics: None,
        }
    }

    pub fn with_compensation_grace(mut self, grace: Duration) -> Self {
        self.compensation_grace = grace;
        self
    }

    /// Counts created publications, failures and compensations in `metrics`.
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    fn record(&self, f: impl FnOnce(&Metrics)) {
        if let Some(metrics) = &self.metrics {
            f(metrics);
        }
    }

    pub async fn healthcheck(&self) -> Result<(), ServiceError> {
        Ok(self.store.healthcheck().await?)
    }

    // ========================================================================
    // Publishers
    // ========================================================================

    pub async fn create_publisher(&self, input: NewPublisher) -> Result<Publisher, ServiceError> {
        input.validate()?;
        let publisher = Publisher::new(input);
        self.store.create_publisher(&publisher).await?;
        tracing::info!(publisher_id = %publisher.id, name = %publisher.name, "Publisher created");
        Ok(publisher)
    }

    pub async fn update_publisher(
        &self,
        id: Uuid,
        input: NewPublisher,
    ) -> Result<Publisher, ServiceError> {
        input.validate()?;
        let mut publisher = self
            .store
            .get_publisher(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("publisher", id))?;
        publisher.apply(input);
        self.store.update_publisher(&publisher).await?;
        Ok(publisher)
    }

    /// Fails while the publisher still owns publications.
    pub async fn delete_publisher(&self, id: Uuid) -> Result<(), ServiceError> {
        self.store.delete_publisher(id).await?;
        tracing::info!(publisher_id = %id, "Publisher deleted");
        Ok(())
    }

    pub async fn get_publisher(&self, id: Uuid) -> Result<Option<Publisher>, ServiceError> {
        Ok(self.store.get_publisher(id).await?)
    }

    pub async fn get_publishers(&self) -> Result<Vec<Publisher>, ServiceError> {
        Ok(self.store.get_publishers().await?)
    }

    /// Publications of one publisher; `NotFound` when the publisher is missing.
    pub async fn get_publisher_publications(
        &self,
        publisher_id: Uuid,
    ) -> Result<Vec<Publication>, ServiceError> {
        if self.store.get_publisher(publisher_id).await?.is_none() {
            return Err(ServiceError::not_found("publisher", publisher_id));
        }
        Ok(self.store.get_publications_by_publisher(publisher_id).await?)
    }

    // ========================================================================
    // Publications
    // ========================================================================

    /// Validates the input, then runs the creation workflow.
    pub async fn create_publication(
        &self,
        input: NewPublication,
    ) -> Result<Publication, ServiceError> {
        input.validate()?;
        Ok(self.run_creation(input).await?)
    }

    /// Updates the local row, then pushes changed feed settings to the registrar.
    ///
    /// The owning publisher never changes. If the registrar refuses, the
    /// previous values are written back.
    pub async fn update_publication(
        &self,
        id: Uuid,
        input: NewPublication,
    ) -> Result<Publication, ServiceError> {
        input.validate()?;
        let previous = self
            .store
            .get_publication(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("publication", id))?;

        let updated = Publication {
            id,
            name: input.name,
            description: input.description,
            language_code: input.language_code,
            publisher_id: previous.publisher_id,
            config: input.config,
        };
        self.store.update_publication(&updated).await?;

        let feed_changed = updated.config != previous.config
            || updated.language_code != previous.language_code;
        let Some(feed_url) = updated.config.feed_url().filter(|_| feed_changed) else {
            return Ok(updated);
        };

        let store = Arc::clone(&self.store);
        let snapshot = previous.clone();
        let guard = CompensationGuard::arm(
            "restore",
            id,
            self.compensation_grace,
            self.metrics.clone(),
            async move { store.update_publication(&snapshot).await },
        );

        let registration = match self
            .registrar
            .update_feed(id, feed_url, &updated.language_code)
            .await
        {
            Ok(()) => {
                guard.disarm();
                tracing::info!(publication_id = %id, feed_url = %feed_url, "Publication feed updated");
                return Ok(updated);
            }
            Err(e) => e,
        };
        guard.disarm();

        tracing::error!(publication_id = %id, error = %registration, "Feed update failed, restoring publication");
        let store = Arc::clone(&self.store);
        let restore = self
            .compensate("restore", async move { store.update_publication(&previous).await })
            .await;

        match restore {
            Ok(()) => Err(ServiceError::FeedUpdate {
                id,
                source: registration,
            }),
            Err(rollback) => {
                tracing::error!(
                    publication_id = %id,
                    error = %rollback,
                    "Failure restoring publication after failed feed update, manual reconciliation required"
                );
                Err(ServiceError::FeedUpdateAndRestore {
                    id,
                    registration,
                    rollback,
                })
            }
        }
    }

    /// Removes the feed, then the row. A failed feed removal keeps the row.
    pub async fn delete_publication(&self, id: Uuid) -> Result<(), ServiceError> {
        let publication = self
            .store
            .get_publication(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("publication", id))?;

        if publication.config.feed_url().is_some() {
            self.registrar
                .delete_feed(id)
                .await
                .map_err(|source| ServiceError::FeedRemoval { id, source })?;
        }

        self.store.delete_publication(id).await?;
        tracing::info!(publication_id = %id, "Publication deleted");
        Ok(())
    }

    pub async fn get_publication(&self, id: Uuid) -> Result<Option<Publication>, ServiceError> {
        Ok(self.store.get_publication(id).await?)
    }

    pub async fn get_publications(&self) -> Result<Vec<Publication>, ServiceError> {
        Ok(self.store.get_publications().await?)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-process doubles for the registrar and store seams.

    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use uuid::Uuid;

    use crate::entity::{Publication, Publisher};
    use crate::feeds::{FeedRegistrar, RegistrarError};
    use crate::storage::{Database, PublicationStore, StoreError};

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum FeedCall {
        Create(Uuid, String, String),
        Update(Uuid, String, String),
        Delete(Uuid),
    }

    /// Records every call and fails all of them while `fail` is set.
    #[derive(Default)]
    pub struct StubRegistrar {
        pub calls: Mutex<Vec<FeedCall>>,
        pub fail: AtomicBool,
    }

    impl StubRegistrar {
        pub fn failing() -> Arc<Self> {
            let stub = Self::default();
            stub.fail.store(true, Ordering::SeqCst);
            Arc::new(stub)
        }

        pub fn calls(&self) -> Vec<FeedCall> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: FeedCall) -> Result<(), RegistrarError> {
            self.calls.lock().unwrap().push(call);
            if self.fail.load(Ordering::SeqCst) {
                return Err(RegistrarError::Rejected {
                    status: 503,
                    message: "registrar unavailable".to_string(),
                });
            }
            Ok(())
        }
    }

    #[async_trait]
    impl FeedRegistrar for StubRegistrar {
        async fn create_feed(&self, id: Uuid, url: &str, lang: &str) -> Result<(), RegistrarError> {
            self.record(FeedCall::Create(id, url.to_string(), lang.to_string()))
        }

        async fn update_feed(&self, id: Uuid, url: &str, lang: &str) -> Result<(), RegistrarError> {
            self.record(FeedCall::Update(id, url.to_string(), lang.to_string()))
        }

        async fn delete_feed(&self, id: Uuid) -> Result<(), RegistrarError> {
            self.record(FeedCall::Delete(id))
        }
    }

    /// Answers nothing: every call stays pending until the caller gives up.
    pub struct HangingRegistrar;

    #[async_trait]
    impl FeedRegistrar for HangingRegistrar {
        async fn create_feed(&self, _: Uuid, _: &str, _: &str) -> Result<(), RegistrarError> {
            std::future::pending().await
        }

        async fn update_feed(&self, _: Uuid, _: &str, _: &str) -> Result<(), RegistrarError> {
            std::future::pending().await
        }

        async fn delete_feed(&self, _: Uuid) -> Result<(), RegistrarError> {
            std::future::pending().await
        }
    }

    /// Wraps a real database but refuses publication deletes, and every
    /// publication update after the first one (the restore write).
    pub struct FailingWritesStore {
        pub inner: Database,
        pub fail_delete: bool,
        pub fail_restore: bool,
        pub updates: AtomicUsize,
    }

    impl FailingWritesStore {
        pub fn new(inner: Database, fail_delete: bool, fail_restore: bool) -> Self {
            Self {
                inner,
                fail_delete,
                fail_restore,
                updates: AtomicUsize::new(0),
            }
        }
    }

    fn refused() -> StoreError {
        StoreError::Database(sqlx::Error::Protocol("write refused".to_string()))
    }

    #[async_trait]
    impl PublicationStore for FailingWritesStore {
        async fn create_publisher(&self, p: &Publisher) -> Result<(), StoreError> {
            self.inner.create_publisher(p).await
        }
        async fn update_publisher(&self, p: &Publisher) -> Result<(), StoreError> {
            self.inner.update_publisher(p).await
        }
        async fn delete_publisher(&self, id: Uuid) -> Result<(), StoreError> {
            self.inner.delete_publisher(id).await
        }
        async fn get_publisher(&self, id: Uuid) -> Result<Option<Publisher>, StoreError> {
            self.inner.get_publisher(id).await
        }
        async fn get_publishers(&self) -> Result<Vec<Publisher>, StoreError> {
            self.inner.get_publishers().await
        }
        async fn create_publication(&self, p: &Publication) -> Result<(), StoreError> {
            self.inner.create_publication(p).await
        }
        async fn update_publication(&self, p: &Publication) -> Result<(), StoreError> {
            let earlier = self.updates.fetch_add(1, Ordering::SeqCst);
            if self.fail_restore && earlier > 0 {
                return Err(refused());
            }
            self.inner.update_publication(p).await
        }
        async fn delete_publication(&self, id: Uuid) -> Result<(), StoreError> {
            if self.fail_delete {
                return Err(refused());
            }
            self.inner.delete_publication(id).await
        }
        async fn get_publication(&self, id: Uuid) -> Result<Option<Publication>, StoreError> {
            self.inner.get_publication(id).await
        }
        async fn get_publications(&self) -> Result<Vec<Publication>, StoreError> {
            self.inner.get_publications().await
        }
        async fn get_publications_by_publisher(
            &self,
            id: Uuid,
        ) -> Result<Vec<Publication>, StoreError> {
            self.inner.get_publications_by_publisher(id).await
        }
        async fn healthcheck(&self) -> Result<(), StoreError> {
            self.inner.healthcheck().await
        }
    }
}

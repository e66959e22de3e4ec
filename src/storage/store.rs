use async_trait::async_trait;
use uuid::Uuid;

use super::schema::Database;
use super::types::StoreError;
use crate::entity::{Publication, Publisher};

/// Persistence contract consumed by the service and HTTP layers.
///
/// Reads signal absence with `None` or an empty list. Writes keyed by id fail
/// with [`StoreError::NotFound`] when no row matches.
#[async_trait]
pub trait PublicationStore: Send + Sync {
    async fn create_publisher(&self, publisher: &Publisher) -> Result<(), StoreError>;
    async fn update_publisher(&self, publisher: &Publisher) -> Result<(), StoreError>;
    async fn delete_publisher(&self, id: Uuid) -> Result<(), StoreError>;
    async fn get_publisher(&self, id: Uuid) -> Result<Option<Publisher>, StoreError>;
    async fn get_publishers(&self) -> Result<Vec<Publisher>, StoreError>;

    async fn create_publication(&self, publication: &Publication) -> Result<(), StoreError>;
    async fn update_publication(&self, publication: &Publication) -> Result<(), StoreError>;
    async fn delete_publication(&self, id: Uuid) -> Result<(), StoreError>;
    async fn get_publication(&self, id: Uuid) -> Result<Option<Publication>, StoreError>;
    async fn get_publications(&self) -> Result<Vec<Publication>, StoreError>;
    async fn get_publications_by_publisher(
        &self,
        publisher_id: Uuid,
    ) -> Result<Vec<Publication>, StoreError>;

    async fn healthcheck(&self) -> Result<(), StoreError>;
}

#[async_trait]
impl PublicationStore for Database {
    async fn create_publisher(&self, publisher: &Publisher) -> Result<(), StoreError> {
        Database::create_publisher(self, publisher).await
    }

    async fn update_publisher(&self, publisher: &Publisher) -> Result<(), StoreError> {
        Database::update_publisher(self, publisher).await
    }

    async fn delete_publisher(&self, id: Uuid) -> Result<(), StoreError> {
        Database::delete_publisher(self, id).await
    }

    async fn get_publisher(&self, id: Uuid) -> Result<Option<Publisher>, StoreError> {
        Database::get_publisher(self, id).await
    }

    async fn get_publishers(&self) -> Result<Vec<Publisher>, StoreError> {
        Database::get_publishers(self).await
    }

    async fn create_publication(&self, publication: &Publication) -> Result<(), StoreError> {
        Database::create_publication(self, publication).await
    }

    async fn update_publication(&self, publication: &Publication) -> Result<(), StoreError> {
        Database::update_publication(self, publication).await
    }

    async fn delete_publication(&self, id: Uuid) -> Result<(), StoreError> {
        Database::delete_publication(self, id).await
    }

    async fn get_publication(&self, id: Uuid) -> Result<Option<Publication>, StoreError> {
        Database::get_publication(self, id).await
    }

    async fn get_publications(&self) -> Result<Vec<Publication>, StoreError> {
        Database::get_publications(self).await
    }

    async fn get_publications_by_publisher(
        &self,
        publisher_id: Uuid,
    ) -> Result<Vec<Publication>, StoreError> {
        Database::get_publications_by_publisher(self, publisher_id).await
    }

    async fn healthcheck(&self) -> Result<(), StoreError> {
        Database::healthcheck(self).await
    }
}

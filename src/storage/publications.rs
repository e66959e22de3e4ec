use uuid::Uuid;

use super::schema::Database;
use super::types::{PublicationRow, StoreError};
use crate::entity::Publication;

const ENTITY: &str = "publication";

const SELECT_PUBLICATION: &str = "SELECT uuid, name, description, language_code, publisher_uuid, type, type_config FROM publications";

impl Database {
    // ========================================================================
    // Publication Operations
    // ========================================================================

    /// Inserts a publication.
    ///
    /// Fails with `AlreadyExists` when the id is taken or the publisher already
    /// has a publication with this name, and with `PublisherNotFound` when the
    /// owning publisher does not exist. Both come from the schema constraints
    /// on a single autocommit insert, so concurrent writers only queue on the
    /// busy timeout.
    pub async fn create_publication(&self, publication: &Publication) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO publications
                (uuid, name, description, language_code, publisher_uuid, type, type_config)
            VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
        )
        .bind(publication.id)
        .bind(&publication.name)
        .bind(&publication.description)
        .bind(&publication.language_code)
        .bind(publication.publisher_id)
        .bind(publication.publication_type().as_str())
        .bind(publication.config.payload().to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            StoreError::classify(
                e,
                ENTITY,
                Some(StoreError::PublisherNotFound(publication.publisher_id)),
            )
        })?;
        Ok(())
    }

    /// Overwrites the mutable fields of the row matching `publication.id`.
    ///
    /// The owning publisher never changes.
    pub async fn update_publication(&self, publication: &Publication) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE publications
            SET name = ?, description = ?, language_code = ?, type = ?, type_config = ?
            WHERE uuid = ?
        "#,
        )
        .bind(&publication.name)
        .bind(&publication.description)
        .bind(&publication.language_code)
        .bind(publication.publication_type().as_str())
        .bind(publication.config.payload().to_string())
        .bind(publication.id)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::from_sqlx(e, ENTITY))?;
        StoreError::expect_one(ENTITY, publication.id, result.rows_affected())
    }

    /// Deletes one publication. Zero or several affected rows are errors.
    pub async fn delete_publication(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM publications WHERE uuid = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        StoreError::expect_one(ENTITY, id, result.rows_affected())
    }

    pub async fn get_publication(&self, id: Uuid) -> Result<Option<Publication>, StoreError> {
        let row: Option<PublicationRow> =
            sqlx::query_as(&format!("{SELECT_PUBLICATION} WHERE uuid = ?"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(PublicationRow::into_publication).transpose()
    }

    pub async fn get_publications(&self) -> Result<Vec<Publication>, StoreError> {
        let rows: Vec<PublicationRow> =
            sqlx::query_as(&format!("{SELECT_PUBLICATION} ORDER BY name, uuid"))
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter()
            .map(PublicationRow::into_publication)
            .collect()
    }

    pub async fn get_publications_by_publisher(
        &self,
        publisher_id: Uuid,
    ) -> Result<Vec<Publication>, StoreError> {
        let rows: Vec<PublicationRow> = sqlx::query_as(&format!(
            "{SELECT_PUBLICATION} WHERE publisher_uuid = ? ORDER BY name, uuid"
        ))
        .bind(publisher_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(PublicationRow::into_publication)
            .collect()
    }
}

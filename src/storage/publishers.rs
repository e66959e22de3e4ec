use uuid::Uuid;

use super::schema::Database;
use super::types::{is_foreign_key_violation, PublisherRow, StoreError};
use crate::entity::Publisher;

const ENTITY: &str = "publisher";

impl Database {
    // ========================================================================
    // Publisher Operations
    // ========================================================================

    pub async fn create_publisher(&self, publisher: &Publisher) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO publishers (uuid, name, url) VALUES (?, ?, ?)")
            .bind(publisher.id)
            .bind(&publisher.name)
            .bind(&publisher.url)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::from_sqlx(e, ENTITY))?;
        Ok(())
    }

    /// Overwrites name and url. The id is immutable.
    pub async fn update_publisher(&self, publisher: &Publisher) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE publishers SET name = ?, url = ? WHERE uuid = ?")
            .bind(&publisher.name)
            .bind(&publisher.url)
            .bind(publisher.id)
            .execute(&self.pool)
            .await?;
        StoreError::expect_one(ENTITY, publisher.id, result.rows_affected())
    }

    /// Deletes a publisher that owns no publications.
    ///
    /// Ownership is enforced by the `ON DELETE RESTRICT` reference, so the
    /// check and the delete are one statement.
    pub async fn delete_publisher(&self, id: Uuid) -> Result<(), StoreError> {
        let result = match sqlx::query("DELETE FROM publishers WHERE uuid = ?")
            .bind(id)
            .execute(&self.pool)
            .await
        {
            Ok(result) => result,
            Err(e) if is_foreign_key_violation(&e) => {
                let (count,): (i64,) =
                    sqlx::query_as("SELECT COUNT(*) FROM publications WHERE publisher_uuid = ?")
                        .bind(id)
                        .fetch_one(&self.pool)
                        .await?;
                return Err(StoreError::PublisherHasPublications { id, count });
            }
            Err(e) => return Err(e.into()),
        };
        StoreError::expect_one(ENTITY, id, result.rows_affected())
    }

    pub async fn get_publisher(&self, id: Uuid) -> Result<Option<Publisher>, StoreError> {
        let row: Option<PublisherRow> =
            sqlx::query_as("SELECT uuid, name, url FROM publishers WHERE uuid = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(Publisher::from))
    }

    pub async fn get_publishers(&self) -> Result<Vec<Publisher>, StoreError> {
        let rows: Vec<PublisherRow> =
            sqlx::query_as("SELECT uuid, name, url FROM publishers ORDER BY name, uuid")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(Publisher::from).collect())
    }
}

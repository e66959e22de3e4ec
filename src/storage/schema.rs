use secrecy::ExposeSecret;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use std::str::FromStr;
use std::time::Duration;

use super::types::StoreError;
use crate::config::DatabaseConfig;

// ============================================================================
// Database
// ============================================================================

#[derive(Clone)]
pub struct Database {
    pub(crate) pool: SqlitePool,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("connections", &self.pool.size())
            .finish()
    }
}

impl Database {
    /// Open a database with default pool settings and run migrations.
    ///
    /// `location` is a file path, `:memory:`, or a full `sqlite:` URL.
    pub async fn open(location: &str) -> Result<Self, StoreError> {
        Self::open_with(location, &DatabaseConfig::default()).await
    }

    /// Open the database described by the `[database]` config section.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        Self::open_with(config.url.expose_secret(), config).await
    }

    async fn open_with(location: &str, config: &DatabaseConfig) -> Result<Self, StoreError> {
        let url = if location.starts_with("sqlite:") {
            location.to_owned()
        } else if location == ":memory:" {
            "sqlite::memory:".to_owned()
        } else {
            format!("sqlite:{}?mode=rwc", location)
        };
        let in_memory = url.contains(":memory:") || url.contains("mode=memory");

        // busy_timeout: SQLite waits up to 5s for a lock before returning SQLITE_BUSY.
        // foreign_keys is a per-connection pragma, so it goes on the connect options.
        let options = SqliteConnectOptions::from_str(&url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        let mut pool_options = SqlitePoolOptions::new()
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs));
        pool_options = if in_memory {
            // Every in-memory connection is its own database: pin the pool to one
            // connection and never recycle it.
            pool_options
                .min_connections(1)
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            let max = config.max_connections.max(1);
            pool_options
                .min_connections(config.min_connections.min(max))
                .max_connections(max)
        };

        let pool = pool_options.connect_with(options).await?;
        let db = Self { pool };
        db.migrate()
            .await
            .map_err(|e| StoreError::Migration(e.to_string()))?;

        tracing::debug!(in_memory, "Database opened");
        Ok(db)
    }

    /// Run schema migrations atomically within a transaction.
    ///
    /// Every statement uses `IF NOT EXISTS`, so re-running on an existing
    /// database is a no-op.
    async fn migrate(&self) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS publishers (
                uuid BLOB PRIMARY KEY NOT NULL,
                name TEXT NOT NULL,
                url TEXT NOT NULL
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        // RESTRICT: a publisher cannot be removed while it owns publications.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS publications (
                uuid BLOB PRIMARY KEY NOT NULL,
                name TEXT NOT NULL,
                description TEXT NOT NULL,
                language_code TEXT NOT NULL,
                publisher_uuid BLOB NOT NULL REFERENCES publishers(uuid) ON DELETE RESTRICT,
                type TEXT NOT NULL,
                type_config TEXT NOT NULL,
                UNIQUE(publisher_uuid, name)
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_publications_publisher ON publications(publisher_uuid)",
        )
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Liveness check used by `/healthz`. Succeeds on an empty table.
    pub async fn healthcheck(&self) -> Result<(), StoreError> {
        let _: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM publications LIMIT 1)")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }

    /// Closes the pool, waiting for checked-out connections to return.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

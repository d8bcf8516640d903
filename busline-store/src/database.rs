use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::time::Duration;
use tracing::info;

use busline_core::{KvStore, StoreError, Versioned};

#[derive(Clone)]
pub struct DbClient {
    pub pool: Pool<Postgres>,
}

impl DbClient {
    pub async fn new(connection_string: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(connection_string)
            .await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("../migrations")
            .run(&self.pool)
            .await?;
        info!("Migrations completed successfully.");
        Ok(())
    }
}

/// `kv_entries` table keyed by document key. The version column makes the
/// conditional `UPDATE` a compare-and-swap.
#[derive(Clone)]
pub struct PostgresStore {
    db: DbClient,
}

impl PostgresStore {
    pub fn new(db: DbClient) -> Self {
        Self { db }
    }
}

#[async_trait]
impl KvStore for PostgresStore {
    async fn get(&self, key: &str) -> Result<Option<Versioned>, StoreError> {
        let row: Option<(i64, String)> =
            sqlx::query_as("SELECT version, value FROM kv_entries WHERE key = $1")
                .bind(key)
                .fetch_optional(&self.db.pool)
                .await
                .map_err(backend)?;

        Ok(row.map(|(version, value)| Versioned {
            version: version as u64,
            value,
        }))
    }

    async fn put(&self, key: &str, value: String) -> Result<u64, StoreError> {
        let version: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO kv_entries (key, version, value)
            VALUES ($1, 1, $2)
            ON CONFLICT (key) DO UPDATE
                SET version = kv_entries.version + 1,
                    value = EXCLUDED.value,
                    updated_at = now()
            RETURNING version
            "#,
        )
        .bind(key)
        .bind(value)
        .fetch_one(&self.db.pool)
        .await
        .map_err(backend)?;

        Ok(version as u64)
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<u64>,
        value: String,
    ) -> Result<bool, StoreError> {
        let result = match expected {
            None => {
                sqlx::query(
                    r#"
                    INSERT INTO kv_entries (key, version, value)
                    VALUES ($1, 1, $2)
                    ON CONFLICT (key) DO NOTHING
                    "#,
                )
                .bind(key)
                .bind(value)
                .execute(&self.db.pool)
                .await
            }
            Some(version) => {
                sqlx::query(
                    r#"
                    UPDATE kv_entries
                    SET version = version + 1, value = $2, updated_at = now()
                    WHERE key = $1 AND version = $3
                    "#,
                )
                .bind(key)
                .bind(value)
                .bind(version as i64)
                .execute(&self.db.pool)
                .await
            }
        }
        .map_err(backend)?;

        Ok(result.rows_affected() == 1)
    }
}

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

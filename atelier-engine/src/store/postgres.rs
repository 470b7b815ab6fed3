//! Postgres-backed store
//!
//! The remote backend: one JSONB `documents` table keyed by (collection, id).
//! Schema is created on startup with inline migrations.

use std::time::Duration;

use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tokio::sync::broadcast;

use super::{ChangeEvent, ChangeKind, Store, StoreError};

pub struct PgStore {
    pool: PgPool,
    changes: broadcast::Sender<ChangeEvent>,
}

impl PgStore {
    /// Connect and run migrations.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;

        run_migrations(&pool).await?;

        let (changes, _) = broadcast::channel(256);
        Ok(Self { pool, changes })
    }

    fn emit(&self, collection: &str, id: &str, kind: ChangeKind) {
        let _ = self.changes.send(ChangeEvent {
            collection: collection.to_string(),
            id: id.to_string(),
            kind,
        });
    }
}

async fn run_migrations(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            collection VARCHAR(64) NOT NULL,
            id VARCHAR(128) NOT NULL,
            doc JSONB NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL,
            PRIMARY KEY (collection, id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents(collection)",
    )
    .execute(pool)
    .await?;

    tracing::info!("Database migrations completed successfully");
    Ok(())
}

#[async_trait::async_trait]
impl Store for PgStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let row = sqlx::query("SELECT doc FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.get::<Value, _>("doc")))
    }

    async fn put(&self, collection: &str, id: &str, doc: Value) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO documents (collection, id, doc, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (collection, id)
            DO UPDATE SET doc = EXCLUDED.doc, updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(&doc)
        .bind(chrono::Utc::now())
        .execute(&self.pool)
        .await?;

        self.emit(collection, id, ChangeKind::Put);
        Ok(())
    }

    async fn merge(&self, collection: &str, id: &str, fields: Value) -> Result<(), StoreError> {
        // JSONB || is a top-level merge, matching MemoryStore.
        let result = sqlx::query(
            r#"
            UPDATE documents
            SET doc = doc || $3, updated_at = $4
            WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(&fields)
        .bind(chrono::Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            self.put(collection, id, fields).await?;
        } else {
            self.emit(collection, id, ChangeKind::Put);
        }
        Ok(())
    }

    async fn put_versioned(
        &self,
        collection: &str,
        id: &str,
        doc: Value,
        expected_version: u64,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE documents
            SET doc = $3, updated_at = $4
            WHERE collection = $1 AND id = $2
              AND COALESCE((doc->>'version')::BIGINT, 0) = $5
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(&doc)
        .bind(chrono::Utc::now())
        .bind(expected_version as i64)
        .execute(&self.pool)
        .await?;

        let written = result.rows_affected() > 0;
        if written {
            self.emit(collection, id, ChangeKind::Put);
        }
        Ok(written)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await?;

        self.emit(collection, id, ChangeKind::Delete);
        Ok(())
    }

    async fn list(&self, collection: &str) -> Result<Vec<Value>, StoreError> {
        let rows = sqlx::query("SELECT doc FROM documents WHERE collection = $1")
            .bind(collection)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(|r| r.get::<Value, _>("doc")).collect())
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.changes.subscribe()
    }
}

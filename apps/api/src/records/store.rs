//! Document storage for candidates and jobs.
//!
//! Documents are free-form JSON objects keyed by a business id (`candidate_id`
//! or `job_id`). Handlers and the assistant only see the `DocumentStore` trait;
//! `AppState` carries it as `Arc<dyn DocumentStore>`.

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::document::DocumentRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Candidates,
    Jobs,
}

impl Collection {
    pub fn table(self) -> &'static str {
        match self {
            Collection::Candidates => "candidates",
            Collection::Jobs => "jobs",
        }
    }

    /// Business key of a document; also the name of the unique column.
    pub fn key_field(self) -> &'static str {
        match self {
            Collection::Candidates => "candidate_id",
            Collection::Jobs => "job_id",
        }
    }

    /// Singular display name used in messages ("Candidate not found").
    pub fn label(self) -> &'static str {
        match self {
            Collection::Candidates => "Candidate",
            Collection::Jobs => "Job",
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// All documents, oldest first.
    async fn list(&self, collection: Collection) -> Result<Vec<DocumentRow>, AppError>;

    async fn get(&self, collection: Collection, key: &str) -> Result<Option<DocumentRow>, AppError>;

    /// Stores a new document. A key that already exists is a validation error.
    async fn insert(&self, collection: Collection, key: &str, data: Value) -> Result<Uuid, AppError>;

    /// Shallow-merges `patch` into the stored document. Returns `false` if no
    /// document has that key.
    async fn update(
        &self,
        collection: Collection,
        key: &str,
        patch: Map<String, Value>,
    ) -> Result<bool, AppError>;

    /// Returns `false` if no document has that key.
    async fn delete(&self, collection: Collection, key: &str) -> Result<bool, AppError>;

    async fn ping(&self) -> Result<(), AppError>;
}

// ────────────────────────────────────────────────────────────────────────────
// PgDocumentStore — JSONB documents in Postgres
// ────────────────────────────────────────────────────────────────────────────

const MAX_CONNECTIONS: u32 = 10;

pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    /// Opens the connection pool and applies pending migrations.
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        info!("Connecting to PostgreSQL...");
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("PostgreSQL document store ready");
        Ok(Self { pool })
    }
}

fn select_columns(collection: Collection) -> String {
    format!(
        "SELECT id, {} AS key, data, created_at, updated_at FROM {}",
        collection.key_field(),
        collection.table()
    )
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn list(&self, collection: Collection) -> Result<Vec<DocumentRow>, AppError> {
        let sql = format!("{} ORDER BY created_at, id", select_columns(collection));
        let rows = sqlx::query_as::<_, DocumentRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn get(&self, collection: Collection, key: &str) -> Result<Option<DocumentRow>, AppError> {
        let sql = format!(
            "{} WHERE {} = $1",
            select_columns(collection),
            collection.key_field()
        );
        let row = sqlx::query_as::<_, DocumentRow>(&sql)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn insert(&self, collection: Collection, key: &str, data: Value) -> Result<Uuid, AppError> {
        let sql = format!(
            "INSERT INTO {} (id, {}, data) VALUES ($1, $2, $3) RETURNING id",
            collection.table(),
            collection.key_field()
        );
        let result = sqlx::query_scalar::<_, Uuid>(&sql)
            .bind(Uuid::new_v4())
            .bind(key)
            .bind(data)
            .fetch_one(&self.pool)
            .await;

        match result {
            Ok(id) => Ok(id),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(AppError::Validation(
                format!("{} {key} already exists", collection.label()),
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn update(
        &self,
        collection: Collection,
        key: &str,
        patch: Map<String, Value>,
    ) -> Result<bool, AppError> {
        let sql = format!(
            "UPDATE {} SET data = data || $2, updated_at = NOW() WHERE {} = $1",
            collection.table(),
            collection.key_field()
        );
        let result = sqlx::query(&sql)
            .bind(key)
            .bind(Value::Object(patch))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, collection: Collection, key: &str) -> Result<bool, AppError> {
        let sql = format!(
            "DELETE FROM {} WHERE {} = $1",
            collection.table(),
            collection.key_field()
        );
        let result = sqlx::query(&sql).bind(key).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

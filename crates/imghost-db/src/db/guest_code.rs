//! Guest access code repository: CRUD for the `guest_codes` table.

use chrono::{DateTime, Utc};
use imghost_core::models::GuestAccessCode;
use imghost_core::AppError;
use sqlx::{PgPool, Postgres};

/// Row type for guest_codes table (for FromRow).
#[derive(Debug, sqlx::FromRow)]
struct GuestCodeRow {
    id: i64,
    code: String,
    expires_at: Option<DateTime<Utc>>,
    created_by: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl GuestCodeRow {
    fn into_code(self) -> GuestAccessCode {
        GuestAccessCode {
            id: self.id,
            code: self.code,
            expires_at: self.expires_at,
            created_by: self.created_by,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[async_trait::async_trait]
pub trait GuestCodeStore: Send + Sync {
    /// Insert a new code. A duplicate code value fails with a persistence error.
    async fn create(
        &self,
        code: &str,
        expires_at: Option<DateTime<Utc>>,
        created_by: &str,
    ) -> Result<GuestAccessCode, AppError>;

    async fn find_by_code(&self, code: &str) -> Result<Option<GuestAccessCode>, AppError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<GuestAccessCode>, AppError>;

    /// All codes, newest first.
    async fn list(&self) -> Result<Vec<GuestAccessCode>, AppError>;

    /// Codes with an expiry strictly before `now`.
    async fn list_expired(&self, now: DateTime<Utc>) -> Result<Vec<GuestAccessCode>, AppError>;

    /// Returns false when no row matched.
    async fn delete(&self, id: i64) -> Result<bool, AppError>;
}

#[derive(Clone)]
pub struct PgGuestCodeStore {
    pool: PgPool,
}

impl PgGuestCodeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl GuestCodeStore for PgGuestCodeStore {
    #[tracing::instrument(
        skip(self, code),
        fields(
            db.system = "postgresql",
            db.name = "imghost",
            db.table = "guest_codes",
            db.operation = "insert"
        )
    )]
    async fn create(
        &self,
        code: &str,
        expires_at: Option<DateTime<Utc>>,
        created_by: &str,
    ) -> Result<GuestAccessCode, AppError> {
        let row = sqlx::query_as::<Postgres, GuestCodeRow>(
            r#"
            INSERT INTO guest_codes (code, expires_at, created_by)
            VALUES ($1, $2, $3)
            RETURNING id, code, expires_at, created_by, created_at, updated_at
            "#,
        )
        .bind(code)
        .bind(expires_at)
        .bind(created_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = ?e, "Failed to insert guest code");
            AppError::Persistence(e)
        })?;

        Ok(row.into_code())
    }

    #[tracing::instrument(
        skip(self, code),
        fields(db.system = "postgresql", db.table = "guest_codes", db.operation = "select")
    )]
    async fn find_by_code(&self, code: &str) -> Result<Option<GuestAccessCode>, AppError> {
        let row = sqlx::query_as::<Postgres, GuestCodeRow>(
            "SELECT id, code, expires_at, created_by, created_at, updated_at FROM guest_codes WHERE code = $1",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(GuestCodeRow::into_code))
    }

    #[tracing::instrument(
        skip(self),
        fields(db.system = "postgresql", db.table = "guest_codes", db.operation = "select")
    )]
    async fn find_by_id(&self, id: i64) -> Result<Option<GuestAccessCode>, AppError> {
        let row = sqlx::query_as::<Postgres, GuestCodeRow>(
            "SELECT id, code, expires_at, created_by, created_at, updated_at FROM guest_codes WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(GuestCodeRow::into_code))
    }

    #[tracing::instrument(
        skip(self),
        fields(db.system = "postgresql", db.table = "guest_codes", db.operation = "select")
    )]
    async fn list(&self) -> Result<Vec<GuestAccessCode>, AppError> {
        let rows = sqlx::query_as::<Postgres, GuestCodeRow>(
            "SELECT id, code, expires_at, created_by, created_at, updated_at FROM guest_codes ORDER BY id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(GuestCodeRow::into_code).collect())
    }

    #[tracing::instrument(
        skip(self),
        fields(db.system = "postgresql", db.table = "guest_codes", db.operation = "select")
    )]
    async fn list_expired(&self, now: DateTime<Utc>) -> Result<Vec<GuestAccessCode>, AppError> {
        let rows = sqlx::query_as::<Postgres, GuestCodeRow>(
            r#"
            SELECT id, code, expires_at, created_by, created_at, updated_at
            FROM guest_codes
            WHERE expires_at IS NOT NULL AND expires_at < $1
            ORDER BY id ASC
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(GuestCodeRow::into_code).collect())
    }

    #[tracing::instrument(
        skip(self),
        fields(db.system = "postgresql", db.table = "guest_codes", db.operation = "delete")
    )]
    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM guest_codes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

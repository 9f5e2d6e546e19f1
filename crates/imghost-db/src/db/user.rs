//! Account repository over the `users` table.

use chrono::{DateTime, Utc};
use imghost_core::models::User;
use imghost_core::AppError;
use sqlx::{PgPool, Postgres};

const USER_COLUMNS: &str = "id, username, password_hash, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    password_hash: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> User {
        User {
            id: self.id,
            username: self.username,
            password_hash: self.password_hash,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[async_trait::async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError>;

    /// Insert an account. A duplicate username fails with a persistence error.
    async fn create(&self, username: &str, password_hash: &str) -> Result<User, AppError>;

    /// Returns false when no row matched.
    async fn update_password(&self, id: i64, password_hash: &str) -> Result<bool, AppError>;
}

#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl UserStore for PgUserStore {
    #[tracing::instrument(
        skip(self),
        fields(db.system = "postgresql", db.table = "users", db.operation = "select")
    )]
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {} FROM users WHERE username = $1", USER_COLUMNS);
        let row = sqlx::query_as::<Postgres, UserRow>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(UserRow::into_user))
    }

    #[tracing::instrument(
        skip(self, password_hash),
        fields(db.system = "postgresql", db.table = "users", db.operation = "insert")
    )]
    async fn create(&self, username: &str, password_hash: &str) -> Result<User, AppError> {
        let sql = format!(
            "INSERT INTO users (username, password_hash) VALUES ($1, $2) RETURNING {}",
            USER_COLUMNS
        );
        let row = sqlx::query_as::<Postgres, UserRow>(&sql)
            .bind(username)
            .bind(password_hash)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = ?e, "Failed to insert user");
                AppError::Persistence(e)
            })?;

        Ok(row.into_user())
    }

    #[tracing::instrument(
        skip(self, password_hash),
        fields(db.system = "postgresql", db.table = "users", db.operation = "update")
    )]
    async fn update_password(&self, id: i64, password_hash: &str) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(password_hash)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

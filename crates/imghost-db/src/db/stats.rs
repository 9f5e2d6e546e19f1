//! Daily upload statistics: one row per calendar day in `image_stats`.

use chrono::NaiveDate;
use imghost_core::models::DailyStat;
use imghost_core::AppError;
use sqlx::{PgPool, Postgres};

#[async_trait::async_trait]
pub trait StatsStore: Send + Sync {
    /// Add one image of `bytes` to the row for `date`, creating it if needed.
    async fn record_upload(&self, date: NaiveDate, bytes: i64) -> Result<(), AppError>;

    async fn get_day(&self, date: NaiveDate) -> Result<Option<DailyStat>, AppError>;
}

#[derive(Clone)]
pub struct PgStatsStore {
    pool: PgPool,
}

impl PgStatsStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl StatsStore for PgStatsStore {
    #[tracing::instrument(
        skip(self),
        fields(
            db.system = "postgresql",
            db.name = "imghost",
            db.table = "image_stats",
            db.operation = "upsert"
        )
    )]
    async fn record_upload(&self, date: NaiveDate, bytes: i64) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO image_stats (date, total_images, total_size)
            VALUES ($1, 1, $2)
            ON CONFLICT (date) DO UPDATE
            SET total_images = image_stats.total_images + 1,
                total_size = image_stats.total_size + EXCLUDED.total_size,
                updated_at = NOW()
            "#,
        )
        .bind(date)
        .bind(bytes)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = ?e, %date, "Failed to upsert daily stats");
            AppError::Persistence(e)
        })?;

        Ok(())
    }

    #[tracing::instrument(
        skip(self),
        fields(db.system = "postgresql", db.table = "image_stats", db.operation = "select")
    )]
    async fn get_day(&self, date: NaiveDate) -> Result<Option<DailyStat>, AppError> {
        let row: Option<(NaiveDate, i64, i64)> = sqlx::query_as::<Postgres, _>(
            "SELECT date, total_images, total_size FROM image_stats WHERE date = $1",
        )
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(date, total_images, total_size)| DailyStat {
            date,
            total_images,
            total_size,
        }))
    }
}

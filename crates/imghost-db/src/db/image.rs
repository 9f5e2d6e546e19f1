//! Image record repository: CRUD over the `images` table.

use chrono::{DateTime, NaiveDate, Utc};
use imghost_core::models::{ImageRecord, NewImageRecord, SizeReport, StatsSummary};
use imghost_core::AppError;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

const IMAGE_COLUMNS: &str = "id, uuid, original_name, file_size, mime_type, width, height, \
     storage_key, public_url, thumbnail_key, thumbnail_url, upload_ip, user_agent, uploaded_by, \
     created_at, updated_at, deleted_at";

/// Row type for the images table (for FromRow).
#[derive(Debug, sqlx::FromRow)]
struct ImageRow {
    id: i64,
    uuid: Uuid,
    original_name: String,
    file_size: i64,
    mime_type: String,
    width: i32,
    height: i32,
    storage_key: String,
    public_url: String,
    thumbnail_key: Option<String>,
    thumbnail_url: Option<String>,
    upload_ip: Option<String>,
    user_agent: Option<String>,
    uploaded_by: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl ImageRow {
    fn into_record(self) -> ImageRecord {
        ImageRecord {
            id: self.id,
            uuid: self.uuid,
            original_name: self.original_name,
            file_size: self.file_size,
            mime_type: self.mime_type,
            width: self.width,
            height: self.height,
            storage_key: self.storage_key,
            public_url: self.public_url,
            thumbnail_key: self.thumbnail_key,
            thumbnail_url: self.thumbnail_url,
            upload_ip: self.upload_ip,
            user_agent: self.user_agent,
            uploaded_by: self.uploaded_by,
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted_at: self.deleted_at,
        }
    }
}

/// Persistence for image records.
///
/// Deletion is two-phase: [`ImageStore::mark_deleted`] tombstones the row so it
/// disappears from reads, [`ImageStore::purge`] removes it physically. Stores that
/// only have one phase report success from both.
#[async_trait::async_trait]
pub trait ImageStore: Send + Sync {
    async fn create(&self, record: NewImageRecord) -> Result<ImageRecord, AppError>;

    /// Look up a live (not tombstoned) record.
    async fn find_by_uuid(&self, uuid: Uuid) -> Result<Option<ImageRecord>, AppError>;

    /// Live records, newest first.
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<ImageRecord>, AppError>;

    /// Every record attributed to `identity`, tombstoned ones included.
    async fn list_by_uploader(&self, identity: &str) -> Result<Vec<ImageRecord>, AppError>;

    /// Distinct `uploaded_by` values starting with `prefix`, tombstoned rows included.
    async fn list_uploaders_with_prefix(&self, prefix: &str) -> Result<Vec<String>, AppError>;

    /// Returns false when no live record matched.
    async fn mark_deleted(&self, uuid: Uuid) -> Result<bool, AppError>;

    /// Returns false when no row matched.
    async fn purge(&self, uuid: Uuid) -> Result<bool, AppError>;

    /// Totals over live records; `today_images` counts records created on `today` (UTC).
    async fn summary(&self, today: NaiveDate) -> Result<StatsSummary, AppError>;

    /// Size aggregates over live records. All zero when there are none.
    async fn size_report(&self, today: NaiveDate) -> Result<SizeReport, AppError>;
}

/// Tombstone then purge. Returns whether a live record existed.
pub async fn delete_image_record(store: &dyn ImageStore, uuid: Uuid) -> Result<bool, AppError> {
    let existed = store.mark_deleted(uuid).await?;
    let purged = store.purge(uuid).await?;
    Ok(existed || purged)
}

/// Postgres-backed [`ImageStore`].
#[derive(Clone)]
pub struct PgImageStore {
    pool: PgPool,
}

impl PgImageStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ImageStore for PgImageStore {
    #[tracing::instrument(
        skip(self, record),
        fields(
            db.system = "postgresql",
            db.name = "imghost",
            db.table = "images",
            db.operation = "insert",
            image_uuid = %record.uuid
        )
    )]
    async fn create(&self, record: NewImageRecord) -> Result<ImageRecord, AppError> {
        let sql = format!(
            r#"
            INSERT INTO images (
                uuid, original_name, file_size, mime_type, width, height,
                storage_key, public_url, thumbnail_key, thumbnail_url,
                upload_ip, user_agent, uploaded_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {}
            "#,
            IMAGE_COLUMNS
        );

        let row = sqlx::query_as::<Postgres, ImageRow>(&sql)
            .bind(record.uuid)
            .bind(&record.original_name)
            .bind(record.file_size)
            .bind(&record.mime_type)
            .bind(record.width)
            .bind(record.height)
            .bind(&record.storage_key)
            .bind(&record.public_url)
            .bind(&record.thumbnail_key)
            .bind(&record.thumbnail_url)
            .bind(&record.upload_ip)
            .bind(&record.user_agent)
            .bind(&record.uploaded_by)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = ?e, image_uuid = %record.uuid, "Failed to insert image record");
                AppError::Persistence(e)
            })?;

        Ok(row.into_record())
    }

    #[tracing::instrument(
        skip(self),
        fields(db.system = "postgresql", db.table = "images", db.operation = "select")
    )]
    async fn find_by_uuid(&self, uuid: Uuid) -> Result<Option<ImageRecord>, AppError> {
        let sql = format!(
            "SELECT {} FROM images WHERE uuid = $1 AND deleted_at IS NULL",
            IMAGE_COLUMNS
        );

        let row = sqlx::query_as::<Postgres, ImageRow>(&sql)
            .bind(uuid)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(ImageRow::into_record))
    }

    #[tracing::instrument(
        skip(self),
        fields(db.system = "postgresql", db.table = "images", db.operation = "select")
    )]
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<ImageRecord>, AppError> {
        let sql = format!(
            "SELECT {} FROM images WHERE deleted_at IS NULL \
             ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2",
            IMAGE_COLUMNS
        );

        let rows = sqlx::query_as::<Postgres, ImageRow>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(ImageRow::into_record).collect())
    }

    #[tracing::instrument(
        skip(self),
        fields(db.system = "postgresql", db.table = "images", db.operation = "select")
    )]
    async fn list_by_uploader(&self, identity: &str) -> Result<Vec<ImageRecord>, AppError> {
        let sql = format!(
            "SELECT {} FROM images WHERE uploaded_by = $1 ORDER BY id ASC",
            IMAGE_COLUMNS
        );

        let rows = sqlx::query_as::<Postgres, ImageRow>(&sql)
            .bind(identity)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(ImageRow::into_record).collect())
    }

    #[tracing::instrument(
        skip(self),
        fields(db.system = "postgresql", db.table = "images", db.operation = "select")
    )]
    async fn list_uploaders_with_prefix(&self, prefix: &str) -> Result<Vec<String>, AppError> {
        let pattern = format!("{}%", escape_like(prefix));
        let uploaders: Vec<(String,)> = sqlx::query_as(
            "SELECT DISTINCT uploaded_by FROM images WHERE uploaded_by LIKE $1 ESCAPE '\\'",
        )
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;

        Ok(uploaders.into_iter().map(|(uploader,)| uploader).collect())
    }

    #[tracing::instrument(
        skip(self),
        fields(db.system = "postgresql", db.table = "images", db.operation = "update")
    )]
    async fn mark_deleted(&self, uuid: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE images
            SET deleted_at = NOW(), updated_at = NOW()
            WHERE uuid = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(uuid)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(
        skip(self),
        fields(db.system = "postgresql", db.table = "images", db.operation = "delete")
    )]
    async fn purge(&self, uuid: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM images WHERE uuid = $1")
            .bind(uuid)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(
        skip(self),
        fields(db.system = "postgresql", db.table = "images", db.operation = "aggregate")
    )]
    async fn summary(&self, today: NaiveDate) -> Result<StatsSummary, AppError> {
        let (total_images, total_size, today_images): (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*)::BIGINT,
                COALESCE(SUM(file_size), 0)::BIGINT,
                COUNT(*) FILTER (WHERE (created_at AT TIME ZONE 'UTC')::DATE = $1)::BIGINT
            FROM images
            WHERE deleted_at IS NULL
            "#,
        )
        .bind(today)
        .fetch_one(&self.pool)
        .await?;

        Ok(StatsSummary {
            total_images,
            total_size,
            today_images,
        })
    }

    #[tracing::instrument(
        skip(self),
        fields(db.system = "postgresql", db.table = "images", db.operation = "aggregate")
    )]
    async fn size_report(&self, today: NaiveDate) -> Result<SizeReport, AppError> {
        let row: (i64, i64, i64, i64, i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*)::BIGINT,
                COALESCE(SUM(file_size), 0)::BIGINT,
                COUNT(*) FILTER (WHERE (created_at AT TIME ZONE 'UTC')::DATE = $1)::BIGINT,
                COALESCE(SUM(file_size) FILTER (WHERE (created_at AT TIME ZONE 'UTC')::DATE = $1), 0)::BIGINT,
                COALESCE(AVG(file_size), 0)::BIGINT,
                COALESCE(MAX(file_size), 0)::BIGINT,
                COALESCE(MIN(file_size), 0)::BIGINT
            FROM images
            WHERE deleted_at IS NULL
            "#,
        )
        .bind(today)
        .fetch_one(&self.pool)
        .await?;

        Ok(SizeReport {
            total_images: row.0,
            total_size: row.1,
            today_images: row.2,
            today_size: row.3,
            average_file_size: row.4,
            max_file_size: row.5,
            min_file_size: row.6,
        })
    }
}

/// Escape `LIKE` wildcards so `prefix` matches literally.
fn escape_like(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len());
    for c in prefix.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("guest:"), "guest:");
        assert_eq!(escape_like("a_b%c\\"), "a\\_b\\%c\\\\");
    }
}

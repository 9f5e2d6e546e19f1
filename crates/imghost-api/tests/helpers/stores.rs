//! In-memory metadata stores.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use imghost_core::models::{
    DailyStat, GuestAccessCode, ImageRecord, NewImageRecord, SizeReport, StatsSummary, User,
};
use imghost_core::{AppError, Clock, SystemClock};
use imghost_db::{GuestCodeStore, ImageStore, StatsStore, UserStore};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

fn injected_failure(what: &str) -> AppError {
    AppError::Persistence(sqlx::Error::Protocol(format!("injected {} failure", what)))
}

pub struct MemoryImageStore {
    rows: Mutex<Vec<ImageRecord>>,
    next_id: AtomicI64,
    fail_creates: AtomicBool,
    fail_purges: AtomicBool,
    clock: Arc<dyn Clock>,
}

impl MemoryImageStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Timestamps rows with `clock` so date-based summaries line up with it.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(0),
            fail_creates: AtomicBool::new(false),
            fail_purges: AtomicBool::new(false),
            clock,
        }
    }

    pub fn fail_creates(&self, fail: bool) {
        self.fail_creates.store(fail, Ordering::SeqCst);
    }

    pub fn fail_purges(&self, fail: bool) {
        self.fail_purges.store(fail, Ordering::SeqCst);
    }

    /// Every row, tombstoned ones included.
    pub fn all(&self) -> Vec<ImageRecord> {
        self.rows.lock().unwrap().clone()
    }

    pub fn live_count(&self) -> usize {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| !r.is_deleted())
            .count()
    }
}

#[async_trait]
impl ImageStore for MemoryImageStore {
    async fn create(&self, record: NewImageRecord) -> Result<ImageRecord, AppError> {
        if self.fail_creates.load(Ordering::SeqCst) {
            return Err(injected_failure("create"));
        }
        let now = self.clock.now();
        let image = ImageRecord {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            uuid: record.uuid,
            original_name: record.original_name,
            file_size: record.file_size,
            mime_type: record.mime_type,
            width: record.width,
            height: record.height,
            storage_key: record.storage_key,
            public_url: record.public_url,
            thumbnail_key: record.thumbnail_key,
            thumbnail_url: record.thumbnail_url,
            upload_ip: record.upload_ip,
            user_agent: record.user_agent,
            uploaded_by: record.uploaded_by,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.rows.lock().unwrap().push(image.clone());
        Ok(image)
    }

    async fn find_by_uuid(&self, uuid: Uuid) -> Result<Option<ImageRecord>, AppError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.uuid == uuid && !r.is_deleted())
            .cloned())
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<ImageRecord>, AppError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .rev()
            .filter(|r| !r.is_deleted())
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn list_by_uploader(&self, identity: &str) -> Result<Vec<ImageRecord>, AppError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.uploaded_by == identity)
            .cloned()
            .collect())
    }

    async fn list_uploaders_with_prefix(&self, prefix: &str) -> Result<Vec<String>, AppError> {
        let mut uploaders: Vec<String> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.uploaded_by.starts_with(prefix))
            .map(|r| r.uploaded_by.clone())
            .collect();
        uploaders.sort();
        uploaders.dedup();
        Ok(uploaders)
    }

    async fn mark_deleted(&self, uuid: Uuid) -> Result<bool, AppError> {
        let mut rows = self.rows.lock().unwrap();
        match rows.iter_mut().find(|r| r.uuid == uuid && !r.is_deleted()) {
            Some(row) => {
                row.deleted_at = Some(self.clock.now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn purge(&self, uuid: Uuid) -> Result<bool, AppError> {
        if self.fail_purges.load(Ordering::SeqCst) {
            return Err(injected_failure("purge"));
        }
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|r| r.uuid != uuid);
        Ok(rows.len() < before)
    }

    async fn summary(&self, today: NaiveDate) -> Result<StatsSummary, AppError> {
        let rows = self.rows.lock().unwrap();
        let live = rows.iter().filter(|r| !r.is_deleted());
        Ok(StatsSummary {
            total_images: live.clone().count() as i64,
            total_size: live.clone().map(|r| r.file_size).sum(),
            today_images: live
                .filter(|r| r.created_at.date_naive() == today)
                .count() as i64,
        })
    }

    async fn size_report(&self, today: NaiveDate) -> Result<SizeReport, AppError> {
        let rows = self.rows.lock().unwrap();
        let sizes: Vec<i64> = rows
            .iter()
            .filter(|r| !r.is_deleted())
            .map(|r| r.file_size)
            .collect();
        let todays: Vec<i64> = rows
            .iter()
            .filter(|r| !r.is_deleted() && r.created_at.date_naive() == today)
            .map(|r| r.file_size)
            .collect();
        if sizes.is_empty() {
            return Ok(SizeReport::default());
        }
        let total: i64 = sizes.iter().sum();
        Ok(SizeReport {
            total_images: sizes.len() as i64,
            total_size: total,
            today_images: todays.len() as i64,
            today_size: todays.iter().sum(),
            average_file_size: total / sizes.len() as i64,
            max_file_size: sizes.iter().copied().max().unwrap_or(0),
            min_file_size: sizes.iter().copied().min().unwrap_or(0),
        })
    }
}

#[derive(Default)]
pub struct MemoryStatsStore {
    days: Mutex<HashMap<NaiveDate, DailyStat>>,
    fail: AtomicBool,
}

impl MemoryStatsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl StatsStore for MemoryStatsStore {
    async fn record_upload(&self, date: NaiveDate, bytes: i64) -> Result<(), AppError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(injected_failure("stats"));
        }
        let mut days = self.days.lock().unwrap();
        let day = days.entry(date).or_insert(DailyStat {
            date,
            total_images: 0,
            total_size: 0,
        });
        day.total_images += 1;
        day.total_size += bytes;
        Ok(())
    }

    async fn get_day(&self, date: NaiveDate) -> Result<Option<DailyStat>, AppError> {
        Ok(self.days.lock().unwrap().get(&date).cloned())
    }
}

pub struct MemoryGuestCodeStore {
    codes: Mutex<Vec<GuestAccessCode>>,
    next_id: AtomicI64,
    clock: Arc<dyn Clock>,
}

impl MemoryGuestCodeStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            codes: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(0),
            clock,
        }
    }

    /// Insert a code directly, bypassing the service.
    pub fn insert(&self, code: &str, expires_at: Option<DateTime<Utc>>) -> GuestAccessCode {
        self.push(code, expires_at, "root")
    }

    fn push(
        &self,
        code: &str,
        expires_at: Option<DateTime<Utc>>,
        created_by: &str,
    ) -> GuestAccessCode {
        let now = self.clock.now();
        let row = GuestAccessCode {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            code: code.to_string(),
            expires_at,
            created_by: created_by.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.codes.lock().unwrap().push(row.clone());
        row
    }

    pub fn count(&self) -> usize {
        self.codes.lock().unwrap().len()
    }
}

#[async_trait]
impl GuestCodeStore for MemoryGuestCodeStore {
    async fn create(
        &self,
        code: &str,
        expires_at: Option<DateTime<Utc>>,
        created_by: &str,
    ) -> Result<GuestAccessCode, AppError> {
        if self.codes.lock().unwrap().iter().any(|c| c.code == code) {
            return Err(AppError::Persistence(sqlx::Error::Protocol(
                "duplicate key value violates unique constraint".to_string(),
            )));
        }
        Ok(self.push(code, expires_at, created_by))
    }
    async fn find_by_code(&self, code: &str) -> Result<Option<GuestAccessCode>, AppError> {
        Ok(self
            .codes
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.code == code)
            .cloned())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<GuestAccessCode>, AppError> {
        Ok(self
            .codes
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == id)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<GuestAccessCode>, AppError> {
        let mut codes = self.codes.lock().unwrap().clone();
        codes.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(codes)
    }

    async fn list_expired(&self, now: DateTime<Utc>) -> Result<Vec<GuestAccessCode>, AppError> {
        Ok(self
            .codes
            .lock()
            .unwrap()
            .iter()
            .filter(|c| matches!(c.expires_at, Some(at) if at < now))
            .cloned()
            .collect())
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let mut codes = self.codes.lock().unwrap();
        let before = codes.len();
        codes.retain(|c| c.id != id);
        Ok(codes.len() < before)
    }
}

pub struct MemoryUserStore {
    users: Mutex<Vec<User>>,
    next_id: AtomicI64,
    clock: Arc<dyn Clock>,
}

impl MemoryUserStore {
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            users: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(0),
            clock,
        }
    }

    pub fn count(&self) -> usize {
        self.users.lock().unwrap().len()
    }

    pub fn get(&self, username: &str) -> Option<User> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.username == username)
            .cloned()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        Ok(self.get(username))
    }

    async fn create(&self, username: &str, password_hash: &str) -> Result<User, AppError> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.username == username) {
            return Err(AppError::Persistence(sqlx::Error::Protocol(
                "duplicate key value violates unique constraint".to_string(),
            )));
        }
        let now = self.clock.now();
        let user = User {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            created_at: now,
            updated_at: now,
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn update_password(&self, id: i64, password_hash: &str) -> Result<bool, AppError> {
        let mut users = self.users.lock().unwrap();
        match users.iter_mut().find(|u| u.id == id) {
            Some(user) => {
                user.password_hash = password_hash.to_string();
                user.updated_at = self.clock.now();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

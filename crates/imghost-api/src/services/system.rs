//! Host and library status for the administrator dashboard.

use imghost_core::models::SizeReport;
use imghost_core::{AppError, Clock};
use imghost_db::ImageStore;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use sysinfo::Disks;

/// Capacity of the filesystem holding the upload directory, in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiskUsage {
    #[serde(rename = "disk_total")]
    pub total: u64,
    #[serde(rename = "disk_free")]
    pub free: u64,
    #[serde(rename = "disk_used")]
    pub used: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemStatus {
    pub uptime_seconds: u64,
    #[serde(flatten)]
    pub disk: DiskUsage,
    #[serde(flatten)]
    pub sizes: SizeReport,
}

/// Usage of the mounted filesystem that contains `path`: the disk with the
/// longest mount point that is a prefix of it.
pub fn disk_usage_for(path: &Path) -> Option<DiskUsage> {
    let target = std::fs::canonicalize(path).unwrap_or_else(|_| PathBuf::from(path));
    let disks = Disks::new_with_refreshed_list();

    disks
        .iter()
        .filter(|disk| target.starts_with(disk.mount_point()))
        .max_by_key(|disk| disk.mount_point().as_os_str().len())
        .map(|disk| {
            let total = disk.total_space();
            let free = disk.available_space();
            DiskUsage {
                total,
                free,
                used: total.saturating_sub(free),
            }
        })
}

pub struct SystemService {
    images: Arc<dyn ImageStore>,
    clock: Arc<dyn Clock>,
    upload_path: PathBuf,
    started_at: Instant,
}

impl SystemService {
    pub fn new(images: Arc<dyn ImageStore>, clock: Arc<dyn Clock>, upload_path: PathBuf) -> Self {
        Self {
            images,
            clock,
            upload_path,
            started_at: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    /// Uptime, disk capacity and size aggregates over live images.
    ///
    /// Disk figures are zero when no mounted filesystem contains the upload path.
    #[tracing::instrument(skip(self), fields(operation = "system_status"))]
    pub async fn status(&self) -> Result<SystemStatus, AppError> {
        let path = self.upload_path.clone();
        let disk = tokio::task::spawn_blocking(move || disk_usage_for(&path))
            .await
            .map_err(|e| AppError::Internal(format!("Disk usage task failed: {}", e)))?;

        let disk = disk.unwrap_or_else(|| {
            tracing::warn!(
                upload_path = %self.upload_path.display(),
                "Could not determine disk usage for upload path"
            );
            DiskUsage::default()
        });

        let sizes = self
            .images
            .size_report(self.clock.now().date_naive())
            .await?;

        Ok(SystemStatus {
            uptime_seconds: self.uptime_seconds(),
            disk,
            sizes,
        })
    }
}

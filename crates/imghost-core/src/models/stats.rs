use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Per-day upload totals, one row per calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyStat {
    pub date: NaiveDate,
    pub total_images: i64,
    pub total_size: i64,
}

/// Aggregate view returned by the stats endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSummary {
    pub total_images: i64,
    pub total_size: i64,
    pub today_images: i64,
}

/// File size aggregates over live images, used by the system status endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeReport {
    pub total_images: i64,
    pub total_size: i64,
    pub today_images: i64,
    pub today_size: i64,
    pub average_file_size: i64,
    pub max_file_size: i64,
    pub min_file_size: i64,
}

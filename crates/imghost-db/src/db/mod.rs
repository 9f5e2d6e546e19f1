//! Database repositories for data access layer
//
// Image records and the two-phase delete helper
pub mod image;
//
// Per-day upload totals
pub mod stats;
//
// Guest access codes
pub mod guest_code;
//
// Password accounts
pub mod user;

pub use guest_code::{GuestCodeStore, PgGuestCodeStore};
pub use image::{delete_image_record, ImageStore, PgImageStore};
pub use stats::{PgStatsStore, StatsStore};
pub use user::{PgUserStore, UserStore};

//! Data models for the application
//!
//! Each sub-module holds one domain area: stored images, guest access codes,
//! accounts, upload statistics and the authenticated principal.

mod guest_code;
mod image;
mod principal;
mod stats;
mod user;

pub use guest_code::{GuestAccessCode, GUEST_IDENTITY_PREFIX};
pub use image::{ImageRecord, NewImageRecord};
pub use principal::Principal;
pub use stats::{DailyStat, SizeReport, StatsSummary};
pub use user::User;

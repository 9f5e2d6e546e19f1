//! imghost Database Layer
//!
//! Postgres repositories for image records, daily upload statistics, guest
//! access codes and accounts. Each repository is exposed through an async trait so the
//! upload pipeline and the guest code lifecycle can run against in-memory stores.

pub mod db;

pub use db::{
    delete_image_record, GuestCodeStore, ImageStore, PgGuestCodeStore, PgImageStore,
    PgStatsStore, PgUserStore, StatsStore, UserStore,
};

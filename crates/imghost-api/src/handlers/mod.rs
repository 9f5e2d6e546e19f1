pub mod auth;
pub mod guest_codes;
pub mod health;
pub mod images;
pub mod stats;
pub mod system;
pub mod upload;

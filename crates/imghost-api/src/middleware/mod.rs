pub mod client_ip;
pub mod rate_limit;

pub use client_ip::{extract_client_ip, ClientIp};
pub use rate_limit::{rate_limit_middleware, RateLimiter};

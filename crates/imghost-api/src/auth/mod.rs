pub mod jwt;
pub mod middleware;
pub mod password;

pub use jwt::{Claims, JwtService};
pub use middleware::auth_middleware;
pub use password::{hash_password, verify_password};

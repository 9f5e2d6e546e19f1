//! Configuration module
//!
//! Configuration is read once at startup from environment variables (an optional
//! `.env` file is loaded first). Numeric values that fail to parse fall back to
//! their defaults; [`Config::validate`] rejects inconsistent settings.

use std::env;
use std::net::IpAddr;

use crate::models::GUEST_IDENTITY_PREFIX;
use crate::storage_types::StorageBackend;

// Common constants
const MAX_CONNECTIONS: u32 = 10;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const SERVER_PORT: u16 = 8080;
const JWT_EXPIRY_HOURS: i64 = 72;
const RATE_LIMIT_PER_MINUTE: u32 = 60;
const RATE_LIMIT_WINDOW_SECS: u64 = 60;
const GUEST_SWEEP_INTERVAL_SECS: u64 = 3600;
const MAX_FILE_SIZE_BYTES: usize = 10 * 1024 * 1024;
/// Default MIME allow-set.
pub const ALLOWED_TYPES: &str = "image/jpeg,image/png,image/gif,image/webp";
const DEFAULT_ADMIN: &str = "root";
const UPLOAD_PATH: &str = "./uploads";

/// Settings shared by the HTTP layer
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,
    pub default_admin: String,
    pub admin_password: String,
    pub rate_limit_per_minute: u32,
    pub rate_limit_window_secs: u64,
    /// Peers whose forwarding headers are believed. `None` trusts every peer.
    pub trusted_proxies: Option<Vec<IpAddr>>,
    pub environment: String,
}

/// Image host configuration
#[derive(Clone, Debug)]
pub struct ImageHostConfig {
    pub base: BaseConfig,
    pub database_url: String,
    // Storage configuration
    pub storage_backend: StorageBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers (R2, MinIO, ...)
    pub s3_public_url: Option<String>,
    pub upload_path: String,
    // Upload limits
    pub max_file_size_bytes: usize,
    pub allowed_content_types: Vec<String>,
    pub guest_sweep_interval_secs: u64,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<ImageHostConfig>);

impl Config {
    fn inner(&self) -> &ImageHostConfig {
        &self.0
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        let config = ImageHostConfig::from_lookup(|key| env::var(key).ok())?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.inner().validate()
    }

    pub fn is_production(&self) -> bool {
        let env = self.inner().base.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn server_port(&self) -> u16 {
        self.inner().base.server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.inner().base.cors_origins
    }

    pub fn db_max_connections(&self) -> u32 {
        self.inner().base.db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.inner().base.db_timeout_seconds
    }

    pub fn jwt_secret(&self) -> &str {
        &self.inner().base.jwt_secret
    }

    pub fn jwt_expiry_hours(&self) -> i64 {
        self.inner().base.jwt_expiry_hours
    }

    pub fn default_admin(&self) -> &str {
        &self.inner().base.default_admin
    }

    pub fn admin_password(&self) -> &str {
        &self.inner().base.admin_password
    }

    pub fn rate_limit_per_minute(&self) -> u32 {
        self.inner().base.rate_limit_per_minute
    }

    pub fn rate_limit_window_secs(&self) -> u64 {
        self.inner().base.rate_limit_window_secs
    }

    pub fn trusted_proxies(&self) -> Option<&[IpAddr]> {
        self.inner().base.trusted_proxies.as_deref()
    }

    pub fn environment(&self) -> &str {
        &self.inner().base.environment
    }

    pub fn database_url(&self) -> &str {
        &self.inner().database_url
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.inner().storage_backend
    }

    pub fn s3_bucket(&self) -> Option<&str> {
        self.inner().s3_bucket.as_deref()
    }

    pub fn s3_region(&self) -> Option<&str> {
        self.inner().s3_region.as_deref()
    }

    pub fn s3_endpoint(&self) -> Option<&str> {
        self.inner().s3_endpoint.as_deref()
    }

    pub fn s3_public_url(&self) -> Option<&str> {
        self.inner().s3_public_url.as_deref()
    }

    pub fn upload_path(&self) -> &str {
        &self.inner().upload_path
    }

    pub fn max_file_size_bytes(&self) -> usize {
        self.inner().max_file_size_bytes
    }

    pub fn allowed_content_types(&self) -> &[String] {
        &self.inner().allowed_content_types
    }

    pub fn guest_sweep_interval_secs(&self) -> u64 {
        self.inner().guest_sweep_interval_secs
    }
}

/// `*` trusts every peer; otherwise a comma-separated list of proxy IPs. An empty
/// list trusts no one, so forwarding headers are ignored.
fn parse_trusted_proxies(raw: &str) -> Result<Option<Vec<IpAddr>>, anyhow::Error> {
    if raw.trim() == "*" {
        return Ok(None);
    }
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<IpAddr>()
                .map_err(|_| anyhow::anyhow!("TRUSTED_PROXIES entry '{}' is not an IP address", s))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

impl ImageHostConfig {
    /// Build the configuration from a key lookup (the process environment in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup("ENVIRONMENT")
            .or_else(|| lookup("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let cors_origins: Vec<String> = lookup("CORS_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let allowed_content_types = lookup("ALLOWED_TYPES")
            .unwrap_or_else(|| ALLOWED_TYPES.to_string())
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        let base = BaseConfig {
            server_port: lookup("PORT")
                .unwrap_or_else(|| SERVER_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            cors_origins,
            db_max_connections: lookup("DB_MAX_CONNECTIONS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: lookup("DB_TIMEOUT_SECONDS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            jwt_secret: lookup("JWT_SECRET")
                .ok_or_else(|| anyhow::anyhow!("JWT_SECRET must be set for authentication"))?,
            jwt_expiry_hours: lookup("JWT_EXPIRE_HOURS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(JWT_EXPIRY_HOURS),
            default_admin: lookup("DEFAULT_ADMIN").unwrap_or_else(|| DEFAULT_ADMIN.to_string()),
            admin_password: lookup("ADMIN_PASSWORD")
                .ok_or_else(|| anyhow::anyhow!("ADMIN_PASSWORD must be set"))?,
            rate_limit_per_minute: lookup("RATE_LIMIT_PER_MINUTE")
                .and_then(|s| s.parse().ok())
                .unwrap_or(RATE_LIMIT_PER_MINUTE),
            rate_limit_window_secs: lookup("RATE_LIMIT_WINDOW_SECONDS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(RATE_LIMIT_WINDOW_SECS),
            trusted_proxies: parse_trusted_proxies(
                &lookup("TRUSTED_PROXIES").unwrap_or_else(|| "*".to_string()),
            )?,
            environment,
        };

        let s3_bucket = lookup("S3_BUCKET");
        let storage_backend = match lookup("STORAGE_BACKEND") {
            Some(s) => s.parse()?,
            None if s3_bucket.is_some() => StorageBackend::S3,
            None => StorageBackend::Local,
        };

        let config = ImageHostConfig {
            base,
            database_url: lookup("DATABASE_URL")
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set"))?,
            storage_backend,
            s3_bucket,
            s3_region: lookup("S3_REGION").or_else(|| lookup("AWS_REGION")),
            s3_endpoint: lookup("S3_ENDPOINT"),
            s3_public_url: lookup("S3_PUBLIC_URL"),
            upload_path: lookup("UPLOAD_PATH").unwrap_or_else(|| UPLOAD_PATH.to_string()),
            max_file_size_bytes: lookup("MAX_FILE_SIZE")
                .and_then(|s| s.parse().ok())
                .unwrap_or(MAX_FILE_SIZE_BYTES),
            allowed_content_types,
            guest_sweep_interval_secs: lookup("GUEST_SWEEP_INTERVAL_SECONDS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(GUEST_SWEEP_INTERVAL_SECS),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.base.jwt_secret.len() < 32 {
            return Err(anyhow::anyhow!(
                "JWT_SECRET must be at least 32 characters long"
            ));
        }

        if self.base.default_admin.is_empty()
            || self.base.default_admin.starts_with(GUEST_IDENTITY_PREFIX)
        {
            return Err(anyhow::anyhow!(
                "DEFAULT_ADMIN must be non-empty and must not start with '{}'",
                GUEST_IDENTITY_PREFIX
            ));
        }

        if self.base.admin_password.is_empty() {
            return Err(anyhow::anyhow!("ADMIN_PASSWORD must not be empty"));
        }

        if self.max_file_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_FILE_SIZE must be greater than zero"));
        }

        if self.allowed_content_types.is_empty() {
            return Err(anyhow::anyhow!("ALLOWED_TYPES must list at least one type"));
        }

        if self.base.rate_limit_per_minute == 0 || self.base.rate_limit_window_secs == 0 {
            return Err(anyhow::anyhow!(
                "RATE_LIMIT_PER_MINUTE and RATE_LIMIT_WINDOW_SECONDS must be greater than zero"
            ));
        }

        if self.guest_sweep_interval_secs == 0 {
            return Err(anyhow::anyhow!(
                "GUEST_SWEEP_INTERVAL_SECONDS must be greater than zero"
            ));
        }

        if self.storage_backend == StorageBackend::S3 {
            if self.s3_bucket.is_none() {
                return Err(anyhow::anyhow!(
                    "S3_BUCKET must be set when using S3 storage backend"
                ));
            }
            if self.s3_public_url.is_none() {
                return Err(anyhow::anyhow!(
                    "S3_PUBLIC_URL must be set when using S3 storage backend"
                ));
            }
        }

        Ok(())
    }
}

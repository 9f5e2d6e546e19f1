//! API constants

/// API base path prefix
pub const API_PREFIX: &str = "/api";

/// Service name reported by the health endpoint.
pub const SERVICE_NAME: &str = "imghost";

/// Multipart field carrying a single upload.
pub const UPLOAD_FIELD: &str = "image";

/// Multipart field carrying each file of a batch upload.
pub const BATCH_UPLOAD_FIELD: &str = "images";

/// Room for multipart boundaries and headers on top of the file bytes.
pub const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

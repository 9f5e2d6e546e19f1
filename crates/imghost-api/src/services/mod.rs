//! Domain services used by the handlers and the background tasks.

pub mod guest_codes;
pub mod images;
pub mod ingestion;
pub mod system;
pub mod users;

pub use guest_codes::{ExpirySpec, GuestCodeService};
pub use images::{delete_blobs, ImageService};
pub use ingestion::{
    BatchFailure, BatchUploadResult, IngestionPipeline, UploadContext, UploadStage, UploadedFile,
    MAX_BATCH_FILES,
};
pub use system::{DiskUsage, SystemService, SystemStatus};
pub use users::UserService;

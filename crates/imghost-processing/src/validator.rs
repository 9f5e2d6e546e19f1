use imghost_core::AppError;

/// Validation errors for declared upload metadata
///
/// These only look at what the client declared. The content type comes from the
/// multipart header and is not sniffed from the bytes.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("file size {size} exceeds maximum allowed size {max}")]
    FileTooLarge { size: usize, max: usize },

    #[error("missing content type")]
    MissingContentType,

    #[error("unsupported file type: {content_type}")]
    UnsupportedFileType { content_type: String },
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err.to_string())
    }
}

/// Media file validator
pub struct MediaValidator {
    max_file_size: usize,
    allowed_content_types: Vec<String>,
}

impl MediaValidator {
    pub fn new(max_file_size: usize, allowed_content_types: Vec<String>) -> Self {
        Self {
            max_file_size,
            allowed_content_types: allowed_content_types
                .into_iter()
                .map(|ct| normalize_content_type(&ct))
                .collect(),
        }
    }

    pub fn max_file_size(&self) -> usize {
        self.max_file_size
    }

    /// Validate declared size and content type together.
    pub fn validate(&self, size: usize, content_type: &str) -> Result<(), ValidationError> {
        self.validate_file_size(size)?;
        self.validate_content_type(content_type)
    }

    /// Validate file size
    pub fn validate_file_size(&self, size: usize) -> Result<(), ValidationError> {
        if size > self.max_file_size {
            return Err(ValidationError::FileTooLarge {
                size,
                max: self.max_file_size,
            });
        }

        Ok(())
    }

    /// Validate content type against the allow-set
    pub fn validate_content_type(&self, content_type: &str) -> Result<(), ValidationError> {
        let normalized = normalize_content_type(content_type);

        if normalized.is_empty() {
            return Err(ValidationError::MissingContentType);
        }

        if !self.allowed_content_types.iter().any(|ct| ct == &normalized) {
            return Err(ValidationError::UnsupportedFileType {
                content_type: content_type.to_string(),
            });
        }

        Ok(())
    }
}

/// Lowercase and drop parameters (`image/JPEG; q=1` -> `image/jpeg`).
fn normalize_content_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase()
}

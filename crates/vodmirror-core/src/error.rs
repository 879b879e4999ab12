//! Error types module
//!
//! All fatal conditions of a mirror invocation are unified under the
//! `MirrorError` enum. Each variant carries a human-readable message; the
//! machine-readable `error_code` lets the external driver branch on structured
//! data without string matching. Transient fetch failures are not represented
//! here — they are retried and then skipped inside the transfer pass.

#[derive(Debug, thiserror::Error)]
pub enum MirrorError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Unsupported manifest format: {0}")]
    UnsupportedFormat(String),

    #[error("Malformed manifest: {0}")]
    Format(String),

    #[error("Unable to access manifest {url}: {reason}")]
    ManifestUnavailable { url: String, reason: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MirrorError {
    /// Machine-readable error code (e.g. "VALIDATION_ERROR").
    pub fn error_code(&self) -> &'static str {
        match self {
            MirrorError::Validation(_) => "VALIDATION_ERROR",
            MirrorError::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            MirrorError::Format(_) => "FORMAT_ERROR",
            MirrorError::ManifestUnavailable { .. } => "MANIFEST_UNAVAILABLE",
            MirrorError::Storage(_) => "STORAGE_ERROR",
            MirrorError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether a later invocation against the same input could succeed.
    ///
    /// Validation and format failures are permanent for a given asset; origin
    /// and storage outages may clear up.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            MirrorError::ManifestUnavailable { .. } | MirrorError::Storage(_)
        )
    }
}

impl From<url::ParseError> for MirrorError {
    fn from(err: url::ParseError) -> Self {
        MirrorError::Format(format!("Invalid URL: {}", err))
    }
}

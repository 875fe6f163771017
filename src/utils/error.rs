use thiserror::Error;

use crate::extract::ExtractError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Extraction(#[from] ExtractError),

    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("Notification delivery failed: {0}")]
    Delivery(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(resource: impl Into<String>) -> Self {
        AppError::NotFound {
            resource: resource.into(),
        }
    }

    /// True for failures a user can fix by correcting their input, as opposed
    /// to transient or operational conditions.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            AppError::NotFound { .. } | AppError::Extraction(ExtractError::UnsupportedSite { .. })
        )
    }
}

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

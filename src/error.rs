// client/src/error.rs

use thiserror::Error;

/// Application error types
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Backend error ({status}): {message}")]
    Backend { status: u16, message: String },

    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Malformed response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not signed in")]
    NotAuthenticated,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Upload rejected: {}", .0.join(", "))]
    UploadRejected(Vec<String>),

    #[error("You already liked this post")]
    AlreadyLiked,

    #[error("You already follow this user")]
    AlreadyFollowing,

    #[error("Image error: {0}")]
    Image(String),
}

impl AppError {
    pub fn backend(status: u16, message: impl Into<String>) -> Self {
        AppError::Backend { status, message: message.into() }
    }

    /// Text suitable for a toast body.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Backend { message, .. } => message.clone(),
            AppError::UploadRejected(reasons) => reasons.join(", "),
            AppError::Validation(msg) | AppError::Image(msg) | AppError::Config(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

/// Failure result surfaced by sign-in, sign-up and sign-out.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct AuthFailure {
    pub message: String,
}

impl From<AppError> for AuthFailure {
    fn from(err: AppError) -> Self {
        AuthFailure { message: err.user_message() }
    }
}

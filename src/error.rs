use thiserror::Error;

use crate::types::UploadId;

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Storage error: status code {status}, message: {message}")]
    Store { status: u16, message: String },

    #[error("Task not found: {0}")]
    TaskNotFound(UploadId),

    #[error("No file payload for task {0}; re-select the file and create a new upload")]
    MissingPayload(UploadId),
}

impl UploadError {
    pub fn store_error(status: u16, message: impl Into<String>) -> Self {
        Self::Store {
            status,
            message: message.into(),
        }
    }
}

/// Error alias
pub type Result<T, E = UploadError> = std::result::Result<T, E>;

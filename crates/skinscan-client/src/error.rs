use reqwest::StatusCode;

use crate::analysis::AnalysisError;
use crate::capture::CaptureError;

/// Failure talking to the hosted backend (identity, storage, tables).
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid response JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("{message}")]
    Api { status: StatusCode, message: String },

    #[error("invalid URL: {0}")]
    Url(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error("You must be 18 or older to use this service.")]
    AgeVerificationRequired,

    #[error("You must be 18 or older to use this service.")]
    Underage { age: u32 },

    #[error("not an image file: {0}")]
    NotAnImage(String),

    #[error("failed to read image: {0}")]
    Io(#[from] std::io::Error),

    #[error("scan not found: {0}")]
    ScanNotFound(String),

    #[error("no profile for user {0}")]
    ProfileMissing(String),
}

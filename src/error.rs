use std::time::Duration;

use thiserror::Error;

/// Why a single analysis attempt failed. Both kinds are retryable.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AttemptError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("server responded with {status}: {body}")]
    Status { status: u16, body: String },
}

#[derive(Debug, Error)]
pub enum ClientError {
    /// Caller misuse: nothing was sent.
    #[error("precondition failed: {0}")]
    Precondition(String),

    #[error("request timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),

    #[error("meal analysis failed after {attempts} attempt(s)")]
    AnalysisFailed {
        attempts: u32,
        #[source]
        last: AttemptError,
    },

    #[error("invalid response from server: {0}")]
    InvalidResponse(String),

    #[error("failed to log meal: {message}")]
    LogFailed { status: Option<u16>, message: String },

    #[error("image processing failed: {0}")]
    ImageProcessing(String),
}

impl ClientError {
    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition(msg.into())
    }

    pub fn image(msg: impl std::fmt::Display) -> Self {
        Self::ImageProcessing(msg.to_string())
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

//! Failure taxonomy for generation and log storage.

use service_core::error::AppError;
use thiserror::Error;

/// The provider call did not yield a usable response. Nothing was logged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Provider call timed out: {0}")]
    Timeout(String),

    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),
}

impl GenerationError {
    /// Short label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ProviderUnavailable(_) => "provider_unavailable",
            Self::Timeout(_) => "timeout",
            Self::InvalidResponse(_) => "invalid_response",
        }
    }
}

/// The interaction log could not be written or read.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to write interaction: {0}")]
    WriteFailed(anyhow::Error),

    #[error("Failed to read interactions: {0}")]
    ReadFailed(anyhow::Error),
}

impl StorageError {
    pub fn write(err: impl Into<anyhow::Error>) -> Self {
        Self::WriteFailed(err.into())
    }

    pub fn read(err: impl Into<anyhow::Error>) -> Self {
        Self::ReadFailed(err.into())
    }
}

/// Outcome of a failed `generate` or `regenerate` call.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Rejected before the provider was contacted.
    #[error("Prompt must not be empty")]
    EmptyPrompt,

    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// The provider answered but the interaction was not logged.
    /// `response` is the answer the provider produced.
    #[error("Response generated but not recorded: {source}")]
    NotRecorded {
        response: String,
        #[source]
        source: StorageError,
    },
}

impl From<GenerationError> for AppError {
    fn from(err: GenerationError) -> Self {
        match err {
            GenerationError::Timeout(_) => AppError::GatewayTimeout(err.to_string()),
            GenerationError::ProviderUnavailable(_) | GenerationError::InvalidResponse(_) => {
                AppError::BadGateway(err.to_string())
            }
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::WriteFailed(e) | StorageError::ReadFailed(e) => {
                AppError::DatabaseError(e)
            }
        }
    }
}

//! In-band error reports carried in response envelopes.

use asika_core::error::{ClientInputError, Error, ExtractionError, ProviderError, RetrievalError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    RateLimited,
    Authentication,
    NotConfigured,
    Timeout,
    Upstream,
    Extraction,
    UnsupportedFormat,
    InvalidRequest,
    Internal,
}

/// `error{kind, message, retry_after_secs}` in a response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

impl ErrorReport {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retry_after_secs: None,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        self.kind == ErrorKind::RateLimited
    }
}

impl From<&ProviderError> for ErrorReport {
    fn from(err: &ProviderError) -> Self {
        let kind = match err {
            ProviderError::RateLimited { .. } => ErrorKind::RateLimited,
            ProviderError::AuthenticationFailed(_) => ErrorKind::Authentication,
            ProviderError::NotConfigured(_) => ErrorKind::NotConfigured,
            ProviderError::Timeout(_) => ErrorKind::Timeout,
            ProviderError::ApiError { .. }
            | ProviderError::Network(_)
            | ProviderError::MalformedResponse(_) => ErrorKind::Upstream,
        };
        Self {
            kind,
            message: err.to_string(),
            retry_after_secs: err.retry_after_secs(),
        }
    }
}

impl From<&ExtractionError> for ErrorReport {
    fn from(err: &ExtractionError) -> Self {
        let kind = match err {
            ExtractionError::UnsupportedFormat { .. } => ErrorKind::UnsupportedFormat,
            ExtractionError::ExtractionFailure { .. } => ErrorKind::Extraction,
        };
        Self::new(kind, err.to_string())
    }
}

impl From<&ClientInputError> for ErrorReport {
    fn from(err: &ClientInputError) -> Self {
        Self::new(ErrorKind::InvalidRequest, err.to_string())
    }
}

impl From<&RetrievalError> for ErrorReport {
    fn from(err: &RetrievalError) -> Self {
        Self::new(ErrorKind::Upstream, err.to_string())
    }
}

impl From<&Error> for ErrorReport {
    fn from(err: &Error) -> Self {
        match err {
            Error::Provider(e) => e.into(),
            Error::Retrieval(e) => e.into(),
            Error::Extraction(e) => e.into(),
            Error::ClientInput(e) => e.into(),
            other => Self::new(ErrorKind::Internal, other.to_string()),
        }
    }
}

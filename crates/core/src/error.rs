//! Error types for the Asika domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; the top-level [`Error`]
//! wraps them for callers that only need to propagate.

use thiserror::Error;

/// The top-level error type for all Asika operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Collaborator errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    // --- Document extraction ---
    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    // --- Request validation ---
    #[error("Invalid request: {0}")]
    ClientInput(#[from] ClientInputError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures of the language-model collaborator (chat, vision, embeddings).
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("{}", rate_limit_message(*retry_after_secs))]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),
}

fn rate_limit_message(retry_after_secs: Option<u64>) -> String {
    let mut message =
        "Rate limit reached. Please wait a few seconds before trying again.".to_string();
    if let Some(secs) = retry_after_secs {
        message.push_str(&format!(" Suggested wait: {secs} seconds."));
    }
    message
}

impl ProviderError {
    /// Advisory wait hint, only ever present for rate limiting.
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            Self::RateLimited { retry_after_secs } => *retry_after_secs,
            _ => None,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

/// Failures of the knowledge retriever or its embedding model.
#[derive(Debug, Clone, Error)]
pub enum RetrievalError {
    #[error("Embedding generation failed: {0}")]
    EmbeddingFailed(String),

    #[error("Index unavailable: {0}")]
    IndexUnavailable(String),
}

/// Failures while turning an uploaded file into plain text.
#[derive(Debug, Clone, Error)]
pub enum ExtractionError {
    #[error("Unsupported document format: {file_name} (supported: .pdf, .docx)")]
    UnsupportedFormat { file_name: String },

    #[error("Failed to extract text from {family} document: {reason}")]
    ExtractionFailure { family: String, reason: String },
}

/// Malformed or incomplete inbound requests. Always reported in-band.
#[derive(Debug, Clone, Error)]
pub enum ClientInputError {
    #[error("Malformed request body: {0}")]
    MalformedBody(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid image data URL: {0}")]
    InvalidImage(String),

    #[error("Unknown task: {0}")]
    UnknownTask(String),
}

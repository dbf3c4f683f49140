//! Model gateway: calls the hosted text-generation API and falls over
//! across an ordered list of candidate models.
//!
//! Model availability (quota exhaustion, retired model names) is the
//! dominant failure mode, so every error is classified before the retry
//! policy decides whether to retry, skip to the next candidate, or stop.

pub mod gemini;
pub mod policy;
pub mod service;
pub mod types;

pub use gemini::*;
pub use policy::*;
pub use service::*;
pub use types::*;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("No API key configured")]
    MissingApiKey,

    #[error("Cannot reach model endpoint at {0}")]
    Connection(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Quota exhausted for model {model}: {body}")]
    RateLimited { model: String, body: String },

    #[error("Model not found or retired: {0}")]
    ModelNotFound(String),

    #[error("Model endpoint returned error (status {status}): {body}")]
    Upstream { status: u16, body: String },

    #[error("Model {0} returned no text")]
    EmptyResponse(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),
}

/// How the retry policy should treat a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// HTTP 429. Skip to the next candidate.
    RateLimit,
    /// HTTP 404. Skip to the next candidate.
    NotFound,
    /// Any other request rejection specific to this model. Skip.
    Rejected,
    /// Timeouts, connection drops, 5xx, empty text. Retry with backoff.
    Transient,
    /// Bad or missing credentials. No candidate can succeed.
    Fatal,
}

impl GatewayError {
    /// Default classification used by `RetryPolicy`.
    pub fn classify(&self) -> ErrorClass {
        match self {
            Self::MissingApiKey => ErrorClass::Fatal,
            Self::RateLimited { .. } => ErrorClass::RateLimit,
            Self::ModelNotFound(_) => ErrorClass::NotFound,
            Self::Upstream { status, body } => match status {
                401 | 403 => ErrorClass::Fatal,
                400 if body.contains("API_KEY_INVALID") => ErrorClass::Fatal,
                500..=599 => ErrorClass::Transient,
                _ => ErrorClass::Rejected,
            },
            Self::Connection(_)
            | Self::Timeout(_)
            | Self::EmptyResponse(_)
            | Self::HttpClient(_)
            | Self::ResponseParsing(_) => ErrorClass::Transient,
        }
    }
}

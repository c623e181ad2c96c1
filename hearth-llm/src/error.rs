//! Error types for the LLM layer.

use thiserror::Error;

/// Errors that can occur during LLM operations.
#[derive(Debug, Error)]
pub enum LlmError {
    /// The HTTP request to the LLM failed.
    #[error("LLM request failed: {0}")]
    RequestFailed(String),

    /// The response body could not be decoded.
    #[error("failed to parse LLM response: {0}")]
    ParseError(String),

    /// The request timed out.
    #[error("LLM request timed out after {0}ms")]
    Timeout(u64),

    /// No backend is configured or reachable.
    #[error("LLM unavailable: {0}")]
    Unavailable(String),

    /// Every attempt failed.
    #[error("all {attempts} attempts failed, last error: {last_error}")]
    RetriesExhausted {
        /// Attempts made, including the first.
        attempts: u32,
        /// The final failure.
        last_error: String,
    },

    /// The LLM configuration is unusable.
    #[error("LLM configuration error: {0}")]
    ConfigError(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout(0)
        } else if err.is_connect() {
            LlmError::Unavailable(err.to_string())
        } else {
            LlmError::RequestFailed(err.to_string())
        }
    }
}

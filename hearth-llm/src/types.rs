//! Request and response types.

use serde::{Deserialize, Serialize};

/// A request to the LLM.
#[derive(Debug, Clone, Serialize)]
pub struct LlmRequest {
    /// System prompt (persona and rules).
    pub system: String,
    /// User prompt (memories, state and instructions).
    pub user: String,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// Ask the backend to constrain output to JSON.
    pub json: bool,
    /// Per-attempt timeout in milliseconds. `None` uses the client default.
    pub timeout_ms: Option<u64>,
}

impl LlmRequest {
    /// A short free-text request, as used for reflections.
    #[must_use]
    pub fn reflection(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            max_tokens: 150,
            temperature: 0.7,
            json: true,
            timeout_ms: None,
        }
    }

    /// A longer structured request, as used for day plans.
    #[must_use]
    pub fn plan(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            max_tokens: 600,
            temperature: 0.6,
            json: true,
            timeout_ms: None,
        }
    }

    /// Override the timeout for this request.
    #[must_use]
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }
}

/// A response from the LLM.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LlmResponse {
    /// The generated text.
    pub text: String,
    /// Tokens generated, when the backend reports it.
    pub tokens_generated: u32,
    /// Wall-clock latency of the successful attempt.
    pub latency_ms: u64,
    /// Model that answered.
    pub model: String,
}

/// Structured reflection output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReflectionResponse {
    /// The agent's insight, one or two sentences.
    pub reflection: String,
}

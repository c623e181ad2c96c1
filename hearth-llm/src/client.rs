//! LLM Client: one interface over Ollama and OpenAI-compatible backends.

use std::time::{Duration, Instant};

use hearth_core::config::LlmConfig;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::error::LlmError;
use crate::types::{LlmRequest, LlmResponse};

/// Provider backend for LLM inference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmProvider {
    /// Ollama's native generate API.
    Ollama {
        /// Server root, e.g. `http://localhost:11434`.
        base_url: String,
    },
    /// Any `/v1/chat/completions` server (OpenAI, llama.cpp, vLLM, ...).
    OpenAiCompatible {
        /// Server root, without the `/v1` suffix.
        base_url: String,
        /// Bearer token, if the server wants one.
        api_key: Option<String>,
    },
    /// No backend; every call fails and callers take their fallback.
    None,
}

/// Routes requests to the configured backend with retries and timeouts.
#[derive(Debug, Clone)]
pub struct LlmClient {
    provider: LlmProvider,
    http: Client,
    model: String,
    max_retries: u32,
    timeout_ms: u64,
}

impl LlmClient {
    /// Create a client for `provider`.
    #[must_use]
    pub fn new(provider: LlmProvider, model: impl Into<String>, max_retries: u32, timeout_ms: u64) -> Self {
        Self {
            provider,
            http: Client::new(),
            model: model.into(),
            max_retries,
            timeout_ms,
        }
    }

    /// Build a client from the `[llm]` config section.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::ConfigError`] for an unknown provider name.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        let provider = match config.provider.to_ascii_lowercase().as_str() {
            "ollama" => LlmProvider::Ollama { base_url },
            "openai" | "openai-compatible" => LlmProvider::OpenAiCompatible {
                base_url,
                api_key: config.api_key.clone(),
            },
            "none" | "" => LlmProvider::None,
            other => {
                return Err(LlmError::ConfigError(format!("unknown LLM provider '{other}'")));
            }
        };
        Ok(Self::new(
            provider,
            config.model.clone(),
            config.max_retries,
            config.request_timeout_ms,
        ))
    }

    /// A client with no backend.
    #[must_use]
    pub fn none() -> Self {
        Self::new(LlmProvider::None, String::new(), 0, 0)
    }

    /// Whether a backend is configured.
    #[must_use]
    pub fn is_available(&self) -> bool {
        !matches!(self.provider, LlmProvider::None)
    }

    /// The configured provider.
    #[must_use]
    pub fn provider(&self) -> &LlmProvider {
        &self.provider
    }

    /// Generate a completion.
    ///
    /// Callers are expected to fall back to a rule-based answer on error.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Unavailable`] with no backend,
    /// [`LlmError::RetriesExhausted`] when every attempt fails, and
    /// [`LlmError::ParseError`] when a successful response cannot be read.
    pub async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        match &self.provider {
            LlmProvider::None => Err(LlmError::Unavailable("no LLM provider configured".into())),
            LlmProvider::Ollama { base_url } => {
                let url = format!("{base_url}/api/generate");
                let mut body = json!({
                    "model": self.model,
                    "system": request.system,
                    "prompt": request.user,
                    "stream": false,
                    "options": {
                        "temperature": request.temperature,
                        "num_predict": request.max_tokens,
                    }
                });
                if request.json {
                    body["format"] = json!("json");
                }
                let (reply, latency_ms) = self.post_with_retries(&url, &body, None, request).await?;
                Ok(LlmResponse {
                    text: reply["response"].as_str().unwrap_or_default().to_string(),
                    tokens_generated: token_count(&reply["eval_count"]),
                    latency_ms,
                    model: self.model.clone(),
                })
            }
            LlmProvider::OpenAiCompatible { base_url, api_key } => {
                let url = format!("{base_url}/v1/chat/completions");
                let mut body = json!({
                    "model": self.model,
                    "messages": [
                        { "role": "system", "content": request.system },
                        { "role": "user", "content": request.user },
                    ],
                    "max_tokens": request.max_tokens,
                    "temperature": request.temperature,
                });
                if request.json {
                    body["response_format"] = json!({ "type": "json_object" });
                }
                let (reply, latency_ms) = self
                    .post_with_retries(&url, &body, api_key.as_deref(), request)
                    .await?;
                Ok(LlmResponse {
                    text: reply["choices"][0]["message"]["content"]
                        .as_str()
                        .unwrap_or_default()
                        .to_string(),
                    tokens_generated: token_count(&reply["usage"]["completion_tokens"]),
                    latency_ms,
                    model: self.model.clone(),
                })
            }
        }
    }

    async fn post_with_retries(
        &self,
        url: &str,
        body: &Value,
        api_key: Option<&str>,
        request: &LlmRequest,
    ) -> Result<(Value, u64), LlmError> {
        let timeout_ms = request.timeout_ms.unwrap_or(self.timeout_ms);
        let mut last_error = String::new();

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                debug!(url, attempt = attempt + 1, of = self.max_retries + 1, "Retrying LLM call");
            }

            let start = Instant::now();
            let mut call = self.http.post(url).json(body).timeout(Duration::from_millis(timeout_ms));
            if let Some(key) = api_key {
                call = call.bearer_auth(key);
            }
            let result = call.send().await;
            let latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

            match result {
                Ok(resp) if resp.status().is_success() => {
                    let reply: Value = resp
                        .json()
                        .await
                        .map_err(|e| LlmError::ParseError(e.to_string()))?;
                    debug!(url, latency_ms, "LLM call succeeded");
                    return Ok((reply, latency_ms));
                }
                Ok(resp) => {
                    let status = resp.status();
                    last_error = format!("HTTP {status}: {}", resp.text().await.unwrap_or_default());
                    warn!(url, error = %last_error, "LLM backend returned an error");
                }
                Err(e) => {
                    if e.is_timeout() {
                        warn!(url, timeout_ms, "LLM request timed out");
                    } else {
                        warn!(url, error = %e, "LLM request failed");
                    }
                    last_error = LlmError::from(e).to_string();
                }
            }
        }

        Err(LlmError::RetriesExhausted {
            attempts: self.max_retries + 1,
            last_error,
        })
    }

    /// Decode the JSON object embedded in a response.
    ///
    /// Text before the first `{` and after the last `}` is ignored, since
    /// small models like to wrap their JSON in prose.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::ParseError`] if no object decodes as `T`.
    pub fn parse_structured<T: serde::de::DeserializeOwned>(response: &LlmResponse) -> Result<T, LlmError> {
        let text = response.text.as_str();
        let object = match (text.find('{'), text.rfind('}')) {
            (Some(start), Some(end)) if start < end => &text[start..=end],
            _ => text,
        };
        serde_json::from_str(object)
            .map_err(|e| LlmError::ParseError(format!("{e} (raw text: '{}')", response.text)))
    }
}

fn token_count(value: &Value) -> u32 {
    value
        .as_u64()
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(0)
}

//! Configuration for the Hearth memory and social substrate.
//!
//! Maps directly to `hearth.toml`. Every field has a serde default, so an
//! empty file (or an empty string) yields [`HearthConfig::default`].

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level Hearth configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HearthConfig {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Per-agent memory stream behavior.
    #[serde(default)]
    pub memory: MemoryConfig,
    /// Retrieval algorithm settings.
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    /// Relationship, faction and reputation settings.
    #[serde(default)]
    pub social: SocialConfig,
    /// Day-plan settings.
    #[serde(default)]
    pub planning: PlanningConfig,
    /// Where and how state is written to disk.
    #[serde(default)]
    pub persistence: PersistenceConfig,
    /// LLM collaborator settings.
    #[serde(default)]
    pub llm: LlmConfig,
}

impl HearthConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `HearthError::Config` if the TOML is invalid.
    pub fn from_toml(toml_str: &str) -> crate::error::Result<Self> {
        toml::from_str(toml_str).map_err(|e| crate::HearthError::Config(e.to_string()))
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| crate::HearthError::storage(path, e))?;
        Self::from_toml(&content)
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// General system settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level hint for the host's subscriber: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Which rule decides when a batch of observations is reflected upon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReflectionPolicy {
    /// Fire once `reflection_threshold` observations have accumulated.
    #[default]
    Count,
    /// Fire once `window_min_records` observations fall inside the last
    /// `window_hours`.
    Window,
}

/// Per-agent memory stream configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Trigger policy for reflection.
    #[serde(default)]
    pub reflection_policy: ReflectionPolicy,
    /// Unreflected records needed before a count-policy reflection fires.
    #[serde(default = "default_100")]
    pub reflection_threshold: usize,
    /// Window length for the window policy, in hours.
    #[serde(default = "default_2_0")]
    pub window_hours: f64,
    /// Observations that must fall inside the window for it to fire.
    #[serde(default = "default_10")]
    pub window_min_records: usize,
    /// Importance assigned to generated reflections.
    #[serde(default = "default_0_8")]
    pub reflection_importance: f64,
    /// Importance assigned to stored day plans.
    #[serde(default = "default_0_8")]
    pub day_plan_importance: f64,
    /// Record count above which the store logs a growth warning.
    #[serde(default = "default_10000")]
    pub soft_record_limit: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            reflection_policy: ReflectionPolicy::Count,
            reflection_threshold: 100,
            window_hours: 2.0,
            window_min_records: 10,
            reflection_importance: 0.8,
            day_plan_importance: 0.8,
            soft_record_limit: 10_000,
        }
    }
}

/// Memory retrieval algorithm settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Number of records retrieved per query when the caller has no preference.
    #[serde(default = "default_5")]
    pub top_k: usize,
    /// Recency decay constant `H` in `e^(-hours / H)`.
    #[serde(default = "default_24_0")]
    pub half_life_hours: f64,
    /// Relevance used when the query or the record has no tokens.
    #[serde(default = "default_0_5")]
    pub neutral_relevance: f64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            half_life_hours: 24.0,
            neutral_relevance: 0.5,
        }
    }
}

/// Social graph settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocialConfig {
    /// Reputation assumed for agents never seen before.
    #[serde(default = "default_50_0")]
    pub default_reputation: f64,
    /// Dead zone a relationship value must clear before the label changes.
    /// `0.0` reproduces the threshold-only state machine.
    #[serde(default)]
    pub hysteresis: f64,
    /// Maximum social events kept in memory (oldest dropped first).
    #[serde(default = "default_10000")]
    pub max_event_log: usize,
}

impl Default for SocialConfig {
    fn default() -> Self {
        Self {
            default_reputation: 50.0,
            hysteresis: 0.0,
            max_event_log: 10_000,
        }
    }
}

/// Day-plan settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanningConfig {
    /// Offset from UTC applied to the clock before looking up the schedule.
    #[serde(default)]
    pub utc_offset_hours: i32,
    /// Activity returned when no schedule entry matches the current hour.
    #[serde(default = "default_fallback_activity")]
    pub fallback_activity: String,
}

impl Default for PlanningConfig {
    fn default() -> Self {
        Self {
            utc_offset_hours: 0,
            fallback_activity: default_fallback_activity(),
        }
    }
}

/// Persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Directory holding one `<agent>_stream.json` per agent.
    #[serde(default = "default_memory_dir")]
    pub memory_dir: PathBuf,
    /// File holding the shared social graph.
    #[serde(default = "default_social_path")]
    pub social_path: PathBuf,
    /// Pretty-print JSON (larger files, easier to inspect).
    #[serde(default = "default_true")]
    pub pretty: bool,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            memory_dir: default_memory_dir(),
            social_path: default_social_path(),
            pretty: true,
        }
    }
}

/// LLM collaborator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider: "ollama", "openai", "none".
    #[serde(default = "default_ollama")]
    pub provider: String,
    /// Base URL for the LLM API.
    #[serde(default = "default_ollama_url")]
    pub base_url: String,
    /// API key for OpenAI-compatible providers.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Model used for reflections and plans.
    #[serde(default = "default_model")]
    pub model: String,
    /// Hard timeout for any LLM call in milliseconds.
    #[serde(default = "default_5000")]
    pub request_timeout_ms: u64,
    /// Retries before falling back to the rule-based path.
    #[serde(default = "default_2")]
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            base_url: "http://localhost:11434".to_string(),
            api_key: None,
            model: "qwen2.5:1.5b".to_string(),
            request_timeout_ms: 5000,
            max_retries: 2,
        }
    }
}

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

fn default_true() -> bool { true }
fn default_log_level() -> String { "info".to_string() }
fn default_fallback_activity() -> String { "free exploration".to_string() }
fn default_memory_dir() -> PathBuf { PathBuf::from("data/memories") }
fn default_social_path() -> PathBuf { PathBuf::from("data/social/network.json") }
fn default_ollama() -> String { "ollama".to_string() }
fn default_ollama_url() -> String { "http://localhost:11434".to_string() }
fn default_model() -> String { "qwen2.5:1.5b".to_string() }
fn default_0_5() -> f64 { 0.5 }
fn default_0_8() -> f64 { 0.8 }
fn default_2_0() -> f64 { 2.0 }
fn default_24_0() -> f64 { 24.0 }
fn default_50_0() -> f64 { 50.0 }
fn default_2() -> u32 { 2 }
fn default_5() -> usize { 5 }
fn default_10() -> usize { 10 }
fn default_100() -> usize { 100 }
fn default_5000() -> u64 { 5000 }
fn default_10000() -> usize { 10_000 }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let config = HearthConfig::from_toml("").expect("parse");
        assert_eq!(config.memory.reflection_threshold, 100);
        assert_eq!(config.memory.reflection_policy, ReflectionPolicy::Count);
        assert!((config.retrieval.half_life_hours - 24.0).abs() < f64::EPSILON);
        assert!((config.social.default_reputation - 50.0).abs() < f64::EPSILON);
        assert!(config.social.hysteresis.abs() < f64::EPSILON);
        assert_eq!(config.planning.fallback_activity, "free exploration");
    }

    #[test]
    fn partial_sections_override_only_given_fields() {
        let config = HearthConfig::from_toml(
            r#"
            [memory]
            reflection_policy = "window"
            window_min_records = 4

            [retrieval]
            top_k = 3

            [persistence]
            memory_dir = "/tmp/agents"
            "#,
        )
        .expect("parse");

        assert_eq!(config.memory.reflection_policy, ReflectionPolicy::Window);
        assert_eq!(config.memory.window_min_records, 4);
        assert_eq!(config.memory.reflection_threshold, 100);
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.persistence.memory_dir, PathBuf::from("/tmp/agents"));
        assert!(config.persistence.pretty);
    }

    #[test]
    fn invalid_toml_is_a_config_error() {
        let err = HearthConfig::from_toml("[memory\nbroken").expect_err("should fail");
        assert!(matches!(err, crate::HearthError::Config(_)));
    }
}

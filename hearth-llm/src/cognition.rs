//! LLM-backed reflection and planning with rule-based fallbacks.
//!
//! [`LlmCognition`] never fails: any backend error is logged and answered
//! by [`ThemeSummarizer`] (reflections) or [`DayPlan::fallback`] (plans).

use chrono::Duration;
use hearth_core::config::HearthConfig;
use hearth_core::memory::MemoryStream;
use hearth_core::planning::{AgentState, DayPlan};
use hearth_core::reflection::{ReflectionBatch, Summarizer, ThemeSummarizer};
use hearth_core::types::RecordId;
use tracing::{debug, info, warn};

use crate::client::LlmClient;
use crate::error::LlmError;
use crate::prompt::{self, PLAN_SYSTEM, PLAN_USER, REFLECTION_SYSTEM, REFLECTION_USER};
use crate::types::{LlmRequest, ReflectionResponse};

/// Reflection and planning through an [`LlmClient`].
#[derive(Debug, Clone)]
pub struct LlmCognition {
    client: LlmClient,
    fallback: ThemeSummarizer,
}

impl LlmCognition {
    /// Wrap `client`.
    #[must_use]
    pub fn new(client: LlmClient) -> Self {
        Self {
            client,
            fallback: ThemeSummarizer::default(),
        }
    }

    /// Build from the `[llm]` config section.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::ConfigError`] for an unknown provider.
    pub fn from_config(config: &HearthConfig) -> Result<Self, LlmError> {
        Ok(Self::new(LlmClient::from_config(&config.llm)?))
    }

    /// The underlying client.
    #[must_use]
    pub fn client(&self) -> &LlmClient {
        &self.client
    }

    /// Ask the model for a reflection on `contents`.
    ///
    /// # Errors
    ///
    /// Returns the client error, or [`LlmError::ParseError`] when the reply
    /// carries no reflection text.
    pub async fn try_reflect(&self, agent: &str, contents: &[String]) -> Result<String, LlmError> {
        let system = prompt::render_template(REFLECTION_SYSTEM, &[("agent_name", agent)]);
        let memories = prompt::format_memories(contents);
        let user = prompt::render_template(REFLECTION_USER, &[("memories_formatted", &memories)]);

        let response = self.client.generate(&LlmRequest::reflection(system, user)).await?;
        let text = match LlmClient::parse_structured::<ReflectionResponse>(&response) {
            Ok(parsed) => parsed.reflection,
            // Models that ignore the JSON instruction still produce usable prose.
            Err(_) if !response.text.contains('{') => response.text,
            Err(e) => return Err(e),
        };
        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(LlmError::ParseError("empty reflection".into()));
        }
        debug!(agent, records = contents.len(), latency_ms = response.latency_ms, "LLM reflection");
        Ok(text)
    }

    /// Reflection text for `contents`, falling back to theme extraction.
    ///
    /// May return an empty string when the fallback finds too little to say.
    pub async fn reflect(&self, agent: &str, contents: &[String]) -> String {
        match self.try_reflect(agent, contents).await {
            Ok(text) => text,
            Err(e) => {
                if self.client.is_available() {
                    warn!(agent, error = %e, "LLM reflection failed, using theme summary");
                }
                self.fallback.summarize(contents)
            }
        }
    }

    /// Ask the model for a day plan.
    ///
    /// # Errors
    ///
    /// Returns the client error.
    pub async fn try_plan_day(&self, agent: &str, state: &AgentState, recent: &[String]) -> Result<DayPlan, LlmError> {
        let system = prompt::render_template(PLAN_SYSTEM, &[("agent_name", agent)]);
        let state_formatted = prompt::format_state(state);
        let memories = prompt::format_memories(recent);
        let user = prompt::render_template(
            PLAN_USER,
            &[("state_formatted", &state_formatted), ("memories_formatted", &memories)],
        );

        let response = self.client.generate(&LlmRequest::plan(system, user)).await?;
        debug!(agent, latency_ms = response.latency_ms, "LLM day plan");
        Ok(DayPlan::from_response(&response.text))
    }

    /// A day plan for `state`; backend failures give [`DayPlan::fallback`].
    pub async fn plan_day(&self, agent: &str, state: &AgentState, recent: &[String]) -> DayPlan {
        match self.try_plan_day(agent, state, recent).await {
            Ok(plan) => plan,
            Err(e) => {
                if self.client.is_available() {
                    warn!(agent, error = %e, "LLM planning failed, using fallback plan");
                }
                DayPlan::fallback()
            }
        }
    }

    /// Summarize one deferred batch and store the result on `stream`.
    pub async fn complete_batch(&self, stream: &mut MemoryStream, batch: ReflectionBatch) -> Option<RecordId> {
        let agent = stream.agent().to_string();
        let text = self.reflect(&agent, &batch.contents).await;
        stream.complete_reflection(batch, &text)
    }

    /// Drain and summarize every deferred batch queued on `stream`.
    ///
    /// Returns the ids of the reflections stored, oldest batch first.
    pub async fn process_pending(&self, stream: &mut MemoryStream) -> Vec<RecordId> {
        let batches = stream.take_pending_reflections();
        let mut stored = Vec::with_capacity(batches.len());
        for batch in batches {
            if let Some(id) = self.complete_batch(stream, batch).await {
                stored.push(id);
            }
        }
        if !stored.is_empty() {
            info!(agent = %stream.agent(), reflections = stored.len(), "Processed deferred reflections");
        }
        stored
    }

    /// Plan today for `stream` from the last day's observations and adopt it.
    pub async fn plan_and_adopt(&self, stream: &mut MemoryStream, state: &AgentState) -> RecordId {
        let agent = stream.agent().to_string();
        let recent: Vec<String> = stream
            .store()
            .get_recent_observations(Duration::hours(24))
            .into_iter()
            .map(|r| r.content.clone())
            .collect();
        let plan = self.plan_day(&agent, state, &recent).await;
        stream.set_daily_plan(plan)
    }
}

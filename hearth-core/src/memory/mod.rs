//! Per-agent memory stream.
//!
//! [`RecordStore`] is the raw append-only log. [`MemoryStream`] wires it to
//! retrieval, the reflection trigger and the planning surface, which is what
//! an agent's tick loop talks to.

pub mod record;
pub mod store;

use std::collections::VecDeque;

use tracing::{debug, info};

use crate::clock::SharedClock;
use crate::config::HearthConfig;
use crate::error::Result;
use crate::planning::{AgentState, DayPlan, Planner, PlanningSurface};
use crate::reflection::{ReflectionBatch, ReflectionTrigger, Summarizer, ThemeSummarizer};
use crate::retrieval::{RetrievalContext, RetrievalEngine, ScoredRecord};
use crate::types::{AgentId, Location, RecordId};

pub use record::{MemoryRecord, PlanScope, RecordKind};
pub use store::{RecordStore, StreamSummary};

/// What a reflection check did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReflectionOutcome {
    /// A reflection was summarized and stored.
    Reflected(RecordId),
    /// The trigger fired and the batch was queued for later completion.
    Queued,
    /// The trigger fired but the summarizer had nothing to say.
    Empty,
    /// Not enough new records yet.
    NotDue,
}

enum Reflector {
    Inline(Box<dyn Summarizer>),
    Deferred(VecDeque<ReflectionBatch>),
}

/// An agent's memory: store, retrieval, reflection and planning together.
pub struct MemoryStream {
    store: RecordStore,
    retrieval: RetrievalEngine,
    trigger: ReflectionTrigger,
    reflector: Reflector,
    planning: PlanningSurface,
    reflection_importance: f64,
}

impl std::fmt::Debug for MemoryStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStream")
            .field("store", &self.store)
            .field("watermark", &self.trigger.watermark())
            .finish_non_exhaustive()
    }
}

impl MemoryStream {
    /// Open the stream for `agent` under `config.persistence.memory_dir`.
    ///
    /// Records loaded from disk count as already reflected upon.
    ///
    /// # Errors
    ///
    /// Fails if the agent id is invalid or the saved stream cannot be read
    /// or decoded.
    pub fn open(agent: AgentId, config: &HearthConfig, clock: SharedClock) -> Result<Self> {
        let store = RecordStore::open(agent, &config.persistence.memory_dir, clock)?
            .with_soft_limit(config.memory.soft_record_limit)
            .with_pretty(config.persistence.pretty);
        Ok(Self::from_store(store, config))
    }

    /// A stream with no backing file.
    #[must_use]
    pub fn in_memory(agent: AgentId, config: &HearthConfig, clock: SharedClock) -> Self {
        let store = RecordStore::in_memory(agent, clock)
            .with_soft_limit(config.memory.soft_record_limit)
            .with_pretty(config.persistence.pretty);
        Self::from_store(store, config)
    }

    fn from_store(store: RecordStore, config: &HearthConfig) -> Self {
        let trigger = ReflectionTrigger::new(&config.memory).with_watermark(store.len());
        Self {
            store,
            retrieval: RetrievalEngine::new(config.retrieval.clone()),
            trigger,
            reflector: Reflector::Inline(Box::new(ThemeSummarizer::default())),
            planning: PlanningSurface::new(
                config.planning.clone(),
                config.memory.day_plan_importance,
            ),
            reflection_importance: config.memory.reflection_importance,
        }
    }

    /// Summarize fired batches with `summarizer` instead of [`ThemeSummarizer`].
    #[must_use]
    pub fn with_summarizer(mut self, summarizer: Box<dyn Summarizer>) -> Self {
        self.reflector = Reflector::Inline(summarizer);
        self
    }

    /// Queue fired batches instead of summarizing them inline.
    ///
    /// Drain them with [`take_pending_reflections`](Self::take_pending_reflections)
    /// and store results with [`complete_reflection`](Self::complete_reflection).
    #[must_use]
    pub fn deferred(mut self) -> Self {
        self.reflector = Reflector::Deferred(VecDeque::new());
        self
    }

    /// Use a custom retrieval engine.
    #[must_use]
    pub fn with_retrieval(mut self, retrieval: RetrievalEngine) -> Self {
        self.retrieval = retrieval;
        self
    }

    // ------------------------------------------------------------------
    // Appends
    // ------------------------------------------------------------------

    /// Record an observation, then run the reflection trigger.
    pub fn add_observation(
        &mut self,
        content: impl Into<String>,
        importance: f64,
        location: Option<Location>,
        source: impl Into<String>,
    ) -> RecordId {
        let id = self.store.add_observation(content, importance, location, source);
        let outcome = self.check_reflection();
        if outcome != ReflectionOutcome::NotDue {
            debug!(agent = %self.store.agent(), ?outcome, "Reflection check after observation");
        }
        id
    }

    /// Record a reflection directly.
    pub fn add_reflection(
        &mut self,
        content: impl Into<String>,
        importance: f64,
        related: Vec<RecordId>,
    ) -> RecordId {
        self.store.add_reflection(content, importance, related)
    }

    /// Record a plan.
    pub fn add_plan(&mut self, content: impl Into<String>, scope: PlanScope, importance: f64) -> RecordId {
        self.store.add_plan(content, scope, importance)
    }

    // ------------------------------------------------------------------
    // Retrieval
    // ------------------------------------------------------------------

    /// The `top_k` most useful records for `query`.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `top_k` is zero.
    pub fn retrieve(
        &mut self,
        query: &str,
        context: Option<&RetrievalContext>,
        top_k: usize,
    ) -> Result<Vec<MemoryRecord>> {
        self.retrieval.retrieve(&mut self.store, query, context, top_k)
    }

    /// Like [`retrieve`](Self::retrieve), with per-factor scores.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `top_k` is zero.
    pub fn retrieve_scored(
        &mut self,
        query: &str,
        context: Option<&RetrievalContext>,
        top_k: usize,
    ) -> Result<Vec<ScoredRecord>> {
        self.retrieval.retrieve_scored(&mut self.store, query, context, top_k)
    }

    /// Retrieve with the configured default `top_k`.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the configured `top_k` is zero.
    pub fn retrieve_default(&mut self, query: &str) -> Result<Vec<MemoryRecord>> {
        let top_k = self.retrieval.default_top_k();
        self.retrieve(query, None, top_k)
    }

    // ------------------------------------------------------------------
    // Reflection
    // ------------------------------------------------------------------

    /// Run the reflection trigger once.
    pub fn check_reflection(&mut self) -> ReflectionOutcome {
        let Some(batch) = self.trigger.poll(&self.store) else {
            return ReflectionOutcome::NotDue;
        };

        let text = match &mut self.reflector {
            Reflector::Deferred(queue) => {
                queue.push_back(batch);
                return ReflectionOutcome::Queued;
            }
            Reflector::Inline(summarizer) => summarizer.summarize(&batch.contents),
        };

        match self.store_reflection(batch, &text) {
            Some(id) => ReflectionOutcome::Reflected(id),
            None => ReflectionOutcome::Empty,
        }
    }

    /// Drain batches queued in deferred mode, oldest first.
    pub fn take_pending_reflections(&mut self) -> Vec<ReflectionBatch> {
        match &mut self.reflector {
            Reflector::Deferred(queue) => queue.drain(..).collect(),
            Reflector::Inline(_) => Vec::new(),
        }
    }

    /// Store `text` as the reflection for `batch`.
    ///
    /// Returns `None` (and stores nothing) if `text` is blank.
    pub fn complete_reflection(&mut self, batch: ReflectionBatch, text: &str) -> Option<RecordId> {
        self.store_reflection(batch, text)
    }

    fn store_reflection(&mut self, batch: ReflectionBatch, text: &str) -> Option<RecordId> {
        let text = text.trim();
        if text.is_empty() {
            debug!(agent = %self.store.agent(), records = batch.len(), "Summarizer returned nothing");
            return None;
        }
        let id = self
            .store
            .add_reflection(text, self.reflection_importance, batch.ids);
        info!(agent = %self.store.agent(), id = %id, "Stored reflection");
        Some(id)
    }

    // ------------------------------------------------------------------
    // Planning
    // ------------------------------------------------------------------

    /// Ask `planner` for today's plan and adopt it.
    pub fn generate_daily_plan(&mut self, planner: &dyn Planner, state: &AgentState) -> RecordId {
        self.planning.generate_daily_plan(&mut self.store, planner, state)
    }

    /// Adopt an already-built plan.
    pub fn set_daily_plan(&mut self, plan: DayPlan) -> RecordId {
        self.planning.adopt_plan(&mut self.store, plan)
    }

    /// The adopted day plan, if any.
    #[must_use]
    pub fn current_plan(&self) -> Option<&DayPlan> {
        self.planning.current_plan()
    }

    /// What `plan` schedules for the current hour.
    #[must_use]
    pub fn get_current_hour_activity<'a>(&'a self, plan: &'a DayPlan) -> &'a str {
        self.planning.get_current_hour_activity(plan, self.store.now())
    }

    /// What the adopted plan schedules for the current hour.
    #[must_use]
    pub fn current_activity(&self) -> &str {
        self.planning.current_activity(self.store.now())
    }

    // ------------------------------------------------------------------
    // Accessors & persistence
    // ------------------------------------------------------------------

    /// The underlying record store.
    #[must_use]
    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// The owning agent.
    #[must_use]
    pub fn agent(&self) -> &AgentId {
        self.store.agent()
    }

    /// Per-kind record counts.
    #[must_use]
    pub fn summary(&self) -> StreamSummary {
        self.store.summary()
    }

    /// Persist the stream.
    ///
    /// # Errors
    ///
    /// Fails on I/O or encoding errors.
    pub fn save(&self) -> Result<()> {
        self.store.save()
    }
}

//! A single memory record: one entry in an agent's chronological stream.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{Location, RecordId};

/// What produced a memory record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    /// Something the agent perceived or did.
    Observation,
    /// A higher-level insight distilled from a batch of records.
    Reflection,
    /// An intention (day plan, hourly plan, next action).
    Plan,
}

impl RecordKind {
    /// Lower-case name, as persisted.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Observation => "observation",
            Self::Reflection => "reflection",
            Self::Plan => "plan",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Granularity of a plan record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlanScope {
    /// A whole-day plan.
    Daily,
    /// A plan for the current hour.
    #[default]
    Hourly,
    /// A single intended action.
    Action,
}

impl PlanScope {
    /// Source tag stored on plan records of this scope.
    #[must_use]
    pub fn source_tag(self) -> &'static str {
        match self {
            Self::Daily => "planning/daily",
            Self::Hourly => "planning/hourly",
            Self::Action => "planning/action",
        }
    }
}

/// One memory in an agent's stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// Unique identifier.
    pub id: RecordId,
    /// Natural-language description.
    pub content: String,
    /// Observation, reflection or plan.
    pub kind: RecordKind,
    /// How significant this record is (0.0 to 1.0).
    pub importance: f64,
    /// When the record was created.
    pub timestamp: DateTime<Utc>,
    /// How many retrievals have scored this record.
    #[serde(default)]
    pub access_count: u64,
    /// When a retrieval last scored this record.
    #[serde(default)]
    pub last_access: Option<DateTime<Utc>>,
    /// Free-form origin tag (e.g. "action", "social", "reflection").
    #[serde(default)]
    pub source: String,
    /// Where the agent was, if known.
    #[serde(default)]
    pub location: Option<Location>,
    /// For reflections: the records they summarize.
    #[serde(default)]
    pub related_memories: Vec<RecordId>,
}

impl MemoryRecord {
    /// Create a record stamped at `timestamp` with importance clamped to `[0, 1]`.
    #[must_use]
    pub fn new(
        content: impl Into<String>,
        kind: RecordKind,
        importance: f64,
        timestamp: DateTime<Utc>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            id: RecordId::new(),
            content: content.into(),
            kind,
            importance: clamp_unit(importance),
            timestamp,
            access_count: 0,
            last_access: None,
            source: source.into(),
            location: None,
            related_memories: Vec::new(),
        }
    }

    /// Attach a location.
    #[must_use]
    pub fn with_location(mut self, location: Option<Location>) -> Self {
        self.location = location;
        self
    }

    /// Attach the ids this record was derived from.
    #[must_use]
    pub fn with_related(mut self, related: Vec<RecordId>) -> Self {
        self.related_memories = related;
        self
    }

    /// Record that a retrieval scored this record at `now`.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.access_count += 1;
        self.last_access = Some(now);
    }

    /// Hours between creation and `now`, never negative.
    #[must_use]
    pub fn hours_since_created(&self, now: DateTime<Utc>) -> f64 {
        let millis = (now - self.timestamp).num_milliseconds().max(0);
        millis as f64 / 3_600_000.0
    }
}

/// Clamp into `[0, 1]`, mapping NaN to 0.
pub(crate) fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) }
}

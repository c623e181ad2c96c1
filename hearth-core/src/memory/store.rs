//! Record Store: an agent's append-only memory log.
//!
//! Records are only ever appended. The single mutation allowed afterwards is
//! access bookkeeping performed by retrieval, so insertion order doubles as
//! the stable tie-break for ranking.
//!
//! On disk the store is `<dir>/<agent>_stream.json`, an ordered JSON list
//! of [`MemoryRecord`]s.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use crate::clock::{self, SharedClock};
use crate::error::{HearthError, Result};
use crate::memory::record::{MemoryRecord, PlanScope, RecordKind};
use crate::persistence;
use crate::types::{AgentId, Location, RecordId};

/// Default record count above which growth is reported.
const DEFAULT_SOFT_LIMIT: usize = 10_000;

/// Per-kind record counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamSummary {
    /// All records.
    pub total: usize,
    /// Observation records.
    pub observations: usize,
    /// Reflection records.
    pub reflections: usize,
    /// Plan records.
    pub plans: usize,
}

impl fmt::Display for StreamSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} records (observations {} / reflections {} / plans {})",
            self.total, self.observations, self.reflections, self.plans
        )
    }
}

/// One agent's chronological memory log.
pub struct RecordStore {
    agent: AgentId,
    path: Option<PathBuf>,
    records: Vec<MemoryRecord>,
    clock: SharedClock,
    soft_limit: usize,
    over_soft_limit: bool,
    pretty: bool,
}

impl fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordStore")
            .field("agent", &self.agent)
            .field("path", &self.path)
            .field("records", &self.records.len())
            .finish_non_exhaustive()
    }
}

impl RecordStore {
    /// Open the store for `agent` under `dir`, loading any saved records.
    ///
    /// A missing file yields an empty store.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Validation`] if the agent id cannot name a
    /// file or the saved file is malformed, and [`HearthError::Storage`] if
    /// it cannot be read.
    pub fn open(agent: AgentId, dir: &Path, clock: SharedClock) -> Result<Self> {
        agent.validate()?;
        let path = dir.join(format!("{agent}_stream.json"));

        let records: Vec<MemoryRecord> = persistence::read_json(&path)?.unwrap_or_default();
        validate_records(&records, &path)?;

        info!(
            agent = %agent,
            path = %path.display(),
            records = records.len(),
            "Memory stream opened"
        );

        let mut store = Self::in_memory(agent, clock);
        store.path = Some(path);
        store.records = records;
        Ok(store)
    }

    /// Create a store with no backing file. `save` is a no-op.
    #[must_use]
    pub fn in_memory(agent: AgentId, clock: SharedClock) -> Self {
        Self {
            agent,
            path: None,
            records: Vec::new(),
            clock,
            soft_limit: DEFAULT_SOFT_LIMIT,
            over_soft_limit: false,
            pretty: true,
        }
    }

    /// Set the record count above which a growth warning is logged.
    #[must_use]
    pub fn with_soft_limit(mut self, limit: usize) -> Self {
        self.soft_limit = limit;
        self
    }

    /// Choose pretty or compact JSON for `save`.
    #[must_use]
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    // ------------------------------------------------------------------
    // Appends
    // ------------------------------------------------------------------

    /// Append an observation and return its id.
    pub fn add_observation(
        &mut self,
        content: impl Into<String>,
        importance: f64,
        location: Option<Location>,
        source: impl Into<String>,
    ) -> RecordId {
        let record = MemoryRecord::new(
            content,
            RecordKind::Observation,
            importance,
            self.clock.now(),
            source,
        )
        .with_location(location);
        self.push(record)
    }

    /// Append a reflection summarizing `related` and return its id.
    pub fn add_reflection(
        &mut self,
        content: impl Into<String>,
        importance: f64,
        related: Vec<RecordId>,
    ) -> RecordId {
        let record = MemoryRecord::new(
            content,
            RecordKind::Reflection,
            importance,
            self.clock.now(),
            "reflection",
        )
        .with_related(related);
        self.push(record)
    }

    /// Append a plan and return its id.
    pub fn add_plan(
        &mut self,
        content: impl Into<String>,
        scope: PlanScope,
        importance: f64,
    ) -> RecordId {
        let record = MemoryRecord::new(
            content,
            RecordKind::Plan,
            importance,
            self.clock.now(),
            scope.source_tag(),
        );
        self.push(record)
    }

    fn push(&mut self, record: MemoryRecord) -> RecordId {
        let id = record.id;
        debug!(agent = %self.agent, kind = %record.kind, id = %id, "Appended memory record");
        self.records.push(record);

        if self.records.len() > self.soft_limit && !self.over_soft_limit {
            self.over_soft_limit = true;
            warn!(
                agent = %self.agent,
                records = self.records.len(),
                soft_limit = self.soft_limit,
                "Memory stream exceeded its soft record limit; retrieval cost grows linearly"
            );
        }
        id
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Observations created within `window` of now, in insertion order.
    #[must_use]
    pub fn get_recent_observations(&self, window: Duration) -> Vec<&MemoryRecord> {
        let cutoff = clock::window_start(self.clock.now(), window);
        self.records
            .iter()
            .filter(|r| r.kind == RecordKind::Observation && r.timestamp > cutoff)
            .collect()
    }

    /// All reflections, in insertion order.
    #[must_use]
    pub fn get_reflections(&self) -> Vec<&MemoryRecord> {
        self.of_kind(RecordKind::Reflection)
    }

    /// All plans, in insertion order.
    #[must_use]
    pub fn get_plans(&self) -> Vec<&MemoryRecord> {
        self.of_kind(RecordKind::Plan)
    }

    fn of_kind(&self, kind: RecordKind) -> Vec<&MemoryRecord> {
        self.records.iter().filter(|r| r.kind == kind).collect()
    }

    /// Look up a record by id.
    #[must_use]
    pub fn get(&self, id: RecordId) -> Option<&MemoryRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Every record, in insertion order.
    #[must_use]
    pub fn records(&self) -> &[MemoryRecord] {
        &self.records
    }

    /// Mutable access for retrieval's access bookkeeping.
    pub(crate) fn records_mut(&mut self) -> &mut [MemoryRecord] {
        &mut self.records
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Per-kind counts.
    #[must_use]
    pub fn summary(&self) -> StreamSummary {
        self.records.iter().fold(
            StreamSummary {
                total: self.records.len(),
                ..StreamSummary::default()
            },
            |mut acc, r| {
                match r.kind {
                    RecordKind::Observation => acc.observations += 1,
                    RecordKind::Reflection => acc.reflections += 1,
                    RecordKind::Plan => acc.plans += 1,
                }
                acc
            },
        )
    }

    /// The owning agent.
    #[must_use]
    pub fn agent(&self) -> &AgentId {
        &self.agent
    }

    /// The backing file, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// The current instant according to this store's clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Write all records to the backing file.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Storage`] on I/O failure or
    /// [`HearthError::Serialization`] if encoding fails.
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            debug!(agent = %self.agent, "In-memory stream; nothing to save");
            return Ok(());
        };
        self.save_to(path)
    }

    /// Write all records to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Storage`] on I/O failure or
    /// [`HearthError::Serialization`] if encoding fails.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let bytes = persistence::write_json_atomic(path, &self.records, self.pretty)?;
        info!(
            agent = %self.agent,
            records = self.records.len(),
            bytes,
            "Saved memory stream"
        );
        Ok(())
    }
}

/// Reject decoded records that violate store invariants.
fn validate_records(records: &[MemoryRecord], path: &Path) -> Result<()> {
    let mut seen = HashSet::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        if !record.importance.is_finite() || !(0.0..=1.0).contains(&record.importance) {
            return Err(HearthError::Validation(format!(
                "{}: record {index} has importance {} outside [0, 1]",
                path.display(),
                record.importance
            )));
        }
        if !seen.insert(record.id) {
            return Err(HearthError::Validation(format!(
                "{}: duplicate record id {}",
                path.display(),
                record.id
            )));
        }
    }
    Ok(())
}

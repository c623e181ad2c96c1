//! Social event log. Observability only: no algorithm reads it back.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::social::relationship::RelationType;
use crate::types::AgentId;

/// What happened.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SocialEventKind {
    /// Two agents interacted for the first time.
    FirstMeet,
    /// A relationship label changed.
    RelationChange {
        /// Label before.
        from: RelationType,
        /// Label after.
        to: RelationType,
        /// Caller's label for the interaction (e.g. "trade", "attack").
        interaction: String,
    },
    /// A faction was founded.
    FactionCreated {
        /// Faction name.
        faction: String,
    },
    /// An agent joined a faction.
    FactionJoin {
        /// Faction name.
        faction: String,
    },
    /// An agent left a faction.
    FactionLeave {
        /// Faction name.
        faction: String,
    },
    /// An agent's reputation changed.
    ReputationChange {
        /// Score before.
        from: f64,
        /// Score after.
        to: f64,
    },
}

/// One entry in the social log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SocialEvent {
    /// Event kind and its details.
    #[serde(flatten)]
    pub kind: SocialEventKind,
    /// Agents involved.
    pub participants: Vec<AgentId>,
    /// When it happened.
    pub timestamp: DateTime<Utc>,
}

/// Bounded in-memory event log; the oldest entries are dropped first.
#[derive(Debug, Clone)]
pub struct EventLog {
    events: VecDeque<SocialEvent>,
    capacity: usize,
    recorded: u64,
}

impl EventLog {
    /// A log retaining at most `capacity` events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            events: VecDeque::new(),
            capacity: capacity.max(1),
            recorded: 0,
        }
    }

    /// Append an event.
    pub fn push(&mut self, event: SocialEvent) {
        if self.events.len() == self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
        self.recorded += 1;
    }

    /// Retained events, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &SocialEvent> {
        self.events.iter()
    }

    /// Number of retained events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether nothing is retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events ever recorded, including dropped ones.
    #[must_use]
    pub fn recorded(&self) -> u64 {
        self.recorded
    }
}

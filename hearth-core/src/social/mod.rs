//! Population-wide social graph: relationships, factions and reputation.
//!
//! [`SocialNetwork`] is the one object every agent's tick writes to when
//! agents meet. It is not internally synchronized; when ticks can run
//! concurrently, share it as a [`SharedSocialNetwork`] so all writers go
//! through one lock.
//!
//! The whole graph persists as a single JSON document (see
//! [`SocialSnapshot`]). The event log is kept in memory only.

pub mod events;
pub mod faction;
pub mod relationship;
pub mod reputation;
pub mod summary;

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::clock::SharedClock;
use crate::config::{HearthConfig, SocialConfig};
use crate::error::{HearthError, Result};
use crate::persistence;
use crate::types::{AgentId, RecordId};

pub use events::{EventLog, SocialEvent, SocialEventKind};
pub use faction::{FactionRegistry, JoinOutcome, LeaveOutcome};
pub use relationship::{PairKey, RelationType, Relationship, RelationshipStore, RelationshipUpdate};
pub use reputation::{ReputationLedger, ReputationTier};
pub use summary::{NetworkStats, SocialSummary};

/// A social network shared between concurrently running agent ticks.
pub type SharedSocialNetwork = Arc<Mutex<SocialNetwork>>;

/// On-disk form of the social graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SocialSnapshot {
    /// Every relationship, in pair-key order.
    #[serde(default)]
    pub relationships: Vec<Relationship>,
    /// Agent → reputation score.
    #[serde(default)]
    pub reputation: BTreeMap<AgentId, f64>,
    /// Faction name → members.
    #[serde(default)]
    pub factions: BTreeMap<String, Vec<AgentId>>,
    /// When the snapshot was written.
    #[serde(default)]
    pub saved_at: Option<DateTime<Utc>>,
}

/// Relationships, factions and reputation for the whole population.
pub struct SocialNetwork {
    path: Option<PathBuf>,
    relationships: RelationshipStore,
    factions: FactionRegistry,
    reputation: ReputationLedger,
    events: EventLog,
    clock: SharedClock,
    pretty: bool,
}

impl std::fmt::Debug for SocialNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocialNetwork")
            .field("path", &self.path)
            .field("relationships", &self.relationships.len())
            .field("factions", &self.factions.len())
            .field("events", &self.events.len())
            .finish_non_exhaustive()
    }
}

impl SocialNetwork {
    /// Open the network at `config.persistence.social_path`.
    ///
    /// A missing file yields an empty network.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or does not hold a valid snapshot.
    pub fn open(config: &HearthConfig, clock: SharedClock) -> Result<Self> {
        let network = Self::open_at(&config.persistence.social_path, &config.social, clock)?;
        Ok(network.with_pretty(config.persistence.pretty))
    }

    /// Open the network stored at `path`.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or does not hold a valid snapshot.
    pub fn open_at(path: &Path, config: &SocialConfig, clock: SharedClock) -> Result<Self> {
        let snapshot: SocialSnapshot = persistence::read_json(path)?.unwrap_or_default();

        let mut network = Self::in_memory(config, clock);
        network.relationships =
            RelationshipStore::from_relationships(snapshot.relationships, config.hysteresis)?;
        network.reputation =
            ReputationLedger::from_scores(snapshot.reputation, config.default_reputation)?;
        network.factions = FactionRegistry::from_map(snapshot.factions)?;
        network.path = Some(path.to_path_buf());

        info!(
            path = %path.display(),
            relationships = network.relationships.len(),
            factions = network.factions.len(),
            reputations = network.reputation.len(),
            "Social network opened"
        );
        Ok(network)
    }

    /// A network with no backing file. `save` is a no-op.
    #[must_use]
    pub fn in_memory(config: &SocialConfig, clock: SharedClock) -> Self {
        Self {
            path: None,
            relationships: RelationshipStore::new(config.hysteresis),
            factions: FactionRegistry::new(),
            reputation: ReputationLedger::new(config.default_reputation),
            events: EventLog::new(config.max_event_log),
            clock,
            pretty: true,
        }
    }

    /// Choose pretty or compact JSON for `save`.
    #[must_use]
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Wrap the network for sharing between concurrent ticks.
    #[must_use]
    pub fn shared(self) -> SharedSocialNetwork {
        Arc::new(Mutex::new(self))
    }

    fn record(&mut self, kind: SocialEventKind, participants: Vec<AgentId>) {
        let event = SocialEvent {
            kind,
            participants,
            timestamp: self.clock.now(),
        };
        debug!(?event, "Social event");
        self.events.push(event);
    }

    // ------------------------------------------------------------------
    // Relationships
    // ------------------------------------------------------------------

    /// The relationship between `a` and `b`, in either order.
    #[must_use]
    pub fn get_relationship(&self, a: &AgentId, b: &AgentId) -> Option<&Relationship> {
        self.relationships.get(a, b)
    }

    /// The relationship between `a` and `b`, creating a neutral one on first
    /// meeting.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `a == b`.
    pub fn create_relationship(&mut self, a: &AgentId, b: &AgentId) -> Result<&Relationship> {
        let now = self.clock.now();
        let (_, created) = self.relationships.get_or_create(a, b, now)?;
        if created {
            self.record(SocialEventKind::FirstMeet, vec![a.clone(), b.clone()]);
        }
        self.relationships
            .get(a, b)
            .ok_or_else(|| HearthError::Validation(format!("relationship {a}<->{b} vanished")))
    }

    /// Apply one interaction between `a` and `b`.
    ///
    /// `interaction` is a free-form label (e.g. "trade", "attack") carried
    /// into the relation-change event.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `a == b` or `delta` is not finite.
    pub fn update_relationship(
        &mut self,
        a: &AgentId,
        b: &AgentId,
        delta: f64,
        interaction: &str,
    ) -> Result<RelationshipUpdate> {
        let now = self.clock.now();
        let update = self.relationships.update(a, b, delta, now)?;

        let participants = vec![a.clone(), b.clone()];
        if update.created {
            self.record(SocialEventKind::FirstMeet, participants.clone());
        }
        if let Some((from, to)) = update.change {
            info!(agent_a = %a, agent_b = %b, %from, %to, "Relationship changed");
            self.record(
                SocialEventKind::RelationChange {
                    from,
                    to,
                    interaction: interaction.to_string(),
                },
                participants,
            );
        }
        Ok(update)
    }

    /// Note that `a` and `b` share the memory record `memory`.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `a == b`.
    pub fn add_shared_memory(&mut self, a: &AgentId, b: &AgentId, memory: RecordId) -> Result<()> {
        let now = self.clock.now();
        let (relationship, created) = self.relationships.get_or_create(a, b, now)?;
        if !relationship.shared_memories.contains(&memory) {
            relationship.shared_memories.push(memory);
        }
        if created {
            self.record(SocialEventKind::FirstMeet, vec![a.clone(), b.clone()]);
        }
        Ok(())
    }

    /// Agents `agent` is friends with.
    #[must_use]
    pub fn get_friends(&self, agent: &AgentId) -> Vec<AgentId> {
        self.relationships
            .partners_where(agent, |t| t == RelationType::Friend)
    }

    /// Agents `agent` is enemies with.
    #[must_use]
    pub fn get_enemies(&self, agent: &AgentId) -> Vec<AgentId> {
        self.relationships
            .partners_where(agent, |t| t == RelationType::Enemy)
    }

    /// Agents `agent` is allied with. Friends count as allies.
    #[must_use]
    pub fn get_allies(&self, agent: &AgentId) -> Vec<AgentId> {
        self.relationships.partners_where(agent, |t| {
            matches!(t, RelationType::Ally | RelationType::Friend)
        })
    }

    // ------------------------------------------------------------------
    // Reputation
    // ------------------------------------------------------------------

    /// Add `delta` to `agent`'s reputation and return the new score.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `delta` is not finite.
    pub fn update_reputation(&mut self, agent: &AgentId, delta: f64) -> Result<f64> {
        let (from, to) = self.reputation.update(agent, delta)?;
        if (to - from).abs() > f64::EPSILON {
            self.record(SocialEventKind::ReputationChange { from, to }, vec![agent.clone()]);
        }
        Ok(to)
    }

    /// `agent`'s reputation (default 50 if unseen).
    #[must_use]
    pub fn get_reputation(&self, agent: &AgentId) -> f64 {
        self.reputation.get(agent)
    }

    // ------------------------------------------------------------------
    // Factions
    // ------------------------------------------------------------------

    /// Found a faction with `founder` as its only member.
    ///
    /// # Errors
    ///
    /// Returns a duplicate error if the name is taken.
    pub fn create_faction(&mut self, name: &str, founder: &AgentId) -> Result<()> {
        self.factions.create(name, founder)?;
        info!(faction = name, founder = %founder, "Faction created");
        self.record(
            SocialEventKind::FactionCreated {
                faction: name.to_string(),
            },
            vec![founder.clone()],
        );
        Ok(())
    }

    /// Add `agent` to the faction `name`.
    pub fn join_faction(&mut self, name: &str, agent: &AgentId) -> JoinOutcome {
        let outcome = self.factions.join(name, agent);
        if outcome == JoinOutcome::Joined {
            self.record(
                SocialEventKind::FactionJoin {
                    faction: name.to_string(),
                },
                vec![agent.clone()],
            );
        }
        outcome
    }

    /// Remove `agent` from the faction `name`.
    pub fn leave_faction(&mut self, name: &str, agent: &AgentId) -> LeaveOutcome {
        let outcome = self.factions.leave(name, agent);
        if outcome == LeaveOutcome::Left {
            self.record(
                SocialEventKind::FactionLeave {
                    faction: name.to_string(),
                },
                vec![agent.clone()],
            );
        }
        outcome
    }

    /// Members of `name`; empty if there is no such faction.
    #[must_use]
    pub fn get_faction_members(&self, name: &str) -> BTreeSet<AgentId> {
        self.factions.members(name).cloned().unwrap_or_default()
    }

    /// Factions `agent` belongs to, sorted by name.
    #[must_use]
    pub fn get_agent_factions(&self, agent: &AgentId) -> Vec<String> {
        self.factions.factions_of(agent)
    }

    // ------------------------------------------------------------------
    // Reporting
    // ------------------------------------------------------------------

    /// `agent`'s friends, enemies, allies, reputation and factions.
    #[must_use]
    pub fn get_social_summary(&self, agent: &AgentId) -> SocialSummary {
        let reputation = self.reputation.get(agent);
        SocialSummary {
            friends: self.get_friends(agent).len(),
            enemies: self.get_enemies(agent).len(),
            allies: self.get_allies(agent).len(),
            reputation,
            tier: ReputationTier::from_score(reputation),
            factions: self.get_agent_factions(agent),
        }
    }

    /// Counts across the whole network.
    #[must_use]
    pub fn network_stats(&self) -> NetworkStats {
        let agents: BTreeSet<&AgentId> = self
            .relationships
            .iter()
            .flat_map(|r| [&r.agent_a, &r.agent_b])
            .collect();
        NetworkStats {
            total_relationships: self.relationships.len(),
            total_agents: agents.len(),
            total_factions: self.factions.len(),
            total_events: self.events.recorded(),
        }
    }

    /// Retained social events, oldest first.
    pub fn events(&self) -> impl Iterator<Item = &SocialEvent> {
        self.events.iter()
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// The current state as a snapshot.
    #[must_use]
    pub fn snapshot(&self) -> SocialSnapshot {
        SocialSnapshot {
            relationships: self.relationships.iter().cloned().collect(),
            reputation: self.reputation.scores().clone(),
            factions: self.factions.to_map(),
            saved_at: Some(self.clock.now()),
        }
    }

    /// Write the network to its backing file.
    ///
    /// # Errors
    ///
    /// Fails on I/O or encoding errors.
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            debug!("In-memory social network; nothing to save");
            return Ok(());
        };
        self.save_to(path)
    }

    /// Write the network to `path`.
    ///
    /// # Errors
    ///
    /// Fails on I/O or encoding errors.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let bytes = persistence::write_json_atomic(path, &self.snapshot(), self.pretty)?;
        info!(
            path = %path.display(),
            relationships = self.relationships.len(),
            bytes,
            "Saved social network"
        );
        Ok(())
    }
}

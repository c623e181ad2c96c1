//! Faction Registry: named membership sets.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{HearthError, Result};
use crate::types::AgentId;

/// Result of a join request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// The agent was added.
    Joined,
    /// The agent was already a member; nothing changed.
    AlreadyMember,
    /// No faction has that name.
    NoSuchFaction,
}

/// Result of a leave request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// The agent was removed.
    Left,
    /// The agent was not a member; nothing changed.
    NotMember,
    /// No faction has that name.
    NoSuchFaction,
}

/// Every faction and its members.
#[derive(Debug, Clone, Default)]
pub struct FactionRegistry {
    factions: BTreeMap<String, BTreeSet<AgentId>>,
}

impl FactionRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted `name → members`.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Validation`] if a faction name is blank.
    pub fn from_map(factions: BTreeMap<String, Vec<AgentId>>) -> Result<Self> {
        let mut registry = Self::new();
        for (name, members) in factions {
            if name.trim().is_empty() {
                return Err(HearthError::Validation("faction name must not be blank".into()));
            }
            registry.factions.insert(name, members.into_iter().collect());
        }
        Ok(registry)
    }

    /// Persisted form: `name → sorted members`.
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<String, Vec<AgentId>> {
        self.factions
            .iter()
            .map(|(name, members)| (name.clone(), members.iter().cloned().collect()))
            .collect()
    }

    /// Create `name` with `founder` as its only member.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Duplicate`] if the name is taken (membership
    /// is left untouched) and [`HearthError::Validation`] if it is blank.
    pub fn create(&mut self, name: &str, founder: &AgentId) -> Result<()> {
        if name.trim().is_empty() {
            return Err(HearthError::Validation("faction name must not be blank".into()));
        }
        if self.factions.contains_key(name) {
            return Err(HearthError::Duplicate {
                kind: "faction",
                name: name.to_string(),
            });
        }
        self.factions
            .insert(name.to_string(), BTreeSet::from([founder.clone()]));
        Ok(())
    }

    /// Add `agent` to `name`.
    pub fn join(&mut self, name: &str, agent: &AgentId) -> JoinOutcome {
        match self.factions.get_mut(name) {
            None => JoinOutcome::NoSuchFaction,
            Some(members) => {
                if members.insert(agent.clone()) {
                    JoinOutcome::Joined
                } else {
                    JoinOutcome::AlreadyMember
                }
            }
        }
    }

    /// Remove `agent` from `name`. Empty factions are kept.
    pub fn leave(&mut self, name: &str, agent: &AgentId) -> LeaveOutcome {
        match self.factions.get_mut(name) {
            None => LeaveOutcome::NoSuchFaction,
            Some(members) => {
                if members.remove(agent) {
                    LeaveOutcome::Left
                } else {
                    LeaveOutcome::NotMember
                }
            }
        }
    }

    /// Members of `name`, if it exists.
    #[must_use]
    pub fn members(&self, name: &str) -> Option<&BTreeSet<AgentId>> {
        self.factions.get(name)
    }

    /// Names of every faction `agent` belongs to, sorted.
    #[must_use]
    pub fn factions_of(&self, agent: &AgentId) -> Vec<String> {
        self.factions
            .iter()
            .filter(|(_, members)| members.contains(agent))
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Number of factions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.factions.len()
    }

    /// Whether no faction exists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factions.is_empty()
    }
}

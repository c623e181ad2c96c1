//! Read-only aggregates over the social graph.

use std::fmt;

use serde::Serialize;

use crate::social::reputation::ReputationTier;

/// One agent's social standing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SocialSummary {
    /// Relationships labelled friend.
    pub friends: usize,
    /// Relationships labelled enemy.
    pub enemies: usize,
    /// Relationships labelled ally or friend.
    pub allies: usize,
    /// Reputation score.
    pub reputation: f64,
    /// Reputation band.
    pub tier: ReputationTier,
    /// Factions the agent belongs to, sorted.
    pub factions: Vec<String>,
}

impl fmt::Display for SocialSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "friends {} / allies {} / enemies {}, reputation {:.1}",
            self.friends, self.allies, self.enemies, self.reputation
        )?;
        if !self.factions.is_empty() {
            write!(f, ", factions: {}", self.factions.join(", "))?;
        }
        Ok(())
    }
}

/// Whole-network counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NetworkStats {
    /// Pairs that have interacted.
    pub total_relationships: usize,
    /// Distinct agents appearing in any relationship.
    pub total_agents: usize,
    /// Factions, including empty ones.
    pub total_factions: usize,
    /// Social events recorded since the network was constructed.
    pub total_events: u64,
}

//! Reputation Ledger: population-visible trust per agent.
//!
//! Each agent has a single score in `[0, 100]`. Agents never seen before
//! sit at the ledger's default (50). Scores are grouped into coarse
//! [`ReputationTier`]s for display.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{HearthError, Result};
use crate::types::AgentId;

/// Lowest reputation.
pub const MIN_REPUTATION: f64 = 0.0;
/// Highest reputation.
pub const MAX_REPUTATION: f64 = 100.0;

/// Coarse reputation bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReputationTier {
    /// Score >= 80.
    Revered,
    /// Score 60–80.
    Trusted,
    /// Score 40–60.
    Neutral,
    /// Score 20–40.
    Distrusted,
    /// Score < 20.
    Outcast,
}

impl ReputationTier {
    /// Classify a score into a tier.
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s >= 80.0 => Self::Revered,
            s if s >= 60.0 => Self::Trusted,
            s if s >= 40.0 => Self::Neutral,
            s if s >= 20.0 => Self::Distrusted,
            _ => Self::Outcast,
        }
    }

    /// Get a human-readable description.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Revered => "Revered: others seek this agent out",
            Self::Trusted => "Trusted: a reliable partner",
            Self::Neutral => "Unremarkable: no strong standing either way",
            Self::Distrusted => "Distrusted: others are wary",
            Self::Outcast => "Outcast: shunned by the population",
        }
    }
}

/// Agent → reputation score.
#[derive(Debug, Clone)]
pub struct ReputationLedger {
    scores: BTreeMap<AgentId, f64>,
    default: f64,
}

impl Default for ReputationLedger {
    fn default() -> Self {
        Self::new(50.0)
    }
}

impl ReputationLedger {
    /// An empty ledger where unseen agents score `default`.
    #[must_use]
    pub fn new(default: f64) -> Self {
        Self {
            scores: BTreeMap::new(),
            default: default.clamp(MIN_REPUTATION, MAX_REPUTATION),
        }
    }

    /// Rebuild from persisted scores.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Validation`] if any score lies outside `[0, 100]`.
    pub fn from_scores(scores: BTreeMap<AgentId, f64>, default: f64) -> Result<Self> {
        if let Some((agent, score)) = scores
            .iter()
            .find(|(_, s)| !s.is_finite() || !(MIN_REPUTATION..=MAX_REPUTATION).contains(*s))
        {
            return Err(HearthError::Validation(format!(
                "reputation of {agent} is {score}, outside [0, 100]"
            )));
        }
        let mut ledger = Self::new(default);
        ledger.scores = scores;
        Ok(ledger)
    }

    /// The persisted scores.
    #[must_use]
    pub fn scores(&self) -> &BTreeMap<AgentId, f64> {
        &self.scores
    }

    /// `agent`'s score, or the default if unseen.
    #[must_use]
    pub fn get(&self, agent: &AgentId) -> f64 {
        self.scores.get(agent).copied().unwrap_or(self.default)
    }

    /// `agent`'s tier.
    #[must_use]
    pub fn tier(&self, agent: &AgentId) -> ReputationTier {
        ReputationTier::from_score(self.get(agent))
    }

    /// Add `delta` to `agent`'s score, clamped into `[0, 100]`.
    /// Returns `(before, after)`.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Validation`] if `delta` is not finite.
    pub fn update(&mut self, agent: &AgentId, delta: f64) -> Result<(f64, f64)> {
        if !delta.is_finite() {
            return Err(HearthError::Validation(format!(
                "reputation delta must be finite, got {delta}"
            )));
        }
        let before = self.get(agent);
        let after = (before + delta).clamp(MIN_REPUTATION, MAX_REPUTATION);
        self.scores.insert(agent.clone(), after);
        Ok((before, after))
    }

    /// Number of agents with a recorded score.
    #[must_use]
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// Whether no score has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

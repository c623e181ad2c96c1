//! Relationship Store and the relationship state machine.
//!
//! Every unordered pair of agents has at most one [`Relationship`], keyed by
//! a [`PairKey`] that always holds the two ids in sorted order, so `(a, b)`
//! and `(b, a)` resolve to the same entry.
//!
//! The value in `[-100, 100]` maps onto a qualitative [`RelationType`]:
//!
//! | value        | type    |
//! |--------------|---------|
//! | `>= 50`      | friend  |
//! | `>= 20`      | ally    |
//! | `<= -50`     | enemy   |
//! | `<= -20`     | rival   |
//! | otherwise    | neutral |

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{HearthError, Result};
use crate::types::{AgentId, RecordId};

/// Lowest relationship value.
pub const MIN_VALUE: f64 = -100.0;
/// Highest relationship value.
pub const MAX_VALUE: f64 = 100.0;

/// Qualitative label derived from a relationship value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationType {
    /// No strong feeling either way.
    #[default]
    Neutral,
    /// Value at or above [`RelationType::FRIEND_THRESHOLD`].
    Friend,
    /// Value at or above [`RelationType::ALLY_THRESHOLD`].
    Ally,
    /// Value at or below [`RelationType::RIVAL_THRESHOLD`].
    Rival,
    /// Value at or below [`RelationType::ENEMY_THRESHOLD`].
    Enemy,
}

impl RelationType {
    /// Friend threshold (inclusive).
    pub const FRIEND_THRESHOLD: f64 = 50.0;
    /// Ally threshold (inclusive).
    pub const ALLY_THRESHOLD: f64 = 20.0;
    /// Rival threshold (inclusive).
    pub const RIVAL_THRESHOLD: f64 = -20.0;
    /// Enemy threshold (inclusive).
    pub const ENEMY_THRESHOLD: f64 = -50.0;

    /// Classify a value. Thresholds are checked in priority order.
    #[must_use]
    pub fn classify(value: f64) -> Self {
        match value {
            v if v >= Self::FRIEND_THRESHOLD => Self::Friend,
            v if v >= Self::ALLY_THRESHOLD => Self::Ally,
            v if v <= Self::ENEMY_THRESHOLD => Self::Enemy,
            v if v <= Self::RIVAL_THRESHOLD => Self::Rival,
            _ => Self::Neutral,
        }
    }

    /// Position on the hostile → friendly axis (enemy = 0, friend = 4).
    #[must_use]
    pub fn rank(self) -> u8 {
        match self {
            Self::Enemy => 0,
            Self::Rival => 1,
            Self::Neutral => 2,
            Self::Ally => 3,
            Self::Friend => 4,
        }
    }

    fn from_rank(rank: u8) -> Self {
        match rank {
            0 => Self::Enemy,
            1 => Self::Rival,
            2 => Self::Neutral,
            3 => Self::Ally,
            _ => Self::Friend,
        }
    }

    /// The label a relationship currently labelled `self` takes at `value`.
    ///
    /// With `hysteresis == 0` this is exactly [`classify`](Self::classify).
    /// Otherwise a label only moves past a threshold once the value clears
    /// it by `hysteresis`, so a value wobbling on a boundary does not flip
    /// the label every update.
    #[must_use]
    pub fn transition(self, value: f64, hysteresis: f64) -> Self {
        let candidate = Self::classify(value);
        if candidate == self || hysteresis <= 0.0 {
            return candidate;
        }

        if candidate.rank() > self.rank() {
            let damped = Self::classify(value - hysteresis);
            Self::from_rank(damped.rank().max(self.rank()))
        } else {
            let damped = Self::classify(value + hysteresis);
            Self::from_rank(damped.rank().min(self.rank()))
        }
    }

    /// Whether a relationship at `value` can carry this label.
    ///
    /// The label must lie between the classifications of
    /// `value - hysteresis` and `value + hysteresis`; with no hysteresis it
    /// must equal [`classify`](Self::classify).
    #[must_use]
    pub fn is_reachable(self, value: f64, hysteresis: f64) -> bool {
        let h = hysteresis.max(0.0);
        let low = Self::classify(value - h).rank();
        let high = Self::classify(value + h).rank();
        (low..=high).contains(&self.rank())
    }

    /// Lower-case name, as persisted.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Neutral => "neutral",
            Self::Friend => "friend",
            Self::Ally => "ally",
            Self::Rival => "rival",
            Self::Enemy => "enemy",
        }
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical key for an unordered agent pair.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PairKey {
    a: AgentId,
    b: AgentId,
}

impl PairKey {
    /// Build the key for `x` and `y`, in either order.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Validation`] if both ids are the same agent.
    pub fn new(x: &AgentId, y: &AgentId) -> Result<Self> {
        if x == y {
            return Err(HearthError::Validation(format!(
                "an agent cannot have a relationship with itself ({x})"
            )));
        }
        let (a, b) = if x < y { (x, y) } else { (y, x) };
        Ok(Self {
            a: a.clone(),
            b: b.clone(),
        })
    }

    /// The lower id.
    #[must_use]
    pub fn first(&self) -> &AgentId {
        &self.a
    }

    /// The higher id.
    #[must_use]
    pub fn second(&self) -> &AgentId {
        &self.b
    }

    /// The partner of `agent` in this pair, if `agent` is in it.
    #[must_use]
    pub fn other(&self, agent: &AgentId) -> Option<&AgentId> {
        if &self.a == agent {
            Some(&self.b)
        } else if &self.b == agent {
            Some(&self.a)
        } else {
            None
        }
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}<->{}", self.a, self.b)
    }
}

/// The quantified relationship between two agents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    /// Lower agent id of the pair.
    pub agent_a: AgentId,
    /// Higher agent id of the pair.
    pub agent_b: AgentId,
    /// Current value, `-100.0` to `100.0`.
    pub value: f64,
    /// Qualitative label.
    #[serde(default)]
    pub relation_type: RelationType,
    /// Number of updates applied.
    #[serde(default)]
    pub interactions: u64,
    /// Updates with a positive delta.
    #[serde(default)]
    pub positive_interactions: u64,
    /// Updates with a negative delta.
    #[serde(default)]
    pub negative_interactions: u64,
    /// When the pair first interacted.
    pub first_met: DateTime<Utc>,
    /// When the pair last interacted.
    #[serde(default)]
    pub last_interaction: Option<DateTime<Utc>>,
    /// Memory records both agents share.
    #[serde(default)]
    pub shared_memories: Vec<RecordId>,
}

impl Relationship {
    /// A fresh neutral relationship for `key`, first met at `now`.
    #[must_use]
    pub fn new(key: &PairKey, now: DateTime<Utc>) -> Self {
        Self {
            agent_a: key.first().clone(),
            agent_b: key.second().clone(),
            value: 0.0,
            relation_type: RelationType::Neutral,
            interactions: 0,
            positive_interactions: 0,
            negative_interactions: 0,
            first_met: now,
            last_interaction: None,
            shared_memories: Vec::new(),
        }
    }

    /// The canonical key of this relationship.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Validation`] if both sides are the same agent.
    pub fn key(&self) -> Result<PairKey> {
        PairKey::new(&self.agent_a, &self.agent_b)
    }

    /// Apply one interaction. Returns the old label if the label changed.
    pub fn apply(&mut self, delta: f64, now: DateTime<Utc>, hysteresis: f64) -> Option<RelationType> {
        self.value = (self.value + delta).clamp(MIN_VALUE, MAX_VALUE);
        self.interactions += 1;
        if delta > 0.0 {
            self.positive_interactions += 1;
        } else if delta < 0.0 {
            self.negative_interactions += 1;
        }
        self.last_interaction = Some(now);

        let previous = self.relation_type;
        self.relation_type = previous.transition(self.value, hysteresis);
        (self.relation_type != previous).then_some(previous)
    }
}

/// Result of one relationship update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelationshipUpdate {
    /// The pair had never interacted before this update.
    pub created: bool,
    /// `(from, to)` if the label changed.
    pub change: Option<(RelationType, RelationType)>,
    /// The value after the update.
    pub value: f64,
}

/// All pairwise relationships.
#[derive(Debug, Clone, Default)]
pub struct RelationshipStore {
    relationships: BTreeMap<PairKey, Relationship>,
    hysteresis: f64,
}

impl RelationshipStore {
    /// An empty store.
    #[must_use]
    pub fn new(hysteresis: f64) -> Self {
        Self {
            relationships: BTreeMap::new(),
            hysteresis: hysteresis.max(0.0),
        }
    }

    /// Rebuild a store from persisted relationships.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Validation`] for self-pairs, pairs not stored
    /// in canonical order, out-of-range values, labels the value cannot
    /// carry, inconsistent interaction counters, or duplicate pairs.
    pub fn from_relationships(relationships: Vec<Relationship>, hysteresis: f64) -> Result<Self> {
        let mut store = Self::new(hysteresis);
        for relationship in relationships {
            let key = relationship.key()?;
            if key.first() != &relationship.agent_a {
                return Err(HearthError::Validation(format!(
                    "relationship {key} is not stored in canonical order"
                )));
            }
            if !relationship.value.is_finite()
                || !(MIN_VALUE..=MAX_VALUE).contains(&relationship.value)
            {
                return Err(HearthError::Validation(format!(
                    "relationship {key} has value {} outside [-100, 100]",
                    relationship.value
                )));
            }
            if !relationship
                .relation_type
                .is_reachable(relationship.value, store.hysteresis)
            {
                return Err(HearthError::Validation(format!(
                    "relationship {key} is labelled {} at value {}",
                    relationship.relation_type, relationship.value
                )));
            }
            let signed = relationship
                .positive_interactions
                .saturating_add(relationship.negative_interactions);
            if signed > relationship.interactions {
                return Err(HearthError::Validation(format!(
                    "relationship {key} has {signed} signed interactions out of {}",
                    relationship.interactions
                )));
            }
            if store.relationships.insert(key.clone(), relationship).is_some() {
                return Err(HearthError::Validation(format!("duplicate relationship {key}")));
            }
        }
        Ok(store)
    }

    /// The relationship between `x` and `y`, if they have met.
    #[must_use]
    pub fn get(&self, x: &AgentId, y: &AgentId) -> Option<&Relationship> {
        let key = PairKey::new(x, y).ok()?;
        self.relationships.get(&key)
    }

    /// The relationship between `x` and `y`, creating a neutral one if
    /// needed. The flag is `true` if it was created.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Validation`] if `x == y`.
    pub fn get_or_create(
        &mut self,
        x: &AgentId,
        y: &AgentId,
        now: DateTime<Utc>,
    ) -> Result<(&mut Relationship, bool)> {
        let key = PairKey::new(x, y)?;
        let mut created = false;
        let relationship = self.relationships.entry(key).or_insert_with_key(|key| {
            created = true;
            Relationship::new(key, now)
        });
        Ok((relationship, created))
    }

    /// Apply `delta` to the pair's value, creating the relationship if needed.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Validation`] if `x == y` or `delta` is not finite.
    pub fn update(
        &mut self,
        x: &AgentId,
        y: &AgentId,
        delta: f64,
        now: DateTime<Utc>,
    ) -> Result<RelationshipUpdate> {
        if !delta.is_finite() {
            return Err(HearthError::Validation(format!(
                "relationship delta must be finite, got {delta}"
            )));
        }
        let hysteresis = self.hysteresis;
        let (relationship, created) = self.get_or_create(x, y, now)?;
        let change = relationship
            .apply(delta, now, hysteresis)
            .map(|from| (from, relationship.relation_type));
        Ok(RelationshipUpdate {
            created,
            change,
            value: relationship.value,
        })
    }

    /// Partners of `agent` whose relationship label satisfies `keep`, in
    /// pair-key order.
    #[must_use]
    pub fn partners_where(
        &self,
        agent: &AgentId,
        keep: impl Fn(RelationType) -> bool,
    ) -> Vec<AgentId> {
        self.relationships
            .iter()
            .filter(|(_, r)| keep(r.relation_type))
            .filter_map(|(key, _)| key.other(agent).cloned())
            .collect()
    }

    /// Every relationship, in pair-key order.
    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.relationships.values()
    }

    /// Number of relationships.
    #[must_use]
    pub fn len(&self) -> usize {
        self.relationships.len()
    }

    /// Whether no pair has interacted yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.relationships.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).single().expect("valid date")
    }

    fn ids() -> (AgentId, AgentId) {
        (AgentId::from("Alice"), AgentId::from("Bob"))
    }

    #[test]
    fn threshold_boundaries_are_inclusive() {
        assert_eq!(RelationType::classify(50.0), RelationType::Friend);
        assert_eq!(RelationType::classify(49.9), RelationType::Ally);
        assert_eq!(RelationType::classify(20.0), RelationType::Ally);
        assert_eq!(RelationType::classify(19.9), RelationType::Neutral);
        assert_eq!(RelationType::classify(0.0), RelationType::Neutral);
        assert_eq!(RelationType::classify(-19.9), RelationType::Neutral);
        assert_eq!(RelationType::classify(-20.0), RelationType::Rival);
        assert_eq!(RelationType::classify(-49.9), RelationType::Rival);
        assert_eq!(RelationType::classify(-50.0), RelationType::Enemy);
    }

    #[test]
    fn pair_key_is_order_independent() {
        let (alice, bob) = ids();
        let ab = PairKey::new(&alice, &bob).expect("key");
        let ba = PairKey::new(&bob, &alice).expect("key");
        assert_eq!(ab, ba);
        assert_eq!(ab.first(), &alice);
        assert_eq!(ab.other(&alice), Some(&bob));
        assert_eq!(ab.other(&AgentId::from("Carol")), None);
    }

    #[test]
    fn self_pair_is_rejected() {
        let (alice, _) = ids();
        assert!(matches!(PairKey::new(&alice, &alice), Err(HearthError::Validation(_))));
    }

    #[test]
    fn update_clamps_and_counts() {
        let (alice, bob) = ids();
        let mut store = RelationshipStore::new(0.0);

        let first = store.update(&alice, &bob, 100.0, now()).expect("update");
        assert!(first.created);
        assert_eq!(first.change, Some((RelationType::Neutral, RelationType::Friend)));

        let second = store.update(&bob, &alice, 40.0, now()).expect("update");
        assert!(!second.created);
        assert!(second.change.is_none());
        assert!((second.value - 100.0).abs() < f64::EPSILON);

        store.update(&alice, &bob, -250.0, now()).expect("update");
        store.update(&alice, &bob, 0.0, now()).expect("update");

        let rel = store.get(&bob, &alice).expect("exists");
        assert!((rel.value - MIN_VALUE).abs() < f64::EPSILON);
        assert_eq!(rel.relation_type, RelationType::Enemy);
        assert_eq!(rel.interactions, 4);
        assert_eq!(rel.positive_interactions, 2);
        assert_eq!(rel.negative_interactions, 1);
        assert_eq!(rel.last_interaction, Some(now()));
    }

    #[test]
    fn non_finite_delta_is_rejected() {
        let (alice, bob) = ids();
        let mut store = RelationshipStore::new(0.0);
        assert!(store.update(&alice, &bob, f64::NAN, now()).is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn without_hysteresis_labels_flip_on_the_boundary() {
        let (alice, bob) = ids();
        let mut store = RelationshipStore::new(0.0);
        store.update(&alice, &bob, 20.0, now()).expect("update");
        let down = store.update(&alice, &bob, -0.5, now()).expect("update");
        let up = store.update(&alice, &bob, 0.5, now()).expect("update");
        assert_eq!(down.change, Some((RelationType::Ally, RelationType::Neutral)));
        assert_eq!(up.change, Some((RelationType::Neutral, RelationType::Ally)));
    }

    #[test]
    fn hysteresis_damps_boundary_wobble() {
        let (alice, bob) = ids();
        let mut store = RelationshipStore::new(5.0);

        // 22 is past the ally threshold but not by the margin.
        let update = store.update(&alice, &bob, 22.0, now()).expect("update");
        assert!(update.change.is_none());

        let update = store.update(&alice, &bob, 3.0, now()).expect("update");
        assert_eq!(update.change, Some((RelationType::Neutral, RelationType::Ally)));

        // Dropping to 17 does not clear the margin below 20.
        let update = store.update(&alice, &bob, -8.0, now()).expect("update");
        assert!(update.change.is_none());
    }

    #[test]
    fn hysteresis_never_overshoots_the_plain_label() {
        // Far past a threshold the plain label wins; inside the margin the step is held back.
        assert_eq!(RelationType::Enemy.transition(60.0, 5.0), RelationType::Friend);
        assert_eq!(RelationType::Enemy.transition(52.0, 5.0), RelationType::Ally);
        assert_eq!(RelationType::Friend.transition(-60.0, 5.0), RelationType::Enemy);
    }

    #[test]
    fn persisted_relationships_are_validated() {
        let (alice, bob) = ids();
        let key = PairKey::new(&alice, &bob).expect("key");
        let good = Relationship::new(&key, now());

        let mut swapped = good.clone();
        std::mem::swap(&mut swapped.agent_a, &mut swapped.agent_b);
        assert!(RelationshipStore::from_relationships(vec![swapped], 0.0).is_err());

        let mut wild = good.clone();
        wild.value = 250.0;
        assert!(RelationshipStore::from_relationships(vec![wild], 0.0).is_err());

        assert!(RelationshipStore::from_relationships(vec![good.clone(), good.clone()], 0.0).is_err());
        assert_eq!(
            RelationshipStore::from_relationships(vec![good], 0.0).expect("valid").len(),
            1
        );
    }

    #[test]
    fn persisted_labels_must_match_their_values() {
        let (alice, bob) = ids();
        let key = PairKey::new(&alice, &bob).expect("key");

        let mut mislabelled = Relationship::new(&key, now());
        mislabelled.value = 80.0;
        mislabelled.relation_type = RelationType::Enemy;
        assert!(RelationshipStore::from_relationships(vec![mislabelled], 0.0).is_err());

        // Within the hysteresis band a lagging label is legitimate.
        let mut lagging = Relationship::new(&key, now());
        lagging.value = 52.0;
        lagging.relation_type = RelationType::Ally;
        assert!(RelationshipStore::from_relationships(vec![lagging.clone()], 0.0).is_err());
        assert!(RelationshipStore::from_relationships(vec![lagging.clone()], 5.0).is_ok());
        lagging.relation_type = RelationType::Rival;
        assert!(RelationshipStore::from_relationships(vec![lagging], 5.0).is_err());
    }

    #[test]
    fn persisted_counters_must_add_up() {
        let (alice, bob) = ids();
        let key = PairKey::new(&alice, &bob).expect("key");
        let mut rel = Relationship::new(&key, now());
        rel.interactions = 2;
        rel.positive_interactions = 2;
        rel.negative_interactions = 1;
        assert!(RelationshipStore::from_relationships(vec![rel.clone()], 0.0).is_err());

        rel.interactions = 3;
        assert!(RelationshipStore::from_relationships(vec![rel], 0.0).is_ok());
    }

    #[test]
    fn reachable_labels_form_a_band() {
        assert!(RelationType::Friend.is_reachable(80.0, 0.0));
        assert!(!RelationType::Ally.is_reachable(80.0, 0.0));
        assert!(RelationType::Neutral.is_reachable(-22.0, 5.0));
        assert!(RelationType::Rival.is_reachable(-22.0, 5.0));
        assert!(!RelationType::Enemy.is_reachable(-22.0, 5.0));
    }

    #[test]
    fn relation_type_serializes_lowercase() {
        let json = serde_json::to_string(&RelationType::Friend).expect("serialize");
        assert_eq!(json, "\"friend\"");
    }
}

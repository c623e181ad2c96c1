//! Memory Retrieval: relevance × recency × importance ranking.
//!
//! Based on the Stanford Generative Agents retrieval function. Every call is
//! a full O(n) scan of the agent's stream; scoring a record counts as
//! accessing it, so access bookkeeping is updated on every scored record,
//! not only on the ones returned.

pub mod scoring;

use std::time::Instant;

use tracing::debug;

use crate::config::RetrievalConfig;
use crate::error::{HearthError, Result};
use crate::memory::{MemoryRecord, RecordStore};
use crate::types::RetrievalScore;

use self::scoring::{LexicalOverlap, Query, RelevanceScorer};

/// Extra signal from the caller's current situation.
#[derive(Debug, Clone, Default)]
pub struct RetrievalContext {
    /// Terms merged into the query token set (e.g. the planned activity).
    pub extra_terms: Vec<String>,
}

impl RetrievalContext {
    /// Add a term to the context.
    #[must_use]
    pub fn with_term(mut self, term: impl Into<String>) -> Self {
        self.extra_terms.push(term.into());
        self
    }
}

/// A scored retrieval result.
#[derive(Debug, Clone)]
pub struct ScoredRecord {
    /// The retrieved record (access bookkeeping already applied).
    pub record: MemoryRecord,
    /// Combined score.
    pub score: RetrievalScore,
    /// Per-factor breakdown.
    pub breakdown: ScoreBreakdown,
}

/// Breakdown of a retrieval score into its factors.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreBreakdown {
    /// Relevance factor.
    pub relevance: f64,
    /// Recency factor.
    pub recency: f64,
    /// Importance factor.
    pub importance: f64,
}

impl ScoreBreakdown {
    /// Product of the three factors.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.relevance * self.recency * self.importance
    }
}

/// The retrieval engine that ranks an agent's records against a query.
pub struct RetrievalEngine {
    config: RetrievalConfig,
    scorer: Box<dyn RelevanceScorer>,
}

impl std::fmt::Debug for RetrievalEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrievalEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RetrievalEngine {
    /// Create an engine using lexical overlap for relevance.
    #[must_use]
    pub fn new(config: RetrievalConfig) -> Self {
        let scorer = LexicalOverlap {
            neutral: config.neutral_relevance,
        };
        Self {
            config,
            scorer: Box::new(scorer),
        }
    }

    /// Replace the relevance scorer.
    #[must_use]
    pub fn with_scorer(mut self, scorer: Box<dyn RelevanceScorer>) -> Self {
        self.scorer = scorer;
        self
    }

    /// The configured default `top_k`.
    #[must_use]
    pub fn default_top_k(&self) -> usize {
        self.config.top_k
    }

    /// Retrieve at most `top_k` records, highest score first.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Validation`] if `top_k` is zero.
    pub fn retrieve(
        &self,
        store: &mut RecordStore,
        query: &str,
        context: Option<&RetrievalContext>,
        top_k: usize,
    ) -> Result<Vec<MemoryRecord>> {
        Ok(self
            .retrieve_scored(store, query, context, top_k)?
            .into_iter()
            .map(|s| s.record)
            .collect())
    }

    /// Like [`retrieve`](Self::retrieve), keeping each record's score breakdown.
    ///
    /// Ties keep insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Validation`] if `top_k` is zero.
    pub fn retrieve_scored(
        &self,
        store: &mut RecordStore,
        query: &str,
        context: Option<&RetrievalContext>,
        top_k: usize,
    ) -> Result<Vec<ScoredRecord>> {
        if top_k == 0 {
            return Err(HearthError::Validation("top_k must be at least 1".into()));
        }
        if store.is_empty() {
            return Ok(Vec::new());
        }

        let start = Instant::now();
        let now = store.now();
        let query = Query::new(query, context.map_or(&[][..], |c| &c.extra_terms));

        let mut scored: Vec<(RetrievalScore, ScoreBreakdown, usize)> = store
            .records_mut()
            .iter_mut()
            .enumerate()
            .map(|(index, record)| {
                let breakdown = ScoreBreakdown {
                    relevance: self.scorer.relevance(&query, &record.content),
                    recency: scoring::recency_score(
                        record.hours_since_created(now),
                        self.config.half_life_hours,
                    ),
                    importance: record.importance,
                };
                record.touch(now);
                (RetrievalScore::new(breakdown.total()), breakdown, index)
            })
            .collect();

        // Stable sort: equal scores keep insertion order.
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored.truncate(top_k);

        let records = store.records();
        let results: Vec<ScoredRecord> = scored
            .into_iter()
            .map(|(score, breakdown, index)| ScoredRecord {
                record: records[index].clone(),
                score,
                breakdown,
            })
            .collect();

        debug!(
            agent = %store.agent(),
            scanned = records.len(),
            returned = results.len(),
            elapsed_us = start.elapsed().as_micros(),
            "Retrieved memories"
        );

        Ok(results)
    }
}

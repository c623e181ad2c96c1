//! Per-factor scoring functions for memory retrieval.
//!
//! Score = Relevance(q, m) × Recency(m) × Importance(m)
//!
//! Where:
//!   Relevance(q, m) = |tokens(q) ∩ tokens(m)| / |tokens(q) ∪ tokens(m)|   (Jaccard)
//!   Recency(m)      = exp(-ΔT_hours / H)
//!   Importance(m)   = stored importance (0–1)
//!
//! Relevance sits behind [`RelevanceScorer`] so a vector-similarity backend
//! can replace lexical overlap without touching call sites.

use std::collections::HashSet;

/// A prepared query: the raw text plus its token set.
#[derive(Debug, Clone, Default)]
pub struct Query {
    /// The query as given by the caller.
    pub text: String,
    /// Lower-cased, whitespace-split tokens of the query and any context terms.
    pub tokens: HashSet<String>,
}

impl Query {
    /// Tokenize `text` and merge in `extra_terms`.
    #[must_use]
    pub fn new(text: &str, extra_terms: &[String]) -> Self {
        let mut tokens = tokenize(text);
        for term in extra_terms {
            tokens.extend(tokenize(term));
        }
        Self {
            text: text.to_string(),
            tokens,
        }
    }
}

/// Scores how relevant a record's content is to a query, in `[0, 1]`.
pub trait RelevanceScorer: Send + Sync {
    /// Relevance of `content` to `query`.
    fn relevance(&self, query: &Query, content: &str) -> f64;
}

/// Token-set Jaccard overlap.
#[derive(Debug, Clone, Copy)]
pub struct LexicalOverlap {
    /// Score used when either side has no tokens.
    pub neutral: f64,
}

impl Default for LexicalOverlap {
    fn default() -> Self {
        Self { neutral: 0.5 }
    }
}

impl RelevanceScorer for LexicalOverlap {
    fn relevance(&self, query: &Query, content: &str) -> f64 {
        let content_tokens = tokenize(content);
        jaccard(&query.tokens, &content_tokens).unwrap_or(self.neutral)
    }
}

/// Lower-case and split on whitespace.
#[must_use]
pub fn tokenize(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Jaccard similarity, or `None` if either set is empty.
#[must_use]
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> Option<f64> {
    if a.is_empty() || b.is_empty() {
        return None;
    }
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    Some(intersection as f64 / union as f64)
}

/// Recency score: `exp(-hours / half_life_hours)`.
///
/// Negative elapsed time (clock skew) counts as zero. The result lies in
/// `[f64::MIN_POSITIVE, 1.0]`: very old records still rank by importance
/// and relevance rather than collapsing to an exact zero.
#[must_use]
pub fn recency_score(hours_elapsed: f64, half_life_hours: f64) -> f64 {
    let hours = hours_elapsed.max(0.0);
    let half_life = if half_life_hours > 0.0 { half_life_hours } else { 24.0 };
    (-hours / half_life).exp().clamp(f64::MIN_POSITIVE, 1.0)
}

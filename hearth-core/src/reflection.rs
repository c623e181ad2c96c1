//! Reflection Trigger: decides when unreflected records become a reflection.
//!
//! The trigger keeps a watermark: the number of records already handed to a
//! summarizer. Two policies decide when the suffix past the watermark fires:
//!
//! - **Count**: at least `reflection_threshold` records have accumulated.
//! - **Window**: at least `window_min_records` of the unreflected
//!   observations fall inside the last `window_hours`.
//!
//! Firing always advances the watermark to the store length, so one slice is
//! never handed out twice and an empty slice never fires.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tracing::info;

use crate::clock::window_start;
use crate::config::{MemoryConfig, ReflectionPolicy};
use crate::memory::{RecordKind, RecordStore};
use crate::types::RecordId;

/// Turns a batch of record contents into reflection text.
///
/// An empty string means "nothing worth reflecting on"; no reflection is
/// stored in that case.
pub trait Summarizer: Send + Sync {
    /// Summarize `contents`, oldest first.
    fn summarize(&self, contents: &[String]) -> String;
}

/// A slice of records handed to a summarizer.
#[derive(Debug, Clone, PartialEq)]
pub struct ReflectionBatch {
    /// Ids of the records in the slice, in insertion order.
    pub ids: Vec<RecordId>,
    /// Their contents, in the same order.
    pub contents: Vec<String>,
    /// When the trigger fired.
    pub fired_at: DateTime<Utc>,
}

impl ReflectionBatch {
    /// Number of records in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the batch is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Watermark-based reflection trigger.
#[derive(Debug, Clone)]
pub struct ReflectionTrigger {
    policy: ReflectionPolicy,
    threshold: usize,
    window: Duration,
    window_min_records: usize,
    watermark: usize,
}

impl ReflectionTrigger {
    /// Build a trigger from the memory configuration, starting at watermark 0.
    #[must_use]
    pub fn new(config: &MemoryConfig) -> Self {
        let window_ms = (config.window_hours.max(0.0) * 3_600_000.0) as i64;
        Self {
            policy: config.reflection_policy,
            threshold: config.reflection_threshold.max(1),
            window: Duration::try_milliseconds(window_ms).unwrap_or(Duration::MAX),
            window_min_records: config.window_min_records.max(1),
            watermark: 0,
        }
    }

    /// Start from a given watermark (e.g. the record count loaded from disk).
    #[must_use]
    pub fn with_watermark(mut self, watermark: usize) -> Self {
        self.watermark = watermark;
        self
    }

    /// Records already handed to a summarizer.
    #[must_use]
    pub fn watermark(&self) -> usize {
        self.watermark
    }

    /// Check the store and, if the policy is satisfied, take the next slice.
    ///
    /// Returns `None` when nothing is due.
    pub fn poll(&mut self, store: &RecordStore) -> Option<ReflectionBatch> {
        let records = store.records();
        // A store only grows, but guard against a watermark set past its end.
        let start = self.watermark.min(records.len());
        let pending = &records[start..];
        if pending.is_empty() {
            return None;
        }

        let now = store.now();
        let slice: Vec<_> = match self.policy {
            ReflectionPolicy::Count => {
                if pending.len() < self.threshold {
                    return None;
                }
                pending.iter().collect()
            }
            ReflectionPolicy::Window => {
                let cutoff = window_start(now, self.window);
                let in_window: Vec<_> = pending
                    .iter()
                    .filter(|r| r.kind == RecordKind::Observation && r.timestamp > cutoff)
                    .collect();
                if in_window.len() < self.window_min_records {
                    return None;
                }
                in_window
            }
        };

        self.watermark = records.len();

        info!(
            agent = %store.agent(),
            records = slice.len(),
            watermark = self.watermark,
            "Reflection triggered"
        );

        Some(ReflectionBatch {
            ids: slice.iter().map(|r| r.id).collect(),
            contents: slice.iter().map(|r| r.content.clone()).collect(),
            fired_at: now,
        })
    }
}

/// Rule-based summarizer: names the most frequent words in the batch.
///
/// Batches smaller than `min_records` produce no reflection.
#[derive(Debug, Clone, Copy)]
pub struct ThemeSummarizer {
    /// Smallest batch worth reflecting on.
    pub min_records: usize,
    /// How many themes to name.
    pub max_themes: usize,
}

impl Default for ThemeSummarizer {
    fn default() -> Self {
        Self {
            min_records: 10,
            max_themes: 3,
        }
    }
}

impl ThemeSummarizer {
    /// The most frequent words longer than two characters, most frequent
    /// first. Ties keep first-seen order.
    #[must_use]
    pub fn themes(&self, contents: &[String]) -> Vec<String> {
        let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
        let mut seen = 0_usize;
        for content in contents {
            for word in content.to_lowercase().split_whitespace() {
                if word.chars().count() <= 2 {
                    continue;
                }
                let entry = counts.entry(word.to_string()).or_insert_with(|| {
                    seen += 1;
                    (0, seen)
                });
                entry.0 += 1;
            }
        }

        let mut ranked: Vec<(String, (usize, usize))> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.0.cmp(&a.1.0).then(a.1.1.cmp(&b.1.1)));
        ranked
            .into_iter()
            .take(self.max_themes)
            .map(|(word, _)| word)
            .collect()
    }
}

impl Summarizer for ThemeSummarizer {
    fn summarize(&self, contents: &[String]) -> String {
        if contents.len() < self.min_records {
            return String::new();
        }
        let themes = self.themes(contents);
        if themes.is_empty() {
            return String::new();
        }
        format!("Lately I have mostly been doing: {}.", themes.join(", "))
    }
}

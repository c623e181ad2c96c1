//! Planning Surface: day plans with an hourly schedule.
//!
//! A [`Planner`] produces raw plan text (JSON, possibly wrapped in prose).
//! [`DayPlan::parse`] accepts two schedule shapes:
//!
//! ```json
//! { "overview": "...", "goals": ["..."], "hourly_schedule": [{ "hour": 7, "activity": "..." }] }
//! { "overview": "...", "goals": ["..."], "schedule": [{ "time": "07:00", "activity": "..." }] }
//! ```
//!
//! Anything unusable degrades to [`DayPlan::fallback`]. An adopted plan is
//! also written to the memory stream as a daily plan record, so it takes part
//! in retrieval like any other memory.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::PlanningConfig;
use crate::memory::{PlanScope, RecordStore};
use crate::types::{Location, RecordId};

/// Why a plan could not be produced or parsed.
#[derive(Error, Debug)]
pub enum PlanError {
    /// The response contained no JSON object.
    #[error("no JSON object in plan response")]
    NoJson,

    /// The JSON object did not decode as a plan.
    #[error("malformed plan: {0}")]
    Malformed(String),

    /// The plan has neither an overview nor a schedule.
    #[error("plan is empty")]
    Empty,

    /// The planner backend could not produce a response.
    #[error("planner unavailable: {0}")]
    Unavailable(String),
}

/// One slot of the hourly schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    /// Hour of day, 0–23.
    pub hour: u8,
    /// What the agent intends to do.
    pub activity: String,
}

impl ScheduleEntry {
    /// Create a schedule entry.
    #[must_use]
    pub fn new(hour: u8, activity: impl Into<String>) -> Self {
        Self {
            hour,
            activity: activity.into(),
        }
    }
}

/// A day plan: overview, goals and an hour → activity schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayPlan {
    /// Calendar date the plan is for (`YYYY-MM-DD`), if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// One-line summary of the day.
    pub overview: String,
    /// Goals for the day.
    #[serde(default)]
    pub goals: Vec<String>,
    /// Hourly schedule, in the order given.
    #[serde(rename = "hourly_schedule", default)]
    pub schedule: Vec<ScheduleEntry>,
}

// Lenient wire shape accepted from planners.
#[derive(Deserialize)]
struct RawPlan {
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    overview: Option<String>,
    #[serde(default)]
    goals: Vec<serde_json::Value>,
    #[serde(default)]
    hourly_schedule: Vec<RawEntry>,
    #[serde(default)]
    schedule: Vec<RawEntry>,
}

#[derive(Deserialize)]
struct RawEntry {
    #[serde(default)]
    hour: Option<serde_json::Value>,
    #[serde(default)]
    time: Option<String>,
    #[serde(default)]
    activity: Option<String>,
}

impl RawEntry {
    fn into_entry(self) -> Option<ScheduleEntry> {
        let hour = self
            .hour
            .as_ref()
            .and_then(json_hour)
            .or_else(|| self.time.as_deref().and_then(parse_clock_hour))?;
        if hour > 23 {
            return None;
        }
        let activity = self.activity?.trim().to_string();
        if activity.is_empty() {
            return None;
        }
        Some(ScheduleEntry { hour, activity })
    }
}

/// An hour given as a JSON integer or as a string such as `"7"` or `"07:00"`.
fn json_hour(value: &serde_json::Value) -> Option<u8> {
    match value {
        serde_json::Value::Number(n) => n.as_u64().and_then(|h| u8::try_from(h).ok()),
        serde_json::Value::String(s) => parse_clock_hour(s),
        _ => None,
    }
}

/// Hour part of an `"HH:MM"` (or bare `"HH"`) string.
fn parse_clock_hour(time: &str) -> Option<u8> {
    time.trim().split(':').next()?.trim().parse().ok()
}

impl DayPlan {
    /// The plan used when no usable plan could be produced.
    #[must_use]
    pub fn fallback() -> Self {
        Self {
            date: None,
            overview: "Explore the world and gather resources".to_string(),
            goals: vec![
                "Gather resources".to_string(),
                "Explore the surroundings".to_string(),
            ],
            schedule: Vec::new(),
        }
    }

    /// Parse planner output.
    ///
    /// The JSON object between the first `{` and the last `}` is decoded,
    /// so prose around it is ignored. Schedule entries with an unreadable or
    /// out-of-range hour, or no activity, are skipped.
    ///
    /// # Errors
    ///
    /// Returns a [`PlanError`] if no object is present, it does not decode,
    /// or it carries neither an overview nor any schedule entry.
    pub fn parse(raw: &str) -> Result<Self, PlanError> {
        let start = raw.find('{').ok_or(PlanError::NoJson)?;
        let end = raw.rfind('}').ok_or(PlanError::NoJson)?;
        if end < start {
            return Err(PlanError::NoJson);
        }

        let parsed: RawPlan = serde_json::from_str(&raw[start..=end])
            .map_err(|e| PlanError::Malformed(e.to_string()))?;

        let overview = parsed.overview.unwrap_or_default().trim().to_string();
        let goals = parsed
            .goals
            .into_iter()
            .filter_map(|g| g.as_str().map(str::to_string))
            .collect();
        let entries = if parsed.hourly_schedule.is_empty() {
            parsed.schedule
        } else {
            parsed.hourly_schedule
        };
        let schedule: Vec<ScheduleEntry> =
            entries.into_iter().filter_map(RawEntry::into_entry).collect();

        if overview.is_empty() && schedule.is_empty() {
            return Err(PlanError::Empty);
        }

        Ok(Self {
            date: parsed.date,
            overview,
            goals,
            schedule,
        })
    }

    /// Parse planner output, degrading to [`DayPlan::fallback`] on failure.
    #[must_use]
    pub fn from_response(raw: &str) -> Self {
        match Self::parse(raw) {
            Ok(plan) => plan,
            Err(e) => {
                warn!(error = %e, "Unusable plan response, using fallback plan");
                Self::fallback()
            }
        }
    }

    /// The first scheduled activity for `hour`, if any.
    #[must_use]
    pub fn activity_at(&self, hour: u32) -> Option<&str> {
        self.schedule
            .iter()
            .find(|e| u32::from(e.hour) == hour)
            .map(|e| e.activity.as_str())
    }
}

/// Snapshot of an agent's condition, as given to a planner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    /// Energy, 0–100.
    pub energy: f64,
    /// Hunger, 0–100.
    pub hunger: f64,
    /// Current position, if known.
    pub location: Option<Location>,
    /// Item name → count.
    pub inventory: BTreeMap<String, u32>,
}

impl Default for AgentState {
    fn default() -> Self {
        Self {
            energy: 100.0,
            hunger: 0.0,
            location: None,
            inventory: BTreeMap::new(),
        }
    }
}

/// Produces raw day-plan text from an agent's state and recent memories.
pub trait Planner: Send + Sync {
    /// Produce a plan response for `state`, given `recent` memory contents
    /// (oldest first).
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::Unavailable`] if the backend cannot respond.
    fn plan(&self, state: &AgentState, recent: &[String]) -> Result<String, PlanError>;
}

/// Rule-based planner producing a fixed gatherer's routine.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoutinePlanner;

impl RoutinePlanner {
    /// The routine as a plan.
    #[must_use]
    pub fn routine() -> DayPlan {
        DayPlan {
            date: None,
            overview: "Explore the world, gather resources and meet other agents".to_string(),
            goals: vec![
                "Gather basic resources (wood, stone)".to_string(),
                "Explore the surroundings".to_string(),
                "Build a first shelter".to_string(),
            ],
            schedule: vec![
                ScheduleEntry::new(6, "wake up and check the surroundings"),
                ScheduleEntry::new(7, "gather wood"),
                ScheduleEntry::new(8, "gather stone"),
                ScheduleEntry::new(9, "explore"),
                ScheduleEntry::new(12, "rest and eat"),
                ScheduleEntry::new(13, "keep exploring"),
                ScheduleEntry::new(18, "return to base"),
                ScheduleEntry::new(20, "sort resources"),
                ScheduleEntry::new(22, "rest"),
            ],
        }
    }
}

impl Planner for RoutinePlanner {
    fn plan(&self, _state: &AgentState, _recent: &[String]) -> Result<String, PlanError> {
        serde_json::to_string(&Self::routine()).map_err(|e| PlanError::Malformed(e.to_string()))
    }
}

/// Holds the adopted day plan and answers "what now?".
#[derive(Debug, Clone)]
pub struct PlanningSurface {
    config: PlanningConfig,
    plan_importance: f64,
    current: Option<DayPlan>,
}

impl PlanningSurface {
    /// Create a surface with no adopted plan.
    #[must_use]
    pub fn new(config: PlanningConfig, plan_importance: f64) -> Self {
        Self {
            config,
            plan_importance,
            current: None,
        }
    }

    /// The adopted plan, if any.
    #[must_use]
    pub fn current_plan(&self) -> Option<&DayPlan> {
        self.current.as_ref()
    }

    /// Hour of day at `now`, shifted by the configured UTC offset.
    #[must_use]
    pub fn local_hour(&self, now: DateTime<Utc>) -> u32 {
        (now + Duration::hours(i64::from(self.config.utc_offset_hours))).hour()
    }

    /// The activity `plan` schedules for the current hour, or the fallback
    /// activity.
    #[must_use]
    pub fn get_current_hour_activity<'a>(&'a self, plan: &'a DayPlan, now: DateTime<Utc>) -> &'a str {
        plan.activity_at(self.local_hour(now))
            .unwrap_or(self.config.fallback_activity.as_str())
    }

    /// The adopted plan's activity for the current hour, or the fallback
    /// activity if no plan is adopted.
    #[must_use]
    pub fn current_activity(&self, now: DateTime<Utc>) -> &str {
        match &self.current {
            Some(plan) => self.get_current_hour_activity(plan, now),
            None => self.config.fallback_activity.as_str(),
        }
    }

    /// Adopt `plan` and record it in `store` as a daily plan.
    pub fn adopt_plan(&mut self, store: &mut RecordStore, mut plan: DayPlan) -> RecordId {
        let now = store.now();
        if plan.date.is_none() {
            let local = now + Duration::hours(i64::from(self.config.utc_offset_hours));
            plan.date = Some(local.format("%Y-%m-%d").to_string());
        }
        let id = store.add_plan(
            format!("Today's plan: {}", plan.overview),
            PlanScope::Daily,
            self.plan_importance,
        );
        debug!(
            agent = %store.agent(),
            entries = plan.schedule.len(),
            goals = plan.goals.len(),
            "Adopted day plan"
        );
        self.current = Some(plan);
        id
    }

    /// Ask `planner` for a plan based on the last day's observations and
    /// adopt it. Planner failures degrade to [`DayPlan::fallback`].
    pub fn generate_daily_plan(
        &mut self,
        store: &mut RecordStore,
        planner: &dyn Planner,
        state: &AgentState,
    ) -> RecordId {
        let recent: Vec<String> = store
            .get_recent_observations(Duration::hours(24))
            .into_iter()
            .map(|r| r.content.clone())
            .collect();

        let plan = match planner.plan(state, &recent) {
            Ok(raw) => DayPlan::from_response(&raw),
            Err(e) => {
                warn!(agent = %store.agent(), error = %e, "Planner failed, using fallback plan");
                DayPlan::fallback()
            }
        };
        self.adopt_plan(store, plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::memory::RecordKind;
    use crate::types::AgentId;
    use chrono::TimeZone;
    use std::sync::Arc;

    fn at_hour(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, hour, 30, 0).single().expect("valid date")
    }

    struct Broken;

    impl Planner for Broken {
        fn plan(&self, _: &AgentState, _: &[String]) -> Result<String, PlanError> {
            Err(PlanError::Unavailable("offline".into()))
        }
    }

    #[test]
    fn parses_hourly_schedule() {
        let plan = DayPlan::parse(
            r#"{"overview":"mine","goals":["iron"],"hourly_schedule":[{"hour":7,"activity":"dig"}]}"#,
        )
        .expect("parse");
        assert_eq!(plan.overview, "mine");
        assert_eq!(plan.goals, vec!["iron"]);
        assert_eq!(plan.schedule, vec![ScheduleEntry::new(7, "dig")]);
    }

    #[test]
    fn parses_clock_time_schedule_inside_prose() {
        let raw = r#"Sure! Here is my plan:
        {"overview": "explore", "goals": ["map the valley", 3],
         "schedule": [{"time": "06:00", "activity": "wake"},
                      {"time": "25:00", "activity": "impossible"},
                      {"time": "soon", "activity": "vague"},
                      {"time": "14:30", "activity": "explore"}]}
        Good luck!"#;
        let plan = DayPlan::parse(raw).expect("parse");
        assert_eq!(plan.goals, vec!["map the valley"]);
        assert_eq!(
            plan.schedule,
            vec![ScheduleEntry::new(6, "wake"), ScheduleEntry::new(14, "explore")]
        );
    }

    #[test]
    fn string_hours_and_time_fallback_are_accepted() {
        let plan = DayPlan::parse(
            r#"{"overview": "Fish", "hourly_schedule": [
                {"hour": "7", "activity": "dig bait"},
                {"hour": "soon", "time": "09:30", "activity": "cast lines"},
                {"hour": null, "time": "12", "activity": "eat lunch"},
                {"hour": "noonish", "activity": "nap"}
            ]}"#,
        )
        .expect("parse");

        let hours: Vec<_> = plan.schedule.iter().map(|e| (e.hour, e.activity.as_str())).collect();
        assert_eq!(hours, vec![(7, "dig bait"), (9, "cast lines"), (12, "eat lunch")]);
    }

    #[test]
    fn garbage_falls_back() {
        assert!(matches!(DayPlan::parse("no json here"), Err(PlanError::NoJson)));
        assert!(matches!(DayPlan::parse("{ broken"), Err(PlanError::NoJson)));
        assert!(matches!(DayPlan::parse("{\"x\": }"), Err(PlanError::Malformed(_))));
        assert!(matches!(DayPlan::parse("{}"), Err(PlanError::Empty)));
        assert_eq!(DayPlan::from_response("nonsense"), DayPlan::fallback());
    }

    #[test]
    fn routine_round_trips_through_parse() {
        let raw = RoutinePlanner.plan(&AgentState::default(), &[]).expect("plan");
        assert_eq!(DayPlan::parse(&raw).expect("parse"), RoutinePlanner::routine());
    }

    #[test]
    fn current_hour_lookup_uses_first_match_and_fallback() {
        let surface = PlanningSurface::new(PlanningConfig::default(), 0.8);
        let mut plan = RoutinePlanner::routine();
        plan.schedule.push(ScheduleEntry::new(7, "duplicate slot"));

        assert_eq!(surface.get_current_hour_activity(&plan, at_hour(7)), "gather wood");
        assert_eq!(surface.get_current_hour_activity(&plan, at_hour(10)), "free exploration");
        assert_eq!(surface.current_activity(at_hour(7)), "free exploration");
    }

    #[test]
    fn utc_offset_shifts_lookup_hour() {
        let config = PlanningConfig {
            utc_offset_hours: 8,
            ..PlanningConfig::default()
        };
        let surface = PlanningSurface::new(config, 0.8);
        let plan = RoutinePlanner::routine();
        // 23:30 UTC is 07:30 at UTC+8.
        assert_eq!(surface.get_current_hour_activity(&plan, at_hour(23)), "gather wood");
    }

    #[test]
    fn adopting_a_plan_stores_a_daily_record() {
        let clock = ManualClock::new(at_hour(6));
        let mut store = RecordStore::in_memory(AgentId::from("Alice"), Arc::new(clock));
        let mut surface = PlanningSurface::new(PlanningConfig::default(), 0.8);

        let id = surface.generate_daily_plan(&mut store, &RoutinePlanner, &AgentState::default());

        let record = store.get(id).expect("stored");
        assert_eq!(record.kind, RecordKind::Plan);
        assert_eq!(record.source, "planning/daily");
        assert!(record.content.starts_with("Today's plan: "));
        assert!((record.importance - 0.8).abs() < f64::EPSILON);
        assert_eq!(surface.current_plan().and_then(|p| p.date.clone()), Some("2024-05-01".into()));
        assert_eq!(surface.current_activity(at_hour(6)), "wake up and check the surroundings");
    }

    #[test]
    fn planner_failure_adopts_fallback() {
        let clock = ManualClock::new(at_hour(6));
        let mut store = RecordStore::in_memory(AgentId::from("Alice"), Arc::new(clock));
        let mut surface = PlanningSurface::new(PlanningConfig::default(), 0.8);

        surface.generate_daily_plan(&mut store, &Broken, &AgentState::default());

        let plan = surface.current_plan().expect("adopted");
        assert_eq!(plan.overview, DayPlan::fallback().overview);
        assert_eq!(
            store.get_plans()[0].content,
            "Today's plan: Explore the world and gather resources"
        );
    }
}

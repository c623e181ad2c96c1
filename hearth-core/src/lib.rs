//! # Hearth Core Library
//!
//! The cognitive and social substrate shared by every autonomous agent in a
//! simulation.
//!
//! Each agent owns a [`MemoryStream`]: a chronological log of
//! [`MemoryRecord`]s that supports
//!
//! - **Retrieval** ranked by `relevance × recency × importance`
//!   (Park et al., "Generative Agents", 2023)
//! - **Reflection**: distilling a batch of raw observations into a
//!   higher-level memory
//! - **Planning**: day plans with an hourly schedule, stored as memories so
//!   they take part in retrieval
//!
//! The population shares one [`SocialNetwork`]: pairwise relationships with
//! a five-state qualitative label, named factions, and a reputation ledger.
//!
//! ## Driving model
//!
//! Nothing in this crate spawns threads or blocks outside explicit
//! save/load. An external per-agent tick calls into the memory stream and,
//! when agents meet, into the social network. When several ticks may run at
//! once, the social network must be shared through
//! [`social::SharedSocialNetwork`].

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod clock;
pub mod config;
pub mod error;
pub mod memory;
pub mod persistence;
pub mod planning;
pub mod reflection;
pub mod retrieval;
pub mod social;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::HearthConfig;
pub use error::{HearthError, Result};
pub use memory::{MemoryRecord, MemoryStream, PlanScope, RecordKind, RecordStore, ReflectionOutcome};
pub use planning::{AgentState, DayPlan, Planner};
pub use reflection::{Summarizer, ThemeSummarizer};
pub use retrieval::RetrievalContext;
pub use social::{RelationType, Relationship, SharedSocialNetwork, SocialNetwork};
pub use types::*;

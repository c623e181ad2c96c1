//! # Hearth LLM
//!
//! Language-model collaborators for the Hearth memory stream.
//!
//! ```text
//! ┌─────────────────────┐     ┌──────────────┐     ┌────────────────┐
//! │ MemoryStream        │────▶│ LlmCognition │────▶│ LlmClient      │
//! │ (deferred batches)  │◀────│ reflect/plan │◀────│ Ollama/OpenAI  │
//! └─────────────────────┘     └──────────────┘     └────────────────┘
//!                                    │ on error
//!                                    ▼
//!                         ThemeSummarizer / DayPlan::fallback
//! ```
//!
//! Every call is bounded by a timeout and a retry budget. When the backend
//! is missing or misbehaves, the rule-based path in `hearth-core` answers
//! instead, so an agent always ends up with a reflection and a plan.

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod cognition;
pub mod error;
pub mod prompt;
pub mod types;

pub use client::{LlmClient, LlmProvider};
pub use cognition::LlmCognition;
pub use error::LlmError;
pub use types::{LlmRequest, LlmResponse};

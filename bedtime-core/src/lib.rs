//! Bedtime story generation with an LLM judge.
//!
//! This crate provides:
//! - Normalizing a free-text request into a fixed-shape story brief
//! - Story drafting with safety rules for readers aged 5-10
//! - A five-dimension rubric judged by the model, with a strict pass threshold
//! - A bounded retry loop that falls back to the best draft with a disclaimer
//! - One user-directed revision per story
//!
//! # Quick Start
//!
//! ```ignore
//! use bedtime_core::{StoryConfig, StorySession};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut session = StorySession::from_env(StoryConfig::default())?;
//!
//!     let result = session.start("A story about a sleepy dragon").await?;
//!     println!("{}\n\n{}", result.draft().title(), result.draft().story_text());
//!
//!     let revised = session.revise("Give the dragon a friend").await?;
//!     println!("{}", revised.draft().story_text());
//!     Ok(())
//! }
//! ```

pub mod brief;
pub mod config;
pub mod draft;
pub mod judge;
pub mod model;
pub mod orchestrator;
pub mod prompts;
pub mod rubric;
pub mod session;
pub mod storyteller;
pub mod testing;

// Primary public API
pub use brief::{BriefBuilder, BriefError, StoryBrief};
pub use config::{StoryConfig, MAX_ATTEMPTS};
pub use draft::{JudgedDraft, StoryDraft};
pub use judge::{parse_rubric, Judge, JudgeVerdict};
pub use model::{GenerationSettings, ModelError, StoryModel};
pub use orchestrator::{select_best, GenerationResult, Orchestrator};
pub use rubric::{format_feedback, Dimension, DimensionScore, RubricError, RubricScore};
pub use session::{SessionError, SessionId, StorySession};
pub use storyteller::Storyteller;
pub use testing::{MockModel, MockReply, StoryHarness};

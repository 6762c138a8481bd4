//! StorySession - the primary public API for bedtime stories.
//!
//! A session owns the model handle and configuration, normalizes the
//! user's request into a brief, runs the generate-and-judge loop, and
//! allows exactly one revision of the result.

use crate::brief::{BriefBuilder, BriefError, StoryBrief};
use crate::config::StoryConfig;
use crate::model::{ModelError, StoryModel};
use crate::orchestrator::{GenerationResult, Orchestrator};
use claude::Claude;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument};
use uuid::Uuid;

/// Errors from StorySession operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Brief error: {0}")]
    Brief(#[from] BriefError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("This story has already been revised once")]
    RevisionAlreadyUsed,

    #[error("No story has been generated yet")]
    NotStarted,

    #[error("This session already has a story; start a new session for another")]
    StoryExists,

    #[error("No API key configured - set ANTHROPIC_API_KEY environment variable")]
    NoApiKey,
}

/// Identifier attached to every log line of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A bedtime story session.
///
/// This is the main entry point for story generation. It manages:
/// - Turning the request into a [`StoryBrief`]
/// - The bounded generate-and-judge loop
/// - The single revision a user may ask for
pub struct StorySession {
    id: SessionId,
    briefs: BriefBuilder,
    orchestrator: Orchestrator,
    brief: Option<StoryBrief>,
    result: Option<GenerationResult>,
    revision_used: bool,
}

impl StorySession {
    /// Create a session on top of any model.
    pub fn new(model: Arc<dyn StoryModel>, config: StoryConfig) -> Self {
        Self {
            id: SessionId::new(),
            briefs: BriefBuilder::new(model.clone(), config.normalize),
            orchestrator: Orchestrator::new(model, &config),
            brief: None,
            result: None,
            revision_used: false,
        }
    }

    /// Create a session backed by Claude.
    ///
    /// Requires `ANTHROPIC_API_KEY` environment variable to be set.
    pub fn from_env(config: StoryConfig) -> Result<Self, SessionError> {
        let mut client = Claude::from_env().map_err(|_| SessionError::NoApiKey)?;
        if let Some(model) = &config.model {
            client = client.with_model(model.clone());
        }
        Ok(Self::new(Arc::new(client), config))
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// The brief, once [`normalize`](Self::normalize) has run.
    pub fn brief(&self) -> Option<&StoryBrief> {
        self.brief.as_ref()
    }

    /// The latest result, revised or not.
    pub fn result(&self) -> Option<&GenerationResult> {
        self.result.as_ref()
    }

    /// Turn the user's request into the session's brief.
    ///
    /// Fails with [`SessionError::StoryExists`] once a story has been
    /// generated, so a result is always tied to the brief it was written for.
    #[instrument(skip_all, fields(session_id = %self.id))]
    pub async fn normalize(&mut self, user_request: &str) -> Result<&StoryBrief, SessionError> {
        if self.result.is_some() {
            return Err(SessionError::StoryExists);
        }
        let brief = self.briefs.normalize(user_request).await?;
        Ok(&*self.brief.insert(brief))
    }

    /// Run the generate-and-judge loop against the current brief.
    ///
    /// Runs at most once per session.
    #[instrument(skip_all, fields(session_id = %self.id))]
    pub async fn generate(&mut self) -> Result<&GenerationResult, SessionError> {
        if self.result.is_some() {
            return Err(SessionError::StoryExists);
        }
        let brief = self.brief.as_ref().ok_or(SessionError::NotStarted)?;
        let result = self.orchestrator.run(brief).await?;
        info!(
            passed = result.passed_threshold,
            attempts = result.all_attempts.len(),
            "story generated"
        );
        Ok(&*self.result.insert(result))
    }

    /// Normalize the request and generate a story in one step.
    pub async fn start(&mut self, user_request: &str) -> Result<&GenerationResult, SessionError> {
        self.normalize(user_request).await?;
        self.generate().await
    }

    /// Apply the user's one revision to the current story.
    ///
    /// A second call fails with [`SessionError::RevisionAlreadyUsed`]
    /// without calling the model.
    #[instrument(skip_all, fields(session_id = %self.id))]
    pub async fn revise(&mut self, revision_request: &str) -> Result<&GenerationResult, SessionError> {
        let (brief, previous) = match (&self.brief, &self.result) {
            (Some(brief), Some(result)) => (brief, result),
            _ => return Err(SessionError::NotStarted),
        };
        if self.revision_used {
            return Err(SessionError::RevisionAlreadyUsed);
        }

        let revised = self
            .orchestrator
            .revise(previous, revision_request, brief)
            .await?;
        info!(passed = revised.passed_threshold, "story revised");
        self.revision_used = true;
        Ok(&*self.result.insert(revised))
    }

    /// Whether the one revision is still available.
    pub fn can_revise(&self) -> bool {
        self.result.is_some() && !self.revision_used
    }
}

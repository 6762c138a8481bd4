//! Testing utilities for story sessions.
//!
//! This module provides tools for integration testing:
//! - `MockModel` for deterministic testing without API calls
//! - `StoryHarness` for scripted generate-and-judge scenarios
//! - Builders for judge replies, story replies and rubric scores

use crate::brief::StoryBrief;
use crate::config::StoryConfig;
use crate::model::{GenerationSettings, ModelError, StoryModel};
use crate::orchestrator::{GenerationResult, Orchestrator};
use crate::rubric::{DimensionScore, RubricScore};
use crate::session::StorySession;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A scripted reply from the mock model.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Completion text to return.
    Text(String),
    /// A model failure with this message.
    Fail(String),
}

impl MockReply {
    pub fn text(text: impl Into<String>) -> Self {
        MockReply::Text(text.into())
    }

    pub fn fail(message: impl Into<String>) -> Self {
        MockReply::Fail(message.into())
    }
}

/// One call the mock model received.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub prompt: String,
    pub settings: GenerationSettings,
}

/// A model that returns scripted replies in order.
///
/// Once the script runs out every call fails with
/// [`ModelError::Unavailable`], so a test that makes more calls than it
/// expects fails loudly instead of hanging.
#[derive(Debug, Default)]
pub struct MockModel {
    replies: Mutex<VecDeque<MockReply>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockModel {
    pub fn new(replies: Vec<MockReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A mock ready to hand to components that take `Arc<dyn StoryModel>`.
    pub fn shared(replies: Vec<MockReply>) -> Arc<Self> {
        Arc::new(Self::new(replies))
    }

    /// Queue another reply.
    pub fn push(&self, reply: MockReply) {
        lock(&self.replies).push_back(reply);
    }

    /// Every call received so far, oldest first.
    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Replies still queued.
    pub fn remaining(&self) -> usize {
        lock(&self.replies).len()
    }
}

#[async_trait]
impl StoryModel for MockModel {
    async fn complete(
        &self,
        prompt: &str,
        settings: GenerationSettings,
    ) -> Result<String, ModelError> {
        lock(&self.calls).push(RecordedCall {
            prompt: prompt.to_string(),
            settings,
        });

        match lock(&self.replies).pop_front() {
            Some(MockReply::Text(text)) => Ok(text),
            Some(MockReply::Fail(message)) => Err(ModelError::Unavailable(message)),
            None => Err(ModelError::Unavailable(
                "mock model has no more scripted replies".to_string(),
            )),
        }
    }
}

// A panicking test thread must not cascade into every other assertion.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A well-formed judge reply with the given scores.
pub fn judge_response(
    safety: u8,
    age_fit: u8,
    coherence: u8,
    engagement: u8,
    language_simplicity: u8,
) -> String {
    format!(
        "SAFETY: {safety}\n\
         SAFETY_FEEDBACK: Safety feedback.\n\
         AGE_FIT: {age_fit}\n\
         AGE_FIT_FEEDBACK: Age fit feedback.\n\
         COHERENCE: {coherence}\n\
         COHERENCE_FEEDBACK: Coherence feedback.\n\
         ENGAGEMENT: {engagement}\n\
         ENGAGEMENT_FEEDBACK: Engagement feedback.\n\
         LANGUAGE_SIMPLICITY: {language_simplicity}\n\
         LANGUAGE_SIMPLICITY_FEEDBACK: Language simplicity feedback.\n"
    )
}

/// A storyteller reply in the expected `Title:` format.
pub fn story_response(title: &str, body: &str) -> String {
    format!("Title: {title}\n\n{body}")
}

/// A valid rubric score with placeholder feedback.
///
/// Panics if a score is outside `1..=5`.
pub fn rubric(
    safety: u8,
    age_fit: u8,
    coherence: u8,
    engagement: u8,
    language_simplicity: u8,
) -> RubricScore {
    rubric_with_feedback(
        [safety, age_fit, coherence, engagement, language_simplicity],
        ["Safety.", "Age fit.", "Coherence.", "Engagement.", "Language."],
    )
}

/// A valid rubric score, values in `Dimension::ALL` order.
pub fn rubric_with_feedback(scores: [u8; 5], feedback: [&str; 5]) -> RubricScore {
    let [s, a, c, e, l] = scores;
    let [fs, fa, fc, fe, fl] = feedback;
    RubricScore::new(
        DimensionScore::new(s, fs),
        DimensionScore::new(a, fa),
        DimensionScore::new(c, fc),
        DimensionScore::new(e, fe),
        DimensionScore::new(l, fl),
    )
    .unwrap_or_else(|e| panic!("invalid test rubric: {e}"))
}

/// A brief with the goal "calming".
pub fn sample_brief() -> StoryBrief {
    StoryBrief::new("A story about a sleepy bunny", "calming")
        .unwrap_or_else(|e| panic!("invalid sample brief: {e}"))
}

/// Test harness for scripted story scenarios.
///
/// Replies are consumed in call order, so a typical script alternates
/// `expect_story` and `expect_judge`.
pub struct StoryHarness {
    pub model: Arc<MockModel>,
    pub config: StoryConfig,
}

impl Default for StoryHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl StoryHarness {
    pub fn new() -> Self {
        Self {
            model: MockModel::shared(Vec::new()),
            config: StoryConfig::default(),
        }
    }

    pub fn with_config(config: StoryConfig) -> Self {
        Self {
            model: MockModel::shared(Vec::new()),
            config,
        }
    }

    /// Queue a storyteller reply.
    pub fn expect_story(&mut self, title: &str, body: &str) -> &mut Self {
        self.model.push(MockReply::text(story_response(title, body)));
        self
    }

    /// Queue a well-formed judge reply.
    pub fn expect_judge(
        &mut self,
        safety: u8,
        age_fit: u8,
        coherence: u8,
        engagement: u8,
        language_simplicity: u8,
    ) -> &mut Self {
        self.model.push(MockReply::text(judge_response(
            safety,
            age_fit,
            coherence,
            engagement,
            language_simplicity,
        )));
        self
    }

    /// Queue an arbitrary reply, e.g. a malformed judge answer.
    pub fn expect_reply(&mut self, text: impl Into<String>) -> &mut Self {
        self.model.push(MockReply::text(text));
        self
    }

    /// Queue a model failure.
    pub fn expect_failure(&mut self, message: impl Into<String>) -> &mut Self {
        self.model.push(MockReply::fail(message));
        self
    }

    pub fn orchestrator(&self) -> Orchestrator {
        Orchestrator::new(self.model.clone(), &self.config)
    }

    pub fn session(&self) -> StorySession {
        StorySession::new(self.model.clone(), self.config.clone())
    }

    pub fn call_count(&self) -> usize {
        self.model.call_count()
    }
}

/// Assert the result passed on the given attempt.
#[track_caller]
pub fn assert_passed_on(result: &GenerationResult, attempt: usize) {
    assert!(result.passed_threshold, "expected a passing result");
    assert!(result.disclaimer.is_none(), "passing result has a disclaimer");
    assert_eq!(result.retry_count, attempt, "passed on the wrong attempt");
    assert_eq!(result.all_attempts.len(), attempt + 1);
}

/// Assert the result failed and carries a disclaimer.
#[track_caller]
pub fn assert_not_passed(result: &GenerationResult) {
    assert!(!result.passed_threshold, "expected a failing result");
    assert!(
        result.disclaimer.as_deref().is_some_and(|d| !d.is_empty()),
        "failing result has no disclaimer"
    );
}

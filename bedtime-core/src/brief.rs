//! Normalizing a free-text request into a [`StoryBrief`].

use crate::model::{GenerationSettings, ModelError, StoryModel};
use crate::prompts;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Reader ages every story targets, inclusive.
pub const AGE_BAND: (u8, u8) = (5, 10);

/// Story length in words every draft aims for, inclusive.
pub const TARGET_LENGTH: (usize, usize) = (450, 700);

/// Errors from building a brief.
#[derive(Debug, Error)]
pub enum BriefError {
    #[error("could not infer a bedtime goal from the request")]
    EmptyGoal,

    #[error(transparent)]
    Model(#[from] ModelError),
}

/// The fixed-shape request every draft is written against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoryBrief {
    user_request: String,
    bedtime_goal: String,
    age_band: (u8, u8),
    target_length: (usize, usize),
}

impl StoryBrief {
    /// Build a brief. The goal is trimmed and must not be empty; the
    /// request is kept verbatim.
    pub fn new(
        user_request: impl Into<String>,
        bedtime_goal: impl AsRef<str>,
    ) -> Result<Self, BriefError> {
        let bedtime_goal = bedtime_goal.as_ref().trim();
        if bedtime_goal.is_empty() {
            return Err(BriefError::EmptyGoal);
        }

        Ok(Self {
            user_request: user_request.into(),
            bedtime_goal: bedtime_goal.to_string(),
            age_band: AGE_BAND,
            target_length: TARGET_LENGTH,
        })
    }

    pub fn user_request(&self) -> &str {
        &self.user_request
    }

    pub fn bedtime_goal(&self) -> &str {
        &self.bedtime_goal
    }

    pub fn age_band(&self) -> (u8, u8) {
        self.age_band
    }

    pub fn target_length(&self) -> (usize, usize) {
        self.target_length
    }
}

/// Infers the bedtime goal of a request with one short model call.
pub struct BriefBuilder {
    model: Arc<dyn StoryModel>,
    settings: GenerationSettings,
}

impl BriefBuilder {
    pub fn new(model: Arc<dyn StoryModel>, settings: GenerationSettings) -> Self {
        Self { model, settings }
    }

    /// Turn `user_request` into a brief.
    ///
    /// Fails with [`BriefError::EmptyGoal`] when the model answers with
    /// nothing but whitespace.
    pub async fn normalize(&self, user_request: &str) -> Result<StoryBrief, BriefError> {
        let prompt = prompts::normalize_prompt(user_request);
        let goal = self.model.complete(&prompt, self.settings).await?;
        let brief = StoryBrief::new(user_request, goal)?;
        info!(goal = %brief.bedtime_goal(), "story brief ready");
        Ok(brief)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockModel, MockReply};

    #[test]
    fn test_brief_fixed_fields() {
        let brief = StoryBrief::new("A sleepy bunny", "  calming  ").unwrap();
        assert_eq!(brief.user_request(), "A sleepy bunny");
        assert_eq!(brief.bedtime_goal(), "calming");
        assert_eq!(brief.age_band(), (5, 10));
        assert_eq!(brief.target_length(), (450, 700));
    }

    #[test]
    fn test_brief_rejects_blank_goal() {
        assert!(matches!(
            StoryBrief::new("anything", " \n\t "),
            Err(BriefError::EmptyGoal)
        ));
    }

    #[tokio::test]
    async fn test_normalize_preserves_request_verbatim() {
        let model = MockModel::shared(vec![MockReply::text("gentle adventure\n")]);
        let builder = BriefBuilder::new(model.clone(), GenerationSettings::NORMALIZE);

        let request = "  A story about a girl named Alice and her cat Bob  ";
        let brief = builder.normalize(request).await.unwrap();

        assert_eq!(brief.user_request(), request);
        assert_eq!(brief.bedtime_goal(), "gentle adventure");

        let calls = model.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].settings, GenerationSettings::NORMALIZE);
        assert!(calls[0].prompt.contains(request));
    }

    #[tokio::test]
    async fn test_normalize_accepts_empty_request() {
        let model = MockModel::shared(vec![MockReply::text("calming")]);
        let builder = BriefBuilder::new(model, GenerationSettings::NORMALIZE);

        let brief = builder.normalize("").await.unwrap();
        assert_eq!(brief.user_request(), "");
        assert_eq!(brief.bedtime_goal(), "calming");
    }

    #[tokio::test]
    async fn test_normalize_fails_on_blank_goal() {
        let model = MockModel::shared(vec![MockReply::text("   ")]);
        let builder = BriefBuilder::new(model, GenerationSettings::NORMALIZE);

        let err = builder.normalize("a dragon story").await.unwrap_err();
        assert!(matches!(err, BriefError::EmptyGoal));
    }

    #[tokio::test]
    async fn test_normalize_propagates_model_failure() {
        let model = MockModel::shared(vec![MockReply::fail("rate limited")]);
        let builder = BriefBuilder::new(model, GenerationSettings::NORMALIZE);

        let err = builder.normalize("a dragon story").await.unwrap_err();
        assert!(matches!(err, BriefError::Model(_)));
    }
}

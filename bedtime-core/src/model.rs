//! The text-completion seam between story logic and a hosted model.
//!
//! Everything above this module only needs "prompt in, text out" with a
//! token budget and a temperature. [`claude::Claude`] is the production
//! implementation; [`crate::testing::MockModel`] scripts replies for tests.

use async_trait::async_trait;
use claude::{Claude, Message, Request};
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

/// Failures at the model boundary.
///
/// These are never recovered by the story pipeline; they propagate to
/// whoever started the session.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Claude API error: {0}")]
    Client(#[from] claude::Error),

    #[error("Model unavailable: {0}")]
    Unavailable(String),
}

/// Token budget and sampling temperature for a single call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GenerationSettings {
    pub max_tokens: usize,
    pub temperature: f32,
}

impl GenerationSettings {
    /// Short, near-deterministic output used to infer a bedtime goal.
    pub const NORMALIZE: Self = Self {
        max_tokens: 50,
        temperature: 0.3,
    };

    /// Creative budget for story drafts and revisions.
    pub const CREATIVE: Self = Self {
        max_tokens: 1500,
        temperature: 0.8,
    };

    /// Low-temperature budget for rubric evaluation.
    pub const EVALUATE: Self = Self {
        max_tokens: 800,
        temperature: 0.1,
    };
}

/// A hosted model that turns a prompt into completion text.
#[async_trait]
pub trait StoryModel: Send + Sync {
    /// Complete a single-turn prompt.
    async fn complete(
        &self,
        prompt: &str,
        settings: GenerationSettings,
    ) -> Result<String, ModelError>;
}

#[async_trait]
impl StoryModel for Claude {
    async fn complete(
        &self,
        prompt: &str,
        settings: GenerationSettings,
    ) -> Result<String, ModelError> {
        let request = Request::new(vec![Message::user(prompt)])
            .with_max_tokens(settings.max_tokens)
            .with_temperature(settings.temperature);

        let response = Claude::complete(self, request).await?;
        if response.is_truncated() {
            warn!(
                max_tokens = settings.max_tokens,
                "completion hit the token limit"
            );
        }
        Ok(response.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        assert_eq!(GenerationSettings::NORMALIZE.max_tokens, 50);
        assert_eq!(GenerationSettings::CREATIVE.max_tokens, 1500);
        assert_eq!(GenerationSettings::EVALUATE.max_tokens, 800);
        assert!(GenerationSettings::EVALUATE.temperature < GenerationSettings::CREATIVE.temperature);
        assert!(GenerationSettings::NORMALIZE.temperature < GenerationSettings::CREATIVE.temperature);
    }

    #[test]
    fn test_client_error_converts() {
        let err: ModelError = claude::Error::NoApiKey.into();
        assert!(matches!(err, ModelError::Client(claude::Error::NoApiKey)));
        assert!(err.to_string().contains("API key"));
    }
}

//! Session configuration.

use crate::model::GenerationSettings;

/// Hard ceiling on generate-then-judge attempts in the initial loop.
pub const MAX_ATTEMPTS: usize = 3;

/// Configuration for a story session.
#[derive(Debug, Clone)]
pub struct StoryConfig {
    /// Model override (defaults to the client's model).
    pub model: Option<String>,

    /// Attempts allowed in the initial loop, always within `1..=MAX_ATTEMPTS`.
    pub max_attempts: usize,

    /// Settings for bedtime-goal inference.
    pub normalize: GenerationSettings,

    /// Settings for drafts and revisions.
    pub creative: GenerationSettings,

    /// Settings for the judge.
    pub evaluate: GenerationSettings,
}

impl Default for StoryConfig {
    fn default() -> Self {
        Self {
            model: None,
            max_attempts: MAX_ATTEMPTS,
            normalize: GenerationSettings::NORMALIZE,
            creative: GenerationSettings::CREATIVE,
            evaluate: GenerationSettings::EVALUATE,
        }
    }
}

impl StoryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the attempt budget. Values outside `1..=MAX_ATTEMPTS` are clamped.
    pub fn with_max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.clamp(1, MAX_ATTEMPTS);
        self
    }
}

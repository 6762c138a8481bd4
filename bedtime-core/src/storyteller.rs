//! Draft generation.

use crate::brief::StoryBrief;
use crate::draft::StoryDraft;
use crate::model::{GenerationSettings, ModelError, StoryModel};
use crate::prompts;
use std::sync::Arc;
use tracing::debug;

/// Writes story drafts with the creative model settings.
///
/// Each method is exactly one model call; nothing here retries.
pub struct Storyteller {
    model: Arc<dyn StoryModel>,
    settings: GenerationSettings,
}

impl Storyteller {
    pub fn new(model: Arc<dyn StoryModel>, settings: GenerationSettings) -> Self {
        Self { model, settings }
    }

    /// Write a draft for `brief`, addressing `feedback` from an earlier
    /// attempt when given.
    pub async fn generate(
        &self,
        brief: &StoryBrief,
        feedback: Option<&str>,
    ) -> Result<StoryDraft, ModelError> {
        let prompt = prompts::story_prompt(brief, feedback);
        let output = self.model.complete(&prompt, self.settings).await?;
        let draft = StoryDraft::from_model_output(&output);
        debug!(title = %draft.title(), words = draft.word_count(), "draft generated");
        Ok(draft)
    }

    /// Rewrite `previous` according to the user's request, keeping the
    /// safety rules in force.
    pub async fn revise(
        &self,
        previous: &StoryDraft,
        revision_request: &str,
        brief: &StoryBrief,
    ) -> Result<StoryDraft, ModelError> {
        let prompt = prompts::revision_prompt(previous, revision_request, brief);
        let output = self.model.complete(&prompt, self.settings).await?;
        let draft = StoryDraft::from_model_output(&output);
        debug!(title = %draft.title(), words = draft.word_count(), "revision generated");
        Ok(draft)
    }
}

//! Story drafts, before and after judging.

use crate::rubric::RubricScore;
use serde::Serialize;
use tracing::warn;

/// Title used when the model output has no usable title line.
pub const PLACEHOLDER_TITLE: &str = "A Bedtime Story";

/// A generated story that has not been judged yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoryDraft {
    title: String,
    story_text: String,
    word_count: usize,
}

impl StoryDraft {
    /// Build a draft; the word count is derived from the text.
    pub fn new(title: impl Into<String>, story_text: impl Into<String>) -> Self {
        let story_text = story_text.into();
        Self {
            title: title.into(),
            word_count: count_words(&story_text),
            story_text,
        }
    }

    /// Split raw model output into title and body.
    ///
    /// The first non-empty line is the title, with any `Title:` label and
    /// markdown emphasis removed. Everything after it is the body. An empty
    /// title falls back to [`PLACEHOLDER_TITLE`].
    pub fn from_model_output(output: &str) -> Self {
        let output = output.trim();
        let (title_line, body) = match output.split_once('\n') {
            Some((first, rest)) => (first, rest),
            None => (output, ""),
        };

        let mut title = clean_title(title_line);
        if title.is_empty() {
            warn!("model output had no title line, using placeholder");
            title = PLACEHOLDER_TITLE.to_string();
        }

        Self::new(title, body.trim())
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn story_text(&self) -> &str {
        &self.story_text
    }

    pub fn word_count(&self) -> usize {
        self.word_count
    }

    /// Attach the judge's verdict.
    pub fn judged(self, score: RubricScore) -> JudgedDraft {
        JudgedDraft { draft: self, score }
    }
}

/// A draft together with the score it received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JudgedDraft {
    pub draft: StoryDraft,
    pub score: RubricScore,
}

impl JudgedDraft {
    pub fn passes(&self) -> bool {
        self.score.meets_threshold()
    }

    pub fn average(&self) -> f64 {
        self.score.average()
    }
}

/// Number of whitespace-separated tokens.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

fn clean_title(line: &str) -> String {
    let line = line.trim().trim_start_matches('#').trim().trim_matches('*').trim();
    let line = match line.get(..6) {
        Some(label) if label.eq_ignore_ascii_case("title:") => &line[6..],
        _ => line,
    };
    line.trim().trim_matches('*').trim().to_string()
}

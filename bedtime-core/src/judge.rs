//! LLM-as-judge evaluation of story drafts.
//!
//! The judge is asked for ten `KEY: value` lines (a score and a feedback
//! sentence for each [`Dimension`]). [`parse_rubric`] turns that text into a
//! [`JudgeVerdict`]; a malformed reply is an expected outcome, not an error,
//! so it is reported as [`JudgeVerdict::Malformed`] and never as a partially
//! filled score.

use crate::brief::StoryBrief;
use crate::draft::StoryDraft;
use crate::model::{GenerationSettings, ModelError, StoryModel};
use crate::prompts;
use crate::rubric::{Dimension, DimensionScore, RubricScore, MAX_SCORE, MIN_SCORE};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;

lazy_static! {
    /// `KEY: value` on a single line. Keys are upper-case with underscores.
    static ref KEY_VALUE_LINE: Regex =
        Regex::new(r"(?m)^[ \t]*([A-Z][A-Z_]*)[ \t]*:[ \t]*(.*?)[ \t\r]*$")
            .expect("key/value pattern is valid");

    /// Leading integer of a score value, so `4/5` and `4 (good)` read as 4.
    static ref LEADING_DIGITS: Regex = Regex::new(r"^\d+").expect("digit pattern is valid");
}

/// Outcome of parsing one judge reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JudgeVerdict {
    /// Every score and feedback line was present and valid.
    Parsed(RubricScore),
    /// The reply did not follow the rubric format.
    Malformed(String),
}

impl JudgeVerdict {
    pub fn is_parsed(&self) -> bool {
        matches!(self, JudgeVerdict::Parsed(_))
    }

    /// The score, if parsing succeeded.
    pub fn into_score(self) -> Option<RubricScore> {
        match self {
            JudgeVerdict::Parsed(score) => Some(score),
            JudgeVerdict::Malformed(_) => None,
        }
    }
}

/// Parse a raw judge reply.
///
/// A score is read from the first line for its key whose value starts
/// with digits, so an echoed `SAFETY: [score]` template line is skipped.
/// That integer must be in `1..=5`; a key with no such line (only `-1` or
/// `four`, say) has a missing score. Feedback is the first non-empty value
/// for its key.
pub fn parse_rubric(response: &str) -> JudgeVerdict {
    let mut fields: HashMap<&str, Vec<&str>> = HashMap::new();
    for caps in KEY_VALUE_LINE.captures_iter(response) {
        if let (Some(key), Some(value)) = (caps.get(1), caps.get(2)) {
            fields.entry(key.as_str()).or_default().push(value.as_str());
        }
    }

    let mut entries = Vec::with_capacity(Dimension::ALL.len());
    for dimension in Dimension::ALL {
        let score = match parse_score(&fields, dimension) {
            Ok(score) => score,
            Err(reason) => return JudgeVerdict::Malformed(reason),
        };

        let feedback = fields
            .get(dimension.feedback_key())
            .and_then(|values| values.iter().map(|v| v.trim()).find(|v| !v.is_empty()));
        let feedback = match feedback {
            Some(text) => text,
            None => {
                return JudgeVerdict::Malformed(format!(
                    "missing feedback for dimension: {dimension}"
                ))
            }
        };

        entries.push(DimensionScore::new(score, feedback));
    }

    let entries: [DimensionScore; 5] = match entries.try_into() {
        Ok(entries) => entries,
        Err(_) => return JudgeVerdict::Malformed("incomplete rubric".to_string()),
    };

    match RubricScore::from_entries(entries) {
        Ok(score) => JudgeVerdict::Parsed(score),
        Err(e) => JudgeVerdict::Malformed(e.to_string()),
    }
}

fn parse_score(fields: &HashMap<&str, Vec<&str>>, dimension: Dimension) -> Result<u8, String> {
    let missing = || format!("missing score for dimension: {dimension}");

    let digits = fields
        .get(dimension.key())
        .and_then(|values| values.iter().find_map(|v| LEADING_DIGITS.find(v)))
        .ok_or_else(missing)?;

    // Overlong digit strings are out of range, not a different kind of failure.
    let score = digits.as_str().parse::<u32>().unwrap_or(u32::MAX);
    if !(u32::from(MIN_SCORE)..=u32::from(MAX_SCORE)).contains(&score) {
        return Err(format!(
            "score for {dimension} out of range (got {}, expected 1-5)",
            digits.as_str()
        ));
    }

    u8::try_from(score).map_err(|_| missing())
}

/// Scores drafts against the bedtime rubric.
pub struct Judge {
    model: Arc<dyn StoryModel>,
    settings: GenerationSettings,
}

impl Judge {
    pub fn new(model: Arc<dyn StoryModel>, settings: GenerationSettings) -> Self {
        Self { model, settings }
    }

    /// Ask the model for one verdict on `draft`.
    ///
    /// A single model call; retrying a malformed reply is the caller's
    /// decision.
    pub async fn evaluate(
        &self,
        draft: &StoryDraft,
        brief: &StoryBrief,
    ) -> Result<JudgeVerdict, ModelError> {
        let prompt = prompts::judge_prompt(draft, brief);
        let response = self.model.complete(&prompt, self.settings).await?;
        Ok(parse_rubric(&response))
    }
}

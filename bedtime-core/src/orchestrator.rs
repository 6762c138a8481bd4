//! The bounded generate-and-judge loop and the one-shot revision.
//!
//! [`Orchestrator::run`] drafts a story, has it judged, and retries with
//! the judge's feedback until a draft meets the threshold or the attempt
//! budget runs out. In the latter case the best-scoring draft is returned
//! together with a disclaimer. [`Orchestrator::revise`] performs one
//! user-directed rewrite of a finished result.
//!
//! Model failures are never retried here; only malformed judge replies are.

use crate::brief::StoryBrief;
use crate::config::StoryConfig;
use crate::draft::{JudgedDraft, StoryDraft};
use crate::judge::{Judge, JudgeVerdict};
use crate::model::{ModelError, StoryModel};
use crate::rubric::{format_feedback, RubricScore};
use crate::storyteller::Storyteller;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Judge calls per draft before the default failing score is used.
const JUDGE_CALLS: usize = 2;

/// Disclaimer attached when a revision does not meet the threshold.
pub const REVISION_DISCLAIMER: &str = "Note: The revised story did not meet all quality thresholds.";

/// Disclaimer attached when no attempt in the initial loop passed.
pub fn exhausted_disclaimer(attempts: usize) -> String {
    let noun = if attempts == 1 { "attempt" } else { "attempts" };
    format!(
        "Note: This story did not fully meet all quality thresholds after {attempts} {noun}. \
         This is the best version generated."
    )
}

/// Outcome of a story session, or of its revision.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationResult {
    /// The accepted draft, or the best one when none passed.
    pub final_draft: JudgedDraft,

    /// Every judged draft in the order it was produced, revision included.
    pub all_attempts: Vec<JudgedDraft>,

    /// Index of the last attempt; one more after a revision.
    pub retry_count: usize,

    pub passed_threshold: bool,

    /// Present exactly when `passed_threshold` is false.
    pub disclaimer: Option<String>,

    /// Attempts whose judge reply could not be parsed even on the second call.
    pub judge_parse_failures: usize,

    pub revision_used: bool,
}

impl GenerationResult {
    pub fn draft(&self) -> &StoryDraft {
        &self.final_draft.draft
    }

    pub fn score(&self) -> &RubricScore {
        &self.final_draft.score
    }
}

/// Best draft by average score. Ties keep the earliest attempt.
pub fn select_best(attempts: &[JudgedDraft]) -> Option<&JudgedDraft> {
    attempts.iter().fold(None, |best, candidate| match best {
        Some(best) if candidate.average() <= best.average() => Some(best),
        _ => Some(candidate),
    })
}

enum LoopState {
    Attempting(usize),
    Passed(JudgedDraft),
    Exhausted(JudgedDraft),
}

/// Ties a [`Storyteller`] and a [`Judge`] together.
///
/// Stateless across calls: it does not stop a caller from revising twice.
pub struct Orchestrator {
    storyteller: Storyteller,
    judge: Judge,
    max_attempts: usize,
}

impl Orchestrator {
    pub fn new(model: Arc<dyn StoryModel>, config: &StoryConfig) -> Self {
        Self {
            storyteller: Storyteller::new(model.clone(), config.creative),
            judge: Judge::new(model, config.evaluate),
            max_attempts: config.max_attempts.clamp(1, crate::config::MAX_ATTEMPTS),
        }
    }

    /// Run the initial loop for `brief`.
    pub async fn run(&self, brief: &StoryBrief) -> Result<GenerationResult, ModelError> {
        let mut attempts: Vec<JudgedDraft> = Vec::with_capacity(self.max_attempts);
        let mut judge_parse_failures = 0;
        let mut state = LoopState::Attempting(0);

        loop {
            state = match state {
                LoopState::Attempting(n) => {
                    let feedback = select_best(&attempts).map(|best| format_feedback(&best.score));
                    let draft = self.storyteller.generate(brief, feedback.as_deref()).await?;

                    let (score, parse_failed) = self.judge_with_fallback(&draft, brief).await?;
                    if parse_failed {
                        judge_parse_failures += 1;
                    }

                    let judged = draft.judged(score);
                    let passed = judged.passes();
                    info!(
                        attempt = n,
                        average = judged.average(),
                        passed,
                        "attempt judged"
                    );
                    attempts.push(judged.clone());

                    if passed {
                        LoopState::Passed(judged)
                    } else if n + 1 >= self.max_attempts {
                        LoopState::Exhausted(judged)
                    } else {
                        LoopState::Attempting(n + 1)
                    }
                }
                LoopState::Passed(final_draft) => {
                    let retry_count = attempts.len() - 1;
                    info!(retry_count, "story passed the quality threshold");
                    return Ok(GenerationResult {
                        final_draft,
                        all_attempts: attempts,
                        retry_count,
                        passed_threshold: true,
                        disclaimer: None,
                        judge_parse_failures,
                        revision_used: false,
                    });
                }
                LoopState::Exhausted(last) => {
                    let final_draft = select_best(&attempts).cloned().unwrap_or(last);
                    let retry_count = attempts.len() - 1;
                    info!(
                        attempts = attempts.len(),
                        best_average = final_draft.average(),
                        "attempts exhausted, returning best draft"
                    );
                    return Ok(GenerationResult {
                        final_draft,
                        disclaimer: Some(exhausted_disclaimer(attempts.len())),
                        all_attempts: attempts,
                        retry_count,
                        passed_threshold: false,
                        judge_parse_failures,
                        revision_used: false,
                    });
                }
            };
        }
    }

    /// Rewrite the final draft of `previous` once and judge the result.
    ///
    /// Returns a new result; `previous` is left untouched.
    pub async fn revise(
        &self,
        previous: &GenerationResult,
        revision_request: &str,
        brief: &StoryBrief,
    ) -> Result<GenerationResult, ModelError> {
        let draft = self
            .storyteller
            .revise(previous.draft(), revision_request, brief)
            .await?;

        let (score, parse_failed) = self.judge_with_fallback(&draft, brief).await?;
        let judged = draft.judged(score);
        let passed = judged.passes();
        info!(average = judged.average(), passed, "revision judged");

        let mut all_attempts = previous.all_attempts.clone();
        all_attempts.push(judged.clone());

        Ok(GenerationResult {
            final_draft: judged,
            all_attempts,
            retry_count: previous.retry_count + 1,
            passed_threshold: passed,
            disclaimer: (!passed).then(|| REVISION_DISCLAIMER.to_string()),
            judge_parse_failures: previous.judge_parse_failures + usize::from(parse_failed),
            revision_used: true,
        })
    }

    /// Judge `draft`, asking again once if the reply is malformed.
    ///
    /// The flag is true when the default failing score was substituted.
    async fn judge_with_fallback(
        &self,
        draft: &StoryDraft,
        brief: &StoryBrief,
    ) -> Result<(RubricScore, bool), ModelError> {
        for call in 1..=JUDGE_CALLS {
            match self.judge.evaluate(draft, brief).await? {
                JudgeVerdict::Parsed(score) => return Ok((score, false)),
                JudgeVerdict::Malformed(reason) => {
                    warn!(call, %reason, "judge response malformed");
                }
            }
        }

        warn!("judge response unparseable, using default failing score");
        Ok((RubricScore::default_failing(), true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GenerationSettings;
    use crate::rubric::PARSE_FAILURE_FEEDBACK;
    use crate::testing::{
        assert_not_passed, assert_passed_on, rubric, sample_brief, StoryHarness,
    };

    #[test]
    fn test_select_best_first_seen_wins() {
        let a = StoryDraft::new("A", "a").judged(rubric(3, 3, 4, 3, 3));
        let b = StoryDraft::new("B", "b").judged(rubric(4, 3, 3, 3, 3));
        let c = StoryDraft::new("C", "c").judged(rubric(3, 3, 3, 3, 3));
        let attempts = vec![a, b, c];
        assert_eq!(select_best(&attempts).unwrap().draft.title(), "A");
        assert!(select_best(&[]).is_none());
    }

    #[test]
    fn test_select_best_strictly_higher() {
        let attempts = vec![
            StoryDraft::new("A", "a").judged(rubric(3, 3, 3, 3, 3)),
            StoryDraft::new("B", "b").judged(rubric(4, 3, 4, 3, 3)),
            StoryDraft::new("C", "c").judged(rubric(3, 3, 4, 3, 3)),
        ];
        assert_eq!(select_best(&attempts).unwrap().draft.title(), "B");
    }

    #[test]
    fn test_disclaimer_text() {
        assert_eq!(
            exhausted_disclaimer(3),
            "Note: This story did not fully meet all quality thresholds after 3 attempts. \
             This is the best version generated."
        );
        assert!(exhausted_disclaimer(1).contains("after 1 attempt."));
    }

    #[tokio::test]
    async fn test_immediate_pass() {
        let mut harness = StoryHarness::new();
        harness
            .expect_story("The Sleepy Bunny", "Once upon a time a bunny slept.")
            .expect_judge(5, 5, 5, 5, 5);

        let result = harness.orchestrator().run(&sample_brief()).await.unwrap();

        assert_passed_on(&result, 0);
        assert_eq!(result.draft().title(), "The Sleepy Bunny");
        assert_eq!(result.judge_parse_failures, 0);
        assert!(!result.revision_used);
        assert_eq!(harness.call_count(), 2);
    }

    #[tokio::test]
    async fn test_exhausted_returns_highest_average() {
        let mut harness = StoryHarness::new();
        harness
            .expect_story("First", "one")
            .expect_judge(3, 3, 3, 3, 3)
            .expect_story("Second", "two")
            .expect_judge(4, 3, 4, 3, 3)
            .expect_story("Third", "three")
            .expect_judge(3, 3, 4, 3, 3);

        let result = harness.orchestrator().run(&sample_brief()).await.unwrap();

        assert_not_passed(&result);
        assert_eq!(result.retry_count, 2);
        assert_eq!(result.all_attempts.len(), 3);
        assert_eq!(result.draft().title(), "Second");
        assert_eq!(result.final_draft.average(), 3.4);
        assert_eq!(result.disclaimer.as_deref(), Some(exhausted_disclaimer(3).as_str()));
    }

    #[tokio::test]
    async fn test_exhausted_tie_keeps_earliest() {
        let mut harness = StoryHarness::new();
        harness
            .expect_story("First", "one")
            .expect_judge(3, 3, 4, 3, 3)
            .expect_story("Second", "two")
            .expect_judge(4, 3, 3, 3, 3)
            .expect_story("Third", "three")
            .expect_judge(3, 3, 3, 3, 3);

        let result = harness.orchestrator().run(&sample_brief()).await.unwrap();
        assert_eq!(result.draft().title(), "First");
    }

    #[tokio::test]
    async fn test_stops_on_first_passing_attempt() {
        let mut harness = StoryHarness::new();
        harness
            .expect_story("First", "one")
            .expect_judge(3, 4, 4, 4, 4)
            .expect_story("Second", "two")
            .expect_judge(4, 4, 4, 4, 4)
            // never consumed
            .expect_story("Third", "three")
            .expect_judge(5, 5, 5, 5, 5);

        let result = harness.orchestrator().run(&sample_brief()).await.unwrap();

        assert_passed_on(&result, 1);
        assert_eq!(result.draft().title(), "Second");
        assert_eq!(harness.call_count(), 4);
        assert_eq!(harness.model.remaining(), 2);
    }

    #[tokio::test]
    async fn test_feedback_comes_from_best_attempt() {
        let mut harness = StoryHarness::new();
        harness
            .expect_story("First", "one")
            .expect_judge(4, 4, 4, 2, 3)
            .expect_story("Second", "two")
            .expect_judge(3, 3, 3, 3, 3)
            .expect_story("Third", "three")
            .expect_judge(5, 5, 5, 5, 5);

        harness.orchestrator().run(&sample_brief()).await.unwrap();

        let calls = harness.model.calls();
        assert!(!calls[0].prompt.contains("PREVIOUS ATTEMPT FEEDBACK"));
        assert!(calls[2].prompt.contains("ENGAGEMENT (score 2): Engagement feedback."));

        let third = &calls[4].prompt;
        assert!(third.contains("ENGAGEMENT (score 2): Engagement feedback."));
        assert!(third.contains("LANGUAGE_SIMPLICITY (score 3): Language simplicity feedback."));
        assert!(!third.contains("SAFETY (score 3)"));
    }

    #[tokio::test]
    async fn test_result_serializes_to_json() {
        let mut harness = StoryHarness::new();
        harness.expect_story("Moon Boat", "A boat sailed home.").expect_judge(5, 4, 5, 4, 4);

        let result = harness.orchestrator().run(&sample_brief()).await.unwrap();
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["final_draft"]["draft"]["title"], "Moon Boat");
        assert_eq!(json["final_draft"]["draft"]["word_count"], 4);
        assert_eq!(json["final_draft"]["score"]["age_fit"]["score"], 4);
        assert_eq!(json["passed_threshold"], true);
        assert!(json["disclaimer"].is_null());
        assert_eq!(json["all_attempts"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_calls_use_configured_settings() {
        let mut harness = StoryHarness::new();
        harness.expect_story("T", "body").expect_judge(5, 5, 5, 5, 5);

        harness.orchestrator().run(&sample_brief()).await.unwrap();

        let calls = harness.model.calls();
        assert_eq!(calls[0].settings, GenerationSettings::CREATIVE);
        assert_eq!(calls[1].settings, GenerationSettings::EVALUATE);
    }

    #[tokio::test]
    async fn test_malformed_judge_is_asked_once_more() {
        let mut harness = StoryHarness::new();
        harness
            .expect_story("T", "body")
            .expect_reply("I loved this story!")
            .expect_judge(5, 5, 5, 5, 5);

        let result = harness.orchestrator().run(&sample_brief()).await.unwrap();

        assert_passed_on(&result, 0);
        assert_eq!(result.judge_parse_failures, 0);
        assert_eq!(harness.call_count(), 3);
    }

    #[tokio::test]
    async fn test_double_parse_failure_uses_default_score() {
        let config = StoryConfig::new().with_max_attempts(1);
        let mut harness = StoryHarness::with_config(config);
        harness
            .expect_story("T", "body")
            .expect_reply("not a rubric")
            .expect_reply("still not a rubric");

        let result = harness.orchestrator().run(&sample_brief()).await.unwrap();

        assert_not_passed(&result);
        assert_eq!(result.judge_parse_failures, 1);
        assert!(result.score().is_default_failing());
        assert_eq!(result.score().feedback(crate::rubric::Dimension::Safety), PARSE_FAILURE_FEEDBACK);
        assert_eq!(result.final_draft.average(), 3.0);
        assert_eq!(result.disclaimer.as_deref(), Some(exhausted_disclaimer(1).as_str()));
        assert_eq!(harness.call_count(), 3);
    }

    #[tokio::test]
    async fn test_parse_failures_accumulate_across_attempts() {
        let mut harness = StoryHarness::new();
        harness
            .expect_story("First", "one")
            .expect_reply("?")
            .expect_reply("?")
            .expect_story("Second", "two")
            .expect_reply("?")
            .expect_reply("?")
            .expect_story("Third", "three")
            .expect_judge(4, 4, 4, 4, 4);

        let result = harness.orchestrator().run(&sample_brief()).await.unwrap();

        assert_passed_on(&result, 2);
        assert_eq!(result.judge_parse_failures, 2);
    }

    #[tokio::test]
    async fn test_model_failure_propagates() {
        let mut harness = StoryHarness::new();
        harness
            .expect_story("First", "one")
            .expect_failure("rate limited");

        let err = harness.orchestrator().run(&sample_brief()).await.unwrap_err();
        assert!(err.to_string().contains("rate limited"));
        assert_eq!(harness.call_count(), 2);
    }

    #[tokio::test]
    async fn test_revision_appends_one_attempt() {
        let mut harness = StoryHarness::new();
        harness.expect_story("Original", "one").expect_judge(5, 5, 5, 5, 5);
        let orchestrator = harness.orchestrator();
        let first = orchestrator.run(&sample_brief()).await.unwrap();

        harness.expect_story("Revised", "two").expect_judge(4, 4, 4, 4, 4);
        let revised = orchestrator
            .revise(&first, "Add a friendly owl.", &sample_brief())
            .await
            .unwrap();

        assert_eq!(revised.all_attempts.len(), first.all_attempts.len() + 1);
        assert_eq!(revised.retry_count, first.retry_count + 1);
        assert_eq!(revised.draft().title(), "Revised");
        assert!(revised.passed_threshold);
        assert!(revised.disclaimer.is_none());
        assert!(revised.revision_used);

        let calls = harness.model.calls();
        assert!(calls[2].prompt.contains("Title: Original"));
        assert!(calls[2].prompt.contains("Add a friendly owl."));
    }

    #[tokio::test]
    async fn test_failed_revision_gets_revision_disclaimer() {
        let mut harness = StoryHarness::new();
        harness
            .expect_story("A", "one")
            .expect_judge(3, 3, 3, 3, 3)
            .expect_story("B", "two")
            .expect_judge(3, 3, 3, 3, 3)
            .expect_story("C", "three")
            .expect_judge(3, 3, 3, 3, 3);
        let orchestrator = harness.orchestrator();
        let first = orchestrator.run(&sample_brief()).await.unwrap();

        harness
            .expect_story("Revised", "four")
            .expect_reply("??")
            .expect_reply("??");
        let revised = orchestrator
            .revise(&first, "Make it longer.", &sample_brief())
            .await
            .unwrap();

        assert_eq!(revised.retry_count, 3);
        assert_eq!(revised.all_attempts.len(), 4);
        assert!(!revised.passed_threshold);
        assert_eq!(revised.disclaimer.as_deref(), Some(REVISION_DISCLAIMER));
        assert_eq!(revised.judge_parse_failures, 1);
        // the prior result is unchanged
        assert_eq!(first.all_attempts.len(), 3);
        assert!(!first.revision_used);
    }
}

//! QA tests for the one-shot revision flow.
//!
//! Run with: `cargo test -p bedtime-core --test qa_revision`

use bedtime_core::orchestrator::REVISION_DISCLAIMER;
use bedtime_core::prompts::SAFETY_RULES;
use bedtime_core::testing::StoryHarness;
use bedtime_core::SessionError;

fn passing_session(harness: &mut StoryHarness) {
    harness
        .expect_reply("calming")
        .expect_story("The Lantern Fox", "A fox carried a lantern through the quiet woods.")
        .expect_judge(5, 5, 5, 5, 5);
}

fn failing_session(harness: &mut StoryHarness) {
    harness
        .expect_reply("calming")
        .expect_story("One", "first")
        .expect_judge(3, 3, 3, 3, 3)
        .expect_story("Two", "second")
        .expect_judge(3, 3, 4, 3, 3)
        .expect_story("Three", "third")
        .expect_judge(3, 3, 3, 3, 3);
}

#[tokio::test]
async fn test_revision_after_pass() {
    let mut harness = StoryHarness::new();
    passing_session(&mut harness);
    harness
        .expect_story("The Lantern Fox and the Owl", "A fox and an owl shared a lantern.")
        .expect_judge(5, 4, 5, 4, 5);

    let mut session = harness.session();
    let before = session.start("A fox story").await.unwrap().clone();
    let after = session.revise("Add a wise owl").await.unwrap();

    assert_eq!(after.all_attempts.len(), before.all_attempts.len() + 1);
    assert_eq!(after.retry_count, before.retry_count + 1);
    assert_eq!(after.all_attempts[..before.all_attempts.len()], before.all_attempts[..]);
    assert_eq!(after.draft().title(), "The Lantern Fox and the Owl");
    assert!(after.passed_threshold);
    assert!(after.disclaimer.is_none());
    assert!(after.revision_used);
}

#[tokio::test]
async fn test_revision_after_exhausted_loop_revises_best_draft() {
    let mut harness = StoryHarness::new();
    failing_session(&mut harness);
    harness
        .expect_story("Two, Revised", "second, but softer")
        .expect_judge(3, 4, 3, 4, 4);

    let mut session = harness.session();
    session.start("A story").await.unwrap();
    let revised = session.revise("Make it softer").await.unwrap();

    assert_eq!(revised.retry_count, 3);
    assert_eq!(revised.all_attempts.len(), 4);
    assert!(!revised.passed_threshold);
    assert_eq!(revised.disclaimer.as_deref(), Some(REVISION_DISCLAIMER));

    // the revision prompt is built from the selected best draft
    let calls = harness.model.calls();
    assert_eq!(calls.len(), 9);
    let revision_prompt = &calls[7].prompt;
    assert!(revision_prompt.contains("Title: Two"));
    assert!(revision_prompt.contains("second"));
    assert!(revision_prompt.contains("Make it softer"));
    assert!(revision_prompt.contains(SAFETY_RULES));
}

#[tokio::test]
async fn test_revision_parse_failures_add_to_total() {
    let mut harness = StoryHarness::new();
    harness
        .expect_reply("calming")
        .expect_story("One", "first")
        .expect_reply("oops")
        .expect_reply("oops")
        .expect_story("Two", "second")
        .expect_judge(4, 4, 4, 4, 4)
        .expect_story("Two, Revised", "second again")
        .expect_reply("nope")
        .expect_reply("nope");

    let mut session = harness.session();
    assert_eq!(session.start("A story").await.unwrap().judge_parse_failures, 1);

    let revised = session.revise("Shorter please").await.unwrap();
    assert_eq!(revised.judge_parse_failures, 2);
    assert!(revised.score().is_default_failing());
    assert_eq!(revised.disclaimer.as_deref(), Some(REVISION_DISCLAIMER));
}

#[tokio::test]
async fn test_only_one_revision_per_session() {
    let mut harness = StoryHarness::new();
    passing_session(&mut harness);
    harness
        .expect_story("Again", "again")
        .expect_judge(5, 5, 5, 5, 5);

    let mut session = harness.session();
    session.start("A fox story").await.unwrap();
    session.revise("Add an owl").await.unwrap();

    let err = session.revise("Add a bear").await.unwrap_err();
    assert!(matches!(err, SessionError::RevisionAlreadyUsed));
    assert_eq!(session.result().unwrap().all_attempts.len(), 2);
}

#[tokio::test]
async fn test_revision_model_failure_keeps_previous_result() {
    let mut harness = StoryHarness::new();
    passing_session(&mut harness);
    harness.expect_failure("overloaded");

    let mut session = harness.session();
    session.start("A fox story").await.unwrap();

    let err = session.revise("Add an owl").await.unwrap_err();
    assert!(matches!(err, SessionError::Model(_)));

    let result = session.result().unwrap();
    assert!(!result.revision_used);
    assert_eq!(result.draft().title(), "The Lantern Fox");
    assert!(session.can_revise());
}

#[tokio::test]
async fn test_regenerating_after_revision_is_rejected() {
    let mut harness = StoryHarness::new();
    passing_session(&mut harness);
    harness
        .expect_story("The Lantern Fox and the Owl", "A fox and an owl shared a lantern.")
        .expect_judge(5, 5, 5, 5, 5);

    let mut session = harness.session();
    session.start("A fox story").await.unwrap();
    session.revise("Add a wise owl").await.unwrap();

    let err = session.generate().await.unwrap_err();
    assert!(matches!(err, SessionError::StoryExists));
    let err = session.start("A bear story").await.unwrap_err();
    assert!(matches!(err, SessionError::StoryExists));
    let err = session.revise("Add a bear").await.unwrap_err();
    assert!(matches!(err, SessionError::RevisionAlreadyUsed));

    // nothing past the revision reached the model
    assert_eq!(harness.model.calls().len(), 5);
    let result = session.result().unwrap();
    assert!(result.revision_used);
    assert_eq!(result.draft().title(), "The Lantern Fox and the Owl");
    assert_eq!(session.brief().unwrap().user_request(), "A fox story");
}

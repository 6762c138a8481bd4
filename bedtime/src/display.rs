//! Text layout for stories, scores and session summaries.

use bedtime_core::{Dimension, GenerationResult, RubricScore, StoryBrief};
use std::fmt::Write;

pub const BANNER: &str = "=== Bedtime Story Generator with Quality Judge ===";

pub const FAREWELL: &str = "Thank you for using Bedtime Story Generator! Sweet dreams!";

const RULE_WIDTH: usize = 60;

fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}

/// The goal, audience and length a brief was normalized to.
pub fn brief_summary(brief: &StoryBrief) -> String {
    let (min_age, max_age) = brief.age_band();
    let (min_words, max_words) = brief.target_length();
    format!(
        "Bedtime goal: {}\nTarget audience: Ages {min_age}-{max_age}\nTarget length: {min_words}-{max_words} words",
        brief.bedtime_goal()
    )
}

/// Full report for a result: the story, its outcome and its scores.
///
/// A revised result is headed `REVISED TITLE` and omits the attempt count.
pub fn result_report(result: &GenerationResult) -> String {
    let draft = result.draft();
    let revised = result.revision_used;
    let heading = if revised { "REVISED TITLE" } else { "TITLE" };

    let mut out = String::new();
    let _ = writeln!(out, "{}", rule());
    let _ = writeln!(out, "{heading}: {}", draft.title());
    let _ = writeln!(out, "{}", rule());
    let _ = writeln!(out, "{}", draft.story_text());
    let _ = writeln!(out, "{}", rule());
    let _ = writeln!(out);
    let _ = writeln!(out, "Word count: {}", draft.word_count());
    if !revised {
        let _ = writeln!(out, "Attempts: {}", result.retry_count + 1);
    }
    let _ = writeln!(
        out,
        "Quality threshold met: {}",
        if result.passed_threshold { "Yes" } else { "No" }
    );
    if result.judge_parse_failures > 0 {
        let _ = writeln!(out, "Judge parse failures: {}", result.judge_parse_failures);
    }
    if let Some(disclaimer) = &result.disclaimer {
        let _ = writeln!(out);
        let _ = writeln!(out, "{disclaimer}");
    }

    let _ = writeln!(out);
    out.push_str(&scores(result.score(), revised));
    out
}

/// The five dimension scores with the judge's feedback, then the average.
pub fn scores(score: &RubricScore, revised: bool) -> String {
    let mut out = String::from(if revised {
        "Revised Quality Scores:\n"
    } else {
        "Quality Scores:\n"
    });

    for dimension in Dimension::ALL {
        let _ = writeln!(
            out,
            "  {}: {}/5 - {}",
            dimension.label(),
            score.score(dimension),
            score.feedback(dimension)
        );
    }
    let _ = writeln!(out, "  Average: {:.1}/5", score.average());
    out
}

/// Whether an answer to a yes/no question means yes.
pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "yes" | "y")
}

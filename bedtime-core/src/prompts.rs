//! Prompt text for each model call.

use crate::brief::StoryBrief;
use crate::draft::StoryDraft;

/// Content rules every story prompt carries, for generation and revision alike.
pub const SAFETY_RULES: &str = "\
STRICT SAFETY REQUIREMENTS (Ages 5-10):
- NO graphic violence, intense horror, or scary content
- NO sexual or mature content of any kind
- NO self-harm, drug/alcohol misuse, or sustained cruelty
- Maintain emotionally warm, calming bedtime tone
- Use age-appropriate vocabulary and simple sentence structures";

const OUTPUT_FORMAT: &str = "\
Format:
Title: [Story Title]

[Story text here...]";

pub fn normalize_prompt(user_request: &str) -> String {
    format!(
        r#"Given this bedtime story request, identify an appropriate bedtime goal (e.g., "calming", "comforting", "gentle adventure").

User request: {user_request}

Respond with ONLY the bedtime goal as a short phrase (2-4 words)."#
    )
}

/// Prompt for a fresh draft. `feedback` is the judge's notes on an earlier
/// attempt and is left out when absent or blank.
pub fn story_prompt(brief: &StoryBrief, feedback: Option<&str>) -> String {
    let (min_age, max_age) = brief.age_band();
    let (min_words, max_words) = brief.target_length();

    let feedback_section = match feedback.map(str::trim) {
        Some(feedback) if !feedback.is_empty() => format!(
            "\nPREVIOUS ATTEMPT FEEDBACK:\n{feedback}\n\n\
             Please address the feedback above while maintaining all safety requirements.\n"
        ),
        _ => String::new(),
    };

    format!(
        "You are a bedtime storyteller for children aged {min_age}-{max_age}.

{SAFETY_RULES}

USER REQUEST: {request}
BEDTIME GOAL: {goal}
TARGET LENGTH: {min_words}-{max_words} words
{feedback_section}
Generate a bedtime story with:
1. A clear title on the first line
2. A complete story with beginning, middle, and end
3. Age-appropriate vocabulary and sentence complexity
4. Warm, calming tone suitable for bedtime
5. Word count between {min_words}-{max_words} words

{OUTPUT_FORMAT}
",
        request = brief.user_request(),
        goal = brief.bedtime_goal(),
    )
}

/// Prompt for the one user-directed revision of a finished story.
pub fn revision_prompt(previous: &StoryDraft, revision_request: &str, brief: &StoryBrief) -> String {
    let (min_age, max_age) = brief.age_band();
    let (min_words, max_words) = brief.target_length();

    format!(
        "You are revising a bedtime story for children aged {min_age}-{max_age}.

ORIGINAL STORY:
Title: {title}
{text}

USER REVISION REQUEST:
{revision_request}

IMPORTANT: Maintain ALL safety requirements.
{SAFETY_RULES}

If the user's request would violate safety requirements, politely decline that change and keep the story safe.
Keep the story between {min_words}-{max_words} words.

Generate the revised story with the same format:
{OUTPUT_FORMAT}
",
        title = previous.title(),
        text = previous.story_text(),
    )
}

pub fn judge_prompt(draft: &StoryDraft, brief: &StoryBrief) -> String {
    let (min_age, max_age) = brief.age_band();
    let (min_words, max_words) = brief.target_length();

    format!(
        "You are evaluating a bedtime story for children aged {min_age}-{max_age}.

STORY TITLE: {title}
STORY TEXT:
{text}

WORD COUNT: {word_count}
TARGET: {min_words}-{max_words} words

Evaluate the story on these 5 dimensions (score 1-5 for each):

1. SAFETY (1=inappropriate, 5=perfectly safe for ages {min_age}-{max_age})
   - Check for: violence, horror, mature content, self-harm, drugs/alcohol, cruelty
   - Score 4-5 only if completely appropriate for bedtime

2. AGE_FIT (1=wrong age level, 5=perfect for ages {min_age}-{max_age})
   - Vocabulary complexity
   - Sentence structure
   - Conceptual appropriateness

3. COHERENCE (1=confusing, 5=clear narrative arc)
   - Beginning, middle, end structure
   - Logical flow
   - Story completeness

4. ENGAGEMENT (1=boring, 5=captivating yet calming)
   - Maintains interest
   - Appropriate pacing for bedtime
   - Emotionally warm

5. LANGUAGE_SIMPLICITY (1=too complex, 5=appropriately simple)
   - Word choice for age {min_age}-{max_age}
   - Sentence length
   - Readability

Respond in EXACTLY this format:
SAFETY: [score]
SAFETY_FEEDBACK: [one sentence]
AGE_FIT: [score]
AGE_FIT_FEEDBACK: [one sentence]
COHERENCE: [score]
COHERENCE_FEEDBACK: [one sentence]
ENGAGEMENT: [score]
ENGAGEMENT_FEEDBACK: [one sentence]
LANGUAGE_SIMPLICITY: [score]
LANGUAGE_SIMPLICITY_FEEDBACK: [one sentence]
",
        title = draft.title(),
        text = draft.story_text(),
        word_count = draft.word_count(),
    )
}

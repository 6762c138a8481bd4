//! Five-dimension rubric scores and the pass threshold.
//!
//! A [`RubricScore`] is built once per judged draft and never changes
//! afterwards. Every dimension holds an integer in `1..=5` plus a non-empty
//! line of judge feedback; the constructor rejects anything else.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Lowest score a dimension may hold.
pub const MIN_SCORE: u8 = 1;

/// Highest score a dimension may hold.
pub const MAX_SCORE: u8 = 5;

/// Minimum score for safety and coherence, and the minimum average.
pub const PASS_SCORE: u8 = 4;

/// Feedback attached to every dimension of [`RubricScore::default_failing`].
pub const PARSE_FAILURE_FEEDBACK: &str = "Judge evaluation failed to parse";

/// Errors from building a score out of raw values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RubricError {
    #[error("score for {dimension} out of range (got {value}, expected 1-5)")]
    OutOfRange { dimension: Dimension, value: u32 },

    #[error("feedback for {dimension} is empty")]
    EmptyFeedback { dimension: Dimension },
}

/// A rubric dimension, in the order the judge reports them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Safety,
    AgeFit,
    Coherence,
    Engagement,
    LanguageSimplicity,
}

impl Dimension {
    pub const ALL: [Dimension; 5] = [
        Dimension::Safety,
        Dimension::AgeFit,
        Dimension::Coherence,
        Dimension::Engagement,
        Dimension::LanguageSimplicity,
    ];

    /// Key used for the score line in judge output, e.g. `AGE_FIT`.
    pub fn key(self) -> &'static str {
        match self {
            Dimension::Safety => "SAFETY",
            Dimension::AgeFit => "AGE_FIT",
            Dimension::Coherence => "COHERENCE",
            Dimension::Engagement => "ENGAGEMENT",
            Dimension::LanguageSimplicity => "LANGUAGE_SIMPLICITY",
        }
    }

    /// Key used for the feedback line in judge output, e.g. `AGE_FIT_FEEDBACK`.
    pub fn feedback_key(self) -> &'static str {
        match self {
            Dimension::Safety => "SAFETY_FEEDBACK",
            Dimension::AgeFit => "AGE_FIT_FEEDBACK",
            Dimension::Coherence => "COHERENCE_FEEDBACK",
            Dimension::Engagement => "ENGAGEMENT_FEEDBACK",
            Dimension::LanguageSimplicity => "LANGUAGE_SIMPLICITY_FEEDBACK",
        }
    }

    /// Human-readable name.
    pub fn label(self) -> &'static str {
        match self {
            Dimension::Safety => "Safety",
            Dimension::AgeFit => "Age Fit",
            Dimension::Coherence => "Coherence",
            Dimension::Engagement => "Engagement",
            Dimension::LanguageSimplicity => "Language Simplicity",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Score and feedback for one dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DimensionScore {
    pub score: u8,
    pub feedback: String,
}

impl DimensionScore {
    pub fn new(score: u8, feedback: impl Into<String>) -> Self {
        Self {
            score,
            feedback: feedback.into(),
        }
    }
}

/// Judge verdict for a single draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RubricScore {
    safety: DimensionScore,
    age_fit: DimensionScore,
    coherence: DimensionScore,
    engagement: DimensionScore,
    language_simplicity: DimensionScore,
}

impl RubricScore {
    /// Build a score, checking every value is in range and every feedback
    /// line is non-empty.
    pub fn new(
        safety: DimensionScore,
        age_fit: DimensionScore,
        coherence: DimensionScore,
        engagement: DimensionScore,
        language_simplicity: DimensionScore,
    ) -> Result<Self, RubricError> {
        let score = Self {
            safety,
            age_fit,
            coherence,
            engagement,
            language_simplicity,
        };

        for dimension in Dimension::ALL {
            let entry = score.entry(dimension);
            if !(MIN_SCORE..=MAX_SCORE).contains(&entry.score) {
                return Err(RubricError::OutOfRange {
                    dimension,
                    value: u32::from(entry.score),
                });
            }
            if entry.feedback.trim().is_empty() {
                return Err(RubricError::EmptyFeedback { dimension });
            }
        }

        Ok(score)
    }

    /// Build a score from entries listed in [`Dimension::ALL`] order.
    pub fn from_entries(entries: [DimensionScore; 5]) -> Result<Self, RubricError> {
        let [safety, age_fit, coherence, engagement, language_simplicity] = entries;
        Self::new(safety, age_fit, coherence, engagement, language_simplicity)
    }

    /// Fallback used when the judge cannot be parsed twice in a row.
    ///
    /// Every dimension is 3, so the average is 3.0 and the score never
    /// meets the threshold.
    pub fn default_failing() -> Self {
        let entry = || DimensionScore::new(3, PARSE_FAILURE_FEEDBACK);
        Self {
            safety: entry(),
            age_fit: entry(),
            coherence: entry(),
            engagement: entry(),
            language_simplicity: entry(),
        }
    }

    pub fn safety(&self) -> u8 {
        self.safety.score
    }

    pub fn age_fit(&self) -> u8 {
        self.age_fit.score
    }

    pub fn coherence(&self) -> u8 {
        self.coherence.score
    }

    pub fn engagement(&self) -> u8 {
        self.engagement.score
    }

    pub fn language_simplicity(&self) -> u8 {
        self.language_simplicity.score
    }

    /// Score and feedback for a dimension.
    pub fn entry(&self, dimension: Dimension) -> &DimensionScore {
        match dimension {
            Dimension::Safety => &self.safety,
            Dimension::AgeFit => &self.age_fit,
            Dimension::Coherence => &self.coherence,
            Dimension::Engagement => &self.engagement,
            Dimension::LanguageSimplicity => &self.language_simplicity,
        }
    }

    pub fn score(&self, dimension: Dimension) -> u8 {
        self.entry(dimension).score
    }

    pub fn feedback(&self, dimension: Dimension) -> &str {
        &self.entry(dimension).feedback
    }

    /// Arithmetic mean of the five scores.
    pub fn average(&self) -> f64 {
        let total: u32 = Dimension::ALL
            .iter()
            .map(|d| u32::from(self.score(*d)))
            .sum();
        f64::from(total) / 5.0
    }

    /// `safety >= 4 && coherence >= 4 && average >= 4.0`.
    pub fn meets_threshold(&self) -> bool {
        self.safety() >= PASS_SCORE
            && self.coherence() >= PASS_SCORE
            && self.average() >= f64::from(PASS_SCORE)
    }

    /// Whether this is the parse-failure fallback rather than a real verdict.
    pub fn is_default_failing(&self) -> bool {
        *self == Self::default_failing()
    }
}

/// Turn the weak dimensions of a score into storyteller feedback.
///
/// One line per dimension scoring below 4, in [`Dimension::ALL`] order:
/// `"<KEY> (score X): <feedback>"`. Empty when every dimension is 4 or more.
pub fn format_feedback(score: &RubricScore) -> String {
    Dimension::ALL
        .iter()
        .filter(|d| score.score(**d) < PASS_SCORE)
        .map(|d| format!("{} (score {}): {}", d.key(), score.score(*d), score.feedback(*d)))
        .collect::<Vec<_>>()
        .join("\n")
}

//! DTOs for answer submission.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::services::scoring::{ScoreOutcome, Submission};

/// Value submitted for a question; its JSON shape follows the question kind.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum SubmittedAnswer {
    /// True/false answers and flashcard self-assessments.
    Flag(bool),
    /// Multiple choice and short answers.
    Text(String),
    /// Multi-select answers.
    Choices(Vec<String>),
    /// Matching answers, left item to right item.
    Pairs(BTreeMap<String, String>),
}

/// Answer to the question currently open in the session.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitAnswerRequest {
    /// Zero-based index of the question answered.
    pub question_index: usize,
    /// Submitted value.
    pub answer: SubmittedAnswer,
    /// Seconds left on the client countdown; clamped into the question's window.
    pub time_remaining_seconds: f64,
}

/// Result of a submission.
#[derive(Debug, Serialize, ToSchema)]
pub struct AnswerOutcome {
    /// False when the submission was a duplicate or arrived after the question closed.
    pub accepted: bool,
    /// Whether the answer matched the key.
    pub correct: bool,
    /// Points credited by this submission.
    pub points_awarded: u32,
    /// Participant score after the submission.
    pub score: u32,
}

impl From<SubmittedAnswer> for Submission {
    fn from(value: SubmittedAnswer) -> Self {
        match value {
            SubmittedAnswer::Flag(flag) => Submission::Flag(flag),
            SubmittedAnswer::Text(text) => Submission::Text(text),
            SubmittedAnswer::Choices(choices) => Submission::Choices(choices),
            SubmittedAnswer::Pairs(pairs) => Submission::Pairs(pairs),
        }
    }
}

impl From<ScoreOutcome> for AnswerOutcome {
    fn from(value: ScoreOutcome) -> Self {
        Self {
            accepted: value.accepted,
            correct: value.correct,
            points_awarded: value.points_awarded,
            score: value.score,
        }
    }
}

impl AnswerOutcome {
    /// Outcome returned for submissions that arrive after their question closed.
    pub fn rejected(score: u32) -> Self {
        Self {
            accepted: false,
            correct: false,
            points_awarded: 0,
            score,
        }
    }
}

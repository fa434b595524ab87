use std::{collections::BTreeSet, time::SystemTime};

use serde::{Deserialize, Serialize};

/// Persisted lifecycle status of an arena session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatusEntity {
    /// Created, not started yet.
    Waiting,
    /// A question is open.
    Active,
    /// Terminal.
    Finished,
}

/// Persisted reason explaining why a session reached `finished`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FinishReasonEntity {
    /// The last question closed.
    Completed,
    /// The host went silent.
    Abandoned,
}

/// Pacing settings chosen by the host when the session was created.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionSettingsEntity {
    /// Countdown length for every question, strictly positive.
    pub time_per_question_seconds: u32,
    /// When true only the host advances; otherwise the pacing timer does.
    pub manual_pace: bool,
}

/// Arena session record, keyed by its shareable code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionEntity {
    /// Six-symbol shareable code, also the primary key.
    pub code: String,
    /// Externally owned quiz definition played in this session.
    pub quiz_id: String,
    /// User that created the session and holds pacing authority.
    pub host_id: String,
    /// Lifecycle status.
    pub status: SessionStatusEntity,
    /// Zero-based index of the open question.
    pub current_question_index: usize,
    /// Number of questions of the quiz when the session was created.
    pub question_count: usize,
    /// Pacing chosen at creation.
    pub settings: SessionSettingsEntity,
    /// Set once the session is finished.
    pub finish_reason: Option<FinishReasonEntity>,
    /// When the current question became visible to participants.
    pub question_started_at: Option<SystemTime>,
    /// Last liveness signal received from the host.
    pub last_heartbeat: SystemTime,
    /// Creation instant.
    pub created_at: SystemTime,
    /// Instant of the last lifecycle write.
    pub updated_at: SystemTime,
    /// Optimistic-concurrency counter bumped by every status or index write.
    pub version: u64,
}

/// Participant row keyed by `(session_code, user_id)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParticipantEntity {
    /// Code of the owning session.
    pub session_code: String,
    /// Caller identity forwarded by the gateway.
    pub user_id: String,
    /// Display name snapshotted at join time.
    pub name: String,
    /// Accumulated points.
    pub score: u32,
    /// Whether the latest graded answer was right.
    pub last_answer_correct: bool,
    /// First join instant, kept across rejoins.
    pub joined_at: SystemTime,
    /// Question indices that were already scored for this participant.
    pub answered_questions: BTreeSet<usize>,
    /// Optimistic-concurrency counter bumped by every score write.
    pub version: u64,
}

/// Question kinds understood by the scoring engine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKindEntity {
    /// One option out of `options`.
    #[serde(alias = "multiple-choice", alias = "mcq")]
    MultipleChoice,
    /// Answered `true` or `false`.
    #[serde(alias = "true-false", alias = "boolean")]
    TrueFalse,
    /// Free text compared case-insensitively.
    #[serde(alias = "short-answer", alias = "text")]
    ShortAnswer,
    /// Every right option out of `options`.
    #[serde(alias = "multi-select", alias = "checkbox")]
    MultiSelect,
    /// Left items paired with right items.
    #[serde(alias = "match")]
    Matching,
    /// Self-assessed by the participant.
    Flashcard,
}

/// Left/right item of a matching question.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchPairEntity {
    /// Prompt side.
    pub left: String,
    /// Expected answer side.
    pub right: String,
}

/// Stored correct answer, shaped after the question kind.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum AnswerKeyEntity {
    /// Expected boolean.
    Flag(bool),
    /// Expected text or option.
    Text(String),
    /// Expected options for multi-select.
    Choices(Vec<String>),
}

/// Question as served by the quiz provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionEntity {
    /// Identifier unique within the quiz.
    pub id: String,
    /// How the question is answered and graded.
    #[serde(rename = "type")]
    pub kind: QuestionKindEntity,
    /// Prompt shown to participants.
    pub question: String,
    /// Choices for multiple choice and multi-select questions.
    #[serde(default)]
    pub options: Vec<String>,
    /// Pairs for matching questions.
    #[serde(default)]
    pub pairs: Vec<MatchPairEntity>,
    /// Answer key; absent for flashcards.
    #[serde(default)]
    pub answer: Option<AnswerKeyEntity>,
    /// Author-assigned value.
    #[serde(default)]
    pub points: u32,
}

/// Read-only quiz definition owned by an external collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuizEntity {
    /// Identifier used by hosts when creating a session.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Questions in play order.
    pub questions: Vec<QuestionEntity>,
}

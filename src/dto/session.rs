//! DTOs for session lifecycle routes.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    dto::format_system_time,
    state::session::{FinishReason, Session, SessionStatus},
};

/// Payload used by a host to open a new session.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateSessionRequest {
    /// Quiz to play, resolved through the configured provider.
    #[validate(length(min = 1, max = 128))]
    pub quiz_id: String,
    /// Countdown per question, in seconds.
    #[validate(range(min = 1, max = 3600))]
    pub time_per_question_seconds: u32,
    /// When true only the host advances; otherwise the server timer does.
    #[serde(default)]
    pub manual_pace: bool,
}

/// Session lifecycle status as exposed over HTTP.
#[derive(Debug, Clone, Copy, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatusDto {
    /// Created, not started yet.
    Waiting,
    /// A question is open.
    Active,
    /// Terminal.
    Finished,
}

/// Why a session finished.
#[derive(Debug, Clone, Copy, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FinishReasonDto {
    /// The last question closed.
    Completed,
    /// The host went silent and the reaper finalized it.
    Abandoned,
}

/// Public snapshot of a session, also carried by the session SSE stream.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionSummary {
    /// Six-symbol share code.
    pub code: String,
    /// Quiz played in the session.
    pub quiz_id: String,
    /// User allowed to drive the session.
    pub host_id: String,
    /// Lifecycle status.
    pub status: SessionStatusDto,
    /// Zero-based index of the open question.
    pub current_question_index: usize,
    /// Number of questions in the quiz.
    pub question_count: usize,
    /// Countdown per question.
    pub time_per_question_seconds: u32,
    /// Whether only the host advances.
    pub manual_pace: bool,
    /// Set once the session is finished.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReasonDto>,
    /// RFC 3339 instant the current question opened; clients seed their countdown from it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question_started_at: Option<String>,
    /// RFC 3339 creation instant.
    pub created_at: String,
    /// RFC 3339 instant of the last lifecycle write.
    pub updated_at: String,
    /// Grows by one with every lifecycle write.
    pub version: u64,
}

/// Optional guard for `advance`: only move on if this is still the current index.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct AdvanceQuery {
    /// Index the caller believes is open.
    pub from_index: Option<usize>,
}

impl From<SessionStatus> for SessionStatusDto {
    fn from(value: SessionStatus) -> Self {
        match value {
            SessionStatus::Waiting => SessionStatusDto::Waiting,
            SessionStatus::Active => SessionStatusDto::Active,
            SessionStatus::Finished => SessionStatusDto::Finished,
        }
    }
}

impl From<FinishReason> for FinishReasonDto {
    fn from(value: FinishReason) -> Self {
        match value {
            FinishReason::Completed => FinishReasonDto::Completed,
            FinishReason::Abandoned => FinishReasonDto::Abandoned,
        }
    }
}

impl From<Session> for SessionSummary {
    fn from(value: Session) -> Self {
        Self {
            code: value.code,
            quiz_id: value.quiz_id,
            host_id: value.host_id,
            status: value.status.into(),
            current_question_index: value.current_question_index,
            question_count: value.question_count,
            time_per_question_seconds: value.settings.time_per_question_seconds,
            manual_pace: value.settings.manual_pace,
            finish_reason: value.finish_reason.map(Into::into),
            question_started_at: value.question_started_at.map(format_system_time),
            created_at: format_system_time(value.created_at),
            updated_at: format_system_time(value.updated_at),
            version: value.version,
        }
    }
}

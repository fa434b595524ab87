//! DTOs for the participant registry and leaderboard.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    dto::{format_system_time, session::SessionStatusDto},
    services::leaderboard::Standing,
    state::session::Participant,
};

/// Join payload; the display name defaults to the `X-User-Name` header.
#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct JoinRequest {
    /// Display name; falls back to `X-User-Name`, then to the user id.
    #[validate(length(min = 1, max = 64))]
    pub name: Option<String>,
}

/// Participant as returned by the registry routes.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ParticipantSummary {
    /// Caller identity forwarded by the gateway.
    pub user_id: String,
    /// Display name.
    pub name: String,
    /// Accumulated points.
    pub score: u32,
    /// Whether the latest graded answer was right.
    pub last_answer_correct: bool,
    /// RFC 3339 join instant.
    pub joined_at: String,
    /// Indices of the questions already scored.
    pub answered_questions: Vec<usize>,
}

/// One ranked row of the leaderboard.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LeaderboardEntry {
    /// 1-based rank.
    pub position: usize,
    /// Caller identity forwarded by the gateway.
    pub user_id: String,
    /// Display name.
    pub name: String,
    /// Accumulated points.
    pub score: u32,
    /// Whether the latest graded answer was right.
    pub last_answer_correct: bool,
}

/// Ranked standings of a session.
#[derive(Debug, Serialize, ToSchema)]
pub struct LeaderboardResponse {
    /// Session code.
    pub code: String,
    /// Session status when the board was read.
    pub status: SessionStatusDto,
    /// Entries ordered by position.
    pub entries: Vec<LeaderboardEntry>,
}

/// Payload of the `participants.snapshot` SSE event.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RosterSnapshot {
    /// Session code.
    pub code: String,
    /// Grows with every committed join or score write.
    pub revision: u64,
    /// Entries ordered by position.
    pub participants: Vec<LeaderboardEntry>,
}

impl From<Participant> for ParticipantSummary {
    fn from(value: Participant) -> Self {
        Self {
            user_id: value.user_id,
            name: value.name,
            score: value.score,
            last_answer_correct: value.last_answer_correct,
            joined_at: format_system_time(value.joined_at),
            answered_questions: value.answered_questions.into_iter().collect(),
        }
    }
}

impl From<&Standing> for LeaderboardEntry {
    fn from(value: &Standing) -> Self {
        Self {
            position: value.position,
            user_id: value.participant.user_id.clone(),
            name: value.participant.name.clone(),
            score: value.participant.score,
            last_answer_correct: value.participant.last_answer_correct,
        }
    }
}

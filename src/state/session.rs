use std::{collections::BTreeSet, time::Duration, time::SystemTime};

use crate::dao::models::{
    FinishReasonEntity, ParticipantEntity, SessionEntity, SessionSettingsEntity,
    SessionStatusEntity,
};

/// Lifecycle status of an arena session. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SessionStatus {
    /// Lobby: participants may join, no question is shown yet.
    Waiting,
    /// Questions are being played.
    Active,
    /// Terminal state; see [`FinishReason`].
    Finished,
}

/// Why a session reached [`SessionStatus::Finished`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    /// The last question was advanced past.
    Completed,
    /// The reaper finalized a session whose host went silent.
    Abandoned,
}

/// Pacing settings fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// Countdown per question, in whole seconds.
    pub time_per_question_seconds: u32,
    /// Host-paced when true, timer-paced otherwise.
    pub manual_pace: bool,
}

impl SessionSettings {
    /// Countdown per question.
    pub fn time_per_question(&self) -> Duration {
        Duration::from_secs(u64::from(self.time_per_question_seconds))
    }
}

/// Runtime view of a session record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Six-symbol share code.
    pub code: String,
    /// Quiz played in the session.
    pub quiz_id: String,
    /// User allowed to drive the session.
    pub host_id: String,
    /// Lifecycle status.
    pub status: SessionStatus,
    /// Zero-based index of the open question.
    pub current_question_index: usize,
    /// Number of questions in the quiz.
    pub question_count: usize,
    /// Pacing chosen at creation.
    pub settings: SessionSettings,
    /// Set once the session is finished.
    pub finish_reason: Option<FinishReason>,
    /// When the open question became visible.
    pub question_started_at: Option<SystemTime>,
    /// Last liveness signal of the host.
    pub last_heartbeat: SystemTime,
    /// Creation instant.
    pub created_at: SystemTime,
    /// Instant of the last lifecycle write.
    pub updated_at: SystemTime,
    /// Grows by one with every lifecycle write.
    pub version: u64,
}

impl Session {
    /// Fresh `waiting` session pointing at the first question.
    pub fn new(
        code: String,
        quiz_id: String,
        host_id: String,
        question_count: usize,
        settings: SessionSettings,
        now: SystemTime,
    ) -> Self {
        Self {
            code,
            quiz_id,
            host_id,
            status: SessionStatus::Waiting,
            current_question_index: 0,
            question_count,
            settings,
            finish_reason: None,
            question_started_at: None,
            last_heartbeat: now,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    /// Whether `user_id` hosts this session.
    pub fn is_host(&self, user_id: &str) -> bool {
        self.host_id == user_id
    }

    /// Whether the open question is the quiz's last.
    pub fn is_last_question(&self) -> bool {
        self.current_question_index + 1 >= self.question_count
    }

    /// Whether the server timer drives this session right now.
    pub fn is_timer_paced(&self) -> bool {
        self.status == SessionStatus::Active && !self.settings.manual_pace
    }
}

/// A user that joined a session, with their running score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    /// Code of the owning session.
    pub session_code: String,
    /// Caller identity forwarded by the gateway.
    pub user_id: String,
    /// Display name.
    pub name: String,
    /// Accumulated points.
    pub score: u32,
    /// Whether the latest graded answer was right.
    pub last_answer_correct: bool,
    /// First join instant, kept across rejoins.
    pub joined_at: SystemTime,
    /// Question indices already scored for this participant.
    pub answered_questions: BTreeSet<usize>,
    /// Optimistic-concurrency counter of the row.
    pub version: u64,
}

impl Participant {
    /// Whether `question_index` was already credited.
    pub fn has_answered(&self, question_index: usize) -> bool {
        self.answered_questions.contains(&question_index)
    }
}

impl From<SessionStatusEntity> for SessionStatus {
    fn from(value: SessionStatusEntity) -> Self {
        match value {
            SessionStatusEntity::Waiting => SessionStatus::Waiting,
            SessionStatusEntity::Active => SessionStatus::Active,
            SessionStatusEntity::Finished => SessionStatus::Finished,
        }
    }
}

impl From<SessionStatus> for SessionStatusEntity {
    fn from(value: SessionStatus) -> Self {
        match value {
            SessionStatus::Waiting => SessionStatusEntity::Waiting,
            SessionStatus::Active => SessionStatusEntity::Active,
            SessionStatus::Finished => SessionStatusEntity::Finished,
        }
    }
}

impl From<FinishReasonEntity> for FinishReason {
    fn from(value: FinishReasonEntity) -> Self {
        match value {
            FinishReasonEntity::Completed => FinishReason::Completed,
            FinishReasonEntity::Abandoned => FinishReason::Abandoned,
        }
    }
}

impl From<FinishReason> for FinishReasonEntity {
    fn from(value: FinishReason) -> Self {
        match value {
            FinishReason::Completed => FinishReasonEntity::Completed,
            FinishReason::Abandoned => FinishReasonEntity::Abandoned,
        }
    }
}

impl From<SessionEntity> for Session {
    fn from(value: SessionEntity) -> Self {
        Self {
            code: value.code,
            quiz_id: value.quiz_id,
            host_id: value.host_id,
            status: value.status.into(),
            current_question_index: value.current_question_index,
            question_count: value.question_count,
            settings: SessionSettings {
                time_per_question_seconds: value.settings.time_per_question_seconds,
                manual_pace: value.settings.manual_pace,
            },
            finish_reason: value.finish_reason.map(Into::into),
            question_started_at: value.question_started_at,
            last_heartbeat: value.last_heartbeat,
            created_at: value.created_at,
            updated_at: value.updated_at,
            version: value.version,
        }
    }
}

impl From<Session> for SessionEntity {
    fn from(value: Session) -> Self {
        Self {
            code: value.code,
            quiz_id: value.quiz_id,
            host_id: value.host_id,
            status: value.status.into(),
            current_question_index: value.current_question_index,
            question_count: value.question_count,
            settings: SessionSettingsEntity {
                time_per_question_seconds: value.settings.time_per_question_seconds,
                manual_pace: value.settings.manual_pace,
            },
            finish_reason: value.finish_reason.map(Into::into),
            question_started_at: value.question_started_at,
            last_heartbeat: value.last_heartbeat,
            created_at: value.created_at,
            updated_at: value.updated_at,
            version: value.version,
        }
    }
}

impl From<ParticipantEntity> for Participant {
    fn from(value: ParticipantEntity) -> Self {
        Self {
            session_code: value.session_code,
            user_id: value.user_id,
            name: value.name,
            score: value.score,
            last_answer_correct: value.last_answer_correct,
            joined_at: value.joined_at,
            answered_questions: value.answered_questions,
            version: value.version,
        }
    }
}

impl From<Participant> for ParticipantEntity {
    fn from(value: Participant) -> Self {
        Self {
            session_code: value.session_code,
            user_id: value.user_id,
            name: value.name,
            score: value.score,
            last_answer_correct: value.last_answer_correct,
            joined_at: value.joined_at,
            answered_questions: value.answered_questions,
            version: value.version,
        }
    }
}

use std::collections::BTreeSet;

use mongodb::bson::{DateTime, Document, doc};
use serde::{Deserialize, Serialize};

use super::error::{MongoDaoError, MongoResult};
use crate::dao::models::{
    FinishReasonEntity, ParticipantEntity, QuestionEntity, QuizEntity, SessionEntity,
    SessionSettingsEntity, SessionStatusEntity,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoSessionDocument {
    #[serde(rename = "_id")]
    code: String,
    quiz_id: String,
    host_id: String,
    status: SessionStatusEntity,
    current_question_index: i64,
    question_count: i64,
    settings: MongoSettingsDocument,
    #[serde(default)]
    finish_reason: Option<FinishReasonEntity>,
    #[serde(default)]
    question_started_at: Option<DateTime>,
    last_heartbeat: DateTime,
    created_at: DateTime,
    updated_at: DateTime,
    version: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MongoSettingsDocument {
    time_per_question_seconds: i64,
    manual_pace: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoParticipantDocument {
    session_code: String,
    user_id: String,
    name: String,
    score: i64,
    #[serde(default)]
    last_answer_correct: bool,
    joined_at: DateTime,
    #[serde(default)]
    answered_questions: Vec<i64>,
    version: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoQuizDocument {
    #[serde(rename = "_id")]
    id: String,
    title: String,
    #[serde(default)]
    questions: Vec<QuestionEntity>,
}

fn corrupted(key: &str, field: &'static str) -> MongoDaoError {
    MongoDaoError::CorruptedDocument {
        key: key.to_owned(),
        field,
    }
}

impl From<SessionEntity> for MongoSessionDocument {
    fn from(value: SessionEntity) -> Self {
        Self {
            code: value.code,
            quiz_id: value.quiz_id,
            host_id: value.host_id,
            status: value.status,
            current_question_index: value.current_question_index as i64,
            question_count: value.question_count as i64,
            settings: MongoSettingsDocument {
                time_per_question_seconds: i64::from(value.settings.time_per_question_seconds),
                manual_pace: value.settings.manual_pace,
            },
            finish_reason: value.finish_reason,
            question_started_at: value.question_started_at.map(DateTime::from_system_time),
            last_heartbeat: DateTime::from_system_time(value.last_heartbeat),
            created_at: DateTime::from_system_time(value.created_at),
            updated_at: DateTime::from_system_time(value.updated_at),
            version: value.version as i64,
        }
    }
}

impl TryFrom<MongoSessionDocument> for SessionEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoSessionDocument) -> MongoResult<Self> {
        let key = value.code.as_str();
        let current_question_index = usize::try_from(value.current_question_index)
            .map_err(|_| corrupted(key, "current_question_index"))?;
        let question_count =
            usize::try_from(value.question_count).map_err(|_| corrupted(key, "question_count"))?;
        let time_per_question_seconds = u32::try_from(value.settings.time_per_question_seconds)
            .map_err(|_| corrupted(key, "settings.time_per_question_seconds"))?;
        let version = u64::try_from(value.version).map_err(|_| corrupted(key, "version"))?;

        Ok(Self {
            code: value.code,
            quiz_id: value.quiz_id,
            host_id: value.host_id,
            status: value.status,
            current_question_index,
            question_count,
            settings: SessionSettingsEntity {
                time_per_question_seconds,
                manual_pace: value.settings.manual_pace,
            },
            finish_reason: value.finish_reason,
            question_started_at: value.question_started_at.map(DateTime::to_system_time),
            last_heartbeat: value.last_heartbeat.to_system_time(),
            created_at: value.created_at.to_system_time(),
            updated_at: value.updated_at.to_system_time(),
            version,
        })
    }
}

impl From<ParticipantEntity> for MongoParticipantDocument {
    fn from(value: ParticipantEntity) -> Self {
        Self {
            session_code: value.session_code,
            user_id: value.user_id,
            name: value.name,
            score: i64::from(value.score),
            last_answer_correct: value.last_answer_correct,
            joined_at: DateTime::from_system_time(value.joined_at),
            answered_questions: value
                .answered_questions
                .into_iter()
                .map(|index| index as i64)
                .collect(),
            version: value.version as i64,
        }
    }
}

impl TryFrom<MongoParticipantDocument> for ParticipantEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoParticipantDocument) -> MongoResult<Self> {
        let key = format!("{}/{}", value.session_code, value.user_id);
        let score = u32::try_from(value.score).map_err(|_| corrupted(&key, "score"))?;
        let version = u64::try_from(value.version).map_err(|_| corrupted(&key, "version"))?;
        let answered_questions = value
            .answered_questions
            .into_iter()
            .map(usize::try_from)
            .collect::<Result<BTreeSet<_>, _>>()
            .map_err(|_| corrupted(&key, "answered_questions"))?;

        Ok(Self {
            session_code: value.session_code,
            user_id: value.user_id,
            name: value.name,
            score,
            last_answer_correct: value.last_answer_correct,
            joined_at: value.joined_at.to_system_time(),
            answered_questions,
            version,
        })
    }
}

impl From<MongoQuizDocument> for QuizEntity {
    fn from(value: MongoQuizDocument) -> Self {
        Self {
            id: value.id,
            title: value.title,
            questions: value.questions,
        }
    }
}

pub fn session_filter(code: &str) -> Document {
    doc! { "_id": code }
}

pub fn participant_filter(code: &str, user_id: &str) -> Document {
    doc! { "session_code": code, "user_id": user_id }
}

/// Fields written only when the participant row is first created.
pub fn participant_defaults(joined_at: std::time::SystemTime) -> Document {
    doc! {
        "score": 0_i64,
        "last_answer_correct": false,
        "joined_at": DateTime::from_system_time(joined_at),
        "answered_questions": [],
        "version": 0_i64,
    }
}

/// `$set` for a lifecycle write; `last_heartbeat` belongs to heartbeats alone.
pub fn session_lifecycle_update(session: &SessionEntity) -> Document {
    doc! {
        "$set": {
            "status": status_name(session.status),
            "current_question_index": session.current_question_index as i64,
            "finish_reason": session.finish_reason.map(finish_reason_name),
            "question_started_at": session.question_started_at.map(DateTime::from_system_time),
            "updated_at": DateTime::from_system_time(session.updated_at),
            "version": session.version as i64,
        }
    }
}

pub fn finish_reason_name(reason: FinishReasonEntity) -> &'static str {
    match reason {
        FinishReasonEntity::Completed => "completed",
        FinishReasonEntity::Abandoned => "abandoned",
    }
}

pub fn status_name(status: SessionStatusEntity) -> &'static str {
    match status {
        SessionStatusEntity::Waiting => "waiting",
        SessionStatusEntity::Active => "active",
        SessionStatusEntity::Finished => "finished",
    }
}

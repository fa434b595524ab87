use std::sync::Arc;

use dashmap::DashMap;
use futures::future::{BoxFuture, ready};

use crate::{
    config::AppConfig,
    dao::{
        backend::StorageBackend,
        models::{AnswerKeyEntity, QuestionEntity, QuestionKindEntity, QuizEntity},
        quiz_provider::{QuizProvider, catalog::QuizCatalog},
        session_store::memory::MemorySessionStore,
        storage::StorageResult,
    },
    dto::session::CreateSessionRequest,
    services::session_service,
    state::{AppState, SharedState, session::Session},
};

pub const QUIZ_ID: &str = "capitals";

pub fn question(id: &str, answer: &str) -> QuestionEntity {
    QuestionEntity {
        id: id.into(),
        kind: QuestionKindEntity::MultipleChoice,
        question: format!("Capital #{id}?"),
        options: vec!["Paris".into(), "Rome".into(), "Oslo".into()],
        pairs: Vec::new(),
        answer: Some(AnswerKeyEntity::Text(answer.into())),
        points: 10,
    }
}

/// Three multiple-choice questions answered Paris, Rome, Oslo.
pub fn capitals_quiz() -> QuizEntity {
    QuizEntity {
        id: QUIZ_ID.into(),
        title: "Capitals".into(),
        questions: vec![
            question("1", "Paris"),
            question("2", "Rome"),
            question("3", "Oslo"),
        ],
    }
}

/// Shared state over an in-memory store and the capitals catalog.
pub fn arena_state() -> SharedState {
    arena_state_with(
        AppConfig::default(),
        Arc::new(QuizCatalog::from_quizzes([capitals_quiz()])),
    )
}

pub fn arena_state_with(config: AppConfig, quizzes: Arc<dyn QuizProvider>) -> SharedState {
    AppState::with_backend(
        config,
        StorageBackend {
            sessions: Arc::new(MemorySessionStore::new()),
            quizzes,
        },
    )
}

/// Quiz provider whose definitions can be edited while sessions run.
#[derive(Clone, Default)]
pub struct EditableQuizzes {
    quizzes: Arc<DashMap<String, QuizEntity>>,
}

impl EditableQuizzes {
    pub fn put(&self, quiz: QuizEntity) {
        self.quizzes.insert(quiz.id.clone(), quiz);
    }
}

impl QuizProvider for EditableQuizzes {
    fn find_quiz(&self, id: String) -> BoxFuture<'static, StorageResult<Option<QuizEntity>>> {
        let found = self.quizzes.get(&id).map(|quiz| quiz.clone());
        Box::pin(ready(Ok(found)))
    }
}

/// Session hosted by `host` with 10 seconds per question.
pub async fn create_session(state: &SharedState, manual_pace: bool) -> Session {
    session_service::create(
        state,
        "host",
        CreateSessionRequest {
            quiz_id: QUIZ_ID.into(),
            time_per_question_seconds: 10,
            manual_pace,
        },
    )
    .await
    .unwrap()
}

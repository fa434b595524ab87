use std::sync::Arc;

use quiz_arena_back::{
    config::AppConfig,
    dao::{
        backend::StorageBackend,
        models::{AnswerKeyEntity, QuestionEntity, QuestionKindEntity, QuizEntity},
        quiz_provider::catalog::QuizCatalog,
        session_store::memory::MemorySessionStore,
    },
    state::{AppState, SharedState},
};

fn question(id: &str, answer: &str) -> QuestionEntity {
    QuestionEntity {
        id: id.into(),
        kind: QuestionKindEntity::ShortAnswer,
        question: format!("Question {id}"),
        options: Vec::new(),
        pairs: Vec::new(),
        answer: Some(AnswerKeyEntity::Text(answer.into())),
        points: 0,
    }
}

/// In-memory arena serving the three-question `trivia` quiz.
pub fn arena() -> SharedState {
    let quiz = QuizEntity {
        id: "trivia".into(),
        title: "Trivia".into(),
        questions: vec![question("q1", "one"), question("q2", "two"), question("q3", "three")],
    };
    AppState::with_backend(
        AppConfig::default(),
        StorageBackend {
            sessions: Arc::new(MemorySessionStore::new()),
            quizzes: Arc::new(QuizCatalog::from_quizzes([quiz])),
        },
    )
}

use std::sync::Arc;

use tracing::{debug, warn};

use crate::{
    dao::models::SessionStatusEntity,
    error::ServiceError,
    state::{SharedState, quiz::Quiz, session::Session},
};

/// Resolve a quiz through the configured provider.
pub async fn fetch_quiz(state: &SharedState, quiz_id: &str) -> Result<Arc<Quiz>, ServiceError> {
    let provider = state.quiz_provider().await?;
    let entity = provider
        .find_quiz(quiz_id.to_owned())
        .await?
        .ok_or_else(|| ServiceError::QuizNotFound(quiz_id.to_owned()))?;
    Ok(Arc::new(Quiz::try_from(entity)?))
}

/// Pin `quiz` to session `code`; the first pin wins.
pub fn pin_quiz(state: &SharedState, code: &str, quiz: Arc<Quiz>) -> Arc<Quiz> {
    state
        .session_quizzes()
        .entry(code.to_owned())
        .or_insert(quiz)
        .clone()
}

/// Forget the quiz pinned to `code`, if any.
pub fn release_quiz(state: &SharedState, code: &str) {
    if state.session_quizzes().remove(code).is_some() {
        debug!(%code, "session quiz released");
    }
}

/// Quiz the session is played with.
///
/// Pinned at creation; a process that never saw the session resolves it again and
/// keeps it until the session finishes.
pub async fn session_quiz(state: &SharedState, session: &Session) -> Result<Arc<Quiz>, ServiceError> {
    if let Some(quiz) = state.session_quizzes().get(&session.code) {
        return Ok(quiz.clone());
    }

    let quiz = fetch_quiz(state, &session.quiz_id).await?;
    if quiz.questions.len() != session.question_count {
        warn!(
            code = %session.code,
            quiz_id = %session.quiz_id,
            expected = session.question_count,
            found = quiz.questions.len(),
            "quiz changed since the session was created"
        );
    }
    Ok(pin_quiz(state, &session.code, quiz))
}

/// Drop pins left behind by sessions that finished or vanished.
pub async fn prune_pins(state: &SharedState) -> Result<usize, ServiceError> {
    let store = state.session_store().await?;
    let codes: Vec<String> = state
        .session_quizzes()
        .iter()
        .map(|entry| entry.key().clone())
        .collect();

    let mut dropped = 0;
    for code in codes {
        let live = matches!(
            store.find_session(code.clone()).await?,
            Some(session) if session.status != SessionStatusEntity::Finished
        );
        if !live && state.session_quizzes().remove(&code).is_some() {
            dropped += 1;
        }
    }
    Ok(dropped)
}

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::{
    dao::storage::StorageError,
    error::ServiceError,
    services::{
        participant_service, quiz_service,
        scoring::{self, ScoreOutcome, Submission},
        session_service::load_session,
        sse_events,
    },
    state::{SharedState, session::SessionStatus},
};

/// Grade an answer to the current question and credit the participant once.
///
/// The score and the answered-question ledger are written together with a version
/// check, retried with a doubling backoff while concurrent writes keep winning.
pub async fn submit_answer(
    state: &SharedState,
    code: &str,
    user_id: &str,
    question_index: usize,
    submission: Submission,
    time_remaining_seconds: f64,
) -> Result<ScoreOutcome, ServiceError> {
    let store = state.session_store().await?;
    let session = load_session(&store, code).await?;

    if question_index >= session.question_count {
        return Err(ServiceError::InvalidInput(format!(
            "question index {question_index} is outside a quiz of {} questions",
            session.question_count
        )));
    }
    if session.status != SessionStatus::Active || session.current_question_index != question_index
    {
        debug!(
            %code,
            user_id,
            question_index,
            current = session.current_question_index,
            status = ?session.status,
            "stale submission"
        );
        return Err(ServiceError::StaleSubmission {
            code: code.to_owned(),
            question_index,
        });
    }

    let quiz = quiz_service::session_quiz(state, &session).await?;
    let question = quiz.question(question_index).ok_or_else(|| {
        ServiceError::InvalidInput(format!(
            "quiz `{}` has no question {question_index}",
            quiz.id
        ))
    })?;
    let correct = scoring::is_correct(&question.key, &submission);
    let points = scoring::award(
        correct,
        time_remaining_seconds,
        session.settings.time_per_question_seconds,
    );

    let policy = state.config().scoring;
    let mut backoff = policy.retry_backoff;
    for attempt in 1..=policy.max_attempts {
        match credit(state, code, user_id, question_index, correct, points).await {
            Ok(Some(outcome)) => {
                if outcome.accepted {
                    info!(
                        %code,
                        user_id,
                        question_index,
                        correct,
                        points,
                        score = outcome.score,
                        "answer scored"
                    );
                    sse_events::publish_roster(state, code).await;
                } else {
                    debug!(%code, user_id, question_index, "duplicate submission ignored");
                }
                return Ok(outcome);
            }
            Ok(None) => {
                debug!(%code, user_id, attempt, "score write lost the version race");
            }
            Err(ServiceError::Unavailable(StorageError::Unavailable { message, .. })) => {
                warn!(%code, user_id, attempt, %message, "score write failed; retrying");
            }
            Err(err) => return Err(err),
        }

        if attempt < policy.max_attempts {
            sleep(backoff).await;
            backoff = backoff.saturating_mul(2).min(Duration::from_secs(1));
        }
    }

    Err(ServiceError::Conflict(format!(
        "could not record the answer of `{user_id}` after {} attempts",
        policy.max_attempts
    )))
}

/// One read-modify-write round; `None` when another writer got there first.
async fn credit(
    state: &SharedState,
    code: &str,
    user_id: &str,
    question_index: usize,
    correct: bool,
    points: u32,
) -> Result<Option<ScoreOutcome>, ServiceError> {
    let store = state.session_store().await?;
    let current = participant_service::find(state, code, user_id).await?;

    if current.has_answered(question_index) {
        return Ok(Some(ScoreOutcome {
            accepted: false,
            correct: false,
            points_awarded: 0,
            score: current.score,
        }));
    }

    let expected_version = current.version;
    let mut next = current;
    next.score = next.score.saturating_add(points);
    next.last_answer_correct = correct;
    next.answered_questions.insert(question_index);
    next.version += 1;
    let score = next.score;

    if store
        .replace_participant(next.into(), expected_version)
        .await?
    {
        Ok(Some(ScoreOutcome {
            accepted: true,
            correct,
            points_awarded: points,
            score,
        }))
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{
        pacing_service::{self, Actor},
        participant_service, session_service,
        test_support::{arena_state, create_session},
    };

    fn text(value: &str) -> Submission {
        Submission::Text(value.into())
    }

    #[tokio::test]
    async fn faster_correct_answers_earn_more() {
        let state = arena_state();
        let session = create_session(&state, true).await;
        participant_service::join(&state, &session.code, "u1", "Ada".into())
            .await
            .unwrap();
        participant_service::join(&state, &session.code, "u2", "Bob".into())
            .await
            .unwrap();
        session_service::start(&state, &session.code, "host")
            .await
            .unwrap();

        let fast = submit_answer(&state, &session.code, "u1", 0, text("paris"), 8.0)
            .await
            .unwrap();
        let slow = submit_answer(&state, &session.code, "u2", 0, text("Paris"), 2.0)
            .await
            .unwrap();

        assert_eq!(fast.points_awarded, 90);
        assert_eq!(slow.points_awarded, 60);
        assert!(fast.accepted && fast.correct);
    }

    #[tokio::test]
    async fn a_question_is_scored_once() {
        let state = arena_state();
        let session = create_session(&state, true).await;
        participant_service::join(&state, &session.code, "u1", "Ada".into())
            .await
            .unwrap();
        session_service::start(&state, &session.code, "host")
            .await
            .unwrap();

        let first = submit_answer(&state, &session.code, "u1", 0, text("Paris"), 10.0)
            .await
            .unwrap();
        let second = submit_answer(&state, &session.code, "u1", 0, text("Paris"), 10.0)
            .await
            .unwrap();

        assert_eq!(first.score, 100);
        assert!(!second.accepted);
        assert_eq!(second.points_awarded, 0);
        assert_eq!(second.score, 100);
    }

    #[tokio::test]
    async fn concurrent_duplicates_credit_once() {
        let state = arena_state();
        let session = create_session(&state, true).await;
        participant_service::join(&state, &session.code, "u1", "Ada".into())
            .await
            .unwrap();
        session_service::start(&state, &session.code, "host")
            .await
            .unwrap();

        let (a, b) = tokio::join!(
            submit_answer(&state, &session.code, "u1", 0, text("Paris"), 5.0),
            submit_answer(&state, &session.code, "u1", 0, text("Paris"), 5.0),
        );
        let accepted = [a.unwrap(), b.unwrap()]
            .iter()
            .filter(|outcome| outcome.accepted)
            .count();
        assert_eq!(accepted, 1);

        let participants = participant_service::list(&state, &session.code)
            .await
            .unwrap();
        assert_eq!(participants[0].score, 75);
    }

    #[tokio::test]
    async fn wrong_answers_score_nothing() {
        let state = arena_state();
        let session = create_session(&state, true).await;
        participant_service::join(&state, &session.code, "u1", "Ada".into())
            .await
            .unwrap();
        session_service::start(&state, &session.code, "host")
            .await
            .unwrap();

        let outcome = submit_answer(&state, &session.code, "u1", 0, text("Rome"), 9.0)
            .await
            .unwrap();
        assert!(outcome.accepted);
        assert!(!outcome.correct);
        assert_eq!(outcome.score, 0);
    }

    #[tokio::test]
    async fn closed_questions_are_stale() {
        let state = arena_state();
        let session = create_session(&state, true).await;
        participant_service::join(&state, &session.code, "u1", "Ada".into())
            .await
            .unwrap();

        let err = submit_answer(&state, &session.code, "u1", 0, text("Paris"), 5.0)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::StaleSubmission { .. }));

        session_service::start(&state, &session.code, "host")
            .await
            .unwrap();
        pacing_service::advance(&state, &session.code, Actor::User("host"), None)
            .await
            .unwrap();
        let err = submit_answer(&state, &session.code, "u1", 0, text("Paris"), 5.0)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::StaleSubmission { .. }));

        let err = submit_answer(&state, &session.code, "u1", 7, text("Paris"), 5.0)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn strangers_cannot_answer() {
        let state = arena_state();
        let session = create_session(&state, true).await;
        session_service::start(&state, &session.code, "host")
            .await
            .unwrap();

        let err = submit_answer(&state, &session.code, "nobody", 0, text("Paris"), 5.0)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }
}

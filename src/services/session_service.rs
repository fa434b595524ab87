use std::{sync::Arc, time::SystemTime};

use async_stream::stream;
use futures::Stream;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::{
    dao::session_store::SessionStore,
    dto::session::CreateSessionRequest,
    error::ServiceError,
    services::{pacing_service, quiz_service},
    state::{
        SharedState,
        code::generate_code,
        hub::SessionFeed,
        session::{Session, SessionSettings, SessionStatus},
        state_machine::SessionEvent,
        transitions::commit_transition,
    },
};

/// Codes drawn before giving up on finding a free one.
const MAX_CODE_ATTEMPTS: usize = 16;

/// Fetch a session or fail with [`ServiceError::SessionNotFound`].
pub(crate) async fn load_session(
    store: &Arc<dyn SessionStore>,
    code: &str,
) -> Result<Session, ServiceError> {
    store
        .find_session(code.to_owned())
        .await?
        .map(Session::from)
        .ok_or_else(|| ServiceError::SessionNotFound(code.to_owned()))
}

pub(crate) fn ensure_host(session: &Session, user_id: &str) -> Result<(), ServiceError> {
    if session.is_host(user_id) {
        Ok(())
    } else {
        Err(ServiceError::NotHost(session.code.clone()))
    }
}

/// Open a `waiting` session for `host_id` on the requested quiz.
pub async fn create(
    state: &SharedState,
    host_id: &str,
    request: CreateSessionRequest,
) -> Result<Session, ServiceError> {
    if request.time_per_question_seconds == 0 {
        return Err(ServiceError::InvalidInput(
            "time_per_question_seconds must be positive".into(),
        ));
    }

    let store = state.session_store().await?;
    let quiz = quiz_service::fetch_quiz(state, &request.quiz_id).await?;
    if quiz.questions.is_empty() {
        return Err(ServiceError::InvalidInput(format!(
            "quiz `{}` has no questions",
            quiz.id
        )));
    }

    let settings = SessionSettings {
        time_per_question_seconds: request.time_per_question_seconds,
        manual_pace: request.manual_pace,
    };

    for attempt in 1..=MAX_CODE_ATTEMPTS {
        let session = Session::new(
            generate_code(),
            quiz.id.clone(),
            host_id.to_owned(),
            quiz.questions.len(),
            settings,
            SystemTime::now(),
        );
        if store.insert_session(session.clone().into()).await? {
            quiz_service::pin_quiz(state, &session.code, quiz);
            info!(
                code = %session.code,
                quiz_id = %session.quiz_id,
                host_id,
                manual_pace = settings.manual_pace,
                "session created"
            );
            return Ok(session);
        }
        debug!(attempt, code = %session.code, "session code already taken");
    }

    Err(ServiceError::Conflict(
        "could not allocate a free session code".into(),
    ))
}

/// Current snapshot of a session.
pub async fn get(state: &SharedState, code: &str) -> Result<Session, ServiceError> {
    let store = state.session_store().await?;
    let session = load_session(&store, code).await?;
    pacing_service::ensure_timer(state, &session);
    Ok(session)
}

/// Move a `waiting` session to its first question. Starting an active session is a no-op.
pub async fn start(state: &SharedState, code: &str, user_id: &str) -> Result<Session, ServiceError> {
    let store = state.session_store().await?;
    let session = load_session(&store, code).await?;
    ensure_host(&session, user_id)?;

    if session.status == SessionStatus::Active {
        debug!(%code, "start on an active session ignored");
        return Ok(session);
    }

    let outcome = commit_transition(state, &session, SessionEvent::Start).await?;
    Ok(outcome.into_session())
}

/// Delete the session and its registry; subscribers receive a terminal event.
pub async fn disband(state: &SharedState, code: &str, user_id: &str) -> Result<(), ServiceError> {
    let store = state.session_store().await?;
    let session = load_session(&store, code).await?;
    ensure_host(&session, user_id)?;

    pacing_service::cancel_timer(state, code);
    if !store.delete_session(code.to_owned()).await? {
        return Err(ServiceError::SessionNotFound(code.to_owned()));
    }
    quiz_service::release_quiz(state, code);
    state.hubs().close(code);

    info!(%code, "session disbanded");
    Ok(())
}

/// Refresh the host liveness signal; does not bump the version nor broadcast.
pub async fn heartbeat(state: &SharedState, code: &str, user_id: &str) -> Result<(), ServiceError> {
    let store = state.session_store().await?;
    let session = load_session(&store, code).await?;
    ensure_host(&session, user_id)?;

    if store
        .touch_heartbeat(code.to_owned(), SystemTime::now())
        .await?
    {
        debug!(%code, "host heartbeat");
        Ok(())
    } else {
        Err(ServiceError::SessionNotFound(code.to_owned()))
    }
}

/// Stream the current snapshot, then every committed change in version order.
///
/// Ends after [`SessionFeed::Disbanded`].
pub async fn subscribe(
    state: &SharedState,
    code: &str,
) -> Result<impl Stream<Item = SessionFeed> + Send + use<>, ServiceError> {
    let store = state.session_store().await?;
    // Subscribe before reading so no commit falls between snapshot and feed.
    let mut receiver = state.hubs().hub(code).subscribe_session();
    let session = load_session(&store, code).await?;
    pacing_service::ensure_timer(state, &session);
    let code = code.to_owned();

    Ok(stream! {
        let mut last_version = session.version;
        yield SessionFeed::Snapshot(session);

        loop {
            match receiver.recv().await {
                Ok(SessionFeed::Snapshot(next)) => {
                    if next.version > last_version {
                        last_version = next.version;
                        yield SessionFeed::Snapshot(next);
                    }
                }
                Ok(SessionFeed::Disbanded) => {
                    yield SessionFeed::Disbanded;
                    break;
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!(%code, skipped, "session subscriber lagged; resyncing");
                    match store.find_session(code.clone()).await {
                        Ok(Some(entity)) => {
                            let current = Session::from(entity);
                            if current.version > last_version {
                                last_version = current.version;
                                yield SessionFeed::Snapshot(current);
                            }
                        }
                        Ok(None) => {
                            yield SessionFeed::Disbanded;
                            break;
                        }
                        Err(err) => warn!(%code, error = %err, "session resync failed"),
                    }
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use futures::{StreamExt, pin_mut};

    use super::*;
    use crate::{
        config::AppConfig,
        dao::quiz_provider::catalog::QuizCatalog,
        services::{
            pacing_service::{self, Actor},
            test_support::{arena_state, arena_state_with, capitals_quiz, create_session},
        },
    };

    fn narrow_hub_state() -> SharedState {
        let config = AppConfig {
            hub_capacity: 1,
            ..AppConfig::default()
        };
        arena_state_with(config, Arc::new(QuizCatalog::from_quizzes([capitals_quiz()])))
    }

    #[tokio::test]
    async fn feed_outlives_the_borrowed_arguments() {
        let state = arena_state();
        let session = create_session(&state, true).await;

        let feed = {
            let state = state.clone();
            let code = session.code.clone();
            subscribe(&state, &code).await.unwrap()
        };
        pin_mut!(feed);
        assert!(matches!(feed.next().await, Some(SessionFeed::Snapshot(s)) if s.version == 0));
    }

    #[tokio::test]
    async fn lagging_subscriber_resyncs_to_the_latest_snapshot() {
        let state = narrow_hub_state();
        let session = create_session(&state, true).await;
        let feed = subscribe(&state, &session.code).await.unwrap();
        pin_mut!(feed);
        assert!(matches!(feed.next().await, Some(SessionFeed::Snapshot(s)) if s.version == 0));

        start(&state, &session.code, "host").await.unwrap();
        for _ in 0..2 {
            pacing_service::advance(&state, &session.code, Actor::User("host"), None)
                .await
                .unwrap();
        }

        match feed.next().await {
            Some(SessionFeed::Snapshot(latest)) => {
                assert_eq!(latest.version, 3);
                assert_eq!(latest.current_question_index, 2);
            }
            other => panic!("unexpected item: {other:?}"),
        }

        disband(&state, &session.code, "host").await.unwrap();
        let mut versions = Vec::new();
        while let Some(item) = feed.next().await {
            match item {
                SessionFeed::Snapshot(snapshot) => versions.push(snapshot.version),
                SessionFeed::Disbanded => break,
            }
        }
        assert!(versions.iter().all(|version| *version > 3));
    }

    #[tokio::test]
    async fn start_is_idempotent_and_host_only() {
        let state = arena_state();
        let session = create_session(&state, true).await;

        let err = start(&state, &session.code, "guest").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotHost(_)));

        let first = start(&state, &session.code, "host").await.unwrap();
        let again = start(&state, &session.code, "host").await.unwrap();
        assert_eq!(first.version, 1);
        assert_eq!(again.version, 1);
    }
}

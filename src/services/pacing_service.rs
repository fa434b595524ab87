//! Question advancement, by the host or by the server-side question timer.

use std::time::{Duration, SystemTime};

use dashmap::mapref::entry::Entry;
use tokio::{task::JoinHandle, time::sleep};
use tracing::{debug, info, warn};

use crate::{
    error::ServiceError,
    services::session_service::{ensure_host, load_session},
    state::{
        PacingTimer, SharedState,
        session::{Session, SessionStatus},
        state_machine::SessionEvent,
        transitions::{TransitionOutcome, commit_transition},
    },
};

/// Who asks for the advance.
#[derive(Debug, Clone, Copy)]
pub enum Actor<'a> {
    /// A user; must be the session host.
    User(&'a str),
    /// The question timer armed for auto-paced sessions.
    Timer,
}

/// Move past the current question, finishing the session after the last one.
///
/// With `from_index`, the call is a no-op unless that is still the current index;
/// racing advances for the same index therefore move the session once.
pub async fn advance(
    state: &SharedState,
    code: &str,
    actor: Actor<'_>,
    from_index: Option<usize>,
) -> Result<Session, ServiceError> {
    let store = state.session_store().await?;
    let session = load_session(&store, code).await?;
    if let Actor::User(user_id) = actor {
        ensure_host(&session, user_id)?;
    }

    if let Some(expected) = from_index {
        if session.status == SessionStatus::Finished || session.current_question_index != expected
        {
            debug!(
                %code,
                expected,
                current = session.current_question_index,
                status = ?session.status,
                "advance already happened"
            );
            return Ok(session);
        }
    }

    match commit_transition(state, &session, SessionEvent::Advance).await? {
        TransitionOutcome::Applied(next) => {
            if next.status == SessionStatus::Finished {
                info!(%code, actor = ?actor, "last question closed; session finished");
            }
            Ok(next)
        }
        TransitionOutcome::Superseded(current) => Ok(current),
    }
}

/// Align the question timer with a freshly committed session.
///
/// Arms a timer for the current index of auto-paced active sessions and cancels it
/// otherwise. Older versions never override a timer armed for a newer one.
pub fn sync_timer(state: &SharedState, session: &Session) {
    match state.pacers().entry(session.code.clone()) {
        Entry::Occupied(mut slot) => {
            let armed = slot.get();
            if armed.version >= session.version {
                return;
            }
            if !session.is_timer_paced() {
                slot.remove().handle.abort();
                return;
            }
            if armed.index == session.current_question_index {
                slot.get_mut().version = session.version;
                return;
            }
            let previous = slot.insert(arm(state, session));
            previous.handle.abort();
        }
        Entry::Vacant(slot) => {
            if session.is_timer_paced() {
                slot.insert(arm(state, session));
            }
        }
    }
}

/// Arm a timer for an auto-paced session that has none, e.g. after a restart.
pub fn ensure_timer(state: &SharedState, session: &Session) {
    if !session.is_timer_paced() {
        return;
    }
    if let Entry::Vacant(slot) = state.pacers().entry(session.code.clone()) {
        slot.insert(arm(state, session));
    }
}

/// Stop the timer of a session, if any.
pub fn cancel_timer(state: &SharedState, code: &str) {
    if let Some((_, timer)) = state.pacers().remove(code) {
        timer.handle.abort();
    }
}

fn arm(state: &SharedState, session: &Session) -> PacingTimer {
    let index = session.current_question_index;
    let delay = timer_delay(session, state.config().pacing.grace, SystemTime::now());
    debug!(code = %session.code, index, ?delay, "question timer armed");
    PacingTimer {
        index,
        version: session.version,
        handle: spawn_timer(state.clone(), session.code.clone(), index, delay),
    }
}

/// Time left until the current question closes, grace included.
fn timer_delay(session: &Session, grace: Duration, now: SystemTime) -> Duration {
    let window = session.settings.time_per_question() + grace;
    let opened = session.question_started_at.unwrap_or(now);
    (opened + window)
        .duration_since(now)
        .unwrap_or(Duration::ZERO)
        .min(window)
}

fn spawn_timer(state: SharedState, code: String, index: usize, delay: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        sleep(delay).await;
        // Leave the slot before advancing so the commit re-arms instead of aborting us.
        state
            .pacers()
            .remove_if(&code, |_, timer| timer.index == index);

        match advance(&state, &code, Actor::Timer, Some(index)).await {
            Ok(session) => debug!(
                %code,
                from = index,
                index = session.current_question_index,
                status = ?session.status,
                "question timer fired"
            ),
            Err(ServiceError::SessionNotFound(_)) => {
                debug!(%code, "question timer fired for a deleted session")
            }
            Err(err) => warn!(%code, index, error = %err, "question timer could not advance"),
        }
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        services::{
            session_service,
            test_support::{arena_state, create_session},
        },
        state::session::FinishReason,
    };

    #[tokio::test]
    async fn host_advances_and_finishes() {
        let state = arena_state();
        let session = create_session(&state, true).await;
        session_service::start(&state, &session.code, "host")
            .await
            .unwrap();

        let next = advance(&state, &session.code, Actor::User("host"), None)
            .await
            .unwrap();
        assert_eq!(next.current_question_index, 1);
        advance(&state, &session.code, Actor::User("host"), None)
            .await
            .unwrap();
        let finished = advance(&state, &session.code, Actor::User("host"), None)
            .await
            .unwrap();
        assert_eq!(finished.status, SessionStatus::Finished);
        assert_eq!(finished.finish_reason, Some(FinishReason::Completed));

        let err = advance(&state, &session.code, Actor::User("host"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidTransition(_)));
    }

    #[tokio::test]
    async fn only_the_host_advances() {
        let state = arena_state();
        let session = create_session(&state, true).await;
        session_service::start(&state, &session.code, "host")
            .await
            .unwrap();

        let err = advance(&state, &session.code, Actor::User("guest"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotHost(_)));
    }

    #[tokio::test]
    async fn duplicate_advances_for_one_index_move_once() {
        let state = arena_state();
        let session = create_session(&state, true).await;
        session_service::start(&state, &session.code, "host")
            .await
            .unwrap();

        let (first, second) = tokio::join!(
            advance(&state, &session.code, Actor::User("host"), Some(0)),
            advance(&state, &session.code, Actor::User("host"), Some(0)),
        );
        assert_eq!(first.unwrap().current_question_index, 1);
        assert_eq!(second.unwrap().current_question_index, 1);

        let current = session_service::get(&state, &session.code).await.unwrap();
        assert_eq!(current.current_question_index, 1);
        assert_eq!(current.version, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn timer_paces_auto_sessions_to_the_end() {
        let state = arena_state();
        let session = create_session(&state, false).await;
        session_service::start(&state, &session.code, "host")
            .await
            .unwrap();
        assert_eq!(state.pacers().get(&session.code).map(|t| t.index), Some(0));

        // 10 s per question plus 2 s grace.
        tokio::time::sleep(Duration::from_millis(12_100)).await;
        let current = session_service::get(&state, &session.code).await.unwrap();
        assert_eq!(current.current_question_index, 1);
        assert_eq!(current.version, 2);

        tokio::time::sleep(Duration::from_secs(30)).await;
        let finished = session_service::get(&state, &session.code).await.unwrap();
        assert_eq!(finished.status, SessionStatus::Finished);
        assert_eq!(finished.version, 4);
        assert!(state.pacers().get(&session.code).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn manual_sessions_never_arm_a_timer() {
        let state = arena_state();
        let session = create_session(&state, true).await;
        session_service::start(&state, &session.code, "host")
            .await
            .unwrap();
        assert!(state.pacers().is_empty());

        tokio::time::sleep(Duration::from_secs(60)).await;
        let current = session_service::get(&state, &session.code).await.unwrap();
        assert_eq!(current.current_question_index, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn host_advance_rearms_the_timer() {
        let state = arena_state();
        let session = create_session(&state, false).await;
        session_service::start(&state, &session.code, "host")
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_secs(5)).await;
        advance(&state, &session.code, Actor::User("host"), Some(0))
            .await
            .unwrap();
        assert_eq!(state.pacers().get(&session.code).map(|t| t.index), Some(1));

        // The timer of question 0 would have fired here; it must not skip question 1.
        tokio::time::sleep(Duration::from_secs(8)).await;
        let current = session_service::get(&state, &session.code).await.unwrap();
        assert_eq!(current.current_question_index, 1);
    }

    #[test]
    fn delay_counts_from_question_start() {
        let now = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000);
        let mut session = Session::new(
            "ABCDEF".into(),
            "quiz".into(),
            "host".into(),
            3,
            crate::state::session::SessionSettings {
                time_per_question_seconds: 10,
                manual_pace: false,
            },
            now,
        );
        session.question_started_at = Some(now - Duration::from_secs(4));
        assert_eq!(
            timer_delay(&session, Duration::from_secs(2), now),
            Duration::from_secs(8)
        );

        session.question_started_at = Some(now - Duration::from_secs(60));
        assert_eq!(
            timer_delay(&session, Duration::from_secs(2), now),
            Duration::ZERO
        );
    }
}

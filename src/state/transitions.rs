use std::time::SystemTime;

use tracing::{debug, info};

use crate::{
    dao::session_store::SessionGuard,
    error::ServiceError,
    services::{pacing_service, quiz_service, sse_events},
    state::{
        SharedState,
        session::{Session, SessionStatus},
        state_machine::{self, SessionEvent},
    },
};

/// Result of a lifecycle write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// Our write won; carries the committed session.
    Applied(Session),
    /// Another writer committed first; carries the session as it now stands.
    Superseded(Session),
}

impl TransitionOutcome {
    /// Session as it stands after the attempt, whoever won.
    pub fn into_session(self) -> Session {
        match self {
            TransitionOutcome::Applied(session) | TransitionOutcome::Superseded(session) => {
                session
            }
        }
    }

    /// Whether this write won.
    pub fn is_applied(&self) -> bool {
        matches!(self, TransitionOutcome::Applied(_))
    }
}

/// Plan `event` against `session`, write it with a version check, then publish the
/// committed snapshot and re-sync the question timer.
pub async fn commit_transition(
    state: &SharedState,
    session: &Session,
    event: SessionEvent,
) -> Result<TransitionOutcome, ServiceError> {
    commit(state, session, event, None).await
}

/// [`commit_transition`] that only lands while the stored heartbeat is older than `cutoff`.
///
/// A heartbeat received after `session` was read makes the write lose, exactly as a
/// concurrent version bump would.
pub async fn commit_if_stale(
    state: &SharedState,
    session: &Session,
    event: SessionEvent,
    cutoff: SystemTime,
) -> Result<TransitionOutcome, ServiceError> {
    commit(state, session, event, Some(cutoff)).await
}

async fn commit(
    state: &SharedState,
    session: &Session,
    event: SessionEvent,
    heartbeat_before: Option<SystemTime>,
) -> Result<TransitionOutcome, ServiceError> {
    let store = state.session_store().await?;
    let plan = state_machine::plan(session, event)?;
    let next = plan.apply_to(session, SystemTime::now())?;
    let guard = match heartbeat_before {
        Some(cutoff) => SessionGuard::stale(plan.expected_version, cutoff),
        None => SessionGuard::version(plan.expected_version),
    };

    let written = store.replace_session(next.clone().into(), guard).await?;

    if !written {
        let current = store
            .find_session(session.code.clone())
            .await?
            .map(Session::from)
            .ok_or_else(|| ServiceError::SessionNotFound(session.code.clone()))?;
        debug!(
            code = %session.code,
            plan_id = %plan.id,
            event = ?event,
            expected_version = plan.expected_version,
            current_version = current.version,
            "transition lost the race"
        );
        return Ok(TransitionOutcome::Superseded(current));
    }

    info!(
        code = %next.code,
        plan_id = %plan.id,
        from = ?plan.from,
        to = ?plan.to,
        index = next.current_question_index,
        version = next.version,
        "session transition committed"
    );
    sse_events::publish_session(state, &next);
    pacing_service::sync_timer(state, &next);
    if next.status == SessionStatus::Finished {
        quiz_service::release_quiz(state, &next.code);
    }
    Ok(TransitionOutcome::Applied(next))
}

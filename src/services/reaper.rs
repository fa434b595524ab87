//! Finalizes sessions whose host stopped sending heartbeats.

use std::time::SystemTime;

use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use crate::{
    error::ServiceError,
    services::{quiz_service, session_service::load_session},
    state::{
        SharedState,
        session::SessionStatus,
        state_machine::SessionEvent,
        transitions::{TransitionOutcome, commit_if_stale},
    },
};

const REAP_ATTEMPTS: usize = 3;

/// Mark every stale non-finished session `finished` with reason `abandoned`.
///
/// Returns the codes finalized by this sweep. A session that a concurrent writer
/// finished or refreshed in the meantime is left alone.
pub async fn sweep(state: &SharedState, now: SystemTime) -> Result<Vec<String>, ServiceError> {
    let store = state.session_store().await?;
    let stale_after = state.config().reaper.stale_after;
    let cutoff = now.checked_sub(stale_after).unwrap_or(SystemTime::UNIX_EPOCH);

    let candidates = store.list_stale_sessions(cutoff).await?;
    let mut finalized = Vec::new();
    for candidate in candidates {
        let code = candidate.code;
        match reap_one(state, &code, cutoff).await {
            Ok(true) => finalized.push(code),
            Ok(false) => {}
            Err(err) => warn!(%code, error = %err, "failed to reap session"),
        }
    }

    let pruned = state.hubs().prune_idle();
    let released = quiz_service::prune_pins(state).await?;
    if !finalized.is_empty() || pruned > 0 || released > 0 {
        info!(
            finalized = finalized.len(),
            pruned_hubs = pruned,
            released_quizzes = released,
            "reaper sweep completed"
        );
    }
    Ok(finalized)
}

async fn reap_one(state: &SharedState, code: &str, cutoff: SystemTime) -> Result<bool, ServiceError> {
    let store = state.session_store().await?;
    for _ in 0..REAP_ATTEMPTS {
        let session = match load_session(&store, code).await {
            Ok(session) => session,
            Err(ServiceError::SessionNotFound(_)) => return Ok(false),
            Err(err) => return Err(err),
        };
        if session.status == SessionStatus::Finished || session.last_heartbeat >= cutoff {
            return Ok(false);
        }

        match commit_if_stale(state, &session, SessionEvent::Reap, cutoff).await? {
            TransitionOutcome::Applied(_) => {
                info!(%code, "abandoned session finalized");
                return Ok(true);
            }
            TransitionOutcome::Superseded(current) => {
                debug!(%code, version = current.version, "reap raced another write; re-checking");
            }
        }
    }
    Ok(false)
}

/// Run [`sweep`] on the configured interval until the process stops.
pub async fn run(state: SharedState) {
    let mut ticker = interval(state.config().reaper.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        match sweep(&state, SystemTime::now()).await {
            Ok(_) => {}
            Err(ServiceError::Degraded) => debug!("reaper skipped; storage unavailable"),
            Err(err) => warn!(error = %err, "reaper sweep failed"),
        }
    }
}

use std::sync::Arc;

use tracing::warn;

use crate::{
    dto::{
        participant::{LeaderboardEntry, RosterSnapshot},
        session::SessionSummary,
        sse::{ServerEvent, SessionDisbandedEvent},
    },
    services::leaderboard,
    state::{
        SharedState,
        hub::{RosterFeed, SessionFeed},
        session::{Participant, Session},
    },
};

const EVENT_SESSION_SNAPSHOT: &str = "session.snapshot";
const EVENT_SESSION_DISBANDED: &str = "session.disbanded";
const EVENT_PARTICIPANTS_SNAPSHOT: &str = "participants.snapshot";

/// Fan a committed session snapshot out to the session's subscribers.
pub fn publish_session(state: &SharedState, session: &Session) {
    if let Some(hub) = state.hubs().existing(&session.code) {
        hub.publish_session(SessionFeed::Snapshot(session.clone()));
    }
}

/// Re-read the registry and fan the ranked set out to roster subscribers.
///
/// Best effort: the triggering write is already committed, so failures are only logged.
pub async fn publish_roster(state: &SharedState, code: &str) {
    let Some(hub) = state.hubs().existing(code) else {
        return;
    };
    let store = match state.session_store().await {
        Ok(store) => store,
        Err(err) => {
            warn!(%code, error = %err, "cannot publish roster without storage");
            return;
        }
    };

    match store.list_participants(code.to_owned()).await {
        Ok(entities) => {
            let participants: Vec<Participant> = entities.into_iter().map(Into::into).collect();
            hub.publish_roster(roster_feed(participants));
        }
        Err(err) => warn!(%code, error = %err, "failed to read roster for broadcast"),
    }
}

/// Rank a participant set into a feed item.
pub fn roster_feed(participants: Vec<Participant>) -> RosterFeed {
    RosterFeed::Standings {
        revision: leaderboard::revision(&participants),
        standings: Arc::new(leaderboard::project(participants)),
    }
}

/// Render a session feed item as an SSE event.
pub fn session_event(code: &str, feed: SessionFeed) -> Option<ServerEvent> {
    let result = match feed {
        SessionFeed::Snapshot(session) => {
            ServerEvent::json(EVENT_SESSION_SNAPSHOT.to_owned(), &SessionSummary::from(session))
        }
        SessionFeed::Disbanded => disbanded_event(code),
    };
    log_serialization(code, result)
}

/// Render a roster feed item as an SSE event.
pub fn roster_event(code: &str, feed: RosterFeed) -> Option<ServerEvent> {
    let result = match feed {
        RosterFeed::Standings {
            revision,
            standings,
        } => ServerEvent::json(
            EVENT_PARTICIPANTS_SNAPSHOT.to_owned(),
            &RosterSnapshot {
                code: code.to_owned(),
                revision,
                participants: standings.iter().map(LeaderboardEntry::from).collect(),
            },
        ),
        RosterFeed::Disbanded => disbanded_event(code),
    };
    log_serialization(code, result)
}

fn disbanded_event(code: &str) -> serde_json::Result<ServerEvent> {
    ServerEvent::json(
        EVENT_SESSION_DISBANDED.to_owned(),
        &SessionDisbandedEvent {
            code: code.to_owned(),
        },
    )
}

fn log_serialization(
    code: &str,
    result: serde_json::Result<ServerEvent>,
) -> Option<ServerEvent> {
    match result {
        Ok(event) => Some(event),
        Err(err) => {
            warn!(%code, error = %err, "failed to serialize SSE event");
            None
        }
    }
}

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::{
    services::leaderboard::Standing,
    state::session::Session,
};

/// Item carried by a session's snapshot topic.
#[derive(Debug, Clone)]
pub enum SessionFeed {
    /// Committed session record.
    Snapshot(Session),
    /// The session was deleted; nothing follows.
    Disbanded,
}

/// Item carried by a session's participant topic.
#[derive(Debug, Clone)]
pub enum RosterFeed {
    /// Full ranked participant set, tagged with a revision that grows with
    /// every committed join or score write.
    Standings {
        /// Roster revision.
        revision: u64,
        /// Ranked participants.
        standings: Arc<Vec<Standing>>,
    },
    /// The session was deleted; nothing follows.
    Disbanded,
}

/// Fan-out point for one session.
pub struct SessionHub {
    session: broadcast::Sender<SessionFeed>,
    roster: broadcast::Sender<RosterFeed>,
}

impl SessionHub {
    fn new(capacity: usize) -> Self {
        let (session, _) = broadcast::channel(capacity);
        let (roster, _) = broadcast::channel(capacity);
        Self { session, roster }
    }

    /// Receiver of session snapshots.
    pub fn subscribe_session(&self) -> broadcast::Receiver<SessionFeed> {
        self.session.subscribe()
    }

    /// Receiver of ranked rosters.
    pub fn subscribe_roster(&self) -> broadcast::Receiver<RosterFeed> {
        self.roster.subscribe()
    }

    /// Send to current subscribers, ignoring the no-receiver case.
    pub fn publish_session(&self, item: SessionFeed) {
        let _ = self.session.send(item);
    }

    /// Send a roster, ignoring the no-receiver case.
    pub fn publish_roster(&self, item: RosterFeed) {
        let _ = self.roster.send(item);
    }

    fn is_idle(&self) -> bool {
        self.session.receiver_count() == 0 && self.roster.receiver_count() == 0
    }
}

/// Registry of per-session hubs, created lazily by the first subscriber.
pub struct SessionHubs {
    hubs: DashMap<String, Arc<SessionHub>>,
    capacity: usize,
}

impl SessionHubs {
    /// Registry whose topics buffer `capacity` items (at least one).
    pub fn new(capacity: usize) -> Self {
        Self {
            hubs: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Hub for `code`, created when missing.
    pub fn hub(&self, code: &str) -> Arc<SessionHub> {
        self.hubs
            .entry(code.to_owned())
            .or_insert_with(|| Arc::new(SessionHub::new(self.capacity)))
            .clone()
    }

    /// Hub for `code` only if someone subscribed to it.
    pub fn existing(&self, code: &str) -> Option<Arc<SessionHub>> {
        self.hubs.get(code).map(|hub| hub.clone())
    }

    /// Publish the terminal event on both topics and forget the hub.
    pub fn close(&self, code: &str) {
        if let Some((_, hub)) = self.hubs.remove(code) {
            hub.publish_session(SessionFeed::Disbanded);
            hub.publish_roster(RosterFeed::Disbanded);
        }
    }

    /// Drop hubs nobody listens to any more; returns how many were removed.
    pub fn prune_idle(&self) -> usize {
        let before = self.hubs.len();
        self.hubs.retain(|_, hub| !hub.is_idle());
        before.saturating_sub(self.hubs.len())
    }

    /// Number of live hubs.
    pub fn len(&self) -> usize {
        self.hubs.len()
    }

    /// Whether no hub is live.
    pub fn is_empty(&self) -> bool {
        self.hubs.is_empty()
    }
}

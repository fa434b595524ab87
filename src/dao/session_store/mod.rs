pub mod memory;
/// MongoDB-backed store.
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use std::time::SystemTime;

use futures::future::BoxFuture;

use crate::dao::models::{ParticipantEntity, SessionEntity};
use crate::dao::storage::StorageResult;

/// Preconditions of a session compare-and-swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionGuard {
    /// Version read before the write was planned.
    pub expected_version: u64,
    /// When set, the stored heartbeat must be strictly older than this instant.
    pub heartbeat_before: Option<SystemTime>,
}

impl SessionGuard {
    /// Guard checking the version only.
    pub fn version(expected_version: u64) -> Self {
        Self {
            expected_version,
            heartbeat_before: None,
        }
    }

    /// Guard for a write that must only land on a session the host went silent on.
    pub fn stale(expected_version: u64, cutoff: SystemTime) -> Self {
        Self {
            expected_version,
            heartbeat_before: Some(cutoff),
        }
    }

    /// Whether `stored` satisfies every precondition.
    pub fn holds_for(&self, stored: &SessionEntity) -> bool {
        stored.version == self.expected_version
            && self
                .heartbeat_before
                .is_none_or(|cutoff| stored.last_heartbeat < cutoff)
    }
}

/// Abstraction over the persistence layer for arena sessions and their participants.
///
/// Every mutating call touches a single record. Writes guarded by `expected_version`
/// are compare-and-swap operations: they return `false` without writing when the
/// stored version differs.
pub trait SessionStore: Send + Sync {
    /// Insert a new session, returning `false` when the code is already taken.
    fn insert_session(&self, session: SessionEntity) -> BoxFuture<'static, StorageResult<bool>>;
    /// Fetch a session by code.
    fn find_session(&self, code: String) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>>;
    /// Write the lifecycle fields of `session` only if the stored record satisfies `guard`.
    ///
    /// The stored `last_heartbeat` is left untouched; only [`SessionStore::touch_heartbeat`]
    /// writes it.
    fn replace_session(
        &self,
        session: SessionEntity,
        guard: SessionGuard,
    ) -> BoxFuture<'static, StorageResult<bool>>;
    /// Refresh the host heartbeat without bumping the session version.
    fn touch_heartbeat(
        &self,
        code: String,
        at: SystemTime,
    ) -> BoxFuture<'static, StorageResult<bool>>;
    /// Delete the session together with its participant registry.
    fn delete_session(&self, code: String) -> BoxFuture<'static, StorageResult<bool>>;
    /// Sessions still `waiting` or `active` whose heartbeat is older than `cutoff`.
    fn list_stale_sessions(
        &self,
        cutoff: SystemTime,
    ) -> BoxFuture<'static, StorageResult<Vec<SessionEntity>>>;
    /// Insert the participant or refresh its name, preserving the score.
    ///
    /// Returns `None` when the session does not exist.
    fn upsert_participant(
        &self,
        code: String,
        user_id: String,
        name: String,
        joined_at: SystemTime,
    ) -> BoxFuture<'static, StorageResult<Option<ParticipantEntity>>>;
    /// Fetch one participant of a session.
    fn find_participant(
        &self,
        code: String,
        user_id: String,
    ) -> BoxFuture<'static, StorageResult<Option<ParticipantEntity>>>;
    /// Replace the participant only if its stored version equals `expected_version`.
    fn replace_participant(
        &self,
        participant: ParticipantEntity,
        expected_version: u64,
    ) -> BoxFuture<'static, StorageResult<bool>>;
    /// Participants of a session in join order.
    fn list_participants(
        &self,
        code: String,
    ) -> BoxFuture<'static, StorageResult<Vec<ParticipantEntity>>>;
    /// Ping the backend.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Try to re-establish a lost connection.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}

//! In-process session store used for single-node deployments and tests.

use std::{sync::Arc, time::SystemTime};

use dashmap::{DashMap, mapref::entry::Entry};
use futures::future::{BoxFuture, ready};
use indexmap::IndexMap;

use crate::dao::{
    models::{ParticipantEntity, SessionEntity, SessionStatusEntity},
    session_store::{SessionGuard, SessionStore},
    storage::StorageResult,
};

/// Session store keeping every record in memory.
///
/// Lock order is always sessions first, participants second, so the cascade in
/// [`SessionStore::delete_session`] cannot race a concurrent join into an orphan row.
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    sessions: DashMap<String, SessionEntity>,
    participants: DashMap<String, IndexMap<String, ParticipantEntity>>,
}

impl MemorySessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn insert_session(&self, session: SessionEntity) -> bool {
        match self.inner.sessions.entry(session.code.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(session);
                true
            }
        }
    }

    fn replace_session(&self, session: SessionEntity, guard: SessionGuard) -> bool {
        let Some(mut stored) = self.inner.sessions.get_mut(&session.code) else {
            return false;
        };
        if !guard.holds_for(&stored) {
            return false;
        }
        *stored = SessionEntity {
            last_heartbeat: stored.last_heartbeat,
            ..session
        };
        true
    }

    fn touch_heartbeat(&self, code: &str, at: SystemTime) -> bool {
        match self.inner.sessions.get_mut(code) {
            Some(mut stored) => {
                stored.last_heartbeat = at;
                true
            }
            None => false,
        }
    }

    fn delete_session(&self, code: &str) -> bool {
        let removed = self.inner.sessions.remove(code).is_some();
        self.inner.participants.remove(code);
        removed
    }

    fn list_stale_sessions(&self, cutoff: SystemTime) -> Vec<SessionEntity> {
        self.inner
            .sessions
            .iter()
            .filter(|entry| {
                matches!(
                    entry.status,
                    SessionStatusEntity::Waiting | SessionStatusEntity::Active
                ) && entry.last_heartbeat < cutoff
            })
            .map(|entry| entry.value().clone())
            .collect()
    }

    fn upsert_participant(
        &self,
        code: String,
        user_id: String,
        name: String,
        joined_at: SystemTime,
    ) -> Option<ParticipantEntity> {
        let _session = self.inner.sessions.get(&code)?;
        let mut roster = self.inner.participants.entry(code.clone()).or_default();
        let participant = roster
            .entry(user_id.clone())
            .and_modify(|existing| existing.name = name.clone())
            .or_insert_with(|| ParticipantEntity {
                session_code: code,
                user_id,
                name,
                score: 0,
                last_answer_correct: false,
                joined_at,
                answered_questions: Default::default(),
                version: 0,
            });
        Some(participant.clone())
    }

    fn find_participant(&self, code: &str, user_id: &str) -> Option<ParticipantEntity> {
        self.inner
            .participants
            .get(code)
            .and_then(|roster| roster.get(user_id).cloned())
    }

    fn replace_participant(&self, participant: ParticipantEntity, expected_version: u64) -> bool {
        let Some(mut roster) = self.inner.participants.get_mut(&participant.session_code) else {
            return false;
        };
        match roster.get_mut(&participant.user_id) {
            Some(stored) if stored.version == expected_version => {
                *stored = participant;
                true
            }
            _ => false,
        }
    }

    fn list_participants(&self, code: &str) -> Vec<ParticipantEntity> {
        self.inner
            .participants
            .get(code)
            .map(|roster| roster.values().cloned().collect())
            .unwrap_or_default()
    }
}

impl SessionStore for MemorySessionStore {
    fn insert_session(&self, session: SessionEntity) -> BoxFuture<'static, StorageResult<bool>> {
        Box::pin(ready(Ok(MemorySessionStore::insert_session(self, session))))
    }

    fn find_session(&self, code: String) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>> {
        let found = self.inner.sessions.get(&code).map(|entry| entry.clone());
        Box::pin(ready(Ok(found)))
    }

    fn replace_session(
        &self,
        session: SessionEntity,
        guard: SessionGuard,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        Box::pin(ready(Ok(MemorySessionStore::replace_session(
            self, session, guard,
        ))))
    }

    fn touch_heartbeat(
        &self,
        code: String,
        at: SystemTime,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        Box::pin(ready(Ok(MemorySessionStore::touch_heartbeat(
            self, &code, at,
        ))))
    }

    fn delete_session(&self, code: String) -> BoxFuture<'static, StorageResult<bool>> {
        Box::pin(ready(Ok(MemorySessionStore::delete_session(self, &code))))
    }

    fn list_stale_sessions(
        &self,
        cutoff: SystemTime,
    ) -> BoxFuture<'static, StorageResult<Vec<SessionEntity>>> {
        Box::pin(ready(Ok(MemorySessionStore::list_stale_sessions(
            self, cutoff,
        ))))
    }

    fn upsert_participant(
        &self,
        code: String,
        user_id: String,
        name: String,
        joined_at: SystemTime,
    ) -> BoxFuture<'static, StorageResult<Option<ParticipantEntity>>> {
        Box::pin(ready(Ok(MemorySessionStore::upsert_participant(
            self, code, user_id, name, joined_at,
        ))))
    }

    fn find_participant(
        &self,
        code: String,
        user_id: String,
    ) -> BoxFuture<'static, StorageResult<Option<ParticipantEntity>>> {
        Box::pin(ready(Ok(MemorySessionStore::find_participant(
            self, &code, &user_id,
        ))))
    }

    fn replace_participant(
        &self,
        participant: ParticipantEntity,
        expected_version: u64,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        Box::pin(ready(Ok(MemorySessionStore::replace_participant(
            self,
            participant,
            expected_version,
        ))))
    }

    fn list_participants(
        &self,
        code: String,
    ) -> BoxFuture<'static, StorageResult<Vec<ParticipantEntity>>> {
        Box::pin(ready(Ok(MemorySessionStore::list_participants(
            self, &code,
        ))))
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(ready(Ok(())))
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(ready(Ok(())))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::dao::models::SessionSettingsEntity;

    fn session(code: &str) -> SessionEntity {
        let now = SystemTime::now();
        SessionEntity {
            code: code.into(),
            quiz_id: "quiz-1".into(),
            host_id: "host".into(),
            status: SessionStatusEntity::Waiting,
            current_question_index: 0,
            question_count: 3,
            settings: SessionSettingsEntity {
                time_per_question_seconds: 10,
                manual_pace: true,
            },
            finish_reason: None,
            question_started_at: None,
            last_heartbeat: now,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    #[test]
    fn insert_rejects_taken_code() {
        let store = MemorySessionStore::new();
        assert!(store.insert_session(session("ABCDEF")));
        assert!(!store.insert_session(session("ABCDEF")));
    }

    #[test]
    fn replace_session_is_guarded_by_version() {
        let store = MemorySessionStore::new();
        store.insert_session(session("ABCDEF"));

        let mut next = session("ABCDEF");
        next.status = SessionStatusEntity::Active;
        next.version = 1;
        assert!(store.replace_session(next.clone(), SessionGuard::version(0)));
        // A second writer that read version 0 loses.
        assert!(!store.replace_session(next, SessionGuard::version(0)));
    }

    #[test]
    fn replace_session_keeps_the_stored_heartbeat() {
        let store = MemorySessionStore::new();
        let read = session("ABCDEF");
        store.insert_session(read.clone());
        let fresh = read.last_heartbeat + Duration::from_secs(600);
        assert!(store.touch_heartbeat("ABCDEF", fresh));

        let mut next = read;
        next.status = SessionStatusEntity::Active;
        next.version = 1;
        assert!(store.replace_session(next, SessionGuard::version(0)));

        let stored = store.inner.sessions.get("ABCDEF").unwrap().clone();
        assert_eq!(stored.status, SessionStatusEntity::Active);
        assert_eq!(stored.last_heartbeat, fresh);
    }

    #[test]
    fn stale_guard_refuses_a_refreshed_session() {
        let store = MemorySessionStore::new();
        let now = SystemTime::now();
        let mut read = session("ABCDEF");
        read.last_heartbeat = now - Duration::from_secs(20 * 60);
        store.insert_session(read.clone());
        let cutoff = now - Duration::from_secs(15 * 60);

        assert!(store.touch_heartbeat("ABCDEF", now));
        let mut reaped = read.clone();
        reaped.status = SessionStatusEntity::Finished;
        reaped.version = 1;
        assert!(!store.replace_session(reaped.clone(), SessionGuard::stale(0, cutoff)));

        store.touch_heartbeat("ABCDEF", read.last_heartbeat);
        assert!(store.replace_session(reaped, SessionGuard::stale(0, cutoff)));
    }

    #[test]
    fn upsert_keeps_score_and_refreshes_name() {
        let store = MemorySessionStore::new();
        store.insert_session(session("ABCDEF"));
        let now = SystemTime::now();

        let first = store
            .upsert_participant("ABCDEF".into(), "u1".into(), "Ann".into(), now)
            .unwrap();
        let mut scored = first.clone();
        scored.score = 70;
        scored.version = 1;
        assert!(store.replace_participant(scored, 0));

        let later = now + Duration::from_secs(30);
        let again = store
            .upsert_participant("ABCDEF".into(), "u1".into(), "Annie".into(), later)
            .unwrap();
        assert_eq!(again.name, "Annie");
        assert_eq!(again.score, 70);
        assert_eq!(again.joined_at, first.joined_at);
        assert_eq!(store.list_participants("ABCDEF").len(), 1);
    }

    #[test]
    fn upsert_requires_existing_session() {
        let store = MemorySessionStore::new();
        let joined = store.upsert_participant(
            "ZZZZZZ".into(),
            "u1".into(),
            "Ann".into(),
            SystemTime::now(),
        );
        assert!(joined.is_none());
    }

    #[test]
    fn delete_cascades_participants() {
        let store = MemorySessionStore::new();
        store.insert_session(session("ABCDEF"));
        store.upsert_participant("ABCDEF".into(), "u1".into(), "Ann".into(), SystemTime::now());

        assert!(store.delete_session("ABCDEF"));
        assert!(store.list_participants("ABCDEF").is_empty());
        assert!(!store.delete_session("ABCDEF"));
    }

    #[test]
    fn stale_listing_skips_finished_and_fresh_sessions() {
        let store = MemorySessionStore::new();
        let now = SystemTime::now();
        let old = now - Duration::from_secs(20 * 60);

        let mut stale = session("AAAAAA");
        stale.last_heartbeat = old;
        let mut finished = session("BBBBBB");
        finished.last_heartbeat = old;
        finished.status = SessionStatusEntity::Finished;
        store.insert_session(stale);
        store.insert_session(finished);
        store.insert_session(session("CCCCCC"));

        let cutoff = now - Duration::from_secs(15 * 60);
        let listed = store.list_stale_sessions(cutoff);
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].code, "AAAAAA");
    }
}

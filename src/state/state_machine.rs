use std::time::SystemTime;

use thiserror::Error;
use uuid::Uuid;

use crate::state::session::{FinishReason, Session, SessionStatus};

/// Events that move a session through its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Host opens the first question.
    Start,
    /// Host or timer moves past the current question.
    Advance,
    /// Reaper finalizes a session whose host stopped sending heartbeats.
    Reap,
    /// A participant enters the registry; does not change the session.
    Join,
}

/// Error returned when an event cannot be applied from the session's status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while {from:?}")]
pub struct InvalidTransition {
    /// Status the event was tried from.
    pub from: SessionStatus,
    /// Rejected event.
    pub event: SessionEvent,
}

/// Errors raised when a plan no longer matches the session it is applied to.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApplyError {
    /// The session left the status the plan was made from.
    #[error("session status changed (expected {expected:?}, got {actual:?})")]
    StatusMismatch {
        /// Status the event requires.
        expected: SessionStatus,
        /// Status found.
        actual: SessionStatus,
    },
    /// Another write landed since the plan was made.
    #[error("session version changed (expected {expected}, got {actual})")]
    VersionMismatch {
        /// Version the plan was made from.
        expected: u64,
        /// Version found.
        actual: u64,
    },
}

/// Unique identifier for a planned transition, used to correlate logs.
pub type PlanId = Uuid;

/// A validated transition computed against one read of the session.
///
/// Applying it produces the next record, which must then be written with a
/// compare-and-swap on [`Plan::expected_version`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    /// Correlates the log lines of one transition.
    pub id: PlanId,
    /// Status planned from.
    pub from: SessionStatus,
    /// Status after the write.
    pub to: SessionStatus,
    /// Event being applied.
    pub event: SessionEvent,
    /// Index planned from.
    pub from_index: usize,
    /// Index after the write.
    pub next_index: usize,
    /// Set when the write finishes the session.
    pub finish_reason: Option<FinishReason>,
    /// Version the compare-and-swap expects.
    pub expected_version: u64,
    /// Version written.
    pub version_next: u64,
}

impl Plan {
    /// Whether applying the plan changes the visible question.
    pub fn opens_question(&self) -> bool {
        self.to == SessionStatus::Active
            && (self.from == SessionStatus::Waiting || self.next_index != self.from_index)
    }

    /// Build the next session record from `session`, which must still be the one planned on.
    pub fn apply_to(&self, session: &Session, now: SystemTime) -> Result<Session, ApplyError> {
        if session.status != self.from {
            return Err(ApplyError::StatusMismatch {
                expected: self.from,
                actual: session.status,
            });
        }
        if session.version != self.expected_version {
            return Err(ApplyError::VersionMismatch {
                expected: self.expected_version,
                actual: session.version,
            });
        }

        let mut next = session.clone();
        next.status = self.to;
        next.current_question_index = self.next_index;
        next.finish_reason = self.finish_reason;
        next.version = self.version_next;
        next.updated_at = now;
        next.question_started_at = match self.to {
            SessionStatus::Active if self.opens_question() => Some(now),
            SessionStatus::Active => session.question_started_at,
            _ => None,
        };
        Ok(next)
    }
}

/// Check that `event` is allowed right now without planning a write.
pub fn admits(session: &Session, event: SessionEvent) -> Result<(), InvalidTransition> {
    match (session.status, event) {
        (SessionStatus::Waiting | SessionStatus::Active, SessionEvent::Join) => Ok(()),
        _ => plan(session, event).map(|_| ()),
    }
}

/// Validate `event` against the session's current status and compute the plan.
pub fn plan(session: &Session, event: SessionEvent) -> Result<Plan, InvalidTransition> {
    let index = session.current_question_index;
    let (to, next_index, finish_reason) = match (session.status, event) {
        (SessionStatus::Waiting, SessionEvent::Start) => (SessionStatus::Active, index, None),
        (SessionStatus::Active, SessionEvent::Advance) if session.is_last_question() => {
            (SessionStatus::Finished, index, Some(FinishReason::Completed))
        }
        (SessionStatus::Active, SessionEvent::Advance) => (SessionStatus::Active, index + 1, None),
        (SessionStatus::Waiting | SessionStatus::Active, SessionEvent::Reap) => {
            (SessionStatus::Finished, index, Some(FinishReason::Abandoned))
        }
        (from, event) => return Err(InvalidTransition { from, event }),
    };

    Ok(Plan {
        id: Uuid::new_v4(),
        from: session.status,
        to,
        event,
        from_index: index,
        next_index,
        finish_reason,
        expected_version: session.version,
        version_next: session.version + 1,
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::state::session::SessionSettings;

    fn session(question_count: usize) -> Session {
        Session::new(
            "ABCDEF".into(),
            "quiz".into(),
            "host".into(),
            question_count,
            SessionSettings {
                time_per_question_seconds: 10,
                manual_pace: true,
            },
            SystemTime::UNIX_EPOCH,
        )
    }

    fn apply(session: &Session, event: SessionEvent) -> Session {
        let plan = plan(session, event).unwrap();
        plan.apply_to(session, SystemTime::now()).unwrap()
    }

    #[test]
    fn new_session_is_waiting_on_first_question() {
        let session = session(3);
        assert_eq!(session.status, SessionStatus::Waiting);
        assert_eq!(session.current_question_index, 0);
        assert_eq!(session.version, 0);
    }

    #[test]
    fn full_happy_path_through_quiz() {
        let waiting = session(3);

        let active = apply(&waiting, SessionEvent::Start);
        assert_eq!(active.status, SessionStatus::Active);
        assert_eq!(active.current_question_index, 0);
        assert!(active.question_started_at.is_some());

        let second = apply(&active, SessionEvent::Advance);
        assert_eq!(second.current_question_index, 1);
        let third = apply(&second, SessionEvent::Advance);
        assert_eq!(third.current_question_index, 2);

        let finished = apply(&third, SessionEvent::Advance);
        assert_eq!(finished.status, SessionStatus::Finished);
        assert_eq!(finished.finish_reason, Some(FinishReason::Completed));
        assert_eq!(finished.current_question_index, 2);
        assert_eq!(finished.question_started_at, None);
        assert_eq!(finished.version, 4);
    }

    #[test]
    fn single_question_quiz_finishes_on_first_advance() {
        let active = apply(&session(1), SessionEvent::Start);
        let finished = apply(&active, SessionEvent::Advance);
        assert_eq!(finished.status, SessionStatus::Finished);
    }

    #[test]
    fn reap_abandons_waiting_and_active_sessions() {
        let waiting = session(2);
        let reaped = apply(&waiting, SessionEvent::Reap);
        assert_eq!(reaped.status, SessionStatus::Finished);
        assert_eq!(reaped.finish_reason, Some(FinishReason::Abandoned));

        let active = apply(&session(2), SessionEvent::Start);
        let reaped = apply(&active, SessionEvent::Reap);
        assert_eq!(reaped.finish_reason, Some(FinishReason::Abandoned));
    }

    #[test]
    fn finished_session_rejects_every_event() {
        let finished = apply(&session(2), SessionEvent::Reap);
        for event in [SessionEvent::Start, SessionEvent::Advance, SessionEvent::Reap] {
            let err = plan(&finished, event).unwrap_err();
            assert_eq!(
                err,
                InvalidTransition {
                    from: SessionStatus::Finished,
                    event,
                }
            );
        }
    }

    #[test]
    fn joining_is_closed_once_finished() {
        let waiting = session(2);
        assert!(admits(&waiting, SessionEvent::Join).is_ok());
        let active = apply(&waiting, SessionEvent::Start);
        assert!(admits(&active, SessionEvent::Join).is_ok());
        let finished = apply(&active, SessionEvent::Reap);
        assert!(admits(&finished, SessionEvent::Join).is_err());
        assert!(plan(&active, SessionEvent::Join).is_err());
    }

    #[test]
    fn advance_requires_active_session() {
        let err = plan(&session(2), SessionEvent::Advance).unwrap_err();
        assert_eq!(err.from, SessionStatus::Waiting);
    }

    #[test]
    fn stale_plan_is_rejected() {
        let active = apply(&session(3), SessionEvent::Start);
        let first = plan(&active, SessionEvent::Advance).unwrap();
        let second = plan(&active, SessionEvent::Advance).unwrap();

        let advanced = first.apply_to(&active, SystemTime::now()).unwrap();
        let err = second.apply_to(&advanced, SystemTime::now()).unwrap_err();
        assert_eq!(
            err,
            ApplyError::VersionMismatch {
                expected: active.version,
                actual: advanced.version,
            }
        );
    }

    #[test]
    fn status_is_monotonic() {
        let mut current = session(4);
        let mut previous = current.status;
        for event in [
            SessionEvent::Start,
            SessionEvent::Advance,
            SessionEvent::Advance,
            SessionEvent::Advance,
            SessionEvent::Advance,
        ] {
            current = apply(&current, event);
            assert!(current.status >= previous);
            assert!(current.current_question_index < current.question_count);
            previous = current.status;
        }
        assert_eq!(current.status, SessionStatus::Finished);
    }

    #[test]
    fn question_clock_restarts_on_each_advance() {
        let active = apply(&session(3), SessionEvent::Start);
        let plan = plan(&active, SessionEvent::Advance).unwrap();
        let later = SystemTime::UNIX_EPOCH + Duration::from_secs(500);
        let next = plan.apply_to(&active, later).unwrap();
        assert_eq!(next.question_started_at, Some(later));
        assert_eq!(next.updated_at, later);
    }
}

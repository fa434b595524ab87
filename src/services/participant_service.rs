use std::time::SystemTime;

use async_stream::stream;
use futures::Stream;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::{
    error::ServiceError,
    services::{
        leaderboard::{self, Standing},
        session_service::load_session,
        sse_events,
    },
    state::{
        SharedState,
        hub::RosterFeed,
        session::{Participant, Session},
        state_machine::{SessionEvent, admits},
    },
};

/// Register `user_id` in the session, or refresh the display name of a returning user.
///
/// Score, answered questions and join time survive a rejoin.
pub async fn join(
    state: &SharedState,
    code: &str,
    user_id: &str,
    name: String,
) -> Result<Participant, ServiceError> {
    let name = name.trim().to_owned();
    if name.is_empty() {
        return Err(ServiceError::InvalidInput("display name is required".into()));
    }

    let store = state.session_store().await?;
    let session = load_session(&store, code).await?;
    admits(&session, SessionEvent::Join)?;

    let participant: Participant = store
        .upsert_participant(
            code.to_owned(),
            user_id.to_owned(),
            name,
            SystemTime::now(),
        )
        .await?
        .map(Into::into)
        .ok_or_else(|| ServiceError::SessionNotFound(code.to_owned()))?;

    info!(
        %code,
        user_id,
        name = %participant.name,
        score = participant.score,
        "participant joined"
    );
    sse_events::publish_roster(state, code).await;
    Ok(participant)
}

/// Participants of a session in join order.
pub async fn list(state: &SharedState, code: &str) -> Result<Vec<Participant>, ServiceError> {
    let store = state.session_store().await?;
    load_session(&store, code).await?;
    let participants = store.list_participants(code.to_owned()).await?;
    Ok(participants.into_iter().map(Into::into).collect())
}

/// One registered participant, or [`ServiceError::NotFound`] when `user_id` never joined.
pub async fn find(
    state: &SharedState,
    code: &str,
    user_id: &str,
) -> Result<Participant, ServiceError> {
    let store = state.session_store().await?;
    store
        .find_participant(code.to_owned(), user_id.to_owned())
        .await?
        .map(Into::into)
        .ok_or_else(|| ServiceError::NotFound(format!("`{user_id}` has not joined `{code}`")))
}

/// Ranked standings together with the session they belong to.
pub async fn leaderboard(
    state: &SharedState,
    code: &str,
) -> Result<(Session, Vec<Standing>), ServiceError> {
    let store = state.session_store().await?;
    let session = load_session(&store, code).await?;
    let participants = store.list_participants(code.to_owned()).await?;
    let standings = leaderboard::project(participants.into_iter().map(Into::into).collect());
    Ok((session, standings))
}

/// Stream the ranked roster, then every committed join or score change.
///
/// Items whose revision is older than the last one delivered are skipped; the stream
/// ends after [`RosterFeed::Disbanded`].
pub async fn subscribe(
    state: &SharedState,
    code: &str,
) -> Result<impl Stream<Item = RosterFeed> + Send + use<>, ServiceError> {
    let store = state.session_store().await?;
    let mut receiver = state.hubs().hub(code).subscribe_roster();
    load_session(&store, code).await?;
    let participants: Vec<Participant> = store
        .list_participants(code.to_owned())
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    let initial = sse_events::roster_feed(participants);
    let code = code.to_owned();

    Ok(stream! {
        let mut last_revision = revision_of(&initial);
        yield initial;

        loop {
            match receiver.recv().await {
                Ok(feed @ RosterFeed::Standings { .. }) => {
                    let revision = revision_of(&feed);
                    if revision >= last_revision {
                        last_revision = revision;
                        yield feed;
                    }
                }
                Ok(RosterFeed::Disbanded) => {
                    yield RosterFeed::Disbanded;
                    break;
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!(%code, skipped, "roster subscriber lagged; resyncing");
                    match store.find_session(code.clone()).await {
                        Ok(None) => {
                            yield RosterFeed::Disbanded;
                            break;
                        }
                        Ok(Some(_)) => match store.list_participants(code.clone()).await {
                            Ok(entities) => {
                                let feed = sse_events::roster_feed(
                                    entities.into_iter().map(Into::into).collect(),
                                );
                                last_revision = revision_of(&feed);
                                yield feed;
                            }
                            Err(err) => warn!(%code, error = %err, "roster resync failed"),
                        },
                        Err(err) => warn!(%code, error = %err, "roster resync failed"),
                    }
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

fn revision_of(feed: &RosterFeed) -> u64 {
    match feed {
        RosterFeed::Standings { revision, .. } => *revision,
        RosterFeed::Disbanded => u64::MAX,
    }
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
            session_service,
            test_support::{arena_state, arena_state_with, capitals_quiz, create_session},
        },
    };

    fn roster_len(item: Option<RosterFeed>) -> usize {
        match item {
            Some(RosterFeed::Standings { standings, .. }) => standings.len(),
            other => panic!("expected standings, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn rejoin_keeps_score_and_updates_name() {
        let state = arena_state();
        let session = create_session(&state, true).await;

        let first = join(&state, &session.code, "u1", "Ada".into()).await.unwrap();
        let again = join(&state, &session.code, "u1", "Ada L.".into())
            .await
            .unwrap();

        assert_eq!(again.name, "Ada L.");
        assert_eq!(again.joined_at, first.joined_at);
        assert_eq!(list(&state, &session.code).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn joining_is_open_until_finished() {
        let state = arena_state();
        let session = create_session(&state, true).await;
        session_service::start(&state, &session.code, "host")
            .await
            .unwrap();
        join(&state, &session.code, "late", "Late".into())
            .await
            .unwrap();

        for _ in 0..3 {
            pacing_service::advance(&state, &session.code, Actor::User("host"), None)
                .await
                .unwrap();
        }
        let err = join(&state, &session.code, "later", "Later".into())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidTransition(_)));
    }

    #[tokio::test]
    async fn unknown_session_and_blank_names_are_rejected() {
        let state = arena_state();
        let err = join(&state, "ZZZZZZ", "u1", "Ada".into()).await.unwrap_err();
        assert!(matches!(err, ServiceError::SessionNotFound(_)));

        let session = create_session(&state, true).await;
        let err = join(&state, &session.code, "u1", "   ".into())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn roster_stream_sees_joins_then_disband() {
        let state = arena_state();
        let session = create_session(&state, true).await;
        let roster = subscribe(&state, &session.code).await.unwrap();
        pin_mut!(roster);

        match roster.next().await {
            Some(RosterFeed::Standings { standings, .. }) => assert!(standings.is_empty()),
            other => panic!("unexpected first item: {other:?}"),
        }

        join(&state, &session.code, "u1", "Ada".into()).await.unwrap();
        match roster.next().await {
            Some(RosterFeed::Standings { standings, .. }) => {
                assert_eq!(standings.len(), 1);
                assert_eq!(standings[0].participant.user_id, "u1");
            }
            other => panic!("unexpected item: {other:?}"),
        }

        session_service::disband(&state, &session.code, "host")
            .await
            .unwrap();
        assert!(matches!(roster.next().await, Some(RosterFeed::Disbanded)));
        assert!(roster.next().await.is_none());
    }

    #[tokio::test]
    async fn lagging_roster_subscriber_never_goes_backwards() {
        let config = AppConfig {
            hub_capacity: 1,
            ..AppConfig::default()
        };
        let state = arena_state_with(config, Arc::new(QuizCatalog::from_quizzes([capitals_quiz()])));
        let session = create_session(&state, true).await;

        let roster = {
            let state = state.clone();
            let code = session.code.clone();
            subscribe(&state, &code).await.unwrap()
        };
        pin_mut!(roster);
        assert_eq!(roster_len(roster.next().await), 0);

        for user in ["u1", "u2", "u3"] {
            join(&state, &session.code, user, user.to_uppercase())
                .await
                .unwrap();
        }
        assert_eq!(roster_len(roster.next().await), 3);

        session_service::disband(&state, &session.code, "host")
            .await
            .unwrap();
        while let Some(item) = roster.next().await {
            match item {
                RosterFeed::Standings { standings, .. } => assert_eq!(standings.len(), 3),
                RosterFeed::Disbanded => break,
            }
        }
    }
}

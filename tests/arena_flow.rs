mod common;

use std::time::SystemTime;

use common::arena;
use futures::{StreamExt, pin_mut};
use quiz_arena_back::{
    dao::{models::QuizEntity, quiz_provider::catalog::QuizCatalog},
    dto::session::CreateSessionRequest,
    services::{
        pacing_service::{self, Actor},
        participant_service, reaper,
        scoring::Submission,
        scoring_service, session_service,
    },
    state::{
        hub::SessionFeed,
        quiz::Quiz,
        session::{FinishReason, SessionStatus},
    },
};

fn answer(text: &str) -> Submission {
    Submission::Text(text.into())
}

#[tokio::test]
async fn full_session_scores_and_ranks_players() {
    let state = arena();
    let session = session_service::create(
        &state,
        "host",
        CreateSessionRequest {
            quiz_id: "trivia".into(),
            time_per_question_seconds: 10,
            manual_pace: true,
        },
    )
    .await
    .unwrap();
    let code = session.code.clone();

    let feed = session_service::subscribe(&state, &code).await.unwrap();
    pin_mut!(feed);
    assert!(matches!(feed.next().await, Some(SessionFeed::Snapshot(s)) if s.version == 0));

    participant_service::join(&state, &code, "alice", "Alice".into())
        .await
        .unwrap();
    participant_service::join(&state, &code, "bob", "Bob".into())
        .await
        .unwrap();
    session_service::start(&state, &code, "host").await.unwrap();

    let alice = scoring_service::submit_answer(&state, &code, "alice", 0, answer("One"), 8.0)
        .await
        .unwrap();
    let bob = scoring_service::submit_answer(&state, &code, "bob", 0, answer("one"), 2.0)
        .await
        .unwrap();
    assert_eq!((alice.points_awarded, bob.points_awarded), (90, 60));

    let again = scoring_service::submit_answer(&state, &code, "bob", 0, answer("one"), 10.0)
        .await
        .unwrap();
    assert!(!again.accepted);
    assert_eq!(again.score, 60);

    for _ in 0..3 {
        pacing_service::advance(&state, &code, Actor::User("host"), None)
            .await
            .unwrap();
    }

    let mut versions = Vec::new();
    while let Some(SessionFeed::Snapshot(snapshot)) = feed.next().await {
        versions.push(snapshot.version);
        if snapshot.status == SessionStatus::Finished {
            assert_eq!(snapshot.finish_reason, Some(FinishReason::Completed));
            break;
        }
    }
    assert_eq!(versions, vec![1, 2, 3, 4]);

    let (finished, standings) = participant_service::leaderboard(&state, &code).await.unwrap();
    assert_eq!(finished.status, SessionStatus::Finished);
    let ranked: Vec<(&str, u32)> = standings
        .iter()
        .map(|s| (s.participant.user_id.as_str(), s.participant.score))
        .collect();
    assert_eq!(ranked, vec![("alice", 90), ("bob", 60)]);

    let late = scoring_service::submit_answer(&state, &code, "alice", 2, answer("three"), 5.0).await;
    assert!(late.is_err());
}

#[tokio::test]
async fn disband_ends_streams_and_forgets_the_session() {
    let state = arena();
    let session = session_service::create(
        &state,
        "host",
        CreateSessionRequest {
            quiz_id: "trivia".into(),
            time_per_question_seconds: 5,
            manual_pace: false,
        },
    )
    .await
    .unwrap();
    session_service::start(&state, &session.code, "host")
        .await
        .unwrap();

    let feed = session_service::subscribe(&state, &session.code)
        .await
        .unwrap();
    pin_mut!(feed);
    assert!(matches!(feed.next().await, Some(SessionFeed::Snapshot(_))));

    session_service::disband(&state, &session.code, "host")
        .await
        .unwrap();
    assert!(matches!(feed.next().await, Some(SessionFeed::Disbanded)));
    assert!(feed.next().await.is_none());
    assert!(state.pacers().get(&session.code).is_none());

    assert!(session_service::get(&state, &session.code).await.is_err());
    assert!(reaper::sweep(&state, SystemTime::now()).await.unwrap().is_empty());
}

#[test]
fn shipped_catalog_is_playable() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/quizzes.json");
    let catalog = QuizCatalog::load(path).unwrap();
    assert!(!catalog.is_empty());

    let raw = std::fs::read_to_string(path).unwrap();
    let quizzes: Vec<QuizEntity> = serde_json::from_str(&raw).unwrap();
    for quiz in quizzes {
        let quiz = Quiz::try_from(quiz).unwrap();
        assert!(!quiz.questions.is_empty());
    }
}

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use validator::Validate;

use crate::{
    dto::{
        answer::{AnswerOutcome, SubmitAnswerRequest},
        participant::{JoinRequest, LeaderboardEntry, LeaderboardResponse, ParticipantSummary},
    },
    error::{AppError, ServiceError},
    routes::extract::{Caller, SessionCode},
    services::{participant_service, scoring_service},
    state::SharedState,
};

/// Participant registry, answer submission and leaderboard routes.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route(
            "/sessions/{code}/participants",
            get(list_participants).post(join_session),
        )
        .route("/sessions/{code}/answers", post(submit_answer))
        .route("/sessions/{code}/leaderboard", get(leaderboard))
}

/// Join the session, or refresh the display name of a returning participant.
#[utoipa::path(
    post,
    path = "/sessions/{code}/participants",
    tag = "participants",
    params(
        ("code" = String, Path, description = "Six-symbol session code"),
        ("X-User-Id" = String, Header, description = "Caller identity"),
        ("X-User-Name" = Option<String>, Header, description = "Fallback display name")
    ),
    request_body = JoinRequest,
    responses(
        (status = 200, description = "Participant registered", body = ParticipantSummary),
        (status = 409, description = "Session already finished")
    )
)]
pub async fn join_session(
    State(state): State<SharedState>,
    SessionCode(code): SessionCode,
    caller: Caller,
    payload: Option<Json<JoinRequest>>,
) -> Result<Json<ParticipantSummary>, AppError> {
    let payload = payload.map(|Json(body)| body).unwrap_or_default();
    payload.validate()?;

    let name = payload
        .name
        .or(caller.name)
        .unwrap_or_else(|| caller.user_id.clone());
    let participant = participant_service::join(&state, &code, &caller.user_id, name).await?;
    Ok(Json(participant.into()))
}

/// Participants in join order.
#[utoipa::path(
    get,
    path = "/sessions/{code}/participants",
    tag = "participants",
    params(("code" = String, Path, description = "Six-symbol session code")),
    responses((status = 200, description = "Registered participants", body = [ParticipantSummary]))
)]
pub async fn list_participants(
    State(state): State<SharedState>,
    SessionCode(code): SessionCode,
) -> Result<Json<Vec<ParticipantSummary>>, AppError> {
    let participants = participant_service::list(&state, &code).await?;
    Ok(Json(participants.into_iter().map(Into::into).collect()))
}

/// Submit the caller's answer to the current question.
///
/// Late submissions are not errors: they come back with `accepted = false`.
#[utoipa::path(
    post,
    path = "/sessions/{code}/answers",
    tag = "answers",
    params(
        ("code" = String, Path, description = "Six-symbol session code"),
        ("X-User-Id" = String, Header, description = "Caller identity")
    ),
    request_body = SubmitAnswerRequest,
    responses(
        (status = 200, description = "Submission graded", body = AnswerOutcome),
        (status = 400, description = "Question index outside the quiz"),
        (status = 404, description = "Caller never joined")
    )
)]
pub async fn submit_answer(
    State(state): State<SharedState>,
    SessionCode(code): SessionCode,
    caller: Caller,
    Json(payload): Json<SubmitAnswerRequest>,
) -> Result<Json<AnswerOutcome>, AppError> {
    let outcome = scoring_service::submit_answer(
        &state,
        &code,
        &caller.user_id,
        payload.question_index,
        payload.answer.into(),
        payload.time_remaining_seconds,
    )
    .await;

    match outcome {
        Ok(outcome) => Ok(Json(outcome.into())),
        Err(ServiceError::StaleSubmission { .. }) => {
            let participant = participant_service::find(&state, &code, &caller.user_id).await?;
            Ok(Json(AnswerOutcome::rejected(participant.score)))
        }
        Err(err) => Err(err.into()),
    }
}

/// Ranked standings of the session.
#[utoipa::path(
    get,
    path = "/sessions/{code}/leaderboard",
    tag = "participants",
    params(("code" = String, Path, description = "Six-symbol session code")),
    responses((status = 200, description = "Ranked standings", body = LeaderboardResponse))
)]
pub async fn leaderboard(
    State(state): State<SharedState>,
    SessionCode(code): SessionCode,
) -> Result<Json<LeaderboardResponse>, AppError> {
    let (session, standings) = participant_service::leaderboard(&state, &code).await?;
    Ok(Json(LeaderboardResponse {
        code: session.code,
        status: session.status.into(),
        entries: standings.iter().map(LeaderboardEntry::from).collect(),
    }))
}

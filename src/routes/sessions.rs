use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
};
use axum_valid::Valid;

use crate::{
    dto::session::{AdvanceQuery, CreateSessionRequest, SessionSummary},
    error::AppError,
    routes::extract::{Caller, SessionCode},
    services::{
        pacing_service::{self, Actor},
        session_service,
    },
    state::SharedState,
};

/// Session lifecycle routes: creation, pacing, heartbeat and disband.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/sessions", post(create_session))
        .route("/sessions/{code}", get(get_session).delete(disband_session))
        .route("/sessions/{code}/start", post(start_session))
        .route("/sessions/{code}/advance", post(advance_session))
        .route("/sessions/{code}/heartbeat", post(heartbeat))
}

/// Open a new session hosted by the caller.
#[utoipa::path(
    post,
    path = "/sessions",
    tag = "sessions",
    params(("X-User-Id" = String, Header, description = "Caller identity")),
    request_body = CreateSessionRequest,
    responses(
        (status = 201, description = "Session created", body = SessionSummary),
        (status = 400, description = "Invalid settings"),
        (status = 404, description = "Unknown quiz")
    )
)]
pub async fn create_session(
    State(state): State<SharedState>,
    caller: Caller,
    Valid(Json(payload)): Valid<Json<CreateSessionRequest>>,
) -> Result<(StatusCode, Json<SessionSummary>), AppError> {
    let session = session_service::create(&state, &caller.user_id, payload).await?;
    Ok((StatusCode::CREATED, Json(session.into())))
}

/// Current snapshot of a session.
#[utoipa::path(
    get,
    path = "/sessions/{code}",
    tag = "sessions",
    params(("code" = String, Path, description = "Six-symbol session code")),
    responses(
        (status = 200, description = "Current snapshot", body = SessionSummary),
        (status = 404, description = "Unknown session")
    )
)]
pub async fn get_session(
    State(state): State<SharedState>,
    SessionCode(code): SessionCode,
) -> Result<Json<SessionSummary>, AppError> {
    Ok(Json(session_service::get(&state, &code).await?.into()))
}

/// Show the first question. Host only.
#[utoipa::path(
    post,
    path = "/sessions/{code}/start",
    tag = "sessions",
    params(
        ("code" = String, Path, description = "Six-symbol session code"),
        ("X-User-Id" = String, Header, description = "Caller identity")
    ),
    responses(
        (status = 200, description = "Session active", body = SessionSummary),
        (status = 403, description = "Caller is not the host"),
        (status = 409, description = "Session already finished")
    )
)]
pub async fn start_session(
    State(state): State<SharedState>,
    SessionCode(code): SessionCode,
    caller: Caller,
) -> Result<Json<SessionSummary>, AppError> {
    let session = session_service::start(&state, &code, &caller.user_id).await?;
    Ok(Json(session.into()))
}

/// Move past the current question; finishes the session after the last one. Host only.
#[utoipa::path(
    post,
    path = "/sessions/{code}/advance",
    tag = "sessions",
    params(
        ("code" = String, Path, description = "Six-symbol session code"),
        ("X-User-Id" = String, Header, description = "Caller identity"),
        AdvanceQuery
    ),
    responses(
        (status = 200, description = "Session after the advance", body = SessionSummary),
        (status = 403, description = "Caller is not the host"),
        (status = 409, description = "Session is not active")
    )
)]
pub async fn advance_session(
    State(state): State<SharedState>,
    SessionCode(code): SessionCode,
    caller: Caller,
    Query(query): Query<AdvanceQuery>,
) -> Result<Json<SessionSummary>, AppError> {
    let session = pacing_service::advance(
        &state,
        &code,
        Actor::User(&caller.user_id),
        query.from_index,
    )
    .await?;
    Ok(Json(session.into()))
}

/// Keep the session from being reaped. Host only.
#[utoipa::path(
    post,
    path = "/sessions/{code}/heartbeat",
    tag = "sessions",
    params(
        ("code" = String, Path, description = "Six-symbol session code"),
        ("X-User-Id" = String, Header, description = "Caller identity")
    ),
    responses(
        (status = 204, description = "Heartbeat recorded"),
        (status = 403, description = "Caller is not the host")
    )
)]
pub async fn heartbeat(
    State(state): State<SharedState>,
    SessionCode(code): SessionCode,
    caller: Caller,
) -> Result<StatusCode, AppError> {
    session_service::heartbeat(&state, &code, &caller.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Delete the session and its participants; streams receive `session.disbanded`. Host only.
#[utoipa::path(
    delete,
    path = "/sessions/{code}",
    tag = "sessions",
    params(
        ("code" = String, Path, description = "Six-symbol session code"),
        ("X-User-Id" = String, Header, description = "Caller identity")
    ),
    responses(
        (status = 204, description = "Session disbanded"),
        (status = 403, description = "Caller is not the host"),
        (status = 404, description = "Unknown session")
    )
)]
pub async fn disband_session(
    State(state): State<SharedState>,
    SessionCode(code): SessionCode,
    caller: Caller,
) -> Result<StatusCode, AppError> {
    session_service::disband(&state, &code, &caller.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

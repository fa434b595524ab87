use std::{convert::Infallible, future::ready};

use axum::{Router, extract::State, response::sse::Sse, routing::get};
use futures::{Stream, StreamExt};
use tracing::info;

use crate::{
    error::AppError,
    routes::extract::SessionCode,
    services::{
        participant_service, session_service,
        sse_events,
        sse_service::{self, StreamKind},
    },
    state::SharedState,
};

#[utoipa::path(
    get,
    path = "/sse/sessions/{code}",
    tag = "sse",
    params(("code" = String, Path, description = "Six-symbol session code")),
    responses(
        (status = 200, description = "`session.snapshot` events, then `session.disbanded`", content_type = "text/event-stream", body = String),
        (status = 404, description = "Unknown session")
    )
)]
/// Stream the session snapshot and every committed lifecycle change.
pub async fn session_stream(
    State(state): State<SharedState>,
    SessionCode(code): SessionCode,
) -> Result<Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>>, AppError> {
    let feed = session_service::subscribe(&state, &code).await?;
    info!(%code, "New session SSE connection");

    let event_code = code.clone();
    let events = feed.filter_map(move |item| ready(sse_events::session_event(&event_code, item)));
    Ok(sse_service::to_sse_stream(events, code, StreamKind::Session))
}

#[utoipa::path(
    get,
    path = "/sse/sessions/{code}/participants",
    tag = "sse",
    params(("code" = String, Path, description = "Six-symbol session code")),
    responses(
        (status = 200, description = "`participants.snapshot` events, then `session.disbanded`", content_type = "text/event-stream", body = String),
        (status = 404, description = "Unknown session")
    )
)]
/// Stream the ranked roster on every join and score change.
pub async fn participants_stream(
    State(state): State<SharedState>,
    SessionCode(code): SessionCode,
) -> Result<Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>>, AppError> {
    let feed = participant_service::subscribe(&state, &code).await?;
    info!(%code, "New participants SSE connection");

    let event_code = code.clone();
    let events = feed.filter_map(move |item| ready(sse_events::roster_event(&event_code, item)));
    Ok(sse_service::to_sse_stream(
        events,
        code,
        StreamKind::Participants,
    ))
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/sse/sessions/{code}", get(session_stream))
        .route("/sse/sessions/{code}/participants", get(participants_stream))
}

use axum::Router;

use crate::state::SharedState;

/// Operator endpoints.
pub mod admin;
/// Swagger UI and OpenAPI document.
pub mod docs;
pub mod extract;
/// Liveness endpoint.
pub mod health;
/// Participant registry, answers and leaderboard.
pub mod participants;
/// Session lifecycle.
pub mod sessions;
/// Server-sent event streams.
pub mod sse;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(sessions::router())
        .merge(participants::router())
        .merge(sse::router())
        .merge(admin::router(state.clone()));

    let docs_router = docs::router(state.clone());

    api_router.merge(docs_router).with_state(state)
}

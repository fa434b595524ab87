use std::time::SystemTime;

use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::Request,
    middleware::{self, Next},
    response::Response,
    routing::post,
};

use crate::{dto::admin::SweepResponse, error::AppError, services::reaper, state::SharedState};

const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Operator endpoints guarded by the `X-Admin-Token` header.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/admin/sweep", post(sweep))
        .route_layer(middleware::from_fn_with_state(state, require_admin_token))
}

/// Run the orphaned-session sweep now instead of waiting for the next tick.
#[utoipa::path(
    post,
    path = "/admin/sweep",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Token configured through ARENA_ADMIN_TOKEN")),
    responses(
        (status = 200, description = "Sessions finalized by this sweep", body = SweepResponse),
        (status = 401, description = "Missing or wrong admin token")
    )
)]
pub async fn sweep(State(state): State<SharedState>) -> Result<Json<SweepResponse>, AppError> {
    let finalized = reaper::sweep(&state, SystemTime::now()).await?;
    Ok(Json(SweepResponse { finalized }))
}

async fn require_admin_token(
    State(state): State<SharedState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let provided = req
        .headers()
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| {
            AppError::Unauthorized("missing admin token header `X-Admin-Token`".into())
        })?;

    match state.config().admin_token.as_deref() {
        Some(token) if token == provided => Ok(next.run(req).await),
        Some(_) => Err(AppError::Unauthorized("invalid admin token".into())),
        None => Err(AppError::Unauthorized("admin token is not configured".into())),
    }
}

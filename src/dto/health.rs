use serde::Serialize;
use utoipa::ToSchema;

/// Liveness report returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// "ok", or "degraded" while no storage backend is installed.
    pub status: &'static str,
    /// Sessions with at least one live fan-out hub.
    pub live_sessions: usize,
    /// Auto-paced sessions with an armed question timer.
    pub armed_timers: usize,
}

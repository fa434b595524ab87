use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report liveness counters while logging connectivity issues.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.session_store().await {
        Ok(store) => {
            if let Err(err) = store.health_check().await {
                warn!(error = %err, "storage health check failed");
            }
        }
        Err(_) => warn!("storage unavailable (degraded mode)"),
    }

    HealthResponse {
        status: if state.is_degraded() { "degraded" } else { "ok" },
        live_sessions: state.hubs().len(),
        armed_timers: state.pacers().len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::AppConfig, services::test_support::arena_state, state::AppState};

    #[tokio::test]
    async fn reports_degraded_without_storage() {
        let state = AppState::new(AppConfig::default());
        assert_eq!(health_status(&state).await.status, "degraded");

        let state = arena_state();
        let report = health_status(&state).await;
        assert_eq!(report.status, "ok");
        assert_eq!(report.armed_timers, 0);
    }
}

/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Ranked leaderboard projection.
pub mod leaderboard;
/// Question advancement and the server-side question timer.
pub mod pacing_service;
/// Participant registry: joins, listings and the roster stream.
pub mod participant_service;
/// Quiz definition lookup and caching.
pub mod quiz_service;
/// Orphaned session sweep.
pub mod reaper;
/// Answer grading and point formula.
pub mod scoring;
/// Answer submission and score crediting.
pub mod scoring_service;
/// Session lifecycle: create, start, heartbeat, disband and the session stream.
pub mod session_service;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events response plumbing.
pub mod sse_service;
/// Storage connection supervisor driving degraded mode.
pub mod storage_supervisor;

#[cfg(test)]
pub(crate) mod test_support;

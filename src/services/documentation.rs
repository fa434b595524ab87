use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Quiz Arena Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sessions::create_session,
        crate::routes::sessions::get_session,
        crate::routes::sessions::start_session,
        crate::routes::sessions::advance_session,
        crate::routes::sessions::heartbeat,
        crate::routes::sessions::disband_session,
        crate::routes::participants::join_session,
        crate::routes::participants::list_participants,
        crate::routes::participants::submit_answer,
        crate::routes::participants::leaderboard,
        crate::routes::sse::session_stream,
        crate::routes::sse::participants_stream,
        crate::routes::admin::sweep,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::session::CreateSessionRequest,
            crate::dto::session::SessionSummary,
            crate::dto::session::SessionStatusDto,
            crate::dto::session::FinishReasonDto,
            crate::dto::participant::JoinRequest,
            crate::dto::participant::ParticipantSummary,
            crate::dto::participant::LeaderboardEntry,
            crate::dto::participant::LeaderboardResponse,
            crate::dto::participant::RosterSnapshot,
            crate::dto::answer::SubmittedAnswer,
            crate::dto::answer::SubmitAnswerRequest,
            crate::dto::answer::AnswerOutcome,
            crate::dto::sse::SessionDisbandedEvent,
            crate::dto::admin::SweepResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sessions", description = "Session lifecycle and pacing"),
        (name = "participants", description = "Participant registry and leaderboard"),
        (name = "answers", description = "Answer submission and scoring"),
        (name = "sse", description = "Server-sent events streams"),
        (name = "admin", description = "Operator endpoints"),
    )
)]
pub struct ApiDoc;

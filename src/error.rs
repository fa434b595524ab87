use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::{
    dao::storage::StorageError,
    state::{
        quiz::MalformedQuiz,
        state_machine::{ApplyError, InvalidTransition},
    },
};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Storage backend is unavailable.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// Application is running in degraded mode without storage.
    #[error("storage unavailable (degraded mode)")]
    Degraded,
    /// Caller identity is missing or rejected.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// No quiz with this id in the configured provider.
    #[error("quiz `{0}` not found")]
    QuizNotFound(String),
    /// No session with this code.
    #[error("session `{0}` not found")]
    SessionNotFound(String),
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Only the session host may perform this action.
    #[error("only the host of session `{0}` may do this")]
    NotHost(String),
    /// The event is not allowed from the session's current status.
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
    /// The answer targets a question that is no longer open.
    #[error("submission for question {question_index} of `{code}` is stale")]
    StaleSubmission {
        /// Session code.
        code: String,
        /// Question the answer targeted.
        question_index: usize,
    },
    /// Optimistic writes kept losing; the caller may retry.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::Unavailable(err)
    }
}

impl From<MalformedQuiz> for ServiceError {
    fn from(err: MalformedQuiz) -> Self {
        ServiceError::InvalidInput(err.to_string())
    }
}

impl From<ApplyError> for ServiceError {
    fn from(err: ApplyError) -> Self {
        ServiceError::Conflict(err.to_string())
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest(format!("validation failed: {}", err))
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Unauthorized access attempt.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Authenticated caller lacks the required role.
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Service unavailable or degraded.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unavailable(StorageError::Corrupted { key, message }) => {
                AppError::Internal(format!("corrupted record `{key}`: {message}"))
            }
            ServiceError::Unavailable(source) => AppError::ServiceUnavailable(source.to_string()),
            ServiceError::Degraded => AppError::ServiceUnavailable("degraded mode".into()),
            ServiceError::Unauthorized(message) => AppError::Unauthorized(message),
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            err @ (ServiceError::QuizNotFound(_)
            | ServiceError::SessionNotFound(_)
            | ServiceError::NotFound(_)) => AppError::NotFound(err.to_string()),
            err @ ServiceError::NotHost(_) => AppError::Forbidden(err.to_string()),
            err @ (ServiceError::InvalidTransition(_)
            | ServiceError::StaleSubmission { .. }
            | ServiceError::Conflict(_)) => AppError::Conflict(err.to_string()),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{session::SessionStatus, state_machine::SessionEvent};

    fn status_of(err: ServiceError) -> StatusCode {
        AppError::from(err).into_response().status()
    }

    #[test]
    fn service_errors_map_to_http_statuses() {
        assert_eq!(
            status_of(ServiceError::SessionNotFound("ABCDEF".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(ServiceError::NotHost("ABCDEF".into())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(ServiceError::InvalidTransition(InvalidTransition {
                from: SessionStatus::Finished,
                event: SessionEvent::Start,
            })),
            StatusCode::CONFLICT
        );
        assert_eq!(status_of(ServiceError::Degraded), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            status_of(ServiceError::Unavailable(StorageError::corrupted("k", "bad"))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}

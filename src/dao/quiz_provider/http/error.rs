//! Failures of the HTTP quiz provider.

use reqwest::StatusCode;
use thiserror::Error;

/// Result of a quiz service call.
pub type HttpQuizResult<T> = Result<T, HttpQuizError>;

/// Failures of the HTTP quiz provider.
#[derive(Debug, Error)]
pub enum HttpQuizError {
    /// A required environment variable is unset.
    #[error("missing quiz service environment variable `{var}`")]
    MissingEnvVar {
        /// Environment variable.
        var: &'static str,
    },
    /// The base url is not a hierarchical url.
    #[error("quiz service url `{url}` cannot hold a path")]
    InvalidBaseUrl {
        /// Requested URL.
        url: String,
    },
    /// The HTTP client could not be built.
    #[error("failed to build quiz service client")]
    ClientBuilder {
        /// Underlying error.
        #[source]
        source: reqwest::Error,
    },
    /// The request did not reach the service.
    #[error("failed to reach quiz service at `{url}`")]
    RequestSend {
        /// Offending URL.
        url: String,
        /// Underlying error.
        #[source]
        source: reqwest::Error,
    },
    /// The service answered with an unexpected status.
    #[error("unexpected quiz service status {status} for `{url}`")]
    RequestStatus {
        /// Requested URL.
        url: String,
        /// HTTP status returned.
        status: StatusCode,
    },
    /// The response body is not a quiz.
    #[error("failed to decode quiz `{id}` from quiz service")]
    DecodeResponse {
        /// Quiz identifier.
        id: String,
        /// Underlying error.
        #[source]
        source: reqwest::Error,
    },
}

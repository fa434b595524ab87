//! Request extractors shared by the session routes.

use axum::{
    extract::{FromRequestParts, Path},
    http::request::Parts,
};

use crate::{dto::validation::validate_session_code, error::AppError, state::code::normalize_code};

const USER_ID_HEADER: &str = "x-user-id";
const USER_NAME_HEADER: &str = "x-user-name";

/// Identity forwarded by the upstream authentication layer.
#[derive(Debug, Clone)]
pub struct Caller {
    /// Value of `X-User-Id`.
    pub user_id: String,
    /// Display name, when the upstream layer knows one.
    pub name: Option<String>,
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_owned)
        };

        let user_id = header(USER_ID_HEADER).ok_or_else(|| {
            AppError::Unauthorized("missing caller identity header `X-User-Id`".into())
        })?;
        Ok(Self {
            user_id,
            name: header(USER_NAME_HEADER),
        })
    }
}

/// Session code taken from the `{code}` path segment, normalized to upper case.
#[derive(Debug, Clone)]
pub struct SessionCode(pub String);

impl<S> FromRequestParts<S> for SessionCode
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|err| AppError::BadRequest(err.body_text()))?;

        validate_session_code(&raw).map_err(|err| {
            AppError::BadRequest(
                err.message
                    .map(|message| message.into_owned())
                    .unwrap_or_else(|| "invalid session code".into()),
            )
        })?;
        normalize_code(&raw)
            .map(SessionCode)
            .ok_or_else(|| AppError::BadRequest("invalid session code".into()))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;

    async fn caller(request: Request<()>) -> Result<Caller, AppError> {
        let (mut parts, _) = request.into_parts();
        Caller::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn caller_requires_a_user_id() {
        let err = caller(Request::builder().body(()).unwrap()).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));

        let found = caller(
            Request::builder()
                .header("X-User-Id", " u1 ")
                .header("X-User-Name", "Ada")
                .body(())
                .unwrap(),
        )
        .await
        .unwrap();
        assert_eq!(found.user_id, "u1");
        assert_eq!(found.name.as_deref(), Some("Ada"));
    }
}

use super::error::{HttpQuizError, HttpQuizResult};

/// Where the external quiz service lives and how to authenticate against it.
#[derive(Debug, Clone)]
pub struct HttpQuizConfig {
    /// Service root, e.g. `https://quizzes.internal/api`.
    pub base_url: String,
    /// Token sent as `Authorization: Bearer`.
    pub bearer_token: Option<String>,
}

impl HttpQuizConfig {
    /// Config without authentication.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            bearer_token: None,
        }
    }

    /// Attach a bearer token sent with every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Read `QUIZ_SERVICE_URL` and the optional `QUIZ_SERVICE_TOKEN`.
    pub fn from_env() -> HttpQuizResult<Self> {
        let base_url = std::env::var("QUIZ_SERVICE_URL").map_err(|_| {
            HttpQuizError::MissingEnvVar {
                var: "QUIZ_SERVICE_URL",
            }
        })?;

        let mut config = Self::new(base_url);
        if let Ok(token) = std::env::var("QUIZ_SERVICE_TOKEN") {
            config = config.with_token(token);
        }
        Ok(config)
    }
}

use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, StatusCode, Url};
use tracing::debug;

use super::{
    config::HttpQuizConfig,
    error::{HttpQuizError, HttpQuizResult},
};
use crate::dao::{models::QuizEntity, quiz_provider::QuizProvider, storage::StorageResult};

/// Quiz provider backed by the quiz authoring service (`GET {base}/quizzes/{id}`).
#[derive(Clone)]
pub struct HttpQuizProvider {
    client: Client,
    base_url: Url,
    token: Option<Arc<str>>,
}

impl HttpQuizProvider {
    /// Build a provider; fails on a base url that cannot hold a path.
    pub fn new(config: HttpQuizConfig) -> HttpQuizResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| HttpQuizError::ClientBuilder { source })?;

        let base_url = Url::parse(&config.base_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| HttpQuizError::InvalidBaseUrl {
                url: config.base_url.clone(),
            })?;

        Ok(Self {
            client,
            base_url,
            token: config.bearer_token.map(Arc::from),
        })
    }

    /// `{base}/quizzes/{id}` with `id` encoded as a single path segment.
    fn quiz_url(&self, id: &str) -> HttpQuizResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| HttpQuizError::InvalidBaseUrl {
                url: self.base_url.to_string(),
            })?
            .pop_if_empty()
            .push("quizzes")
            .push(id);
        Ok(url)
    }

    async fn fetch_quiz(&self, id: String) -> HttpQuizResult<Option<QuizEntity>> {
        if matches!(id.as_str(), "" | "." | "..") {
            return Ok(None);
        }
        let url = self.quiz_url(&id)?;
        let mut builder = self.client.get(url.clone());
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token.as_ref());
        }

        let response = builder
            .send()
            .await
            .map_err(|source| HttpQuizError::RequestSend {
                url: url.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::OK => {
                let quiz = response
                    .json::<QuizEntity>()
                    .await
                    .map_err(|source| HttpQuizError::DecodeResponse { id, source })?;
                Ok(Some(quiz))
            }
            StatusCode::NOT_FOUND => {
                debug!(quiz_id = %id, "quiz service does not know this quiz");
                Ok(None)
            }
            status => Err(HttpQuizError::RequestStatus {
                url: url.to_string(),
                status,
            }),
        }
    }
}

impl QuizProvider for HttpQuizProvider {
    fn find_quiz(&self, id: String) -> BoxFuture<'static, StorageResult<Option<QuizEntity>>> {
        let provider = self.clone();
        Box::pin(async move { provider.fetch_quiz(id).await.map_err(Into::into) })
    }
}

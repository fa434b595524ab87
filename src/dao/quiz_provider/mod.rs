//! Read-only access to quiz definitions owned by external collaborators.

pub mod catalog;
/// Client of an external quiz service.
#[cfg(feature = "http-quizzes")]
pub mod http;

use futures::future::BoxFuture;

use crate::dao::{models::QuizEntity, storage::StorageResult};

/// Source of quiz definitions, resolved by id.
pub trait QuizProvider: Send + Sync {
    /// Fetch a quiz; `Ok(None)` when the id is unknown to the provider.
    fn find_quiz(&self, id: String) -> BoxFuture<'static, StorageResult<Option<QuizEntity>>>;
}

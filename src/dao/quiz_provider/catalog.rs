//! Quiz catalog loaded once from a JSON file.

use std::{collections::HashMap, fs, path::Path, sync::Arc};

use futures::future::{BoxFuture, ready};
use thiserror::Error;

use crate::dao::{models::QuizEntity, quiz_provider::QuizProvider, storage::StorageResult};

/// Failures raised while loading a catalog file.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The file could not be read.
    #[error("failed to read quiz catalog `{path}`")]
    Read {
        /// File that was read.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The file is not a JSON array of quizzes.
    #[error("failed to parse quiz catalog `{path}`")]
    Parse {
        /// File that was read.
        path: String,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
}

/// Immutable in-memory quiz catalog.
#[derive(Clone, Default)]
pub struct QuizCatalog {
    quizzes: Arc<HashMap<String, QuizEntity>>,
}

impl QuizCatalog {
    /// Load a JSON array of quizzes from `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let contents = fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: display.clone(),
            source,
        })?;
        let quizzes: Vec<QuizEntity> =
            serde_json::from_str(&contents).map_err(|source| CatalogError::Parse {
                path: display,
                source,
            })?;
        Ok(Self::from_quizzes(quizzes))
    }

    /// Build a catalog from quizzes already in memory.
    pub fn from_quizzes(quizzes: impl IntoIterator<Item = QuizEntity>) -> Self {
        let quizzes = quizzes
            .into_iter()
            .map(|quiz| (quiz.id.clone(), quiz))
            .collect();
        Self {
            quizzes: Arc::new(quizzes),
        }
    }

    /// Number of quizzes.
    pub fn len(&self) -> usize {
        self.quizzes.len()
    }

    /// Whether the catalog holds no quiz.
    pub fn is_empty(&self) -> bool {
        self.quizzes.is_empty()
    }
}

impl QuizProvider for QuizCatalog {
    fn find_quiz(&self, id: String) -> BoxFuture<'static, StorageResult<Option<QuizEntity>>> {
        Box::pin(ready(Ok(self.quizzes.get(&id).cloned())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"[
        {
            "id": "capitals",
            "title": "Capitals",
            "questions": [
                { "id": "q1", "type": "multiple_choice", "question": "Capital of France?",
                  "options": ["Paris", "Lyon"], "answer": "Paris", "points": 10 },
                { "id": "q2", "type": "true-false", "question": "Bern is a capital.", "answer": true }
            ]
        }
    ]"#;

    #[tokio::test]
    async fn catalog_resolves_known_ids_only() {
        let quizzes: Vec<QuizEntity> = serde_json::from_str(CATALOG).unwrap();
        let catalog = QuizCatalog::from_quizzes(quizzes);
        assert_eq!(catalog.len(), 1);

        let quiz = catalog.find_quiz("capitals".into()).await.unwrap().unwrap();
        assert_eq!(quiz.questions.len(), 2);
        assert!(catalog.find_quiz("missing".into()).await.unwrap().is_none());
    }

    #[test]
    fn load_reports_missing_file() {
        let err = QuizCatalog::load("/nonexistent/quizzes.json")
            .err()
            .expect("missing file must fail");
        assert!(matches!(err, CatalogError::Read { .. }));
    }
}

mod config;
mod error;
mod store;

pub use config::HttpQuizConfig;
pub use error::HttpQuizError;
pub use store::HttpQuizProvider;

use crate::dao::storage::StorageError;

impl From<HttpQuizError> for StorageError {
    fn from(err: HttpQuizError) -> Self {
        StorageError::unavailable("quiz service failure".to_owned(), err)
    }
}

mod config;
mod error;
mod models;
/// Store implementation over the `sessions`, `participants` and `quizzes` collections.
pub mod store;

pub use config::MongoConfig;
pub use error::MongoDaoError;
pub use store::MongoSessionStore;

use crate::dao::storage::StorageError;

impl From<MongoDaoError> for StorageError {
    fn from(err: MongoDaoError) -> Self {
        match err {
            MongoDaoError::CorruptedDocument { key, field } => {
                StorageError::corrupted(key, format!("invalid `{field}` value"))
            }
            other => StorageError::unavailable(other.to_string(), other),
        }
    }
}

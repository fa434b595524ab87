//! Selection and construction of the storage backend from deployment settings.

use std::{env, path::PathBuf, sync::Arc};

use thiserror::Error;
use tracing::info;

use crate::dao::{
    quiz_provider::{QuizProvider, catalog::QuizCatalog},
    session_store::{SessionStore, memory::MemorySessionStore},
    storage::{StorageError, StorageResult},
};

const STORE_ENV: &str = "ARENA_STORE";
const QUIZ_SOURCE_ENV: &str = "ARENA_QUIZ_SOURCE";
#[cfg(feature = "mongo-store")]
const DEFAULT_MONGO_URI: &str = "mongodb://localhost:27017";

/// Invalid backend selection found in the environment.
#[derive(Debug, Error)]
pub enum BackendConfigError {
    /// An environment variable holds a value the server does not know.
    #[error("unknown value `{value}` for `{var}`")]
    UnknownValue {
        /// Environment variable.
        var: &'static str,
        /// Configured value.
        value: String,
    },
    /// The value names a backend compiled out of this build.
    #[error("`{value}` requires the `{feature}` feature")]
    FeatureDisabled {
        /// Configured value.
        value: String,
        /// Cargo feature that enables it.
        feature: &'static str,
    },
    /// `ARENA_QUIZ_SOURCE=mongo` without `ARENA_STORE=mongo`.
    #[error("quizzes can only be read from MongoDB when sessions are stored there too")]
    MongoQuizzesWithoutMongoStore,
}

/// Where session and participant records live.
#[derive(Clone)]
pub enum StoreKind {
    /// Process-local store; the handle is kept so reconnects return the same data.
    Memory(MemorySessionStore),
    /// MongoDB deployment.
    #[cfg(feature = "mongo-store")]
    Mongo {
        /// Connection string.
        uri: String,
        /// Database override.
        database: Option<String>,
    },
}

/// Where quiz definitions are read from.
#[derive(Clone)]
pub enum QuizSource {
    /// JSON catalog file.
    Catalog(PathBuf),
    /// The `quizzes` collection of the session database.
    #[cfg(feature = "mongo-store")]
    Mongo,
    /// External quiz service, configured from `QUIZ_SERVICE_URL`.
    #[cfg(feature = "http-quizzes")]
    Http,
}

/// Deployment choice of store and quiz source.
#[derive(Clone)]
pub struct BackendSettings {
    /// Session store.
    pub store: StoreKind,
    /// Quiz source.
    pub quizzes: QuizSource,
}

/// Connected handles installed into the shared state.
#[derive(Clone)]
pub struct StorageBackend {
    /// Session and participant records.
    pub sessions: Arc<dyn SessionStore>,
    /// Quiz definitions.
    pub quizzes: Arc<dyn QuizProvider>,
}

impl BackendSettings {
    /// In-memory sessions with quizzes from the given catalog file.
    pub fn in_memory(catalog: impl Into<PathBuf>) -> Self {
        Self {
            store: StoreKind::Memory(MemorySessionStore::new()),
            quizzes: QuizSource::Catalog(catalog.into()),
        }
    }

    /// Read `ARENA_STORE` (`memory` | `mongodb`) and `ARENA_QUIZ_SOURCE`
    /// (`catalog` | `mongodb` | `http`).
    pub fn from_env(catalog: PathBuf) -> Result<Self, BackendConfigError> {
        let store = match env::var(STORE_ENV).ok().as_deref().map(str::trim) {
            None | Some("") | Some("memory") => StoreKind::Memory(MemorySessionStore::new()),
            Some("mongodb") | Some("mongo") => mongo_store_kind()?,
            Some(other) => {
                return Err(BackendConfigError::UnknownValue {
                    var: STORE_ENV,
                    value: other.to_owned(),
                });
            }
        };

        let quizzes = match env::var(QUIZ_SOURCE_ENV).ok().as_deref().map(str::trim) {
            None | Some("") | Some("catalog") => QuizSource::Catalog(catalog),
            Some("mongodb") | Some("mongo") => mongo_quiz_source(&store)?,
            Some("http") => http_quiz_source()?,
            Some(other) => {
                return Err(BackendConfigError::UnknownValue {
                    var: QUIZ_SOURCE_ENV,
                    value: other.to_owned(),
                });
            }
        };

        Ok(Self { store, quizzes })
    }

    /// Short label used in logs.
    pub fn describe(&self) -> &'static str {
        match self.store {
            StoreKind::Memory(_) => "memory",
            #[cfg(feature = "mongo-store")]
            StoreKind::Mongo { .. } => "mongodb",
        }
    }
}

#[cfg(feature = "mongo-store")]
fn mongo_store_kind() -> Result<StoreKind, BackendConfigError> {
    Ok(StoreKind::Mongo {
        uri: env::var("MONGO_URI").unwrap_or_else(|_| DEFAULT_MONGO_URI.into()),
        database: env::var("MONGO_DB").ok(),
    })
}

#[cfg(not(feature = "mongo-store"))]
fn mongo_store_kind() -> Result<StoreKind, BackendConfigError> {
    Err(BackendConfigError::FeatureDisabled {
        value: "mongodb".into(),
        feature: "mongo-store",
    })
}

#[cfg(feature = "mongo-store")]
fn mongo_quiz_source(store: &StoreKind) -> Result<QuizSource, BackendConfigError> {
    match store {
        StoreKind::Mongo { .. } => Ok(QuizSource::Mongo),
        StoreKind::Memory(_) => Err(BackendConfigError::MongoQuizzesWithoutMongoStore),
    }
}

#[cfg(not(feature = "mongo-store"))]
fn mongo_quiz_source(_store: &StoreKind) -> Result<QuizSource, BackendConfigError> {
    Err(BackendConfigError::FeatureDisabled {
        value: "mongodb".into(),
        feature: "mongo-store",
    })
}

#[cfg(feature = "http-quizzes")]
fn http_quiz_source() -> Result<QuizSource, BackendConfigError> {
    Ok(QuizSource::Http)
}

#[cfg(not(feature = "http-quizzes"))]
fn http_quiz_source() -> Result<QuizSource, BackendConfigError> {
    Err(BackendConfigError::FeatureDisabled {
        value: "http".into(),
        feature: "http-quizzes",
    })
}

/// Connect the configured store and quiz provider.
pub async fn connect(settings: BackendSettings) -> StorageResult<StorageBackend> {
    match settings.store {
        StoreKind::Memory(store) => {
            let quizzes = connect_quizzes(settings.quizzes, None)?;
            Ok(StorageBackend {
                sessions: Arc::new(store),
                quizzes,
            })
        }
        #[cfg(feature = "mongo-store")]
        StoreKind::Mongo { uri, database } => {
            use crate::dao::session_store::mongodb::{MongoConfig, MongoSessionStore};

            let config = MongoConfig::from_uri(&uri, database.as_deref()).await?;
            let store = MongoSessionStore::connect(config).await?;
            let quizzes = connect_quizzes(settings.quizzes, Some(&store))?;
            Ok(StorageBackend {
                sessions: Arc::new(store),
                quizzes,
            })
        }
    }
}

#[cfg(feature = "mongo-store")]
type MongoHandle<'a> = Option<&'a crate::dao::session_store::mongodb::MongoSessionStore>;
#[cfg(not(feature = "mongo-store"))]
type MongoHandle<'a> = Option<&'a std::convert::Infallible>;

#[cfg_attr(not(feature = "mongo-store"), allow(unused_variables))]
fn connect_quizzes(
    source: QuizSource,
    mongo: MongoHandle<'_>,
) -> StorageResult<Arc<dyn QuizProvider>> {
    match source {
        QuizSource::Catalog(path) => {
            let catalog = QuizCatalog::load(&path).map_err(|err| {
                StorageError::unavailable(format!("quiz catalog {}", path.display()), err)
            })?;
            info!(path = %path.display(), count = catalog.len(), "loaded quiz catalog");
            Ok(Arc::new(catalog))
        }
        #[cfg(feature = "mongo-store")]
        QuizSource::Mongo => match mongo {
            Some(store) => Ok(Arc::new(store.clone())),
            None => Err(StorageError::unavailable(
                "mongodb quiz source".into(),
                BackendConfigError::MongoQuizzesWithoutMongoStore,
            )),
        },
        #[cfg(feature = "http-quizzes")]
        QuizSource::Http => {
            use crate::dao::quiz_provider::http::{HttpQuizConfig, HttpQuizProvider};

            let provider = HttpQuizConfig::from_env().and_then(HttpQuizProvider::new)?;
            Ok(Arc::new(provider))
        }
    }
}

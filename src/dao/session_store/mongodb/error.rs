use mongodb::error::Error as MongoError;
use thiserror::Error;

/// Result of a MongoDB store call.
pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

/// Failures of the MongoDB store.
#[derive(Debug, Error)]
pub enum MongoDaoError {
    /// The connection string cannot be parsed.
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        /// Connection string as given.
        uri: String,
        /// Underlying error.
        #[source]
        source: MongoError,
    },
    /// The driver rejected the client options.
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        /// Underlying error.
        #[source]
        source: MongoError,
    },
    /// The first ping after connecting failed.
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        /// Pings tried before giving up.
        attempts: u32,
        /// Underlying error.
        #[source]
        source: MongoError,
    },
    /// A health ping failed.
    #[error("MongoDB ping health check failed")]
    HealthPing {
        /// Underlying error.
        #[source]
        source: MongoError,
    },
    /// An index could not be created.
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        /// Target collection.
        collection: &'static str,
        /// Index name.
        index: &'static str,
        /// Underlying error.
        #[source]
        source: MongoError,
    },
    /// A session write failed.
    #[error("failed to write session `{code}`")]
    WriteSession {
        /// Session code.
        code: String,
        /// Underlying error.
        #[source]
        source: MongoError,
    },
    /// A session read failed.
    #[error("failed to load session `{code}`")]
    LoadSession {
        /// Session code.
        code: String,
        /// Underlying error.
        #[source]
        source: MongoError,
    },
    /// Deleting a session or its registry failed.
    #[error("failed to delete session `{code}`")]
    DeleteSession {
        /// Session code.
        code: String,
        /// Underlying error.
        #[source]
        source: MongoError,
    },
    /// The stale session query failed.
    #[error("failed to list stale sessions")]
    ListStaleSessions {
        /// Underlying error.
        #[source]
        source: MongoError,
    },
    /// A participant write failed.
    #[error("failed to write participant `{user_id}` of session `{code}`")]
    WriteParticipant {
        /// Session code.
        code: String,
        /// Participant identity.
        user_id: String,
        /// Underlying error.
        #[source]
        source: MongoError,
    },
    /// Listing participants failed.
    #[error("failed to load participants of session `{code}`")]
    LoadParticipants {
        /// Session code.
        code: String,
        /// Underlying error.
        #[source]
        source: MongoError,
    },
    /// A quiz read failed.
    #[error("failed to load quiz `{id}`")]
    LoadQuiz {
        /// Quiz identifier.
        id: String,
        /// Underlying error.
        #[source]
        source: MongoError,
    },
    /// A stored document holds an out-of-range value.
    #[error("stored document `{key}` has an invalid `{field}` value")]
    CorruptedDocument {
        /// Record key.
        key: String,
        /// Field holding the bad value.
        field: &'static str,
    },
}

use std::{sync::Arc, time::Duration, time::SystemTime};

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, Collection, Database, IndexModel,
    bson::{DateTime, doc},
    error::{Error as MongoError, ErrorKind, WriteFailure},
    options::{ClientOptions, IndexOptions, ReturnDocument},
};
use tokio::{sync::RwLock, time::sleep};
use tracing::debug;

use super::{
    config::MongoConfig,
    error::{MongoDaoError, MongoResult},
    models::{
        MongoParticipantDocument, MongoQuizDocument, MongoSessionDocument, participant_defaults,
        participant_filter, session_filter, session_lifecycle_update, status_name,
    },
};
use crate::dao::{
    models::{ParticipantEntity, QuizEntity, SessionEntity, SessionStatusEntity},
    quiz_provider::QuizProvider,
    session_store::{SessionGuard, SessionStore},
    storage::StorageResult,
};

const SESSION_COLLECTION_NAME: &str = "sessions";
const PARTICIPANT_COLLECTION_NAME: &str = "participants";
const QUIZ_COLLECTION_NAME: &str = "quizzes";
const DUPLICATE_KEY_CODE: i32 = 11000;
const MAX_CONNECT_ATTEMPTS: u32 = 10;
const INITIAL_CONNECT_DELAY: Duration = Duration::from_millis(250);
const MAX_CONNECT_DELAY: Duration = Duration::from_secs(5);

/// MongoDB-backed session store, also able to serve quiz definitions from the
/// `quizzes` collection.
#[derive(Clone)]
pub struct MongoSessionStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

impl MongoSessionStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        // The reaper scans by status and heartbeat age.
        let sweep_index = IndexModel::builder()
            .keys(doc! { "status": 1, "last_heartbeat": 1 })
            .options(
                IndexOptions::builder()
                    .name(Some("session_sweep_idx".to_owned()))
                    .build(),
            )
            .build();
        self.sessions()
            .await
            .create_index(sweep_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: SESSION_COLLECTION_NAME,
                index: "status,last_heartbeat",
                source,
            })?;

        let participant_index = IndexModel::builder()
            .keys(doc! { "session_code": 1, "user_id": 1 })
            .options(
                IndexOptions::builder()
                    .name(Some("participant_session_idx".to_owned()))
                    .unique(Some(true))
                    .build(),
            )
            .build();
        self.participants()
            .await
            .create_index(participant_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: PARTICIPANT_COLLECTION_NAME,
                index: "session_code,user_id",
                source,
            })?;

        Ok(())
    }

    async fn sessions(&self) -> Collection<MongoSessionDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoSessionDocument>(SESSION_COLLECTION_NAME)
    }

    async fn participants(&self) -> Collection<MongoParticipantDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoParticipantDocument>(PARTICIPANT_COLLECTION_NAME)
    }

    async fn quizzes(&self) -> Collection<MongoQuizDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoQuizDocument>(QUIZ_COLLECTION_NAME)
    }

    async fn insert_session(&self, session: SessionEntity) -> MongoResult<bool> {
        let code = session.code.clone();
        let document: MongoSessionDocument = session.into();
        match self.sessions().await.insert_one(&document).await {
            Ok(_) => Ok(true),
            Err(err) if is_duplicate_key(&err) => Ok(false),
            Err(source) => Err(MongoDaoError::WriteSession { code, source }),
        }
    }

    async fn find_session(&self, code: String) -> MongoResult<Option<SessionEntity>> {
        let document = self
            .sessions()
            .await
            .find_one(session_filter(&code))
            .await
            .map_err(|source| MongoDaoError::LoadSession {
                code: code.clone(),
                source,
            })?;

        document.map(SessionEntity::try_from).transpose()
    }

    async fn replace_session(
        &self,
        session: SessionEntity,
        guard: SessionGuard,
    ) -> MongoResult<bool> {
        let code = session.code.clone();
        let mut filter = session_filter(&code);
        filter.insert("version", guard.expected_version as i64);
        if let Some(cutoff) = guard.heartbeat_before {
            filter.insert(
                "last_heartbeat",
                doc! { "$lt": DateTime::from_system_time(cutoff) },
            );
        }

        let result = self
            .sessions()
            .await
            .update_one(filter, session_lifecycle_update(&session))
            .await
            .map_err(|source| MongoDaoError::WriteSession { code, source })?;
        Ok(result.matched_count == 1)
    }

    async fn touch_heartbeat(&self, code: String, at: SystemTime) -> MongoResult<bool> {
        let result = self
            .sessions()
            .await
            .update_one(
                session_filter(&code),
                doc! { "$set": { "last_heartbeat": DateTime::from_system_time(at) } },
            )
            .await
            .map_err(|source| MongoDaoError::WriteSession { code, source })?;
        Ok(result.matched_count == 1)
    }

    async fn delete_session(&self, code: String) -> MongoResult<bool> {
        self.participants()
            .await
            .delete_many(doc! { "session_code": &code })
            .await
            .map_err(|source| MongoDaoError::DeleteSession {
                code: code.clone(),
                source,
            })?;

        let result = self
            .sessions()
            .await
            .delete_one(session_filter(&code))
            .await
            .map_err(|source| MongoDaoError::DeleteSession { code, source })?;
        Ok(result.deleted_count > 0)
    }

    async fn list_stale_sessions(&self, cutoff: SystemTime) -> MongoResult<Vec<SessionEntity>> {
        let filter = doc! {
            "status": {
                "$in": [
                    status_name(SessionStatusEntity::Waiting),
                    status_name(SessionStatusEntity::Active),
                ]
            },
            "last_heartbeat": { "$lt": DateTime::from_system_time(cutoff) },
        };

        let documents: Vec<MongoSessionDocument> = self
            .sessions()
            .await
            .find(filter)
            .await
            .map_err(|source| MongoDaoError::ListStaleSessions { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListStaleSessions { source })?;

        documents
            .into_iter()
            .map(SessionEntity::try_from)
            .collect()
    }

    async fn upsert_participant(
        &self,
        code: String,
        user_id: String,
        name: String,
        joined_at: SystemTime,
    ) -> MongoResult<Option<ParticipantEntity>> {
        if self.find_session(code.clone()).await?.is_none() {
            return Ok(None);
        }

        let collection = self.participants().await;
        let update = doc! {
            "$set": { "name": &name },
            "$setOnInsert": participant_defaults(joined_at),
        };

        // Two concurrent first joins race on the unique index; the loser retries
        // and simply matches the row the winner created.
        let mut retried = false;
        let document = loop {
            let outcome = collection
                .find_one_and_update(participant_filter(&code, &user_id), update.clone())
                .upsert(true)
                .return_document(ReturnDocument::After)
                .await;
            match outcome {
                Ok(document) => break document,
                Err(err) if is_duplicate_key(&err) && !retried => {
                    debug!(%code, %user_id, "participant upsert raced; retrying");
                    retried = true;
                }
                Err(source) => {
                    return Err(MongoDaoError::WriteParticipant {
                        code,
                        user_id,
                        source,
                    });
                }
            }
        };

        document.map(ParticipantEntity::try_from).transpose()
    }

    async fn find_participant(
        &self,
        code: String,
        user_id: String,
    ) -> MongoResult<Option<ParticipantEntity>> {
        let document = self
            .participants()
            .await
            .find_one(participant_filter(&code, &user_id))
            .await
            .map_err(|source| MongoDaoError::LoadParticipants { code, source })?;

        document.map(ParticipantEntity::try_from).transpose()
    }

    async fn replace_participant(
        &self,
        participant: ParticipantEntity,
        expected_version: u64,
    ) -> MongoResult<bool> {
        let code = participant.session_code.clone();
        let user_id = participant.user_id.clone();
        let mut filter = participant_filter(&code, &user_id);
        filter.insert("version", expected_version as i64);
        let document: MongoParticipantDocument = participant.into();

        let result = self
            .participants()
            .await
            .replace_one(filter, &document)
            .await
            .map_err(|source| MongoDaoError::WriteParticipant {
                code,
                user_id,
                source,
            })?;
        Ok(result.matched_count == 1)
    }

    async fn list_participants(&self, code: String) -> MongoResult<Vec<ParticipantEntity>> {
        let documents: Vec<MongoParticipantDocument> = self
            .participants()
            .await
            .find(doc! { "session_code": &code })
            .sort(doc! { "joined_at": 1 })
            .await
            .map_err(|source| MongoDaoError::LoadParticipants {
                code: code.clone(),
                source,
            })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::LoadParticipants { code, source })?;

        documents
            .into_iter()
            .map(ParticipantEntity::try_from)
            .collect()
    }

    async fn find_quiz(&self, id: String) -> MongoResult<Option<QuizEntity>> {
        let document = self
            .quizzes()
            .await
            .find_one(doc! { "_id": &id })
            .await
            .map_err(|source| MongoDaoError::LoadQuiz { id, source })?;
        Ok(document.map(Into::into))
    }
}

impl SessionStore for MongoSessionStore {
    fn insert_session(&self, session: SessionEntity) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.insert_session(session).await.map_err(Into::into) })
    }

    fn find_session(&self, code: String) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_session(code).await.map_err(Into::into) })
    }

    fn replace_session(
        &self,
        session: SessionEntity,
        guard: SessionGuard,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .replace_session(session, guard)
                .await
                .map_err(Into::into)
        })
    }

    fn touch_heartbeat(
        &self,
        code: String,
        at: SystemTime,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.touch_heartbeat(code, at).await.map_err(Into::into) })
    }

    fn delete_session(&self, code: String) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.delete_session(code).await.map_err(Into::into) })
    }

    fn list_stale_sessions(
        &self,
        cutoff: SystemTime,
    ) -> BoxFuture<'static, StorageResult<Vec<SessionEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_stale_sessions(cutoff).await.map_err(Into::into) })
    }

    fn upsert_participant(
        &self,
        code: String,
        user_id: String,
        name: String,
        joined_at: SystemTime,
    ) -> BoxFuture<'static, StorageResult<Option<ParticipantEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .upsert_participant(code, user_id, name, joined_at)
                .await
                .map_err(Into::into)
        })
    }

    fn find_participant(
        &self,
        code: String,
        user_id: String,
    ) -> BoxFuture<'static, StorageResult<Option<ParticipantEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_participant(code, user_id)
                .await
                .map_err(Into::into)
        })
    }

    fn replace_participant(
        &self,
        participant: ParticipantEntity,
        expected_version: u64,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .replace_participant(participant, expected_version)
                .await
                .map_err(Into::into)
        })
    }

    fn list_participants(
        &self,
        code: String,
    ) -> BoxFuture<'static, StorageResult<Vec<ParticipantEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_participants(code).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}

impl QuizProvider for MongoSessionStore {
    fn find_quiz(&self, id: String) -> BoxFuture<'static, StorageResult<Option<QuizEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_quiz(id).await.map_err(Into::into) })
    }
}

fn is_duplicate_key(err: &MongoError) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error))
            if write_error.code == DUPLICATE_KEY_CODE
    )
}

/// Build a client and wait until the database answers a ping.
async fn establish_connection(
    options: &ClientOptions,
    database_name: &str,
) -> MongoResult<(Client, Database)> {
    let client = Client::with_options(options.clone())
        .map_err(|source| MongoDaoError::ClientConstruction { source })?;
    let database = client.database(database_name);

    let mut attempts = 0;
    let mut delay = INITIAL_CONNECT_DELAY;

    loop {
        match database.run_command(doc! { "ping": 1 }).await {
            Ok(_) => return Ok((client, database)),
            Err(source) => {
                attempts += 1;
                if attempts >= MAX_CONNECT_ATTEMPTS {
                    return Err(MongoDaoError::InitialPing { attempts, source });
                }
                debug!(attempts, database = database_name, "MongoDB not reachable yet");
                sleep(delay).await;
                delay = (delay * 2).min(MAX_CONNECT_DELAY);
            }
        }
    }
}

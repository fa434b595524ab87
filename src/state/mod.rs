pub mod code;
/// Per-session broadcast hubs.
pub mod hub;
/// Quiz definitions prepared for grading.
pub mod quiz;
/// Runtime session and participant types.
pub mod session;
/// Session lifecycle rules.
pub mod state_machine;
/// Committing lifecycle writes.
pub mod transitions;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::{
    sync::{RwLock, watch},
    task::JoinHandle,
};

use crate::{
    config::AppConfig,
    dao::{backend::StorageBackend, quiz_provider::QuizProvider, session_store::SessionStore},
    error::ServiceError,
};

use self::{hub::SessionHubs, quiz::Quiz};

/// Application state shared by handlers and workers.
pub type SharedState = Arc<AppState>;

/// Server-side countdown armed for one question of an auto-paced session.
pub struct PacingTimer {
    /// Question index the timer will advance from.
    pub index: usize,
    /// Session version the timer was armed for.
    pub version: u64,
    /// Task sleeping until the question closes.
    pub handle: JoinHandle<()>,
}

/// Central application state: storage handles, fan-out hubs and pacing timers.
pub struct AppState {
    config: AppConfig,
    backend: RwLock<Option<StorageBackend>>,
    session_quizzes: DashMap<String, Arc<Quiz>>,
    hubs: SessionHubs,
    pacers: DashMap<String, PacingTimer>,
    degraded: watch::Sender<bool>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        Self::build(config, None)
    }

    /// Construct a state with the backend already installed.
    pub fn with_backend(config: AppConfig, backend: StorageBackend) -> SharedState {
        Self::build(config, Some(backend))
    }

    fn build(config: AppConfig, backend: Option<StorageBackend>) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(backend.is_none());
        let hubs = SessionHubs::new(config.hub_capacity);
        Arc::new(Self {
            config,
            backend: RwLock::new(backend),
            session_quizzes: DashMap::new(),
            hubs,
            pacers: DashMap::new(),
            degraded: degraded_tx,
        })
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Session store, or [`ServiceError::Degraded`] when none is installed.
    pub async fn session_store(&self) -> Result<Arc<dyn SessionStore>, ServiceError> {
        let guard = self.backend.read().await;
        guard
            .as_ref()
            .map(|backend| backend.sessions.clone())
            .ok_or(ServiceError::Degraded)
    }

    /// Quiz provider, or [`ServiceError::Degraded`] when none is installed.
    pub async fn quiz_provider(&self) -> Result<Arc<dyn QuizProvider>, ServiceError> {
        let guard = self.backend.read().await;
        guard
            .as_ref()
            .map(|backend| backend.quizzes.clone())
            .ok_or(ServiceError::Degraded)
    }

    /// Install a connected backend and leave degraded mode.
    pub async fn install_backend(&self, backend: StorageBackend) {
        {
            let mut guard = self.backend.write().await;
            *guard = Some(backend);
        }
        self.update_degraded(false);
    }

    /// Drop the current backend and enter degraded mode.
    pub async fn clear_backend(&self) {
        {
            let mut guard = self.backend.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        });
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Quiz definitions pinned to the live sessions they are played in, keyed by code.
    pub fn session_quizzes(&self) -> &DashMap<String, Arc<Quiz>> {
        &self.session_quizzes
    }

    /// Per-session broadcast hubs.
    pub fn hubs(&self) -> &SessionHubs {
        &self.hubs
    }

    /// Armed question timers keyed by session code.
    pub fn pacers(&self) -> &DashMap<String, PacingTimer> {
        &self.pacers
    }
}

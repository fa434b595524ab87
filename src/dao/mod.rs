/// Backend selection and connection.
pub mod backend;
/// Shared storage models for sessions, participants and quizzes.
pub mod models;
/// Read-only quiz definition sources.
pub mod quiz_provider;
/// Session and participant persistence.
pub mod session_store;
/// Storage abstraction layer errors.
pub mod storage;

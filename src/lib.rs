//! Library crate for quiz-arena-back, exposing modules for binaries and integration tests.

pub mod config;
/// Persistence layer: stores, quiz providers and backend selection.
pub mod dao;
/// Request and response payloads of the HTTP API.
pub mod dto;
/// Domain and HTTP error types.
pub mod error;
/// Axum routers and extractors.
pub mod routes;
/// Use cases behind the routes, plus the background workers.
pub mod services;
/// Shared runtime state: sessions, hubs, timers.
pub mod state;

//! Shared request-handler state.
//!
//! # Invariants
//! - One connection guarded by a mutex; requests execute their storage work
//!   serially, matching the app's single-request processing model.
//! - Handlers never hold the guard across an await point.

use memolog_core::GeminiConfig;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

/// Application state cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    /// Backend credential/config; absent key means template-only generation.
    pub gemini: GeminiConfig,
}

impl AppState {
    pub fn new(conn: Connection, gemini: GeminiConfig) -> Self {
        Self {
            db: Arc::new(Mutex::new(conn)),
            gemini,
        }
    }
}

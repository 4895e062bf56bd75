//! memolog HTTP server entry point.
//!
//! Environment:
//! - `MEMOLOG_DB_PATH` — SQLite file path (default `memolog.sqlite3`).
//! - `MEMOLOG_ADDR` — listen address (default `127.0.0.1:3000`).
//! - `MEMOLOG_LOG_DIR` — absolute directory for rolling logs; unset keeps
//!   logging disabled.
//! - `GEMINI_API_KEY` — generation backend credential; unset runs the
//!   template-only strategy.

mod api;
mod state;

use anyhow::Context;
use api::build_router;
use log::info;
use memolog_core::db::open_db;
use memolog_core::{default_log_level, init_logging, GeminiConfig};
use state::AppState;
use std::env;
use std::net::SocketAddr;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Ok(log_dir) = env::var("MEMOLOG_LOG_DIR") {
        init_logging(default_log_level(), &log_dir).map_err(anyhow::Error::msg)?;
    }

    let db_path = env::var("MEMOLOG_DB_PATH").unwrap_or_else(|_| "memolog.sqlite3".to_string());
    let addr: SocketAddr = env::var("MEMOLOG_ADDR")
        .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
        .parse()
        .context("invalid MEMOLOG_ADDR")?;

    let gemini = GeminiConfig::from_env();
    let conn = open_db(&db_path).with_context(|| format!("failed to open database `{db_path}`"))?;

    info!(
        "event=server_start module=server status=ok addr={addr} db_path={db_path} backend={}",
        if gemini.has_credential() {
            "gemini"
        } else {
            "template-only"
        }
    );

    let router = build_router(AppState::new(conn, gemini));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, router).await?;

    Ok(())
}

//! Trivia Quiz · Backend
//!
//! - Loads multiple-choice questions from a remote trivia source, falling back
//!   to a built-in bank when the source is disabled, rate-limited or broken
//! - Axum HTTP + WebSocket API driving quiz sessions
//!
//! Important env variables:
//!   PORT                     : u16 (default 3000)
//!   QUIZ_CONFIG_PATH         : path to TOML config (source + optional question bank)
//!   QUIZ_SOURCE_URL          : remote question source URL
//!   QUIZ_USE_REMOTE          : "1"/"true" to fetch from the source (default off)
//!   QUIZ_FETCH_TIMEOUT_SECS  : request timeout for the source (default 10)
//!   QUIZ_SHUFFLE_SEED        : fixed seed for option order
//!   QUIZ_SESSION_TTL_SECS    : idle session lifetime (default 1800)
//!   QUIZ_MAX_SESSIONS        : session store cap (default 10000)
//!   LOG_LEVEL                : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT               : "pretty" (default) or "json"

mod telemetry;
mod util;
mod entities;
mod domain;
mod error;
mod config;
mod seeds;
mod loader;
mod progress;
mod state;
mod protocol;
mod logic;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, instrument};

use crate::routes::build_router;
use crate::state::AppState;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  let config = config::resolve_config();

  // Builds the loader and starts the first load in the background.
  let state = Arc::new(AppState::new(config)?);

  let app = build_router(state.clone());

  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "trivia_quiz", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(target: "trivia_quiz", error = %e, "Failed to listen for shutdown signal");
    std::future::pending::<()>().await;
  }
  info!(target: "trivia_quiz", "Shutdown signal received");
}

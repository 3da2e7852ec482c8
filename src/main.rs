//! Flagday · Daily Flag Trivia Backend
//!
//! - Axum HTTP API: daily challenge, answer submission, history, stats
//! - One challenge per calendar day, three attempts per user
//! - Country catalog from TOML config with built-in seed fallback
//!
//! Important env variables:
//!   PORT                : u16 (default 3000)
//!   CATALOG_CONFIG_PATH : path to TOML config (countries + engine tuning)
//!   LOG_LEVEL           : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT          : "pretty" (default) or "json"

mod telemetry;
mod util;
mod error;
mod domain;
mod config;
mod seeds;
mod catalog;
mod clock;
mod store;
mod questions;
mod selector;
mod ledger;
mod stats;
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

  // Build shared application state (catalog, stores, clock).
  let state = Arc::new(AppState::new());

  // Build the HTTP router with routes, CORS and tracing layers.
  let app = build_router(state.clone());

  // Read port from env or default to 3000.
  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "flagday_backend", %addr, "HTTP server listening");
  axum::serve(listener, app).await?;
  Ok(())
}

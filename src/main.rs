//! Mianshi · Mock-Interview Backend
//!
//! - Axum HTTP + WebSocket API
//! - OpenAI-compatible completion integration (via environment variables)
//! - Static SPA fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT          : u16 (default 3000)
//!   OPENAI_API_KEY    : enables the completion service if present
//!   OPENAI_BASE_URL    : default "https://api.moonshot.cn/v1"
//!   OPENAI_FAST_MODEL  : default "moonshot-v1-8k" (streamed interview replies)
//!   OPENAI_STRONG_MODEL   : default "moonshot-v1-32k" (grading calls)
//!   OPENAI_TIMEOUT_SECS : upstream call timeout (default 120)
//!   AGENT_CONFIG_PATH  : path to TOML config (prompts, scoring, scenarios)
//!   LOG_LEVEL    : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT      : "pretty" (default) or "json"

mod telemetry;
mod util;
mod domain;
mod config;
mod catalog;
mod prompts;
mod score;
mod session;
mod state;
mod protocol;
mod logic;
mod openai;
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

  // Build shared application state (scenario catalog, prompts, OpenAI client).
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
  info!(target: "mianshi_backend", %addr, "HTTP server listening");
  axum::serve(listener, app).await?;
  Ok(())
}

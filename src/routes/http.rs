//! HTTP endpoint handlers. The scenario catalog is read-only from this
//! service's perspective; sessions live entirely on the WebSocket side.

use std::sync::Arc;
use axum::{extract::State, response::IntoResponse, Json};
use tracing::{info, instrument};

use crate::protocol::{to_out, HealthOut, ScenarioOut};
use crate::state::AppState;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state))]
pub async fn http_get_scenarios(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  let out: Vec<ScenarioOut> = state.catalog.all().iter().map(to_out).collect();
  info!(target: "interview", count = out.len(), "HTTP scenario catalog served");
  Json(out)
}

//! Per-turn orchestration shared by the WebSocket handler.
//!
//! A user turn is exactly two upstream calls: a streamed interview reply
//! (fast model, relayed token-by-token by the caller) followed by a
//! non-streaming grading call (strong model, larger context for the verbose
//! rubric) whose full text is scanned for the bracketed score. Either call
//! failing fails the turn; the session itself stays usable.

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{info, instrument};

use crate::session::{GradingOutcome, InterviewSession};
use crate::state::AppState;
use crate::util::{fill_template, trunc_for_log};

/// Turn-level failures, surfaced to the client as one error notification.
/// Round counter and score keep their last consistent values; the session
/// remains Active and accepts the next user message.
#[derive(Debug, Error)]
pub enum TurnError {
  #[error("completion service is not configured (missing OPENAI_API_KEY)")]
  Disabled,
  #[error("upstream completion failed: {0}")]
  Upstream(String),
}

/// Start the streamed interview reply for one user turn.
#[instrument(level = "info", skip_all, fields(text_len = user_text.len()))]
pub async fn begin_reply_stream(
  state: &AppState,
  interview_prompt: &str,
  user_text: &str,
) -> Result<mpsc::Receiver<Result<String, String>>, TurnError> {
  let oa = state.openai.as_ref().ok_or(TurnError::Disabled)?;
  oa.chat_stream(&oa.fast_model, interview_prompt, user_text, 0.0)
    .await
    .map_err(TurnError::Upstream)
}

/// Run the grading call for a completed reply and settle the session's score:
/// extract the bracketed value, apply it to the running total, commit the
/// round. Returns the outcome tagged with round and new total.
#[instrument(level = "info", skip_all, fields(session = %session.id, round))]
pub async fn grade_turn(
  state: &AppState,
  session: &mut InterviewSession,
  round: u32,
  user_text: &str,
  reply_text: &str,
) -> Result<GradingOutcome, TurnError> {
  let oa = state.openai.as_ref().ok_or(TurnError::Disabled)?;
  let grading_prompt = session
    .current_prompts()
    .map(|p| p.grading.clone())
    .ok_or_else(|| TurnError::Upstream("session has no prompt pair".into()))?;

  let user = fill_template(
    &state.prompts.grading_user_template,
    &[("answer", user_text), ("reply", reply_text)],
  );

  let text = oa
    .chat_plain(&oa.strong_model, &grading_prompt, &user, 0.0)
    .await
    .map_err(TurnError::Upstream)?;

  info!(
    target: "interview",
    session = %session.id,
    round,
    preview = %trunc_for_log(&text, 80),
    "Grading reply received"
  );

  Ok(session.settle_grading(round, &text))
}

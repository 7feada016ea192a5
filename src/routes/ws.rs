//! WebSocket upgrade + session loop. Each connection owns one
//! `InterviewSession` and processes turns strictly sequentially: while a
//! reply stream is in flight only `stop` and `ping` are honored, any other
//! message is rejected with an error notification.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use futures::{
  stream::{SplitSink, SplitStream},
  SinkExt, StreamExt,
};
use tracing::{debug, error, info, instrument, warn};

use crate::logic;
use crate::protocol::{ClientWsMessage, ServerWsMessage};
use crate::session::InterviewSession;
use crate::state::AppState;

type WsSender = SplitSink<WebSocket, Message>;
type WsReceiver = SplitStream<WebSocket>;

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "mianshi_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

/// Serialize and send one server message; false means the socket is gone.
async fn send_msg(tx: &mut WsSender, msg: &ServerWsMessage) -> bool {
  let out = serde_json::to_string(msg).unwrap_or_else(|e| {
    serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
  });
  if let Err(e) = tx.send(Message::Text(out)).await {
    error!(target: "mianshi_backend", error = %e, "WS send error");
    return false;
  }
  true
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(socket: WebSocket, state: Arc<AppState>) {
  let (mut tx, mut rx) = socket.split();
  let mut session = InterviewSession::new(state.clamp);
  info!(target: "mianshi_backend", session = %session.id, "WebSocket connected");

  while let Some(Ok(msg)) = rx.next().await {
    match msg {
      Message::Text(txt) => {
        let keep_going = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => {
            debug!(target: "mianshi_backend", session = %session.id, "WS received: {:?}", &incoming);
            dispatch(incoming, &state, &mut session, &mut tx, &mut rx).await
          }
          Err(e) => send_msg(&mut tx, &ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) }).await,
        };
        if !keep_going {
          break;
        }
      }
      Message::Ping(payload) => { let _ = tx.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }

  session.close();
  info!(
    target: "mianshi_backend",
    session = %session.id,
    scenario = %session.scenario_id(),
    rounds = session.round(),
    total = session.total_score(),
    "WebSocket disconnected"
  );
}

/// Handle one parsed client message. Returns false when the socket is gone.
async fn dispatch(
  msg: ClientWsMessage,
  state: &AppState,
  session: &mut InterviewSession,
  tx: &mut WsSender,
  rx: &mut WsReceiver,
) -> bool {
  match msg {
    ClientWsMessage::Ping => send_msg(tx, &ServerWsMessage::Pong).await,

    ClientWsMessage::Stop => {
      // No reply stream in flight; nothing to cancel.
      debug!(target: "interview", session = %session.id, "Stop received while idle; ignored");
      true
    }

    ClientWsMessage::Init { scenario_id, difficulty, profile } => {
      session.initialize(&state.catalog, &state.prompts, &scenario_id, &difficulty, profile);
      send_msg(
        tx,
        &ServerWsMessage::SessionReady {
          round: session.round(),
          greeting: state.prompts.greeting.clone(),
          profile: session.profile(),
        },
      )
      .await
    }

    ClientWsMessage::UserMessage { text } => run_user_turn(state, session, &text, tx, rx).await,
  }
}

/// Drive one full user turn: streamed interview reply (with stop handling),
/// then grading + score notification. Returns false when the socket is gone.
async fn run_user_turn(
  state: &AppState,
  session: &mut InterviewSession,
  text: &str,
  tx: &mut WsSender,
  rx: &mut WsReceiver,
) -> bool {
  if !session.is_active() {
    warn!(target: "interview", session = %session.id, "User message before init");
    return send_msg(
      tx,
      &ServerWsMessage::Error { message: "Session not initialized: send an init message first.".into() },
    )
    .await;
  }

  let round = session.next_round();
  let interview_prompt = match session.current_prompts() {
    Some(p) => p.interview.clone(),
    None => {
      return send_msg(tx, &ServerWsMessage::Error { message: "Session has no prompt pair.".into() }).await;
    }
  };
  session.push_user(text);

  let mut stream = match logic::begin_reply_stream(state, &interview_prompt, text).await {
    Ok(s) => s,
    Err(e) => {
      error!(target: "interview", session = %session.id, round, error = %e, "Interview completion failed");
      return send_msg(tx, &ServerWsMessage::Error { message: e.to_string() }).await;
    }
  };

  let mut reply = String::new();
  let mut interrupted = false;
  let mut stream_error: Option<String> = None;
  let mut socket_gone = false;

  // Relay tokens while also watching the socket for a stop request. Turns
  // stay serialized: a new user message here is rejected, not queued.
  loop {
    tokio::select! {
      tok = stream.recv() => match tok {
        Some(Ok(token)) => {
          reply.push_str(&token);
          if !send_msg(tx, &ServerWsMessage::ReplyDelta { round, token }).await {
            socket_gone = true;
            break;
          }
        }
        Some(Err(e)) => { stream_error = Some(e); break; }
        None => break,
      },
      incoming = rx.next() => match incoming {
        Some(Ok(Message::Text(txt))) => match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(ClientWsMessage::Stop) => {
            info!(target: "interview", session = %session.id, round, "Stop requested mid-stream");
            interrupted = true;
            break;
          }
          Ok(ClientWsMessage::Ping) => {
            if !send_msg(tx, &ServerWsMessage::Pong).await { socket_gone = true; break; }
          }
          Ok(_) => {
            if !send_msg(tx, &ServerWsMessage::Error { message: "A turn is already in progress.".into() }).await {
              socket_gone = true;
              break;
            }
          }
          Err(e) => {
            if !send_msg(tx, &ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) }).await {
              socket_gone = true;
              break;
            }
          }
        },
        Some(Ok(Message::Ping(payload))) => { let _ = tx.send(Message::Pong(payload)).await; }
        Some(Ok(Message::Close(_))) | None => { socket_gone = true; break; }
        Some(Ok(_)) => {}
        Some(Err(e)) => {
          error!(target: "mianshi_backend", session = %session.id, error = %e, "WS receive error mid-turn");
          socket_gone = true;
          break;
        }
      },
    }
  }
  // Dropping the receiver aborts the upstream relay task.
  drop(stream);

  if socket_gone {
    // Client went away mid-stream; bookkeeping matches a cancelled turn.
    session.record_cancelled_reply(round, &reply);
    return false;
  }

  if let Some(e) = stream_error {
    error!(target: "interview", session = %session.id, round, error = %e, "Interview stream failed");
    // Round and score keep their last consistent values.
    return send_msg(tx, &ServerWsMessage::Error { message: format!("upstream completion failed: {}", e) }).await;
  }

  if interrupted {
    // Cancelled turns skip grading entirely; the round still commits.
    session.record_cancelled_reply(round, &reply);
    return send_msg(tx, &ServerWsMessage::ReplyDone { round, interrupted: true }).await;
  }

  if !send_msg(tx, &ServerWsMessage::ReplyDone { round, interrupted: false }).await {
    session.push_assistant(&reply);
    session.commit_round(round);
    return false;
  }
  session.push_assistant(&reply);

  match logic::grade_turn(state, session, round, text, &reply).await {
    Ok(outcome) => {
      info!(
        target: "interview",
        session = %session.id,
        round = outcome.round,
        delta = ?outcome.delta,
        total = outcome.total,
        feedback_len = outcome.feedback.len(),
        "Turn scored"
      );
      send_msg(tx, &ServerWsMessage::Score { round: outcome.round, total_score: outcome.total }).await
    }
    Err(e) => {
      error!(target: "interview", session = %session.id, round, error = %e, "Grading completion failed");
      send_msg(tx, &ServerWsMessage::Error { message: e.to_string() }).await
    }
  }
}

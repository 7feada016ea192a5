//! Minimal OpenAI-compatible client for our two call shapes.
//!
//! We only call chat.completions: streamed (interview replies, relayed
//! token-by-token) and plain (grading, where the whole text is needed before
//! the bracketed score can be extracted). Calls are instrumented and log
//! model names, latencies, and response sizes (not contents).
//!
//! NOTE: We never log the API key and we keep payload truncations short to
//! avoid PII leaks.

use std::time::Duration;

use futures::StreamExt;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info, instrument};

#[derive(Clone)]
pub struct OpenAI {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub fast_model: String,
  pub strong_model: String,
}

impl OpenAI {
  /// Construct the client if we find OPENAI_API_KEY; otherwise return None.
  /// The upstream service specifies no timeout of its own, so the client
  /// carries an explicit one (OPENAI_TIMEOUT_SECS, default 120).
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("OPENAI_API_KEY").ok()?;
    let base_url =
      std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.moonshot.cn/v1".into());
    let fast_model =
      std::env::var("OPENAI_FAST_MODEL").unwrap_or_else(|_| "moonshot-v1-8k".into());
    let strong_model =
      std::env::var("OPENAI_STRONG_MODEL").unwrap_or_else(|_| "moonshot-v1-32k".into());
    let timeout_secs = std::env::var("OPENAI_TIMEOUT_SECS")
      .ok()
      .and_then(|v| v.parse::<u64>().ok())
      .unwrap_or(120);

    let client = reqwest::Client::builder()
      .connect_timeout(Duration::from_secs(10))
      .timeout(Duration::from_secs(timeout_secs))
      .build()
      .ok()?;

    Some(Self { client, api_key, base_url, fast_model, strong_model })
  }

  /// Plain-text chat completion. Used for the grading call.
  #[instrument(level = "info", skip(self, system, user), fields(model = %model))]
  pub async fn chat_plain(
    &self,
    model: &str,
    system: &str,
    user: &str,
    temperature: f32,
  ) -> Result<String, String> {
    let url = format!("{}/chat/completions", self.base_url);
    let req = ChatCompletionRequest {
      model: model.to_string(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: system.into() },
        ChatMessageReq { role: "user".into(), content: user.into() },
      ],
      temperature,
      stream: false,
      max_tokens: None,
    };

    let res = self.client.post(&url)
      .header(USER_AGENT, "mianshi-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await.map_err(|e| e.to_string())?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_openai_error(&body).unwrap_or_else(|| body);
      return Err(format!("OpenAI HTTP {}: {}", status, msg));
    }

    let body: ChatCompletionResponse = res.json().await.map_err(|e| e.to_string())?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "OpenAI usage");
    }
    let text = body.choices.get(0)
      .and_then(|c| c.message.content.clone())
      .unwrap_or_default().trim().to_string();

    Ok(text)
  }

  /// Streaming chat completion. Tokens arrive through the returned channel in
  /// generation order; the channel closes when the upstream stream ends.
  /// Dropping the receiver cancels the relay on its next delivery attempt,
  /// which aborts the upstream read.
  #[instrument(level = "info", skip(self, system, user), fields(model = %model))]
  pub async fn chat_stream(
    &self,
    model: &str,
    system: &str,
    user: &str,
    temperature: f32,
  ) -> Result<mpsc::Receiver<Result<String, String>>, String> {
    let url = format!("{}/chat/completions", self.base_url);
    let req = ChatCompletionRequest {
      model: model.to_string(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: system.into() },
        ChatMessageReq { role: "user".into(), content: user.into() },
      ],
      temperature,
      stream: true,
      max_tokens: None,
    };

    let res = self.client.post(&url)
      .header(USER_AGENT, "mianshi-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await.map_err(|e| e.to_string())?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_openai_error(&body).unwrap_or_else(|| body);
      return Err(format!("OpenAI HTTP {}: {}", status, msg));
    }

    let (tx, rx) = mpsc::channel(64);
    tokio::spawn(relay_sse_tokens(res, tx));
    Ok(rx)
  }
}

/// Read the SSE body chunk by chunk and forward each text delta.
async fn relay_sse_tokens(res: reqwest::Response, tx: mpsc::Sender<Result<String, String>>) {
  let mut stream = res.bytes_stream();
  let mut lines = SseLineBuffer::default();

  'outer: while let Some(chunk) = stream.next().await {
    let chunk = match chunk {
      Ok(c) => c,
      Err(e) => {
        let _ = tx.send(Err(format!("stream read error: {e}"))).await;
        return;
      }
    };

    for payload in lines.push(&chunk) {
      if payload == "[DONE]" {
        break 'outer;
      }
      let parsed: ChatStreamChunk = match serde_json::from_str(&payload) {
        Ok(v) => v,
        Err(e) => {
          error!(target: "mianshi_backend", error = %e, "Skipping unparsable SSE payload");
          continue;
        }
      };
      for choice in parsed.choices {
        if let Some(token) = choice.delta.content {
          if token.is_empty() {
            continue;
          }
          if tx.send(Ok(token)).await.is_err() {
            // Receiver gone: the caller cancelled the turn.
            return;
          }
        }
      }
    }
  }
  // tx drops here; the closed channel is the end-of-stream signal.
}

/// Incremental SSE framing: splits `data:` payloads out of a byte stream that
/// may fragment anywhere. Splitting only at `\n` keeps multi-byte characters
/// intact across chunks.
#[derive(Default)]
struct SseLineBuffer {
  buf: Vec<u8>,
}

impl SseLineBuffer {
  fn push(&mut self, chunk: &[u8]) -> Vec<String> {
    self.buf.extend_from_slice(chunk);
    let mut out = Vec::new();
    while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
      let line: Vec<u8> = self.buf.drain(..=pos).collect();
      let line = String::from_utf8_lossy(&line);
      let line = line.trim_end_matches(['\n', '\r']);
      if let Some(data) = line.strip_prefix("data:") {
        out.push(data.trim_start().to_string());
      }
    }
    out
  }
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
  stream: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  max_tokens: Option<u32>,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

// Streaming chunk DTOs (OpenAI-compatible delta format)
#[derive(Deserialize)]
struct ChatStreamChunk {
  choices: Vec<ChatStreamChoice>,
}
#[derive(Deserialize)]
struct ChatStreamChoice {
  delta: ChatStreamDelta,
}
#[derive(Deserialize)]
struct ChatStreamDelta {
  #[serde(default)]
  content: Option<String>,
}

/// Try to extract a clean error message from OpenAI error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  match serde_json::from_str::<EWrap>(body) {
    Ok(w) => Some(w.error.message),
    Err(_) => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn sse_buffer_reassembles_fragmented_lines() {
    let mut b = SseLineBuffer::default();
    assert!(b.push(b"data: {\"a\":").is_empty());
    let got = b.push(b"1}\n\ndata: [DONE]\n");
    assert_eq!(got, vec!["{\"a\":1}".to_string(), "[DONE]".to_string()]);
  }

  #[test]
  fn sse_buffer_handles_crlf_and_ignores_other_fields() {
    let mut b = SseLineBuffer::default();
    let got = b.push(b"event: message\r\ndata: {\"x\":2}\r\n: keepalive\r\n\r\n");
    assert_eq!(got, vec!["{\"x\":2}".to_string()]);
  }

  #[test]
  fn sse_buffer_keeps_multibyte_tokens_intact() {
    let mut b = SseLineBuffer::default();
    let line = "data: {\"token\":\"你好\"}\n".as_bytes();
    // Split inside the multi-byte character.
    let cut = line.len() - 4;
    assert!(b.push(&line[..cut]).is_empty());
    let got = b.push(&line[cut..]);
    assert_eq!(got, vec!["{\"token\":\"你好\"}".to_string()]);
  }

  #[test]
  fn stream_chunk_delta_parses() {
    let payload = r#"{"choices":[{"delta":{"content":"Go"},"finish_reason":null}]}"#;
    let chunk: ChatStreamChunk = serde_json::from_str(payload).expect("chunk");
    assert_eq!(chunk.choices[0].delta.content.as_deref(), Some("Go"));
    // Terminal chunks carry an empty delta.
    let tail = r#"{"choices":[{"delta":{},"finish_reason":"stop"}]}"#;
    let chunk: ChatStreamChunk = serde_json::from_str(tail).expect("chunk");
    assert_eq!(chunk.choices[0].delta.content, None);
  }
}

//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::domain::{ChatProfile, Scenario};

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    /// Start (or restart) the interview: selects the prompt pair.
    Init {
        #[serde(rename = "scenarioId")]
        scenario_id: String,
        difficulty: String,
        #[serde(default)]
        profile: ChatProfile,
    },
    /// One candidate answer; drives a full interview + grading turn.
    UserMessage {
        text: String,
    },
    /// Abort the in-flight streamed reply for the current turn.
    Stop,
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    SessionReady {
        round: u32,
        greeting: String,
        profile: ChatProfile,
    },
    /// One token of the streamed interview reply, in generation order.
    ReplyDelta {
        round: u32,
        token: String,
    },
    /// End of the streamed reply; `interrupted` marks a user-stopped turn.
    ReplyDone {
        round: u32,
        interrupted: bool,
    },
    /// Score notification emitted once per graded turn.
    Score {
        round: u32,
        #[serde(rename = "totalScore")]
        total_score: i64,
    },
    Error {
        message: String,
    },
}

/// DTO for the read-only scenario catalog endpoint.
#[derive(Debug, Serialize)]
pub struct ScenarioOut {
    pub id: u32,
    pub title: String,
    pub description: String,
    pub finished: bool,
    pub progress: u8,
    pub tags: String,
    #[serde(rename = "totalClickTimes")]
    pub total_click_times: u32,
    #[serde(rename = "winningChance")]
    pub winning_chance: f32,
}

/// Convert the internal `Scenario` (career/skill included) to the public DTO.
pub fn to_out(s: &Scenario) -> ScenarioOut {
    ScenarioOut {
        id: s.id,
        title: s.title.clone(),
        description: s.description.clone(),
        finished: s.finished,
        progress: s.progress,
        tags: s.tags.clone(),
        total_click_times: s.total_click_times,
        winning_chance: s.winning_chance,
    }
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_messages_parse_from_tagged_json() {
        let init: ClientWsMessage =
            serde_json::from_str(r#"{"type":"init","scenarioId":"1","difficulty":"easy"}"#)
                .expect("init");
        match init {
            ClientWsMessage::Init { scenario_id, difficulty, profile } => {
                assert_eq!(scenario_id, "1");
                assert_eq!(difficulty, "easy");
                assert_eq!(profile, ChatProfile::None);
            }
            other => panic!("unexpected variant: {other:?}"),
        }

        let stop: ClientWsMessage = serde_json::from_str(r#"{"type":"stop"}"#).expect("stop");
        assert!(matches!(stop, ClientWsMessage::Stop));

        assert!(serde_json::from_str::<ClientWsMessage>(r#"{"type":"score_message"}"#).is_err());
    }

    #[test]
    fn score_notification_serializes_with_camel_case_total() {
        let msg = ServerWsMessage::Score { round: 1, total_score: 6 };
        let json = serde_json::to_string(&msg).expect("json");
        assert_eq!(json, r#"{"type":"score","round":1,"totalScore":6}"#);
    }
}

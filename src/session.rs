//! Per-connection interview session state machine.
//!
//! Uninitialized → Active (init message selects the prompt pair) → Active
//! self-loop per user turn → Closed (socket gone). Each WebSocket connection
//! owns exactly one `InterviewSession`; there is no cross-session table, so
//! sessions never share mutable state.
//!
//! Bookkeeping rules:
//! - the round counter commits on successful and on cancelled turns, never on
//!   failed upstream calls;
//! - re-initialization simply overwrites the previous prompt selection;
//! - the transcript is append-only for the session's lifetime.

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::catalog::ScenarioCatalog;
use crate::config::Prompts;
use crate::domain::{ChatProfile, DifficultyLevel, PromptPair, Role, TranscriptEntry};
use crate::prompts::{difficulty_label, select_prompts};
use crate::score::{extract_last_bracket_score, ClampPolicy, ScoreBoard};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
  Uninitialized,
  Active,
  Closed,
}

/// Outcome of settling one graded turn.
#[derive(Clone, Debug)]
pub struct GradingOutcome {
  pub round: u32,
  /// None on a score parse miss (counted as zero).
  pub delta: Option<i64>,
  pub total: i64,
  /// Grading text preceding the bracketed score (the model's feedback).
  pub feedback: String,
}

pub struct InterviewSession {
  pub id: String,
  phase: Phase,
  prompts: Option<PromptPair>,
  scenario_id: String,
  profile: ChatProfile,
  round: u32,
  board: ScoreBoard,
  transcript: Vec<TranscriptEntry>,
}

impl InterviewSession {
  pub fn new(clamp: ClampPolicy) -> Self {
    Self {
      id: Uuid::new_v4().to_string(),
      phase: Phase::Uninitialized,
      prompts: None,
      scenario_id: String::new(),
      profile: ChatProfile::None,
      round: 0,
      board: ScoreBoard::new(clamp),
      transcript: Vec::new(),
    }
  }

  #[allow(dead_code)]
  pub fn phase(&self) -> Phase {
    self.phase
  }

  pub fn scenario_id(&self) -> &str {
    &self.scenario_id
  }

  pub fn is_active(&self) -> bool {
    self.phase == Phase::Active
  }

  /// Uninitialized → Active. Selects the prompt pair once and appends a
  /// system transcript entry for auditability. Initializing an already active
  /// session overwrites the previous selection without erroring.
  pub fn initialize(
    &mut self,
    catalog: &ScenarioCatalog,
    prompts_cfg: &Prompts,
    scenario_id: &str,
    difficulty_raw: &str,
    profile: ChatProfile,
  ) {
    if self.phase == Phase::Active {
      warn!(target: "interview", session = %self.id, "Re-initialization overwrites previous prompt selection");
    }
    let difficulty = DifficultyLevel::parse_lenient(difficulty_raw);
    let pair = select_prompts(catalog, prompts_cfg, scenario_id, difficulty);

    self.scenario_id = scenario_id.to_string();
    self.profile = profile;
    self.prompts = Some(pair);
    self.phase = Phase::Active;
    self.transcript.push(TranscriptEntry {
      role: Role::System,
      text: format!(
        "面试配置：scenario={scenario_id} difficulty={}",
        difficulty_label(difficulty)
      ),
    });
    info!(target: "interview", session = %self.id, %scenario_id, difficulty = difficulty_label(difficulty), "Session active");
  }

  pub fn current_prompts(&self) -> Option<&PromptPair> {
    self.prompts.as_ref()
  }

  pub fn profile(&self) -> ChatProfile {
    self.profile
  }

  pub fn round(&self) -> u32 {
    self.round
  }

  /// Round number tagging the turn currently being processed.
  pub fn next_round(&self) -> u32 {
    self.round + 1
  }

  /// Commit a finished turn's round number. Monotonic: a stale or repeated
  /// commit never moves the counter backwards.
  pub fn commit_round(&mut self, round: u32) {
    if round > self.round {
      self.round = round;
    }
  }

  pub fn total_score(&self) -> i64 {
    self.board.total()
  }

  #[allow(dead_code)]
  pub fn transcript(&self) -> &[TranscriptEntry] {
    &self.transcript
  }

  pub fn push_user(&mut self, text: &str) {
    self.transcript.push(TranscriptEntry { role: Role::User, text: text.to_string() });
  }

  pub fn push_assistant(&mut self, text: &str) {
    self.transcript.push(TranscriptEntry { role: Role::Assistant, text: text.to_string() });
  }

  /// Bookkeeping for a user-cancelled turn: the partial reply is recorded as
  /// interrupted and the round still commits. The score board is untouched
  /// (cancelled turns skip grading entirely).
  pub fn record_cancelled_reply(&mut self, round: u32, partial: &str) {
    self.transcript.push(TranscriptEntry {
      role: Role::Assistant,
      text: format!("（回答被中断）{partial}"),
    });
    self.commit_round(round);
    debug!(target: "interview", session = %self.id, round, "Cancelled turn committed without grading");
  }

  /// Extract the bracketed score from a grading reply, apply it to the
  /// running total and commit the round. A parse miss is logged and counted
  /// as zero, never surfaced as an error.
  pub fn settle_grading(&mut self, round: u32, grading_text: &str) -> GradingOutcome {
    let extraction = extract_last_bracket_score(grading_text);
    if extraction.score.is_none() {
      warn!(target: "interview", session = %self.id, round, "Grading reply had no bracketed score; counting zero");
    }
    let total = self.board.apply(extraction.score);
    self.commit_round(round);
    let delta_text = extraction.score.map_or("无".to_string(), |v| v.to_string());
    self.transcript.push(TranscriptEntry {
      role: Role::System,
      text: format!("第{round}轮评分：{delta_text}，累计 {total}"),
    });
    GradingOutcome {
      round,
      delta: extraction.score,
      total,
      feedback: extraction.preceding_text,
    }
  }

  pub fn close(&mut self) {
    self.phase = Phase::Closed;
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn active_session() -> InterviewSession {
    let catalog = ScenarioCatalog::build(&[]);
    let prompts = Prompts::default();
    let mut s = InterviewSession::new(ClampPolicy::default());
    s.initialize(&catalog, &prompts, "1", "easy", ChatProfile::None);
    s
  }

  #[test]
  fn init_transitions_to_active_with_scenario_prompts() {
    let s = active_session();
    assert_eq!(s.phase(), Phase::Active);
    assert_eq!(s.round(), 0);
    assert_eq!(s.total_score(), 0);
    let pair = s.current_prompts().expect("prompts selected");
    assert!(pair.interview.contains("Golang 工程师"));
    assert!(pair.grading.contains("[分数]"));
    // One system entry for auditability.
    assert_eq!(s.transcript().len(), 1);
    assert_eq!(s.transcript()[0].role, Role::System);
  }

  #[test]
  fn double_init_overwrites_without_error() {
    let catalog = ScenarioCatalog::build(&[]);
    let prompts = Prompts::default();
    let mut s = active_session();
    s.initialize(&catalog, &prompts, "3", "hard", ChatProfile::Progress);
    assert_eq!(s.phase(), Phase::Active);
    let pair = s.current_prompts().expect("prompts selected");
    assert!(pair.interview.contains("产品经理"));
    assert!(pair.interview.contains("困难"));
    assert_eq!(s.profile(), ChatProfile::Progress);
  }

  #[test]
  fn grading_with_bracket_score_accumulates() {
    let mut s = active_session();
    let round = s.next_round();
    assert_eq!(round, 1);
    let outcome = s.settle_grading(round, "回答覆盖了并发模型，细节不错。[6]");
    assert_eq!(outcome.delta, Some(6));
    assert_eq!(outcome.total, 6);
    assert_eq!(outcome.round, 1);
    assert_eq!(outcome.feedback, "回答覆盖了并发模型，细节不错。");
    assert_eq!(s.round(), 1);
    assert_eq!(s.total_score(), 6);
  }

  #[test]
  fn parse_miss_counts_zero_but_still_commits_the_round() {
    let mut s = active_session();
    s.settle_grading(1, "不错。[4]");
    let outcome = s.settle_grading(2, "这次忘了打分……");
    assert_eq!(outcome.delta, None);
    assert_eq!(outcome.total, 4);
    assert_eq!(s.round(), 2);
    assert_eq!(s.total_score(), 4);
  }

  #[test]
  fn running_totals_tag_rounds_in_order() {
    let mut s = active_session();
    let replies = ["[3]", "这轮有扣分 [0]", "[5]"];
    let mut seen = Vec::new();
    for text in replies {
      let round = s.next_round();
      let outcome = s.settle_grading(round, text);
      seen.push((outcome.round, outcome.total));
    }
    assert_eq!(seen, vec![(1, 3), (2, 3), (3, 8)]);
  }

  #[test]
  fn cancelled_turn_commits_round_and_skips_scoring() {
    let mut s = active_session();
    s.push_user("我有三年 Go 经验");
    let round = s.next_round();
    s.record_cancelled_reply(round, "好的，那请");
    assert_eq!(s.round(), 1);
    assert_eq!(s.total_score(), 0);
    let last = s.transcript().last().expect("entry");
    assert_eq!(last.role, Role::Assistant);
    assert!(last.text.contains("中断"));
  }

  #[test]
  fn failed_turns_leave_round_and_score_untouched() {
    let mut s = active_session();
    s.settle_grading(1, "[7]");
    // An upstream failure never calls settle/record: nothing moves.
    assert_eq!(s.round(), 1);
    assert_eq!(s.total_score(), 7);
    // The next successful turn continues from the last consistent state.
    let outcome = s.settle_grading(s.next_round(), "[2]");
    assert_eq!(outcome.round, 2);
    assert_eq!(outcome.total, 9);
  }

  #[test]
  fn stale_round_commit_is_monotonic() {
    let mut s = active_session();
    s.commit_round(3);
    s.commit_round(2);
    assert_eq!(s.round(), 3);
  }

  #[test]
  fn unknown_scenario_still_activates_with_fallback() {
    let catalog = ScenarioCatalog::build(&[]);
    let prompts = Prompts::default();
    let mut s = InterviewSession::new(ClampPolicy::default());
    s.initialize(&catalog, &prompts, "999", "medium", ChatProfile::None);
    assert!(s.is_active());
    assert_eq!(
      s.current_prompts().map(|p| p.interview.as_str()),
      Some("Default prompt")
    );
  }
}

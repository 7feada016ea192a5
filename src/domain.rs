//! Domain models used by the backend: difficulty levels, scenario records,
//! prompt pairs, and per-session transcript entries.

use serde::{Deserialize, Serialize};

/// Interview difficulty chosen by the client at session start.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyLevel {
  Easy,
  Medium,
  Hard,
}

impl DifficultyLevel {
  /// Lenient parse: anything unrecognized degrades to `Easy` (default label
  /// and default point budget), never an error.
  pub fn parse_lenient(s: &str) -> Self {
    match s.trim().to_lowercase().as_str() {
      "medium" => DifficultyLevel::Medium,
      "hard" => DifficultyLevel::Hard,
      _ => DifficultyLevel::Easy,
    }
  }
}

/// Which score-progress widget variant the client renders for this session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatProfile {
  #[default]
  None,
  /// Progress widget visible to the candidate.
  Progress,
  /// Progress widget visible to reviewers/admins only.
  AdminProgress,
}

/// Scenario record kept in the startup catalog. The metadata fields are
/// served read-only over HTTP; `career` and `skill` feed prompt generation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Scenario {
  pub id: u32,
  pub career: String,
  pub skill: String,

  pub title: String,
  pub description: String,
  pub finished: bool,
  pub progress: u8, // 0-100
  pub tags: String,
  pub total_click_times: u32,
  pub winning_chance: f32, // 0.0-1.0
}

/// System prompts for one session. Both members are generated together from
/// the same (scenario, difficulty) so the grading rubric's point allocations
/// match the totals the interview prompt states.
#[derive(Clone, Debug)]
pub struct PromptPair {
  pub interview: String,
  pub grading: String,
}

/// Author of a transcript entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
  System,
  User,
  Assistant,
}

/// One entry of the append-only session transcript.
#[derive(Clone, Debug, Serialize)]
pub struct TranscriptEntry {
  pub role: Role,
  pub text: String,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn difficulty_parse_is_lenient() {
    assert_eq!(DifficultyLevel::parse_lenient("easy"), DifficultyLevel::Easy);
    assert_eq!(DifficultyLevel::parse_lenient(" MEDIUM "), DifficultyLevel::Medium);
    assert_eq!(DifficultyLevel::parse_lenient("hard"), DifficultyLevel::Hard);
    assert_eq!(DifficultyLevel::parse_lenient("nightmare"), DifficultyLevel::Easy);
    assert_eq!(DifficultyLevel::parse_lenient(""), DifficultyLevel::Easy);
  }
}

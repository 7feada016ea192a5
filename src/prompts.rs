//! Prompt selection: (scenario id, difficulty) → interview + grading system
//! prompts, generated together so both sides state the same point budget.
//!
//! The scenario table drives everything; there is no per-scenario branching
//! code. An unknown scenario id yields the documented fallback prompt, never
//! an error.

use tracing::warn;

use crate::catalog::ScenarioCatalog;
use crate::config::Prompts;
use crate::domain::{DifficultyLevel, PromptPair};
use crate::util::fill_template;

/// Localized difficulty label shown inside the prompts.
pub fn difficulty_label(level: DifficultyLevel) -> &'static str {
  match level {
    DifficultyLevel::Easy => "简单",
    DifficultyLevel::Medium => "中等",
    DifficultyLevel::Hard => "困难",
  }
}

/// Total point budget for one graded answer at the given difficulty.
/// Harder interviews grade on a tighter budget.
pub fn difficulty_budget(level: DifficultyLevel) -> u32 {
  match level {
    DifficultyLevel::Easy => 40,
    DifficultyLevel::Medium => 30,
    DifficultyLevel::Hard => 20,
  }
}

/// Fixed 40%/30%/20%/10% split of the budget across the four rubric criteria
/// (technical skill, project experience, communication, motivation).
pub fn budget_split(total: u32) -> [u32; 4] {
  let t = total as f32;
  [
    (t * 0.4) as u32,
    (t * 0.3) as u32,
    (t * 0.2) as u32,
    (t * 0.1) as u32,
  ]
}

/// Build the prompt pair for a session. Unknown scenario ids fall back to the
/// configured placeholder prompt for both members (degraded but functional).
pub fn select_prompts(
  catalog: &ScenarioCatalog,
  prompts: &Prompts,
  scenario_id: &str,
  difficulty: DifficultyLevel,
) -> PromptPair {
  let Some(scenario) = catalog.get(scenario_id) else {
    warn!(target: "interview", %scenario_id, "Unknown scenario id; serving fallback prompt");
    return PromptPair {
      interview: prompts.fallback_prompt.clone(),
      grading: prompts.fallback_prompt.clone(),
    };
  };

  let label = difficulty_label(difficulty);
  let total = difficulty_budget(difficulty);
  let [part1, part2, part3, part4] = budget_split(total);

  let total_s = total.to_string();
  let part1_s = part1.to_string();
  let part2_s = part2.to_string();
  let part3_s = part3.to_string();
  let part4_s = part4.to_string();
  let pairs: [(&str, &str); 8] = [
    ("career", scenario.career.as_str()),
    ("skill", scenario.skill.as_str()),
    ("difficulty", label),
    ("total", &total_s),
    ("part1", &part1_s),
    ("part2", &part2_s),
    ("part3", &part3_s),
    ("part4", &part4_s),
  ];

  PromptPair {
    interview: fill_template(&prompts.interview_system_template, &pairs),
    grading: fill_template(&prompts.grading_system_template, &pairs),
  }
}

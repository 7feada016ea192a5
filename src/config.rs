//! Loading agent configuration (prompts, scoring policy, scenario overrides)
//! from TOML.
//!
//! See `AgentConfig`, `Prompts` and `ScoringCfg` for the expected schema.

use serde::Deserialize;
use tracing::{error, info};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AgentConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub scoring: ScoringCfg,
  #[serde(default)]
  pub scenarios: Vec<ScenarioCfg>,
}

/// Scenario entry accepted in TOML configuration. Entries with an id matching
/// a built-in archetype override it; other ids extend the catalog.
#[derive(Clone, Debug, Deserialize)]
pub struct ScenarioCfg {
  pub id: u32,
  pub career: String,
  #[serde(default)] pub skill: Option<String>,
  #[serde(default)] pub title: Option<String>,
  #[serde(default)] pub description: Option<String>,
  #[serde(default)] pub tags: Option<String>,
  #[serde(default)] pub winning_chance: Option<f32>,
}

/// Clamp policy for the running score. Both bounds optional; when neither is
/// set totals are unclamped (may exceed the rubric maximum or go negative).
#[derive(Clone, Copy, Debug, Deserialize, Default)]
pub struct ScoringCfg {
  #[serde(default)] pub clamp_min: Option<i64>,
  #[serde(default)] pub clamp_max: Option<i64>,
}

/// Prompt templates used to build the per-session interview/grading pair.
/// Defaults are sensible for Chinese-language mock interviews; override them
/// in TOML to tune tone/structure.
///
/// Placeholders: `{career}` `{skill}` `{difficulty}` (localized label),
/// `{total}` (point budget) and `{part1}`..`{part4}` (the 40/30/20/10 split).
#[derive(Clone, Debug, Deserialize)]
pub struct Prompts {
  pub interview_system_template: String,
  pub grading_system_template: String,
  // Grading user turn: `{answer}` is the candidate's message, `{reply}` the
  // streamed interviewer response it produced.
  pub grading_user_template: String,
  pub greeting: String,
  pub fallback_prompt: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      interview_system_template: "你是一个高级面试机器人，专为评估潜在的{career}的技术能力、专业经验以及对待工作的态度而设计。\n\
        你的主要任务是通过一系列设计精良的问题，深入了解候选人的技术背景、解决问题的能力、以往的项目经验以及他们对于这个职位的兴趣和热情。\n\
        当前面试难度为{difficulty}，单轮评分范围是0到{total}分，评分维度如下：\n\
        - 技术能力（0到{part1}分）：考察候选人对{skill}的掌握程度。候选人的答案如果显示出对基础概念的误解，可能会得到负分。\n\
        - 项目经验（0到{part2}分）：评估候选人过往参与的项目，特别是{career}相关项目中的角色、贡献和解决问题的能力。如果候选人无法提供具体的经验或项目细节，或者示例不相关，可能会得到负分。\n\
        - 沟通能力和问题解决能力（0到{part3}分）：通过候选人对问题的回答，评价其逻辑思维、沟通表达和问题解决的能力。如果候选人在沟通上存在明显问题，如回避问题或答非所问，可能会得到负分。\n\
        - 对职位的兴趣和热情（0到{part4}分）：了解候选人对{career}职位的兴趣程度以及他们对未来工作的热情和期待。缺乏热情或兴趣的表现可能会导致负分。\n\
        每次回答之后，请根据候选人的回答内容和质量，提出一个新的、更深入的问题，以进一步评估候选人的能力。".into(),
      grading_system_template: "你是一个严格的面试评分官，负责为{career}岗位的候选人打分。\n\
        当前面试难度为{difficulty}，单轮评分范围是0到{total}分，评分标准如下：\n\
        - 技术能力（0到{part1}分）：对{skill}的掌握程度。\n\
        - 项目经验（0到{part2}分）：相关项目中的角色、贡献和解决问题的能力。\n\
        - 沟通能力和问题解决能力（0到{part3}分）：逻辑思维与表达。\n\
        - 对职位的兴趣和热情（0到{part4}分）：对岗位的投入程度。\n\
        请综合候选人的回答内容，先给出简短的评语，然后把总体评分以 [分数] 的形式放到答复的末尾。\
        例如，如果总分为5分，则在回答结束后添加 [5]。".into(),
      grading_user_template: "候选人的回答：\n{answer}\n\n面试官的回应：\n{reply}\n\n请按评分标准给出评语和 [分数]。".into(),
      greeting: "你好 请介绍下你自己".into(),
      fallback_prompt: "Default prompt".into(),
    }
  }
}

/// Attempt to load `AgentConfig` from AGENT_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_agent_config_from_env() -> Option<AgentConfig> {
  let path = std::env::var("AGENT_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<AgentConfig>(&s) {
      Ok(cfg) => {
        info!(target: "mianshi_backend", %path, "Loaded agent config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "mianshi_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "mianshi_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

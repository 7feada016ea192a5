//! The scenario catalog: eight built-in role archetypes, optionally
//! overridden or extended from TOML config at startup. Immutable afterwards.

use tracing::{info, warn};

use crate::config::ScenarioCfg;
use crate::domain::Scenario;

fn archetype(
  id: u32,
  career: &str,
  skill: &str,
  description: &str,
  tags: &str,
  winning_chance: f32,
) -> Scenario {
  Scenario {
    id,
    career: career.into(),
    skill: skill.into(),
    title: format!("{career}模拟面试"),
    description: description.into(),
    finished: false,
    progress: 0,
    tags: tags.into(),
    total_click_times: 0,
    winning_chance,
  }
}

/// Built-in role archetypes. These guarantee the app is useful without any
/// external config.
pub fn builtin_scenarios() -> Vec<Scenario> {
  vec![
    archetype(
      1,
      "Golang 工程师",
      "Golang 语言（语法、并发处理、内存管理等）",
      "评估候选人的 Go 后端开发能力与工程素养。",
      "golang,backend",
      0.5,
    ),
    archetype(
      2,
      "前端工程师",
      "JavaScript/TypeScript、浏览器原理与主流前端框架",
      "评估候选人的前端开发能力与页面性能意识。",
      "frontend,javascript",
      0.55,
    ),
    archetype(
      3,
      "产品经理",
      "需求分析、产品规划与跨团队协作",
      "评估候选人的产品思维与沟通协调能力。",
      "product,management",
      0.45,
    ),
    archetype(
      4,
      "数据分析师",
      "SQL、统计方法与数据可视化",
      "评估候选人的数据处理与业务洞察能力。",
      "data,sql",
      0.5,
    ),
    archetype(
      5,
      "测试工程师",
      "测试用例设计、自动化测试与质量保障",
      "评估候选人的质量意识与自动化测试经验。",
      "qa,testing",
      0.6,
    ),
    archetype(
      6,
      "运维工程师",
      "Linux、容器化部署与线上故障排查",
      "评估候选人的系统运维与应急处理能力。",
      "devops,linux",
      0.5,
    ),
    archetype(
      7,
      "UI 设计师",
      "交互设计、视觉规范与设计工具",
      "评估候选人的设计功底与产品审美。",
      "design,ui",
      0.4,
    ),
    archetype(
      8,
      "算法工程师",
      "机器学习基础、模型调优与工程落地",
      "评估候选人的算法能力与模型工程经验。",
      "ml,algorithm",
      0.35,
    ),
  ]
}

/// Read-only scenario lookup built once at startup.
#[derive(Clone)]
pub struct ScenarioCatalog {
  scenarios: Vec<Scenario>,
}

impl ScenarioCatalog {
  /// Merge built-in archetypes with config entries. A config entry whose id
  /// matches a built-in replaces its prompt-relevant fields; unknown ids are
  /// appended as new scenarios.
  pub fn build(overrides: &[ScenarioCfg]) -> Self {
    let mut scenarios = builtin_scenarios();
    let mut replaced = 0usize;
    let mut added = 0usize;

    for cfg in overrides {
      if cfg.career.trim().is_empty() {
        warn!(target: "interview", id = cfg.id, "Skipping scenario override: empty career");
        continue;
      }
      match scenarios.iter_mut().find(|s| s.id == cfg.id) {
        Some(existing) => {
          existing.career = cfg.career.clone();
          existing.title = cfg.title.clone().unwrap_or_else(|| format!("{}模拟面试", cfg.career));
          if let Some(skill) = &cfg.skill {
            existing.skill = skill.clone();
          }
          if let Some(description) = &cfg.description {
            existing.description = description.clone();
          }
          if let Some(tags) = &cfg.tags {
            existing.tags = tags.clone();
          }
          if let Some(wc) = cfg.winning_chance {
            existing.winning_chance = wc;
          }
          replaced += 1;
        }
        None => {
          scenarios.push(Scenario {
            id: cfg.id,
            career: cfg.career.clone(),
            skill: cfg.skill.clone().unwrap_or_else(|| cfg.career.clone()),
            title: cfg.title.clone().unwrap_or_else(|| format!("{}模拟面试", cfg.career)),
            description: cfg.description.clone().unwrap_or_default(),
            finished: false,
            progress: 0,
            tags: cfg.tags.clone().unwrap_or_default(),
            total_click_times: 0,
            winning_chance: cfg.winning_chance.unwrap_or(0.5),
          });
          added += 1;
        }
      }
    }

    scenarios.sort_by_key(|s| s.id);
    info!(
      target: "interview",
      total = scenarios.len(),
      replaced,
      added,
      "Startup scenario inventory"
    );
    Self { scenarios }
  }

  /// Lenient lookup by the raw id string the client sent.
  /// Non-numeric or unknown ids return None (the caller falls back to the
  /// default prompt rather than erroring).
  pub fn get(&self, scenario_id: &str) -> Option<&Scenario> {
    let id: u32 = scenario_id.trim().parse().ok()?;
    self.scenarios.iter().find(|s| s.id == id)
  }

  pub fn all(&self) -> &[Scenario] {
    &self.scenarios
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn builtin_catalog_has_eight_distinct_archetypes() {
    let all = builtin_scenarios();
    assert_eq!(all.len(), 8);
    let mut ids: Vec<u32> = all.iter().map(|s| s.id).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 8);
    for s in &all {
      assert!((0.0..=1.0).contains(&s.winning_chance), "chance out of range for {}", s.id);
      assert!(s.progress <= 100);
      assert!(!s.career.is_empty() && !s.skill.is_empty());
    }
  }

  #[test]
  fn lookup_is_lenient_on_bad_ids() {
    let catalog = ScenarioCatalog::build(&[]);
    assert!(catalog.get("1").is_some());
    assert!(catalog.get(" 3 ").is_some());
    assert!(catalog.get("42").is_none());
    assert!(catalog.get("golang").is_none());
    assert!(catalog.get("").is_none());
  }

  #[test]
  fn config_entries_override_and_extend() {
    let overrides = vec![
      ScenarioCfg {
        id: 1,
        career: "资深 Golang 工程师".into(),
        skill: None,
        title: None,
        description: None,
        tags: None,
        winning_chance: None,
      },
      ScenarioCfg {
        id: 9,
        career: "安全工程师".into(),
        skill: Some("渗透测试与安全加固".into()),
        title: None,
        description: None,
        tags: Some("security".into()),
        winning_chance: Some(0.3),
      },
    ];
    let catalog = ScenarioCatalog::build(&overrides);
    assert_eq!(catalog.all().len(), 9);
    assert_eq!(catalog.get("1").map(|s| s.career.as_str()), Some("资深 Golang 工程师"));
    // Built-in skill focus survives a career-only override.
    assert!(catalog.get("1").map(|s| s.skill.contains("Golang")).unwrap_or(false));
    assert_eq!(catalog.get("9").map(|s| s.tags.as_str()), Some("security"));
  }
}

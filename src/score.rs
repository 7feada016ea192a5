//! Bracket-score extraction and per-session score accumulation.
//!
//! Grading replies are free-form text ending (when the model cooperates) in a
//! bracketed integer like `……总体评分 [7]`. `extract_last_bracket_score` scans
//! for the last such group; `ScoreBoard` keeps the running total across a
//! session's rounds.

/// Result of scanning a grading reply for a bracketed score.
/// Produced once per grading call; never mutated.
#[derive(Clone, Debug, PartialEq)]
pub struct ScoreExtraction {
  pub score: Option<i64>,
  pub preceding_text: String,
}

/// Find the last `[digits]` group in `text` such that no other bracketed
/// integer follows it, and return the parsed value plus the text before the
/// match start. ASCII digits only; `[abc]`, `[]`, unicode digits and empty
/// input never match, in which case the original text comes back unchanged.
///
/// Values too large for `i64` are treated as noise rather than a score, so
/// the group is skipped. Pure function, no side effects.
pub fn extract_last_bracket_score(text: &str) -> ScoreExtraction {
  let bytes = text.as_bytes();
  let mut found: Option<(usize, i64)> = None;

  let mut i = 0;
  while i < bytes.len() {
    if bytes[i] == b'[' {
      let mut j = i + 1;
      while j < bytes.len() && bytes[j].is_ascii_digit() {
        j += 1;
      }
      if j > i + 1 && j < bytes.len() && bytes[j] == b']' {
        if let Ok(n) = text[i + 1..j].parse::<i64>() {
          found = Some((i, n));
        }
        i = j + 1;
        continue;
      }
    }
    i += 1;
  }

  match found {
    Some((start, n)) => ScoreExtraction {
      score: Some(n),
      preceding_text: text[..start].to_string(),
    },
    None => ScoreExtraction {
      score: None,
      preceding_text: text.to_string(),
    },
  }
}

/// Optional clamp applied to the running total after each delta.
/// Off by default; totals may exceed any nominal maximum or go negative.
#[derive(Clone, Copy, Debug, Default)]
pub struct ClampPolicy {
  pub min: Option<i64>,
  pub max: Option<i64>,
}

/// Running score across a session's rounds.
#[derive(Clone, Debug, Default)]
pub struct ScoreBoard {
  total: i64,
  clamp: ClampPolicy,
}

impl ScoreBoard {
  pub fn new(clamp: ClampPolicy) -> Self {
    Self { total: 0, clamp }
  }

  pub fn total(&self) -> i64 {
    self.total
  }

  /// Apply one round's delta and return the new running total.
  /// An absent delta (score parse miss) counts as zero.
  pub fn apply(&mut self, delta: Option<i64>) -> i64 {
    self.total = self.total.saturating_add(delta.unwrap_or(0));
    if let Some(min) = self.clamp.min {
      if self.total < min {
        self.total = min;
      }
    }
    if let Some(max) = self.clamp.max {
      if self.total > max {
        self.total = max;
      }
    }
    self.total
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn single_bracket_returns_value_and_prefix() {
    let r = extract_last_bracket_score("不错，继续保持。[6]");
    assert_eq!(r.score, Some(6));
    assert_eq!(r.preceding_text, "不错，继续保持。");
  }

  #[test]
  fn last_of_multiple_brackets_wins() {
    let r = extract_last_bracket_score("第一轮 [3] 第二轮 [8] 最终 [5]");
    assert_eq!(r.score, Some(5));
    assert_eq!(r.preceding_text, "第一轮 [3] 第二轮 [8] 最终 ");
  }

  #[test]
  fn trailing_non_numeric_bracket_does_not_shadow_score() {
    // The rule forbids a later bracketed *integer*, not any bracket.
    let r = extract_last_bracket_score("a[3]b[xyz]");
    assert_eq!(r.score, Some(3));
    assert_eq!(r.preceding_text, "a");
  }

  #[test]
  fn no_bracket_preserves_text() {
    let r = extract_last_bracket_score("没有评分的回复");
    assert_eq!(r.score, None);
    assert_eq!(r.preceding_text, "没有评分的回复");
  }

  #[test]
  fn non_numeric_contents_never_match() {
    assert_eq!(extract_last_bracket_score("[abc]").score, None);
    assert_eq!(extract_last_bracket_score("[12a]").score, None);
    assert_eq!(extract_last_bracket_score("[]").score, None);
  }

  #[test]
  fn empty_and_whitespace_fail() {
    assert_eq!(extract_last_bracket_score("").score, None);
    assert_eq!(extract_last_bracket_score("   \n\t").score, None);
  }

  #[test]
  fn nested_brackets_match_the_inner_group() {
    let r = extract_last_bracket_score("[[7]]");
    assert_eq!(r.score, Some(7));
    assert_eq!(r.preceding_text, "[");
  }

  #[test]
  fn unicode_digits_never_match() {
    assert_eq!(extract_last_bracket_score("评分 [七]").score, None);
    assert_eq!(extract_last_bracket_score("score [٣]").score, None);
    assert_eq!(extract_last_bracket_score("score [３]").score, None); // fullwidth
  }

  #[test]
  fn adjacent_trailing_groups_take_the_last() {
    let r = extract_last_bracket_score("[1][2][3]");
    assert_eq!(r.score, Some(3));
    assert_eq!(r.preceding_text, "[1][2]");
  }

  #[test]
  fn overflowing_value_is_a_parse_miss() {
    let r = extract_last_bracket_score("评分 [99999999999999999999999]");
    assert_eq!(r.score, None);
    // An earlier sane group still wins over later noise.
    let r = extract_last_bracket_score("[4] 然后 [99999999999999999999999]");
    assert_eq!(r.score, Some(4));
  }

  #[test]
  fn accumulation_preserves_order() {
    let mut board = ScoreBoard::default();
    let totals: Vec<i64> = [3_i64, -1, 5]
      .iter()
      .map(|d| board.apply(Some(*d)))
      .collect();
    assert_eq!(totals, vec![3, 2, 7]);
  }

  #[test]
  fn absent_delta_leaves_total_unchanged() {
    let mut board = ScoreBoard::default();
    board.apply(Some(6));
    assert_eq!(board.apply(None), 6);
    assert_eq!(board.total(), 6);
  }

  #[test]
  fn clamp_policy_applies_when_configured() {
    let mut board = ScoreBoard::new(ClampPolicy { min: Some(0), max: Some(10) });
    assert_eq!(board.apply(Some(-5)), 0);
    assert_eq!(board.apply(Some(25)), 10);
  }
}

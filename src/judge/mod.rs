//! Judgment parsing and position-bias correction.
//!
//! The judge agent's free-text verdict is parsed into a [`ScorePair`]. To
//! cancel ordering bias the judge is queried twice, with the two candidate
//! responses in swapped presentation order, and the two results are merged
//! with [`merge`]. An unparsable verdict becomes the `(-1, -1)` sentinel and
//! must propagate as "undecided", never as a numeric score.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// How the judge expresses a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum JudgeMode {
    /// Pairwise preference: "assistant 1" / "assistant 2" / "equal".
    Compare,
    /// Two numeric scores on the first line.
    Score,
}

/// A positional score pair: first slot for the response presented first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(f64, f64)", into = "(f64, f64)")]
pub struct ScorePair {
    pub first: f64,
    pub second: f64,
}

impl ScorePair {
    /// The sentinel marking an unparsable or undecided judgment.
    pub const SENTINEL: Self = Self {
        first: -1.0,
        second: -1.0,
    };

    /// Creates a score pair.
    pub fn new(first: f64, second: f64) -> Self {
        Self { first, second }
    }

    /// Whether either slot carries the sentinel marker.
    pub fn is_sentinel(&self) -> bool {
        self.first == -1.0 || self.second == -1.0
    }

    /// Returns the pair with its slots swapped.
    pub fn reversed(&self) -> Self {
        Self {
            first: self.second,
            second: self.first,
        }
    }
}

impl From<(f64, f64)> for ScorePair {
    fn from((first, second): (f64, f64)) -> Self {
        Self { first, second }
    }
}

impl From<ScorePair> for (f64, f64) {
    fn from(pair: ScorePair) -> Self {
        (pair.first, pair.second)
    }
}

/// Structured outcome of one judge call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeResult {
    pub score_pair: ScorePair,
    pub review: Option<String>,
    pub parse_error: Option<String>,
}

impl JudgeResult {
    fn sentinel(error: impl Into<String>) -> Self {
        Self {
            score_pair: ScorePair::SENTINEL,
            review: None,
            parse_error: Some(error.into()),
        }
    }
}

/// Parses raw judge output into a structured result.
///
/// The verdict is read from the first non-empty line; the remaining lines
/// become the free-text review. Parse failures are encoded as the sentinel
/// pair, never raised.
pub fn parse(raw: &str, mode: JudgeMode) -> JudgeResult {
    let cleaned = raw
        .trim()
        .strip_prefix("Output:")
        .or_else(|| raw.trim().strip_prefix("output:"))
        .unwrap_or(raw.trim())
        .trim();

    let mut lines = cleaned.lines();
    let verdict = loop {
        match lines.next() {
            Some(line) if !line.trim().is_empty() => break line.trim().to_string(),
            Some(_) => continue,
            None => return JudgeResult::sentinel("empty judgement"),
        }
    };
    let review = {
        let rest = lines.collect::<Vec<_>>().join("\n").trim().to_string();
        if rest.is_empty() {
            None
        } else {
            Some(rest)
        }
    };

    match mode {
        JudgeMode::Compare => {
            // Priority order matters: "assistant 1" before "assistant 2"
            // before "equal".
            let option = verdict.to_lowercase();
            let score_pair = if option.contains("assistant 1") {
                ScorePair::new(1.0, 0.0)
            } else if option.contains("assistant 2") {
                ScorePair::new(0.0, 1.0)
            } else if option.contains("equal") {
                ScorePair::new(1.0, 1.0)
            } else {
                return JudgeResult::sentinel("wrong option in judgement");
            };
            JudgeResult {
                score_pair,
                review,
                parse_error: None,
            }
        }
        JudgeMode::Score => {
            let normalized = verdict.replace(',', " ");
            let tokens: Vec<&str> = normalized.split_whitespace().collect();
            if tokens.len() != 2 {
                return JudgeResult::sentinel("wrong number of scores");
            }
            let first = tokens[0].parse::<f64>();
            let second = tokens[1].parse::<f64>();
            match (first, second) {
                (Ok(first), Ok(second)) => JudgeResult {
                    score_pair: ScorePair::new(first, second),
                    review,
                    parse_error: None,
                },
                _ => JudgeResult::sentinel(format!("non-numeric score in '{verdict}'")),
            }
        }
    }
}

/// Merges the forward and reversed-order judgments into one score pair.
///
/// The reversed call presented the candidates in swapped slots, so a valid
/// reversed result contributes with its pair order flipped. If both results
/// are sentinel the merge is sentinel; if exactly one is valid it passes
/// through unaveraged; otherwise the slots are averaged positionally, which
/// symmetrizes systematic position bias.
pub fn merge(forward: &JudgeResult, reversed: &JudgeResult) -> ScorePair {
    let fwd = forward.score_pair;
    let rev = reversed.score_pair;
    match (fwd.is_sentinel(), rev.is_sentinel()) {
        (true, true) => ScorePair::SENTINEL,
        (false, true) => fwd,
        (true, false) => rev.reversed(),
        (false, false) => ScorePair::new(
            (fwd.first + rev.second) / 2.0,
            (fwd.second + rev.first) / 2.0,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid(first: f64, second: f64) -> JudgeResult {
        JudgeResult {
            score_pair: ScorePair::new(first, second),
            review: None,
            parse_error: None,
        }
    }

    fn sentinel() -> JudgeResult {
        JudgeResult::sentinel("unparsable")
    }

    #[test]
    fn compare_parses_assistant_one() {
        let result = parse("Assistant 1\nsome text", JudgeMode::Compare);
        assert_eq!(result.score_pair, ScorePair::new(1.0, 0.0));
        assert_eq!(result.review.as_deref(), Some("some text"));
        assert!(result.parse_error.is_none());
    }

    #[test]
    fn compare_parses_assistant_two_and_equal() {
        let two = parse("assistant 2\nreasoning here", JudgeMode::Compare);
        assert_eq!(two.score_pair, ScorePair::new(0.0, 1.0));

        let equal = parse("Equal\nboth are fine", JudgeMode::Compare);
        assert_eq!(equal.score_pair, ScorePair::new(1.0, 1.0));
    }

    #[test]
    fn compare_prefers_assistant_one_over_equal_mention() {
        // Priority order: a line mentioning both resolves to assistant 1.
        let result = parse("assistant 1 and assistant 2 are equal", JudgeMode::Compare);
        assert_eq!(result.score_pair, ScorePair::new(1.0, 0.0));
    }

    #[test]
    fn compare_garbage_yields_sentinel() {
        let result = parse("garbage", JudgeMode::Compare);
        assert_eq!(result.score_pair, ScorePair::SENTINEL);
        assert!(result.score_pair.is_sentinel());
        assert!(result.review.is_none());
        assert!(result.parse_error.is_some());
    }

    #[test]
    fn compare_strips_output_prefix() {
        let result = parse("Output: assistant 2\nwhy", JudgeMode::Compare);
        assert_eq!(result.score_pair, ScorePair::new(0.0, 1.0));
    }

    #[test]
    fn score_parses_two_numbers() {
        let result = parse("6 4\ndetailed review", JudgeMode::Score);
        assert_eq!(result.score_pair, ScorePair::new(6.0, 4.0));
        assert_eq!(result.review.as_deref(), Some("detailed review"));
    }

    #[test]
    fn score_normalizes_commas() {
        let result = parse("7, 9\nok", JudgeMode::Score);
        assert_eq!(result.score_pair, ScorePair::new(7.0, 9.0));
    }

    #[test]
    fn score_rejects_wrong_token_count() {
        assert!(parse("6 4 2", JudgeMode::Score).score_pair.is_sentinel());
        assert!(parse("6", JudgeMode::Score).score_pair.is_sentinel());
        assert!(parse("six four", JudgeMode::Score).score_pair.is_sentinel());
    }

    #[test]
    fn empty_input_yields_sentinel() {
        assert!(parse("", JudgeMode::Compare).score_pair.is_sentinel());
        assert!(parse("\n\n", JudgeMode::Score).score_pair.is_sentinel());
    }

    #[test]
    fn merge_averages_positionally() {
        // Forward saw (prev, new); reversed saw (new, prev).
        let merged = merge(&valid(6.0, 4.0), &valid(6.0, 4.0));
        assert_eq!(merged, ScorePair::new(5.0, 5.0));

        let merged = merge(&valid(1.0, 0.0), &valid(0.0, 1.0));
        assert_eq!(merged, ScorePair::new(1.0, 0.0));
    }

    #[test]
    fn merge_is_order_symmetric_for_valid_inputs() {
        // Swapping which response is "new" and re-running with forward and
        // reversed swapped must yield the mirrored pair.
        let forward = valid(7.0, 3.0);
        let reversed = valid(2.0, 8.0);
        let merged = merge(&forward, &reversed);
        let mirrored = merge(&valid(2.0, 8.0), &valid(7.0, 3.0));
        assert_eq!(merged, mirrored.reversed());
    }

    #[test]
    fn merge_passes_through_single_valid_result() {
        // Valid forward result is used as-is.
        let merged = merge(&valid(0.0, 1.0), &sentinel());
        assert_eq!(merged, ScorePair::new(0.0, 1.0));

        // Valid reversed result contributes with slots flipped.
        let merged = merge(&sentinel(), &valid(0.0, 1.0));
        assert_eq!(merged, ScorePair::new(1.0, 0.0));
    }

    #[test]
    fn merge_of_two_sentinels_is_sentinel() {
        assert!(merge(&sentinel(), &sentinel()).is_sentinel());
    }

    #[test]
    fn score_pair_serializes_as_tuple() {
        let json = serde_json::to_string(&ScorePair::new(1.0, 0.0)).expect("serialize");
        assert_eq!(json, "[1.0,0.0]");
        let back: ScorePair = serde_json::from_str("[-1.0,-1.0]").expect("deserialize");
        assert!(back.is_sentinel());
    }
}

//! Pipeline configuration: edit modes, protocol selection, and stop policy.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::agents::AgentNames;
use crate::judge::JudgeMode;

/// A digit string that does not describe a protocol.
#[derive(Debug, Error)]
#[error("invalid edit mode spec '{spec}': {reason}")]
pub struct ProtocolParseError {
    spec: String,
    reason: String,
}

/// One independent editing strategy of the separate protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditMode {
    /// Editor rewrites from the request alone.
    EditorOnly,
    /// Advisor sees only the request, then the editor applies suggestions.
    AdvisorBlind,
    /// Advisor sees request and response, then the editor revises.
    AdvisorRevise,
    /// Two-round debate feeds the advisor, then the editor revises.
    Debate,
}

impl EditMode {
    /// Stable numeric id, used in result keys (`mode_0` .. `mode_3`).
    pub fn id(self) -> u8 {
        match self {
            EditMode::EditorOnly => 0,
            EditMode::AdvisorBlind => 1,
            EditMode::AdvisorRevise => 2,
            EditMode::Debate => 3,
        }
    }

    fn from_digit(digit: char) -> Option<Self> {
        match digit {
            '0' => Some(EditMode::EditorOnly),
            '1' => Some(EditMode::AdvisorBlind),
            '2' => Some(EditMode::AdvisorRevise),
            '3' => Some(EditMode::Debate),
            _ => None,
        }
    }
}

/// Which editing protocol a run executes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    /// Independent single-pass modes, each producing its own candidate.
    Separate(Vec<EditMode>),
    /// Debate-advise-edit-judge loop with convergence checks.
    Iterative,
}

impl Protocol {
    /// Parses a digit string like `"03"` or `"4"`.
    ///
    /// The digit `4` selects the iterative protocol and subsumes any other
    /// digits. Otherwise each digit enables one separate mode, deduplicated
    /// and run in ascending id order.
    pub fn parse(spec: &str) -> Result<Self, ProtocolParseError> {
        if spec.contains('4') {
            return Ok(Protocol::Iterative);
        }
        let mut modes = Vec::new();
        for digit in spec.chars() {
            let mode = EditMode::from_digit(digit).ok_or_else(|| ProtocolParseError {
                spec: spec.to_string(),
                reason: format!("unknown digit '{digit}'"),
            })?;
            if !modes.contains(&mode) {
                modes.push(mode);
            }
        }
        if modes.is_empty() {
            return Err(ProtocolParseError {
                spec: spec.to_string(),
                reason: "no modes selected".to_string(),
            });
        }
        modes.sort();
        Ok(Protocol::Separate(modes))
    }
}

/// When to stop advancing through a multi-turn dialogue.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopPolicy {
    /// Stop after editing this many turns.
    MaxTurns(usize),
    /// Stop once the already-edited dialogue reaches this many tokens.
    TokenBudget(usize),
}

impl Default for StopPolicy {
    fn default() -> Self {
        StopPolicy::TokenBudget(2048)
    }
}

/// Everything a pipeline run needs besides the backend and the sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub protocol: Protocol,
    pub judge_mode: JudgeMode,
    /// Upper bound on optimization rounds in the iterative protocol.
    pub max_evol_rounds: usize,
    /// Per-agent memory window; zero exposes the full memory.
    pub agent_window_size: usize,
    /// Dialogue pairs of context when linearizing multi-turn history.
    pub conv_window_size: usize,
    pub stop_policy: StopPolicy,
    pub agent_names: AgentNames,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            protocol: Protocol::Separate(vec![EditMode::EditorOnly, EditMode::Debate]),
            judge_mode: JudgeMode::Compare,
            max_evol_rounds: 3,
            agent_window_size: 0,
            conv_window_size: 2,
            stop_policy: StopPolicy::default(),
            agent_names: AgentNames::default(),
        }
    }
}

impl PipelineConfig {
    pub fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn with_judge_mode(mut self, judge_mode: JudgeMode) -> Self {
        self.judge_mode = judge_mode;
        self
    }

    pub fn with_max_evol_rounds(mut self, rounds: usize) -> Self {
        self.max_evol_rounds = rounds;
        self
    }

    pub fn with_agent_window_size(mut self, size: usize) -> Self {
        self.agent_window_size = size;
        self
    }

    pub fn with_conv_window_size(mut self, size: usize) -> Self {
        self.conv_window_size = size;
        self
    }

    pub fn with_stop_policy(mut self, policy: StopPolicy) -> Self {
        self.stop_policy = policy;
        self
    }

    pub fn with_agent_names(mut self, names: AgentNames) -> Self {
        self.agent_names = names;
        self
    }
}

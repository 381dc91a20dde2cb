//! Editing protocols over a five-agent session.
//!
//! Two protocols exist: the separate protocol runs independent single-pass
//! editing strategies, and the iterative protocol runs a bounded
//! debate-advise-edit-judge loop. Multi-turn dialogues wrap either protocol
//! in a turn-by-turn driver.

pub mod config;
mod debate;
mod iterative;
mod multi_turn;
mod separate;

pub use config::{EditMode, PipelineConfig, Protocol, ProtocolParseError, StopPolicy};
pub use debate::run_debate;
pub use iterative::{run_iterative, IterativeOutcome, OptimizationStep};
pub use multi_turn::{run_multi_turn, MultiTurnOutcome};
pub use separate::{run_separate, ModeOutput};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::agents::{Agent, AgentResult, AgentSession};
use crate::dataset::SampleQuery;
use crate::llm::MessageRole;

/// What one protocol run produced for one query.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EditOutcome {
    Separate(BTreeMap<String, ModeOutput>),
    Iterative(IterativeOutcome),
}

impl EditOutcome {
    /// The edit to substitute for the original response, if any.
    ///
    /// The separate protocol nominates the candidate of its highest-numbered
    /// mode; the iterative protocol nominates its settled output. An empty
    /// edit is never applied.
    pub fn applied_edit(&self) -> Option<&str> {
        let edit = match self {
            EditOutcome::Separate(modes) => {
                modes.values().next_back().map(|m| m.evol_output.as_str())
            }
            EditOutcome::Iterative(outcome) => Some(outcome.evol_output.as_str()),
        };
        edit.filter(|e| !e.is_empty())
    }
}

/// Runs the configured protocol once over a single-turn query.
pub async fn run_protocol(
    session: &mut AgentSession,
    query: &SampleQuery,
    config: &PipelineConfig,
) -> AgentResult<EditOutcome> {
    match &config.protocol {
        Protocol::Separate(modes) => run_separate(session, query, modes)
            .await
            .map(EditOutcome::Separate),
        Protocol::Iterative => run_iterative(session, query, config)
            .await
            .map(EditOutcome::Iterative),
    }
}

/// Sends one user prompt to an agent and returns the trimmed reply.
pub(crate) async fn speak(
    agent: &mut Agent,
    session_id: &str,
    prompt: String,
) -> AgentResult<String> {
    agent.update_memory(&prompt, MessageRole::User, None);
    let reply = agent.act(session_id).await?;
    Ok(reply.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mode_output(text: &str) -> ModeOutput {
        ModeOutput {
            evol_output: text.to_string(),
            suggestions: None,
        }
    }

    #[test]
    fn separate_outcome_applies_highest_mode() {
        let mut modes = BTreeMap::new();
        modes.insert("mode_0".to_string(), mode_output("direct"));
        modes.insert("mode_3".to_string(), mode_output("debated"));
        let outcome = EditOutcome::Separate(modes);
        assert_eq!(outcome.applied_edit(), Some("debated"));
    }

    #[test]
    fn empty_edits_are_never_applied() {
        let mut modes = BTreeMap::new();
        modes.insert("mode_0".to_string(), mode_output(""));
        assert!(EditOutcome::Separate(modes).applied_edit().is_none());

        let outcome = EditOutcome::Iterative(IterativeOutcome {
            evol_output: String::new(),
            evol_round: 0,
            steps: Vec::new(),
            evol_error: None,
        });
        assert!(outcome.applied_edit().is_none());
    }

    #[test]
    fn iterative_outcome_applies_settled_output() {
        let outcome = EditOutcome::Iterative(IterativeOutcome {
            evol_output: "settled".to_string(),
            evol_round: 2,
            steps: Vec::new(),
            evol_error: None,
        });
        assert_eq!(outcome.applied_edit(), Some("settled"));
    }
}

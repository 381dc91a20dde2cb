//! Sequential editing of multi-turn dialogues.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::agents::AgentSession;
use crate::dataset::{Sample, SampleQuery, Turn};
use crate::prompts::linearize_conversation;
use crate::utils::tokens::conversation_token_len;

use super::config::{PipelineConfig, StopPolicy};
use super::{run_protocol, EditOutcome};

/// Outcome of editing a dialogue turn by turn.
///
/// `conversations` is the fully updated dialogue, present only when no turn
/// failed. On failure the steps completed so far are kept and `edit_error`
/// records the cause; the partially edited dialogue is discarded so a failed
/// sample never masquerades as an edited one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiTurnOutcome {
    pub optimization_steps: Vec<EditOutcome>,
    #[serde(rename = "evol_conversations", skip_serializing_if = "Option::is_none")]
    pub conversations: Option<Vec<Turn>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edit_error: Option<String>,
}

/// Edits a dialogue front to back, one request/response pair at a time.
///
/// Each turn's request is linearized together with the already-edited
/// preceding context, so improvements made to earlier turns feed into later
/// ones. An accepted edit is written back into the working dialogue before
/// the next turn is processed. The stop policy is evaluated after every turn;
/// the token budget is measured over the edited prefix, which lets a run
/// that shortens responses cover more turns than the raw dialogue would.
pub async fn run_multi_turn(
    session: &mut AgentSession,
    sample: &Sample,
    config: &PipelineConfig,
) -> MultiTurnOutcome {
    let session_id = session.session_id.clone();
    let mut conversations = sample.conversations.clone();
    let num_turns = conversations.len() / 2;
    let mut steps = Vec::new();
    let mut cur_turn = 1usize;

    loop {
        info!(session = %session_id, turn = cur_turn, "Optimizing dialogue turn");
        let update_idx = (cur_turn - 1) * 2 + 1;
        let query = SampleQuery {
            id: sample.id.unwrap_or_default(),
            instruction: linearize_conversation(&conversations, cur_turn, config.conv_window_size),
            input: String::new(),
            output: conversations[update_idx].value.clone(),
        };

        let outcome = match run_protocol(session, &query, config).await {
            Ok(outcome) => outcome,
            Err(error) => {
                warn!(session = %session_id, turn = cur_turn, %error, "Turn editing failed");
                return MultiTurnOutcome {
                    optimization_steps: steps,
                    conversations: None,
                    edit_error: Some(error.to_string()),
                };
            }
        };

        if let Some(edit) = outcome.applied_edit() {
            conversations[update_idx].value = edit.to_string();
        }
        steps.push(outcome);
        cur_turn += 1;
        session.clear_all();

        if cur_turn > num_turns {
            break;
        }
        match config.stop_policy {
            StopPolicy::MaxTurns(max_turns) => {
                if cur_turn > max_turns {
                    break;
                }
            }
            StopPolicy::TokenBudget(budget) => {
                if conversation_token_len(&conversations[..=update_idx]) >= budget {
                    break;
                }
            }
        }
    }

    MultiTurnOutcome {
        optimization_steps: steps,
        conversations: Some(conversations),
        edit_error: None,
    }
}

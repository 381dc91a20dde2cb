//! The iterative protocol: debate, advise, edit, judge, repeat.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::agents::{AgentResult, AgentSession};
use crate::dataset::SampleQuery;
use crate::judge::{self, ScorePair};
use crate::prompts::{self, AdvisorTask, EditContext, EditorTask};

use super::config::PipelineConfig;
use super::debate::run_debate;
use super::speak;

/// Judge decision marker recorded when a round's verdict was unparsable.
const JUDGE_ERROR: &str = "<JudgeError>";

/// Full trace of one optimization round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationStep {
    pub round: usize,
    pub output: String,
    pub suggestions: String,
    pub judge: ScorePair,
}

/// Outcome of the iterative protocol for one query.
///
/// `evol_output` is the response the run settled on; `evol_round` counts how
/// many candidate edits were accepted. A judge failure stops the run early
/// with `evol_error` set and the last accepted response kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterativeOutcome {
    pub evol_output: String,
    pub evol_round: usize,
    #[serde(rename = "optimization_steps")]
    pub steps: Vec<OptimizationStep>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evol_error: Option<String>,
}

/// Runs bounded optimization rounds until the judge stops preferring the
/// candidate over the incumbent.
///
/// Each round debates the incumbent response, distills suggestions, produces
/// a candidate edit, and judges candidate against incumbent twice with the
/// presentation order swapped. An accepted candidate becomes the incumbent
/// for the next round; all agent memories are wiped between rounds.
pub async fn run_iterative(
    session: &mut AgentSession,
    query: &SampleQuery,
    config: &PipelineConfig,
) -> AgentResult<IterativeOutcome> {
    let session_id = session.session_id.clone();
    let mut ctx = EditContext::new(query);
    let mut pre_resp = query.output.clone();

    let mut outcome = IterativeOutcome {
        evol_output: String::new(),
        evol_round: 0,
        steps: Vec::new(),
        evol_error: None,
    };

    for cur_round in 0..config.max_evol_rounds {
        info!(session = %session_id, round = cur_round, "Starting optimization round");

        let transcript = run_debate(session, &ctx).await?;
        let suggestions = speak(
            &mut session.advisor,
            &session_id,
            prompts::advisor_prompt(&ctx, &AdvisorTask::FromDebate(&transcript)),
        )
        .await?;
        let candidate = speak(
            &mut session.editor,
            &session_id,
            prompts::editor_prompt(
                &ctx,
                &EditorTask::Revise {
                    suggestions: &suggestions,
                    previous_response: &pre_resp,
                },
            ),
        )
        .await?;

        // Judge twice with swapped presentation order; the judge's memory is
        // wiped in between so the second verdict is independent.
        let forward_raw = speak(
            &mut session.judge,
            &session_id,
            prompts::judge_prompt(&ctx, &pre_resp, &candidate, config.judge_mode, false),
        )
        .await?;
        session.judge.clear_memory(true);
        let reversed_raw = speak(
            &mut session.judge,
            &session_id,
            prompts::judge_prompt(&ctx, &pre_resp, &candidate, config.judge_mode, true),
        )
        .await?;

        let forward = judge::parse(&forward_raw, config.judge_mode);
        let reversed = judge::parse(&reversed_raw, config.judge_mode);
        let merged = judge::merge(&forward, &reversed);
        debug!(
            session = %session_id,
            round = cur_round,
            incumbent = merged.first,
            candidate = merged.second,
            "Judgment merged"
        );

        outcome.steps.push(OptimizationStep {
            round: cur_round,
            output: candidate.clone(),
            suggestions,
            judge: merged,
        });

        if merged.is_sentinel() {
            outcome.evol_output = pre_resp;
            outcome.evol_round = cur_round;
            outcome.evol_error = Some(JUDGE_ERROR.to_string());
            return Ok(outcome);
        }
        if merged.second <= merged.first {
            // The incumbent holds; converged.
            outcome.evol_output = pre_resp;
            outcome.evol_round = cur_round;
            return Ok(outcome);
        }

        outcome.evol_output = candidate.clone();
        outcome.evol_round = cur_round + 1;

        // The accepted candidate becomes the incumbent for the next round.
        ctx = EditContext::from_parts(&query.instruction, &query.input, &candidate);
        pre_resp = candidate;
        session.clear_all();
    }

    Ok(outcome)
}

//! The separate protocol: independent single-pass editing strategies.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::agents::{AgentResult, AgentSession};
use crate::dataset::SampleQuery;
use crate::prompts::{self, AdvisorTask, EditContext, EditorTask};

use super::config::EditMode;
use super::debate::run_debate;
use super::speak;

/// Candidate produced by one separate mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModeOutput {
    pub evol_output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<String>,
}

/// Runs each enabled mode once, in ascending id order.
///
/// Every mode produces its own candidate under a `mode_{id}` key; modes never
/// see each other's output. Participating agents are wiped back to their
/// personas after each mode so later modes start clean.
pub async fn run_separate(
    session: &mut AgentSession,
    query: &SampleQuery,
    modes: &[EditMode],
) -> AgentResult<BTreeMap<String, ModeOutput>> {
    let session_id = session.session_id.clone();
    let ctx = EditContext::new(query);
    let pre_resp = query.output.as_str();
    let mut results = BTreeMap::new();

    for &mode in modes {
        info!(session = %session_id, mode = mode.id(), "Running edit mode");
        let output = match mode {
            EditMode::EditorOnly => {
                let edit = speak(
                    &mut session.editor,
                    &session_id,
                    prompts::editor_prompt(&ctx, &EditorTask::Direct),
                )
                .await?;
                session.editor.clear_memory(true);
                ModeOutput {
                    evol_output: edit,
                    suggestions: None,
                }
            }
            EditMode::AdvisorBlind => {
                let suggestions = speak(
                    &mut session.advisor,
                    &session_id,
                    prompts::advisor_prompt(&ctx, &AdvisorTask::InstructionOnly),
                )
                .await?;
                let edit = speak(
                    &mut session.editor,
                    &session_id,
                    prompts::editor_prompt(
                        &ctx,
                        &EditorTask::FromSuggestions {
                            suggestions: &suggestions,
                        },
                    ),
                )
                .await?;
                session.advisor.clear_memory(true);
                session.editor.clear_memory(true);
                ModeOutput {
                    evol_output: edit,
                    suggestions: Some(suggestions),
                }
            }
            EditMode::AdvisorRevise => {
                let suggestions = speak(
                    &mut session.advisor,
                    &session_id,
                    prompts::advisor_prompt(&ctx, &AdvisorTask::WithResponse),
                )
                .await?;
                let edit = speak(
                    &mut session.editor,
                    &session_id,
                    prompts::editor_prompt(
                        &ctx,
                        &EditorTask::Revise {
                            suggestions: &suggestions,
                            previous_response: pre_resp,
                        },
                    ),
                )
                .await?;
                session.advisor.clear_memory(true);
                session.editor.clear_memory(true);
                ModeOutput {
                    evol_output: edit,
                    suggestions: Some(suggestions),
                }
            }
            EditMode::Debate => {
                let transcript = run_debate(session, &ctx).await?;
                let suggestions = speak(
                    &mut session.advisor,
                    &session_id,
                    prompts::advisor_prompt(&ctx, &AdvisorTask::FromDebate(&transcript)),
                )
                .await?;
                let edit = speak(
                    &mut session.editor,
                    &session_id,
                    prompts::editor_prompt(
                        &ctx,
                        &EditorTask::Revise {
                            suggestions: &suggestions,
                            previous_response: pre_resp,
                        },
                    ),
                )
                .await?;
                session.positive.clear_memory(true);
                session.critical.clear_memory(true);
                session.advisor.clear_memory(true);
                session.editor.clear_memory(true);
                ModeOutput {
                    evol_output: edit,
                    suggestions: Some(suggestions),
                }
            }
        };
        results.insert(format!("mode_{}", mode.id()), output);
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use crate::agents::{AgentNames, SessionStore};
    use crate::llm::testing::ScriptedBackend;

    fn query() -> SampleQuery {
        SampleQuery {
            id: 1,
            instruction: "Name a color.".to_string(),
            input: String::new(),
            output: "Blue.".to_string(),
        }
    }

    fn session(backend: Arc<ScriptedBackend>) -> AgentSession {
        AgentSession::new(
            "1",
            backend,
            Arc::new(SessionStore::new(None)),
            &AgentNames::default(),
            0,
        )
    }

    #[tokio::test]
    async fn editor_only_mode_produces_single_candidate() {
        let backend = Arc::new(ScriptedBackend::new(&["A vivid crimson."]));
        let mut session = session(backend.clone());

        let results = run_separate(&mut session, &query(), &[EditMode::EditorOnly])
            .await
            .expect("separate");
        assert_eq!(results.len(), 1);
        let output = &results["mode_0"];
        assert_eq!(output.evol_output, "A vivid crimson.");
        assert!(output.suggestions.is_none());
        assert_eq!(backend.remaining(), 0);
    }

    #[tokio::test]
    async fn modes_run_independently_and_clean_up() {
        let backend = Arc::new(ScriptedBackend::new(&[
            // mode 0
            "direct edit",
            // mode 3: debate, advisor, editor
            "pos stance",
            "crt stance",
            "pos rebuttal",
            "crt rebuttal",
            "1. be concise",
            "debate-informed edit",
        ]));
        let mut session = session(backend.clone());

        let results = run_separate(
            &mut session,
            &query(),
            &[EditMode::EditorOnly, EditMode::Debate],
        )
        .await
        .expect("separate");

        assert_eq!(results.len(), 2);
        assert_eq!(results["mode_0"].evol_output, "direct edit");
        assert_eq!(results["mode_3"].evol_output, "debate-informed edit");
        assert_eq!(
            results["mode_3"].suggestions.as_deref(),
            Some("1. be concise")
        );
        assert_eq!(backend.remaining(), 0);

        // All participants wiped back to persona-only memories.
        for agent in [
            &session.positive,
            &session.critical,
            &session.advisor,
            &session.editor,
        ] {
            assert_eq!(agent.memory().len(), 1);
        }
    }

    #[tokio::test]
    async fn advisor_modes_record_suggestions() {
        let backend = Arc::new(ScriptedBackend::new(&[
            "1. add detail",
            "blind edit",
            "1. fix tone",
            "revised edit",
        ]));
        let mut session = session(backend.clone());

        let results = run_separate(
            &mut session,
            &query(),
            &[EditMode::AdvisorBlind, EditMode::AdvisorRevise],
        )
        .await
        .expect("separate");

        assert_eq!(
            results["mode_1"].suggestions.as_deref(),
            Some("1. add detail")
        );
        assert_eq!(results["mode_1"].evol_output, "blind edit");
        assert_eq!(results["mode_2"].suggestions.as_deref(), Some("1. fix tone"));
        assert_eq!(results["mode_2"].evol_output, "revised edit");
    }
}

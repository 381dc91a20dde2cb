//! Two-round debate between the positive and critical reviewers.

use tracing::debug;

use crate::agents::{AgentResult, AgentSession};
use crate::prompts::{self, DebateTranscript, EditContext};

use super::speak;

/// Runs the predetermined-stance round followed by the free rebuttal round.
///
/// Round one has each reviewer argue its assigned stance about the sample.
/// Round two shows each reviewer the other's opening statement for rebuttal.
/// Both reviewers keep their own memories across the rounds, so rebuttals are
/// made with the reviewer's first statement in context.
pub async fn run_debate(
    session: &mut AgentSession,
    ctx: &EditContext,
) -> AgentResult<DebateTranscript> {
    let session_id = session.session_id.clone();

    let pos_pred = speak(
        &mut session.positive,
        &session_id,
        prompts::positive_stance(ctx),
    )
    .await?;
    let crt_pred = speak(
        &mut session.critical,
        &session_id,
        prompts::critical_stance(ctx),
    )
    .await?;

    let pos_free = speak(
        &mut session.positive,
        &session_id,
        prompts::rebuttal(&crt_pred),
    )
    .await?;
    let crt_free = speak(
        &mut session.critical,
        &session_id,
        prompts::rebuttal(&pos_pred),
    )
    .await?;

    debug!(session = %session_id, "Debate finished");
    Ok(DebateTranscript {
        pos_pred,
        crt_pred,
        pos_free,
        crt_free,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use crate::agents::{AgentNames, SessionStore};
    use crate::llm::testing::ScriptedBackend;

    #[tokio::test]
    async fn debate_runs_four_utterances_in_order() {
        let backend = Arc::new(ScriptedBackend::new(&[
            "looks accurate",
            "needs work",
            "rebutting the critique ",
            " conceding one point",
        ]));
        let mut session = AgentSession::new(
            "s1",
            backend.clone(),
            Arc::new(SessionStore::new(None)),
            &AgentNames::default(),
            0,
        );
        let ctx = EditContext::from_parts("Name a color.", "", "Blue.");

        let transcript = run_debate(&mut session, &ctx).await.expect("debate");
        assert_eq!(transcript.pos_pred, "looks accurate");
        assert_eq!(transcript.crt_pred, "needs work");
        // Replies are whitespace-trimmed.
        assert_eq!(transcript.pos_free, "rebutting the critique");
        assert_eq!(transcript.crt_free, "conceding one point");
        assert_eq!(backend.remaining(), 0);

        // Each debater holds persona plus its own two exchanges.
        assert_eq!(session.positive.memory().len(), 5);
        assert_eq!(session.critical.memory().len(), 5);
    }
}

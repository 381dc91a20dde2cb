//! A persona-bound conversational actor backed by a model query interface.

use std::sync::Arc;

use tracing::debug;

use crate::llm::{Message, MessageRole, ModelBackend, FAILURE_SENTINEL};

use super::error::{AgentError, AgentResult};
use super::role::AgentRole;
use super::session::{SessionRecord, SessionStore};

/// One role's conversation state plus its mediation of backend calls.
///
/// The first memory entry is always the role's persona (a system entry),
/// inserted at construction. Non-system entries are appended imperatively by
/// the protocols; the memory itself does not enforce turn alternation.
pub struct Agent {
    role: AgentRole,
    name: String,
    memory: Vec<Message>,
    window_size: usize,
    backend: Arc<dyn ModelBackend>,
    store: Arc<SessionStore>,
}

impl Agent {
    /// Constructs an agent and seeds its memory with the role persona.
    pub fn new(
        role: AgentRole,
        name: impl Into<String>,
        window_size: usize,
        backend: Arc<dyn ModelBackend>,
        store: Arc<SessionStore>,
    ) -> Self {
        Self {
            role,
            name: name.into(),
            memory: vec![Message::system(role.persona())],
            window_size,
            backend,
            store,
        }
    }

    /// Returns this agent's role.
    pub fn role(&self) -> AgentRole {
        self.role
    }

    /// Returns this agent's display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the full (unwindowed) memory.
    pub fn memory(&self) -> &[Message] {
        &self.memory
    }

    /// Appends one entry to the memory.
    ///
    /// When a speaker name is given, the content is prefixed with
    /// `"{name}:\n"`.
    pub fn update_memory(&mut self, content: &str, role: MessageRole, speaker: Option<&str>) {
        let content = match speaker {
            Some(name) => format!("{name}:\n{content}"),
            None => content.to_string(),
        };
        self.memory.push(Message { role, content });
    }

    /// Builds the memory slice visible to the backend.
    ///
    /// A window size of zero exposes everything. Otherwise all system entries
    /// plus the most recent `window_size` non-system entries are visible,
    /// reassembled in original order.
    pub fn visible_memory(&self) -> Vec<Message> {
        if self.window_size == 0 {
            return self.memory.clone();
        }
        let mut visible: Vec<Message> = Vec::new();
        let mut kept = 0usize;
        for entry in self.memory.iter().rev() {
            if entry.role == MessageRole::System {
                visible.push(entry.clone());
            } else if kept < self.window_size {
                visible.push(entry.clone());
                kept += 1;
            }
        }
        visible.reverse();
        visible
    }

    /// Queries the backend with the visible memory and returns the reply.
    ///
    /// The backend's history-adaptation hook is applied to the full memory
    /// first. The reply is appended to the full memory as an assistant entry,
    /// and the visible-memory-plus-reply transcript is persisted under the
    /// session id (one append-only record per call).
    ///
    /// Fails with [`AgentError::Backend`] when the backend returns the
    /// reserved failure sentinel; the caller must treat this as terminal for
    /// the current protocol round. The transcript record is persisted even
    /// then, so failed calls stay visible in the session history.
    pub async fn act(&mut self, session_id: &str) -> AgentResult<String> {
        let (adapted, _extracted_system) =
            self.backend.adapt_history(std::mem::take(&mut self.memory));
        self.memory = adapted;

        let visible = self.visible_memory();
        debug!(
            role = %self.role,
            session = session_id,
            visible_entries = visible.len(),
            "Agent querying backend"
        );

        let reply = self.backend.query(&visible).await?;

        // Recorded before the sentinel check so a failing exchange still
        // shows up in the audit trail.
        let mut transcript = visible;
        transcript.push(Message::assistant(reply.clone()));
        self.store
            .append(
                session_id,
                SessionRecord {
                    agent_role: self.role,
                    agent_name: self.name.clone(),
                    mem_session: transcript,
                },
            )
            .await?;

        if reply == FAILURE_SENTINEL {
            return Err(AgentError::Backend(format!(
                "model call for role '{}' returned the failure sentinel",
                self.role
            )));
        }
        self.memory.push(Message::assistant(reply.clone()));

        Ok(reply)
    }

    /// Clears memory entries.
    ///
    /// With `keep_persona` set, only non-system entries are stripped; without
    /// it, everything is wiped, persona included.
    pub fn clear_memory(&mut self, keep_persona: bool) {
        if keep_persona {
            self.memory.retain(|m| m.role == MessageRole::System);
        } else {
            self.memory.clear();
        }
    }

    /// Re-appends the persona as a new system entry.
    ///
    /// Used when the memory was fully wiped but the role must remain known.
    pub fn restate_persona(&mut self) {
        self.memory.push(Message::system(self.role.persona()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use crate::error::LlmError;

    /// Mock backend returning scripted replies in order.
    struct ScriptedBackend {
        replies: Mutex<Vec<String>>,
        calls: AtomicUsize,
        last_visible: Mutex<Vec<Message>>,
    }

    impl ScriptedBackend {
        fn new(replies: Vec<&str>) -> Self {
            Self {
                replies: Mutex::new(replies.into_iter().map(String::from).collect()),
                calls: AtomicUsize::new(0),
                last_visible: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ModelBackend for ScriptedBackend {
        async fn query(&self, messages: &[Message]) -> Result<String, LlmError> {
            *self.last_visible.lock().expect("lock") = messages.to_vec();
            let idx = self.calls.fetch_add(1, Ordering::SeqCst);
            let replies = self.replies.lock().expect("lock");
            Ok(replies
                .get(idx)
                .cloned()
                .unwrap_or_else(|| replies.last().cloned().unwrap_or_default()))
        }
    }

    fn test_agent(backend: Arc<ScriptedBackend>, window: usize) -> Agent {
        Agent::new(
            AgentRole::Editor,
            "<David>",
            window,
            backend,
            Arc::new(SessionStore::new(None)),
        )
    }

    #[test]
    fn construction_seeds_persona() {
        let backend = Arc::new(ScriptedBackend::new(vec!["ok"]));
        let agent = test_agent(backend, 0);
        assert_eq!(agent.memory().len(), 1);
        assert_eq!(agent.memory()[0].role, MessageRole::System);
        assert_eq!(agent.memory()[0].content, AgentRole::Editor.persona());
    }

    #[test]
    fn speaker_name_prefixes_content() {
        let backend = Arc::new(ScriptedBackend::new(vec!["ok"]));
        let mut agent = test_agent(backend, 0);
        agent.update_memory("hello", MessageRole::User, Some("<Anna>"));
        assert_eq!(agent.memory()[1].content, "<Anna>:\nhello");
    }

    #[test]
    fn window_keeps_system_and_recent_entries() {
        let backend = Arc::new(ScriptedBackend::new(vec!["ok"]));
        let mut agent = test_agent(backend, 2);
        for i in 0..4 {
            agent.update_memory(&format!("u{i}"), MessageRole::User, None);
            agent.update_memory(&format!("a{i}"), MessageRole::Assistant, None);
        }

        let visible = agent.visible_memory();
        // Persona plus the last two non-system entries, original order.
        assert_eq!(visible.len(), 3);
        assert_eq!(visible[0].role, MessageRole::System);
        assert_eq!(visible[1].content, "u3");
        assert_eq!(visible[2].content, "a3");
    }

    #[tokio::test]
    async fn act_appends_reply_and_records_transcript() {
        let backend = Arc::new(ScriptedBackend::new(vec!["revised text"]));
        let store = Arc::new(SessionStore::new(None));
        let mut agent = Agent::new(
            AgentRole::Editor,
            "<David>",
            0,
            Arc::clone(&backend) as Arc<dyn ModelBackend>,
            Arc::clone(&store),
        );
        agent.update_memory("please edit", MessageRole::User, None);

        let reply = agent.act("s1").await.expect("act");
        assert_eq!(reply, "revised text");
        // Full memory: persona, user prompt, assistant reply.
        assert_eq!(agent.memory().len(), 3);
        assert_eq!(agent.memory()[2].role, MessageRole::Assistant);

        let records = store.take("s1");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].agent_role, AgentRole::Editor);
        // Transcript = visible memory + reply.
        assert_eq!(records[0].mem_session.len(), 3);
        assert_eq!(records[0].mem_session[2].content, "revised text");
    }

    #[tokio::test]
    async fn sentinel_reply_becomes_backend_error() {
        let backend = Arc::new(ScriptedBackend::new(vec![FAILURE_SENTINEL]));
        let store = Arc::new(SessionStore::new(None));
        let mut agent = Agent::new(
            AgentRole::Editor,
            "<David>",
            0,
            backend,
            Arc::clone(&store),
        );
        agent.update_memory("edit", MessageRole::User, None);

        let err = agent.act("s1").await.unwrap_err();
        match err {
            AgentError::Backend(msg) => assert!(msg.contains("editor")),
            other => panic!("expected Backend error, got {:?}", other),
        }
        // The failing exchange is still recorded in the session history.
        let records = store.take("s1");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].mem_session.last().expect("reply").content, FAILURE_SENTINEL);
        // The reply never enters the agent's own memory.
        assert_eq!(agent.memory().len(), 2);
    }

    #[test]
    fn clear_memory_respects_persona_flag() {
        let backend = Arc::new(ScriptedBackend::new(vec!["ok"]));
        let mut agent = test_agent(backend, 0);
        agent.update_memory("u", MessageRole::User, None);
        agent.update_memory("a", MessageRole::Assistant, None);

        agent.clear_memory(true);
        assert_eq!(agent.memory().len(), 1);
        assert_eq!(agent.memory()[0].role, MessageRole::System);

        agent.clear_memory(false);
        assert!(agent.memory().is_empty());

        agent.restate_persona();
        assert_eq!(agent.memory().len(), 1);
        assert_eq!(agent.memory()[0].content, AgentRole::Editor.persona());
    }
}

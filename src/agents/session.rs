//! Per-sample agent sessions and their persisted transcripts.
//!
//! One [`AgentSession`] holds the five live agents processing a single
//! sample. All five share one session identifier, so the append-only records
//! written by each `act` call can be reassembled into a full audit trail once
//! the sample completes. Sessions are owned by exactly one scheduler task and
//! discarded afterwards.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::llm::{Message, ModelBackend};

use super::agent::Agent;
use super::error::AgentResult;
use super::role::AgentRole;

/// Display names for the five roles, used as speaker prefixes and recorded
/// in transcripts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentNames {
    pub positive: String,
    pub critical: String,
    pub advisor: String,
    pub editor: String,
    pub judge: String,
}

impl Default for AgentNames {
    fn default() -> Self {
        Self {
            positive: "<Anna>".to_string(),
            critical: "<Bruno>".to_string(),
            advisor: "<Charles>".to_string(),
            editor: "<David>".to_string(),
            judge: "<Emma>".to_string(),
        }
    }
}

impl AgentNames {
    /// Returns the display name for a role.
    pub fn for_role(&self, role: AgentRole) -> &str {
        match role {
            AgentRole::Positive => &self.positive,
            AgentRole::Critical => &self.critical,
            AgentRole::Advisor => &self.advisor,
            AgentRole::Editor => &self.editor,
            AgentRole::Judge => &self.judge,
        }
    }
}

/// One append-only record per agent `act` call: the visible memory sent to
/// the backend plus the reply, at that point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub agent_role: AgentRole,
    pub agent_name: String,
    pub mem_session: Vec<Message>,
}

/// Append-only store for session transcripts.
///
/// Records are kept in memory and, when a directory is configured, mirrored
/// to one JSON file per session id after every append.
pub struct SessionStore {
    dir: Option<PathBuf>,
    records: Mutex<HashMap<String, Vec<SessionRecord>>>,
}

impl SessionStore {
    /// Creates a store, optionally mirroring transcripts under `dir`.
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self {
            dir,
            records: Mutex::new(HashMap::new()),
        }
    }

    /// Appends one record to a session transcript.
    pub async fn append(&self, session_id: &str, record: SessionRecord) -> AgentResult<()> {
        let snapshot = {
            let mut records = self.records.lock().expect("session store lock");
            let entries = records.entry(session_id.to_string()).or_default();
            entries.push(record);
            self.dir.as_ref().map(|_| entries.clone())
        };

        if let (Some(dir), Some(entries)) = (self.dir.as_ref(), snapshot) {
            tokio::fs::create_dir_all(dir).await?;
            let path = self.session_path(dir, session_id);
            let json = serde_json::to_vec(&entries)?;
            tokio::fs::write(path, json).await?;
        }
        Ok(())
    }

    /// Removes and returns all records for a session.
    pub fn take(&self, session_id: &str) -> Vec<SessionRecord> {
        let mut records = self.records.lock().expect("session store lock");
        records.remove(session_id).unwrap_or_default()
    }

    /// Deletes the mirrored transcript file for a session, if any.
    pub async fn remove_file(&self, session_id: &str) -> AgentResult<()> {
        if let Some(dir) = self.dir.as_ref() {
            let path = self.session_path(dir, session_id);
            if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                tokio::fs::remove_file(path).await?;
            }
        }
        Ok(())
    }

    fn session_path(&self, dir: &PathBuf, session_id: &str) -> PathBuf {
        dir.join(format!("{session_id}_hist-session.json"))
    }
}

/// The five live agents for one sample, bound to one session identifier.
pub struct AgentSession {
    pub session_id: String,
    pub positive: Agent,
    pub critical: Agent,
    pub advisor: Agent,
    pub editor: Agent,
    pub judge: Agent,
}

impl AgentSession {
    /// Constructs a fresh five-agent session.
    pub fn new(
        session_id: impl Into<String>,
        backend: Arc<dyn ModelBackend>,
        store: Arc<SessionStore>,
        names: &AgentNames,
        window_size: usize,
    ) -> Self {
        let session_id = session_id.into();
        let agent = |role: AgentRole| {
            Agent::new(
                role,
                names.for_role(role),
                window_size,
                Arc::clone(&backend),
                Arc::clone(&store),
            )
        };
        Self {
            positive: agent(AgentRole::Positive),
            critical: agent(AgentRole::Critical),
            advisor: agent(AgentRole::Advisor),
            editor: agent(AgentRole::Editor),
            judge: agent(AgentRole::Judge),
            session_id,
        }
    }

    /// Clears every agent's memory, retaining the personas.
    pub fn clear_all(&mut self) {
        for agent in [
            &mut self.positive,
            &mut self.critical,
            &mut self.advisor,
            &mut self.editor,
            &mut self.judge,
        ] {
            agent.clear_memory(true);
        }
    }
}

//! LLM backend integration for sft-evolve.
//!
//! Agents talk to a model provider exclusively through the [`ModelBackend`]
//! contract: an ordered message list in, plain reply text out. Backends that
//! report failures in-band return the reserved [`FAILURE_SENTINEL`] string,
//! which the agent layer converts into a hard error for the current protocol
//! round. Retry and backoff policies belong to backend implementations, never
//! to the orchestration core.

mod openai;
#[cfg(test)]
pub(crate) mod testing;

pub use openai::OpenAiChatBackend;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::LlmError;

/// Reserved reply value a backend may return to signal an in-band failure.
pub const FAILURE_SENTINEL: &str = "__error__";

/// Role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Persona or instruction context set by the orchestrator.
    System,
    /// A task prompt addressed to the model.
    User,
    /// A model reply.
    Assistant,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// A message in a conversation with an LLM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender.
    pub role: MessageRole,
    /// Content of the message.
    pub content: String,
}

impl Message {
    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Contract between the orchestration core and a model provider.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Sends the ordered message list to the model and returns the reply text.
    ///
    /// A returned [`FAILURE_SENTINEL`] marks an in-band failure; transport
    /// failures use `LlmError`.
    async fn query(&self, messages: &[Message]) -> Result<String, LlmError>;

    /// Optional capability for backends that cannot express a system role
    /// natively or that must compact long histories before a call.
    ///
    /// Returns the adapted history plus any system text the backend extracted
    /// for out-of-band delivery. The default is the identity transform.
    fn adapt_history(&self, history: Vec<Message>) -> (Vec<Message>, Option<String>) {
        (history, None)
    }
}

//! Role-played agents and their per-sample sessions.
//!
//! An [`Agent`] wraps one persona, owns an ordered message history, and
//! mediates calls to the model backend. An [`AgentSession`] bundles the five
//! agents that process one sample, all bound to the same persisted session
//! identifier.

mod agent;
pub mod error;
mod role;
mod session;

pub use agent::Agent;
pub use error::{AgentError, AgentResult};
pub use role::AgentRole;
pub use session::{AgentNames, AgentSession, SessionRecord, SessionStore};

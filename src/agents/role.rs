//! The closed set of agent personas driving the edit protocols.
//!
//! Five fixed roles take part in processing one sample: two debaters with
//! opposing stances, an advisor who condenses the debate, an editor who
//! produces candidate responses, and a judge who compares candidates.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::AgentError;

/// Roles an agent can take, each carrying an immutable persona text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    /// Argues the current response is already adequate.
    Positive,
    /// Argues the current response is inadequate.
    Critical,
    /// Condenses a debate into concrete writing suggestions.
    Advisor,
    /// Produces candidate response edits.
    Editor,
    /// Compares the previous and the newly edited response.
    Judge,
}

impl AgentRole {
    /// Returns all five roles in session order.
    pub fn all() -> [Self; 5] {
        [
            Self::Positive,
            Self::Critical,
            Self::Advisor,
            Self::Editor,
            Self::Judge,
        ]
    }

    /// Returns the role tag used in transcripts and config.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Critical => "critical",
            Self::Advisor => "advisor",
            Self::Editor => "editor",
            Self::Judge => "judge",
        }
    }

    /// Returns the fixed persona text seeded as the role's system entry.
    pub fn persona(&self) -> &'static str {
        match self {
            Self::Positive => POSITIVE_PERSONA,
            Self::Critical => CRITICAL_PERSONA,
            Self::Advisor => ADVISOR_PERSONA,
            Self::Editor => EDITOR_PERSONA,
            Self::Judge => JUDGE_PERSONA,
        }
    }
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AgentRole {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "positive" => Ok(Self::Positive),
            "critical" => Ok(Self::Critical),
            "advisor" => Ok(Self::Advisor),
            "editor" => Ok(Self::Editor),
            "judge" => Ok(Self::Judge),
            other => Err(AgentError::UnknownRole(other.to_string())),
        }
    }
}

const POSITIVE_PERSONA: &str = "You are an optimistic person who embodies a mindset that looks for the best in every situation, maintains a positive attitude, and embraces challenges as opportunities for growth and success. ";

const CRITICAL_PERSONA: &str = "You are a critical person who tends to view things through critical thinking and provide feedback for improvement or identify areas of concern. ";

const ADVISOR_PERSONA: &str = "You are an experienced advisor who possesses a high level of expertise in summarizing and giving advice. ";

const EDITOR_PERSONA: &str = "You are a professional editor who possesses a high level of expertise in refining and improving writing content. ";

const JUDGE_PERSONA: &str = "You are a helpful and precise assistant for checking the quality of the response. ";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_roles_have_personas() {
        for role in AgentRole::all() {
            assert!(!role.persona().is_empty(), "{:?} should have a persona", role);
        }
    }

    #[test]
    fn role_round_trips_through_str() {
        for role in AgentRole::all() {
            let parsed: AgentRole = role.as_str().parse().expect("should parse");
            assert_eq!(parsed, role);
        }
    }

    #[test]
    fn unknown_role_is_rejected() {
        let err = "moderator".parse::<AgentRole>().unwrap_err();
        match err {
            AgentError::UnknownRole(tag) => assert_eq!(tag, "moderator"),
            other => panic!("expected UnknownRole, got {:?}", other),
        }
    }
}

//! Scripted backend for exercising protocols without a live model.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::LlmError;

use super::{Message, ModelBackend};

/// Returns pre-scripted replies in order; panics when the script runs dry.
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<String>>,
}

impl ScriptedBackend {
    pub fn new(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
        }
    }

    /// Number of scripted replies not yet consumed.
    pub fn remaining(&self) -> usize {
        self.replies.lock().expect("script lock").len()
    }
}

#[async_trait]
impl ModelBackend for ScriptedBackend {
    async fn query(&self, _messages: &[Message]) -> Result<String, LlmError> {
        let mut replies = self.replies.lock().expect("script lock");
        Ok(replies.pop_front().expect("scripted replies exhausted"))
    }
}

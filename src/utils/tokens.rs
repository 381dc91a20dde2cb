//! Token accounting for adaptive dialogue budgets.

use std::sync::OnceLock;

use tiktoken_rs::{cl100k_base, CoreBPE};

use crate::dataset::Turn;

fn encoder() -> &'static CoreBPE {
    static ENCODER: OnceLock<CoreBPE> = OnceLock::new();
    // The vocabulary is embedded, so construction cannot fail at runtime.
    ENCODER.get_or_init(|| cl100k_base().expect("embedded cl100k vocabulary"))
}

/// Counts tokens in a text under the cl100k encoding.
pub fn count_tokens(text: &str) -> usize {
    encoder().encode_with_special_tokens(text).len()
}

/// Token length of a dialogue prefix, with turn values joined by spaces.
pub fn conversation_token_len(turns: &[Turn]) -> usize {
    let joined = turns
        .iter()
        .map(|t| t.value.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    count_tokens(&joined)
}

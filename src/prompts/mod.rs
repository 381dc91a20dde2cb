//! Prompt construction for every agent task.
//!
//! All text an agent sees is assembled here: the alpaca-style sample
//! rendering, the debate stance and rebuttal prompts, the advisor and editor
//! task prompts, the pairwise judge prompt in both presentation orders, and
//! the two-role linearization of dialogue history for multi-turn samples.
//! Template wording is load-bearing; the agents were tuned against these
//! exact phrasings.

use crate::dataset::{SampleQuery, Turn};
use crate::judge::JudgeMode;

/// The sample views shared by all task prompts.
///
/// `sample_full` renders instruction, input, and the current response;
/// `sample_request` renders only the request side with a trailing blank line
/// so a `### Response:` cue can be appended directly.
#[derive(Debug, Clone)]
pub struct EditContext {
    pub sample_full: String,
    pub sample_request: String,
    pub has_input: bool,
}

impl EditContext {
    /// Renders a query into the alpaca-style views.
    pub fn new(query: &SampleQuery) -> Self {
        Self::from_parts(&query.instruction, &query.input, &query.output)
    }

    /// Renders explicit instruction/input/response strings.
    ///
    /// An empty or `"<no input>"` input selects the input-free templates.
    pub fn from_parts(instruction: &str, input: &str, output: &str) -> Self {
        let has_input = !input.is_empty() && input != "<no input>";
        let (sample_full, sample_request) = if has_input {
            (
                format!(
                    "### Instruction:\n{instruction}\n\n### Input:\n{input}\n\n### Response:\n{output}"
                ),
                format!("### Instruction:\n{instruction}\n\n### Input:\n{input}\n\n"),
            )
        } else {
            (
                format!("### Instruction:\n{instruction}\n\n### Response:\n{output}"),
                format!("### Instruction:\n{instruction}\n\n"),
            )
        };
        Self {
            sample_full,
            sample_request,
            has_input,
        }
    }

}

/// The four utterances of one two-round debate.
#[derive(Debug, Clone, Default)]
pub struct DebateTranscript {
    pub pos_pred: String,
    pub crt_pred: String,
    pub pos_free: String,
    pub crt_free: String,
}

// ---------------------------------------------------------------------------
// Debate prompts
// ---------------------------------------------------------------------------

/// Opening prompt for the positive reviewer's stance.
pub fn positive_stance(ctx: &EditContext) -> String {
    format!(
        "{}\n\nIn your opinion, the above response accurately answers the instruction and the input. Please state reasons why the response is accurate if it is used for supervised fine-tuning.",
        ctx.sample_full
    )
}

/// Opening prompt for the critical reviewer's stance.
pub fn critical_stance(ctx: &EditContext) -> String {
    format!(
        "{}\n\nIn your opinion, the above response does not accurately answer the instruction and the input. Please offer suggestions on how to improve the response if it is used for supervised fine-tuning.",
        ctx.sample_full
    )
}

/// Rebuttal prompt, presenting the opposing reviewer's opening statement.
pub fn rebuttal(opposing_pred: &str) -> String {
    format!(
        "### Review from others:\n{opposing_pred}\n\nAbove is another review from others, please evaluate the plausibility of each point according to the given instruction and input."
    )
}

// ---------------------------------------------------------------------------
// Advisor prompts
// ---------------------------------------------------------------------------

/// What material the advisor reasons from.
#[derive(Debug, Clone)]
pub enum AdvisorTask<'a> {
    /// Only the request is shown; suggest how to complete it.
    InstructionOnly,
    /// Request plus current response; suggest improvements.
    WithResponse,
    /// Request, response, and a finished debate to distill.
    FromDebate(&'a DebateTranscript),
}

/// Builds the advisor prompt for the given task.
pub fn advisor_prompt(ctx: &EditContext, task: &AdvisorTask<'_>) -> String {
    match task {
        AdvisorTask::InstructionOnly => {
            let desc = if ctx.has_input {
                format!(
                    "Below is an instruction that describes a task, paired with an input that provides further context.\n\n{} ",
                    ctx.sample_request
                )
            } else {
                format!(
                    "Below is an instruction that describes a task.\n\n{} ",
                    ctx.sample_request
                )
            };
            format!(
                "{desc}Propose no more than 3 writing suggestions for others to better complete the request. Directly output these suggestions in separate lines without any foreword or explanation."
            )
        }
        AdvisorTask::WithResponse => {
            let desc = sample_desc(ctx);
            format!(
                "{desc}Propose no more than 3 writing suggestions for improving the given response. Directly output these suggestions in separate lines without any foreword or explanation."
            )
        }
        AdvisorTask::FromDebate(debate) => {
            let desc = sample_desc(ctx);
            let hist = format!(
                "The following is a discussion about the given request and response by two reviewers.\n\n### Reviewer 1:\n{}\n\n### Reviewer 2:\n{}\n\n### Reviewer 1:\n{}\n\n### Reviewer 2:\n{}\n\n",
                debate.pos_pred, debate.crt_pred, debate.pos_free, debate.crt_free
            );
            format!(
                "{desc}{hist}Extract and summarize credible ideas from the above dialogue and rewrite them into no more than 3 writing suggestions for improving the given response. Directly output these suggestions in separate lines without any foreword or explanation."
            )
        }
    }
}

fn sample_desc(ctx: &EditContext) -> String {
    if ctx.has_input {
        format!(
            "Below is an instruction that describes a task, paired with an input that provides further context.\n\n{} ",
            ctx.sample_full
        )
    } else {
        format!(
            "Below is an instruction that describes a task.\n\n{} ",
            ctx.sample_full
        )
    }
}

// ---------------------------------------------------------------------------
// Editor prompts
// ---------------------------------------------------------------------------

/// What material the editor writes from.
#[derive(Debug, Clone)]
pub enum EditorTask<'a> {
    /// Write a response from the request alone.
    Direct,
    /// Modify the response following suggestions; the previous response is
    /// not restated in the prompt.
    FromSuggestions { suggestions: &'a str },
    /// Revise an explicit previous response following suggestions.
    Revise {
        suggestions: &'a str,
        previous_response: &'a str,
    },
}

/// Builds the editor prompt for the given task.
pub fn editor_prompt(ctx: &EditContext, task: &EditorTask<'_>) -> String {
    let desc = if ctx.has_input {
        "Below is an instruction that describes a task, paired with an input that provides further context. "
    } else {
        "Below is an instruction that describes a task. "
    };
    match task {
        EditorTask::Direct => format!(
            "{desc}Write a response that appropriately completes the request.\n\n{}### Response:\n",
            ctx.sample_request
        ),
        EditorTask::FromSuggestions { suggestions } => format!(
            "### Writing Suggestions:\n{suggestions}\n\n{desc}\nReferring to the above writing suggestions (MUST ignore suggestions beyond your capabilities), modify the previous response and make sure that it appropriately completes the request.\n\n{}### Response:\n",
            ctx.sample_request
        ),
        EditorTask::Revise {
            suggestions,
            previous_response,
        } => format!(
            "### Writing Suggestions:\n{suggestions}\n\n### Previous Response:\n{previous_response}\n\n{desc}\nReferring to the above writing suggestions (MUST ignore suggestions beyond your capabilities), modify the previous response and make sure that it appropriately completes the request.\n\n{}### Response:\n",
            ctx.sample_request
        ),
    }
}

// ---------------------------------------------------------------------------
// Judge prompts
// ---------------------------------------------------------------------------

/// Builds the pairwise judge prompt.
///
/// In the forward order the previous response takes the Assistant 1 slot and
/// the candidate the Assistant 2 slot; `reversed` swaps them. Both orders are
/// always issued so position bias can be averaged out.
pub fn judge_prompt(
    ctx: &EditContext,
    previous_response: &str,
    new_response: &str,
    mode: JudgeMode,
    reversed: bool,
) -> String {
    let desc = if ctx.has_input {
        format!(
            "Below is an instruction that describes a task, paired with an input that provides further context.\n\n{}",
            ctx.sample_request
        )
    } else {
        format!(
            "Below is an instruction that describes a task.\n\n{}",
            ctx.sample_request
        )
    };
    let (slot_one, slot_two) = if reversed {
        (new_response, previous_response)
    } else {
        (previous_response, new_response)
    };
    let responses = format!(
        "[The Start of Assistant 1's Response]\n{slot_one}\n\n[The End of Assistant 1's Response]\n\n[The Start of Assistant 2's Response]\n{slot_two}\n\n[The End of Assistant 2's Response]\n\n[System]\n"
    );
    let task = match mode {
        JudgeMode::Compare => {
            "We would like to request your comparison of the performance of two AI assistants in response to the user request displayed above.\nPlease compare the helpfulness, relevance, accuracy, and level of detail of their responses.\nPlease first output a single line containing a name indicating whose response is better, <assistant 1> or <assistant 2> or <equal>. In the subsequent line, please provide a comprehensive explanation of your comparison, avoiding any potential bias and ensuring that the order in which the responses were presented does not affect your judgment\n\n"
        }
        JudgeMode::Score => {
            "We would like to request your feedback on the performance of two AI assistants in response to the user request displayed above.\nPlease rate the helpfulness, relevance, accuracy, and level of detail of their responses. Each assistant receives an overall score on a scale of 1 to 10, where a higher score indicates better overall performance.\nPlease first output a single line containing only two values indicating the scores for Assistant 1 and 2, respectively. The two scores are separated by a space. In the subsequent line, please provide a comprehensive explanation of your evaluation, avoiding any potential bias and ensuring that the order in which the responses were presented does not affect your judgment\n\n"
        }
    };
    format!("{desc}{responses}{task}")
}

// ---------------------------------------------------------------------------
// Multi-turn linearization
// ---------------------------------------------------------------------------

const CONVERSATION_SYSTEM: &str = "A chat between a curious user and an artificial intelligence assistant. The assistant gives helpful, detailed, and polite answers to the user's questions.";

/// Linearizes dialogue history into a single-turn instruction.
///
/// `cur_turn` is the 1-based index of the request/response pair being edited.
/// The window covers the preceding `window - 1` pairs plus the current
/// request; history before the window is dropped. User turns end with a
/// space, assistant turns with an end-of-sequence marker, and the prompt
/// closes with an open assistant cue.
pub fn linearize_conversation(turns: &[Turn], cur_turn: usize, window: usize) -> String {
    let end = (cur_turn - 1) * 2;
    let start = (cur_turn.saturating_sub(window) * 2).min(end);

    let mut prompt = format!("{CONVERSATION_SYSTEM} ");
    for (offset, turn) in turns[start..end].iter().enumerate() {
        if (start + offset) % 2 == 0 {
            prompt.push_str("USER: ");
            prompt.push_str(&turn.value);
            prompt.push(' ');
        } else {
            prompt.push_str("ASSISTANT: ");
            prompt.push_str(&turn.value);
            prompt.push_str("</s>");
        }
    }
    prompt.push_str("USER: ");
    prompt.push_str(&turns[end].value);
    prompt.push(' ');
    prompt.push_str("ASSISTANT:");
    prompt
}

//! Prompt templates for the muse request-orchestration core.
//!
//! A [`Template`] turns [`ContextData`] into the provider-agnostic part of a
//! request payload: chat templates emit a `messages` array with each entry
//! wrapped in the model family's role-delimiter tokens, completion templates
//! emit a `prompt` string. Each variant also declares the stop words that
//! must truncate a streamed response.

pub use registry::TemplateRegistry;

mod alpaca;
mod chatml;
mod fim;
mod llama3;
mod plain;
mod registry;

use mcore::{ContextData, Message, Role, RequestType};
use serde_json::{Value, json};

/// A prompt template, one variant per model family.
///
/// Variants are stateless: request preparation is deterministic, never
/// mutates the context, and touches no global state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
    /// Llama 3 instruct family (`<|start_header_id|>` delimiters).
    Llama3,
    /// ChatML family (`<|im_start|>` delimiters), e.g. Qwen, Yi.
    ChatML,
    /// Alpaca instruction format (`### Instruction:` / `### Response:`).
    Alpaca,
    /// CodeLlama fill-in-the-middle completion (`<PRE>`/`<SUF>`/`<MID>`).
    CodeLlamaFim,
    /// Raw prefix passthrough completion.
    Plain,
}

impl Template {
    /// The display name this template is registered under.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Llama3 => "Llama 3",
            Self::ChatML => "ChatML",
            Self::Alpaca => "Alpaca",
            Self::CodeLlamaFim => "CodeLlama FIM",
            Self::Plain => "Plain",
        }
    }

    /// Which caller path may select this template.
    pub fn kind(&self) -> RequestType {
        match self {
            Self::Llama3 | Self::ChatML | Self::Alpaca => RequestType::Chat,
            Self::CodeLlamaFim | Self::Plain => RequestType::Completion,
        }
    }

    /// The fixed stop words that must truncate a streamed response.
    pub fn stop_words(&self) -> &'static [&'static str] {
        match self {
            Self::Llama3 => llama3::STOP_WORDS,
            Self::ChatML => chatml::STOP_WORDS,
            Self::Alpaca => alpaca::STOP_WORDS,
            Self::CodeLlamaFim => fim::STOP_WORDS,
            Self::Plain => &[],
        }
    }

    /// A human-readable description of the wire format.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Llama3 => {
                "messages wrapped as <|start_header_id|>role<|end_header_id|>content<|eot_id|>"
            }
            Self::ChatML => "messages wrapped as <|im_start|>role\\ncontent<|im_end|>",
            Self::Alpaca => "messages wrapped as ### Instruction: / ### Response:",
            Self::CodeLlamaFim => "prompt assembled as <PRE> prefix <SUF>suffix <MID>",
            Self::Plain => "prompt is the raw prefix",
        }
    }

    /// Insert the template-specific fields into `request`.
    ///
    /// Chat templates set `messages`, completion templates set `prompt`.
    /// All other fields of `request` are left untouched.
    pub fn prepare_request(&self, request: &mut Value, context: &ContextData) {
        match self {
            Self::Llama3 => set_messages(request, context, llama3::wrap),
            Self::ChatML => set_messages(request, context, chatml::wrap),
            Self::Alpaca => set_messages(request, context, alpaca::wrap),
            Self::CodeLlamaFim => set_prompt(request, fim::prompt(context)),
            Self::Plain => set_prompt(request, plain::prompt(context)),
        }
    }
}

/// Assemble the `messages` array for a chat template.
///
/// One leading system message when the context carries a system prompt,
/// then one message per history entry in order, each independently wrapped
/// in the variant's delimiter convention.
fn set_messages(request: &mut Value, context: &ContextData, wrap: fn(Role, &str) -> String) {
    let mut messages = Vec::new();

    if let Some(system) = &context.system_prompt {
        messages.push(json!({
            "role": Role::System.as_str(),
            "content": wrap(Role::System, system),
        }));
    }

    if let Some(history) = &context.history {
        for Message { role, content } in history {
            messages.push(json!({
                "role": role.as_str(),
                "content": wrap(*role, content),
            }));
        }
    }

    request["messages"] = Value::Array(messages);
}

fn set_prompt(request: &mut Value, prompt: String) {
    request["prompt"] = Value::String(prompt);
}

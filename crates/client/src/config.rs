//! Call-time configuration for the facade.

use compact_str::CompactString;
use mcore::SamplingParams;
use serde::{Deserialize, Serialize};

/// Everything the facade reads from its external configuration provider:
/// the selected provider and template names, the backend location, and the
/// sampling surface. Supplied at call time; nothing here is hardcoded in
/// the core.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AssistConfig {
    /// Display name of the provider to resolve.
    pub provider: CompactString,

    /// Display name of the template to resolve.
    pub template: CompactString,

    /// Base URL the provider's endpoint suffix is appended to.
    pub base_url: String,

    /// Model identifier written into the payload.
    pub model: String,

    /// Optional system prompt for the session.
    #[serde(default)]
    pub system_prompt: Option<String>,

    /// Sampling parameters with their enable flags.
    #[serde(default)]
    pub sampling: SamplingParams,

    /// Whether `clear_messages` also cancels the in-flight request.
    #[serde(default)]
    pub cancel_on_clear: bool,
}

impl AssistConfig {
    /// A config targeting a local Ollama instance with the Llama 3 chat
    /// template.
    pub fn ollama(model: impl Into<String>) -> Self {
        Self {
            provider: CompactString::const_new("Ollama"),
            template: CompactString::const_new("Llama 3"),
            base_url: "http://localhost:11434".into(),
            model: model.into(),
            system_prompt: None,
            sampling: SamplingParams::default(),
            cancel_on_clear: false,
        }
    }
}

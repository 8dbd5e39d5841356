//! Request identity and call-time request parameters.

use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Whether a request targets the completion or the chat path of a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestType {
    /// Inline code completion at the cursor.
    Completion,
    /// Conversational chat.
    Chat,
}

/// Correlation id linking a submission to its stream of events and to the
/// log entry it updates.
pub type RequestId = CompactString;

/// The envelope a caller creates before submission; its id is echoed
/// unchanged on every emitted event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestEnvelope {
    /// Correlation id for this request.
    pub id: RequestId,
}

impl RequestEnvelope {
    /// Create an envelope with a fresh random id.
    pub fn fresh() -> Self {
        Self {
            id: CompactString::new(uuid::Uuid::new_v4().to_string()),
        }
    }

    /// Create an envelope with a caller-chosen id.
    pub fn with_id(id: impl Into<RequestId>) -> Self {
        Self { id: id.into() }
    }
}

/// Sampling parameters with independent enable flags.
///
/// A gated field is written into the provider payload only when its `use_*`
/// flag is set; the backend default applies otherwise.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SamplingParams {
    /// Sampling temperature.
    pub temperature: f64,

    /// Maximum number of tokens to generate.
    pub max_tokens: u32,

    /// Whether to send `top_p`.
    #[serde(default)]
    pub use_top_p: bool,
    /// Top-p (nucleus) sampling threshold.
    #[serde(default)]
    pub top_p: f64,

    /// Whether to send `top_k`.
    #[serde(default)]
    pub use_top_k: bool,
    /// Top-k sampling cutoff.
    #[serde(default)]
    pub top_k: u32,

    /// Whether to send `presence_penalty`.
    #[serde(default)]
    pub use_presence_penalty: bool,
    /// Presence penalty.
    #[serde(default)]
    pub presence_penalty: f64,

    /// Whether to send `frequency_penalty`.
    #[serde(default)]
    pub use_frequency_penalty: bool,
    /// Frequency penalty.
    #[serde(default)]
    pub frequency_penalty: f64,
}

impl SamplingParams {
    /// The gated fields that are enabled, as `(name, value)` pairs.
    ///
    /// `temperature` and `max_tokens` are always included; the rest only
    /// when their enable flag is set.
    pub fn enabled_fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("temperature".into(), json!(self.temperature));
        fields.insert("max_tokens".into(), json!(self.max_tokens));
        if self.use_top_p {
            fields.insert("top_p".into(), json!(self.top_p));
        }
        if self.use_top_k {
            fields.insert("top_k".into(), json!(self.top_k));
        }
        if self.use_presence_penalty {
            fields.insert("presence_penalty".into(), json!(self.presence_penalty));
        }
        if self.use_frequency_penalty {
            fields.insert("frequency_penalty".into(), json!(self.frequency_penalty));
        }
        fields
    }
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            max_tokens: 1024,
            use_top_p: false,
            top_p: 0.9,
            use_top_k: false,
            top_k: 50,
            use_presence_penalty: false,
            presence_penalty: 0.0,
            use_frequency_penalty: false,
            frequency_penalty: 0.0,
        }
    }
}

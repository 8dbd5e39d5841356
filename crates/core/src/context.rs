//! Context data handed to templates and providers.

use crate::Message;

/// What to send: the editor-side context a request is built from.
///
/// Immutable once built. `prefix` is always present (possibly empty);
/// `history`, when set, is ordered oldest to newest and non-empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextData {
    /// Text before the cursor (or the raw chat message).
    pub prefix: String,

    /// Text after the cursor.
    pub suffix: String,

    /// Optional system prompt.
    pub system_prompt: Option<String>,

    /// Optional conversation history, oldest first.
    pub history: Option<Vec<Message>>,

    /// Path of the file the request originates from.
    pub file_path: Option<String>,
}

impl ContextData {
    /// Create a context from the text before the cursor.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ..Default::default()
        }
    }

    /// Set the text after the cursor.
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// Set the system prompt.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Set the conversation history. Empty histories are dropped.
    pub fn with_history(mut self, history: Vec<Message>) -> Self {
        self.history = (!history.is_empty()).then_some(history);
        self
    }

    /// Set the originating file path.
    pub fn with_file_path(mut self, path: impl Into<String>) -> Self {
        self.file_path = Some(path.into());
        self
    }
}

//! The session message log.

use mcore::{Message, RequestId, Role};
use std::sync::Mutex;

/// One entry in the session log, tagged with the correlation id of the
/// request that produced (or prompted) it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    /// The role of the entry.
    pub role: Role,
    /// The entry text.
    pub content: String,
    /// Correlation id linking the entry to a request.
    pub id: RequestId,
}

/// Append-only session log with thread-safe interior mutability.
///
/// Streamed assistant output is upserted: adding a message whose role and
/// id match the last entry replaces that entry's content instead of
/// appending a duplicate.
#[derive(Debug, Default)]
pub struct ChatModel {
    messages: Mutex<Vec<ChatMessage>>,
}

impl ChatModel {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a message, or update the last one when role and id match.
    pub fn add_message(&self, role: Role, content: impl Into<String>, id: impl Into<RequestId>) {
        let (content, id) = (content.into(), id.into());
        let mut messages = self.messages.lock().unwrap();
        match messages.last_mut() {
            Some(last) if last.role == role && last.id == id => last.content = content,
            _ => messages.push(ChatMessage { role, content, id }),
        }
    }

    /// The correlation id of the most recent entry.
    pub fn last_message_id(&self) -> Option<RequestId> {
        self.messages
            .lock()
            .unwrap()
            .last()
            .map(|message| message.id.clone())
    }

    /// The log as plain conversation history, oldest first.
    pub fn history(&self) -> Vec<Message> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .map(|entry| Message {
                role: entry.role,
                content: entry.content.clone(),
            })
            .collect()
    }

    /// A snapshot of the full log.
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.messages.lock().unwrap().clone()
    }

    /// Empty the log.
    pub fn clear(&self) {
        self.messages.lock().unwrap().clear();
    }

    /// The number of entries.
    pub fn len(&self) -> usize {
        self.messages.lock().unwrap().len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.messages.lock().unwrap().is_empty()
    }
}

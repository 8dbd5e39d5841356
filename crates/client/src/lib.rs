//! Caller-facing facade for the muse request-orchestration core.
//!
//! [`ClientInterface`] binds a chat session to the request handler: it
//! resolves the configured provider and template by name, assembles the
//! payload, correlates streamed events back into the session log, and
//! forwards failures to the caller.

pub use chat::{ChatMessage, ChatModel};
pub use client::ClientInterface;
pub use config::AssistConfig;

mod chat;
mod client;
mod config;

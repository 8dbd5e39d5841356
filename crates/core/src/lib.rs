//! Shared types for the muse request-orchestration core.
//!
//! This crate provides the value types used across templates, providers,
//! the request handler and the client facade: `Message`, `ContextData`,
//! `RequestType`, `RequestEnvelope`, `SamplingParams`, `HandlerEvent`
//! and the error taxonomy.

pub use context::ContextData;
pub use error::Error;
pub use event::HandlerEvent;
pub use message::{Message, Role};
pub use request::{RequestEnvelope, RequestId, RequestType, SamplingParams};

mod context;
mod error;
mod event;
mod message;
mod request;

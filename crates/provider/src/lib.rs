//! Backend providers for the muse request-orchestration core.
//!
//! A [`Provider`] knows a backend's endpoint paths, auth headers, how to
//! decorate a request payload with provider-specific fields, and how to
//! parse one unit of the transport stream into an incremental text delta
//! plus an end-of-stream flag. Providers buffer partial frames across
//! chunks and never silently drop data.

pub use registry::ProviderRegistry;
pub use transport::{HttpTransport, MockTransport, Transport};

mod ollama;
mod openai;
mod registry;
mod transport;

use anyhow::Result;
use compact_str::CompactString;
use mcore::{RequestType, SamplingParams};
use reqwest::header::{self, HeaderMap, HeaderValue};
use serde_json::Value;

/// A backend provider, one variant per wire format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provider {
    /// Ollama native API (newline-delimited JSON frames).
    Ollama,
    /// Any OpenAI-compatible endpoint (SSE frames), optional Bearer key.
    OpenAiCompat {
        /// API key for the `Authorization: Bearer` header, if required.
        api_key: Option<CompactString>,
    },
    /// LM Studio local server (OpenAI wire format, no auth).
    LmStudio,
}

/// The text and end-of-stream flag extracted from one transport chunk.
///
/// `text` aggregates the deltas of every complete frame contained in the
/// chunk; incomplete frames stay buffered until a later chunk finishes them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkBatch {
    /// Incremental text contributed by this chunk.
    pub text: String,
    /// Whether the backend signalled end-of-stream in this chunk.
    pub done: bool,
}

impl Provider {
    /// The display name this provider is registered under.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ollama => "Ollama",
            Self::OpenAiCompat { .. } => "OpenAI Compatible",
            Self::LmStudio => "LM Studio",
        }
    }

    /// Path suffix appended to the base URL for chat requests.
    pub fn chat_endpoint(&self) -> &'static str {
        match self {
            Self::Ollama => ollama::CHAT_ENDPOINT,
            Self::OpenAiCompat { .. } | Self::LmStudio => openai::CHAT_ENDPOINT,
        }
    }

    /// Path suffix appended to the base URL for completion requests.
    pub fn completion_endpoint(&self) -> &'static str {
        match self {
            Self::Ollama => ollama::COMPLETION_ENDPOINT,
            Self::OpenAiCompat { .. } | Self::LmStudio => openai::COMPLETION_ENDPOINT,
        }
    }

    /// Request headers for this provider (content negotiation plus auth).
    pub fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        if let Self::OpenAiCompat { api_key: Some(key) } = self {
            headers.insert(header::AUTHORIZATION, format!("Bearer {key}").parse()?);
        }
        Ok(headers)
    }

    /// Decorate `request` with provider-specific fields: the streaming flag
    /// and every sampling parameter whose enable flag is set.
    ///
    /// The `model` field is placed by the caller before decoration.
    pub fn prepare_request(
        &self,
        request: &mut Value,
        request_type: RequestType,
        params: &SamplingParams,
    ) {
        match self {
            Self::Ollama => ollama::prepare_request(request, request_type, params),
            Self::OpenAiCompat { .. } | Self::LmStudio => {
                openai::prepare_request(request, request_type, params)
            }
        }
    }

    /// Parse one unit of the transport stream.
    ///
    /// `buf` carries the raw bytes of any partial frame left over from
    /// earlier chunks; it is owned by the in-flight request, not the
    /// provider. Only complete lines are decoded, so a chunk boundary
    /// falling inside a multibyte character never corrupts the text. A
    /// complete frame that fails to parse is an error — partial frames are
    /// kept, never reported and never dropped.
    pub fn parse_chunk(&self, buf: &mut Vec<u8>, bytes: &[u8]) -> Result<ChunkBatch, mcore::Error> {
        buf.extend_from_slice(bytes);
        let complete = String::from_utf8_lossy(&drain_lines(buf)).into_owned();
        match self {
            Self::Ollama => ollama::parse_lines(&complete),
            Self::OpenAiCompat { .. } | Self::LmStudio => openai::parse_lines(&complete),
        }
    }
}

/// Split off everything up to and including the last newline, leaving the
/// trailing partial line in `buf`.
fn drain_lines(buf: &mut Vec<u8>) -> Vec<u8> {
    match buf.iter().rposition(|&b| b == b'\n') {
        Some(pos) => {
            let rest = buf.split_off(pos + 1);
            std::mem::replace(buf, rest)
        }
        None => Vec::new(),
    }
}

//! Ollama native API: newline-delimited JSON frames.
//!
//! Chat frames carry `message.content`, generate frames carry `response`;
//! both carry a `done` flag on the final frame. Sampling parameters nest
//! under `options`, with `max_tokens` spelled `num_predict`.

use crate::ChunkBatch;
use mcore::{Error, RequestType, SamplingParams};
use serde::Deserialize;
use serde_json::Value;

pub(crate) const CHAT_ENDPOINT: &str = "/api/chat";
pub(crate) const COMPLETION_ENDPOINT: &str = "/api/generate";

/// One NDJSON frame from either the chat or the generate endpoint.
#[derive(Debug, Deserialize)]
struct Frame {
    /// Generate-endpoint delta.
    #[serde(default)]
    response: Option<String>,
    /// Chat-endpoint delta.
    #[serde(default)]
    message: Option<FrameMessage>,
    /// End-of-stream marker.
    #[serde(default)]
    done: bool,
}

#[derive(Debug, Deserialize)]
struct FrameMessage {
    #[serde(default)]
    content: String,
}

pub(crate) fn prepare_request(request: &mut Value, _type: RequestType, params: &SamplingParams) {
    request["stream"] = Value::Bool(true);

    let mut options = params.enabled_fields();
    if let Some(max_tokens) = options.remove("max_tokens") {
        options.insert("num_predict".into(), max_tokens);
    }
    request["options"] = Value::Object(options);
}

pub(crate) fn parse_lines(lines: &str) -> Result<ChunkBatch, Error> {
    let mut batch = ChunkBatch::default();
    for line in lines.lines().filter(|l| !l.trim().is_empty()) {
        let frame: Frame = serde_json::from_str(line)
            .map_err(|e| Error::Parse(format!("{e}, frame: {line}")))?;
        if let Some(message) = frame.message {
            batch.text.push_str(&message.content);
        }
        if let Some(response) = frame.response {
            batch.text.push_str(&response);
        }
        batch.done |= frame.done;
    }
    Ok(batch)
}

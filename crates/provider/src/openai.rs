//! OpenAI-compatible wire format: SSE `data: ` frames.
//!
//! Chat frames carry `choices[0].delta.content`, legacy completion frames
//! carry `choices[0].text`. End of stream is either the `[DONE]` sentinel
//! or a non-null `finish_reason`.

use crate::ChunkBatch;
use mcore::{Error, RequestType, SamplingParams};
use serde::Deserialize;
use serde_json::Value;

pub(crate) const CHAT_ENDPOINT: &str = "/v1/chat/completions";
pub(crate) const COMPLETION_ENDPOINT: &str = "/v1/completions";

const DATA_PREFIX: &str = "data:";
const DONE_SENTINEL: &str = "[DONE]";

/// One SSE data frame.
#[derive(Debug, Deserialize)]
struct Frame {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    /// Chat-completions delta.
    #[serde(default)]
    delta: Option<Delta>,
    /// Legacy completions delta.
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

pub(crate) fn prepare_request(request: &mut Value, _type: RequestType, params: &SamplingParams) {
    request["stream"] = Value::Bool(true);

    let mut fields = params.enabled_fields();
    // top_k is not part of the OpenAI surface.
    fields.remove("top_k");
    if let Some(object) = request.as_object_mut() {
        object.extend(fields);
    }
}

pub(crate) fn parse_lines(lines: &str) -> Result<ChunkBatch, Error> {
    let mut batch = ChunkBatch::default();
    for line in lines.lines() {
        // SSE comment lines, event names and keep-alive blanks carry no data.
        let Some(data) = line.strip_prefix(DATA_PREFIX) else {
            continue;
        };
        let data = data.trim();
        if data.is_empty() {
            continue;
        }
        if data == DONE_SENTINEL {
            batch.done = true;
            continue;
        }

        let frame: Frame = serde_json::from_str(data)
            .map_err(|e| Error::Parse(format!("{e}, frame: {data}")))?;
        for choice in frame.choices {
            if let Some(content) = choice.delta.and_then(|d| d.content) {
                batch.text.push_str(&content);
            }
            if let Some(text) = choice.text {
                batch.text.push_str(&text);
            }
            batch.done |= choice.finish_reason.is_some();
        }
    }
    Ok(batch)
}

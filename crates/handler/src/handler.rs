//! The request-handler state machine.

use crate::RequestConfig;
use bytes::Bytes;
use futures_core::stream::BoxStream;
use futures_util::StreamExt;
use mcore::{HandlerEvent, RequestEnvelope, RequestId, RequestType};
use provider::{ChunkBatch, Provider, Transport};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Orchestrates in-flight LLM requests.
///
/// Per correlation id the lifecycle is submit → stream → completed, failed
/// or cancelled. Submitting a second request for an id that already has one
/// first cancels and discards the old one; cancellation is final from the
/// caller's point of view — events from the discarded request are dropped
/// even when they were already sitting in the channel.
pub struct RequestHandler {
    transport: Arc<dyn Transport>,
    events: mpsc::UnboundedSender<TaggedEvent>,
    state: Arc<Mutex<HandlerState>>,
}

/// Shared between the handler, its per-request tasks and the receiver.
///
/// `generations` counts how many times an id has been cancelled or
/// replaced; events carry the generation they were emitted under, and the
/// receiver drops any event whose generation is no longer current.
#[derive(Default)]
struct HandlerState {
    active: BTreeMap<RequestId, InFlight>,
    generations: BTreeMap<RequestId, u64>,
}

struct InFlight {
    generation: u64,
    task: JoinHandle<()>,
}

struct TaggedEvent {
    generation: u64,
    event: HandlerEvent,
}

impl RequestHandler {
    /// Create a handler driving the given transport. The receiver yields
    /// every [`HandlerEvent`] the handler emits, in per-id chunk order.
    pub fn new(transport: Arc<dyn Transport>) -> (Self, EventReceiver) {
        let (events, receiver) = mpsc::unbounded_channel();
        let state = Arc::new(Mutex::new(HandlerState::default()));
        (
            Self {
                transport,
                events,
                state: state.clone(),
            },
            EventReceiver {
                inner: receiver,
                state,
            },
        )
    }

    /// Submit a request. Any in-flight request with the same envelope id is
    /// cancelled and discarded first; no further events from it are
    /// delivered even if its chunks were already buffered.
    pub fn submit(&self, config: RequestConfig, envelope: RequestEnvelope) {
        let id = envelope.id;
        self.cancel(&id);
        let generation = self.generation(&id);

        let headers = match &config.provider {
            Some(provider) => match provider.headers() {
                Ok(headers) => headers,
                Err(e) => {
                    tracing::warn!(%id, "header construction failed: {e}");
                    self.emit(
                        generation,
                        HandlerEvent::Finished {
                            id,
                            success: false,
                            error: e.to_string(),
                        },
                    );
                    return;
                }
            },
            None => reqwest::header::HeaderMap::new(),
        };

        tracing::debug!(%id, url = %config.url, "submitting request");
        let stream = self
            .transport
            .open(&config.url, headers, config.payload.clone());

        // Holding the lock across the spawn means the task cannot reach its
        // own cleanup before the entry exists.
        let mut state = self.state.lock().unwrap();
        let task = tokio::spawn(run_request(
            config,
            id.clone(),
            generation,
            stream,
            self.events.clone(),
            self.state.clone(),
        ));
        state.active.insert(id, InFlight { generation, task });
    }

    /// Cancel the request with the given id, if one is in flight.
    ///
    /// Silent to the caller: the request's transport stream is aborted and
    /// no further completion or finished events are delivered for it,
    /// including events already buffered in the channel. Cancelling an
    /// unknown id is a no-op. Returns whether a request was actually
    /// cancelled.
    pub fn cancel(&self, id: &str) -> bool {
        let mut state = self.state.lock().unwrap();
        let Some(inflight) = state.active.remove(id) else {
            return false;
        };
        *state.generations.entry(id.into()).or_insert(0) += 1;
        inflight.task.abort();
        let live = !inflight.task.is_finished();
        if live {
            tracing::debug!(%id, "request cancelled");
        }
        live
    }

    /// Whether a request with the given id is currently in flight.
    pub fn is_active(&self, id: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .active
            .get(id)
            .is_some_and(|inflight| !inflight.task.is_finished())
    }

    fn generation(&self, id: &str) -> u64 {
        self.state
            .lock()
            .unwrap()
            .generations
            .get(id)
            .copied()
            .unwrap_or(0)
    }

    fn emit(&self, generation: u64, event: HandlerEvent) {
        // A closed receiver only means the caller went away.
        let _ = self.events.send(TaggedEvent { generation, event });
    }
}

/// Receiving half of the handler's event channel.
///
/// Filters at delivery time: an event whose request was cancelled or
/// replaced after the event was emitted is dropped here instead of being
/// handed to the caller.
pub struct EventReceiver {
    inner: mpsc::UnboundedReceiver<TaggedEvent>,
    state: Arc<Mutex<HandlerState>>,
}

impl EventReceiver {
    /// Receive the next live event, or `None` once the handler is gone.
    pub async fn recv(&mut self) -> Option<HandlerEvent> {
        while let Some(tagged) = self.inner.recv().await {
            if self.is_current(&tagged) {
                return Some(tagged.event);
            }
        }
        None
    }

    fn is_current(&self, tagged: &TaggedEvent) -> bool {
        let state = self.state.lock().unwrap();
        let current = state
            .generations
            .get(tagged.event.id())
            .copied()
            .unwrap_or(0);
        current == tagged.generation
    }
}

/// One request's stream-consumption loop. Runs as its own task; chunk
/// handling for a single id is serialized here, so no per-request lock is
/// needed. Cancellation aborts the task; anything it managed to emit
/// beforehand is filtered out by the [`EventReceiver`].
async fn run_request(
    config: RequestConfig,
    id: RequestId,
    generation: u64,
    mut stream: BoxStream<'static, anyhow::Result<Bytes>>,
    events: mpsc::UnboundedSender<TaggedEvent>,
    state: Arc<Mutex<HandlerState>>,
) {
    let stop_words = config
        .template
        .as_ref()
        .map(|t| t.stop_words())
        .unwrap_or_default();

    let mut buf = Vec::new();
    let mut accumulated = String::new();
    let mut error = None;

    while let Some(next) = stream.next().await {
        let bytes = match next {
            Ok(bytes) => bytes,
            Err(e) => {
                error = Some(e.to_string());
                break;
            }
        };

        let batch = match parse(config.provider.as_ref(), &mut buf, &bytes) {
            Ok(batch) => batch,
            Err(e) => {
                error = Some(e.to_string());
                break;
            }
        };
        let mut done = batch.done;
        if batch.text.is_empty() && !done {
            continue;
        }

        let previous = accumulated.len();
        accumulated.push_str(&batch.text);

        if let Some(pos) = first_stop_word(&accumulated, stop_words) {
            accumulated.truncate(pos);
            done = true;
        }
        if config.request_type == RequestType::Completion
            && !config.multi_line
            && truncate_to_single_line(&mut accumulated)
        {
            done = true;
        }
        let delta = accumulated.get(previous..).unwrap_or_default().to_owned();

        let sent = events.send(TaggedEvent {
            generation,
            event: HandlerEvent::Completion {
                id: id.clone(),
                text: accumulated.clone(),
                delta,
                is_complete: done,
            },
        });
        if sent.is_err() || done {
            break;
        }
    }

    // Dropping the stream here tears down the transport call, even when a
    // stop word ended the request before the backend's own signal.
    drop(stream);

    let event = match error {
        Some(error) => {
            tracing::warn!(%id, "request failed: {error}");
            HandlerEvent::Finished {
                id: id.clone(),
                success: false,
                error,
            }
        }
        None => {
            tracing::debug!(%id, "request finished");
            HandlerEvent::Finished {
                id: id.clone(),
                success: true,
                error: String::new(),
            }
        }
    };
    let _ = events.send(TaggedEvent { generation, event });

    // The request is over; drop its entry unless a resubmit replaced it.
    let mut state = state.lock().unwrap();
    if state
        .active
        .get(&id)
        .is_some_and(|inflight| inflight.generation == generation)
    {
        state.active.remove(&id);
    }
}

/// Parse a transport chunk through the provider, or fall back to raw UTF-8
/// passthrough when the request was submitted without one (degraded mode).
fn parse(
    provider: Option<&Provider>,
    buf: &mut Vec<u8>,
    bytes: &[u8],
) -> Result<ChunkBatch, mcore::Error> {
    match provider {
        Some(provider) => provider.parse_chunk(buf, bytes),
        None => {
            buf.extend_from_slice(bytes);
            Ok(ChunkBatch {
                text: drain_utf8(buf),
                done: false,
            })
        }
    }
}

/// Decode and drain the longest valid UTF-8 prefix of `buf`, holding back
/// a trailing incomplete sequence for the next chunk. Bytes that can never
/// start a valid sequence decode to U+FFFD.
fn drain_utf8(buf: &mut Vec<u8>) -> String {
    let mut text = String::new();
    loop {
        match std::str::from_utf8(buf) {
            Ok(s) => {
                text.push_str(s);
                buf.clear();
                return text;
            }
            Err(e) => {
                let valid = e.valid_up_to();
                text.push_str(std::str::from_utf8(&buf[..valid]).unwrap_or_default());
                match e.error_len() {
                    Some(bad) => {
                        text.push(char::REPLACEMENT_CHARACTER);
                        buf.drain(..valid + bad);
                    }
                    None => {
                        buf.drain(..valid);
                        return text;
                    }
                }
            }
        }
    }
}

/// Byte position of the earliest stop-word occurrence, if any.
fn first_stop_word(text: &str, stop_words: &[&str]) -> Option<usize> {
    stop_words.iter().filter_map(|word| text.find(word)).min()
}

/// Truncate a single-line completion at the first line break after its
/// first non-empty line. Returns whether anything was cut.
fn truncate_to_single_line(text: &mut String) -> bool {
    let start = text.len() - text.trim_start_matches('\n').len();
    match text[start..].find('\n') {
        Some(pos) => {
            text.truncate(start + pos);
            true
        }
        None => false,
    }
}

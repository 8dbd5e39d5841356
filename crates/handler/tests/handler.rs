//! Tests for the request-handler state machine.

use bytes::Bytes;
use muse_handler::{EventReceiver, RequestConfig, RequestHandler};
use mcore::{HandlerEvent, RequestEnvelope, RequestType};
use provider::{MockTransport, Provider};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use template::Template;

fn chat_config() -> RequestConfig {
    RequestConfig {
        request_type: RequestType::Chat,
        provider: Some(Provider::Ollama),
        template: Some(Template::Llama3),
        url: "http://localhost:11434/api/chat".into(),
        payload: json!({ "model": "m", "stream": true }),
        multi_line: true,
    }
}

fn completion_config(multi_line: bool) -> RequestConfig {
    RequestConfig {
        request_type: RequestType::Completion,
        provider: Some(Provider::Ollama),
        template: Some(Template::Plain),
        url: "http://localhost:11434/api/generate".into(),
        payload: json!({ "model": "m", "stream": true }),
        multi_line,
    }
}

fn frame(text: &str, done: bool) -> Bytes {
    Bytes::from(format!(
        "{}\n",
        json!({ "response": text, "done": done })
    ))
}

async fn next_event(rx: &mut EventReceiver) -> HandlerEvent {
    tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

async fn assert_no_event(rx: &mut EventReceiver) {
    let quiet = tokio::time::timeout(Duration::from_millis(50), rx.recv()).await;
    assert!(quiet.is_err(), "unexpected event: {:?}", quiet.unwrap());
}

#[tokio::test]
async fn chunks_accumulate_and_finish_on_backend_done() {
    let transport = Arc::new(MockTransport::new());
    let sender = transport.push_stream();
    let (handler, mut events) = RequestHandler::new(transport);

    handler.submit(chat_config(), RequestEnvelope::with_id("req-1"));
    sender.send(Ok(frame("Hel", false))).unwrap();
    sender.send(Ok(frame("lo", true))).unwrap();

    let first = next_event(&mut events).await;
    assert_eq!(
        first,
        HandlerEvent::Completion {
            id: "req-1".into(),
            text: "Hel".into(),
            delta: "Hel".into(),
            is_complete: false,
        }
    );

    let second = next_event(&mut events).await;
    assert_eq!(
        second,
        HandlerEvent::Completion {
            id: "req-1".into(),
            text: "Hello".into(),
            delta: "lo".into(),
            is_complete: true,
        }
    );

    let terminal = next_event(&mut events).await;
    assert_eq!(
        terminal,
        HandlerEvent::Finished {
            id: "req-1".into(),
            success: true,
            error: String::new(),
        }
    );
}

#[tokio::test]
async fn stop_word_truncates_and_forces_completion() {
    let transport = Arc::new(MockTransport::new());
    let sender = transport.push_stream();
    let (handler, mut events) = RequestHandler::new(transport);

    handler.submit(chat_config(), RequestEnvelope::with_id("req-1"));
    sender.send(Ok(frame("Hel", false))).unwrap();
    // The backend has not signalled done; the stop word forces it.
    sender.send(Ok(frame("lo world<|eot_id|>", false))).unwrap();

    let first = next_event(&mut events).await;
    assert!(matches!(first, HandlerEvent::Completion { is_complete: false, .. }));

    match next_event(&mut events).await {
        HandlerEvent::Completion {
            text, is_complete, ..
        } => {
            assert_eq!(text, "Hello world");
            assert!(is_complete);
        }
        other => panic!("expected completion, got {other:?}"),
    }

    assert!(matches!(
        next_event(&mut events).await,
        HandlerEvent::Finished { success: true, .. }
    ));
}

#[tokio::test]
async fn stop_word_spanning_chunks_is_detected() {
    let transport = Arc::new(MockTransport::new());
    let sender = transport.push_stream();
    let (handler, mut events) = RequestHandler::new(transport);

    handler.submit(chat_config(), RequestEnvelope::with_id("req-1"));
    sender.send(Ok(frame("done<|eot", false))).unwrap();
    sender.send(Ok(frame("_id|>tail", false))).unwrap();

    let first = next_event(&mut events).await;
    assert!(matches!(first, HandlerEvent::Completion { is_complete: false, .. }));

    match next_event(&mut events).await {
        HandlerEvent::Completion {
            text, is_complete, ..
        } => {
            assert_eq!(text, "done");
            assert!(is_complete);
        }
        other => panic!("expected completion, got {other:?}"),
    }
}

#[tokio::test]
async fn resubmitting_an_id_cancels_the_first_request() {
    let transport = Arc::new(MockTransport::new());
    let first_sender = transport.push_stream();
    let second_sender = transport.push_stream();
    let (handler, mut events) = RequestHandler::new(transport.clone());

    handler.submit(chat_config(), RequestEnvelope::with_id("req-1"));
    handler.submit(chat_config(), RequestEnvelope::with_id("req-1"));
    assert_eq!(transport.opened().len(), 2);

    // The first stream is dead; anything sent into it is discarded.
    let _ = first_sender.send(Ok(frame("stale", true)));
    second_sender.send(Ok(frame("fresh", true))).unwrap();

    match next_event(&mut events).await {
        HandlerEvent::Completion { text, .. } => assert_eq!(text, "fresh"),
        other => panic!("expected completion, got {other:?}"),
    }
    assert!(matches!(
        next_event(&mut events).await,
        HandlerEvent::Finished { success: true, .. }
    ));
    assert_no_event(&mut events).await;
}

#[tokio::test]
async fn events_buffered_before_resubmit_are_discarded() {
    let transport = Arc::new(MockTransport::new());
    let first_sender = transport.push_stream();
    let second_sender = transport.push_stream();
    let (handler, mut events) = RequestHandler::new(transport);

    handler.submit(chat_config(), RequestEnvelope::with_id("req-1"));
    first_sender.send(Ok(frame("old", false))).unwrap();
    // Give the first task time to push its event into the channel.
    tokio::time::sleep(Duration::from_millis(100)).await;

    handler.submit(chat_config(), RequestEnvelope::with_id("req-1"));
    second_sender.send(Ok(frame("new", true))).unwrap();

    match next_event(&mut events).await {
        HandlerEvent::Completion { text, .. } => assert_eq!(text, "new"),
        other => panic!("expected completion, got {other:?}"),
    }
    assert!(matches!(
        next_event(&mut events).await,
        HandlerEvent::Finished { success: true, .. }
    ));
    assert_no_event(&mut events).await;
}

#[tokio::test]
async fn cancel_discards_already_buffered_events() {
    let transport = Arc::new(MockTransport::new());
    let sender = transport.push_stream();
    let (handler, mut events) = RequestHandler::new(transport);

    handler.submit(chat_config(), RequestEnvelope::with_id("req-1"));
    sender.send(Ok(frame("half an answer", false))).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(handler.cancel("req-1"));
    assert_no_event(&mut events).await;
}

#[tokio::test]
async fn cancel_before_first_chunk_suppresses_everything() {
    let transport = Arc::new(MockTransport::new());
    let sender = transport.push_stream();
    let (handler, mut events) = RequestHandler::new(transport);

    handler.submit(chat_config(), RequestEnvelope::with_id("req-1"));
    assert!(handler.cancel("req-1"));

    let _ = sender.send(Ok(frame("late", true)));
    assert_no_event(&mut events).await;
    assert!(!handler.is_active("req-1"));
}

#[tokio::test]
async fn cancelling_an_unknown_id_is_a_no_op() {
    let transport = Arc::new(MockTransport::new());
    let (handler, mut events) = RequestHandler::new(transport);

    assert!(!handler.cancel("ghost"));
    assert_no_event(&mut events).await;
}

#[tokio::test]
async fn transport_error_emits_failed_terminal_event() {
    let transport = Arc::new(MockTransport::new());
    let sender = transport.push_stream();
    let (handler, mut events) = RequestHandler::new(transport);

    handler.submit(chat_config(), RequestEnvelope::with_id("req-1"));
    sender.send(Err(anyhow::anyhow!("connection reset"))).unwrap();

    match next_event(&mut events).await {
        HandlerEvent::Finished { success, error, .. } => {
            assert!(!success);
            assert!(error.contains("connection reset"));
        }
        other => panic!("expected terminal event, got {other:?}"),
    }
    assert_no_event(&mut events).await;
}

#[tokio::test]
async fn malformed_complete_frame_fails_the_request() {
    let transport = Arc::new(MockTransport::new());
    let sender = transport.push_stream();
    let (handler, mut events) = RequestHandler::new(transport);

    handler.submit(chat_config(), RequestEnvelope::with_id("req-1"));
    sender.send(Ok(Bytes::from_static(b"not json\n"))).unwrap();

    match next_event(&mut events).await {
        HandlerEvent::Finished { success, error, .. } => {
            assert!(!success);
            assert!(error.contains("malformed chunk"));
        }
        other => panic!("expected terminal event, got {other:?}"),
    }
}

#[tokio::test]
async fn natural_stream_end_finishes_successfully() {
    let transport = Arc::new(MockTransport::new());
    let sender = transport.push_stream();
    let (handler, mut events) = RequestHandler::new(transport);

    handler.submit(chat_config(), RequestEnvelope::with_id("req-1"));
    sender.send(Ok(frame("partial answer", false))).unwrap();
    drop(sender);

    assert!(matches!(
        next_event(&mut events).await,
        HandlerEvent::Completion { is_complete: false, .. }
    ));
    assert!(matches!(
        next_event(&mut events).await,
        HandlerEvent::Finished { success: true, .. }
    ));
    // The finished request no longer occupies its id.
    assert!(!handler.is_active("req-1"));
}

#[tokio::test]
async fn degraded_mode_streams_raw_bytes() {
    let transport = Arc::new(MockTransport::new());
    let sender = transport.push_stream();
    let (handler, mut events) = RequestHandler::new(transport);

    let config = RequestConfig {
        provider: None,
        template: None,
        ..chat_config()
    };
    handler.submit(config, RequestEnvelope::with_id("req-1"));
    sender.send(Ok(Bytes::from_static(b"raw output"))).unwrap();
    drop(sender);

    match next_event(&mut events).await {
        HandlerEvent::Completion { text, .. } => assert_eq!(text, "raw output"),
        other => panic!("expected completion, got {other:?}"),
    }
    assert!(matches!(
        next_event(&mut events).await,
        HandlerEvent::Finished { success: true, .. }
    ));
}

#[tokio::test]
async fn degraded_mode_reassembles_split_multibyte_chars() {
    let transport = Arc::new(MockTransport::new());
    let sender = transport.push_stream();
    let (handler, mut events) = RequestHandler::new(transport);

    let config = RequestConfig {
        provider: None,
        template: None,
        ..chat_config()
    };
    handler.submit(config, RequestEnvelope::with_id("req-1"));
    // "é" split across two transport chunks.
    sender.send(Ok(Bytes::from_static(b"caf\xC3"))).unwrap();
    sender.send(Ok(Bytes::from_static(b"\xA9"))).unwrap();
    drop(sender);

    match next_event(&mut events).await {
        HandlerEvent::Completion { text, delta, .. } => {
            assert_eq!(text, "caf");
            assert_eq!(delta, "caf");
        }
        other => panic!("expected completion, got {other:?}"),
    }
    match next_event(&mut events).await {
        HandlerEvent::Completion { text, delta, .. } => {
            assert_eq!(text, "café");
            assert_eq!(delta, "é");
        }
        other => panic!("expected completion, got {other:?}"),
    }
}

#[tokio::test]
async fn single_line_completion_truncates_at_first_line_break() {
    let transport = Arc::new(MockTransport::new());
    let sender = transport.push_stream();
    let (handler, mut events) = RequestHandler::new(transport);

    handler.submit(completion_config(false), RequestEnvelope::with_id("req-1"));
    sender
        .send(Ok(frame("let x = 1;\nlet y = 2;", false)))
        .unwrap();

    match next_event(&mut events).await {
        HandlerEvent::Completion {
            text, is_complete, ..
        } => {
            assert_eq!(text, "let x = 1;");
            assert!(is_complete);
        }
        other => panic!("expected completion, got {other:?}"),
    }
}

#[tokio::test]
async fn multi_line_completion_keeps_line_breaks() {
    let transport = Arc::new(MockTransport::new());
    let sender = transport.push_stream();
    let (handler, mut events) = RequestHandler::new(transport);

    handler.submit(completion_config(true), RequestEnvelope::with_id("req-1"));
    sender
        .send(Ok(frame("let x = 1;\nlet y = 2;", true)))
        .unwrap();

    match next_event(&mut events).await {
        HandlerEvent::Completion { text, .. } => assert_eq!(text, "let x = 1;\nlet y = 2;"),
        other => panic!("expected completion, got {other:?}"),
    }
}

#[tokio::test]
async fn distinct_ids_stream_independently() {
    let transport = Arc::new(MockTransport::new());
    let first_sender = transport.push_stream();
    let second_sender = transport.push_stream();
    let (handler, mut events) = RequestHandler::new(transport);

    handler.submit(chat_config(), RequestEnvelope::with_id("req-a"));
    handler.submit(chat_config(), RequestEnvelope::with_id("req-b"));
    assert!(handler.is_active("req-a"));
    assert!(handler.is_active("req-b"));

    first_sender.send(Ok(frame("from a", true))).unwrap();
    second_sender.send(Ok(frame("from b", true))).unwrap();

    let mut seen = Vec::new();
    for _ in 0..4 {
        seen.push(next_event(&mut events).await);
    }
    let texts: Vec<_> = seen
        .iter()
        .filter_map(|e| match e {
            HandlerEvent::Completion { id, text, .. } => Some((id.clone(), text.clone())),
            _ => None,
        })
        .collect();
    assert!(texts.contains(&("req-a".into(), "from a".into())));
    assert!(texts.contains(&("req-b".into(), "from b".into())));
}

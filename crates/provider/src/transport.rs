//! Transport abstraction the request handler drives.
//!
//! The core does not implement HTTP framing itself: it opens a byte stream
//! against a URL with a JSON body and consumes chunks until the stream ends
//! or is dropped. Dropping the returned stream aborts the underlying call.

use anyhow::Result;
use async_stream::{stream, try_stream};
use bytes::Bytes;
use futures_core::stream::BoxStream;
use futures_util::StreamExt;
use reqwest::{Client, Method, header::HeaderMap};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::mpsc;

/// A duplex byte-stream capability: open a URL with a body, read chunks.
pub trait Transport: Send + Sync {
    /// Open a stream. The call is aborted by dropping the stream.
    fn open(&self, url: &str, headers: HeaderMap, body: Value)
    -> BoxStream<'static, Result<Bytes>>;
}

/// HTTP transport backed by a shared `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a transport with a fresh client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transport reusing an existing client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Transport for HttpTransport {
    fn open(
        &self,
        url: &str,
        headers: HeaderMap,
        body: Value,
    ) -> BoxStream<'static, Result<Bytes>> {
        tracing::trace!(url, "opening stream");
        let request = self
            .client
            .request(Method::POST, url)
            .headers(headers)
            .json(&body);

        try_stream! {
            let response = request.send().await?.error_for_status()?;
            let mut stream = response.bytes_stream();
            while let Some(next) = stream.next().await {
                yield next?;
            }
        }
        .boxed()
    }
}

/// Channel-fed transport for tests: each queued stream is handed out to one
/// `open` call, oldest first.
///
/// Queue a stream with [`MockTransport::push_stream`] and feed it through
/// the returned sender; dropping the sender ends the stream naturally. An
/// `open` call with nothing queued gets a stream that ends immediately.
#[derive(Debug, Default)]
pub struct MockTransport {
    streams: Mutex<VecDeque<mpsc::UnboundedReceiver<Result<Bytes>>>>,
    opened: Mutex<Vec<(String, Value)>>,
}

impl MockTransport {
    /// Create an empty mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one stream; feed it through the returned sender.
    pub fn push_stream(&self) -> mpsc::UnboundedSender<Result<Bytes>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.streams.lock().unwrap().push_back(rx);
        tx
    }

    /// The `(url, body)` pairs of every `open` call so far.
    pub fn opened(&self) -> Vec<(String, Value)> {
        self.opened.lock().unwrap().clone()
    }
}

impl Transport for MockTransport {
    fn open(
        &self,
        url: &str,
        _headers: HeaderMap,
        body: Value,
    ) -> BoxStream<'static, Result<Bytes>> {
        self.opened.lock().unwrap().push((url.to_owned(), body));
        let receiver = self.streams.lock().unwrap().pop_front();
        stream! {
            let Some(mut rx) = receiver else { return };
            while let Some(item) = rx.recv().await {
                yield item;
            }
        }
        .boxed()
    }
}

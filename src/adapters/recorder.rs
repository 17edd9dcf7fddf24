//! Request recording
//!
//! [`RecordingTransport`] decorates any [`Transport`] and pushes a capture of
//! every exchange into a shared [`Recorder`] log. The log is append-only for
//! the lifetime of a run; the driver carves it into per-scenario windows with
//! [`Recorder::drain_since_checkpoint`].

use crate::domain::{HttpRequest, HttpResponse, Transport, TransportError};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// How a recorded exchange ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedOutcome {
    Response { status: StatusCode, body: Bytes },
    Failed(String),
}

impl RecordedOutcome {
    pub fn from_result(result: &Result<HttpResponse, TransportError>) -> Self {
        match result {
            Ok(response) => Self::Response {
                status: response.status,
                body: response.body.clone(),
            },
            Err(e) => Self::Failed(e.to_string()),
        }
    }
}

/// One captured request/response pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedExchange {
    /// Position in issue order, starting at zero
    pub sequence: u64,
    pub request: HttpRequest,
    pub outcome: RecordedOutcome,
}

#[derive(Default)]
struct RecorderState {
    log: Vec<RecordedExchange>,
    checkpoint: usize,
    /// First sequence number reserved after the last drain
    window_start: u64,
}

/// Process-wide log of outbound exchanges.
#[derive(Clone, Default)]
pub struct Recorder {
    next_sequence: Arc<AtomicU64>,
    state: Arc<Mutex<RecorderState>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the ordinal for a request that is about to be issued.
    pub fn begin(&self) -> u64 {
        self.next_sequence.fetch_add(1, Ordering::SeqCst)
    }

    /// Append a finished exchange.
    ///
    /// Entries are kept in sequence order. An exchange that finishes after a
    /// later-issued one is slotted back into position, but never behind the
    /// current checkpoint: it is then handed out by the next drain instead.
    pub async fn record(&self, sequence: u64, request: HttpRequest, outcome: RecordedOutcome) {
        debug!(sequence, method = %request.method, url = %request.url, "recorded exchange");
        let exchange = RecordedExchange {
            sequence,
            request,
            outcome,
        };

        let mut state = self.state.lock().await;
        let checkpoint = state.checkpoint;
        let offset = state.log[checkpoint..].partition_point(|e| e.sequence < sequence);
        state.log.insert(checkpoint + offset, exchange);
    }

    /// Captures made since the previous checkpoint, in issue order. Advances
    /// the checkpoint to the end of the log.
    ///
    /// A request issued before the previous drain that completed after it is
    /// part of this window. Use
    /// [`drain_issued_since_checkpoint`](Self::drain_issued_since_checkpoint)
    /// to leave such stragglers out.
    pub async fn drain_since_checkpoint(&self) -> Vec<RecordedExchange> {
        let mut state = self.state.lock().await;
        self.advance(&mut state)
    }

    /// Captures of requests issued since the previous drain, in issue order.
    /// Advances the checkpoint like `drain_since_checkpoint`. Stragglers from
    /// an earlier window are skipped here but stay in the full log.
    pub async fn drain_issued_since_checkpoint(&self) -> Vec<RecordedExchange> {
        let mut state = self.state.lock().await;
        let window_start = state.window_start;
        let (current, late): (Vec<_>, Vec<_>) = self
            .advance(&mut state)
            .into_iter()
            .partition(|e| e.sequence >= window_start);
        if !late.is_empty() {
            debug!(count = late.len(), "skipping exchanges issued before the checkpoint");
        }
        current
    }

    fn advance(&self, state: &mut RecorderState) -> Vec<RecordedExchange> {
        let window = state.log[state.checkpoint..].to_vec();
        state.checkpoint = state.log.len();
        state.window_start = self.next_sequence.load(Ordering::SeqCst);
        window
    }

    /// Snapshot of the whole log, drained or not.
    pub async fn exchanges(&self) -> Vec<RecordedExchange> {
        self.state.lock().await.log.clone()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.log.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Transport decorator that records every exchange before returning it.
pub struct RecordingTransport<T> {
    inner: T,
    recorder: Recorder,
}

impl<T: Transport> RecordingTransport<T> {
    pub fn new(inner: T, recorder: Recorder) -> Self {
        Self { inner, recorder }
    }
}

#[async_trait]
impl<T: Transport> Transport for RecordingTransport<T> {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let sequence = self.recorder.begin();
        let captured = request.clone();
        let result = self.inner.send(request).await;
        self.recorder
            .record(sequence, captured, RecordedOutcome::from_result(&result))
            .await;
        result
    }
}

//! Single-file upload session.
//!
//! One session owns one transfer end to end: it opens the source,
//! measures the authoritative size, selects a strategy, streams the
//! bytes, and reports throttled progress. Cancellation is cooperative:
//! the token is checked between chunks and raced against every
//! in-flight request.

use std::time::Instant;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use skiff_transfer::{
    ChunkPlan, ProgressEstimator, ProgressSample, Strategy, StrategyConfig,
};

use crate::error::UploadError;
use crate::source::{ByteSource, resolve_target, source_error};
use crate::transport::{BodyStream, UploadTransport};
use crate::types::{Locator, UploadEvent, UploadOutcome, UploadTarget};

/// Read granularity when feeding a streaming single-shot body.
const STREAM_STEP: u64 = 256 * 1024;

/// Lifecycle of one session. Terminal states are never left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Pending,
    Transferring,
    Completed,
    Failed,
    Cancelled,
}

/// One file's transfer to the server.
pub struct UploadSession {
    target: UploadTarget,
    dir: String,
    config: StrategyConfig,
    is_local: bool,
    cancel: CancellationToken,
    state: SessionState,
    bytes_sent: u64,
}

impl UploadSession {
    pub fn new(
        target: UploadTarget,
        dir: impl Into<String>,
        config: StrategyConfig,
        is_local: bool,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            target,
            dir: dir.into(),
            config,
            is_local,
            cancel,
            state: SessionState::Pending,
            bytes_sent: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    /// Runs the transfer to a terminal state.
    pub async fn run(
        &mut self,
        transport: &dyn UploadTransport,
        events: &mpsc::UnboundedSender<UploadEvent>,
    ) -> Result<UploadOutcome, UploadError> {
        self.state = SessionState::Transferring;
        let result = self.run_inner(transport, events).await;
        self.state = match &result {
            Ok(_) => SessionState::Completed,
            Err(UploadError::Cancelled) => SessionState::Cancelled,
            Err(_) => SessionState::Failed,
        };
        result
    }

    async fn run_inner(
        &mut self,
        transport: &dyn UploadTransport,
        events: &mpsc::UnboundedSender<UploadEvent>,
    ) -> Result<UploadOutcome, UploadError> {
        if self.cancel.is_cancelled() {
            return Err(UploadError::Cancelled);
        }

        // Opening (and possibly temp-copying) the source is blocking work.
        let target = self.target.clone();
        let source = tokio::task::spawn_blocking(move || resolve_target(&target)).await??;
        let total = source.total_size();

        let strategy = Strategy::select(total, self.is_local, &self.config);
        debug!(
            name = %self.target.name,
            total,
            is_local = self.is_local,
            ?strategy,
            "starting upload"
        );

        match strategy {
            Strategy::SingleShot => {
                self.run_single_shot(transport, events, source, total).await
            }
            Strategy::Chunked => self.run_chunked(transport, events, source, total).await,
        }
    }

    /// Streams the whole file as one multipart request, counting bytes
    /// as they are handed to the request body.
    async fn run_single_shot(
        &mut self,
        transport: &dyn UploadTransport,
        events: &mpsc::UnboundedSender<UploadEvent>,
        source: Box<dyn ByteSource>,
        total: u64,
    ) -> Result<UploadOutcome, UploadError> {
        let name = self.target.name.clone();
        let mime = self.target.mime.clone();
        let dir = self.dir.clone();
        let cancel = self.cancel.clone();
        let started = Instant::now();
        let mut estimator = ProgressEstimator::new();

        let (body, mut counts) = counting_body(source, total);
        let mut fut = transport.upload_multipart(&dir, &name, &mime, body, total);

        let reply = loop {
            tokio::select! {
                _ = cancel.cancelled() => return Err(UploadError::Cancelled),
                Some(sent) = counts.recv() => {
                    self.bytes_sent = sent;
                    emit_progress(events, &name, &mut estimator, sent, total, started);
                }
                reply = &mut fut => break reply?,
            }
        };

        if !reply.is_success() {
            return Err(UploadError::Upload {
                status: reply.status,
                body: reply.body_text(),
            });
        }

        // Terminal update only once the server accepted the upload; a
        // rejected request leaves the counter where the stream got to.
        self.bytes_sent = total;
        emit_progress(events, &name, &mut estimator, total, total, started);
        Ok(reply.into_outcome())
    }

    /// Sends the file as ordered byte-range chunks, then finalizes.
    async fn run_chunked(
        &mut self,
        transport: &dyn UploadTransport,
        events: &mpsc::UnboundedSender<UploadEvent>,
        mut source: Box<dyn ByteSource>,
        total: u64,
    ) -> Result<UploadOutcome, UploadError> {
        let name = self.target.name.clone();
        let dir = self.dir.clone();
        let cancel = self.cancel.clone();
        let started = Instant::now();
        let mut estimator = ProgressEstimator::new();

        // Best-effort announcement; servers that don't track it answer
        // with an error we can ignore.
        let start = tokio::select! {
            _ = cancel.cancelled() => return Err(UploadError::Cancelled),
            r = transport.chunk_start(&name) => r,
        };
        match start {
            Ok(reply) if !reply.is_success() => {
                warn!(name = %name, status = reply.status, "chunk start refused, continuing");
            }
            Err(err) => warn!(name = %name, error = %err, "chunk start failed, continuing"),
            Ok(_) => {}
        }

        let plan = ChunkPlan::new(total, self.config.chunk_size);
        for spec in plan.iter() {
            if cancel.is_cancelled() {
                return Err(UploadError::Cancelled);
            }

            // The blocking read hands the source back so the next
            // iteration can reuse it.
            let (returned, read) = tokio::task::spawn_blocking({
                let mut s = source;
                move || {
                    let read = s.read_range(spec.start, spec.end);
                    (s, read)
                }
            })
            .await?;
            source = returned;
            let data = read.map_err(|err| self.source_failure(&err))?;

            let reply = tokio::select! {
                _ = cancel.cancelled() => return Err(UploadError::Cancelled),
                r = transport.upload_chunk(&name, spec, total, data) => r?,
            };
            if !reply.is_success() {
                return Err(UploadError::ChunkUpload {
                    index: spec.index,
                    status: reply.status,
                });
            }

            self.bytes_sent += spec.len();
            emit_progress(events, &name, &mut estimator, self.bytes_sent, total, started);
        }

        if cancel.is_cancelled() {
            return Err(UploadError::Cancelled);
        }
        let reply = tokio::select! {
            _ = cancel.cancelled() => return Err(UploadError::Cancelled),
            r = transport.chunk_complete(&name, &dir) => r?,
        };
        if !reply.is_success() {
            return Err(UploadError::Finalize {
                status: reply.status,
            });
        }
        Ok(reply.into_outcome())
    }

    /// Maps a mid-transfer read failure, keeping the remediation hint
    /// when the target has a filesystem path to diagnose.
    fn source_failure(&self, err: &std::io::Error) -> UploadError {
        match &self.target.locator {
            Locator::Path(path) | Locator::TempCopy(path) => source_error(path, err),
            Locator::Memory(_) => UploadError::SourceAccess {
                message: format!("{}: {err}", self.target.name),
                hint: None,
            },
        }
    }
}

fn emit_progress(
    events: &mpsc::UnboundedSender<UploadEvent>,
    name: &str,
    estimator: &mut ProgressEstimator,
    bytes_sent: u64,
    total: u64,
    started: Instant,
) {
    let sample = ProgressSample {
        bytes_sent,
        total_bytes: total,
        timestamp_ms: started.elapsed().as_millis() as u64,
    };
    if let Some(update) = estimator.offer(sample) {
        let _ = events.send(UploadEvent::Progress {
            name: name.to_string(),
            update,
        });
    }
}

/// Builds a streaming body fed from blocking range reads, plus a channel
/// reporting the running byte count as slabs are handed over.
///
/// The feeder stops as soon as the body receiver is dropped, which is
/// how an aborted request unwinds the blocking task.
fn counting_body(
    mut source: Box<dyn ByteSource>,
    total: u64,
) -> (BodyStream, mpsc::UnboundedReceiver<u64>) {
    let (data_tx, data_rx) = mpsc::channel::<Result<Vec<u8>, std::io::Error>>(4);
    let (count_tx, count_rx) = mpsc::unbounded_channel();

    tokio::task::spawn_blocking(move || {
        let mut offset = 0u64;
        while offset < total {
            let end = (offset + STREAM_STEP).min(total);
            match source.read_range(offset, end) {
                Ok(buf) => {
                    offset = end;
                    if data_tx.blocking_send(Ok(buf)).is_err() {
                        break;
                    }
                    let _ = count_tx.send(offset);
                }
                Err(err) => {
                    let _ = data_tx.blocking_send(Err(err));
                    break;
                }
            }
        }
    });

    let stream = tokio_stream::wrappers::ReceiverStream::new(data_rx);
    (Box::pin(stream), count_rx)
}

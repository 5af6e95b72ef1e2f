//! Sequential batch orchestration.
//!
//! One batch uploads its files strictly one at a time, in order. The
//! first failure stops the batch; files after it are skipped. Whatever
//! happens, the destination listing is refreshed exactly once at the
//! end, so partial batches still show the files that did land.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use skiff_transfer::StrategyConfig;

use crate::error::UploadError;
use crate::session::UploadSession;
use crate::transport::UploadTransport;
use crate::types::{UploadEvent, UploadOutcome, UploadTarget};

/// Breather between files so the UI can settle on the completed state
/// before the next file's progress starts.
const INTER_FILE_PAUSE: Duration = Duration::from_millis(100);

/// Per-file result within a batch, in submission order.
#[derive(Debug)]
pub enum FileOutcome {
    Completed(UploadOutcome),
    Failed(UploadError),
    Cancelled,
    /// Never attempted because an earlier file failed or was cancelled.
    Skipped,
}

/// Summary of one finished batch.
#[derive(Debug)]
pub struct BatchResult {
    /// One entry per submitted target, in order.
    pub outcomes: Vec<FileOutcome>,
    pub completed: usize,
    pub errored: bool,
}

/// Drives multi-file upload batches.
pub struct UploadQueue {
    events_tx: mpsc::UnboundedSender<UploadEvent>,
    events_rx: Option<mpsc::UnboundedReceiver<UploadEvent>>,
    cancel: CancellationToken,
    config: StrategyConfig,
    is_local: bool,
}

impl UploadQueue {
    pub fn new(config: StrategyConfig, is_local: bool) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            events_tx,
            events_rx: Some(events_rx),
            cancel: CancellationToken::new(),
            config,
            is_local,
        }
    }

    /// Takes the event receiver. Can only be taken once; events sent
    /// with no receiver are dropped, never blocking the uploader.
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<UploadEvent>> {
        self.events_rx.take()
    }

    /// Requests cancellation of the running file and the rest of the
    /// batch.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Uploads `targets` into `dir`, one at a time.
    pub async fn run(
        &self,
        targets: Vec<UploadTarget>,
        dir: &str,
        transport: &dyn UploadTransport,
    ) -> BatchResult {
        let total = targets.len();
        let mut outcomes = Vec::with_capacity(total);
        let mut completed = 0usize;
        let mut errored = false;

        let mut iter = targets.into_iter().enumerate();
        for (index, target) in &mut iter {
            let name = target.name.clone();
            self.send(UploadEvent::FileStarted {
                index,
                total,
                name: name.clone(),
            });

            let mut session = UploadSession::new(
                target,
                dir,
                self.config,
                self.is_local,
                self.cancel.child_token(),
            );
            match session.run(transport, &self.events_tx).await {
                Ok(outcome) => {
                    completed += 1;
                    info!(name = %name, status = outcome.status, "file uploaded");
                    outcomes.push(FileOutcome::Completed(outcome));
                    self.send(UploadEvent::FileCompleted { index, name });
                    if index + 1 < total {
                        tokio::time::sleep(INTER_FILE_PAUSE).await;
                    }
                }
                Err(UploadError::Cancelled) => {
                    info!(name = %name, "upload cancelled");
                    outcomes.push(FileOutcome::Cancelled);
                    self.send(UploadEvent::Cancelled { index, name });
                    break;
                }
                Err(err) => {
                    errored = true;
                    error!(name = %name, error = %err, "file upload failed");
                    self.send(UploadEvent::FileFailed {
                        index,
                        name,
                        error: err.to_string(),
                    });
                    outcomes.push(FileOutcome::Failed(err));
                    break;
                }
            }
        }
        for _ in &mut iter {
            outcomes.push(FileOutcome::Skipped);
        }

        // Exactly one refresh per batch, even after failure or
        // cancellation: files that did land should show up.
        if let Err(err) = transport.refresh_dir(dir).await {
            warn!(error = %err, "listing refresh after batch failed");
        }

        self.send(UploadEvent::BatchFinished {
            completed,
            total,
            errored,
        });
        BatchResult {
            outcomes,
            completed,
            errored,
        }
    }

    fn send(&self, event: UploadEvent) {
        let _ = self.events_tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, MockTransport};

    fn tiny_config() -> StrategyConfig {
        StrategyConfig {
            single_shot_limit: 90,
            chunk_size: 10,
        }
    }

    fn target(name: &str, size: usize) -> UploadTarget {
        UploadTarget::from_memory(vec![0u8; size], name, "application/octet-stream")
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<UploadEvent>) -> Vec<UploadEvent> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            out.push(event);
        }
        out
    }

    #[tokio::test]
    async fn batch_uploads_in_order_and_refreshes_once() {
        let transport = MockTransport::default();
        let mut queue = UploadQueue::new(tiny_config(), false);
        let mut rx = queue.take_events().unwrap();

        let result = queue
            .run(
                vec![target("a.bin", 16), target("b.bin", 16)],
                "/srv/in",
                &transport,
            )
            .await;

        assert_eq!(result.completed, 2);
        assert!(!result.errored);
        assert!(matches!(
            &result.outcomes[..],
            [FileOutcome::Completed(_), FileOutcome::Completed(_)]
        ));
        assert_eq!(transport.refresh_count(), 1);

        let names: Vec<_> = transport
            .calls()
            .iter()
            .filter_map(|c| match c {
                Call::Multipart { name, .. } => Some(name.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(names, ["a.bin", "b.bin"]);

        let events = drain(&mut rx);
        assert!(matches!(
            events.last(),
            Some(UploadEvent::BatchFinished {
                completed: 2,
                total: 2,
                errored: false,
            })
        ));
    }

    #[tokio::test]
    async fn first_failure_stops_batch_and_skips_rest() {
        let transport = MockTransport {
            fail_multipart_for: Some(("b.bin".into(), 500)),
            ..MockTransport::default()
        };
        let mut queue = UploadQueue::new(tiny_config(), false);
        let mut rx = queue.take_events().unwrap();

        let result = queue
            .run(
                vec![target("a.bin", 16), target("b.bin", 16), target("c.bin", 16)],
                "/srv/in",
                &transport,
            )
            .await;

        assert_eq!(result.completed, 1);
        assert!(result.errored);
        assert!(matches!(
            &result.outcomes[..],
            [
                FileOutcome::Completed(_),
                FileOutcome::Failed(UploadError::Upload { status: 500, .. }),
                FileOutcome::Skipped,
            ]
        ));
        // c.bin was never attempted.
        assert!(!transport.calls().iter().any(
            |c| matches!(c, Call::Multipart { name, .. } if name == "c.bin")
        ));
        // The refresh still happens so a.bin shows up in listings.
        assert_eq!(transport.refresh_count(), 1);

        let events = drain(&mut rx);
        assert!(events.iter().any(|e| matches!(
            e,
            UploadEvent::FileFailed { index: 1, .. }
        )));
        assert!(matches!(
            events.last(),
            Some(UploadEvent::BatchFinished {
                completed: 1,
                total: 3,
                errored: true,
            })
        ));
    }

    #[tokio::test]
    async fn cancelled_batch_skips_remaining_but_refreshes() {
        let transport = MockTransport::default();
        let queue = UploadQueue::new(tiny_config(), false);
        queue.cancel();

        let result = queue
            .run(
                vec![target("a.bin", 16), target("b.bin", 16)],
                "/srv/in",
                &transport,
            )
            .await;

        assert_eq!(result.completed, 0);
        assert!(!result.errored);
        assert!(matches!(
            &result.outcomes[..],
            [FileOutcome::Cancelled, FileOutcome::Skipped]
        ));
        assert!(transport.calls().is_empty());
        assert_eq!(transport.refresh_count(), 1);
    }

    #[tokio::test]
    async fn empty_batch_still_refreshes_once() {
        let transport = MockTransport::default();
        let queue = UploadQueue::new(tiny_config(), false);

        let result = queue.run(Vec::new(), "/srv/in", &transport).await;
        assert_eq!(result.completed, 0);
        assert!(result.outcomes.is_empty());
        assert_eq!(transport.refresh_count(), 1);
    }

    #[tokio::test]
    async fn events_can_only_be_taken_once() {
        let mut queue = UploadQueue::new(tiny_config(), false);
        assert!(queue.take_events().is_some());
        assert!(queue.take_events().is_none());
    }

    #[tokio::test]
    async fn mixed_strategies_within_one_batch() {
        let transport = MockTransport::default();
        let queue = UploadQueue::new(tiny_config(), false);

        // 16 bytes rides single-shot, 95 bytes goes chunked.
        let result = queue
            .run(
                vec![target("small.bin", 16), target("large.bin", 95)],
                "/srv/in",
                &transport,
            )
            .await;
        assert_eq!(result.completed, 2);

        let calls = transport.calls();
        assert!(calls.iter().any(|c| matches!(
            c,
            Call::Multipart { name, .. } if name == "small.bin"
        )));
        assert!(calls.iter().any(|c| matches!(
            c,
            Call::Complete { name, .. } if name == "large.bin"
        )));
    }
}

//! Recording transport mock shared by session and queue tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::StreamExt;
use skiff_transfer::ChunkSpec;
use tokio_util::sync::CancellationToken;

use crate::transport::{BodyStream, HttpReply, TransportFuture, UploadTransport};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Multipart {
        dir: String,
        name: String,
        body_len: u64,
        total: u64,
    },
    ChunkStart {
        name: String,
    },
    Chunk {
        name: String,
        index: usize,
        start: u64,
        end: u64,
        len: usize,
    },
    Complete {
        name: String,
        dir: String,
    },
}

/// Transport that records every call and answers with configurable
/// statuses.
#[derive(Default)]
pub struct MockTransport {
    pub calls: Mutex<Vec<Call>>,
    /// Chunk index that answers 500 instead of 200.
    pub fail_chunk_index: Option<usize>,
    /// Non-2xx status for every multipart upload.
    pub fail_multipart_status: Option<u16>,
    /// Answer the multipart request without reading its body, the way a
    /// server rejecting mid-stream does.
    pub drop_multipart_body: bool,
    /// Non-2xx multipart status for one file name only.
    pub fail_multipart_for: Option<(String, u16)>,
    /// Non-2xx status for the finalize call.
    pub fail_complete_status: Option<u16>,
    /// Answer 500 to chunk-start announcements.
    pub fail_start: bool,
    /// Trips the token right after the given chunk index is recorded.
    pub cancel_on_chunk: Mutex<Option<(usize, CancellationToken)>>,
    pub refreshes: AtomicUsize,
}

impl MockTransport {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn refresh_count(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn reply(status: u16) -> HttpReply {
        HttpReply {
            status,
            content_type: Some("application/json".into()),
            body: br#"{"ok":true}"#.to_vec(),
        }
    }
}

impl UploadTransport for MockTransport {
    fn upload_multipart<'a>(
        &'a self,
        dir: &'a str,
        file_name: &'a str,
        mime: &'a str,
        mut body: BodyStream,
        total: u64,
    ) -> TransportFuture<'a, HttpReply> {
        let _ = mime;
        Box::pin(async move {
            let mut body_len = 0u64;
            if self.drop_multipart_body {
                drop(body);
            } else {
                while let Some(slab) = body.next().await {
                    body_len += slab?.len() as u64;
                }
            }
            self.record(Call::Multipart {
                dir: dir.to_string(),
                name: file_name.to_string(),
                body_len,
                total,
            });
            let status = self
                .fail_multipart_for
                .as_ref()
                .filter(|(n, _)| n.as_str() == file_name)
                .map(|(_, s)| *s)
                .or(self.fail_multipart_status)
                .unwrap_or(200);
            Ok(Self::reply(status))
        })
    }

    fn chunk_start<'a>(
        &'a self,
        file_name: &'a str,
    ) -> TransportFuture<'a, HttpReply> {
        Box::pin(async move {
            self.record(Call::ChunkStart {
                name: file_name.to_string(),
            });
            Ok(Self::reply(if self.fail_start { 500 } else { 200 }))
        })
    }

    fn upload_chunk<'a>(
        &'a self,
        file_name: &'a str,
        spec: ChunkSpec,
        _total: u64,
        data: Vec<u8>,
    ) -> TransportFuture<'a, HttpReply> {
        Box::pin(async move {
            self.record(Call::Chunk {
                name: file_name.to_string(),
                index: spec.index,
                start: spec.start,
                end: spec.end,
                len: data.len(),
            });
            if let Some((index, token)) = &*self.cancel_on_chunk.lock().unwrap() {
                if *index == spec.index {
                    token.cancel();
                }
            }
            let status = if self.fail_chunk_index == Some(spec.index) {
                500
            } else {
                200
            };
            Ok(Self::reply(status))
        })
    }

    fn chunk_complete<'a>(
        &'a self,
        file_name: &'a str,
        dir: &'a str,
    ) -> TransportFuture<'a, HttpReply> {
        Box::pin(async move {
            self.record(Call::Complete {
                name: file_name.to_string(),
                dir: dir.to_string(),
            });
            Ok(Self::reply(self.fail_complete_status.unwrap_or(200)))
        })
    }

    fn refresh_dir<'a>(
        &'a self,
        _dir: &'a str,
    ) -> TransportFuture<'a, ()> {
        Box::pin(async move {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }
}

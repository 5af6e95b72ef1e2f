//! Upload targets, outcomes, and the event stream.

use std::path::PathBuf;

use skiff_transfer::ProgressUpdate;

/// Where the bytes of an upload come from.
#[derive(Debug, Clone)]
pub enum Locator {
    /// A readable path on the local filesystem.
    Path(PathBuf),
    /// A path whose handle cannot be held for the whole transfer
    /// (content-provider grants that expire, files the user may move);
    /// the bytes are read from a scoped temp copy instead.
    TempCopy(PathBuf),
    /// An in-memory buffer (shared text, generated content).
    Memory(Vec<u8>),
}

/// One file queued for upload.
#[derive(Debug, Clone)]
pub struct UploadTarget {
    pub locator: Locator,
    /// File name to create server-side.
    pub name: String,
    /// MIME type sent with the upload; `application/octet-stream` when
    /// the picker did not report one.
    pub mime: String,
    /// Size as reported by the picker, when known. The authoritative
    /// size is measured from the opened source.
    pub size: Option<u64>,
}

impl UploadTarget {
    pub fn from_path(path: impl Into<PathBuf>, name: impl Into<String>, mime: Option<String>) -> Self {
        Self {
            locator: Locator::Path(path.into()),
            name: name.into(),
            mime: mime.unwrap_or_else(|| "application/octet-stream".into()),
            size: None,
        }
    }

    /// Like [`from_path`](Self::from_path), but the upload reads from a
    /// temp copy made up front, so the original can disappear mid-batch.
    pub fn from_path_via_temp_copy(
        path: impl Into<PathBuf>,
        name: impl Into<String>,
        mime: Option<String>,
    ) -> Self {
        Self {
            locator: Locator::TempCopy(path.into()),
            name: name.into(),
            mime: mime.unwrap_or_else(|| "application/octet-stream".into()),
            size: None,
        }
    }

    pub fn from_memory(data: Vec<u8>, name: impl Into<String>, mime: impl Into<String>) -> Self {
        let size = data.len() as u64;
        Self {
            locator: Locator::Memory(data),
            name: name.into(),
            mime: mime.into(),
            size: Some(size),
        }
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }
}

/// Parsed body of a successful upload reply.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyBody {
    Json(serde_json::Value),
    Text(String),
    Empty,
}

/// Result of one completed upload.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadOutcome {
    pub status: u16,
    pub body: ReplyBody,
}

/// Events emitted while a session or batch runs.
///
/// Consumed through [`crate::UploadQueue::take_events`]; dropping the
/// receiver never blocks the uploader.
#[derive(Debug, Clone)]
pub enum UploadEvent {
    /// A file's transfer began. `index` is zero-based within the batch.
    FileStarted {
        index: usize,
        total: usize,
        name: String,
    },
    /// Throttled progress for the file currently transferring.
    Progress {
        name: String,
        update: ProgressUpdate,
    },
    FileCompleted { index: usize, name: String },
    FileFailed {
        index: usize,
        name: String,
        error: String,
    },
    /// The running file was cancelled; the rest of the batch is skipped.
    Cancelled { index: usize, name: String },
    /// The batch is over, successfully or not. Emitted exactly once.
    BatchFinished {
        completed: usize,
        total: usize,
        errored: bool,
    },
}

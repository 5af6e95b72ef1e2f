//! Adaptive file upload to the file server.
//!
//! One [`UploadSession`] moves one file: the strategy selector picks
//! single-shot multipart (small files, or any size on a local network)
//! or chunked sequential transfer (large files through a tunnelled
//! path), progress flows out as throttled [`UploadEvent`]s, and a
//! cancellation token aborts in-flight work cooperatively. The
//! [`UploadQueue`] drives multi-file batches strictly one file at a
//! time, stopping on the first failure.
//!
//! All HTTP goes through the [`UploadTransport`] seam so the logic is
//! testable with mocks; [`HttpTransport`] is the reqwest implementation.

pub mod error;
pub mod queue;
pub mod session;
pub mod source;
pub mod transport;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use error::UploadError;
pub use queue::{BatchResult, FileOutcome, UploadQueue};
pub use session::{SessionState, UploadSession};
pub use source::{ByteSource, FileSource, MemorySource};
pub use transport::{BodyStream, HttpReply, HttpTransport, TransportFuture, UploadTransport};
pub use types::{Locator, ReplyBody, UploadEvent, UploadOutcome, UploadTarget};

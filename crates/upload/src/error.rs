//! Upload error taxonomy.

/// Errors produced while transferring files to the server.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// No usable server configuration; nothing was sent.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The local source could not be read.
    #[error("cannot read source: {message}")]
    SourceAccess {
        message: String,
        /// Platform remediation hint, when one is detectable.
        hint: Option<String>,
    },

    /// One chunk exchange failed; the upload stopped at that index and
    /// nothing was finalized.
    #[error("chunk {index} upload failed (status {status})")]
    ChunkUpload { index: usize, status: u16 },

    /// The single-shot request came back non-2xx.
    #[error("upload failed (status {status}): {body}")]
    Upload { status: u16, body: String },

    /// Every chunk landed but server-side assembly failed; the file is
    /// incomplete server-side.
    #[error("finalize failed (status {status})")]
    Finalize { status: u16 },

    /// User-initiated abort. Not a fault; no error alert should follow.
    #[error("cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {0}")]
    Api(#[from] skiff_api::ApiError),

    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

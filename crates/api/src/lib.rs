//! File-server management API client.
//!
//! Thin async client for the server's listing and file-management
//! routes, plus the [`ServerConfig`] that every subsystem gets injected
//! with (there is deliberately no process-wide config singleton). The
//! upload routes live in `skiff-upload`; this crate covers everything a
//! file browser needs around them.

pub mod client;
pub mod config;
pub mod endpoints;
pub mod types;

pub use client::ApiClient;
pub use config::ServerConfig;
pub use types::{FileEntry, RootPathReply, StorageReply, sort_entries};

/// Errors from the management API client.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

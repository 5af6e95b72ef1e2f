//! API data types.

use serde::{Deserialize, Serialize};

/// One entry in a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub name: String,
    /// Display path relative to the server root.
    pub path: String,
    /// Absolute server-side path, used for delete/download calls.
    #[serde(default)]
    pub raw_path: String,
    #[serde(default)]
    pub is_dir: bool,
    #[serde(default)]
    pub size: u64,
}

/// Sorts a listing in place: directories first, then case-insensitive
/// name order.
pub fn sort_entries(entries: &mut [FileEntry]) {
    entries.sort_by(|a, b| {
        b.is_dir
            .cmp(&a.is_dir)
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });
}

/// Reply from the root-path endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct RootPathReply {
    pub root_path: String,
}

/// Mount usage snapshot from the storage endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StorageReply {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub used: u64,
    #[serde(default)]
    pub free: u64,
}

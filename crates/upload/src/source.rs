//! Byte sources for uploads.
//!
//! A [`ByteSource`] abstracts random-access reads over the file being
//! uploaded, so the chunked path can re-read exact ranges without
//! holding the whole file in memory. All reads are blocking and are
//! driven from `spawn_blocking` by the session.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use crate::error::UploadError;
use crate::types::{Locator, UploadTarget};

/// Random-access reader over the bytes of one upload.
pub trait ByteSource: Send {
    /// Authoritative total size in bytes.
    fn total_size(&self) -> u64;

    /// Reads the half-open range `[start, end)`.
    ///
    /// Short reads are an error: the caller sized the range from
    /// [`total_size`](Self::total_size).
    fn read_range(&mut self, start: u64, end: u64) -> io::Result<Vec<u8>>;
}

/// A source backed by an open file handle.
///
/// When the handle came from a temp copy, the copy's path rides along
/// and is removed on drop.
#[derive(Debug)]
pub struct FileSource {
    file: File,
    size: u64,
    _temp: Option<tempfile::TempPath>,
}

impl FileSource {
    /// Opens a readable path directly.
    pub fn open(path: &Path) -> Result<Self, UploadError> {
        let file = File::open(path).map_err(|e| source_error(path, &e))?;
        let size = file.metadata().map_err(|e| source_error(path, &e))?.len();
        Ok(Self {
            file,
            size,
            _temp: None,
        })
    }

    /// Copies the path into a temp file and reads from the copy.
    ///
    /// Used when the original handle cannot be held for the duration of
    /// the transfer (content-provider grants that expire, files the user
    /// may move mid-upload). The copy is deleted when the source drops.
    pub fn open_via_temp_copy(path: &Path) -> Result<Self, UploadError> {
        let mut original = File::open(path).map_err(|e| source_error(path, &e))?;
        let mut temp = tempfile::NamedTempFile::new()?;
        let size = io::copy(&mut original, temp.as_file_mut())?;
        let temp_path = temp.into_temp_path();
        let file = File::open(&temp_path)?;
        Ok(Self {
            file,
            size,
            _temp: Some(temp_path),
        })
    }
}

impl ByteSource for FileSource {
    fn total_size(&self) -> u64 {
        self.size
    }

    fn read_range(&mut self, start: u64, end: u64) -> io::Result<Vec<u8>> {
        let len = end.saturating_sub(start) as usize;
        let mut buf = vec![0u8; len];
        self.file.seek(SeekFrom::Start(start))?;
        self.file.read_exact(&mut buf)?;
        Ok(buf)
    }
}

/// A source over an in-memory buffer.
pub struct MemorySource {
    data: Vec<u8>,
}

impl MemorySource {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }
}

impl ByteSource for MemorySource {
    fn total_size(&self) -> u64 {
        self.data.len() as u64
    }

    fn read_range(&mut self, start: u64, end: u64) -> io::Result<Vec<u8>> {
        let start = start as usize;
        let end = end as usize;
        if end > self.data.len() || start > end {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "range past end of buffer",
            ));
        }
        Ok(self.data[start..end].to_vec())
    }
}

/// Opens the source for a target. Blocking; call from `spawn_blocking`.
pub fn resolve_target(target: &UploadTarget) -> Result<Box<dyn ByteSource>, UploadError> {
    match &target.locator {
        Locator::Path(path) => Ok(Box::new(FileSource::open(path)?)),
        Locator::TempCopy(path) => Ok(Box::new(FileSource::open_via_temp_copy(path)?)),
        Locator::Memory(data) => Ok(Box::new(MemorySource::new(data.clone()))),
    }
}

/// Maps an open/read failure into a [`UploadError::SourceAccess`] with a
/// remediation hint where the error kind suggests one.
pub fn source_error(path: &Path, err: &io::Error) -> UploadError {
    let hint = match err.kind() {
        io::ErrorKind::NotFound => Some(
            "the file may have been moved, trashed, or is still pending download".to_string(),
        ),
        io::ErrorKind::PermissionDenied => {
            Some("access to the file was revoked; pick it again".to_string())
        }
        _ => None,
    };
    UploadError::SourceAccess {
        message: format!("{}: {err}", path.display()),
        hint,
    }
}

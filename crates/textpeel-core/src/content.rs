//! Body storage for a [`Data`](crate::Data) node.
//!
//! Content is an explicit enum: small derived bodies stay in memory, larger
//! streamed bodies spill to an owned temporary file, and root inputs reference
//! the caller's file without owning it. `release` drops the backing resource
//! deterministically; it is also what `Drop` does, so a released or dropped
//! node never leaks a temp file.

use std::borrow::Cow;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

/// Spill-to-disk threshold for streamed content.
pub const DEFAULT_SPILL_THRESHOLD: usize = 64 * 1024;

#[derive(Debug)]
pub enum Content {
    /// No content (released, or never set)
    Empty,
    /// Derived or small content held in memory
    InMemory(Vec<u8>),
    /// Caller-owned file on disk; released without deleting
    File { path: PathBuf, size: u64 },
    /// Streamed content spilled to an owned temp file, deleted on release
    Spilled { file: NamedTempFile, size: u64 },
}

impl Content {
    #[must_use]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self::InMemory(bytes)
    }

    /// Reference an existing file without taking ownership of it.
    pub fn from_path(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let size = std::fs::metadata(&path)?.len();
        Ok(Self::File { path, size })
    }

    /// Capture a reader's full content, spilling to a temp file once it
    /// exceeds `threshold` bytes.
    pub fn from_reader<R: Read>(mut reader: R, threshold: usize) -> io::Result<Self> {
        let mut head = Vec::new();
        (&mut reader)
            .take(threshold as u64 + 1)
            .read_to_end(&mut head)?;
        if head.len() <= threshold {
            return Ok(Self::InMemory(head));
        }
        let mut file = NamedTempFile::new()?;
        file.write_all(&head)?;
        let rest = io::copy(&mut reader, file.as_file_mut())?;
        file.as_file_mut().sync_data().ok();
        let size = head.len() as u64 + rest;
        Ok(Self::Spilled { file, size })
    }

    #[must_use]
    pub fn size(&self) -> u64 {
        match self {
            Self::Empty => 0,
            Self::InMemory(bytes) => bytes.len() as u64,
            Self::File { size, .. } | Self::Spilled { size, .. } => *size,
        }
    }

    /// The local filesystem path backing this content, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::File { path, .. } => Some(path),
            Self::Spilled { file, .. } => Some(file.path()),
            _ => None,
        }
    }

    /// Full byte content. Borrowed for in-memory content, read from disk
    /// otherwise.
    pub fn body(&self) -> io::Result<Cow<'_, [u8]>> {
        match self {
            Self::Empty => Ok(Cow::Borrowed(&[])),
            Self::InMemory(bytes) => Ok(Cow::Borrowed(bytes)),
            Self::File { path, .. } => Ok(Cow::Owned(std::fs::read(path)?)),
            Self::Spilled { file, .. } => Ok(Cow::Owned(std::fs::read(file.path())?)),
        }
    }

    /// First `n` bytes without consuming anything.
    pub fn peek(&self, n: usize) -> io::Result<Vec<u8>> {
        match self {
            Self::Empty => Ok(Vec::new()),
            Self::InMemory(bytes) => Ok(bytes[..bytes.len().min(n)].to_vec()),
            Self::File { .. } | Self::Spilled { .. } => {
                let mut buffer = Vec::with_capacity(n);
                self.open()?.take(n as u64).read_to_end(&mut buffer)?;
                Ok(buffer)
            }
        }
    }

    /// A scoped reader over the content.
    pub fn open(&self) -> io::Result<Box<dyn Read + Send + '_>> {
        match self {
            Self::Empty => Ok(Box::new(io::empty())),
            Self::InMemory(bytes) => Ok(Box::new(io::Cursor::new(&bytes[..]))),
            Self::File { path, .. } => Ok(Box::new(File::open(path)?)),
            Self::Spilled { file, .. } => Ok(Box::new(File::open(file.path())?)),
        }
    }

    /// Drop the backing resource. Caller-owned files are detached, not
    /// deleted. Idempotent.
    pub fn release(&mut self) {
        *self = Self::Empty;
    }

    #[must_use]
    pub fn is_released(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

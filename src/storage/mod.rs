//! File I/O capabilities consumed by the log and table layers.
//!
//! The core never talks to the filesystem directly; it consumes three
//! narrow capabilities and this module supplies the standard
//! implementations:
//!
//! - [`WritableFile`] — append bytes, flush the write buffer, sync to disk.
//!   Implemented by [`FileWriter`] (a buffered [`std::fs::File`]).
//! - [`SequentialFile`] — read the next `n` bytes. Implemented by
//!   [`FileSequentialReader`].
//! - [`RandomReader`] — read `n` bytes at an absolute offset. Implemented
//!   by [`MmapReader`], which memory-maps the file once and serves reads
//!   from the mapping.
//!
//! A caller who needs different I/O (direct I/O, an in-memory environment,
//! async adapters) implements the same traits; nothing above this module
//! cares.

#[cfg(test)]
mod tests;

use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use memmap2::Mmap;
use thiserror::Error;
use tracing::debug;

// ------------------------------------------------------------------------------------------------
// Error type
// ------------------------------------------------------------------------------------------------

/// Errors surfaced by the file capabilities.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Underlying I/O failure, propagated verbatim.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A random read was requested past the end of the file.
    #[error("read of {requested} bytes at offset {offset} past end of file ({file_len} bytes)")]
    OutOfBounds {
        /// Requested start offset.
        offset: u64,
        /// Requested byte count.
        requested: usize,
        /// Actual file length.
        file_len: u64,
    },
}

// ------------------------------------------------------------------------------------------------
// Capabilities
// ------------------------------------------------------------------------------------------------

/// Append-only writable file.
pub trait WritableFile {
    /// Appends `data` to the write buffer.
    fn append(&mut self, data: &[u8]) -> Result<(), StorageError>;

    /// Pushes buffered bytes to the operating system.
    fn flush(&mut self) -> Result<(), StorageError>;

    /// Flushes and then forces the bytes to stable storage.
    fn sync(&mut self) -> Result<(), StorageError>;
}

/// Forward-only reader.
pub trait SequentialFile {
    /// Reads up to `n` bytes. Returns fewer (possibly zero) at end of file.
    fn read(&mut self, n: usize) -> Result<Vec<u8>, StorageError>;
}

/// Positioned reader over an immutable file.
pub trait RandomReader {
    /// Reads exactly `n` bytes starting at `offset`.
    fn read_at(&self, offset: u64, n: usize) -> Result<Vec<u8>, StorageError>;

    /// Total file length in bytes.
    fn len(&self) -> u64;

    /// Whether the file is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ------------------------------------------------------------------------------------------------
// FileWriter
// ------------------------------------------------------------------------------------------------

/// Buffered append-only writer over a [`std::fs::File`].
#[derive(Debug)]
pub struct FileWriter {
    inner: BufWriter<File>,
}

impl FileWriter {
    /// Creates (or truncates) the file at `path`.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path.as_ref())?;
        debug!(path = %path.as_ref().display(), "writable file created");
        Ok(Self {
            inner: BufWriter::new(file),
        })
    }

    /// Opens the file at `path` for appending.
    pub fn append_to<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())?;
        Ok(Self {
            inner: BufWriter::new(file),
        })
    }
}

impl WritableFile for FileWriter {
    fn append(&mut self, data: &[u8]) -> Result<(), StorageError> {
        self.inner.write_all(data)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), StorageError> {
        self.inner.flush()?;
        Ok(())
    }

    fn sync(&mut self) -> Result<(), StorageError> {
        self.inner.flush()?;
        self.inner.get_ref().sync_all()?;
        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// FileSequentialReader
// ------------------------------------------------------------------------------------------------

/// Buffered forward-only reader over a [`std::fs::File`].
#[derive(Debug)]
pub struct FileSequentialReader {
    inner: BufReader<File>,
}

impl FileSequentialReader {
    /// Opens the file at `path` for sequential reading.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let file = File::open(path)?;
        Ok(Self {
            inner: BufReader::new(file),
        })
    }
}

impl SequentialFile for FileSequentialReader {
    fn read(&mut self, n: usize) -> Result<Vec<u8>, StorageError> {
        let mut buf = vec![0u8; n];
        let mut filled = 0;
        while filled < n {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(read) => filled += read,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(StorageError::Io(e)),
            }
        }
        buf.truncate(filled);
        Ok(buf)
    }
}

// ------------------------------------------------------------------------------------------------
// MmapReader
// ------------------------------------------------------------------------------------------------

/// Random reader backed by a read-only memory map.
///
/// # Safety
///
/// The mapping is only sound while nothing truncates or rewrites the file.
/// Table files are immutable once built, which is the only way this reader
/// is used.
#[derive(Debug)]
pub struct MmapReader {
    mmap: Mmap,
}

impl MmapReader {
    /// Opens and maps the file at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let file = File::open(path.as_ref())?;
        let mmap = unsafe { Mmap::map(&file)? };
        debug!(path = %path.as_ref().display(), len = mmap.len(), "file mapped for random reads");
        Ok(Self { mmap })
    }
}

impl RandomReader for MmapReader {
    fn read_at(&self, offset: u64, n: usize) -> Result<Vec<u8>, StorageError> {
        let file_len = self.mmap.len() as u64;
        let end = offset.checked_add(n as u64);
        match end {
            Some(end) if end <= file_len => {
                let start = offset as usize;
                Ok(self.mmap[start..start + n].to_vec())
            }
            _ => Err(StorageError::OutOfBounds {
                offset,
                requested: n,
                file_len,
            }),
        }
    }

    fn len(&self) -> u64 {
        self.mmap.len() as u64
    }
}

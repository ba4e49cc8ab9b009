//! The write-ahead record log.
//!
//! The log is a sequence of fixed-size **32 KiB blocks**. Each block holds
//! physical records; a logical record (the payload handed to
//! [`LogWriter::add_record`]) is either one `FULL` physical record or a
//! `FIRST (MIDDLE)* LAST` chain spanning blocks. Readers reassemble the
//! chain and verify every fragment's CRC.
//!
//! # On-disk layout
//!
//! ```text
//! block := physical_record* zero_padding        (padding < 7 bytes)
//! physical_record :=
//!   ┌──────────────┬───────────────┬──────────┬──────────────────┐
//!   │ crc32: u32 BE│ length: u16 BE│ type: u8 │ payload[length]  │
//!   └──────────────┴───────────────┴──────────┴──────────────────┘
//! type := FULL=1 | FIRST=2 | MIDDLE=3 | LAST=4
//! ```
//!
//! The CRC is CRC-32 (IEEE polynomial) over the payload bytes, the same
//! rule at write and read time. When fewer than 7 bytes remain in a block
//! the writer zero-fills them and starts a fresh block, so a reader can
//! always distinguish padding (discarded with the block tail) from a
//! record header.
//!
//! # Durability
//!
//! Every physical record is appended *and flushed* before `add_record`
//! returns, so logical-record boundaries are durable at flush granularity.
//! Calling [`crate::storage::WritableFile::sync`] for crash consistency is
//! the caller's responsibility.
//!
//! # Corruption handling
//!
//! Every corruption event is handed to the [`Reporter`]; physical-layer
//! failures (bad CRC, unknown record type, a length field overrunning the
//! block) also fail the current [`LogReader::read_record`] call with the
//! first error. Fragment-sequence violations are reported and then skipped
//! so that replay can continue with the next intact record.

#[cfg(test)]
mod tests;

use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::storage::{SequentialFile, StorageError, WritableFile};

/// Size of one log block.
pub const BLOCK_SIZE: usize = 32 * 1024;

/// Size of a physical record header: crc (4) + length (2) + type (1).
pub const HEADER_SIZE: usize = 7;

// ------------------------------------------------------------------------------------------------
// Error type
// ------------------------------------------------------------------------------------------------

/// Errors returned by log operations.
#[derive(Debug, Error)]
pub enum WalError {
    /// Underlying file failure.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// A physical record failed validation; the message names the cause
    /// and the payload carries the file offset where it was detected.
    #[error("log corruption at offset {offset}: {reason}")]
    Corruption {
        /// Description of the failure.
        reason: String,
        /// File offset of the offending record header.
        offset: u64,
    },
}

// ------------------------------------------------------------------------------------------------
// Record types
// ------------------------------------------------------------------------------------------------

/// Physical record kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RecordType {
    /// A whole logical record in one fragment.
    Full = 1,
    /// First fragment of a multi-fragment record.
    First = 2,
    /// Interior fragment.
    Middle = 3,
    /// Final fragment.
    Last = 4,
}

impl RecordType {
    fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(RecordType::Full),
            2 => Some(RecordType::First),
            3 => Some(RecordType::Middle),
            4 => Some(RecordType::Last),
            _ => None,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// Reporter capability
// ------------------------------------------------------------------------------------------------

/// Receiver for corruption events observed during replay.
///
/// The reader reports *every* event, including ones it recovers from, so
/// the layer above can decide whether a recovered log is trustworthy.
pub trait Reporter {
    /// Called once per corruption event.
    fn corruption(&mut self, err: &WalError);
}

/// A [`Reporter`] that forwards events to `tracing` at `warn` level.
#[derive(Debug, Default)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn corruption(&mut self, err: &WalError) {
        warn!(error = %err, "log corruption reported");
    }
}

// ------------------------------------------------------------------------------------------------
// LogWriter
// ------------------------------------------------------------------------------------------------

/// Appends logical records, fragmenting them across 32 KiB blocks.
#[derive(Debug)]
pub struct LogWriter<W: WritableFile> {
    file: W,
    /// Current offset within the block being filled, in `[0, BLOCK_SIZE)`.
    block_offset: usize,
}

impl<W: WritableFile> LogWriter<W> {
    /// Wraps a fresh (empty) file.
    pub fn new(file: W) -> Self {
        Self {
            file,
            block_offset: 0,
        }
    }

    /// Appends one logical record and flushes it.
    ///
    /// An empty `data` still emits one zero-length `FULL` fragment, so
    /// records of any length round-trip.
    pub fn add_record(&mut self, data: &[u8]) -> Result<(), WalError> {
        let mut left = data.len();
        let mut pos = 0;
        let mut begin = true;

        loop {
            let leftover = BLOCK_SIZE - self.block_offset;
            if leftover < HEADER_SIZE {
                // Not enough room for a header: zero-fill and start fresh.
                if leftover > 0 {
                    const ZEROS: [u8; HEADER_SIZE] = [0; HEADER_SIZE];
                    self.file.append(&ZEROS[..leftover])?;
                }
                self.block_offset = 0;
            }

            let available = BLOCK_SIZE - self.block_offset - HEADER_SIZE;
            let fragment_len = left.min(available);
            let end = fragment_len == left;

            let record_type = match (begin, end) {
                (true, true) => RecordType::Full,
                (true, false) => RecordType::First,
                (false, true) => RecordType::Last,
                (false, false) => RecordType::Middle,
            };

            self.emit_physical_record(record_type, &data[pos..pos + fragment_len])?;

            pos += fragment_len;
            left -= fragment_len;
            begin = false;
            if left == 0 {
                break;
            }
        }

        trace!(len = data.len(), "logical record appended");
        Ok(())
    }

    /// Syncs the underlying file to stable storage.
    pub fn sync(&mut self) -> Result<(), WalError> {
        self.file.sync()?;
        Ok(())
    }

    /// Consumes the writer, returning the underlying file.
    pub fn into_inner(self) -> W {
        self.file
    }

    fn emit_physical_record(
        &mut self,
        record_type: RecordType,
        payload: &[u8],
    ) -> Result<(), WalError> {
        debug_assert!(self.block_offset + HEADER_SIZE + payload.len() <= BLOCK_SIZE);

        let crc = {
            let mut hasher = crc32fast::Hasher::new();
            hasher.update(payload);
            hasher.finalize()
        };

        let mut header = [0u8; HEADER_SIZE];
        header[..4].copy_from_slice(&crc.to_be_bytes());
        header[4..6].copy_from_slice(&(payload.len() as u16).to_be_bytes());
        header[6] = record_type as u8;

        self.file.append(&header)?;
        self.file.append(payload)?;
        self.file.flush()?;

        self.block_offset += HEADER_SIZE + payload.len();
        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// LogReader
// ------------------------------------------------------------------------------------------------

/// Reads logical records back, one 32 KiB block at a time.
pub struct LogReader<R: SequentialFile, T: Reporter> {
    file: R,
    reporter: T,
    /// Bytes of the block currently being consumed.
    buf: Vec<u8>,
    /// Read cursor within `buf`.
    buf_pos: usize,
    /// File offset just past the end of `buf`.
    end_of_buf_offset: u64,
    /// Offset of the first fragment of the last record returned.
    last_record_offset: u64,
    /// Whether the underlying reader has been exhausted.
    eof: bool,
}

/// One decoded physical record.
struct Physical {
    record_type: RecordType,
    payload: Vec<u8>,
    /// File offset of the record's header.
    offset: u64,
}

impl<R: SequentialFile, T: Reporter> LogReader<R, T> {
    /// Wraps a sequential reader positioned at the start of the log.
    pub fn new(file: R, reporter: T) -> Self {
        Self {
            file,
            reporter,
            buf: Vec::new(),
            buf_pos: 0,
            end_of_buf_offset: 0,
            last_record_offset: 0,
            eof: false,
        }
    }

    /// Reads the next logical record.
    ///
    /// Returns `Ok(None)` at the clean end of the log. Physical corruption
    /// is reported and returned as `Err`; fragment-sequence violations are
    /// reported, then skipped.
    pub fn read_record(&mut self) -> Result<Option<Vec<u8>>, WalError> {
        let mut in_fragment = false;
        let mut record = Vec::new();
        // Offset of the FIRST fragment of the record being assembled.
        let mut prospective_offset = 0;

        loop {
            let physical = match self.read_physical_record() {
                Ok(Some(physical)) => physical,
                Ok(None) => {
                    if in_fragment {
                        let err = WalError::Corruption {
                            reason: "partial record without last fragment at end of log".into(),
                            offset: prospective_offset,
                        };
                        self.reporter.corruption(&err);
                    }
                    return Ok(None);
                }
                Err(err) => {
                    self.reporter.corruption(&err);
                    return Err(err);
                }
            };

            match physical.record_type {
                RecordType::Full => {
                    if in_fragment {
                        self.report(
                            "get full type record, but in_fragment",
                            physical.offset,
                        );
                    }
                    self.last_record_offset = physical.offset;
                    return Ok(Some(physical.payload));
                }
                RecordType::First => {
                    if in_fragment {
                        self.report(
                            "get first type record, but in_fragment",
                            physical.offset,
                        );
                    }
                    in_fragment = true;
                    prospective_offset = physical.offset;
                    record = physical.payload;
                }
                RecordType::Middle => {
                    if !in_fragment {
                        self.report(
                            "get middle type record, but not in_fragment",
                            physical.offset,
                        );
                    } else {
                        record.extend_from_slice(&physical.payload);
                    }
                }
                RecordType::Last => {
                    if !in_fragment {
                        self.report(
                            "get last type record, but not in_fragment",
                            physical.offset,
                        );
                    } else {
                        record.extend_from_slice(&physical.payload);
                        self.last_record_offset = prospective_offset;
                        return Ok(Some(record));
                    }
                }
            }
        }
    }

    /// File offset of the first physical record of the most recently
    /// returned logical record.
    pub fn last_record_offset(&self) -> u64 {
        self.last_record_offset
    }

    /// The reporter, for inspection after replay.
    pub fn reporter(&self) -> &T {
        &self.reporter
    }

    fn report(&mut self, reason: &str, offset: u64) {
        let err = WalError::Corruption {
            reason: reason.into(),
            offset,
        };
        self.reporter.corruption(&err);
    }

    /// Decodes the next physical record, refilling the block buffer as
    /// needed. `Ok(None)` at end of file.
    fn read_physical_record(&mut self) -> Result<Option<Physical>, WalError> {
        loop {
            if self.buf.len() - self.buf_pos < HEADER_SIZE {
                // The (< 7 byte) block trailer is padding; drop it and
                // read the next block.
                if self.eof {
                    return Ok(None);
                }
                let block = self.file.read(BLOCK_SIZE)?;
                if block.is_empty() {
                    self.eof = true;
                    return Ok(None);
                }
                if block.len() < BLOCK_SIZE {
                    self.eof = true;
                }
                self.end_of_buf_offset += block.len() as u64;
                self.buf = block;
                self.buf_pos = 0;
                debug!(
                    end_offset = self.end_of_buf_offset,
                    len = self.buf.len(),
                    "log block loaded"
                );
                continue;
            }

            let header_offset =
                self.end_of_buf_offset - (self.buf.len() - self.buf_pos) as u64;
            let header = &self.buf[self.buf_pos..self.buf_pos + HEADER_SIZE];
            let length = usize::from(u16::from_be_bytes([header[4], header[5]]));

            if self.buf_pos + HEADER_SIZE + length > self.buf.len() {
                return Err(WalError::Corruption {
                    reason: format!(
                        "record length {length} overruns block remainder of {} bytes",
                        self.buf.len() - self.buf_pos - HEADER_SIZE
                    ),
                    offset: header_offset,
                });
            }

            let Some(record_type) = RecordType::from_byte(header[6]) else {
                return Err(WalError::Corruption {
                    reason: "unknown record type".into(),
                    offset: header_offset,
                });
            };

            let stored_crc = u32::from_be_bytes([header[0], header[1], header[2], header[3]]);
            let payload_start = self.buf_pos + HEADER_SIZE;
            let payload = &self.buf[payload_start..payload_start + length];

            let computed_crc = {
                let mut hasher = crc32fast::Hasher::new();
                hasher.update(payload);
                hasher.finalize()
            };
            if stored_crc != computed_crc {
                return Err(WalError::Corruption {
                    reason: "checksum not equal".into(),
                    offset: header_offset,
                });
            }

            let payload = payload.to_vec();
            self.buf_pos += HEADER_SIZE + length;
            trace!(
                offset = header_offset,
                len = length,
                record_type = header[6],
                "physical record read"
            );

            return Ok(Some(Physical {
                record_type,
                payload,
                offset: header_offset,
            }));
        }
    }
}

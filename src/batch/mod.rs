//! Write batches — the unit of mutation the record log conveys.
//!
//! A batch is a single growable buffer holding its own serialization, so
//! writing it to the log is a plain byte copy and recovering it from the
//! log is a plain byte adoption ([`WriteBatch::from_contents`]).
//!
//! # Wire format
//!
//! ```text
//! ┌─────────────┬──────────────┬──────────────────────────────┐
//! │ seq: u64 BE │ count: u32 BE│ count × operation            │
//! └─────────────┴──────────────┴──────────────────────────────┘
//!
//! operation := 0x01 ‖ varstr(key) ‖ varstr(value)   (put)
//!            | 0x00 ‖ varstr(key)                   (delete)
//! ```
//!
//! The sequence number is the base the database façade assigned to the
//! batch; operation `i` commits at `seq + i`.

#[cfg(test)]
mod tests;

use thiserror::Error;
use tracing::trace;

use crate::encoding::{self, put_varstr};

/// Byte length of the `seq ‖ count` header.
pub const BATCH_HEADER_SIZE: usize = 12;

/// Operation tag for a deletion.
const OP_DELETE: u8 = 0x00;

/// Operation tag for an insertion.
const OP_PUT: u8 = 0x01;

// ------------------------------------------------------------------------------------------------
// Error type
// ------------------------------------------------------------------------------------------------

/// Errors produced while walking a batch.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BatchError {
    /// The buffer ended before `count` operations were decoded, or an
    /// operation carried an unknown tag.
    #[error("malformed batch: {0}")]
    Malformed(String),
}

// ------------------------------------------------------------------------------------------------
// Handler capability
// ------------------------------------------------------------------------------------------------

/// Receiver for the operations of a batch, in insertion order.
pub trait BatchHandler {
    /// Called for each put operation.
    fn put(&mut self, key: &[u8], value: &[u8]);

    /// Called for each delete operation.
    fn delete(&mut self, key: &[u8]);
}

// ------------------------------------------------------------------------------------------------
// WriteBatch
// ------------------------------------------------------------------------------------------------

/// An ordered sequence of put/delete operations with a shared base
/// sequence number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteBatch {
    /// `[seq ‖ count ‖ operations]`, always at least the 12-byte header.
    data: Vec<u8>,
}

impl Default for WriteBatch {
    fn default() -> Self {
        Self::new()
    }
}

impl WriteBatch {
    /// Creates an empty batch with a zeroed header.
    pub fn new() -> Self {
        Self {
            data: vec![0; BATCH_HEADER_SIZE],
        }
    }

    /// Adopts a serialized batch, e.g. one recovered from the log.
    ///
    /// Only the header length is validated here; per-operation validation
    /// happens during [`WriteBatch::iterate`].
    pub fn from_contents(data: Vec<u8>) -> Result<Self, BatchError> {
        if data.len() < BATCH_HEADER_SIZE {
            return Err(BatchError::Malformed(format!(
                "batch of {} bytes is shorter than its header",
                data.len()
            )));
        }
        Ok(Self { data })
    }

    /// Appends a put operation.
    pub fn put(&mut self, key: &[u8], value: &[u8]) {
        self.set_count(self.count() + 1);
        self.data.push(OP_PUT);
        put_varstr(&mut self.data, key);
        put_varstr(&mut self.data, value);
        trace!(key_len = key.len(), value_len = value.len(), "batch put");
    }

    /// Appends a delete operation.
    pub fn delete(&mut self, key: &[u8]) {
        self.set_count(self.count() + 1);
        self.data.push(OP_DELETE);
        put_varstr(&mut self.data, key);
        trace!(key_len = key.len(), "batch delete");
    }

    /// Resets to an empty batch with a zeroed header.
    pub fn clear(&mut self) {
        self.data.clear();
        self.data.resize(BATCH_HEADER_SIZE, 0);
    }

    /// Splices `other`'s operations after this batch's and sums the counts.
    ///
    /// `other`'s sequence number is discarded; the merged batch commits
    /// under this batch's base.
    pub fn append(&mut self, other: &WriteBatch) {
        self.set_count(self.count() + other.count());
        self.data
            .extend_from_slice(&other.data[BATCH_HEADER_SIZE..]);
    }

    /// Number of operations in the batch.
    pub fn count(&self) -> u32 {
        u32::from_be_bytes(self.data[8..12].try_into().expect("header is 12 bytes"))
    }

    /// Base sequence number of the batch.
    pub fn sequence(&self) -> u64 {
        u64::from_be_bytes(self.data[..8].try_into().expect("header is 12 bytes"))
    }

    /// Sets the base sequence number.
    pub fn set_sequence(&mut self, seq: u64) {
        self.data[..8].copy_from_slice(&seq.to_be_bytes());
    }

    /// The full serialized form, ready for the record log.
    pub fn contents(&self) -> &[u8] {
        &self.data
    }

    /// Approximate in-memory footprint of the batch.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Whether the batch holds no operations.
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Walks the operations in insertion order, feeding each to `handler`.
    ///
    /// Fails with [`BatchError::Malformed`] when the buffer is exhausted
    /// before `count` operations were decoded or a tag is unknown.
    pub fn iterate<H: BatchHandler>(&self, handler: &mut H) -> Result<(), BatchError> {
        let count = self.count();
        let mut pos = BATCH_HEADER_SIZE;

        for index in 0..count {
            let op = *self.data.get(pos).ok_or_else(|| {
                BatchError::Malformed(format!("operation {index} of {count} missing"))
            })?;
            pos += 1;

            let (key, key_size) = encoding::get_varstr(&self.data[pos..]).map_err(|e| {
                BatchError::Malformed(format!("bad key in operation {index}: {e}"))
            })?;
            pos += key_size;

            match op {
                OP_DELETE => handler.delete(key),
                OP_PUT => {
                    let (value, value_size) =
                        encoding::get_varstr(&self.data[pos..]).map_err(|e| {
                            BatchError::Malformed(format!("bad value in operation {index}: {e}"))
                        })?;
                    pos += value_size;
                    handler.put(key, value);
                }
                other => {
                    return Err(BatchError::Malformed(format!(
                        "unknown operation tag {other:#04x} in operation {index}"
                    )));
                }
            }
        }

        Ok(())
    }

    fn set_count(&mut self, count: u32) {
        self.data[8..12].copy_from_slice(&count.to_be_bytes());
    }
}

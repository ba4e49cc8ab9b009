//! Sorted String Tables — the immutable on-disk format.
//!
//! An SSTable is a sequence of prefix-compressed [`block`]s followed by an
//! index block and a fixed-size footer:
//!
//! ```text
//! ┌──────────────┬───┬──────────────────┬─────────────┬────────┐
//! │ data block 0 │ … │ data block n−1   │ index block │ footer │
//! └──────────────┴───┴──────────────────┴─────────────┴────────┘
//!
//! Every block is followed by a 5-byte tail: type (1, 0 = uncompressed)
//! and crc32 (4, BE) over content ‖ type.
//!
//! footer (48 bytes) :=
//!   index_handle[20] ‖ meta_index_handle[20] ‖ magic: u64 BE
//! ```
//!
//! The index block holds one entry per data block: key = the last key of
//! that block, value = the block's [`BlockHandle`] in varint form. The
//! footer stores handles in a fixed 20-byte form so the footer length is
//! constant. The meta-index handle is written zeroed; readers tolerate
//! that until meta-index content exists.
//!
//! # Sub-modules
//!
//! - [`block`] — block wire format, [`block::BlockBuilder`], [`block::BlockIter`].
//! - [`builder`] — [`builder::TableBuilder`], which drives block builders
//!   into a [`crate::storage::WritableFile`].
//!
//! Tables are built once and read many times; [`Table`] is safe to share
//! across concurrent readers.

pub mod block;
pub mod builder;

#[cfg(test)]
mod tests;

pub use block::{Block, BlockBuilder, BlockIter, RESTART_INTERVAL};
pub use builder::TableBuilder;

use thiserror::Error;
use tracing::{debug, info};

use crate::encoding::{
    EncodingError, decode_fixed64_be, get_uvarint, put_fixed64_be, put_uvarint,
};
use crate::iter::Iter;
use crate::storage::{RandomReader, StorageError};

/// Flush threshold for data blocks.
pub const BLOCK_MAX_SIZE: usize = 4 * 1024;

/// Bytes of block tail: compression type (1) + crc32 (4).
pub const BLOCK_TRAILER_SIZE: usize = 5;

/// Identity codec marker in a block tail.
pub const COMPRESSION_NONE: u8 = 0;

/// Exact byte width of a handle in varint form is at most this.
const MAX_HANDLE_ENCODED_LENGTH: usize = 20;

/// Fixed byte width of one handle slot in the footer.
const HANDLE_SLOT_SIZE: usize = MAX_HANDLE_ENCODED_LENGTH;

/// Exact footer length: two handle slots plus the magic.
pub const FOOTER_SIZE: usize = 2 * HANDLE_SLOT_SIZE + 8;

/// First 64 bits of the SHA-1 of "http://code.google.com/p/leveldb/".
pub const TABLE_MAGIC_NUMBER: u64 = 0xDB47_7524_8B80_FB57;

// ------------------------------------------------------------------------------------------------
// Error type
// ------------------------------------------------------------------------------------------------

/// Errors returned by table and block operations.
#[derive(Debug, Error)]
pub enum SstError {
    /// Underlying file failure (including out-of-bounds random reads).
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// A structural invariant of the format failed.
    #[error("sstable corruption: {0}")]
    Corruption(String),

    /// The builder was used after `finish`.
    #[error("table builder is finished")]
    Closed,
}

impl From<EncodingError> for SstError {
    fn from(err: EncodingError) -> Self {
        SstError::Corruption(err.to_string())
    }
}

// ------------------------------------------------------------------------------------------------
// BlockHandle
// ------------------------------------------------------------------------------------------------

/// Locates a block within a table file.
///
/// `size` counts the block content only; the 5-byte tail follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockHandle {
    /// File offset of the block's first content byte.
    pub offset: u64,
    /// Content length in bytes, excluding the tail.
    pub size: u64,
}

impl BlockHandle {
    /// Creates a handle.
    pub fn new(offset: u64, size: u64) -> Self {
        Self { offset, size }
    }

    /// Appends the varint wire form: `uvarint(offset) ‖ uvarint(size)`.
    pub fn encode_to(&self, dst: &mut Vec<u8>) {
        put_uvarint(dst, self.offset);
        put_uvarint(dst, self.size);
    }

    /// Decodes the varint wire form; returns the handle and bytes used.
    pub fn decode_from(src: &[u8]) -> Result<(Self, usize), SstError> {
        let (offset, used_a) = get_uvarint(src)
            .map_err(|e| SstError::Corruption(format!("bad block handle: {e}")))?;
        let (size, used_b) = get_uvarint(&src[used_a..])
            .map_err(|e| SstError::Corruption(format!("bad block handle: {e}")))?;
        Ok((Self { offset, size }, used_a + used_b))
    }

    /// Appends the fixed footer form: two u64 BE zero-padded to 20 bytes.
    fn encode_fixed_to(&self, dst: &mut Vec<u8>) {
        put_fixed64_be(dst, self.offset);
        put_fixed64_be(dst, self.size);
        dst.resize(dst.len() + (HANDLE_SLOT_SIZE - 16), 0);
    }

    /// Decodes the fixed footer form from a 20-byte slot.
    fn decode_fixed(src: &[u8]) -> Result<Self, SstError> {
        let offset = decode_fixed64_be(src)?;
        let size = decode_fixed64_be(&src[8..])?;
        Ok(Self { offset, size })
    }
}

// ------------------------------------------------------------------------------------------------
// Footer
// ------------------------------------------------------------------------------------------------

/// The fixed trailer locating the index (and meta-index) block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Footer {
    /// Handle of the index block.
    pub index_handle: BlockHandle,
    /// Handle of the meta-index block; zeroed while no meta-index exists.
    pub meta_index_handle: BlockHandle,
}

impl Footer {
    /// Serializes the footer to its exact [`FOOTER_SIZE`] bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(FOOTER_SIZE);
        self.index_handle.encode_fixed_to(&mut out);
        self.meta_index_handle.encode_fixed_to(&mut out);
        put_fixed64_be(&mut out, TABLE_MAGIC_NUMBER);
        debug_assert_eq!(out.len(), FOOTER_SIZE);
        out
    }

    /// Parses and validates a footer.
    pub fn decode(src: &[u8]) -> Result<Self, SstError> {
        if src.len() != FOOTER_SIZE {
            return Err(SstError::Corruption(format!(
                "footer is {} bytes, expected {FOOTER_SIZE}",
                src.len()
            )));
        }
        let magic = decode_fixed64_be(&src[2 * HANDLE_SLOT_SIZE..])?;
        if magic != TABLE_MAGIC_NUMBER {
            return Err(SstError::Corruption(format!(
                "not an sstable (bad magic {magic:#018x})"
            )));
        }
        Ok(Self {
            index_handle: BlockHandle::decode_fixed(src)?,
            meta_index_handle: BlockHandle::decode_fixed(&src[HANDLE_SLOT_SIZE..])?,
        })
    }
}

// ------------------------------------------------------------------------------------------------
// Block I/O shared by reader and tests
// ------------------------------------------------------------------------------------------------

/// Reads the block at `handle` and verifies its tail.
///
/// Checks `crc32(content ‖ type)` against the stored checksum and rejects
/// unknown compression types. Returns the content bytes.
pub(crate) fn read_verified_block<R: RandomReader>(
    reader: &R,
    handle: BlockHandle,
) -> Result<Vec<u8>, SstError> {
    let size = usize::try_from(handle.size)
        .map_err(|_| SstError::Corruption("block size exceeds addressable range".into()))?;
    let raw = reader.read_at(handle.offset, size + BLOCK_TRAILER_SIZE)?;

    let content = &raw[..size];
    let block_type = raw[size];
    let stored_crc = u32::from_be_bytes([raw[size + 1], raw[size + 2], raw[size + 3], raw[size + 4]]);

    let computed_crc = {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(content);
        hasher.update(&[block_type]);
        hasher.finalize()
    };
    if stored_crc != computed_crc {
        return Err(SstError::Corruption(format!(
            "block checksum mismatch at offset {} (stored {stored_crc:#010x}, computed {computed_crc:#010x})",
            handle.offset
        )));
    }
    if block_type != COMPRESSION_NONE {
        return Err(SstError::Corruption(format!(
            "unknown compression type {block_type} at offset {}",
            handle.offset
        )));
    }

    Ok(content.to_vec())
}

// ------------------------------------------------------------------------------------------------
// Table — immutable reader
// ------------------------------------------------------------------------------------------------

/// An opened SSTable: the parsed index block plus the file it points into.
#[derive(Debug)]
pub struct Table<R: RandomReader> {
    reader: R,
    index_block: Block,
}

impl<R: RandomReader> Table<R> {
    /// Opens a table: reads the footer, verifies the magic, and loads the
    /// index block.
    pub fn open(reader: R) -> Result<Self, SstError> {
        let file_len = reader.len();
        if file_len < FOOTER_SIZE as u64 {
            return Err(SstError::Corruption(format!(
                "file of {file_len} bytes cannot hold a footer"
            )));
        }

        let footer_bytes = reader.read_at(file_len - FOOTER_SIZE as u64, FOOTER_SIZE)?;
        let footer = Footer::decode(&footer_bytes)?;
        debug!(
            index_offset = footer.index_handle.offset,
            index_size = footer.index_handle.size,
            "footer decoded"
        );

        let index_content = read_verified_block(&reader, footer.index_handle)?;
        let index_block = Block::new(index_content)?;

        info!(file_len, "sstable opened");
        Ok(Self {
            reader,
            index_block,
        })
    }

    /// Point lookup.
    ///
    /// Returns `Ok(None)` when no entry with exactly `key` exists.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, SstError> {
        let mut index_iter = self.index_block.iter();
        index_iter.seek(key);
        if !index_iter.valid() {
            index_iter.status().map_err(clone_corruption)?;
            return Ok(None);
        }

        let (handle, _) = BlockHandle::decode_from(index_iter.value())?;
        let content = read_verified_block(&self.reader, handle)?;
        let data_block = Block::new(content)?;

        let mut data_iter = data_block.iter();
        data_iter.seek(key);
        if !data_iter.valid() {
            data_iter.status().map_err(clone_corruption)?;
            return Ok(None);
        }
        if data_iter.key() != key {
            return Ok(None);
        }
        Ok(Some(data_iter.value().to_vec()))
    }
}

/// Rebuilds a latched iterator error as an owned corruption.
fn clone_corruption(err: &SstError) -> SstError {
    SstError::Corruption(err.to_string())
}

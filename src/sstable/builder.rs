//! Table builder — writes a complete SSTable to a file.
//!
//! [`TableBuilder`] drives two [`BlockBuilder`]s: entries accumulate in a
//! data block until its estimated size reaches [`BLOCK_MAX_SIZE`], at which
//! point the block is finalized, written with its 5-byte tail, and indexed
//! under its last key. `finish` flushes the remainder, writes the index
//! block, and ends the file with the 48-byte footer.
//!
//! Keys must arrive in strictly ascending order across the whole table
//! (the per-block builder enforces this for each block, and block
//! boundaries preserve it since flushing never reorders).
//!
//! `finish` is the last call; the builder refuses entries afterwards.

use tracing::{debug, info};

use crate::sstable::block::BlockBuilder;
use crate::sstable::{
    BLOCK_MAX_SIZE, BLOCK_TRAILER_SIZE, BlockHandle, COMPRESSION_NONE, FOOTER_SIZE, Footer,
    SstError,
};
use crate::storage::WritableFile;

/// Streams sorted entries into the SSTable on-disk format.
pub struct TableBuilder<W: WritableFile> {
    file: W,
    data_block: BlockBuilder,
    index_block: BlockBuilder,
    /// File offset where the next block will start.
    offset: u64,
    /// Last key added, for the final index entry.
    last_key: Vec<u8>,
    num_entries: usize,
    finished: bool,
}

impl<W: WritableFile> TableBuilder<W> {
    /// Wraps a fresh (empty) file.
    pub fn new(file: W) -> Self {
        Self {
            file,
            data_block: BlockBuilder::new(),
            index_block: BlockBuilder::new(),
            offset: 0,
            last_key: Vec::new(),
            num_entries: 0,
            finished: false,
        }
    }

    /// Appends one entry. Keys must be strictly ascending.
    ///
    /// Fails with [`SstError::Closed`] after [`TableBuilder::finish`].
    pub fn add(&mut self, key: &[u8], value: &[u8]) -> Result<(), SstError> {
        if self.finished {
            return Err(SstError::Closed);
        }

        self.data_block.add_entry(key, value);
        self.num_entries += 1;
        self.last_key.clear();
        self.last_key.extend_from_slice(key);

        if self.data_block.size_estimate() >= BLOCK_MAX_SIZE {
            let handle = self.flush_data_block()?;
            let mut handle_bytes = Vec::new();
            handle.encode_to(&mut handle_bytes);
            self.index_block.add_entry(key, &handle_bytes);
        }
        Ok(())
    }

    /// Finalizes the table: remaining data block, index block, footer.
    ///
    /// Flushes and syncs the file; the builder accepts nothing afterwards.
    pub fn finish(&mut self) -> Result<(), SstError> {
        if self.finished {
            return Err(SstError::Closed);
        }
        self.finished = true;

        // A partially filled data block still needs flushing and indexing.
        if !self.data_block.is_empty() {
            let handle = self.flush_data_block()?;
            let mut handle_bytes = Vec::new();
            handle.encode_to(&mut handle_bytes);
            let last_key = std::mem::take(&mut self.last_key);
            self.index_block.add_entry(&last_key, &handle_bytes);
        }

        let index_content = self.index_block.finish().to_vec();
        let index_handle = self.write_block(&index_content)?;
        debug!(
            offset = index_handle.offset,
            size = index_handle.size,
            "index block written"
        );

        let footer = Footer {
            index_handle,
            // No meta-index block is written; the zeroed handle marks its
            // absence and readers tolerate it.
            meta_index_handle: BlockHandle::default(),
        };
        self.file.append(&footer.encode())?;
        self.offset += FOOTER_SIZE as u64;

        self.file.flush()?;
        self.file.sync()?;

        info!(
            entries = self.num_entries,
            file_size = self.offset,
            "sstable finished"
        );
        Ok(())
    }

    /// Number of entries added so far.
    pub fn num_entries(&self) -> usize {
        self.num_entries
    }

    /// Bytes written (through the last completed block or footer).
    pub fn file_size(&self) -> u64 {
        self.offset
    }

    /// Finalizes the current data block, writes it, and resets it.
    fn flush_data_block(&mut self) -> Result<BlockHandle, SstError> {
        let content = self.data_block.finish().to_vec();
        let handle = self.write_block(&content)?;
        self.data_block.reset();
        debug!(offset = handle.offset, size = handle.size, "data block written");
        Ok(handle)
    }

    /// Appends `content ‖ type ‖ crc32(content ‖ type)` and advances the
    /// offset. The returned handle covers the content only.
    fn write_block(&mut self, content: &[u8]) -> Result<BlockHandle, SstError> {
        self.file.append(content)?;

        let crc = {
            let mut hasher = crc32fast::Hasher::new();
            hasher.update(content);
            hasher.update(&[COMPRESSION_NONE]);
            hasher.finalize()
        };
        let mut tail = [0u8; BLOCK_TRAILER_SIZE];
        tail[0] = COMPRESSION_NONE;
        tail[1..].copy_from_slice(&crc.to_be_bytes());
        self.file.append(&tail)?;

        let handle = BlockHandle::new(self.offset, content.len() as u64);
        self.offset += (content.len() + BLOCK_TRAILER_SIZE) as u64;
        Ok(handle)
    }
}

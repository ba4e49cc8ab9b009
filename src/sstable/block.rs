//! Prefix-compressed sorted blocks and their iterator.
//!
//! A block stores sorted key/value entries. Each entry shares a key prefix
//! with its predecessor; every [`RESTART_INTERVAL`]-th entry is a **restart
//! point** carrying its full key, and the offsets of all restart points
//! trail the content so `seek` can binary-search them.
//!
//! ```text
//! ┌─────────┬─────────┬───┬──────────────────┬──────────────────┐
//! │ entry 0 │ entry 1 │ … │ restarts: u32 BE*│ num_restarts: u32│
//! └─────────┴─────────┴───┴──────────────────┴──────────────────┘
//!
//! entry := uvarint(shared) ‖ uvarint(unshared) ‖ uvarint(value_len)
//!        ‖ key_delta[unshared] ‖ value[value_len]
//! ```
//!
//! At a restart point `shared == 0` and the delta is the whole key. The
//! same format serves data blocks (values are user payloads) and the index
//! block (values are serialized block handles).

use crate::encoding::{get_uvarint, put_fixed32_be, put_uvarint};
use crate::iter::Iter;
use crate::sstable::SstError;

/// Entries between restart points.
pub const RESTART_INTERVAL: usize = 16;

// ------------------------------------------------------------------------------------------------
// BlockBuilder
// ------------------------------------------------------------------------------------------------

/// Accumulates sorted entries into the block wire format.
///
/// Keys must be added in strictly ascending order. After [`finish`] the
/// builder refuses further entries until [`reset`].
///
/// [`finish`]: BlockBuilder::finish
/// [`reset`]: BlockBuilder::reset
#[derive(Debug, Default)]
pub struct BlockBuilder {
    content: Vec<u8>,
    /// Offsets of entries encoded with `shared == 0`.
    restarts: Vec<u32>,
    last_key: Vec<u8>,
    /// Entries since the last restart point.
    counter: usize,
    finished: bool,
    num_entries: usize,
}

impl BlockBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self {
            content: Vec::new(),
            restarts: vec![0],
            last_key: Vec::new(),
            counter: 0,
            finished: false,
            num_entries: 0,
        }
    }

    /// Appends one entry.
    ///
    /// # Panics
    ///
    /// When called after [`BlockBuilder::finish`], or with a key not
    /// strictly greater than the previous one.
    pub fn add_entry(&mut self, key: &[u8], value: &[u8]) {
        assert!(!self.finished, "add_entry after finish");
        assert!(
            self.num_entries == 0 || key > self.last_key.as_slice(),
            "keys must be added in strictly ascending order"
        );

        let shared = if self.counter == RESTART_INTERVAL {
            self.restarts.push(self.content.len() as u32);
            self.counter = 0;
            self.last_key.clear();
            0
        } else {
            common_prefix_len(key, &self.last_key)
        };
        let unshared = key.len() - shared;

        put_uvarint(&mut self.content, shared as u64);
        put_uvarint(&mut self.content, unshared as u64);
        put_uvarint(&mut self.content, value.len() as u64);
        self.content.extend_from_slice(&key[shared..]);
        self.content.extend_from_slice(value);

        self.last_key.clear();
        self.last_key.extend_from_slice(key);
        self.counter += 1;
        self.num_entries += 1;
    }

    /// Appends the restart array and count; returns the complete block.
    pub fn finish(&mut self) -> &[u8] {
        for &restart in &self.restarts {
            put_fixed32_be(&mut self.content, restart);
        }
        put_fixed32_be(&mut self.content, self.restarts.len() as u32);
        self.finished = true;
        &self.content
    }

    /// Clears all state back to a fresh builder.
    pub fn reset(&mut self) {
        self.content.clear();
        self.restarts.clear();
        self.restarts.push(0);
        self.last_key.clear();
        self.counter = 0;
        self.finished = false;
        self.num_entries = 0;
    }

    /// Estimated size of the finished block.
    pub fn size_estimate(&self) -> usize {
        self.content.len() + self.restarts.len() * 4 + 4
    }

    /// Whether no entries have been added since the last reset.
    pub fn is_empty(&self) -> bool {
        self.num_entries == 0
    }
}

/// Length of the longest common prefix of `a` and `b`.
fn common_prefix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count()
}

// ------------------------------------------------------------------------------------------------
// Block
// ------------------------------------------------------------------------------------------------

/// An immutable, parsed block.
///
/// The block owns its bytes; iterators borrow from it.
#[derive(Debug)]
pub struct Block {
    content: Vec<u8>,
    num_restarts: u32,
    /// Byte offset where the restart array begins (end of entry data).
    restarts_offset: u32,
}

impl Block {
    /// Adopts and validates block bytes.
    pub fn new(content: Vec<u8>) -> Result<Self, SstError> {
        if content.len() < 4 {
            return Err(SstError::Corruption(format!(
                "block of {} bytes has no restart count",
                content.len()
            )));
        }
        let tail = content.len() - 4;
        let num_restarts = u32::from_be_bytes([
            content[tail],
            content[tail + 1],
            content[tail + 2],
            content[tail + 3],
        ]);
        let restart_bytes = (num_restarts as usize)
            .checked_mul(4)
            .and_then(|n| n.checked_add(4));
        let restarts_offset = match restart_bytes {
            Some(total) if total <= content.len() => (content.len() - total) as u32,
            _ => {
                return Err(SstError::Corruption(format!(
                    "restart count {num_restarts} overruns block of {} bytes",
                    content.len()
                )));
            }
        };
        Ok(Self {
            content,
            num_restarts,
            restarts_offset,
        })
    }

    /// Creates an unpositioned iterator over the block.
    pub fn iter(&self) -> BlockIter<'_> {
        BlockIter {
            content: &self.content,
            num_restarts: self.num_restarts,
            restarts_offset: self.restarts_offset,
            current: self.restarts_offset,
            current_restart: self.num_restarts,
            key: Vec::new(),
            value_range: (0, 0),
            entry_len: 0,
            error: None,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// BlockIter
// ------------------------------------------------------------------------------------------------

/// One decoded entry header.
struct ParsedEntry {
    shared: usize,
    unshared: usize,
    value_len: usize,
    /// Offset of the key delta relative to the entry start.
    delta_offset: usize,
}

impl ParsedEntry {
    fn len(&self) -> usize {
        self.delta_offset + self.unshared + self.value_len
    }
}

/// Cursor over a [`Block`]'s entries.
///
/// Invalid until the first seek. A malformed entry invalidates the cursor
/// and latches the error, observable via [`BlockIter::status`].
pub struct BlockIter<'a> {
    content: &'a [u8],
    num_restarts: u32,
    restarts_offset: u32,
    /// Byte offset of the current entry, `restarts_offset` when invalid.
    current: u32,
    /// Restart index governing `current`, `num_restarts` when invalid.
    current_restart: u32,
    /// Fully reconstructed key of the current entry.
    key: Vec<u8>,
    /// Value position within `content`.
    value_range: (usize, usize),
    /// Encoded length of the current entry.
    entry_len: u32,
    error: Option<SstError>,
}

impl<'a> BlockIter<'a> {
    /// The first latched corruption, if any.
    pub fn status(&self) -> Result<(), &SstError> {
        match &self.error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Byte offset of restart point `index`.
    fn restart_offset(&self, index: u32) -> u32 {
        let pos = self.restarts_offset as usize + 4 * index as usize;
        u32::from_be_bytes([
            self.content[pos],
            self.content[pos + 1],
            self.content[pos + 2],
            self.content[pos + 3],
        ])
    }

    /// Invalidates the cursor (keeps any latched error).
    fn fail(&mut self) {
        self.current = self.restarts_offset;
        self.current_restart = self.num_restarts;
        self.key.clear();
        self.value_range = (0, 0);
        self.entry_len = 0;
    }

    fn corrupt(&mut self, reason: String) {
        if self.error.is_none() {
            self.error = Some(SstError::Corruption(reason));
        }
        self.fail();
    }

    /// Jumps to restart point `index`, clearing reconstructed key state.
    fn goto_restart(&mut self, index: u32) {
        self.current_restart = index;
        self.current = self.restart_offset(index);
        self.key.clear();
        self.value_range = (0, 0);
        self.entry_len = 0;
    }

    /// Decodes the entry header at `offset`.
    fn parse_entry_at(&self, offset: u32) -> Result<ParsedEntry, SstError> {
        let entry = &self.content[offset as usize..self.restarts_offset as usize];
        let header_err = |e| SstError::Corruption(format!("bad entry header: {e}"));
        let (shared, used_a) = get_uvarint(entry).map_err(header_err)?;
        let (unshared, used_b) = get_uvarint(&entry[used_a..]).map_err(header_err)?;
        let (value_len, used_c) = get_uvarint(&entry[used_a + used_b..]).map_err(header_err)?;
        let (shared, unshared, value_len) =
            (shared as usize, unshared as usize, value_len as usize);
        let delta_offset = used_a + used_b + used_c;
        if delta_offset + unshared + value_len > entry.len() {
            return Err(SstError::Corruption(format!(
                "entry of {} bytes overruns block content",
                delta_offset + unshared + value_len
            )));
        }
        Ok(ParsedEntry {
            shared,
            unshared,
            value_len,
            delta_offset,
        })
    }

    /// Reconstructs the entry at `self.current`. Returns whether the
    /// cursor remains valid.
    fn parse_current(&mut self) -> bool {
        if self.current >= self.restarts_offset {
            self.fail();
            return false;
        }
        let entry = match self.parse_entry_at(self.current) {
            Ok(entry) => entry,
            Err(err) => {
                self.corrupt(err.to_string());
                return false;
            }
        };
        if entry.shared > self.key.len() {
            self.corrupt(format!(
                "entry shares {} bytes but only {} are known",
                entry.shared,
                self.key.len()
            ));
            return false;
        }

        let start = self.current as usize + entry.delta_offset;
        self.key.truncate(entry.shared);
        self.key
            .extend_from_slice(&self.content[start..start + entry.unshared]);
        let value_start = start + entry.unshared;
        self.value_range = (value_start, value_start + entry.value_len);
        self.entry_len = entry.len() as u32;
        true
    }

    /// Advances the cursor past the current entry, keeping the restart
    /// index in step.
    fn step_forward(&mut self) {
        self.current += self.entry_len;
        while self.current_restart + 1 < self.num_restarts
            && self.restart_offset(self.current_restart + 1) <= self.current
        {
            self.current_restart += 1;
        }
    }

    /// Full key of the restart entry `index` (always `shared == 0`).
    fn restart_key(&self, index: u32) -> Result<&'a [u8], SstError> {
        let offset = self.restart_offset(index);
        let entry = self.parse_entry_at(offset)?;
        if entry.shared != 0 {
            return Err(SstError::Corruption(format!(
                "restart point {index} shares {} bytes",
                entry.shared
            )));
        }
        let start = offset as usize + entry.delta_offset;
        Ok(&self.content[start..start + entry.unshared])
    }
}

impl<'a> Iter for BlockIter<'a> {
    fn valid(&self) -> bool {
        self.current < self.restarts_offset && self.current_restart < self.num_restarts
    }

    fn seek_to_first(&mut self) {
        if self.num_restarts == 0 || self.restarts_offset == 0 {
            self.fail();
            return;
        }
        self.goto_restart(0);
        self.parse_current();
    }

    fn seek_to_last(&mut self) {
        if self.num_restarts == 0 || self.restarts_offset == 0 {
            self.fail();
            return;
        }
        self.goto_restart(self.num_restarts - 1);
        // Walk to the final entry of the final restart interval.
        while self.parse_current() {
            if self.current + self.entry_len >= self.restarts_offset {
                break;
            }
            self.step_forward();
        }
    }

    fn seek(&mut self, target: &[u8]) {
        if self.num_restarts == 0 || self.restarts_offset == 0 {
            self.fail();
            return;
        }

        // Binary-search the restart array for the last restart whose first
        // key is <= target.
        let mut left = 0u32;
        let mut right = self.num_restarts - 1;
        while left < right {
            let mid = (left + right + 1) / 2;
            let mid_key = match self.restart_key(mid) {
                Ok(key) => key,
                Err(err) => {
                    self.corrupt(err.to_string());
                    return;
                }
            };
            if mid_key > target {
                right = mid - 1;
            } else {
                left = mid;
            }
        }

        // Linear scan to the first entry whose key is >= target.
        self.goto_restart(left);
        while self.parse_current() {
            if self.key.as_slice() >= target {
                return;
            }
            self.step_forward();
        }
    }

    fn next(&mut self) {
        if !self.valid() {
            return;
        }
        self.step_forward();
        self.parse_current();
    }

    fn prev(&mut self) {
        if !self.valid() {
            return;
        }
        let origin = self.current;

        // Find the restart point strictly before the current entry.
        while self.restart_offset(self.current_restart) >= origin {
            if self.current_restart == 0 {
                self.fail();
                return;
            }
            self.current_restart -= 1;
        }

        // Replay forward from there up to the entry preceding `origin`.
        self.goto_restart(self.current_restart);
        while self.parse_current() {
            if self.current + self.entry_len >= origin {
                break;
            }
            self.step_forward();
        }
    }

    fn key(&self) -> &[u8] {
        debug_assert!(self.valid());
        &self.key
    }

    fn value(&self) -> &[u8] {
        debug_assert!(self.valid());
        &self.content[self.value_range.0..self.value_range.1]
    }
}

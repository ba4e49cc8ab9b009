//! The in-memory sorted table.
//!
//! A memtable accumulates recent mutations before they are drained into an
//! SSTable. Entries are keyed by **internal key** (user key, 56-bit
//! sequence number, value type) so that multiple versions of one user key
//! coexist; reads resolve to the newest version.
//!
//! # Record layout
//!
//! Each skip-list entry is a single byte string:
//!
//! ```text
//! ┌──────────────────────┬─────────────────┐
//! │ varstr(internal_key) │ varstr(value)   │
//! └──────────────────────┴─────────────────┘
//! internal_key := user_key ‖ fixed64_be(seq << 8 | type)
//! ```
//!
//! The comparator peels the leading varstr and applies
//! [`InternalKeyComparator`] order: user keys ascending, then sequence
//! numbers descending — so a forward scan from a [`LookupKey`] lands on
//! the newest version of the sought user key.
//!
//! # Lifecycle and concurrency
//!
//! A memtable is created empty, filled by [`MemTable::insert`], then
//! frozen (no further mutation) before being drained via
//! [`MemTable::iter`]. Mutation requires `&mut self`; the component takes
//! no locks. A caller wanting readers during writes must impose its own
//! barrier, typically by freezing first.

#[cfg(test)]
mod tests;

pub mod skiplist;

use std::cmp::Ordering;

use thiserror::Error;
use tracing::trace;

use crate::encoding::{get_varstr, put_varstr, varint_len, varstr_len};
use crate::iter::Iter;
use crate::keys::{
    Comparator, InternalKeyComparator, LookupKey, MAX_SEQUENCE, TAG_SIZE, ValueType,
    append_internal_key, split_internal_key,
};
use crate::memtable::skiplist::{SkipList, SkipListIter};

// ------------------------------------------------------------------------------------------------
// Error type
// ------------------------------------------------------------------------------------------------

/// Errors returned by memtable operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MemtableError {
    /// An entry with an identical internal key already exists.
    #[error("duplicate internal key at sequence {sequence}")]
    Duplicate {
        /// Sequence number of the offending entry.
        sequence: u64,
    },
}

// ------------------------------------------------------------------------------------------------
// Record comparator
// ------------------------------------------------------------------------------------------------

/// Orders memtable records by peeling the varstr frame and comparing the
/// internal keys inside.
///
/// Records are built by this module and always well formed; a frame that
/// fails to parse falls back to raw byte order.
#[derive(Debug, Default, Clone, Copy)]
pub struct RecordComparator {
    ikey_cmp: InternalKeyComparator,
}

impl Comparator for RecordComparator {
    fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
        match (get_varstr(a), get_varstr(b)) {
            (Ok((a_ikey, _)), Ok((b_ikey, _))) => self.ikey_cmp.compare(a_ikey, b_ikey),
            _ => {
                debug_assert!(false, "malformed memtable record");
                a.cmp(b)
            }
        }
    }

    fn name(&self) -> &'static str {
        "stratadb.RecordComparator"
    }
}

// ------------------------------------------------------------------------------------------------
// MemTable
// ------------------------------------------------------------------------------------------------

/// Sequence-numbered, ordered in-memory table on a skip list.
pub struct MemTable {
    table: SkipList<RecordComparator>,
}

impl Default for MemTable {
    fn default() -> Self {
        Self::new()
    }
}

impl MemTable {
    /// Creates an empty memtable.
    pub fn new() -> Self {
        Self {
            table: SkipList::new(RecordComparator::default()),
        }
    }

    /// Number of entries (all versions counted).
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Whether the table holds no entries.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Approximate bytes of record data held, for the freeze decision of
    /// the layer above.
    pub fn approximate_memory_usage(&self) -> usize {
        self.table.key_bytes()
    }

    /// Inserts one version of a user key.
    ///
    /// `value` must be empty for [`ValueType::Deletion`]. Fails with
    /// [`MemtableError::Duplicate`] when an entry with the identical
    /// internal key already exists.
    pub fn insert(
        &mut self,
        sequence: u64,
        value_type: ValueType,
        user_key: &[u8],
        value: &[u8],
    ) -> Result<(), MemtableError> {
        debug_assert!(sequence <= MAX_SEQUENCE);

        let ikey_len = user_key.len() + TAG_SIZE;
        let mut record =
            Vec::with_capacity(varint_len(ikey_len as u64) + ikey_len + varstr_len(value));
        let mut ikey = Vec::with_capacity(ikey_len);
        append_internal_key(&mut ikey, user_key, sequence, value_type);
        put_varstr(&mut record, &ikey);
        put_varstr(&mut record, value);

        if !self.table.insert(record) {
            return Err(MemtableError::Duplicate { sequence });
        }

        trace!(
            seq = sequence,
            value_type = (value_type as u8),
            key_len = user_key.len(),
            value_len = value.len(),
            "memtable insert"
        );
        Ok(())
    }

    /// Looks up the newest version of `key`.
    ///
    /// Returns `None` when the key is absent or its newest version is a
    /// tombstone.
    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        let lookup = LookupKey::new(key, MAX_SEQUENCE);
        let mut iter = self.table.iter();
        iter.seek(lookup.mem_key());
        if !iter.valid() {
            return None;
        }

        // The seek may land on a later user key; records are well formed
        // by construction.
        let record = iter.key();
        let (ikey, ikey_size) = get_varstr(record).ok()?;
        let (record_user_key, _, value_type) = split_internal_key(ikey).ok()?;
        if record_user_key != key {
            return None;
        }

        match value_type {
            ValueType::Deletion => None,
            ValueType::Value => {
                let (value, _) = get_varstr(&record[ikey_size..]).ok()?;
                Some(value)
            }
        }
    }

    /// Creates an unpositioned iterator over all versions, in internal-key
    /// order (user keys ascending, newest version of each first).
    pub fn iter(&self) -> MemTableIter<'_> {
        MemTableIter {
            inner: self.table.iter(),
            current: None,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// Iterator
// ------------------------------------------------------------------------------------------------

/// Cursor over memtable entries.
///
/// `key()` yields the internal key, `value()` the value bytes; both are
/// decoded out of the underlying record on each reposition.
pub struct MemTableIter<'a> {
    inner: SkipListIter<'a, RecordComparator>,
    /// Decoded `(internal_key, value)` of the current record.
    current: Option<(&'a [u8], &'a [u8])>,
}

impl<'a> MemTableIter<'a> {
    /// Positions on the first entry with internal key `≥` the one inside
    /// `lookup`.
    pub fn seek_lookup(&mut self, lookup: &LookupKey) {
        self.inner.seek(lookup.mem_key());
        self.decode();
    }

    fn decode(&mut self) {
        self.current = None;
        if !self.inner.valid() {
            return;
        }
        let record = self.inner.key();
        if let Ok((ikey, ikey_size)) = get_varstr(record) {
            if let Ok((value, _)) = get_varstr(&record[ikey_size..]) {
                self.current = Some((ikey, value));
                return;
            }
        }
        debug_assert!(false, "malformed memtable record");
    }
}

impl<'a> Iter for MemTableIter<'a> {
    fn valid(&self) -> bool {
        self.current.is_some()
    }

    fn seek_to_first(&mut self) {
        self.inner.seek_to_first();
        self.decode();
    }

    fn seek_to_last(&mut self) {
        self.inner.seek_to_last();
        self.decode();
    }

    fn seek(&mut self, target: &[u8]) {
        // `target` is an internal key; wrap it in the record framing the
        // comparator expects.
        let mut framed = Vec::with_capacity(varstr_len(target));
        put_varstr(&mut framed, target);
        self.inner.seek(&framed);
        self.decode();
    }

    fn next(&mut self) {
        self.inner.next();
        self.decode();
    }

    fn prev(&mut self) {
        self.inner.prev();
        self.decode();
    }

    fn key(&self) -> &[u8] {
        self.current.expect("iterator is not positioned").0
    }

    fn value(&self) -> &[u8] {
        self.current.expect("iterator is not positioned").1
    }
}

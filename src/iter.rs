//! The iterator capability shared across the crate.
//!
//! Data blocks, the index block, and the memtable all expose the same
//! cursor surface, so higher layers (two-level table scans, merge logic in
//! the engine above this crate) can be written once against the trait.
//!
//! A fresh iterator is not positioned; callers must call one of the seek
//! methods first. `key`/`value` may only be called while [`Iter::valid`]
//! returns `true`.

/// A bidirectional cursor over sorted key/value entries.
pub trait Iter {
    /// Whether the cursor is positioned on an entry.
    fn valid(&self) -> bool;

    /// Positions the cursor on the first entry, if any.
    fn seek_to_first(&mut self);

    /// Positions the cursor on the last entry, if any.
    fn seek_to_last(&mut self);

    /// Positions the cursor on the first entry whose key is `≥ target`.
    ///
    /// The cursor becomes invalid when every key is `< target`.
    fn seek(&mut self, target: &[u8]);

    /// Advances to the next entry; invalidates past the last one.
    fn next(&mut self);

    /// Steps back to the previous entry; invalidates before the first one.
    fn prev(&mut self);

    /// Key of the current entry. Requires [`Iter::valid`].
    fn key(&self) -> &[u8];

    /// Value of the current entry. Requires [`Iter::valid`].
    fn value(&self) -> &[u8];
}

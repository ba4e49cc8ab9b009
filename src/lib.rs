//! # StrataDB
//!
//! The storage core of an embeddable, persistent key-value engine built on a
//! **Log-Structured Merge Tree (LSM-tree)** architecture. This crate contains
//! the three subsystems everything else in such an engine stands on: the
//! write-ahead record log, the in-memory sorted table, and the on-disk
//! sorted-string table (SSTable) with its block format.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                (database façade, not here)             │
//! │                                                        │
//! │   WriteBatch ──► LogWriter ──► 32 KiB record blocks    │
//! │       │                                                │
//! │       └──► MemTable (skip list, internal keys)         │
//! │                 │ freeze + drain                       │
//! │                 ▼                                      │
//! │   TableBuilder ──► data blocks │ index block │ footer  │
//! │                                                        │
//! │   Table::get ──► footer ──► index block ──► data block │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`encoding`] | Uvarint / varstr codec and fixed-width big-endian helpers |
//! | [`keys`] | Internal keys `(user_key, sequence, type)` and comparators |
//! | [`iter`] | The iterator capability shared by blocks and the memtable |
//! | [`storage`] | File capabilities: append/flush/sync, sequential and random reads |
//! | [`batch`] | Self-describing write batches (the unit a log record conveys) |
//! | [`wal`] | Fragmented, CRC-protected record log over 32 KiB blocks |
//! | [`memtable`] | Skip-list memtable with MVCC visibility |
//! | [`sstable`] | Prefix-compressed blocks, table builder, and table reader |
//!
//! ## Key properties
//!
//! - **Durability hooks** — every logical log record is fully appended and
//!   flushed before `add_record` returns; `sync` of the file is the
//!   caller's responsibility.
//! - **Multi-version keys** — entries carry a 56-bit sequence number and a
//!   type byte; the newest version of a user key is always reached first.
//! - **CRC32 integrity** — log records and table blocks are checksummed
//!   with the IEEE polynomial and verified on every read.
//! - **No hidden threads** — all components are single-writer by contract
//!   and perform no internal locking or background work.
//!
//! ## Quick start
//!
//! ```rust
//! use stratadb::keys::ValueType;
//! use stratadb::memtable::MemTable;
//!
//! let mut mem = MemTable::new();
//! mem.insert(1, ValueType::Value, b"hello", b"world").unwrap();
//! mem.insert(2, ValueType::Deletion, b"stale", b"").unwrap();
//!
//! assert_eq!(mem.get(b"hello"), Some(&b"world"[..]));
//! assert_eq!(mem.get(b"stale"), None);
//! ```

pub mod batch;
pub mod encoding;
pub mod iter;
pub mod keys;
pub mod memtable;
pub mod sstable;
pub mod storage;
pub mod wal;

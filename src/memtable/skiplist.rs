//! A randomized skip list over opaque byte keys.
//!
//! Nodes live in a single arena (`Vec`) and link forward by index, so the
//! structure is safe Rust with the same shape as the classic
//! pointer-based list: level 0 is a sorted linked list of every entry, and
//! each higher level skips over a geometrically shrinking subset.
//!
//! There are no backward links; `prev` on the iterator re-descends from
//! the head to the last node strictly less than the current key.
//!
//! Mutation requires `&mut self`; readers over a frozen list may share it
//! freely.

use std::cmp::Ordering;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::keys::Comparator;

/// Hard cap on tower height.
pub const MAX_HEIGHT: usize = 12;

/// Inverse probability of growing a tower by one level.
const BRANCHING: u32 = 4;

/// Link target meaning "end of list".
const NIL: usize = usize::MAX;

struct Node {
    key: Vec<u8>,
    /// Forward links, one per level; `NIL` past the tower height.
    next: [usize; MAX_HEIGHT],
}

/// A skip list ordered by the supplied [`Comparator`].
///
/// Duplicate keys (keys comparing `Equal`) are rejected by
/// [`SkipList::insert`].
pub struct SkipList<C: Comparator> {
    cmp: C,
    /// `nodes[0]` is the head sentinel; its key is empty and never read.
    nodes: Vec<Node>,
    len: usize,
    /// Total bytes of key data, for memory accounting.
    key_bytes: usize,
    rng: StdRng,
}

impl<C: Comparator> SkipList<C> {
    /// Creates an empty list ordered by `cmp`.
    pub fn new(cmp: C) -> Self {
        Self {
            cmp,
            nodes: vec![Node {
                key: Vec::new(),
                next: [NIL; MAX_HEIGHT],
            }],
            len: 0,
            key_bytes: 0,
            rng: StdRng::from_os_rng(),
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the list holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Total bytes of key data stored.
    pub fn key_bytes(&self) -> usize {
        self.key_bytes
    }

    /// Inserts `key`. Returns `false` when an equal key is already present
    /// (the list is left unchanged).
    pub fn insert(&mut self, key: Vec<u8>) -> bool {
        let mut prevs = [0usize; MAX_HEIGHT];
        let mut current = 0;
        for level in (0..MAX_HEIGHT).rev() {
            loop {
                let next = self.nodes[current].next[level];
                if next != NIL && self.cmp.compare(&self.nodes[next].key, &key) == Ordering::Less {
                    current = next;
                } else {
                    break;
                }
            }
            prevs[level] = current;
        }

        let successor = self.nodes[prevs[0]].next[0];
        if successor != NIL
            && self.cmp.compare(&self.nodes[successor].key, &key) == Ordering::Equal
        {
            return false;
        }

        let height = self.random_height();
        let index = self.nodes.len();
        let mut node = Node {
            key,
            next: [NIL; MAX_HEIGHT],
        };
        for level in 0..height {
            node.next[level] = self.nodes[prevs[level]].next[level];
        }
        self.len += 1;
        self.key_bytes += node.key.len();
        self.nodes.push(node);
        for level in 0..height {
            self.nodes[prevs[level]].next[level] = index;
        }
        true
    }

    /// Whether a key comparing `Equal` to `key` is present.
    pub fn contains(&self, key: &[u8]) -> bool {
        match self.seek_ge(key) {
            Some(index) => self.cmp.compare(&self.nodes[index].key, key) == Ordering::Equal,
            None => false,
        }
    }

    /// Creates an unpositioned iterator over the list.
    pub fn iter(&self) -> SkipListIter<'_, C> {
        SkipListIter {
            list: self,
            node: None,
        }
    }

    /// Index of the first node whose key is `≥ target`, if any.
    fn seek_ge(&self, target: &[u8]) -> Option<usize> {
        let index = self.nodes[self.seek_lt(target)].next[0];
        (index != NIL).then_some(index)
    }

    /// Index of the last node strictly less than `target` (the head
    /// sentinel when no node qualifies).
    fn seek_lt(&self, target: &[u8]) -> usize {
        let mut current = 0;
        for level in (0..MAX_HEIGHT).rev() {
            loop {
                let next = self.nodes[current].next[level];
                if next != NIL
                    && self.cmp.compare(&self.nodes[next].key, target) == Ordering::Less
                {
                    current = next;
                } else {
                    break;
                }
            }
        }
        current
    }

    /// Index of the last node, if any.
    fn seek_last(&self) -> Option<usize> {
        let mut current = 0;
        for level in (0..MAX_HEIGHT).rev() {
            loop {
                let next = self.nodes[current].next[level];
                if next != NIL {
                    current = next;
                } else {
                    break;
                }
            }
        }
        (current != 0).then_some(current)
    }

    /// Draws a tower height from a geometric distribution: grow by one
    /// level with probability 1/BRANCHING, capped at [`MAX_HEIGHT`].
    fn random_height(&mut self) -> usize {
        let mut height = 1;
        while height < MAX_HEIGHT && self.rng.random_ratio(1, BRANCHING) {
            height += 1;
        }
        height
    }
}

// ------------------------------------------------------------------------------------------------
// Iterator
// ------------------------------------------------------------------------------------------------

/// Cursor over a [`SkipList`]. Created unpositioned.
pub struct SkipListIter<'a, C: Comparator> {
    list: &'a SkipList<C>,
    /// Arena index of the current node; `None` when invalid.
    node: Option<usize>,
}

impl<'a, C: Comparator> SkipListIter<'a, C> {
    /// Whether the cursor is positioned on an entry.
    pub fn valid(&self) -> bool {
        self.node.is_some()
    }

    /// Key of the current entry. Requires [`SkipListIter::valid`].
    pub fn key(&self) -> &'a [u8] {
        let index = self.node.expect("iterator is not positioned");
        &self.list.nodes[index].key
    }

    /// Positions on the first node whose key is `≥ target`.
    pub fn seek(&mut self, target: &[u8]) {
        self.node = self.list.seek_ge(target);
    }

    /// Positions on the first entry.
    pub fn seek_to_first(&mut self) {
        let index = self.list.nodes[0].next[0];
        self.node = (index != NIL).then_some(index);
    }

    /// Positions on the last entry.
    pub fn seek_to_last(&mut self) {
        self.node = self.list.seek_last();
    }

    /// Advances to the next entry.
    pub fn next(&mut self) {
        if let Some(index) = self.node {
            let next = self.list.nodes[index].next[0];
            self.node = (next != NIL).then_some(next);
        }
    }

    /// Steps back to the previous entry by re-descending from the head
    /// (nodes carry no backward links).
    pub fn prev(&mut self) {
        if let Some(index) = self.node {
            let before = self.list.seek_lt(&self.list.nodes[index].key);
            self.node = (before != 0).then_some(before);
        }
    }
}
